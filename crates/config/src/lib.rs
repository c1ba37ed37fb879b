use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "luminaras.toml",
    "config/luminaras.toml",
    "crates/config/luminaras.toml",
    "../luminaras.toml",
    "../config/luminaras.toml",
    "server/luminaras.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://luminaras.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Settings for the chat socket layer.
///
/// ```
/// use luminaras_config::RealtimeConfig;
///
/// let realtime = RealtimeConfig::default();
/// assert_eq!(realtime.ignored_subprotocols, vec!["vite-hmr".to_string()]);
/// assert_eq!(realtime.max_frame_bytes, 64 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Sub-protocols used by dev tooling; such upgrades are never routed.
    #[serde(default = "RealtimeConfig::default_ignored_subprotocols")]
    pub ignored_subprotocols: Vec<String>,
    #[serde(default = "RealtimeConfig::default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl RealtimeConfig {
    fn default_ignored_subprotocols() -> Vec<String> {
        vec!["vite-hmr".to_string()]
    }

    const fn default_max_frame_bytes() -> usize {
        64 * 1024
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ignored_subprotocols: Self::default_ignored_subprotocols(),
            max_frame_bytes: Self::default_max_frame_bytes(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use luminaras_config::load;
///
/// std::env::remove_var("LUMINARAS_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let db_max = i64::from(defaults.database.max_connections);
    let max_frame = i64::try_from(defaults.realtime.max_frame_bytes).unwrap_or(i64::MAX);

    let builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default("database.max_connections", db_max)?
        .set_default(
            "realtime.ignored_subprotocols",
            defaults.realtime.ignored_subprotocols.clone(),
        )?
        .set_default("realtime.max_frame_bytes", max_frame)?;

    let mut builder = builder;
    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("LUMINARAS_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via LUMINARAS_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(
        config::Environment::with_prefix("LUMINARAS")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("realtime.ignored_subprotocols")
            .try_parsing(true),
    );

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
