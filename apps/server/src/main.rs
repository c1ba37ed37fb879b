use anyhow::Context;
use clap::{Parser, Subcommand};
use luminaras_config::load as load_config;
use luminaras_database::{
    CreateGroupRequest, CreateUserRequest, GroupMessageRepository, GroupRepository,
    MatchRepository, MatchStatus, MessageRepository, UserRepository,
};
use luminaras_gateway::{create_router, GatewayState};
use luminaras_runtime::{telemetry, BackendServices};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tracing::info;

/// Demo profiles seeded by `seed-data`; the first one owns the demo group
const DEMO_USERS: [&str; 3] = ["nova", "rook", "vex"];

#[derive(Parser)]
#[command(name = "luminaras-backend")]
#[command(about = "Luminaras chat backend (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server (default)
    Serve,
    /// Print groups, matches, profile and message counts
    DumpData,
    /// Insert demo profiles, a demo group with members and an accepted match
    SeedData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::DumpData => dump_data().await,
        Commands::SeedData => seed_data().await,
    }
}

async fn initialise() -> anyhow::Result<(luminaras_config::AppConfig, BackendServices)> {
    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    Ok((config, services))
}

async fn run_server() -> anyhow::Result<()> {
    info!("starting Luminaras backend");

    let (config, services) = initialise().await?;

    let state = GatewayState::new(services.db_pool.clone(), config.realtime.clone());
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(luminaras_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn dump_data() -> anyhow::Result<()> {
    info!("dumping chat data from database");

    let (_config, services) = initialise().await?;
    let pool = &services.db_pool;

    let groups = GroupRepository::new(pool.clone())
        .list()
        .await
        .context("failed to fetch groups")?;

    println!("=== GROUPS ===");
    if groups.is_empty() {
        println!("No groups found in database");
    } else {
        println!("Found {} groups:", groups.len());
        println!(
            "{:<5} {:<30} {:<10} {:<15} {:<20} {:<25}",
            "ID", "Name", "Public", "Created By", "Category", "Created At"
        );
        println!("{}", "-".repeat(110));

        for group in groups {
            println!(
                "{:<5} {:<30} {:<10} {:<15} {:<20} {:<25}",
                group.id,
                group.name,
                group.is_public,
                group.created_by_id,
                group.game_category.as_deref().unwrap_or("NULL"),
                group.created_at
            );
        }
    }

    println!("\n=== MATCHES ===");
    let matches = MatchRepository::new(pool.clone())
        .list()
        .await
        .context("failed to fetch matches")?;

    if matches.is_empty() {
        println!("No matches found in database");
    } else {
        println!("Found {} matches:", matches.len());
        println!(
            "{:<5} {:<10} {:<10} {:<10} {:<25}",
            "ID", "User 1", "User 2", "Status", "Created At"
        );
        println!("{}", "-".repeat(65));

        for m in matches {
            println!(
                "{:<5} {:<10} {:<10} {:<10} {:<25}",
                m.id,
                m.user_id_1,
                m.user_id_2,
                m.status.as_str(),
                m.created_at
            );
        }
    }

    let profiles = UserRepository::new(pool.clone())
        .count()
        .await
        .context("failed to count profiles")?;
    println!("\n=== PROFILES ===");
    println!("Users: {profiles}");

    let direct = MessageRepository::new(pool.clone())
        .count()
        .await
        .context("failed to count direct messages")?;
    let group = GroupMessageRepository::new(pool.clone())
        .count()
        .await
        .context("failed to count group messages")?;

    println!("\n=== MESSAGES ===");
    println!("Direct messages: {direct}");
    println!("Group messages:  {group}");

    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    info!("seeding database with demo data");

    let (_config, services) = initialise().await?;
    let seeded = seed(&services.db_pool).await?;

    println!(
        "Seeded demo group {} with users {:?}",
        seeded.group_id, seeded.user_ids
    );
    println!(
        "Users {} and {} share an accepted match",
        seeded.user_ids[0], seeded.user_ids[1]
    );
    Ok(())
}

struct Seeded {
    group_id: i64,
    user_ids: [i64; 3],
}

/// Insert the demo profiles, group and match. Profiles and the match are
/// reused when they already exist; every run adds a new group.
async fn seed(pool: &SqlitePool) -> anyhow::Result<Seeded> {
    let users = UserRepository::new(pool.clone());
    let groups = GroupRepository::new(pool.clone());
    let matches = MatchRepository::new(pool.clone());

    let mut user_ids = [0; 3];
    for (slot, username) in user_ids.iter_mut().zip(DEMO_USERS) {
        let user = match users.find_by_username(username).await? {
            Some(user) => user,
            None => users
                .create(&CreateUserRequest {
                    username: username.to_string(),
                    display_name: None,
                })
                .await
                .with_context(|| format!("failed to create demo user {username}"))?,
        };
        *slot = user.id;
    }
    let [owner, friend, guest] = user_ids;

    let group = groups
        .create(
            owner,
            &CreateGroupRequest {
                name: "Friday Night Raids".to_string(),
                description: Some("Weekly co-op sessions".to_string()),
                is_public: Some(true),
                game_category: Some("MMO".to_string()),
            },
        )
        .await
        .context("failed to create demo group")?;

    for user_id in [friend, guest] {
        groups
            .add_member(group.id, user_id)
            .await
            .with_context(|| format!("failed to add user {user_id} to demo group"))?;
    }

    if matches.find_between(owner, friend).await?.is_none() {
        let pending = matches
            .create(owner, friend)
            .await
            .context("failed to create demo match")?;
        matches
            .respond(pending.id, friend, MatchStatus::Accepted)
            .await
            .context("failed to accept demo match")?;
    }

    info!(group_id = group.id, "demo data seeded");
    Ok(Seeded {
        group_id: group.id,
        user_ids,
    })
}
