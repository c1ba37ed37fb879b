//! Upgrade routing and the per-socket session loop

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::SessionKind;
use crate::error::GatewayError;
use crate::state::GatewayState;

const DIRECT_PATH: &str = "/ws";
const GROUP_PATH_PREFIX: &str = "/ws/groups/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeDecision {
    Accept(SessionKind),
    /// Dev tooling upgrade; left alone
    Ignore,
    Refuse(String),
}

#[derive(Debug, Default, Deserialize)]
struct UpgradeQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// Decide what to do with an upgrade request from its URI and
/// `Sec-WebSocket-Protocol` header.
pub fn classify_upgrade(
    uri: &Uri,
    protocols: Option<&str>,
    ignored_protocols: &[String],
) -> UpgradeDecision {
    let is_tooling_upgrade = protocols
        .into_iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|protocol| ignored_protocols.iter().any(|ignored| ignored == protocol));
    if is_tooling_upgrade {
        return UpgradeDecision::Ignore;
    }

    let path = uri.path();
    let user_id = Query::<UpgradeQuery>::try_from_uri(uri)
        .map(|Query(query)| query)
        .unwrap_or_default()
        .user_id
        .and_then(|value| value.parse::<i64>().ok());

    if path == DIRECT_PATH {
        return match user_id {
            Some(user_id) => UpgradeDecision::Accept(SessionKind::Direct { user_id }),
            None => UpgradeDecision::Refuse("userId must be an integer".to_string()),
        };
    }

    if let Some(raw_group) = path.strip_prefix(GROUP_PATH_PREFIX) {
        let Ok(group_id) = raw_group.parse::<i64>() else {
            return UpgradeDecision::Refuse("groupId must be an integer".to_string());
        };
        return match user_id {
            Some(user_id) => UpgradeDecision::Accept(SessionKind::Group { group_id, user_id }),
            None => UpgradeDecision::Refuse("userId must be an integer".to_string()),
        };
    }

    UpgradeDecision::Refuse(format!("no chat endpoint at {path}"))
}

/// Upgrade handler shared by the direct and group endpoints
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let protocols = headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok());

    match classify_upgrade(&uri, protocols, &state.realtime.ignored_subprotocols) {
        UpgradeDecision::Accept(session) => {
            ws.on_upgrade(move |socket| run_session(socket, state, session))
        }
        UpgradeDecision::Ignore => {
            debug!(path = uri.path(), ?protocols, "ignoring dev tooling upgrade");
            StatusCode::NOT_FOUND.into_response()
        }
        UpgradeDecision::Refuse(reason) => {
            warn!(path = uri.path(), %reason, "refusing chat upgrade");
            GatewayError::InvalidRequest(reason).into_response()
        }
    }
}

/// Drive one socket until either side goes away
async fn run_session(socket: WebSocket, state: Arc<GatewayState>, session: SessionKind) {
    let (mut sender, mut receiver) = socket.split();
    let hub = state.hub.clone();
    let (handle, mut outbound) = hub.connect(session).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(error) => {
                    warn!(%error, "failed to encode outbound event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let receive_hub = hub.clone();
    let max_frame_bytes = state.realtime.max_frame_bytes;
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    receive_hub
                        .handle_frame(session, &text, max_frame_bytes)
                        .await;
                }
                Message::Close(_) => break,
                other => debug!(
                    user_id = session.user_id(),
                    frame = ?other,
                    "ignoring non-text chat frame"
                ),
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }

    hub.disconnect(&handle).await;
    info!(user_id = session.user_id(), "chat session ended");
}
