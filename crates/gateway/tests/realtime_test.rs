//! Chat socket scenarios against a live listener.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use luminaras_config::{DatabaseConfig, RealtimeConfig};
use luminaras_database::{initialize_database, Pagination};
use luminaras_gateway::{create_router, GatewayState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    state: GatewayState,
    _dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("realtime.db").display()),
            max_connections: 4,
        };
        let pool = initialize_database(&config).await.unwrap();
        let state = GatewayState::new(pool, RealtimeConfig::default());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    async fn direct(&self, user_id: i64) -> Socket {
        let (socket, _) = connect_async(self.url(&format!("/ws?userId={user_id}")))
            .await
            .unwrap();
        self.wait_until(|state| async move {
            state.hub.connections().lookup(user_id).await.is_some()
        })
        .await;
        socket
    }

    async fn group(&self, group_id: i64, user_id: i64) -> Socket {
        let (socket, _) = connect_async(self.url(&format!("/ws/groups/{group_id}?userId={user_id}")))
            .await
            .unwrap();
        self.wait_until(|state| async move {
            state.hub.memberships().members(group_id).await.contains(&user_id)
        })
        .await;
        socket
    }

    async fn wait_until<F, Fut>(&self, condition: F)
    where
        F: Fn(GatewayState) -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..100 {
            if condition(self.state.clone()).await {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket.send(Message::Text(value.to_string())).await.unwrap();
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let message = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn assert_silent(socket: &mut Socket) {
    let next = timeout(Duration::from_millis(200), socket.next()).await;
    assert!(next.is_err(), "expected no frame, got {next:?}");
}

#[tokio::test]
async fn direct_message_reaches_connected_receiver() {
    let server = TestServer::start().await;
    let mut alice = server.direct(1).await;
    let mut bob = server.direct(2).await;

    send_json(
        &mut alice,
        json!({ "type": "message", "senderId": 1, "receiverId": 2, "content": "hi" }),
    )
    .await;

    let received = next_json(&mut bob).await;
    assert_eq!(received["type"], "message");
    assert_eq!(received["senderId"], 1);
    assert_eq!(received["receiverId"], 2);
    assert_eq!(received["content"], "hi");
    assert!(received["id"].is_i64());
    assert!(received["createdAt"].is_string());

    assert_eq!(server.state.messages.count().await.unwrap(), 1);
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn offline_receiver_gets_history_only() {
    let server = TestServer::start().await;
    let mut alice = server.direct(1).await;

    send_json(
        &mut alice,
        json!({ "type": "message", "senderId": 1, "receiverId": 2, "content": "ping" }),
    )
    .await;

    server
        .wait_until(|state| async move { state.messages.count().await.unwrap() == 1 })
        .await;
    let history = server
        .state
        .messages
        .find_conversation(2, 1, Pagination::default())
        .await
        .unwrap();
    assert_eq!(history[0].content, "ping");
}

#[tokio::test]
async fn spoofed_and_malformed_frames_are_dropped() {
    let server = TestServer::start().await;
    let mut alice = server.direct(1).await;
    let mut bob = server.direct(2).await;

    send_json(
        &mut alice,
        json!({ "type": "message", "senderId": 3, "receiverId": 2, "content": "not alice" }),
    )
    .await;
    send_json(&mut alice, json!({ "type": "typing", "senderId": 1 })).await;
    alice.send(Message::Text("{oops".to_string())).await.unwrap();

    assert_silent(&mut bob).await;
    assert_eq!(server.state.messages.count().await.unwrap(), 0);

    // the connection survives bad frames
    send_json(
        &mut alice,
        json!({ "type": "message", "senderId": 1, "receiverId": 2, "content": "real" }),
    )
    .await;
    assert_eq!(next_json(&mut bob).await["content"], "real");
}

#[tokio::test]
async fn group_message_fans_out_to_other_members() {
    let server = TestServer::start().await;
    let mut one = server.group(10, 1).await;
    let mut two = server.group(10, 2).await;
    let mut three = server.group(10, 3).await;

    send_json(
        &mut one,
        json!({ "type": "message", "senderId": 1, "groupId": 10, "content": "gg" }),
    )
    .await;

    for socket in [&mut two, &mut three] {
        let received = next_json(socket).await;
        assert_eq!(received["type"], "message");
        assert_eq!(received["groupId"], 10);
        assert_eq!(received["senderId"], 1);
        assert_eq!(received["content"], "gg");
    }
    assert_silent(&mut one).await;
    assert_eq!(server.state.group_messages.count().await.unwrap(), 1);
}

#[tokio::test]
async fn member_who_left_receives_nothing() {
    let server = TestServer::start().await;
    let mut one = server.group(10, 1).await;
    let mut two = server.group(10, 2).await;
    let mut three = server.group(10, 3).await;

    three.close(None).await.unwrap();
    server
        .wait_until(|state| async move { !state.hub.memberships().members(10).await.contains(&3) })
        .await;

    send_json(
        &mut one,
        json!({ "type": "message", "senderId": 1, "groupId": 10, "content": "who's left?" }),
    )
    .await;

    assert_eq!(next_json(&mut two).await["content"], "who's left?");
    assert!(server.state.hub.connections().lookup(3).await.is_none());
}

#[tokio::test]
async fn group_frame_for_another_group_is_dropped() {
    let server = TestServer::start().await;
    let mut one = server.group(10, 1).await;
    let mut two = server.group(11, 2).await;

    send_json(
        &mut one,
        json!({ "type": "message", "senderId": 1, "groupId": 11, "content": "sneaky" }),
    )
    .await;

    assert_silent(&mut two).await;
    assert_eq!(server.state.group_messages.count().await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_upgrades_are_refused() {
    let server = TestServer::start().await;

    for path in ["/ws", "/ws?userId=abc", "/ws/groups/ten?userId=1", "/ws/groups/10"] {
        assert!(
            connect_async(server.url(path)).await.is_err(),
            "{path} should be refused"
        );
    }
    assert!(server.state.hub.connections().is_empty().await);
}

#[tokio::test]
async fn percent_encoded_user_id_connects() {
    let server = TestServer::start().await;

    let (_socket, _) = connect_async(server.url("/ws?userId=%31")).await.unwrap();
    server
        .wait_until(|state| async move { state.hub.connections().lookup(1).await.is_some() })
        .await;
}

#[tokio::test]
async fn dev_tooling_upgrade_is_not_routed() {
    let server = TestServer::start().await;

    let mut request = server.url("/ws?userId=1").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("vite-hmr"));

    assert!(connect_async(request).await.is_err());
    assert!(server.state.hub.connections().is_empty().await);
}

#[tokio::test]
async fn reconnect_replaces_and_stale_close_keeps_new_socket() {
    let server = TestServer::start().await;
    let mut alice = server.direct(1).await;
    let mut old_bob = server.direct(2).await;
    let old_id = server.state.hub.connections().lookup(2).await.unwrap().id();
    let mut new_bob = connect_async(server.url("/ws?userId=2")).await.unwrap().0;
    server
        .wait_until(|state| async move {
            state
                .hub
                .connections()
                .lookup(2)
                .await
                .is_some_and(|handle| handle.id() != old_id)
        })
        .await;

    old_bob.close(None).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    send_json(
        &mut alice,
        json!({ "type": "message", "senderId": 1, "receiverId": 2, "content": "still there?" }),
    )
    .await;
    assert_eq!(next_json(&mut new_bob).await["content"], "still there?");
}
