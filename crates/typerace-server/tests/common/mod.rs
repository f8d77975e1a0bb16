use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use typerace_core::net::messages::{
    ClientMessage, CreateRoomMsg, JoinRoomMsg, LeaveRoomMsg, RoomCreatedMsg, RoomJoinedMsg,
    ServerMessage, StartTestMsg, UpdateProgressMsg,
};
use typerace_core::net::protocol::{decode_server_message, encode_client_message};

use typerace_server::build_app;
use typerace_server::config::{RaceConfig, ServerConfig};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with a fast countdown (50ms ticks, no final results).
    pub async fn new() -> Self {
        Self::from_config(ServerConfig {
            race: RaceConfig {
                countdown_from: 3,
                tick_millis: 50,
                test_duration_secs: 0,
            },
            ..ServerConfig::default()
        })
        .await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a ClientMessage from a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Create a room and consume the creator's RoomCreated and Leaderboard.
pub async fn ws_create_room(stream: &mut WsStream, room_id: &str, name: &str) -> RoomCreatedMsg {
    let msg = ClientMessage::CreateRoom(CreateRoomMsg {
        room_id: room_id.to_string(),
        display_name: name.to_string(),
        room_name: None,
    });
    ws_send_client_msg(stream, &msg).await;

    let created = match ws_read_server_msg(stream).await {
        ServerMessage::RoomCreated(created) => created,
        other => panic!("Expected RoomCreated, got: {other:?}"),
    };
    match ws_read_server_msg(stream).await {
        ServerMessage::Leaderboard(_) => {},
        other => panic!("Expected Leaderboard, got: {other:?}"),
    }
    created
}

/// Send a JoinRoom without reading the reply.
pub async fn ws_send_join(stream: &mut WsStream, room_id: &str, name: &str) {
    let msg = ClientMessage::JoinRoom(JoinRoomMsg {
        room_id: room_id.to_string(),
        display_name: name.to_string(),
    });
    ws_send_client_msg(stream, &msg).await;
}

/// Join a room and consume the joiner's RoomJoined and PlayerJoined.
pub async fn ws_join_room(stream: &mut WsStream, room_id: &str, name: &str) -> RoomJoinedMsg {
    ws_send_join(stream, room_id, name).await;

    let joined = match ws_read_server_msg(stream).await {
        ServerMessage::RoomJoined(joined) => joined,
        other => panic!("Expected RoomJoined, got: {other:?}"),
    };
    match ws_read_server_msg(stream).await {
        ServerMessage::PlayerJoined(_) => {},
        other => panic!("Expected PlayerJoined, got: {other:?}"),
    }
    joined
}

pub async fn ws_update_progress(
    stream: &mut WsStream,
    room_id: &str,
    typed_text: &str,
    wpm: f64,
    accuracy: f64,
) {
    let msg = ClientMessage::UpdateProgress(UpdateProgressMsg {
        room_id: room_id.to_string(),
        typed_text: typed_text.to_string(),
        wpm,
        accuracy,
    });
    ws_send_client_msg(stream, &msg).await;
}

pub async fn ws_start_test(stream: &mut WsStream, room_id: &str) {
    let msg = ClientMessage::StartTest(StartTestMsg {
        room_id: room_id.to_string(),
    });
    ws_send_client_msg(stream, &msg).await;
}

pub async fn ws_leave_room(stream: &mut WsStream, room_id: &str) {
    let msg = ClientMessage::LeaveRoom(LeaveRoomMsg {
        room_id: room_id.to_string(),
    });
    ws_send_client_msg(stream, &msg).await;
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Read messages until one matches, discarding the rest.
pub async fn ws_read_until<F>(stream: &mut WsStream, mut pred: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    loop {
        let msg = ws_read_server_msg(stream).await;
        if pred(&msg) {
            return msg;
        }
    }
}

/// Poll `/health` until the active room count matches, or give up after 2s.
pub async fn wait_for_active_rooms(server: &TestServer, expected: u64) -> serde_json::Value {
    let url = format!("{}/health", server.base_url());
    let mut last = serde_json::Value::Null;
    for _ in 0..40 {
        last = reqwest::get(&url).await.unwrap().json().await.unwrap();
        if last["rooms"]["active"] == expected {
            return last;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    last
}
