use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use typerace_core::net::messages::ClientMessage;
use typerace_core::net::protocol::{MAX_MESSAGE_SIZE, decode_client_message};
use typerace_core::participant::ConnectionId;

use crate::error::RoomError;
use crate::room_manager::RoomManager;
use crate::state::{AppState, ConnectionGuard, SharedRoomManager};

/// Transport-level read cap. Frames between `MAX_MESSAGE_SIZE` and this cap
/// are dropped by the read loop; only larger ones close the socket.
const WS_READ_LIMIT: usize = 4 * MAX_MESSAGE_SIZE;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    // Counted from the handshake, not from the first frame.
    let guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    ws.max_message_size(WS_READ_LIMIT)
        .max_frame_size(WS_READ_LIMIT)
        .on_upgrade(move |socket| handle_socket(socket, state, guard))
        .into_response()
}

async fn handle_socket(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    let connection_id = Uuid::new_v4();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);

    state.rooms.write().await.connect(connection_id, tx);
    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state.rooms, connection_id).await;

    // Dropping the gateway's sender ends the writer task.
    state.rooms.write().await.disconnect(connection_id);
}

fn spawn_writer(mut ws_sender: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Bytes>) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });
}

async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    rooms: &SharedRoomManager,
    connection_id: ConnectionId,
) {
    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if data.is_empty() {
            continue;
        }
        if data.len() > MAX_MESSAGE_SIZE {
            tracing::debug!(
                connection_id = %connection_id, size = data.len(),
                "Dropping oversized frame"
            );
            continue;
        }

        let client_msg = match decode_client_message(&data) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection_id, error = %e,
                    "Dropping undecodable frame"
                );
                continue;
            },
        };

        let mut mgr = rooms.write().await;
        if let Err(e) = dispatch(&mut mgr, rooms, connection_id, client_msg) {
            tracing::warn!(connection_id = %connection_id, error = %e, "Rejected client action");
            mgr.send_error(&connection_id, &e);
        }
    }
}

/// Route one decoded client action to the room manager.
fn dispatch(
    mgr: &mut RoomManager,
    rooms: &SharedRoomManager,
    connection_id: ConnectionId,
    msg: ClientMessage,
) -> Result<(), RoomError> {
    match msg {
        ClientMessage::CreateRoom(m) => mgr.create_room(connection_id, m),
        ClientMessage::JoinRoom(m) => mgr.join_room(connection_id, m),
        ClientMessage::UpdateProgress(m) => {
            mgr.update_progress(connection_id, m);
            Ok(())
        },
        ClientMessage::StartTest(m) => mgr.start_test(connection_id, &m.room_id, rooms),
        ClientMessage::LeaveRoom(m) => {
            mgr.leave_room(connection_id, &m.room_id);
            Ok(())
        },
    }
}
