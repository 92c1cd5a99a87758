use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::relay::{ConnectionId, RelayService};
use tandem_core::ParticipantId;

#[derive(Deserialize)]
pub struct ConnectParams {
    /// Identifier the connection is reachable under. A connection without
    /// one is accepted but never registered as a target.
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

pub fn router(service: RelayService) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(service)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    let identity = params
        .user_id
        .filter(|id| !id.is_empty())
        .map(ParticipantId::from);

    ws.on_upgrade(move |socket| handle_socket(socket, identity, service))
}

async fn handle_socket(socket: WebSocket, identity: Option<ParticipantId>, service: RelayService) {
    info!("new signaling connection: {:?}", identity);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = ConnectionId::new();

    if let Some(id) = &identity {
        service.register(id.clone(), conn, tx);
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => service.forward(text.as_str()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    if let Some(id) = &identity {
        service.unregister(id, conn);
    }
    info!("signaling connection closed: {:?}", identity);
}
