use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use poker_server::coordinator::ConnId;
use poker_server::protocol::ServerMessage;
use poker_server::{CoordinatorHandle, TournamentConfig};

#[derive(Clone)]
struct AppState {
    coordinator: CoordinatorHandle,
    outbound_queue_capacity: usize,
    next_conn_id: Arc<AtomicU64>,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id: ConnId = state.next_conn_id.fetch_add(1, Ordering::Relaxed);
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(state.outbound_queue_capacity);

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(err) => {
                    warn!(?err, "failed to serialize outbound message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    state.coordinator.connected(conn_id, outbound_tx).await;

    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => state.coordinator.inbound(conn_id, text).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }

    state.coordinator.disconnected(conn_id).await;
    let _ = writer.await;
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let config = TournamentConfig::parse();
    let addr: SocketAddr = config.listen_addr.parse().expect("--listen-addr must be host:port");
    let outbound_queue_capacity = config.outbound_queue_capacity;

    let coordinator = poker_server::spawn(config);
    let state = AppState {
        coordinator,
        outbound_queue_capacity,
        next_conn_id: Arc::new(AtomicU64::new(0)),
    };

    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);

    info!(%addr, "starting tournament server");
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind listen address");
    axum::serve(listener, app).await.expect("server error");
}
