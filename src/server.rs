use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;

use crate::error::GameError;
use crate::hub::Hub;
use crate::protocol::{Request, ServerMessage};
use crate::room::ConnId;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const COMMAND_QUEUE: usize = 1024;

/// Inbound events, multiplexed from every connection onto the single
/// hub-processing task.
#[derive(Debug)]
pub enum HubCommand {
    Connect {
        conn: ConnId,
        tx: mpsc::UnboundedSender<String>,
    },
    Frame {
        conn: ConnId,
        text: String,
    },
    Disconnect {
        conn: ConnId,
    },
}

#[derive(Clone)]
pub struct AppState {
    commands: mpsc::Sender<HubCommand>,
    next_conn: Arc<AtomicU64>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Binds `addr` and serves until the process exits. Owns the hub task.
pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let (commands, rx) = mpsc::channel(COMMAND_QUEUE);
    tokio::spawn(run_hub(Hub::new(), rx));

    let state = AppState {
        commands,
        next_conn: Arc::new(AtomicU64::new(1)),
    };
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn root_handler() -> &'static str {
    "Reversi multiplayer server is running."
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let conn = ConnId(state.next_conn.fetch_add(1, Ordering::Relaxed));
    let commands = state.commands.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, conn, commands))
}

/// The single processing loop: owns the hub and every outbound sender, and
/// handles one command to completion before the next. Requests touching
/// different rooms are serialized here too; room count is bounded by memory,
/// not lock contention.
pub async fn run_hub(mut hub: Hub, mut rx: mpsc::Receiver<HubCommand>) {
    let mut outbound: HashMap<ConnId, mpsc::UnboundedSender<String>> = HashMap::new();
    while let Some(command) = rx.recv().await {
        match command {
            HubCommand::Connect { conn, tx } => {
                outbound.insert(conn, tx);
                info!("{conn} connected ({} active)", outbound.len());
            }
            HubCommand::Frame { conn, text } => {
                let messages = match serde_json::from_str::<Request>(&text) {
                    Ok(request) => hub.handle(conn, request),
                    Err(err) => {
                        debug!("{conn} sent an unparseable frame: {err}");
                        vec![(conn, ServerMessage::error(GameError::BadRequest))]
                    }
                };
                dispatch(&mut outbound, messages);
            }
            HubCommand::Disconnect { conn } => {
                let updates = hub.disconnect(conn);
                outbound.remove(&conn);
                info!("{conn} disconnected ({} active)", outbound.len());
                dispatch(&mut outbound, updates);
            }
        }
    }
}

fn dispatch(
    outbound: &mut HashMap<ConnId, mpsc::UnboundedSender<String>>,
    messages: Vec<(ConnId, ServerMessage)>,
) {
    for (to, message) in messages {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to serialize message for {to}: {err}");
                continue;
            }
        };
        if let Some(tx) = outbound.get(&to) {
            if tx.send(json).is_err() {
                // Writer task is gone; the Disconnect command will follow.
                outbound.remove(&to);
            }
        }
    }
}

/// Per-connection lifecycle: split the socket, forward outbound messages and
/// periodic pings from a writer task, feed inbound text frames to the hub
/// from a reader task, and report the disconnect when either side ends.
async fn handle_socket(socket: WebSocket, conn: ConnId, commands: mpsc::Sender<HubCommand>) {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    if commands
        .send(HubCommand::Connect { conn, tx: out_tx })
        .await
        .is_err()
    {
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping.tick().await; // consume the immediate first tick
        loop {
            tokio::select! {
                message = out_rx.recv() => match message {
                    Some(text) => {
                        if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = ping.tick() => {
                    if ws_tx.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let reader_commands = commands.clone();
    let reader = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_rx.next().await {
            match message {
                WsMessage::Text(text) => {
                    if reader_commands
                        .send(HubCommand::Frame {
                            conn,
                            text: text.to_string(),
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                WsMessage::Close(_) => break,
                // axum answers pings itself
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }
    let _ = commands.send(HubCommand::Disconnect { conn }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomRegistry;

    async fn recv_json(rx: &mut mpsc::UnboundedReceiver<String>) -> serde_json::Value {
        let text = rx.recv().await.expect("expected a message");
        serde_json::from_str(&text).expect("valid JSON")
    }

    #[tokio::test]
    async fn loop_routes_replies_and_broadcasts() {
        let (tx, rx) = mpsc::channel(16);
        let hub = Hub::with_registry(RoomRegistry::with_seed(42));
        tokio::spawn(run_hub(hub, rx));

        let (out1, mut rx1) = mpsc::unbounded_channel();
        let (out2, mut rx2) = mpsc::unbounded_channel();
        let (c1, c2) = (ConnId(1), ConnId(2));
        tx.send(HubCommand::Connect { conn: c1, tx: out1 }).await.unwrap();
        tx.send(HubCommand::Connect { conn: c2, tx: out2 }).await.unwrap();

        tx.send(HubCommand::Frame {
            conn: c1,
            text: r#"{"type":"createRoom"}"#.to_string(),
        })
        .await
        .unwrap();
        let created = recv_json(&mut rx1).await;
        assert_eq!(created["type"], "roomCreated");
        let code = created["code"].as_str().unwrap().to_string();

        tx.send(HubCommand::Frame {
            conn: c2,
            text: format!(r#"{{"type":"joinRoom","code":"{code}"}}"#),
        })
        .await
        .unwrap();
        // Joiner: roomJoined, then the stateUpdated broadcast both receive.
        let joined = recv_json(&mut rx2).await;
        assert_eq!(joined["type"], "roomJoined");
        assert_eq!(joined["yourColor"], "W");
        assert_eq!(recv_json(&mut rx1).await["type"], "stateUpdated");
        assert_eq!(recv_json(&mut rx2).await["type"], "stateUpdated");
    }

    #[tokio::test]
    async fn unparseable_frame_gets_bad_request() {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(run_hub(Hub::new(), rx));

        let (out, mut out_rx) = mpsc::unbounded_channel();
        let conn = ConnId(7);
        tx.send(HubCommand::Connect { conn, tx: out }).await.unwrap();
        tx.send(HubCommand::Frame {
            conn,
            text: "these are not the frames you are looking for".to_string(),
        })
        .await
        .unwrap();

        let reply = recv_json(&mut out_rx).await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["kind"], "badRequest");
    }

    #[tokio::test]
    async fn disconnect_notifies_remaining_player() {
        let (tx, rx) = mpsc::channel(16);
        let hub = Hub::with_registry(RoomRegistry::with_seed(5));
        tokio::spawn(run_hub(hub, rx));

        let (out1, mut rx1) = mpsc::unbounded_channel();
        let (out2, mut rx2) = mpsc::unbounded_channel();
        let (c1, c2) = (ConnId(1), ConnId(2));
        tx.send(HubCommand::Connect { conn: c1, tx: out1 }).await.unwrap();
        tx.send(HubCommand::Connect { conn: c2, tx: out2 }).await.unwrap();

        tx.send(HubCommand::Frame {
            conn: c1,
            text: r#"{"type":"createRoom"}"#.to_string(),
        })
        .await
        .unwrap();
        let code = recv_json(&mut rx1).await["code"].as_str().unwrap().to_string();
        tx.send(HubCommand::Frame {
            conn: c2,
            text: format!(r#"{{"type":"joinRoom","code":"{code}"}}"#),
        })
        .await
        .unwrap();
        assert_eq!(recv_json(&mut rx2).await["type"], "roomJoined");
        assert_eq!(recv_json(&mut rx1).await["type"], "stateUpdated");
        assert_eq!(recv_json(&mut rx2).await["type"], "stateUpdated");

        tx.send(HubCommand::Disconnect { conn: c2 }).await.unwrap();
        let update = recv_json(&mut rx1).await;
        assert_eq!(update["type"], "stateUpdated");
        assert_eq!(update["state"]["status"], "waiting");
        assert_eq!(
            update["state"]["message"],
            "A player disconnected. Waiting for opponent..."
        );
    }
}
