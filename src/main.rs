use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::{Mutex, broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use tunerush::config::ServerConfig;
use tunerush::game::{self, GameCommand, GameEvent, Registry};
use tunerush::types::{ClientMsg, ServerMsg};

#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    config: ServerConfig,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    let socket_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(socket_id = %socket_id, "websocket connected");

    // Event subscriptions are created in the message-handling path
    // below, before the command that triggers the reply is sent, and
    // handed to the forwarding task over this channel. A broadcast
    // receiver only sees events sent after it subscribes, so the
    // subscription must exist before the game task can answer.
    let (sub_tx, mut sub_rx) = mpsc::unbounded_channel::<broadcast::Receiver<GameEvent>>();

    let sender_clone = sender.clone();
    let socket_id_clone = socket_id.clone();

    let event_task = tokio::spawn(async move {
        'games: while let Some(mut event_rx) = sub_rx.recv().await {
            loop {
                let event = tokio::select! {
                    next = sub_rx.recv() => match next {
                        // The socket moved to another game; follow it.
                        Some(rx) => {
                            event_rx = rx;
                            continue;
                        }
                        None => break 'games,
                    },
                    received = event_rx.recv() => match received {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        // Game ended; wait in case this socket joins another.
                        Err(broadcast::error::RecvError::Closed) => continue 'games,
                    },
                };

                let should_send = match &event {
                    GameEvent::SendTo { socket_id, .. } => *socket_id == socket_id_clone,
                    GameEvent::Broadcast { .. } => true,
                    GameEvent::BroadcastExcept { exclude, .. } => *exclude != socket_id_clone,
                    GameEvent::KickSocket { socket_id, .. } => *socket_id == socket_id_clone,
                };
                let kicked = matches!(
                    &event,
                    GameEvent::KickSocket { socket_id, .. } if *socket_id == socket_id_clone
                );

                if should_send {
                    let msg = match &event {
                        GameEvent::SendTo { msg, .. }
                        | GameEvent::Broadcast { msg, .. }
                        | GameEvent::BroadcastExcept { msg, .. }
                        | GameEvent::KickSocket { msg, .. } => msg,
                    };

                    if let Ok(json) = serde_json::to_string(msg) {
                        let mut s = sender_clone.lock().await;
                        if s.send(Message::Text(json.into())).await.is_err() {
                            return;
                        }
                    }
                }

                if kicked {
                    continue 'games;
                }
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else { continue };

        let client_msg: ClientMsg = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(%err, "invalid client message");
                continue;
            }
        };

        match client_msg {
            ClientMsg::CreateGame {
                host_name,
                settings,
                songs_metadata,
            } => {
                let (handle, session) = game::create_game(
                    state.registry.clone(),
                    socket_id.clone(),
                    host_name,
                    settings,
                    songs_metadata,
                    state.config.disconnect_grace,
                );
                let _ = sub_tx.send(handle.event_tx.subscribe());
                send_msg(
                    &sender,
                    &ServerMsg::GameCreated {
                        game_id: handle.game_id.clone(),
                        session,
                    },
                )
                .await;
            }

            ClientMsg::JoinGame {
                game_id,
                player_name,
            } => match state.registry.find(&game_id) {
                Some(handle) => {
                    // Subscribe first: the reply is broadcast as soon as
                    // the game task picks up the command.
                    let _ = sub_tx.send(handle.event_tx.subscribe());
                    let _ = handle
                        .cmd_tx
                        .send(GameCommand::Join {
                            socket_id: socket_id.clone(),
                            player_name,
                        })
                        .await;
                }
                None => send_msg(&sender, &ServerMsg::GameNotFound).await,
            },

            ClientMsg::RejoinGame {
                game_id,
                player_name,
                ..
            } => match state.registry.find(&game_id) {
                Some(handle) => {
                    let _ = sub_tx.send(handle.event_tx.subscribe());
                    let _ = handle
                        .cmd_tx
                        .send(GameCommand::Rejoin {
                            socket_id: socket_id.clone(),
                            player_name,
                        })
                        .await;
                }
                None => send_msg(&sender, &ServerMsg::GameNotFound).await,
            },

            ClientMsg::StartGame { game_id } => {
                forward(
                    &state,
                    &game_id,
                    GameCommand::StartGame {
                        socket_id: socket_id.clone(),
                    },
                )
                .await;
            }

            ClientMsg::ShowOptions {
                game_id,
                song_index,
            } => {
                forward(
                    &state,
                    &game_id,
                    GameCommand::ShowOptions {
                        socket_id: socket_id.clone(),
                        song_index,
                    },
                )
                .await;
            }

            // The submitting player is whoever owns this socket; the
            // player id in the payload is not trusted.
            ClientMsg::SubmitAnswer {
                game_id,
                option_index,
                response_time_ms,
                ..
            } => {
                forward(
                    &state,
                    &game_id,
                    GameCommand::SubmitAnswer {
                        socket_id: socket_id.clone(),
                        option_index,
                        response_time_ms,
                    },
                )
                .await;
            }

            ClientMsg::RevealAnswer {
                game_id,
                song_index,
            } => {
                forward(
                    &state,
                    &game_id,
                    GameCommand::RevealAnswer {
                        socket_id: socket_id.clone(),
                        song_index,
                    },
                )
                .await;
            }

            ClientMsg::NextSong { game_id } => {
                forward(
                    &state,
                    &game_id,
                    GameCommand::NextSong {
                        socket_id: socket_id.clone(),
                    },
                )
                .await;
            }

            ClientMsg::EndGame { game_id } => {
                forward(
                    &state,
                    &game_id,
                    GameCommand::EndGame {
                        socket_id: socket_id.clone(),
                    },
                )
                .await;
            }

            ClientMsg::LeaveGame { game_id, .. } => {
                forward(
                    &state,
                    &game_id,
                    GameCommand::LeaveGame {
                        socket_id: socket_id.clone(),
                    },
                )
                .await;
            }

            ClientMsg::KickPlayer { game_id, player_id } => {
                forward(
                    &state,
                    &game_id,
                    GameCommand::KickPlayer {
                        socket_id: socket_id.clone(),
                        player_id,
                    },
                )
                .await;
            }
        }
    }

    tracing::debug!(socket_id = %socket_id, "websocket disconnected");
    event_task.abort();

    // Clone the handles out before awaiting so no registry shard lock is
    // held while the game task may be mutating the same maps.
    let hosted = state
        .registry
        .host_sockets
        .get(&socket_id)
        .and_then(|game_id| state.registry.find(game_id.value()));
    if let Some(handle) = hosted {
        let _ = handle
            .cmd_tx
            .send(GameCommand::HostDisconnect {
                socket_id: socket_id.clone(),
            })
            .await;
    }

    let played = state
        .registry
        .player_sockets
        .get(&socket_id)
        .and_then(|game_id| state.registry.find(game_id.value()));
    if let Some(handle) = played {
        let _ = handle
            .cmd_tx
            .send(GameCommand::PlayerDisconnect {
                socket_id: socket_id.clone(),
            })
            .await;
    }
}

async fn forward(state: &AppState, game_id: &str, cmd: GameCommand) {
    if let Some(handle) = state.registry.find(game_id) {
        let _ = handle.cmd_tx.send(cmd).await;
    }
}

async fn send_msg(sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>, msg: &ServerMsg) {
    if let Ok(json) = serde_json::to_string(msg) {
        let mut s = sender.lock().await;
        let _ = s.send(Message::Text(json.into())).await;
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let state = AppState {
        registry: Registry::new(),
        config: config.clone(),
    };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("Failed to bind");

    tracing::info!("tunerush server running on port {}", config.port);

    axum::serve(listener, app).await.unwrap();
}
