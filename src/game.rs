//! Per-game round controller.
//!
//! Each session runs as one tokio task owning its `GameSession`.
//! Commands arrive on an mpsc channel and are processed one at a time,
//! so all mutations for a game are serialized; events leave on a
//! broadcast channel in mutation order. Different games are fully
//! independent tasks.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, mpsc, watch};

use crate::errors::GameError;
use crate::options;
use crate::session::GameSession;
use crate::types::{GameSettings, RoundPhase, ServerMsg, SessionPhase, Song};

/// Commands the WebSocket layer sends to a game task.
#[derive(Debug, Clone)]
pub enum GameCommand {
    Join {
        socket_id: String,
        player_name: String,
    },
    StartGame {
        socket_id: String,
    },
    ShowOptions {
        socket_id: String,
        song_index: usize,
    },
    SubmitAnswer {
        socket_id: String,
        option_index: usize,
        response_time_ms: u64,
    },
    RevealAnswer {
        socket_id: String,
        song_index: usize,
    },
    NextSong {
        socket_id: String,
    },
    EndGame {
        socket_id: String,
    },
    LeaveGame {
        socket_id: String,
    },
    KickPlayer {
        socket_id: String,
        player_id: String,
    },
    Rejoin {
        socket_id: String,
        player_name: String,
    },
    PlayerDisconnect {
        socket_id: String,
    },
    HostDisconnect {
        socket_id: String,
    },
    /// Fired by the spawned deadline timer; ignored when stale.
    AnswerDeadline {
        song_index: usize,
    },
    /// Fired after the disconnect grace window; removes the player if
    /// they never came back.
    DisconnectSweep {
        player_id: String,
    },
}

/// Events flowing from a game task to WebSocket connections.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// Send a message to a specific socket.
    SendTo { socket_id: String, msg: ServerMsg },
    /// Broadcast a message to all sockets in the game.
    Broadcast { msg: ServerMsg },
    /// Broadcast a message to all except one socket.
    BroadcastExcept { exclude: String, msg: ServerMsg },
    /// Remove a socket from the game after delivering the message.
    KickSocket { socket_id: String, msg: ServerMsg },
}

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 6;

/// 6 characters from A-Z0-9. Compared case-insensitively via
/// [`Registry::find`].
fn create_game_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

/// Registry of all live games plus socket routing tables.
pub struct Registry {
    /// game code -> handle
    pub games: dashmap::DashMap<String, GameHandle>,
    /// socket_id -> game code (player sockets)
    pub player_sockets: dashmap::DashMap<String, String>,
    /// socket_id -> game code (host sockets)
    pub host_sockets: dashmap::DashMap<String, String>,
}

#[derive(Clone)]
pub struct GameHandle {
    pub game_id: String,
    pub cmd_tx: mpsc::Sender<GameCommand>,
    pub event_tx: broadcast::Sender<GameEvent>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            games: dashmap::DashMap::new(),
            player_sockets: dashmap::DashMap::new(),
            host_sockets: dashmap::DashMap::new(),
        })
    }

    /// Case-insensitive lookup by game code.
    pub fn find(&self, code: &str) -> Option<GameHandle> {
        let code = code.trim().to_uppercase();
        self.games.get(&code).map(|h| h.clone())
    }

    pub fn remove_game(&self, game_id: &str) {
        self.games.remove(game_id);
        self.player_sockets.retain(|_, gid| gid != game_id);
        self.host_sockets.retain(|_, gid| gid != game_id);
    }
}

/// Everything one game task owns: the authoritative session plus the
/// round-control bookkeeping that never leaves the server.
struct GameRuntime {
    session: GameSession,
    /// The host's full library; distractors are drawn from here, not
    /// just the selected subset.
    library: Vec<Song>,
    /// Library indices of the selected songs, for exclusion during
    /// option generation.
    song_indices: Vec<usize>,
    host_socket_id: String,
    option_set: Option<crate::types::OptionSet>,
    /// Idempotence guard for the reveal transition.
    last_revealed_index: Option<usize>,
    deadline_cancel: Option<watch::Sender<bool>>,
    cmd_tx: mpsc::Sender<GameCommand>,
    disconnect_grace: Duration,
}

impl GameRuntime {
    fn send_to(&self, tx: &broadcast::Sender<GameEvent>, socket_id: &str, msg: ServerMsg) {
        let _ = tx.send(GameEvent::SendTo {
            socket_id: socket_id.to_string(),
            msg,
        });
    }

    fn broadcast(&self, tx: &broadcast::Sender<GameEvent>, msg: ServerMsg) {
        let _ = tx.send(GameEvent::Broadcast { msg });
    }

    fn send_error(&self, tx: &broadcast::Sender<GameEvent>, socket_id: &str, err: GameError) {
        let msg = match err {
            GameError::NotFound => ServerMsg::GameNotFound,
            other => ServerMsg::Error {
                message: other.to_string(),
            },
        };
        self.send_to(tx, socket_id, msg);
    }

    fn is_host(&self, socket_id: &str) -> bool {
        socket_id == self.host_socket_id
    }

    fn cancel_deadline(&mut self) {
        if let Some(cancel) = self.deadline_cancel.take() {
            let _ = cancel.send(true);
        }
    }

    /// Arm the answer deadline for the current song. The timer task
    /// reports back through the command channel so expiry is serialized
    /// with every other mutation, and the stored cancel handle lets
    /// advancing or ending the game kill it deterministically.
    fn arm_deadline(&mut self) {
        self.cancel_deadline();
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        self.deadline_cancel = Some(cancel_tx);

        let song_index = self.session.current_song_index;
        let wait = Duration::from_secs(self.session.settings.answer_time_sec);
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let _ = cmd_tx.send(GameCommand::AnswerDeadline { song_index }).await;
                }
                _ = cancel_rx.changed() => {}
            }
        });
    }
}

/// Create a game, register it and spawn its task. Returns the handle
/// and the initial session snapshot for the `gameCreated` reply.
pub fn create_game(
    registry: Arc<Registry>,
    host_socket_id: String,
    host_name: String,
    settings: GameSettings,
    library: Vec<Song>,
    disconnect_grace: Duration,
) -> (GameHandle, GameSession) {
    let mut rng = rand::rng();
    let mut game_id = create_game_code(&mut rng);
    while registry.games.contains_key(&game_id) {
        game_id = create_game_code(&mut rng);
    }

    let (session, song_indices) = GameSession::new(
        game_id.clone(),
        host_name,
        settings,
        &library,
        &mut rng,
    );

    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let (event_tx, _) = broadcast::channel(256);

    let handle = GameHandle {
        game_id: game_id.clone(),
        cmd_tx: cmd_tx.clone(),
        event_tx: event_tx.clone(),
    };

    registry.games.insert(game_id.clone(), handle.clone());
    registry
        .host_sockets
        .insert(host_socket_id.clone(), game_id.clone());

    let snapshot = session.clone();
    let runtime = GameRuntime {
        session,
        library,
        song_indices,
        host_socket_id,
        option_set: None,
        last_revealed_index: None,
        deadline_cancel: None,
        cmd_tx,
        disconnect_grace,
    };

    let reg = registry.clone();
    tokio::spawn(game_task(runtime, cmd_rx, event_tx, reg));

    tracing::info!(game_id = %game_id, "game created");
    (handle, snapshot)
}

async fn game_task(
    mut rt: GameRuntime,
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    event_tx: broadcast::Sender<GameEvent>,
    registry: Arc<Registry>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let done = match cmd {
            GameCommand::Join {
                socket_id,
                player_name,
            } => {
                handle_join(&mut rt, &event_tx, &registry, socket_id, player_name);
                false
            }
            GameCommand::StartGame { socket_id } => {
                handle_start(&mut rt, &event_tx, &socket_id);
                false
            }
            GameCommand::ShowOptions {
                socket_id,
                song_index,
            } => {
                handle_show_options(&mut rt, &event_tx, &socket_id, song_index);
                false
            }
            GameCommand::SubmitAnswer {
                socket_id,
                option_index,
                response_time_ms,
            } => {
                handle_submit(&mut rt, &event_tx, &socket_id, option_index, response_time_ms);
                false
            }
            GameCommand::RevealAnswer {
                socket_id,
                song_index,
            } => {
                handle_host_reveal(&mut rt, &event_tx, &socket_id, song_index);
                false
            }
            GameCommand::NextSong { socket_id } => {
                handle_next(&mut rt, &event_tx, &socket_id);
                false
            }
            GameCommand::EndGame { socket_id } => {
                handle_end(&mut rt, &event_tx, &registry, &socket_id)
            }
            GameCommand::LeaveGame { socket_id } => {
                handle_leave(&mut rt, &event_tx, &registry, &socket_id);
                false
            }
            GameCommand::KickPlayer {
                socket_id,
                player_id,
            } => {
                handle_kick(&mut rt, &event_tx, &registry, &socket_id, &player_id);
                false
            }
            GameCommand::Rejoin {
                socket_id,
                player_name,
            } => {
                handle_rejoin(&mut rt, &event_tx, &registry, socket_id, &player_name);
                false
            }
            GameCommand::PlayerDisconnect { socket_id } => {
                handle_player_disconnect(&mut rt, &event_tx, &registry, &socket_id);
                false
            }
            GameCommand::HostDisconnect { socket_id } => {
                handle_host_disconnect(&mut rt, &event_tx, &registry, &socket_id)
            }
            GameCommand::AnswerDeadline { song_index } => {
                handle_deadline(&mut rt, &event_tx, song_index);
                false
            }
            GameCommand::DisconnectSweep { player_id } => {
                handle_disconnect_sweep(&mut rt, &event_tx, &registry, &player_id);
                false
            }
        };
        if done {
            break;
        }
    }

    registry.remove_game(&rt.session.id);
    tracing::info!(game_id = %rt.session.id, "game task ended");
}

/// Late arrivals mid-round still need the current options to answer.
fn send_current_options(rt: &GameRuntime, tx: &broadcast::Sender<GameEvent>, socket_id: &str) {
    if rt.session.round != RoundPhase::OptionsShown {
        return;
    }
    if let Some(set) = &rt.option_set {
        rt.send_to(
            tx,
            socket_id,
            ServerMsg::KahootOptions {
                options: set.options.clone(),
                correct_index: set.correct_index,
            },
        );
    }
}

fn handle_join(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    registry: &Arc<Registry>,
    socket_id: String,
    player_name: String,
) {
    match rt.session.join(socket_id.clone(), &player_name) {
        Ok(player) => {
            registry
                .player_sockets
                .insert(socket_id.clone(), rt.session.id.clone());
            rt.send_to(
                tx,
                &socket_id,
                ServerMsg::GameJoined {
                    game_id: rt.session.id.clone(),
                    session: rt.session.clone(),
                    player,
                },
            );
            rt.broadcast(
                tx,
                ServerMsg::PlayerJoined {
                    session: rt.session.clone(),
                },
            );
            send_current_options(rt, tx, &socket_id);
            tracing::info!(game_id = %rt.session.id, player = %player_name, "player joined");
        }
        Err(err) => {
            tracing::debug!(game_id = %rt.session.id, player = %player_name, %err, "join rejected");
            rt.send_error(tx, &socket_id, err);
        }
    }
}

fn handle_start(rt: &mut GameRuntime, tx: &broadcast::Sender<GameEvent>, socket_id: &str) {
    if !rt.is_host(socket_id) {
        rt.send_error(tx, socket_id, GameError::NotHost);
        return;
    }
    match rt.session.start() {
        Ok(()) => {
            rt.broadcast(
                tx,
                ServerMsg::GameStarted {
                    session: rt.session.clone(),
                },
            );
            tracing::info!(game_id = %rt.session.id, "game started");
        }
        Err(err) => rt.send_error(tx, socket_id, err),
    }
}

fn handle_show_options(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    socket_id: &str,
    song_index: usize,
) {
    if !rt.is_host(socket_id) {
        rt.send_error(tx, socket_id, GameError::NotHost);
        return;
    }
    if rt.session.phase != SessionPhase::InProgress || song_index != rt.session.current_song_index
    {
        rt.send_error(tx, socket_id, GameError::InvalidState);
        return;
    }
    // Idempotent: a repeated trigger while the options are already out
    // is a no-op, never a regeneration.
    if rt.session.round == RoundPhase::OptionsShown
        && rt.option_set.as_ref().map(|o| o.song_index) == Some(song_index)
    {
        return;
    }
    if !matches!(rt.session.round, RoundPhase::Idle | RoundPhase::ClipPlaying) {
        rt.send_error(tx, socket_id, GameError::InvalidState);
        return;
    }

    let Some(correct) = rt.session.current_song().cloned() else {
        rt.send_error(tx, socket_id, GameError::InvalidState);
        return;
    };
    let exclude = rt.song_indices.get(song_index).copied();
    let set = {
        let mut rng = rand::rng();
        options::generate(song_index, &correct, &rt.library, exclude, &mut rng)
    };

    rt.session.round = RoundPhase::OptionsShown;
    rt.option_set = Some(set.clone());
    rt.arm_deadline();

    // Only players receive the options; the host triggered them.
    let _ = tx.send(GameEvent::BroadcastExcept {
        exclude: rt.host_socket_id.clone(),
        msg: ServerMsg::KahootOptions {
            options: set.options,
            correct_index: set.correct_index,
        },
    });
}

fn handle_submit(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    socket_id: &str,
    option_index: usize,
    response_time_ms: u64,
) {
    let Some(set) = rt.option_set.clone() else {
        rt.send_error(tx, socket_id, GameError::InvalidState);
        return;
    };
    match rt
        .session
        .record_answer(socket_id, option_index, response_time_ms, set.correct_index)
    {
        Ok(_) => {
            rt.broadcast(
                tx,
                ServerMsg::PlayerAnswered {
                    answered_count: rt.session.answered_count(),
                    total_players: rt.session.connected_count(),
                },
            );
            if rt.session.all_answered() {
                reveal(rt, tx, RevealTrigger::AllAnswered);
            }
        }
        Err(err) => rt.send_error(tx, socket_id, err),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum RevealTrigger {
    AllAnswered,
    Deadline,
    Host,
}

/// OptionsShown -> Revealed. Idempotent per song via
/// `last_revealed_index`; fills non-answers, applies scores and emits
/// the reveal sequence in causal order.
fn reveal(rt: &mut GameRuntime, tx: &broadcast::Sender<GameEvent>, trigger: RevealTrigger) {
    let idx = rt.session.current_song_index;
    if rt.last_revealed_index == Some(idx) || rt.session.round != RoundPhase::OptionsShown {
        return;
    }
    let Some(set) = rt.option_set.clone() else {
        debug_assert!(false, "OptionsShown without an option set");
        return;
    };

    rt.cancel_deadline();
    rt.last_revealed_index = Some(idx);
    let results = rt.session.finish_round();
    let correct_answer = set.options[set.correct_index].text.clone();

    let notice = match trigger {
        RevealTrigger::AllAnswered => ServerMsg::AllPlayersAnswered {
            session: rt.session.clone(),
        },
        _ => ServerMsg::AnswerTimeExpired {
            session: rt.session.clone(),
        },
    };
    rt.broadcast(tx, notice);

    for (player_id, record) in results {
        let total_score = rt.session.player(&player_id).map(|p| p.score).unwrap_or(0);
        rt.send_to(
            tx,
            &player_id,
            ServerMsg::AnswerResult {
                player_id: player_id.clone(),
                is_correct: record.is_correct,
                points: record.points,
                total_score,
                correct_answer: correct_answer.clone(),
            },
        );
    }

    rt.broadcast(
        tx,
        ServerMsg::RevealAnswers {
            session: rt.session.clone(),
            correct_answer,
        },
    );
    tracing::info!(game_id = %rt.session.id, song_index = idx, "answers revealed");
}

fn handle_host_reveal(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    socket_id: &str,
    song_index: usize,
) {
    if !rt.is_host(socket_id) {
        rt.send_error(tx, socket_id, GameError::NotHost);
        return;
    }
    // Validate against the retained option set, so a late request for a
    // previous song cannot re-reveal anything.
    if song_index != rt.session.current_song_index
        || rt.option_set.as_ref().map(|o| o.song_index) != Some(song_index)
    {
        rt.send_error(tx, socket_id, GameError::InvalidState);
        return;
    }
    reveal(rt, tx, RevealTrigger::Host);
}

fn handle_deadline(rt: &mut GameRuntime, tx: &broadcast::Sender<GameEvent>, song_index: usize) {
    // Stale timers (round already advanced or revealed) are ignored.
    if song_index != rt.session.current_song_index {
        return;
    }
    reveal(rt, tx, RevealTrigger::Deadline);
}

fn handle_next(rt: &mut GameRuntime, tx: &broadcast::Sender<GameEvent>, socket_id: &str) {
    if !rt.is_host(socket_id) {
        rt.send_error(tx, socket_id, GameError::NotHost);
        return;
    }
    if rt.session.round != RoundPhase::Revealed || rt.session.phase != SessionPhase::InProgress {
        rt.send_error(tx, socket_id, GameError::InvalidState);
        return;
    }
    rt.option_set = None;
    if rt.session.advance() {
        rt.broadcast(
            tx,
            ServerMsg::GameEnded {
                session: rt.session.clone(),
            },
        );
        tracing::info!(game_id = %rt.session.id, "game finished");
    } else {
        rt.broadcast(
            tx,
            ServerMsg::NextSong {
                session: rt.session.clone(),
            },
        );
    }
}

fn handle_end(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    registry: &Arc<Registry>,
    socket_id: &str,
) -> bool {
    if !rt.is_host(socket_id) {
        rt.send_error(tx, socket_id, GameError::NotHost);
        return false;
    }
    rt.cancel_deadline();
    rt.session.phase = SessionPhase::Finished;
    rt.broadcast(
        tx,
        ServerMsg::GameEnded {
            session: rt.session.clone(),
        },
    );
    registry.remove_game(&rt.session.id);
    tracing::info!(game_id = %rt.session.id, "game ended by host");
    true
}

/// Reveal early if the departing player was the last one holding up the
/// round.
fn check_all_answered(rt: &mut GameRuntime, tx: &broadcast::Sender<GameEvent>) {
    if rt.session.round == RoundPhase::OptionsShown && rt.session.all_answered() {
        reveal(rt, tx, RevealTrigger::AllAnswered);
    }
}

fn handle_leave(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    registry: &Arc<Registry>,
    socket_id: &str,
) {
    if rt.session.remove_player(socket_id).is_some() {
        registry.player_sockets.remove(socket_id);
        rt.broadcast(
            tx,
            ServerMsg::PlayerLeft {
                session: rt.session.clone(),
            },
        );
        check_all_answered(rt, tx);
    }
}

fn handle_kick(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    registry: &Arc<Registry>,
    socket_id: &str,
    player_id: &str,
) {
    // Authoritative host check; client-asserted role flags are ignored.
    if !rt.is_host(socket_id) {
        rt.send_error(tx, socket_id, GameError::NotHost);
        return;
    }
    if let Some(player) = rt.session.remove_player(player_id) {
        registry.player_sockets.remove(&player.id);
        let _ = tx.send(GameEvent::KickSocket {
            socket_id: player.id,
            msg: ServerMsg::PlayerKicked {
                reason: "You have been kicked by the host".to_string(),
            },
        });
        rt.broadcast(
            tx,
            ServerMsg::PlayerLeft {
                session: rt.session.clone(),
            },
        );
        check_all_answered(rt, tx);
    }
}

fn handle_player_disconnect(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    registry: &Arc<Registry>,
    socket_id: &str,
) {
    registry.player_sockets.remove(socket_id);
    if rt.session.phase == SessionPhase::Lobby {
        // No score to protect yet; drop the player immediately.
        handle_leave(rt, tx, registry, socket_id);
        return;
    }
    if let Some(player) = rt.session.player_mut(socket_id) {
        player.connected = false;
        let player_id = player.id.clone();
        let grace = rt.disconnect_grace;
        let cmd_tx = rt.cmd_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = cmd_tx.send(GameCommand::DisconnectSweep { player_id }).await;
        });
        check_all_answered(rt, tx);
    }
}

fn handle_disconnect_sweep(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    registry: &Arc<Registry>,
    player_id: &str,
) {
    let still_gone = rt
        .session
        .player(player_id)
        .map(|p| !p.connected)
        .unwrap_or(false);
    if still_gone {
        tracing::info!(game_id = %rt.session.id, player_id, "removing player after grace window");
        handle_leave(rt, tx, registry, player_id);
    }
}

fn handle_host_disconnect(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    registry: &Arc<Registry>,
    socket_id: &str,
) -> bool {
    if !rt.is_host(socket_id) {
        return false;
    }
    // No host migration: the session dies with the host's connection.
    rt.cancel_deadline();
    rt.broadcast(
        tx,
        ServerMsg::GameDeleted {
            message: "The host has left the game".to_string(),
        },
    );
    registry.remove_game(&rt.session.id);
    tracing::info!(game_id = %rt.session.id, "host disconnected, game deleted");
    true
}

fn handle_rejoin(
    rt: &mut GameRuntime,
    tx: &broadcast::Sender<GameEvent>,
    registry: &Arc<Registry>,
    socket_id: String,
    player_name: &str,
) {
    if rt.session.phase == SessionPhase::Finished {
        rt.send_to(tx, &socket_id, ServerMsg::GameNotFound);
        return;
    }
    // Identity is (game, name); the old connection-scoped id is stale by
    // definition.
    let Some(player) = rt.session.player_by_name_mut(player_name) else {
        rt.send_to(tx, &socket_id, ServerMsg::GameNotFound);
        return;
    };
    if player.connected {
        rt.send_to(
            tx,
            &socket_id,
            ServerMsg::Error {
                message: "Player is already connected".to_string(),
            },
        );
        return;
    }

    let old_id = std::mem::replace(&mut player.id, socket_id.clone());
    player.connected = true;
    let player_snapshot = player.clone();

    registry.player_sockets.remove(&old_id);
    registry
        .player_sockets
        .insert(socket_id.clone(), rt.session.id.clone());

    rt.send_to(
        tx,
        &socket_id,
        ServerMsg::RejoinSuccess {
            session: rt.session.clone(),
            player: player_snapshot.clone(),
        },
    );

    // Mid-round rejoiners who have not answered yet get the options again.
    let answered = player_snapshot
        .answers
        .iter()
        .any(|a| a.song_index == rt.session.current_song_index);
    if !answered {
        send_current_options(rt, tx, &socket_id);
    }

    rt.broadcast(
        tx,
        ServerMsg::PlayerJoined {
            session: rt.session.clone(),
        },
    );
    tracing::info!(game_id = %rt.session.id, player = %player_name, "player rejoined");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn game_codes_use_the_full_alphabet() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            let code = create_game_code(&mut rng);
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn registry_lookup_is_case_insensitive() {
        let registry = Registry::new();
        let (cmd_tx, _cmd_rx) = mpsc::channel(1);
        let (event_tx, _) = broadcast::channel(1);
        registry.games.insert(
            "AB12CD".to_string(),
            GameHandle {
                game_id: "AB12CD".to_string(),
                cmd_tx,
                event_tx,
            },
        );
        assert!(registry.find("ab12cd").is_some());
        assert!(registry.find(" AB12cd ").is_some());
        assert!(registry.find("ZZZZZZ").is_none());
    }
}
