//! Client-side session mirror.
//!
//! A best-effort cache of the server's `GameSession`, folded from the
//! event stream and used only for rendering. It never originates game
//! state; any snapshot in a server message simply replaces what is here.

use crate::session::GameSession;
use crate::types::{AnswerOption, ServerMsg};

/// The last per-player answer outcome, kept for the result screen.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub points: u32,
    pub total_score: u32,
    pub correct_answer: String,
}

#[derive(Debug, Default)]
pub struct SessionMirror {
    pub session: Option<GameSession>,
    /// The options currently on screen, with the correct index.
    pub options: Option<(Vec<AnswerOption>, usize)>,
    pub last_result: Option<AnswerOutcome>,
    pub answered_count: usize,
    pub total_players: usize,
    /// Set when the session is gone (host left, kicked, not found).
    pub closed_reason: Option<String>,
}

impl SessionMirror {
    pub fn new() -> Self {
        Self::default()
    }

    fn replace_session(&mut self, session: &GameSession) {
        self.session = Some(session.clone());
    }

    fn close(&mut self, reason: String) {
        *self = Self {
            closed_reason: Some(reason),
            ..Self::default()
        };
    }

    /// Fold one server message into the cache.
    pub fn apply(&mut self, msg: &ServerMsg) {
        match msg {
            ServerMsg::GameCreated { session, .. }
            | ServerMsg::GameJoined { session, .. }
            | ServerMsg::PlayerJoined { session }
            | ServerMsg::PlayerLeft { session }
            | ServerMsg::GameStarted { session }
            | ServerMsg::AllPlayersAnswered { session }
            | ServerMsg::AnswerTimeExpired { session }
            | ServerMsg::GameEnded { session }
            | ServerMsg::RejoinSuccess { session, .. } => {
                self.replace_session(session);
            }
            ServerMsg::NextSong { session } => {
                self.replace_session(session);
                // New round: the previous round's widgets are void.
                self.options = None;
                self.last_result = None;
                self.answered_count = 0;
            }
            ServerMsg::KahootOptions {
                options,
                correct_index,
            } => {
                self.options = Some((options.clone(), *correct_index));
            }
            ServerMsg::PlayerAnswered {
                answered_count,
                total_players,
            } => {
                self.answered_count = *answered_count;
                self.total_players = *total_players;
            }
            ServerMsg::AnswerResult {
                is_correct,
                points,
                total_score,
                correct_answer,
                ..
            } => {
                self.last_result = Some(AnswerOutcome {
                    is_correct: *is_correct,
                    points: *points,
                    total_score: *total_score,
                    correct_answer: correct_answer.clone(),
                });
            }
            ServerMsg::RevealAnswers { session, .. } => {
                self.replace_session(session);
            }
            ServerMsg::GameDeleted { message } => self.close(message.clone()),
            ServerMsg::PlayerKicked { reason } => self.close(reason.clone()),
            ServerMsg::GameNotFound => self.close("Game not found".to_string()),
            ServerMsg::Error { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GameSettings, RoundPhase, SessionPhase, unix_ms};

    fn snapshot(phase: SessionPhase, song_index: usize) -> GameSession {
        GameSession {
            id: "AB12CD".into(),
            host_name: "Host".into(),
            settings: GameSettings::default(),
            players: Vec::new(),
            songs: Vec::new(),
            current_song_index: song_index,
            phase,
            round: RoundPhase::Idle,
            created_at_ms: unix_ms(),
        }
    }

    #[test]
    fn snapshots_replace_the_cached_session() {
        let mut mirror = SessionMirror::new();
        mirror.apply(&ServerMsg::GameStarted {
            session: snapshot(SessionPhase::InProgress, 0),
        });
        assert_eq!(
            mirror.session.as_ref().unwrap().phase,
            SessionPhase::InProgress
        );

        mirror.apply(&ServerMsg::NextSong {
            session: snapshot(SessionPhase::InProgress, 1),
        });
        assert_eq!(mirror.session.as_ref().unwrap().current_song_index, 1);
    }

    #[test]
    fn next_song_clears_round_widgets() {
        let mut mirror = SessionMirror::new();
        mirror.apply(&ServerMsg::KahootOptions {
            options: vec![
                AnswerOption {
                    text: "A".into(),
                    is_correct: true,
                };
                4
            ],
            correct_index: 0,
        });
        mirror.apply(&ServerMsg::AnswerResult {
            player_id: "p0".into(),
            is_correct: true,
            points: 900,
            total_score: 900,
            correct_answer: "A".into(),
        });
        assert!(mirror.options.is_some());
        assert!(mirror.last_result.is_some());

        mirror.apply(&ServerMsg::NextSong {
            session: snapshot(SessionPhase::InProgress, 1),
        });
        assert!(mirror.options.is_none());
        assert!(mirror.last_result.is_none());
        assert_eq!(mirror.answered_count, 0);
    }

    #[test]
    fn answered_progress_is_tracked() {
        let mut mirror = SessionMirror::new();
        mirror.apply(&ServerMsg::PlayerAnswered {
            answered_count: 2,
            total_players: 3,
        });
        assert_eq!((mirror.answered_count, mirror.total_players), (2, 3));
    }

    #[test]
    fn game_deleted_resets_everything() {
        let mut mirror = SessionMirror::new();
        mirror.apply(&ServerMsg::GameStarted {
            session: snapshot(SessionPhase::InProgress, 0),
        });
        mirror.apply(&ServerMsg::GameDeleted {
            message: "The host has left the game".into(),
        });
        assert!(mirror.session.is_none());
        assert!(mirror.options.is_none());
        assert_eq!(
            mirror.closed_reason.as_deref(),
            Some("The host has left the game")
        );
    }

    #[test]
    fn errors_do_not_disturb_the_cache() {
        let mut mirror = SessionMirror::new();
        mirror.apply(&ServerMsg::GameStarted {
            session: snapshot(SessionPhase::InProgress, 0),
        });
        mirror.apply(&ServerMsg::Error {
            message: "whatever".into(),
        });
        assert!(mirror.session.is_some());
    }
}
