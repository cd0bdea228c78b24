use serde::{Deserialize, Serialize};

use crate::session::GameSession;

/// A song selected for a session. `audio_ref` is an opaque locator (local
/// blob handle or URL) resolved by the host's audio subsystem; the server
/// never dereferences it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub audio_ref: String,
}

/// A scorable participant. The host is not a `Player`; `players[]` in a
/// session holds only scorable participants.
///
/// `id` is connection-scoped and changes on reconnect. Logical identity
/// across reconnects is `(game_id, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub score: u32,
    pub connected: bool,
    pub answers: Vec<AnswerRecord>,
}

/// One recorded answer. At most one per `(player, song_index)`; a later
/// submission for the same song is rejected, never overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub song_index: usize,
    /// -1 marks a player who never answered before the deadline.
    pub selected_option_index: i32,
    pub is_correct: bool,
    pub response_time_ms: u64,
    pub points: u32,
}

/// One of the four answer choices shown to players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub text: String,
    pub is_correct: bool,
}

/// The four-way option set for one round: exactly one entry is correct.
/// Generated once per song and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSet {
    pub song_index: usize,
    pub options: Vec<AnswerOption>,
    pub correct_index: usize,
}

/// Per-game settings supplied by the host on `createGame`, clamped
/// server-side before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub songs_count: usize,
    pub clip_duration_sec: u64,
    pub answer_time_sec: u64,
    pub max_players: usize,
}

impl GameSettings {
    pub const MIN_ANSWER_TIME_SEC: u64 = 5;
    pub const MAX_ANSWER_TIME_SEC: u64 = 120;
    pub const MAX_PLAYERS_CAP: usize = 64;

    /// Clamp host-supplied values to sane bounds.
    pub fn clamped(self) -> Self {
        Self {
            songs_count: self.songs_count.max(1),
            clip_duration_sec: self.clip_duration_sec.clamp(5, 60),
            answer_time_sec: self
                .answer_time_sec
                .clamp(Self::MIN_ANSWER_TIME_SEC, Self::MAX_ANSWER_TIME_SEC),
            max_players: self.max_players.clamp(1, Self::MAX_PLAYERS_CAP),
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            songs_count: 10,
            clip_duration_sec: 20,
            answer_time_sec: 20,
            max_players: 8,
        }
    }
}

/// Coarse session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Lobby,
    InProgress,
    Finished,
}

/// Per-song sub-state driven by the round controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundPhase {
    Idle,
    ClipPlaying,
    OptionsShown,
    Revealed,
}

/// Milliseconds since the unix epoch.
pub fn unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Messages sent from clients to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    #[serde(rename_all = "camelCase")]
    CreateGame {
        host_name: String,
        settings: GameSettings,
        songs_metadata: Vec<Song>,
    },
    #[serde(rename_all = "camelCase")]
    JoinGame { game_id: String, player_name: String },
    #[serde(rename_all = "camelCase")]
    StartGame { game_id: String },
    #[serde(rename_all = "camelCase")]
    ShowOptions { game_id: String, song_index: usize },
    #[serde(rename_all = "camelCase")]
    SubmitAnswer {
        game_id: String,
        player_id: String,
        option_index: usize,
        response_time_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    RevealAnswer { game_id: String, song_index: usize },
    #[serde(rename_all = "camelCase")]
    NextSong { game_id: String },
    #[serde(rename_all = "camelCase")]
    EndGame { game_id: String },
    #[serde(rename_all = "camelCase")]
    LeaveGame { game_id: String, player_id: String },
    #[serde(rename_all = "camelCase")]
    KickPlayer { game_id: String, player_id: String },
    #[serde(rename_all = "camelCase")]
    RejoinGame {
        game_id: String,
        player_id: String,
        player_name: String,
    },
}

/// Messages sent from the server to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    #[serde(rename_all = "camelCase")]
    GameCreated { game_id: String, session: GameSession },
    #[serde(rename_all = "camelCase")]
    GameJoined {
        game_id: String,
        session: GameSession,
        player: Player,
    },
    PlayerJoined { session: GameSession },
    PlayerLeft { session: GameSession },
    GameStarted { session: GameSession },
    NextSong { session: GameSession },
    #[serde(rename_all = "camelCase")]
    KahootOptions {
        options: Vec<AnswerOption>,
        correct_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    AnswerResult {
        player_id: String,
        is_correct: bool,
        points: u32,
        total_score: u32,
        correct_answer: String,
    },
    #[serde(rename_all = "camelCase")]
    PlayerAnswered {
        answered_count: usize,
        total_players: usize,
    },
    AllPlayersAnswered { session: GameSession },
    AnswerTimeExpired { session: GameSession },
    #[serde(rename_all = "camelCase")]
    RevealAnswers {
        session: GameSession,
        correct_answer: String,
    },
    GameEnded { session: GameSession },
    GameDeleted { message: String },
    PlayerKicked { reason: String },
    RejoinSuccess { session: GameSession, player: Player },
    GameNotFound,
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_are_clamped() {
        let s = GameSettings {
            songs_count: 0,
            clip_duration_sec: 500,
            answer_time_sec: 1,
            max_players: 9999,
        }
        .clamped();
        assert_eq!(s.songs_count, 1);
        assert_eq!(s.clip_duration_sec, 60);
        assert_eq!(s.answer_time_sec, GameSettings::MIN_ANSWER_TIME_SEC);
        assert_eq!(s.max_players, GameSettings::MAX_PLAYERS_CAP);
    }

    #[test]
    fn wire_messages_use_camel_case_tags() {
        let msg = ClientMsg::JoinGame {
            game_id: "ABC123".into(),
            player_name: "amy".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "joinGame");
        assert_eq!(json["gameId"], "ABC123");
        assert_eq!(json["playerName"], "amy");

        let parsed: ClientMsg = serde_json::from_value(json).unwrap();
        match parsed {
            ClientMsg::JoinGame { game_id, .. } => assert_eq!(game_id, "ABC123"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn progress_message_serializes_counts() {
        let msg = ServerMsg::PlayerAnswered {
            answered_count: 2,
            total_players: 3,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"playerAnswered\""));
        assert!(json.contains("\"answeredCount\":2"));
    }
}
