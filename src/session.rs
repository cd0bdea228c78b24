//! The authoritative `GameSession` aggregate.
//!
//! All mutation goes through the methods here, and only the per-game task
//! in [`crate::game`] calls them, so a session is single-writer by
//! construction. Every mutation leaves the aggregate in a state that can
//! be cloned and broadcast as a whole snapshot.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::scoring;
use crate::types::{
    AnswerRecord, GameSettings, Player, RoundPhase, SessionPhase, Song, unix_ms,
};

pub const NAME_MIN_LEN: usize = 1;
pub const NAME_MAX_LEN: usize = 20;

/// One hosted quiz: settings, the selected songs, the scorable players
/// and the round position. The host is identified by the surrounding
/// game task, not stored in `players`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: String,
    pub host_name: String,
    pub settings: GameSettings,
    pub players: Vec<Player>,
    pub songs: Vec<Song>,
    pub current_song_index: usize,
    pub phase: SessionPhase,
    pub round: RoundPhase,
    pub created_at_ms: u64,
}

/// Pick `count` distinct library indices in shuffled order.
pub fn select_song_indices(library_len: usize, count: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..library_len).collect();
    indices.shuffle(rng);
    indices.truncate(count);
    indices
}

impl GameSession {
    /// Create a session from the host's library. Returns the session and
    /// the library indices of the selected songs, which the game task
    /// keeps for distractor generation.
    pub fn new(
        id: String,
        host_name: String,
        settings: GameSettings,
        library: &[Song],
        rng: &mut impl Rng,
    ) -> (Self, Vec<usize>) {
        let settings = settings.clamped();
        let picked = select_song_indices(library.len(), settings.songs_count, rng);
        let songs = picked.iter().map(|&i| library[i].clone()).collect();
        let session = Self {
            id,
            host_name,
            settings,
            players: Vec::new(),
            songs,
            current_song_index: 0,
            phase: SessionPhase::Lobby,
            round: RoundPhase::Idle,
            created_at_ms: unix_ms(),
        };
        (session, picked)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn player_by_name_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.songs.get(self.current_song_index)
    }

    /// Add a scorable player. Name uniqueness is case-sensitive; a
    /// duplicate is rejected, not suffixed.
    pub fn join(&mut self, player_id: String, name: &str) -> Result<Player, GameError> {
        if self.phase == SessionPhase::Finished {
            return Err(GameError::InvalidState);
        }
        let name = name.trim();
        if name.len() < NAME_MIN_LEN || name.len() > NAME_MAX_LEN {
            return Err(GameError::InvalidName {
                min: NAME_MIN_LEN,
                max: NAME_MAX_LEN,
            });
        }
        if self.players.iter().any(|p| p.name == name) {
            return Err(GameError::NameTaken);
        }
        if self.players.len() >= self.settings.max_players {
            return Err(GameError::Full);
        }
        let player = Player {
            id: player_id,
            name: name.to_string(),
            score: 0,
            connected: true,
            answers: Vec::new(),
        };
        self.players.push(player.clone());
        Ok(player)
    }

    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let pos = self.players.iter().position(|p| p.id == player_id)?;
        Some(self.players.remove(pos))
    }

    /// Lobby -> first round.
    pub fn start(&mut self) -> Result<(), GameError> {
        if self.phase != SessionPhase::Lobby || self.songs.is_empty() {
            return Err(GameError::InvalidState);
        }
        self.phase = SessionPhase::InProgress;
        self.round = RoundPhase::ClipPlaying;
        Ok(())
    }

    /// Record one answer for the current song. Rejects submissions
    /// outside `OptionsShown` and duplicates for the same round; a
    /// rejected submission changes nothing.
    pub fn record_answer(
        &mut self,
        player_id: &str,
        selected_option_index: usize,
        response_time_ms: u64,
        correct_index: usize,
    ) -> Result<AnswerRecord, GameError> {
        if self.round != RoundPhase::OptionsShown || selected_option_index >= 4 {
            return Err(GameError::InvalidState);
        }
        let song_index = self.current_song_index;
        let answer_time_sec = self.settings.answer_time_sec;
        let player = self.player_mut(player_id).ok_or(GameError::NotFound)?;
        if player.answers.iter().any(|a| a.song_index == song_index) {
            return Err(GameError::DuplicateAnswer);
        }
        let is_correct = selected_option_index == correct_index;
        let points = if is_correct {
            scoring::multiplayer_points(response_time_ms, answer_time_sec)
        } else {
            0
        };
        let record = AnswerRecord {
            song_index,
            selected_option_index: selected_option_index as i32,
            is_correct,
            response_time_ms,
            points,
        };
        player.answers.push(record.clone());
        Ok(record)
    }

    pub fn answered_count(&self) -> usize {
        let idx = self.current_song_index;
        self.players
            .iter()
            .filter(|p| p.answers.iter().any(|a| a.song_index == idx))
            .count()
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    /// True when every connected player has answered the current song.
    /// False with no connected players, so an empty room never
    /// auto-reveals.
    pub fn all_answered(&self) -> bool {
        let idx = self.current_song_index;
        let connected: Vec<&Player> =
            self.players.iter().filter(|p| p.connected).collect();
        !connected.is_empty()
            && connected
                .iter()
                .all(|p| p.answers.iter().any(|a| a.song_index == idx))
    }

    /// Close the answer window: non-answers become `{-1, false, 0}`
    /// records, points are applied to scores and the leaderboard is
    /// re-sorted. Returns each player's record for the round, for the
    /// per-player result messages.
    pub fn finish_round(&mut self) -> Vec<(String, AnswerRecord)> {
        debug_assert!(self.current_song_index < self.songs.len());
        let idx = self.current_song_index;
        let window_ms = self.settings.answer_time_sec.saturating_mul(1000);
        self.round = RoundPhase::Revealed;

        let mut results = Vec::with_capacity(self.players.len());
        for player in &mut self.players {
            if !player.answers.iter().any(|a| a.song_index == idx) {
                player.answers.push(AnswerRecord {
                    song_index: idx,
                    selected_option_index: -1,
                    is_correct: false,
                    response_time_ms: window_ms,
                    points: 0,
                });
            }
            // The record exists now in either case.
            if let Some(record) = player.answers.iter().find(|a| a.song_index == idx) {
                player.score += record.points;
                results.push((player.id.clone(), record.clone()));
            }
        }

        self.players.sort_by(|a, b| b.score.cmp(&a.score));
        results
    }

    /// Move to the next song, or finish the game on the last one.
    /// Returns true when the session just finished.
    pub fn advance(&mut self) -> bool {
        debug_assert!(self.current_song_index <= self.songs.len());
        if self.current_song_index + 1 >= self.songs.len() {
            self.phase = SessionPhase::Finished;
            true
        } else {
            self.current_song_index += 1;
            self.round = RoundPhase::ClipPlaying;
            false
        }
    }
}
