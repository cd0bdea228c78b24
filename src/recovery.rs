//! Client-side reconnection tokens.
//!
//! On every successful create/join the client persists a token; on
//! reconnect it replays the token so the server can rebind the logical
//! player identified by `(game_id, player_name)` to the fresh
//! connection. Storage is behind a trait because the durable medium
//! (a file here, browser storage elsewhere) is not the core's concern.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::types::unix_ms;

/// Tokens older than this are stale and never replayed.
pub const REJOIN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryToken {
    pub game_id: String,
    /// The connection-scoped id at save time. Stale after a reconnect;
    /// kept only for diagnostics, never used for identity resolution.
    pub player_id: String,
    pub player_name: String,
    pub saved_at_ms: u64,
}

impl RecoveryToken {
    pub fn is_stale(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.saved_at_ms) > REJOIN_TTL.as_millis() as u64
    }
}

/// Durable single-slot token storage.
pub trait TokenStore {
    fn load(&self) -> Option<RecoveryToken>;
    fn save(&self, token: &RecoveryToken);
    fn clear(&self);
}

/// JSON file storage for desktop clients.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<RecoveryToken> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&data) {
            Ok(token) => Some(token),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "discarding unreadable recovery token");
                None
            }
        }
    }

    fn save(&self, token: &RecoveryToken) {
        match serde_json::to_string_pretty(token) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&self.path, json) {
                    tracing::warn!(path = %self.path.display(), %err, "failed to persist recovery token");
                }
            }
            Err(err) => tracing::warn!(%err, "failed to serialize recovery token"),
        }
    }

    fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// In-memory storage for tests and embedded use.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<RecoveryToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<RecoveryToken> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }

    fn save(&self, token: &RecoveryToken) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(token.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

/// Token lifecycle policy on top of a [`TokenStore`].
pub struct RecoveryManager<S: TokenStore> {
    store: S,
}

impl<S: TokenStore> RecoveryManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist a fresh token after a successful create/join/rejoin.
    pub fn persist(&self, game_id: &str, player_id: &str, player_name: &str) {
        self.store.save(&RecoveryToken {
            game_id: game_id.to_string(),
            player_id: player_id.to_string(),
            player_name: player_name.to_string(),
            saved_at_ms: unix_ms(),
        });
    }

    /// The stored token, if it is still within the TTL. A stale token is
    /// cleared and reported, never replayed.
    pub fn usable_token(&self) -> Result<Option<RecoveryToken>, GameError> {
        self.usable_token_at(unix_ms())
    }

    fn usable_token_at(&self, now_ms: u64) -> Result<Option<RecoveryToken>, GameError> {
        match self.store.load() {
            None => Ok(None),
            Some(token) if token.is_stale(now_ms) => {
                self.store.clear();
                Err(GameError::StaleToken)
            }
            Some(token) => Ok(Some(token)),
        }
    }

    /// Called when the server answers a rejoin with `gameNotFound`.
    pub fn discard(&self) {
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_then_load_round_trips() {
        let manager = RecoveryManager::new(MemoryTokenStore::new());
        manager.persist("AB12CD", "sock-1", "amy");

        let token = manager.usable_token().unwrap().unwrap();
        assert_eq!(token.game_id, "AB12CD");
        assert_eq!(token.player_name, "amy");
    }

    #[test]
    fn stale_token_is_cleared_and_reported() {
        let store = MemoryTokenStore::new();
        store.save(&RecoveryToken {
            game_id: "AB12CD".into(),
            player_id: "sock-1".into(),
            player_name: "amy".into(),
            saved_at_ms: 0,
        });
        let manager = RecoveryManager::new(store);

        let ttl_ms = REJOIN_TTL.as_millis() as u64;
        assert_eq!(
            manager.usable_token_at(ttl_ms + 1),
            Err(GameError::StaleToken)
        );
        // The stale token is gone for good.
        assert_eq!(manager.usable_token_at(ttl_ms + 1), Ok(None));
    }

    #[test]
    fn token_just_inside_ttl_is_usable() {
        let store = MemoryTokenStore::new();
        store.save(&RecoveryToken {
            game_id: "AB12CD".into(),
            player_id: "sock-1".into(),
            player_name: "amy".into(),
            saved_at_ms: 1000,
        });
        let manager = RecoveryManager::new(store);
        let at = 1000 + REJOIN_TTL.as_millis() as u64;
        assert!(manager.usable_token_at(at).unwrap().is_some());
    }

    #[test]
    fn discard_clears_the_slot() {
        let manager = RecoveryManager::new(MemoryTokenStore::new());
        manager.persist("AB12CD", "sock-1", "amy");
        manager.discard();
        assert_eq!(manager.usable_token(), Ok(None));
    }

    #[test]
    fn file_store_round_trips_and_survives_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recovery.json");
        let store = FileTokenStore::new(&path);

        assert!(store.load().is_none());
        let token = RecoveryToken {
            game_id: "AB12CD".into(),
            player_id: "sock-1".into(),
            player_name: "amy".into(),
            saved_at_ms: 42,
        };
        store.save(&token);
        assert_eq!(store.load(), Some(token));

        std::fs::write(&path, "{not json").unwrap();
        assert!(store.load().is_none());

        store.clear();
        assert!(!path.exists());
    }
}
