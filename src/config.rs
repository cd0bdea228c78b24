//! Server configuration from the environment.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// How long a disconnected mid-game player is kept before removal.
    pub disconnect_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            disconnect_grace: Duration::from_secs(60),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, raw, "ignoring unparsable environment variable");
            None
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            disconnect_grace: env_parse("TUNERUSH_DISCONNECT_GRACE_SEC")
                .map(Duration::from_secs)
                .unwrap_or(defaults.disconnect_grace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = ServerConfig::default();
        assert_eq!(c.port, 3000);
        assert_eq!(c.disconnect_grace, Duration::from_secs(60));
    }
}
