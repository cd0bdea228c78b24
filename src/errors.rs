use thiserror::Error;

/// Recoverable game errors reported back to the originating client.
///
/// None of these tear down the session for other participants; they are
/// serialized into an `error` (or `gameNotFound`) message for the client
/// that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("game not found")]
    NotFound,
    #[error("that name is already taken in this game")]
    NameTaken,
    #[error("the game is full")]
    Full,
    #[error("only the host can do that")]
    NotHost,
    #[error("player name must be between {min} and {max} characters")]
    InvalidName { min: usize, max: usize },
    #[error("action is not valid in the current game state")]
    InvalidState,
    #[error("an answer was already submitted for this song")]
    DuplicateAnswer,
    #[error("recovery token has expired")]
    StaleToken,
}
