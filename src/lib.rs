//! tunerush: a real-time song-quiz party game engine.
//!
//! A host streams short clips from their library; players pick the title
//! from four options and score by speed. The engine here is the session
//! state machine, the distractor generator and the reconnection
//! protocol; audio playback and rendering live in the clients.

pub mod config;
pub mod errors;
pub mod game;
pub mod mirror;
pub mod options;
pub mod recovery;
pub mod scoring;
pub mod session;
pub mod types;
