//! Shared utilities, configuration, and error handling for the league client
//!
//! This crate provides functionality used across every other crate:
//! - Configuration loaded from the environment (12-factor style)
//! - The user-facing error vocabulary and the alerts derived from it
//! - State machine errors shared by flows that implement transitions

pub mod config;
pub mod error;
pub mod state;

pub use config::{BackendProvider, Config, LogFormat};
pub use error::{Alert, Error, Result};
pub use state::StateError;
