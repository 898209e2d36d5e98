//! Shared types for the conflict-check workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
