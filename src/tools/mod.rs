//! External operation surface.
//!
//! One module per operation, each pairing a request type (with serde
//! defaults matching the documented parameter defaults) and a structured
//! response carrying an explicit [`Status`]. [`registry`] exposes the
//! operation table with JSON schemas for the request types.

pub mod details;
pub mod generate;
pub mod registry;
pub mod search;

use serde::{Deserialize, Serialize};

/// Outcome marker carried by every operation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

pub(crate) fn default_true() -> bool {
    true
}
