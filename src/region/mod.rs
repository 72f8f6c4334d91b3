//! Absolute pointer placement through an external grid-picker overlay
//!
//! The helper process owns all UI. This module only speaks the file
//! handshake ([`protocol`]) and manages the helper's lifetime ([`session`]).

pub mod protocol;
mod session;

pub use protocol::CoordsError;
pub use session::{RegionRequest, RegionSelector, SessionError};
