//! Shared wire types for the relay broker IPC protocol.
//!
//! This crate defines the frame exchanged between services, gateways, and
//! the broker over TCP, and the length-prefixed binary codec used to read
//! and write it.

#![warn(missing_docs)]

mod codec;
mod error;
mod types;

pub use codec::{read_frame, write_frame};
pub use error::FrameError;
pub use types::{Frame, FrameKind};

/// Default ceiling on a single frame's declared body length, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;
