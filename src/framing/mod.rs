//! Framing module - message boundary detection.
//!
//! This module turns a continuous byte stream into discrete messages:
//! - Declared-length framing via `content-length` + `\r\n\r\n`
//! - Suffix framing via a configured delimiter
//! - End-of-stream as the fallback boundary

pub mod header;
mod reader;

pub use reader::{
    read_message, Boundary, Frame, FrameAccumulator, FrameReader, DEFAULT_READ_CHUNK_SIZE,
};
