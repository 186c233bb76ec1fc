//! Frame reader: turns a byte stream into complete messages.
//!
//! Boundaries are detected after every incremental read, in priority order:
//! 1. Declared length: a `content-length` header before `\r\n\r\n` fixes the
//!    total size; the message is complete once that many bytes are buffered.
//! 2. Delimiter: the buffer ends with the configured (non-empty) delimiter.
//! 3. End of stream: whatever was accumulated is the message.
//!
//! Reads happen in fixed-size chunks and every chunk is appended whole, so a
//! declared-length frame may come back longer than declared when the final
//! chunk carried extra bytes. That over-read is kept, never truncated.
//!
//! # Example
//!
//! ```ignore
//! use framewire::framing::FrameReader;
//!
//! let reader = FrameReader::new(b"##".to_vec());
//! let frame = reader.read(&mut stream).await?;
//! println!("{} bytes, ended by {:?}", frame.len(), frame.boundary);
//! ```

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::header::{self, HEADER_TERMINATOR_LEN};
use crate::error::{FramewireError, Result};

/// Default size of each incremental read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

/// What terminated a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// The declared `content-length` was satisfied.
    DeclaredLength,
    /// The buffer ended with the delimiter.
    Delimiter,
    /// The stream ended.
    EndOfStream,
}

/// One complete message as read from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw message bytes, delimiter included.
    pub bytes: Bytes,
    /// How the end of the message was detected.
    pub boundary: Boundary,
}

impl Frame {
    /// Length of the message in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the message is empty (only possible at end of stream).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Take the message bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Declared-length state.
#[derive(Debug, Clone, Copy)]
enum State {
    /// No header terminator seen yet; `scanned` bytes need no rescan.
    ScanningHeaders { scanned: usize },
    /// Terminator seen but no usable `content-length`.
    Undeclared,
    /// Total length fixed; never recomputed.
    Declared { expected: usize },
}

/// Sans-IO accumulator applying the boundary rules to pushed chunks.
///
/// [`FrameReader`] drives one of these per message; it is public so that
/// callers with their own read loop can reuse the same rules.
#[derive(Debug)]
pub struct FrameAccumulator {
    buffer: BytesMut,
    state: State,
    delimiter: Bytes,
}

impl FrameAccumulator {
    /// Create an accumulator for the given delimiter (empty disables it).
    pub fn new(delimiter: impl Into<Bytes>) -> Self {
        Self {
            buffer: BytesMut::new(),
            state: State::ScanningHeaders { scanned: 0 },
            delimiter: delimiter.into(),
        }
    }

    /// Append a chunk and check for a boundary.
    ///
    /// Returns the complete frame when one is reached, leaving the
    /// accumulator empty and ready for the next message.
    pub fn push(&mut self, data: &[u8]) -> Option<Frame> {
        self.buffer.extend_from_slice(data);

        if let State::ScanningHeaders { scanned } = self.state {
            self.state = match header::find_header_end(&self.buffer, scanned) {
                Some(end) => match header::declared_total(&self.buffer, end) {
                    Some(expected) => State::Declared { expected },
                    None => State::Undeclared,
                },
                // The terminator may straddle the next chunk.
                None => State::ScanningHeaders {
                    scanned: self
                        .buffer
                        .len()
                        .saturating_sub(HEADER_TERMINATOR_LEN - 1),
                },
            };
        }

        if let State::Declared { expected } = self.state {
            if self.buffer.len() >= expected {
                return Some(self.take(Boundary::DeclaredLength));
            }
        }

        if !self.delimiter.is_empty() && self.buffer.ends_with(&self.delimiter) {
            return Some(self.take(Boundary::Delimiter));
        }

        None
    }

    /// End of stream: everything buffered is the message.
    pub fn finish(&mut self) -> Frame {
        self.take(Boundary::EndOfStream)
    }

    /// Total length fixed by a `content-length` header, if any.
    pub fn expected_len(&self) -> Option<usize> {
        match self.state {
            State::Declared { expected } => Some(expected),
            _ => None,
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn take(&mut self, boundary: Boundary) -> Frame {
        self.state = State::ScanningHeaders { scanned: 0 };
        Frame {
            bytes: self.buffer.split().freeze(),
            boundary,
        }
    }
}

/// Reads one frame per call from an async stream.
#[derive(Debug, Clone)]
pub struct FrameReader {
    delimiter: Bytes,
    chunk_size: usize,
}

impl FrameReader {
    /// Create a reader with the default chunk size.
    pub fn new(delimiter: impl Into<Bytes>) -> Self {
        Self::with_chunk_size(delimiter, DEFAULT_READ_CHUNK_SIZE)
    }

    /// Create a reader with a custom chunk size (at least 1).
    pub fn with_chunk_size(delimiter: impl Into<Bytes>, chunk_size: usize) -> Self {
        Self {
            delimiter: delimiter.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// The delimiter this reader frames on.
    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// Size of each incremental read.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Read until a boundary is reached.
    ///
    /// # Errors
    ///
    /// Returns [`FramewireError::Read`] if the stream fails; bytes read so far
    /// are discarded along with the error.
    pub async fn read<R: AsyncRead + Unpin>(&self, reader: &mut R) -> Result<Frame> {
        let mut acc = FrameAccumulator::new(self.delimiter.clone());
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            let n = reader.read(&mut chunk).await.map_err(FramewireError::Read)?;
            if n == 0 {
                return Ok(acc.finish());
            }
            if let Some(frame) = acc.push(&chunk[..n]) {
                return Ok(frame);
            }
        }
    }
}

/// Read a single frame with the given delimiter and chunk size.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
    delimiter: &[u8],
    chunk_size: usize,
) -> Result<Frame> {
    FrameReader::with_chunk_size(Bytes::copy_from_slice(delimiter), chunk_size)
        .read(reader)
        .await
}
