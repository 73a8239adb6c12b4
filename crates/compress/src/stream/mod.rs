//! # Overview
//!
//! Blocking [`Read`](std::io::Read)/[`Write`](std::io::Write) adapters that drive a
//! [`Codec`](crate::codec::Codec) session through a fixed-size staging buffer.
//!
//! # Design
//!
//! - [`Encoder`] wraps a sink. Every write feeds the codec, and the output
//!   staged in the buffer is drained to the sink after each step. The member is
//!   finished lazily on [`Encoder::reset`], [`Encoder::close`],
//!   [`Encoder::into_inner`] or drop.
//! - [`Decoder`] wraps a source. The buffer stages compressed input; decoded
//!   bytes go straight into the caller's slice.
//! - [`CodecStream`] picks the direction at runtime over a `Read + Write`
//!   value and rejects calls that do not match it.
//!
//! # Invariants
//!
//! - Writes always consume the whole slice or fail.
//! - A read returns `Ok(0)` only at the natural end of a member or when the
//!   source is exhausted before a member started.
//! - Cleanup runs exactly once, whichever of `close`, `into_inner` or drop
//!   comes first.
//!
//! # Examples
//!
//! ```
//! # #[cfg(feature = "gzip")]
//! # fn main() -> Result<(), compress::Error> {
//! use std::io::{Read, Write};
//! use compress::gzip::{GzipDecoder, GzipEncoder, GzipOptions};
//!
//! let options = GzipOptions::default();
//! let mut encoder = GzipEncoder::new(Vec::new(), &options)?;
//! encoder.write_all(b"streamed payload")?;
//! let compressed = encoder.into_inner()?;
//!
//! let mut decoder = GzipDecoder::new(&compressed[..], &options)?;
//! let mut out = Vec::new();
//! decoder.read_to_end(&mut out)?;
//! assert_eq!(out, b"streamed payload");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "gzip"))]
//! # fn main() {}
//! ```

mod decoder;
mod duplex;
mod encoder;

pub use decoder::Decoder;
pub use duplex::{Capabilities, CodecStream};
pub use encoder::Encoder;

use crate::error::{Error, Result};

/// Adapter-level options shared by every backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreamOptions {
    buffer_size: Option<usize>,
    close_underlying: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer_size: None,
            close_underlying: true,
        }
    }
}

impl StreamOptions {
    /// Options with the backend's buffer size that drop the sink on close.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the staging buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }

    /// Chooses whether [`Encoder::close`]/[`Decoder::close`] also drop the sink.
    pub fn with_close_underlying(mut self, close: bool) -> Self {
        self.close_underlying = close;
        self
    }

    /// Buffer size override, if any.
    pub const fn buffer_size(&self) -> Option<usize> {
        self.buffer_size
    }

    /// Whether closing the adapter drops the sink.
    pub const fn close_underlying(&self) -> bool {
        self.close_underlying
    }

    /// Rejects a zero buffer size.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == Some(0) {
            return Err(Error::invalid_argument("buffer size must be non-zero"));
        }
        Ok(())
    }
}
