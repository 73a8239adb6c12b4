#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `compress` puts block- and frame-oriented compression codecs behind the
//! standard [`std::io::Read`] and [`std::io::Write`] traits. Deflate (gzip,
//! zlib and raw framing), LZMA (`.xz` and legacy `.lzma`) and the LZ4 frame
//! format stream through the same adapter state machine; LZO is offered as
//! buffer-to-buffer functions only.
//!
//! # Design
//!
//! Every backend implements the [`codec::Codec`] capability: a session that
//! consumes part of an input slice and fills part of an output slice per step.
//! The adapters in [`stream`] own one session, one fixed-size
//! [`buffer::NativeBuffer`] and the sink or source, and loop over steps until
//! the caller's request is satisfied:
//!
//! - [`stream::Encoder`] compresses into a [`std::io::Write`] sink,
//! - [`stream::Decoder`] decompresses from a [`std::io::Read`] source,
//! - [`stream::CodecStream`] picks the direction at runtime.
//!
//! Backends are selected by cargo features (`gzip`, `lzma`, `lz4`, `lzo`) and
//! consulted through the process-wide [`backend`] registry, which can refuse a
//! backend through environment variables.
//!
//! # Invariants
//!
//! - Writes consume their whole input or fail; reads return `Ok(0)` only at the
//!   natural end of a member.
//! - A finishing flush is emitted only when bytes were written since the last
//!   member ended, so closing an unused encoder writes nothing.
//! - Cleanup (finishing, flushing, releasing the codec and buffer) runs once,
//!   from whichever of `close`, `into_inner` or drop comes first.
//!
//! # Errors
//!
//! Fallible operations return [`Error`]. The `Read`/`Write` implementations
//! convert it into [`std::io::Error`] with a matching kind;
//! [`Error::from_io`] recovers the typed value.
//!
//! # Examples
//!
//! ```
//! # #[cfg(feature = "lz4")]
//! # fn main() -> Result<(), compress::Error> {
//! use std::io::{Read, Write};
//! use compress::lz4::{Lz4Decoder, Lz4Encoder, Lz4Options};
//!
//! let options = Lz4Options::default();
//! let mut encoder = Lz4Encoder::new(Vec::new(), &options)?;
//! encoder.write_all(b"frame payload")?;
//! let frame = encoder.into_inner()?;
//!
//! let mut decoder = Lz4Decoder::new(&frame[..], &options)?;
//! let mut out = Vec::new();
//! decoder.read_to_end(&mut out)?;
//! assert_eq!(out, b"frame payload");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "lz4"))]
//! # fn main() {}
//! ```
//!
//! # See also
//!
//! - [`gzip`] for deflate sessions and [`gzip::file::GzipFile`].
//! - [`lzma`] for xz sessions and the fixed-buffer helpers.
//! - [`lz4`] for LZ4 frame sessions.
//! - [`lzo`] for LZO block functions.

pub mod backend;
pub mod buffer;
pub mod codec;
mod error;
#[cfg(feature = "gzip")]
pub mod gzip;
pub mod level;
#[cfg(feature = "lz4")]
pub mod lz4;
#[cfg(feature = "lzma")]
pub mod lzma;
#[cfg(feature = "lzo")]
pub mod lzo;
pub mod stream;
pub mod trace;

pub use backend::{Backend, BackendInfo};
pub use codec::{Codec, CodecOptions, Direction, FlushMode, Step, StepStatus};
pub use error::{Error, Result};
pub use level::{CompressionLevel, CompressionLevelError};
pub use stream::{Capabilities, CodecStream, Decoder, Encoder, StreamOptions};
