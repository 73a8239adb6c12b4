#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `codec-streams` re-exports the [`compress`] crate: blocking
//! [`std::io::Read`]/[`std::io::Write`] adapters over gzip, xz, LZ4 frame and
//! LZO codecs. Enable or disable backends with the `gzip`, `lzma`, `lz4` and
//! `lzo` features; `tracing` turns on lifecycle events and `serde` derives
//! (de)serialisation for the option structs.
//!
//! # Examples
//!
//! ```
//! # #[cfg(feature = "lzma")]
//! # fn main() -> Result<(), codec_streams::Error> {
//! use std::io::{Read, Write};
//! use codec_streams::lzma::{LzmaDecoder, LzmaEncoder, LzmaOptions};
//!
//! let options = LzmaOptions::new().with_preset(3);
//! let mut encoder = LzmaEncoder::new(Vec::new(), &options)?;
//! encoder.write_all(b"xz through the facade")?;
//! let xz = encoder.into_inner()?;
//!
//! let mut decoder = LzmaDecoder::new(&xz[..], &options)?;
//! let mut text = String::new();
//! decoder.read_to_string(&mut text)?;
//! assert_eq!(text, "xz through the facade");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "lzma"))]
//! # fn main() {}
//! ```

pub use compress::*;
