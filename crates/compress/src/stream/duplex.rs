use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::backend::Backend;
use crate::codec::{Codec, CodecOptions, Direction};
use crate::error::{Error, Result};

use super::{Decoder, Encoder};

/// What a [`CodecStream`] currently allows.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
    /// Reads are accepted.
    pub can_read: bool,
    /// Writes are accepted.
    pub can_write: bool,
    /// Seeking is accepted. Always `false`.
    pub can_seek: bool,
}

enum Inner<S: Read + Write, C: Codec> {
    Compress(Encoder<S, C>),
    Decompress(Decoder<S, C>),
}

/// Adapter whose direction is chosen at runtime.
///
/// The wrapped value must be both readable and writable; only the half that
/// matches the direction is used. Reading a compressing stream or writing a
/// decompressing one fails with [`Error::UnsupportedOperation`].
pub struct CodecStream<S: Read + Write, C: Codec> {
    inner: Inner<S, C>,
}

impl<S: Read + Write, C: Codec> CodecStream<S, C> {
    /// Creates a stream over `inner` for `direction`.
    pub fn new<O>(inner: S, direction: Direction, options: &O) -> Result<Self>
    where
        O: CodecOptions<Codec = C>,
    {
        let inner = match direction {
            Direction::Compress => Inner::Compress(Encoder::new(inner, options)?),
            Direction::Decompress => Inner::Decompress(Decoder::new(inner, options)?),
        };
        Ok(Self { inner })
    }

    /// Direction fixed at construction.
    pub const fn direction(&self) -> Direction {
        match self.inner {
            Inner::Compress(_) => Direction::Compress,
            Inner::Decompress(_) => Direction::Decompress,
        }
    }

    /// Backend driving the stream.
    pub fn backend(&self) -> Backend {
        match &self.inner {
            Inner::Compress(encoder) => encoder.backend(),
            Inner::Decompress(decoder) => decoder.backend(),
        }
    }

    /// Operations currently permitted. Everything is refused once closed.
    pub const fn capabilities(&self) -> Capabilities {
        match &self.inner {
            Inner::Compress(encoder) => Capabilities {
                can_read: false,
                can_write: !encoder.is_closed(),
                can_seek: false,
            },
            Inner::Decompress(decoder) => Capabilities {
                can_read: !decoder.is_closed(),
                can_write: false,
                can_seek: false,
            },
        }
    }

    /// Bytes fed to the codec so far.
    pub const fn total_in(&self) -> u64 {
        match &self.inner {
            Inner::Compress(encoder) => encoder.total_in(),
            Inner::Decompress(decoder) => decoder.total_in(),
        }
    }

    /// Bytes produced by the codec so far.
    pub const fn total_out(&self) -> u64 {
        match &self.inner {
            Inner::Compress(encoder) => encoder.total_out(),
            Inner::Decompress(decoder) => decoder.total_out(),
        }
    }

    /// Returns `true` once the stream has been closed.
    pub const fn is_closed(&self) -> bool {
        match &self.inner {
            Inner::Compress(encoder) => encoder.is_closed(),
            Inner::Decompress(decoder) => decoder.is_closed(),
        }
    }

    /// Starts a new member. See [`Encoder::reset`] and [`Decoder::reset`].
    pub fn reset(&mut self) -> Result<()> {
        match &mut self.inner {
            Inner::Compress(encoder) => encoder.reset(),
            Inner::Decompress(decoder) => decoder.reset(),
        }
    }

    /// Closes the stream. Calling `close` again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match &mut self.inner {
            Inner::Compress(encoder) => encoder.close(),
            Inner::Decompress(decoder) => decoder.close(),
        }
    }

    /// Closes the stream without dropping the wrapped value and returns it.
    pub fn into_inner(self) -> Result<S> {
        match self.inner {
            Inner::Compress(encoder) => encoder.into_inner(),
            Inner::Decompress(decoder) => decoder.into_inner(),
        }
    }
}

impl<S: Read + Write, C: Codec> Read for CodecStream<S, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Compress(_) => Err(Error::UnsupportedOperation(
                "read on a compressing stream",
            )
            .into()),
            Inner::Decompress(decoder) => decoder.read(buf),
        }
    }
}

impl<S: Read + Write, C: Codec> Write for CodecStream<S, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Compress(encoder) => encoder.write(buf),
            Inner::Decompress(_) => Err(Error::UnsupportedOperation(
                "write on a decompressing stream",
            )
            .into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::Compress(encoder) => encoder.flush(),
            Inner::Decompress(decoder) if decoder.is_closed() => {
                Err(Error::ObjectDisposed("decompression stream").into())
            }
            Inner::Decompress(_) => Ok(()),
        }
    }
}

impl<S: Read + Write, C: Codec> Seek for CodecStream<S, C> {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(Error::UnsupportedOperation("seek on a codec stream").into())
    }
}
