use std::io::{self, Read};

use crate::backend::Backend;
use crate::buffer::NativeBuffer;
use crate::codec::{Codec, CodecOptions, Direction, FlushMode};
use crate::error::{Error, Result};
use crate::trace;

const DISPOSED: &str = "decompression stream";
const SKIP_CHUNK: usize = 4096;

/// Decompressing adapter over a [`Read`] source.
///
/// Each read decodes at most one member. Once a member ends, reads return
/// `Ok(0)` until [`reset`](Self::reset) starts the next one, which lets
/// callers walk concatenated gzip members or xz streams one at a time.
pub struct Decoder<R: Read, C: Codec> {
    codec: C,
    buffer: NativeBuffer,
    source: Option<R>,
    closed: bool,
    finished_reading: bool,
    member_started: bool,
    eof: bool,
    close_underlying: bool,
    total_in: u64,
    total_out: u64,
}

impl<R: Read, C: Codec> Decoder<R, C> {
    /// Creates a decoder pulling compressed bytes from `source`.
    pub fn new<O>(source: R, options: &O) -> Result<Self>
    where
        O: CodecOptions<Codec = C>,
    {
        let stream = options.stream_options();
        let size = options.checked_buffer_size(Direction::Decompress)?;
        let buffer = NativeBuffer::allocate(size)?;
        let codec = options.init_decompress()?;
        trace::stream_opened(codec.backend(), Direction::Decompress, size);
        Ok(Self {
            codec,
            buffer,
            source: Some(source),
            closed: false,
            finished_reading: false,
            member_started: false,
            eof: false,
            close_underlying: stream.close_underlying(),
            total_in: 0,
            total_out: 0,
        })
    }

    /// Backend driving this decoder.
    pub fn backend(&self) -> Backend {
        self.codec.backend()
    }

    /// Compressed bytes consumed by the codec so far.
    pub const fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Decompressed bytes produced so far.
    pub const fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Returns `true` once the decoder has been closed.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns `true` when the current member reached its logical end.
    pub const fn is_member_finished(&self) -> bool {
        self.finished_reading
    }

    /// Capacity of the input staging buffer.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Returns the source unless it was dropped by [`close`](Self::close).
    pub fn get_ref(&self) -> Option<&R> {
        self.source.as_ref()
    }

    /// Mutable access to the source.
    ///
    /// Bytes already staged in the input buffer are not visible through it.
    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.source.as_mut()
    }

    /// Decodes into `out`, returning the number of bytes produced.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::ObjectDisposed(DISPOSED));
        }
        if self.finished_reading || out.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        loop {
            if self.buffer.is_exhausted() && !self.eof {
                if written > 0 {
                    break;
                }
                let Some(source) = self.source.as_mut() else {
                    return Err(Error::ObjectDisposed(DISPOSED));
                };
                if self.buffer.fill_from(source)? == 0 {
                    self.eof = true;
                }
            }

            let step = self
                .codec
                .step(self.buffer.readable(), &mut out[written..], FlushMode::None)?;
            self.buffer.consume(step.consumed);
            written += step.produced;
            self.total_in += step.consumed as u64;
            self.total_out += step.produced as u64;
            if step.made_progress() {
                self.member_started = true;
            }

            if step.is_end() {
                self.finished_reading = true;
                trace::member_end(
                    self.codec.backend(),
                    Direction::Decompress,
                    self.total_in,
                    self.total_out,
                );
                break;
            }
            if written == out.len() {
                break;
            }
            if !step.made_progress() {
                if self.eof {
                    if written > 0 {
                        break;
                    }
                    if self.member_started {
                        return Err(Error::Truncated {
                            backend: self.codec.backend(),
                        });
                    }
                    return Ok(0);
                }
                if !self.buffer.is_exhausted() {
                    return Err(Error::codec(
                        self.codec.backend(),
                        -1,
                        "codec made no progress",
                    ));
                }
            }
        }
        Ok(written)
    }

    /// Skips whatever is left of the current member and prepares the codec
    /// for the next one. Staged input is kept.
    pub fn reset(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::ObjectDisposed(DISPOSED));
        }
        if self.member_started && !self.finished_reading {
            let mut scratch = [0u8; SKIP_CHUNK];
            while self.read_bytes(&mut scratch)? > 0 {}
        }
        self.codec.reset()?;
        self.finished_reading = false;
        self.member_started = false;
        self.eof = false;
        trace::stream_reset(
            self.codec.backend(),
            Direction::Decompress,
            self.total_in,
            self.total_out,
        );
        Ok(())
    }

    /// Releases the codec and buffer. The source is dropped when
    /// `close_underlying` is set. Calling `close` again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.shutdown(self.close_underlying);
        Ok(())
    }

    /// Closes the decoder without dropping the source and returns it.
    pub fn into_inner(mut self) -> Result<R> {
        self.shutdown(false);
        self.source.take().ok_or(Error::ObjectDisposed(DISPOSED))
    }

    fn shutdown(&mut self, drop_source: bool) {
        if self.closed {
            return;
        }
        self.codec.end();
        self.buffer.release();
        self.closed = true;
        if drop_source {
            self.source = None;
        }
        trace::stream_closed(
            self.codec.backend(),
            Direction::Decompress,
            self.total_in,
            self.total_out,
        );
    }
}

impl<R: Read, C: Codec> Read for Decoder<R, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf).map_err(io::Error::from)
    }
}

impl<R: Read, C: Codec> Drop for Decoder<R, C> {
    fn drop(&mut self) {
        self.shutdown(self.close_underlying);
    }
}
