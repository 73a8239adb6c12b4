use std::io::{self, Write};

use crate::backend::Backend;
use crate::buffer::NativeBuffer;
use crate::codec::{Codec, CodecOptions, Direction, FlushMode};
use crate::error::{Error, Result};
use crate::trace;

const DISPOSED: &str = "compression stream";

/// Compressing adapter over a [`Write`] sink.
///
/// Bytes written are fed to the codec and the compressed output is forwarded
/// to the sink as it becomes available. The current member stays open until
/// [`reset`](Self::reset), [`close`](Self::close), [`into_inner`](Self::into_inner)
/// or drop finishes it.
pub struct Encoder<W: Write, C: Codec> {
    codec: C,
    buffer: NativeBuffer,
    sink: Option<W>,
    closed: bool,
    pending_finish: bool,
    close_underlying: bool,
    total_in: u64,
    total_out: u64,
}

impl<W: Write, C: Codec> Encoder<W, C> {
    /// Creates an encoder writing compressed bytes to `sink`.
    pub fn new<O>(sink: W, options: &O) -> Result<Self>
    where
        O: CodecOptions<Codec = C>,
    {
        let stream = options.stream_options();
        let size = options.checked_buffer_size(Direction::Compress)?;
        let buffer = NativeBuffer::allocate(size)?;
        let codec = options.init_compress()?;
        trace::stream_opened(codec.backend(), Direction::Compress, size);
        Ok(Self {
            codec,
            buffer,
            sink: Some(sink),
            closed: false,
            pending_finish: false,
            close_underlying: stream.close_underlying(),
            total_in: 0,
            total_out: 0,
        })
    }

    /// Backend driving this encoder.
    pub fn backend(&self) -> Backend {
        self.codec.backend()
    }

    /// Uncompressed bytes fed to the codec so far.
    pub const fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Compressed bytes forwarded to the sink so far.
    pub const fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Returns `true` once the encoder has been closed.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Capacity of the output staging buffer.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Returns the sink unless it was dropped by [`close`](Self::close).
    pub fn get_ref(&self) -> Option<&W> {
        self.sink.as_ref()
    }

    /// Mutable access to the sink unless it was dropped by [`close`](Self::close).
    ///
    /// Writing to the sink directly interleaves with compressed output.
    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.sink.as_mut()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::ObjectDisposed(DISPOSED))
        } else {
            Ok(())
        }
    }

    /// Compresses `input`, forwarding output to the sink.
    ///
    /// The whole slice is always consumed; the return value is `input.len()`.
    pub fn write_bytes(&mut self, input: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        if input.is_empty() {
            return Ok(0);
        }
        self.pending_finish = true;
        self.run(input, FlushMode::None)?;
        Ok(input.len())
    }

    /// Pushes buffered data through the codec with a full flush, then flushes
    /// the sink. Nothing is emitted when no bytes were written since the last
    /// member ended.
    pub fn flush_stream(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.pending_finish {
            self.run(&[], FlushMode::Full)?;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Finishes the current member (if any bytes were written) and prepares
    /// the codec for a new one.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.pending_finish {
            self.run(&[], FlushMode::Finish)?;
        }
        self.codec.reset()?;
        self.pending_finish = false;
        trace::stream_reset(
            self.codec.backend(),
            Direction::Compress,
            self.total_in,
            self.total_out,
        );
        Ok(())
    }

    /// Finishes the member, flushes the sink and releases the codec.
    ///
    /// The sink is dropped when `close_underlying` is set. Calling `close`
    /// again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.shutdown(self.close_underlying)
    }

    /// Closes the encoder without dropping the sink and returns it.
    pub fn into_inner(mut self) -> Result<W> {
        self.shutdown(false)?;
        self.sink.take().ok_or(Error::ObjectDisposed(DISPOSED))
    }

    fn shutdown(&mut self, drop_sink: bool) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let mut result = Ok(());
        if self.pending_finish {
            self.pending_finish = false;
            result = self.run(&[], FlushMode::Finish);
        }
        if result.is_ok()
            && let Some(sink) = self.sink.as_mut()
        {
            result = sink.flush().map_err(Error::from);
        }

        self.codec.end();
        self.buffer.release();
        self.closed = true;
        if drop_sink {
            self.sink = None;
        }
        trace::stream_closed(
            self.codec.backend(),
            Direction::Compress,
            self.total_in,
            self.total_out,
        );
        result
    }

    fn run(&mut self, input: &[u8], flush: FlushMode) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(Error::ObjectDisposed(DISPOSED));
        };

        let mut remaining = input;
        loop {
            let space = self.buffer.writable().len();
            let step = self.codec.step(remaining, self.buffer.writable(), flush)?;
            self.buffer.commit(step.produced);
            remaining = &remaining[step.consumed..];
            self.total_in += step.consumed as u64;
            self.total_out += step.produced as u64;
            self.buffer.drain_into(sink)?;

            if step.is_end() {
                trace::member_end(
                    self.codec.backend(),
                    Direction::Compress,
                    self.total_in,
                    self.total_out,
                );
                return Ok(());
            }

            let output_full = step.produced == space;
            match flush {
                FlushMode::Finish => {
                    if !step.made_progress() {
                        return Err(stalled(self.codec.backend()));
                    }
                }
                FlushMode::None | FlushMode::Sync | FlushMode::Full => {
                    let more = !remaining.is_empty() || (flush != FlushMode::None && output_full);
                    if !more {
                        return Ok(());
                    }
                    if !step.made_progress() {
                        if remaining.is_empty() {
                            return Ok(());
                        }
                        return Err(stalled(self.codec.backend()));
                    }
                }
            }
        }
    }
}

fn stalled(backend: Backend) -> Error {
    Error::codec(backend, -1, "codec made no progress")
}

impl<W: Write, C: Codec> Write for Encoder<W, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_stream().map_err(io::Error::from)
    }
}

impl<W: Write, C: Codec> Drop for Encoder<W, C> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown(self.close_underlying) {
            trace::drop_error(self.codec.backend(), Direction::Compress, &err);
        }
    }
}
