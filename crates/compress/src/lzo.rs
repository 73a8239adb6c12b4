//! Buffer-to-buffer LZO1X-1 compression.
//!
//! LZO has no streaming interface, so there is no adapter for it: callers
//! compress and decompress whole blocks. The compressed format carries no
//! length header; decompression needs an output slice at least as large as
//! the original data.
//!
//! Status codes follow liblzo, with [`LZO_E_OUT_OF_MEMORY`] surfacing as
//! [`Error::OutOfMemory`] and every other failure as [`Error::Codec`].

use rust_lzo::{LZOContext, LZOError};

use crate::backend::{self, Backend};
use crate::error::{Error, Result};

/// liblzo `LZO_E_ERROR`.
pub const LZO_E_ERROR: i32 = -1;
/// liblzo `LZO_E_OUT_OF_MEMORY`.
pub const LZO_E_OUT_OF_MEMORY: i32 = -2;
/// liblzo `LZO_E_NOT_COMPRESSIBLE`.
pub const LZO_E_NOT_COMPRESSIBLE: i32 = -3;
/// liblzo `LZO_E_INPUT_OVERRUN`.
pub const LZO_E_INPUT_OVERRUN: i32 = -4;
/// liblzo `LZO_E_OUTPUT_OVERRUN`.
pub const LZO_E_OUTPUT_OVERRUN: i32 = -5;
/// liblzo `LZO_E_LOOKBEHIND_OVERRUN`.
pub const LZO_E_LOOKBEHIND_OVERRUN: i32 = -6;
/// liblzo `LZO_E_EOF_NOT_FOUND`.
pub const LZO_E_EOF_NOT_FOUND: i32 = -7;
/// liblzo `LZO_E_INPUT_NOT_CONSUMED`.
pub const LZO_E_INPUT_NOT_CONSUMED: i32 = -8;
/// liblzo `LZO_E_NOT_YET_IMPLEMENTED`.
pub const LZO_E_NOT_YET_IMPLEMENTED: i32 = -9;
/// liblzo `LZO_E_INVALID_ARGUMENT`.
pub const LZO_E_INVALID_ARGUMENT: i32 = -10;

/// Human readable text for a liblzo status code.
#[must_use]
pub const fn message(code: i32) -> &'static str {
    match code {
        LZO_E_ERROR => "Error",
        LZO_E_OUT_OF_MEMORY => "Out of memory",
        LZO_E_NOT_COMPRESSIBLE => "Not compressible",
        LZO_E_INPUT_OVERRUN => "Input overrun",
        LZO_E_OUTPUT_OVERRUN => "Output overrun",
        LZO_E_LOOKBEHIND_OVERRUN => "Lookbehind overrun",
        LZO_E_EOF_NOT_FOUND => "EOF not found",
        LZO_E_INPUT_NOT_CONSUMED => "Input not consumed",
        LZO_E_NOT_YET_IMPLEMENTED => "Not yet implemented",
        LZO_E_INVALID_ARGUMENT => "Invalid argument",
        _ => "Unknown error",
    }
}

/// Largest compressed size LZO1X-1 can produce for `len` input bytes.
#[must_use]
pub const fn worst_compress(len: usize) -> usize {
    len + len / 16 + 64 + 3
}

fn status_error(code: i32) -> Error {
    if code == LZO_E_OUT_OF_MEMORY {
        Error::OutOfMemory {
            backend: Backend::Lzo,
            code,
        }
    } else {
        Error::codec(Backend::Lzo, code, message(code))
    }
}

fn check(status: LZOError) -> Result<()> {
    if matches!(status, LZOError::OK) {
        Ok(())
    } else {
        Err(status_error(status as i32))
    }
}

/// Compresses `input` into `output`, returning the compressed length.
///
/// `output` must hold at least [`worst_compress`]`(input.len())` bytes;
/// smaller slices are refused with `LZO_E_OUTPUT_OVERRUN` before compressing.
pub fn compress_into(input: &[u8], output: &mut [u8]) -> Result<usize> {
    backend::load(Backend::Lzo)?;
    let needed = worst_compress(input.len());
    if output.len() < needed {
        return Err(Error::codec(
            Backend::Lzo,
            LZO_E_OUTPUT_OVERRUN,
            format!(
                "{}: need {needed} bytes of output space, got {}",
                message(LZO_E_OUTPUT_OVERRUN),
                output.len()
            ),
        ));
    }
    let mut context = LZOContext::new();
    let (compressed, status) = context.compress_to_slice(input, output);
    let len = compressed.len();
    check(status)?;
    Ok(len)
}

/// Compresses `input` into a new [`Vec`].
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = vec![0u8; worst_compress(input.len())];
    let len = compress_into(input, &mut output)?;
    output.truncate(len);
    Ok(output)
}

/// Decompresses `input` into `output`, returning the decompressed length.
pub fn decompress_into(input: &[u8], output: &mut [u8]) -> Result<usize> {
    backend::load(Backend::Lzo)?;
    let (decompressed, status) = LZOContext::decompress_to_slice(input, output);
    let len = decompressed.len();
    check(status)?;
    Ok(len)
}

/// Decompresses `input` into a new [`Vec`] of at most `max_output` bytes.
pub fn decompress(input: &[u8], max_output: usize) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    output
        .try_reserve_exact(max_output)
        .map_err(|_| Error::Allocation { size: max_output })?;
    output.resize(max_output, 0);
    let len = decompress_into(input, &mut output)?;
    output.truncate(len);
    Ok(output)
}
