//! Compression level shared by every backend.
//!
//! Backends interpret the level differently: deflate uses it directly, LZMA
//! treats it as the preset number and LZ4 picks a block size from it.

use std::num::NonZeroU8;
use std::str::FromStr;

/// Level requested from an encoder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompressionLevel {
    /// Level 0: store where the backend can.
    None,
    /// Level 1.
    Fast,
    /// Level 6, the usual speed/ratio compromise.
    #[default]
    Default,
    /// Level 9.
    Best,
    /// An explicit level in `1..=9`.
    Precise(NonZeroU8),
}

impl CompressionLevel {
    /// Maps `0` to [`None`](Self::None) and `1..=9` to [`Precise`](Self::Precise).
    pub fn from_numeric(level: u32) -> Result<Self, CompressionLevelError> {
        if level == 0 {
            return Ok(Self::None);
        }
        u8::try_from(level)
            .ok()
            .filter(|value| *value <= 9)
            .and_then(NonZeroU8::new)
            .map(Self::Precise)
            .ok_or(CompressionLevelError { level })
    }

    /// Wraps an explicit level without range checking.
    #[must_use]
    pub const fn precise(level: NonZeroU8) -> Self {
        Self::Precise(level)
    }

    /// The level as a number, with the named variants resolved.
    #[must_use]
    pub const fn numeric(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Fast => 1,
            Self::Default => 6,
            Self::Best => 9,
            Self::Precise(value) => value.get() as u32,
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = CompressionLevelError;

    /// Accepts `none`, `fast`, `default`, `best` or a digit string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "store" => Ok(Self::None),
            "fast" => Ok(Self::Fast),
            "default" => Ok(Self::Default),
            "best" => Ok(Self::Best),
            digits => digits
                .parse::<u32>()
                .map_err(|_| CompressionLevelError { level: u32::MAX })
                .and_then(Self::from_numeric),
        }
    }
}

/// A level outside `0..=9`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("compression level {level} is outside the supported range 0-9")]
pub struct CompressionLevelError {
    level: u32,
}

impl CompressionLevelError {
    /// The rejected value; `u32::MAX` when the input was not a number.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}
