//! Structured logging for adapter lifecycle and backend registry events.
//!
//! Adapter events use the `codec::stream` target and registry events use
//! `codec::backend`. Every helper has a no-op twin when the `tracing` feature is
//! disabled, so call sites never need their own `cfg` guards.

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::codec::Direction;
use crate::error::Error;

/// Trace a backend accepted by the registry.
#[cfg(feature = "tracing")]
#[inline]
pub fn backend_loaded(backend: Backend, search_path: Option<&str>) {
    debug!(
        target: "codec::backend",
        backend = backend.name(),
        search_path = search_path.unwrap_or("<builtin>"),
        "loaded {} backend",
        backend
    );
}

/// Trace a backend accepted by the registry - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn backend_loaded(_backend: Backend, _search_path: Option<&str>) {}

/// Trace a backend refused by the registry.
#[cfg(feature = "tracing")]
#[inline]
pub fn backend_refused(backend: Backend, reason: &str) {
    debug!(
        target: "codec::backend",
        backend = backend.name(),
        reason = reason,
        "refused {} backend: {}",
        backend,
        reason
    );
}

/// Trace a backend refused by the registry - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn backend_refused(_backend: Backend, _reason: &str) {}

/// Trace adapter construction.
#[cfg(feature = "tracing")]
#[inline]
pub fn stream_opened(backend: Backend, direction: Direction, buffer: usize) {
    debug!(
        target: "codec::stream",
        backend = backend.name(),
        direction = direction.as_str(),
        buffer = buffer,
        "opened {} {} stream",
        backend,
        direction
    );
}

/// Trace adapter construction - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn stream_opened(_backend: Backend, _direction: Direction, _buffer: usize) {}

/// Trace the end of a member or frame.
#[cfg(feature = "tracing")]
#[inline]
pub fn member_end(backend: Backend, direction: Direction, total_in: u64, total_out: u64) {
    debug!(
        target: "codec::stream",
        backend = backend.name(),
        direction = direction.as_str(),
        total_in = total_in,
        total_out = total_out,
        "{} member complete",
        backend
    );
}

/// Trace the end of a member or frame - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn member_end(_backend: Backend, _direction: Direction, _total_in: u64, _total_out: u64) {}

/// Trace an adapter reset.
#[cfg(feature = "tracing")]
#[inline]
pub fn stream_reset(backend: Backend, direction: Direction, total_in: u64, total_out: u64) {
    debug!(
        target: "codec::stream",
        backend = backend.name(),
        direction = direction.as_str(),
        total_in = total_in,
        total_out = total_out,
        "reset {} {} stream",
        backend,
        direction
    );
}

/// Trace an adapter reset - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn stream_reset(_backend: Backend, _direction: Direction, _total_in: u64, _total_out: u64) {}

/// Trace an adapter close.
#[cfg(feature = "tracing")]
#[inline]
pub fn stream_closed(backend: Backend, direction: Direction, total_in: u64, total_out: u64) {
    debug!(
        target: "codec::stream",
        backend = backend.name(),
        direction = direction.as_str(),
        total_in = total_in,
        total_out = total_out,
        "closed {} {} stream",
        backend,
        direction
    );
}

/// Trace an adapter close - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn stream_closed(_backend: Backend, _direction: Direction, _total_in: u64, _total_out: u64) {}

/// Report an error swallowed while dropping an adapter.
#[cfg(feature = "tracing")]
#[inline]
pub fn drop_error(backend: Backend, direction: Direction, err: &Error) {
    warn!(
        target: "codec::stream",
        backend = backend.name(),
        direction = direction.as_str(),
        error = %err,
        "error while closing {} {} stream on drop",
        backend,
        direction
    );
}

/// Report an error swallowed while dropping an adapter - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn drop_error(_backend: Backend, _direction: Direction, _err: &Error) {}
