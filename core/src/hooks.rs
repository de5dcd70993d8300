//! Optional notification hooks.
//!
//! Every hook slot is a plain `fn` pointer, so a hook set can be compared
//! and copied field-by-field by the diagnostic operations. All hooks are
//! invoked synchronously on the thread of the role that triggered them:
//! write-side hooks (`on_full`, `on_byte`, `on_line`, `on_wait_write`) run
//! on the producer, read-side hooks (`on_empty`, `on_error`, `on_wait_read`)
//! on the consumer, and `on_start`/`on_stop` on whichever thread performed
//! the administrative call.
//!
//! Hooks may be installed only while the buffer is fully stopped, via
//! [`CharBuffer::set_hooks`](crate::CharBuffer::set_hooks).

use crate::buffer::CharBuffer;

/// Hook invoked with the buffer alone.
///
/// Used by `on_start`, `on_stop`, `on_empty`, `on_line` and `on_error`.
pub type ActionHook<const N: usize> = fn(&CharBuffer<N>);

/// Hook invoked with the buffer and the byte in focus.
///
/// Used by `on_full` (the byte that could NOT be stored) and `on_byte`
/// (the byte that was just stored).
pub type ByteHook<const N: usize> = fn(&CharBuffer<N>, u8);

/// Hook polled once per iteration while a blocking call waits.
///
/// Returning `true` cancels the waiting call, which then fails with
/// [`Error::Cancelled`](crate::Error::Cancelled).
///
/// A wait hook must not block. If it wants to honor an external stop
/// request it should consult
/// [`CharBuffer::is_stopped`](crate::CharBuffer::is_stopped) itself;
/// the buffer re-checks its activity bit only after the hook returns.
pub type WaitHook<const N: usize> = fn(&CharBuffer<N>) -> bool;

/// The set of optional notification hooks carried by a buffer.
///
/// Unset slots cost nothing. Construct with struct-update syntax:
///
/// ```rust
/// use charbuf::{CharBuffer, Hooks};
///
/// fn note_full(_buf: &CharBuffer<8>, _rejected: u8) {}
///
/// let buf: CharBuffer<8> = CharBuffer::new();
/// assert!(buf.set_hooks(Hooks {
///     on_full: Some(note_full),
///     ..Hooks::new()
/// }));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hooks<const N: usize> {
    /// Fired by a successful `start`.
    pub on_start: Option<ActionHook<N>>,

    /// Fired by `force_stop` and `try_stop` when the buffer reads back as
    /// fully stopped.
    pub on_stop: Option<ActionHook<N>>,

    /// Fired by a write attempt that found no remaining slot. Receives the
    /// byte that was not stored. Producer side.
    pub on_full: Option<ByteHook<N>>,

    /// Fired when compaction resets the buffer back to its start.
    pub on_empty: Option<ActionHook<N>>,

    /// Fired after a byte was stored. Producer side.
    pub on_byte: Option<ByteHook<N>>,

    /// Fired after a stored byte matched the end-of-line marker. Producer
    /// side, after `on_byte`.
    pub on_line: Option<ActionHook<N>>,

    /// Fired when the consumer cursor is found outside the valid range.
    /// Consumer side.
    pub on_error: Option<ActionHook<N>>,

    /// Polled while a blocking write waits for space.
    pub on_wait_write: Option<WaitHook<N>>,

    /// Polled while a blocking read waits for data.
    pub on_wait_read: Option<WaitHook<N>>,
}

impl<const N: usize> Hooks<N> {
    /// An empty hook set. `const` so it can live in statics.
    pub const fn new() -> Self {
        Self {
            on_start: None,
            on_stop: None,
            on_full: None,
            on_empty: None,
            on_byte: None,
            on_line: None,
            on_error: None,
            on_wait_write: None,
            on_wait_read: None,
        }
    }
}

impl<const N: usize> Default for Hooks<N> {
    fn default() -> Self {
        Self::new()
    }
}
