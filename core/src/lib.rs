//! # charbuf
//!
//! `charbuf` is a Single Producer Single Consumer, lockless, no_std, thread
//! safe character buffer with line tracking and a cooperative start/stop
//! protocol.
//!
//! It is designed for exchanging a byte/character stream between exactly one
//! writer and one reader (two threads, or a thread and an interrupt handler)
//! in environments where no mutex or blocking primitive is available (UART
//! drivers, logging sinks, command-line consoles on bare metal).
//!
//! Unlike a classic ring buffer, `charbuf` fills a linear region and resets
//! it back to the start only once it has been fully drained (opportunistic
//! compaction). This keeps every operation a single atomic step with no
//! modulo arithmetic, at the cost of `is_full()` meaning "the linear region
//! is exhausted" rather than "`capacity()` bytes are buffered".
//!
//! ```rust
//! use charbuf::CharBuffer;
//!
//! let buf: CharBuffer<16> = CharBuffer::new();
//! let (mut prod, mut cons) = buf.try_split().unwrap();
//! buf.start();
//!
//! prod.try_push(b'h').unwrap();
//! prod.try_push(b'i').unwrap();
//! assert_eq!(buf.len(), 2);
//!
//! assert_eq!(cons.try_pop().unwrap(), b'h');
//! assert_eq!(cons.try_pop().unwrap(), b'i');
//! assert_eq!(buf.len(), 0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod buffer;
pub mod hooks;
mod text;

#[cfg(feature = "alloc")]
pub mod heap;

pub use crate::buffer::{CharBuffer, Consumer, Producer};
pub use crate::hooks::{ActionHook, ByteHook, Hooks, WaitHook};

use core::result::Result as CoreResult;

/// Result type used by the `charbuf` interfaces
pub type Result<T> = CoreResult<T, Error>;

/// Error type used by the `charbuf` interfaces
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt_0_3", derive(defmt::Format))]
pub enum Error {
    /// Unable to split the buffer, as it has already been split
    AlreadySplit,

    /// The linear fill region has no remaining write slots. Capacity is
    /// reclaimed by compaction once the buffer is fully drained, not by
    /// individual reads
    Full,

    /// No bytes are currently buffered
    Empty,

    /// The buffer is administratively stopped, or was force-stopped while
    /// the call was waiting
    Stopped,

    /// A wait hook requested cancellation of a blocking call
    Cancelled,

    /// The consumer cursor was found outside the valid range. This implies
    /// external corruption or misuse, never ordinary backpressure
    Corrupted,
}
