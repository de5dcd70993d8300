//! String, line and pattern flavored wrappers over the byte primitives.
//!
//! These operate in C-string terms on the destination side: at most
//! `dest.len() - 1` bytes are copied and a terminating NUL is always
//! appended, so a `dest` of length `n` yields at most `n - 1` payload
//! bytes. None of them block, and none of them guarantee a complete
//! read or write; check the returned count.

use crate::buffer::TRY_READ;
use crate::{Consumer, Producer};
use core::slice::from_raw_parts;

impl<'a, const N: usize> Consumer<'a, N> {
    /// Drain buffered bytes into `dest` until it is full (less the
    /// terminator slot) or the buffer runs out. Returns the number of
    /// bytes copied, excluding the appended NUL.
    ///
    /// An empty `dest` is left untouched and reports 0.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        if dest.is_empty() {
            return 0;
        }

        let n = dest.len() - 1;
        let mut count = 0;

        while count < n {
            match self.try_pop() {
                Ok(byte) => {
                    dest[count] = byte;
                    count += 1;
                }
                Err(_) => break,
            }
        }

        dest[count] = 0;
        count
    }

    /// Like [`read`](Self::read), but reports 0 immediately unless a
    /// complete line is buffered, and stops at the end-of-line marker.
    /// The marker is consumed but not copied.
    ///
    /// If `dest` fills up before the marker is reached, the rest of the
    /// line, marker included, stays buffered.
    ///
    /// ```rust
    /// use charbuf::CharBuffer;
    ///
    /// let buf: CharBuffer<5> = CharBuffer::new();
    /// let (mut prod, mut cons) = buf.try_split().unwrap();
    /// buf.start();
    ///
    /// assert_eq!(prod.write(b"ab\n"), 3);
    /// assert_eq!(buf.len(), 3);
    /// assert_eq!(buf.lines(), 1);
    ///
    /// let mut dest = [0u8; 10];
    /// assert_eq!(cons.read_line(&mut dest), 2);
    /// assert_eq!(&dest[..2], b"ab");
    /// assert_eq!(buf.len(), 0);
    /// ```
    pub fn read_line(&mut self, dest: &mut [u8]) -> usize {
        let cb = unsafe { self.cb.as_ref() };

        if cb.lines() == 0 || dest.is_empty() {
            return 0;
        }

        let eol = cb.eol();
        let n = dest.len() - 1;
        let mut count = 0;

        while count < n {
            match self.try_pop() {
                Ok(byte) if byte == eol => break,
                Ok(byte) => {
                    dest[count] = byte;
                    count += 1;
                }
                Err(_) => break,
            }
        }

        dest[count] = 0;
        count
    }

    /// Scan the buffered bytes for a contiguous match of `pattern`,
    /// without consuming anything. Only if a full match is present are
    /// the bytes before it consumed (copying what fits into `dest`) and
    /// the match itself discarded; the count copied is returned.
    /// Otherwise nothing is consumed and 0 is returned.
    ///
    /// The read category bit is held for the whole scan-and-consume
    /// sequence, so `try_stop` fails for its duration.
    ///
    /// ```rust
    /// use charbuf::CharBuffer;
    ///
    /// let buf: CharBuffer<16> = CharBuffer::new();
    /// let (mut prod, mut cons) = buf.try_split().unwrap();
    /// buf.start();
    ///
    /// let mut dest = [0u8; 10];
    ///
    /// prod.write(b"hello");
    /// // No terminator buffered yet: nothing is consumed
    /// assert_eq!(cons.read_until(&mut dest, b"EOT"), 0);
    /// assert_eq!(buf.len(), 5);
    ///
    /// prod.write(b"EOT");
    /// assert_eq!(cons.read_until(&mut dest, b"EOT"), 5);
    /// assert_eq!(&dest[..5], b"hello");
    /// assert_eq!(buf.len(), 0);
    /// ```
    pub fn read_until(&mut self, dest: &mut [u8], pattern: &[u8]) -> usize {
        let cb = unsafe { self.cb.as_ref() };

        if dest.is_empty() || pattern.is_empty() {
            return 0;
        }

        let buffered = cb.len();
        if buffered < pattern.len() {
            return 0;
        }

        let res = if cb.claim(TRY_READ) {
            // Everything covered by the `buffered` snapshot has been
            // published, so the region behind the consumer cursor can be
            // scanned in place. The borrow must end before consumption
            // starts: compaction hands the scanned slots back to the
            // producer.
            let found = {
                let region =
                    unsafe { from_raw_parts(cb.storage().add(cb.read_index()), buffered) };
                region.windows(pattern.len()).position(|w| w == pattern)
            };

            match found {
                Some(at) => {
                    let cap = dest.len() - 1;
                    let mut copied = 0;

                    for _ in 0..at {
                        match cb.try_take() {
                            Ok(byte) => {
                                if copied < cap {
                                    dest[copied] = byte;
                                    copied += 1;
                                }
                            }
                            Err(_) => break,
                        }
                    }
                    dest[copied] = 0;

                    // Discard the matched pattern
                    for _ in 0..pattern.len() {
                        let _ = cb.try_take();
                    }

                    copied
                }
                None => 0,
            }
        } else {
            0
        };

        cb.unclaim(TRY_READ);
        res
    }
}

impl<'a, const N: usize> Producer<'a, N> {
    /// Store bytes from `src`, stopping at the first failure, at a NUL
    /// byte in `src`, or at the end of the slice. Returns the number of
    /// bytes actually stored.
    ///
    /// Built on [`try_push`](Self::try_push): a full buffer drops the
    /// remainder rather than waiting.
    ///
    /// ```rust
    /// use charbuf::CharBuffer;
    ///
    /// let buf: CharBuffer<4> = CharBuffer::new();
    /// let (mut prod, _cons) = buf.try_split().unwrap();
    /// buf.start();
    ///
    /// assert_eq!(prod.write(b"ab"), 2);
    /// assert_eq!(prod.write(b"cdef"), 2);
    /// assert_eq!(buf.len(), 4);
    /// ```
    pub fn write(&mut self, src: &[u8]) -> usize {
        let mut count = 0;

        for &byte in src {
            if byte == 0 {
                break;
            }
            if self.try_push(byte).is_err() {
                break;
            }
            count += 1;
        }

        count
    }
}
