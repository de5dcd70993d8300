//! The buffer core: embedded storage, the run-state machine, and the
//! blocking / non-blocking byte primitives.

use crate::{hooks::Hooks, Error, Result};
use core::{
    cell::UnsafeCell,
    marker::PhantomData,
    mem::MaybeUninit,
    ptr::NonNull,
    result::Result as CoreResult,
    sync::atomic::{
        AtomicBool, AtomicU8, AtomicUsize,
        Ordering::{AcqRel, Acquire, Relaxed, Release},
    },
};

/// Fully stopped: no activity bit, no in-flight category bits.
const STOPPED: u8 = 0x00;

/// Category bit of the single-attempt write path.
const TRY_WRITE: u8 = 0x01;

/// Category bit of the single-attempt read path. Also held by `peek`,
/// `clear`, and the whole scan-and-consume sequence of `read_until`.
pub(crate) const TRY_READ: u8 = 0x02;

/// Category bit of the blocking write path.
const WRITE: u8 = 0x04;

/// Category bit of the blocking read path.
const READ: u8 = 0x08;

/// Activity bit. Any state value at or above this means the buffer is
/// administratively started.
const ACTIVE: u8 = 0x10;

/// Mask of the four in-flight category bits.
const RUNNING: u8 = TRY_WRITE | TRY_READ | WRITE | READ;

#[derive(Debug)]
/// A fixed-capacity, line-aware SPSC character buffer. Can be split into
/// a `Producer`/`Consumer` pair; administrative and diagnostic calls stay
/// on the buffer itself.
///
/// The storage is a *linear fill region*, not a ring: the producer cursor
/// only ever advances until the region is exhausted, and both cursors are
/// reset to the start once the consumer has drained everything (see
/// [`CharBuffer::clear`] and the compaction notes on the read primitives).
pub struct CharBuffer<const N: usize> {
    pub(crate) buf: UnsafeCell<MaybeUninit<[u8; N]>>,

    /// Producer cursor: index of the next write. `N` means the linear
    /// region is exhausted. Advanced by the producer, reset to zero by the
    /// consumer's compaction CAS.
    write: AtomicUsize,

    /// Consumer cursor: index of the next read. Logically owned by the
    /// single consumer; atomic only because the struct is shared.
    read: AtomicUsize,

    /// Number of buffered, unread bytes.
    used: AtomicUsize,

    /// Number of buffered, unread bytes equal to the end-of-line marker.
    lines: AtomicUsize,

    /// Run-state bitmask: the activity bit plus a population count of
    /// in-flight call categories.
    state: AtomicU8,

    /// End-of-line marker, `b'\n'` unless reconfigured while stopped.
    eol: AtomicU8,

    /// Optional notification hooks. Mutable only while fully stopped;
    /// that obligation is on the caller, as with the cursors' role rules.
    hooks: UnsafeCell<Hooks<N>>,

    /// Have we already split?
    pub(crate) already_split: AtomicBool,
}

unsafe impl<const N: usize> Sync for CharBuffer<N> {}

impl<const N: usize> CharBuffer<N> {
    /// Create a new stopped buffer.
    ///
    /// `const`, so buffers can live at `static` scope:
    ///
    /// ```rust
    /// use charbuf::CharBuffer;
    ///
    /// static BUF: CharBuffer<64> = CharBuffer::new();
    ///
    /// let (prod, cons) = BUF.try_split().unwrap();
    /// assert!(BUF.is_stopped());
    /// ```
    pub const fn new() -> Self {
        Self {
            // Not initialized until we split the buffer
            buf: UnsafeCell::new(MaybeUninit::uninit()),

            // Owned by the writer, reset by the reader's compaction
            write: AtomicUsize::new(0),

            // Owned by the reader
            read: AtomicUsize::new(0),

            used: AtomicUsize::new(0),
            lines: AtomicUsize::new(0),
            state: AtomicU8::new(STOPPED),
            eol: AtomicU8::new(b'\n'),
            hooks: UnsafeCell::new(Hooks::new()),
            already_split: AtomicBool::new(false),
        }
    }

    /// Create a buffer that is already started, without going through
    /// [`start`](Self::start) (and therefore without firing `on_start`).
    ///
    /// A zero-capacity buffer cannot be started and is created stopped.
    pub const fn new_started() -> Self {
        Self {
            buf: UnsafeCell::new(MaybeUninit::uninit()),
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            used: AtomicUsize::new(0),
            lines: AtomicUsize::new(0),
            state: AtomicU8::new(if N == 0 { STOPPED } else { ACTIVE }),
            eol: AtomicU8::new(b'\n'),
            hooks: UnsafeCell::new(Hooks::new()),
            already_split: AtomicBool::new(false),
        }
    }

    /// Returns the size of the backing storage.
    ///
    /// This is the maximum number of bytes the linear region can hold
    /// between two compactions.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<'a, const N: usize> CharBuffer<N> {
    /// Attempt to split the buffer into `Producer` and `Consumer` halves.
    /// If the buffer has already been split, an error will be returned.
    ///
    /// NOTE: When splitting, the underlying storage will be explicitly
    /// initialized to zero. If the buffer is placed at `static` scope
    /// within the `.bss` region, the explicit initialization will be
    /// elided (as it is already performed as part of memory
    /// initialization).
    ///
    /// ```rust
    /// use charbuf::CharBuffer;
    ///
    /// let buf: CharBuffer<8> = CharBuffer::new();
    /// let (prod, cons) = buf.try_split().unwrap();
    ///
    /// // Not possible to split twice
    /// assert!(buf.try_split().is_err());
    /// ```
    pub fn try_split(&'a self) -> Result<(Producer<'a, N>, Consumer<'a, N>)> {
        if atomic::swap(&self.already_split, true, AcqRel) {
            return Err(Error::AlreadySplit);
        }

        unsafe {
            // Explicitly zero the data to avoid undefined behavior.
            // This is required, because we hand out references to the
            // storage, which mean that creating them as references is
            // technically UB for now
            let mu_ptr = self.buf.get();
            (*mu_ptr).as_mut_ptr().write_bytes(0u8, 1);

            let nn1 = NonNull::new_unchecked(self as *const _ as *mut _);
            let nn2 = NonNull::new_unchecked(self as *const _ as *mut _);

            Ok((
                Producer {
                    cb: nn1,
                    pd: PhantomData,
                },
                Consumer {
                    cb: nn2,
                    pd: PhantomData,
                },
            ))
        }
    }

    /// Attempt to release the `Producer` and `Consumer`.
    ///
    /// This resets the cursors and counts so the buffer may be split again
    /// later. The run state, hooks and end-of-line marker survive. Fails
    /// and returns the halves if any category bit is still in flight, or
    /// if the halves belong to a different buffer.
    pub fn try_release(
        &'a self,
        prod: Producer<'a, N>,
        cons: Consumer<'a, N>,
    ) -> CoreResult<(), (Producer<'a, N>, Consumer<'a, N>)> {
        // Are these our producer and consumer?
        let our_prod = prod.cb.as_ptr() as *const Self == self as *const Self;
        let our_cons = cons.cb.as_ptr() as *const Self == self as *const Self;

        if !(our_prod && our_cons) {
            return Err((prod, cons));
        }

        if self.state.load(Acquire) & RUNNING != 0 {
            // Can't release, operation(s) in flight
            return Err((prod, cons));
        }

        // Drop the producer and consumer halves
        drop(prod);
        drop(cons);

        self.write.store(0, Release);
        self.read.store(0, Release);
        self.used.store(0, Release);
        self.lines.store(0, Release);

        // Mark the buffer as ready to be split again
        self.already_split.store(false, Release);

        Ok(())
    }
}

/// Administration and diagnostics. Safe from either role.
impl<const N: usize> CharBuffer<N> {
    /// Start the buffer, permitting read/write traffic, and fire
    /// `on_start`. Fails only for a zero-capacity buffer.
    pub fn start(&self) -> bool {
        if N == 0 {
            return false;
        }

        atomic::fetch_or_u8(&self.state, ACTIVE, AcqRel);

        let on_start = self.hook_ref().on_start;
        if let Some(f) = on_start {
            f(self);
        }

        true
    }

    /// Clear the activity bit unconditionally, signalling every blocking
    /// loop to cancel.
    ///
    /// Returns `true`, and fires `on_stop`, only when the buffer already
    /// read back as fully stopped before this call. Otherwise in-flight
    /// operations may still be draining; call again (or poll
    /// [`is_stopped`](Self::is_stopped)) to confirm quiescence.
    pub fn force_stop(&self) -> bool {
        let prev = atomic::fetch_and_u8(&self.state, !ACTIVE, AcqRel);

        if prev == STOPPED {
            let on_stop = self.hook_ref().on_stop;
            if let Some(f) = on_stop {
                f(self);
            }
            return true;
        }

        false
    }

    /// Stop the buffer only if it is quiescent: started, with no category
    /// bit in flight. An already-stopped buffer reports success (and fires
    /// `on_stop` again); a buffer with any operation in flight reports
    /// failure without altering state.
    pub fn try_stop(&self) -> bool {
        let state = self.state.load(Acquire);

        if state == STOPPED {
            let on_stop = self.hook_ref().on_stop;
            if let Some(f) = on_stop {
                f(self);
            }
            return true;
        }

        if state == ACTIVE
            && atomic::compare_exchange_u8(&self.state, ACTIVE, STOPPED, AcqRel).is_ok()
        {
            let on_stop = self.hook_ref().on_stop;
            if let Some(f) = on_stop {
                f(self);
            }
            return true;
        }

        false
    }

    /// Re-initialize the buffer against the same storage: cursors and
    /// counts to zero, end-of-line marker back to `b'\n'`, hooks cleared,
    /// then optionally started.
    ///
    /// Returns whether the buffer was already fully stopped when the call
    /// began. Must not be called while a producer or consumer operation is
    /// genuinely in flight; confirm quiescence with
    /// [`try_stop`](Self::try_stop) first. That obligation is on the
    /// caller; `reset` does not wait.
    pub fn reset(&self, start: bool) -> bool {
        let stopped = atomic::fetch_and_u8(&self.state, !ACTIVE, AcqRel) == STOPPED;

        self.eol.store(b'\n', Relaxed);

        unsafe {
            *self.hooks.get() = Hooks::new();
        }

        self.read.store(0, Relaxed);
        self.write.store(0, Relaxed);
        self.used.store(0, Relaxed);
        self.lines.store(0, Relaxed);
        self.state.store(STOPPED, Release);

        if start {
            self.start();
        }

        stopped
    }

    /// Install a new hook set. Refused unless the buffer is fully stopped.
    pub fn set_hooks(&self, hooks: Hooks<N>) -> bool {
        if self.state.load(Acquire) != STOPPED {
            return false;
        }

        unsafe {
            *self.hooks.get() = hooks;
        }

        true
    }

    /// The currently installed hook set.
    pub fn hooks(&self) -> Hooks<N> {
        *self.hook_ref()
    }

    /// Set the end-of-line marker used for line counting and line reads.
    /// Refused unless the buffer is fully stopped.
    pub fn set_eol(&self, marker: u8) -> bool {
        if self.state.load(Acquire) != STOPPED {
            return false;
        }

        self.eol.store(marker, Relaxed);
        true
    }

    /// The current end-of-line marker.
    pub fn eol(&self) -> u8 {
        self.eol.load(Relaxed)
    }

    /// Number of buffered, unread bytes.
    pub fn len(&self) -> usize {
        self.used.load(Acquire)
    }

    /// Number of buffered, unread bytes equal to the end-of-line marker.
    pub fn lines(&self) -> usize {
        self.lines.load(Acquire)
    }

    /// Remaining write slots in the linear region. Capacity consumed by
    /// already-read bytes is not counted back until compaction.
    pub fn space(&self) -> usize {
        N.saturating_sub(self.write.load(Acquire))
    }

    /// Whether the producer cursor is back at the start of the region,
    /// i.e. the buffer is drained *and* compacted. A buffer whose bytes
    /// were all read but whose compaction was deferred is not "empty" in
    /// this sense even though [`len`](Self::len) is zero.
    pub fn is_empty(&self) -> bool {
        self.write.load(Acquire) == 0
    }

    /// Whether the linear region is exhausted, irrespective of
    /// [`len`](Self::len): bytes already read do not make room until a
    /// full drain lets compaction reset the region.
    ///
    /// ```rust
    /// use charbuf::CharBuffer;
    ///
    /// let buf: CharBuffer<4> = CharBuffer::new();
    /// let (mut prod, mut cons) = buf.try_split().unwrap();
    /// buf.start();
    ///
    /// for b in *b"abcd" {
    ///     prod.try_push(b).unwrap();
    /// }
    /// assert!(buf.is_full());
    ///
    /// // One byte read: still full, the region is not reclaimed
    /// cons.try_pop().unwrap();
    /// assert!(buf.is_full());
    /// assert_eq!(buf.len(), 3);
    /// ```
    pub fn is_full(&self) -> bool {
        self.write.load(Acquire) >= N
    }

    /// Whether the buffer is fully stopped: not started, nothing in
    /// flight.
    pub fn is_stopped(&self) -> bool {
        self.state.load(Acquire) == STOPPED
    }

    /// Field-by-field comparison for diagnostics. Every atomic field is
    /// loaded independently, so the result is NOT a consistent snapshot
    /// under concurrent mutation. Storage contents are not compared.
    pub fn observed_eq(&self, other: &Self) -> bool {
        self.eol.load(Relaxed) == other.eol.load(Relaxed)
            && *self.hook_ref() == *other.hook_ref()
            && self.read.load(Relaxed) == other.read.load(Relaxed)
            && self.write.load(Relaxed) == other.write.load(Relaxed)
            && self.used.load(Relaxed) == other.used.load(Relaxed)
            && self.lines.load(Relaxed) == other.lines.load(Relaxed)
            && self.state.load(Relaxed) == other.state.load(Relaxed)
    }

    /// Field-by-field duplication into `dest` for diagnostics, with the
    /// same non-snapshot caveat as [`observed_eq`](Self::observed_eq).
    /// `dest` must not be in use by either role. Storage contents are not
    /// copied.
    pub fn copy_into(&self, dest: &Self) {
        dest.eol.store(self.eol.load(Relaxed), Relaxed);
        unsafe {
            *dest.hooks.get() = *self.hook_ref();
        }
        dest.read.store(self.read.load(Relaxed), Relaxed);
        dest.write.store(self.write.load(Relaxed), Relaxed);
        dest.used.store(self.used.load(Relaxed), Relaxed);
        dest.lines.store(self.lines.load(Relaxed), Relaxed);
        dest.state.store(self.state.load(Relaxed), Relaxed);
    }

    /// Try to clear the buffer from either role.
    ///
    /// Snapshots the producer cursor and both counts, then attempts the
    /// compaction compare-and-swap against the snapshot. On success the
    /// snapshotted counts are *subtracted*, not zeroed, so bytes a
    /// concurrent writer landed after the snapshot stay counted, and
    /// `on_empty` fires. A concurrent write before the swap makes the
    /// call fail without partial mutation.
    ///
    /// Works on a stopped buffer as well; returns `true` when the buffer
    /// was already drained-and-compacted.
    pub fn clear(&self) -> bool {
        // No activity gate here, but the category bit is still claimed so
        // try_stop sees the call in flight.
        atomic::fetch_add_u8(&self.state, TRY_READ, AcqRel);

        let mut cleared = true;

        if self.used.load(Acquire) > 0 {
            cleared = false;

            let write = self.write.load(Acquire);
            let used = self.used.load(Acquire);
            let lines = self.lines.load(Acquire);

            if atomic::compare_exchange(&self.write, write, 0, AcqRel).is_ok() {
                self.read.store(0, Relaxed);

                atomic::fetch_sub(&self.used, used, AcqRel);
                atomic::fetch_sub(&self.lines, lines, AcqRel);

                let on_empty = self.hook_ref().on_empty;
                if let Some(f) = on_empty {
                    f(self);
                }

                cleared = true;
            }
        }

        atomic::fetch_sub_u8(&self.state, TRY_READ, AcqRel);
        cleared
    }
}

/// Internal primitives shared by the handles and the text wrappers.
impl<const N: usize> CharBuffer<N> {
    #[inline(always)]
    fn hook_ref(&self) -> &Hooks<N> {
        unsafe { &*self.hooks.get() }
    }

    /// Claim a category bit and report whether the buffer was started at
    /// that instant. The bit must be released on every exit path.
    #[inline(always)]
    pub(crate) fn claim(&self, flag: u8) -> bool {
        atomic::fetch_add_u8(&self.state, flag, AcqRel) >= ACTIVE
    }

    #[inline(always)]
    pub(crate) fn unclaim(&self, flag: u8) {
        atomic::fetch_sub_u8(&self.state, flag, AcqRel);
    }

    /// Claim the next write slot and store `byte`. Returns `false` when
    /// the linear region is exhausted.
    fn commit_byte(&self, byte: u8) -> bool {
        if self.write.load(Acquire) >= N {
            return false;
        }

        // Between the check and the fetch_add only the consumer can move
        // `write`, and only backwards to zero, so the slot claimed here
        // stays in bounds.
        let slot = atomic::fetch_add(&self.write, 1, AcqRel);

        unsafe {
            self.buf.get().cast::<u8>().add(slot).write(byte);
        }

        let eol = self.eol.load(Relaxed);
        if byte == eol {
            atomic::fetch_add(&self.lines, 1, AcqRel);
        }

        // `used` is the publication point the consumer waits on; bump it
        // after the byte store.
        atomic::fetch_add(&self.used, 1, AcqRel);

        let on_byte = self.hook_ref().on_byte;
        if let Some(f) = on_byte {
            f(self, byte);
        }

        if byte == eol {
            let on_line = self.hook_ref().on_line;
            if let Some(f) = on_line {
                f(self);
            }
        }

        true
    }

    /// Take one byte at the consumer cursor. The caller has already seen
    /// `used > 0`. The out-of-range branch is a defensive check against
    /// external corruption, not an expected path.
    fn take_byte(&self) -> Result<u8> {
        let read = self.read.load(Relaxed);

        if read >= N {
            let on_error = self.hook_ref().on_error;
            if let Some(f) = on_error {
                f(self);
            }
            return Err(Error::Corrupted);
        }

        let byte = unsafe { self.buf.get().cast::<u8>().add(read).read() };

        let next = read + 1;
        self.read.store(next, Relaxed);

        atomic::fetch_sub(&self.used, 1, AcqRel);

        if byte == self.eol.load(Relaxed) {
            atomic::fetch_sub(&self.lines, 1, AcqRel);
        }

        self.compact(next);

        Ok(byte)
    }

    /// Opportunistic compaction: once the consumer has drained everything
    /// the producer published, move both cursors back to the start of the
    /// region and fire `on_empty`. Losing the swap to a concurrent write
    /// is harmless; reuse is deferred to the next full drain.
    fn compact(&self, read: usize) {
        if atomic::compare_exchange(&self.write, read, 0, AcqRel).is_ok() {
            self.read.store(0, Relaxed);

            let on_empty = self.hook_ref().on_empty;
            if let Some(f) = on_empty {
                f(self);
            }
        }
    }

    /// Single-attempt read, with the category bit claimed for the span of
    /// the call. `read_until` nests these inside its own claim.
    pub(crate) fn try_take(&self) -> Result<u8> {
        let res = if self.claim(TRY_READ) {
            if self.used.load(Acquire) > 0 {
                self.take_byte()
            } else {
                Err(Error::Empty)
            }
        } else {
            Err(Error::Stopped)
        };

        self.unclaim(TRY_READ);
        res
    }

    pub(crate) fn storage(&self) -> *const u8 {
        self.buf.get().cast::<u8>()
    }

    pub(crate) fn read_index(&self) -> usize {
        self.read.load(Relaxed)
    }
}

/// `Producer` is the writer half of a split [`CharBuffer`]: the only
/// handle permitted to store bytes. It is `Send` but not `Clone`, which
/// pins the single-writer role at compile time.
pub struct Producer<'a, const N: usize> {
    pub(crate) cb: NonNull<CharBuffer<N>>,
    pub(crate) pd: PhantomData<&'a ()>,
}

unsafe impl<'a, const N: usize> Send for Producer<'a, N> {}

impl<'a, const N: usize> Producer<'a, N> {
    /// Store one byte, waiting for space if the region is exhausted.
    ///
    /// Each iteration of the wait loop fires `on_full` with the pending
    /// byte, then polls `on_wait_write` (a `true` return cancels the call
    /// with [`Error::Cancelled`]), then re-checks the activity bit so a
    /// concurrent [`CharBuffer::force_stop`] aborts the wait with
    /// [`Error::Stopped`]. The loop busy-polls; pacing is the wait hook's
    /// job.
    pub fn push(&mut self, byte: u8) -> Result<()> {
        let cb = unsafe { self.cb.as_ref() };

        let res = if cb.claim(WRITE) {
            loop {
                if cb.commit_byte(byte) {
                    break Ok(());
                }

                let on_full = cb.hook_ref().on_full;
                if let Some(f) = on_full {
                    f(cb, byte);
                }

                let on_wait = cb.hook_ref().on_wait_write;
                if let Some(f) = on_wait {
                    if f(cb) {
                        // Cancelled by the hook
                        break Err(Error::Cancelled);
                    }
                }

                if cb.state.load(Acquire) < ACTIVE {
                    // Cancelled by a forced stop
                    break Err(Error::Stopped);
                }
            }
        } else {
            Err(Error::Stopped)
        };

        cb.unclaim(WRITE);
        res
    }

    /// Store one byte if a slot is free, or skip it.
    ///
    /// On failure `on_full` fires with the rejected byte and the call
    /// returns [`Error::Full`] immediately, with no wait/cancel logic.
    ///
    /// ```rust
    /// use charbuf::{CharBuffer, Error};
    ///
    /// let buf: CharBuffer<2> = CharBuffer::new();
    /// let (mut prod, _cons) = buf.try_split().unwrap();
    /// buf.start();
    ///
    /// prod.try_push(b'a').unwrap();
    /// prod.try_push(b'b').unwrap();
    /// assert_eq!(prod.try_push(b'c'), Err(Error::Full));
    /// ```
    pub fn try_push(&mut self, byte: u8) -> Result<()> {
        let cb = unsafe { self.cb.as_ref() };

        let res = if cb.claim(TRY_WRITE) {
            if cb.commit_byte(byte) {
                Ok(())
            } else {
                let on_full = cb.hook_ref().on_full;
                if let Some(f) = on_full {
                    f(cb, byte);
                }
                Err(Error::Full)
            }
        } else {
            Err(Error::Stopped)
        };

        cb.unclaim(TRY_WRITE);
        res
    }

    /// Access the shared buffer, e.g. for diagnostics from the producer
    /// thread.
    pub fn buffer(&self) -> &CharBuffer<N> {
        unsafe { self.cb.as_ref() }
    }
}

/// `Consumer` is the reader half of a split [`CharBuffer`]: the only
/// handle permitted to take bytes out. It is `Send` but not `Clone`,
/// which pins the single-reader role at compile time.
pub struct Consumer<'a, const N: usize> {
    pub(crate) cb: NonNull<CharBuffer<N>>,
    pub(crate) pd: PhantomData<&'a ()>,
}

unsafe impl<'a, const N: usize> Send for Consumer<'a, N> {}

impl<'a, const N: usize> Consumer<'a, N> {
    /// Take one byte, waiting for data if none is buffered.
    ///
    /// The wait loop polls `on_wait_read` (a `true` return cancels with
    /// [`Error::Cancelled`]) and re-checks the activity bit each
    /// iteration, exactly like [`Producer::push`]. After a successful
    /// read, compaction is attempted.
    pub fn pop(&mut self) -> Result<u8> {
        let cb = unsafe { self.cb.as_ref() };

        let res = if cb.claim(READ) {
            loop {
                if cb.used.load(Acquire) > 0 {
                    break cb.take_byte();
                }

                let on_wait = cb.hook_ref().on_wait_read;
                if let Some(f) = on_wait {
                    if f(cb) {
                        // Cancelled by the hook
                        break Err(Error::Cancelled);
                    }
                }

                if cb.state.load(Acquire) < ACTIVE {
                    // Cancelled by a forced stop
                    break Err(Error::Stopped);
                }
            }
        } else {
            Err(Error::Stopped)
        };

        cb.unclaim(READ);
        res
    }

    /// Take one byte if any is buffered.
    ///
    /// Returns [`Error::Empty`] when nothing is available. On success,
    /// compaction is attempted.
    ///
    /// ```rust
    /// use charbuf::{CharBuffer, Error};
    ///
    /// let buf: CharBuffer<4> = CharBuffer::new();
    /// let (mut prod, mut cons) = buf.try_split().unwrap();
    /// buf.start();
    ///
    /// assert_eq!(cons.try_pop(), Err(Error::Empty));
    /// prod.try_push(b'x').unwrap();
    /// assert_eq!(cons.try_pop(), Ok(b'x'));
    /// ```
    pub fn try_pop(&mut self) -> Result<u8> {
        let cb = unsafe { self.cb.as_ref() };
        cb.try_take()
    }

    /// Read the next buffered byte without consuming it: the cursor does
    /// not advance, no count changes, and compaction never happens.
    pub fn peek(&mut self) -> Result<u8> {
        let cb = unsafe { self.cb.as_ref() };

        let res = if cb.claim(TRY_READ) {
            if cb.used.load(Acquire) > 0 {
                let read = cb.read.load(Relaxed);
                if read < N {
                    Ok(unsafe { cb.buf.get().cast::<u8>().add(read).read() })
                } else {
                    Err(Error::Empty)
                }
            } else {
                Err(Error::Empty)
            }
        } else {
            Err(Error::Stopped)
        };

        cb.unclaim(TRY_READ);
        res
    }

    /// Access the shared buffer, e.g. for diagnostics from the consumer
    /// thread.
    pub fn buffer(&self) -> &CharBuffer<N> {
        unsafe { self.cb.as_ref() }
    }
}

#[cfg(feature = "thumbv6")]
pub(crate) mod atomic {
    use core::result::Result as CoreResult;
    use core::sync::atomic::{
        AtomicBool, AtomicU8, AtomicUsize,
        Ordering::{self, Acquire, Release},
    };
    use cortex_m::interrupt::free;

    #[inline(always)]
    pub fn fetch_add(atomic: &AtomicUsize, val: usize, _order: Ordering) -> usize {
        free(|_| {
            let prev = atomic.load(Acquire);
            atomic.store(prev.wrapping_add(val), Release);
            prev
        })
    }

    #[inline(always)]
    pub fn fetch_sub(atomic: &AtomicUsize, val: usize, _order: Ordering) -> usize {
        free(|_| {
            let prev = atomic.load(Acquire);
            atomic.store(prev.wrapping_sub(val), Release);
            prev
        })
    }

    #[inline(always)]
    pub fn compare_exchange(
        atomic: &AtomicUsize,
        current: usize,
        new: usize,
        _order: Ordering,
    ) -> CoreResult<usize, usize> {
        free(|_| {
            let prev = atomic.load(Acquire);
            if prev == current {
                atomic.store(new, Release);
                Ok(prev)
            } else {
                Err(prev)
            }
        })
    }

    #[inline(always)]
    pub fn swap(atomic: &AtomicBool, val: bool, _order: Ordering) -> bool {
        free(|_| {
            let prev = atomic.load(Acquire);
            atomic.store(val, Release);
            prev
        })
    }

    #[inline(always)]
    pub fn fetch_add_u8(atomic: &AtomicU8, val: u8, _order: Ordering) -> u8 {
        free(|_| {
            let prev = atomic.load(Acquire);
            atomic.store(prev.wrapping_add(val), Release);
            prev
        })
    }

    #[inline(always)]
    pub fn fetch_sub_u8(atomic: &AtomicU8, val: u8, _order: Ordering) -> u8 {
        free(|_| {
            let prev = atomic.load(Acquire);
            atomic.store(prev.wrapping_sub(val), Release);
            prev
        })
    }

    #[inline(always)]
    pub fn fetch_or_u8(atomic: &AtomicU8, val: u8, _order: Ordering) -> u8 {
        free(|_| {
            let prev = atomic.load(Acquire);
            atomic.store(prev | val, Release);
            prev
        })
    }

    #[inline(always)]
    pub fn fetch_and_u8(atomic: &AtomicU8, val: u8, _order: Ordering) -> u8 {
        free(|_| {
            let prev = atomic.load(Acquire);
            atomic.store(prev & val, Release);
            prev
        })
    }

    #[inline(always)]
    pub fn compare_exchange_u8(
        atomic: &AtomicU8,
        current: u8,
        new: u8,
        _order: Ordering,
    ) -> CoreResult<u8, u8> {
        free(|_| {
            let prev = atomic.load(Acquire);
            if prev == current {
                atomic.store(new, Release);
                Ok(prev)
            } else {
                Err(prev)
            }
        })
    }
}

#[cfg(not(feature = "thumbv6"))]
pub(crate) mod atomic {
    use core::result::Result as CoreResult;
    use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

    #[inline(always)]
    pub fn fetch_add(atomic: &AtomicUsize, val: usize, order: Ordering) -> usize {
        atomic.fetch_add(val, order)
    }

    #[inline(always)]
    pub fn fetch_sub(atomic: &AtomicUsize, val: usize, order: Ordering) -> usize {
        atomic.fetch_sub(val, order)
    }

    #[inline(always)]
    pub fn compare_exchange(
        atomic: &AtomicUsize,
        current: usize,
        new: usize,
        order: Ordering,
    ) -> CoreResult<usize, usize> {
        atomic.compare_exchange(current, new, order, Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn swap(atomic: &AtomicBool, val: bool, order: Ordering) -> bool {
        atomic.swap(val, order)
    }

    #[inline(always)]
    pub fn fetch_add_u8(atomic: &AtomicU8, val: u8, order: Ordering) -> u8 {
        atomic.fetch_add(val, order)
    }

    #[inline(always)]
    pub fn fetch_sub_u8(atomic: &AtomicU8, val: u8, order: Ordering) -> u8 {
        atomic.fetch_sub(val, order)
    }

    #[inline(always)]
    pub fn fetch_or_u8(atomic: &AtomicU8, val: u8, order: Ordering) -> u8 {
        atomic.fetch_or(val, order)
    }

    #[inline(always)]
    pub fn fetch_and_u8(atomic: &AtomicU8, val: u8, order: Ordering) -> u8 {
        atomic.fetch_and(val, order)
    }

    #[inline(always)]
    pub fn compare_exchange_u8(
        atomic: &AtomicU8,
        current: u8,
        new: u8,
        order: Ordering,
    ) -> CoreResult<u8, u8> {
        atomic.compare_exchange(current, new, order, Ordering::Relaxed)
    }
}
