//! Heap-allocated flavor of the character buffer.
//!
//! Storage and bookkeeping share a single `Box` allocation. Splitting
//! consumes the owner and yields `'static` halves; dropping the second
//! half force-stops the buffer and releases the allocation.

use crate::buffer::atomic;
use crate::{CharBuffer, Consumer, Error, Producer, Result};
use alloc::{boxed::Box, sync::Arc};
use core::{
    marker::PhantomData,
    ops::Deref,
    ptr::NonNull,
    sync::atomic::{AtomicBool, Ordering::AcqRel},
};

/// A heap-allocated [`CharBuffer`]. Can be used when `static` placement
/// is inconvenient, e.g. for buffers created at runtime.
///
/// Administrative calls are available through `Deref` until the buffer
/// is split:
///
/// ```rust
/// use charbuf::heap::HeapCharBuffer;
///
/// let buf: HeapCharBuffer<16> = HeapCharBuffer::new();
/// buf.start();
///
/// let (mut prod, mut cons) = buf.try_split().unwrap();
/// prod.try_push(b'a').unwrap();
/// assert_eq!(cons.try_pop().unwrap(), b'a');
/// ```
pub struct HeapCharBuffer<const N: usize>(Box<CharBuffer<N>>);

impl<const N: usize> HeapCharBuffer<N> {
    /// Allocate a new stopped buffer.
    pub fn new() -> Self {
        Self(Box::new(CharBuffer::new()))
    }

    /// Allocate a buffer that is already started, without firing
    /// `on_start`. A zero-capacity buffer is created stopped.
    pub fn new_started() -> Self {
        Self(Box::new(CharBuffer::new_started()))
    }

    /// Split the buffer into `HeapProducer` and `HeapConsumer` halves.
    ///
    /// The allocation is leaked into the halves and reclaimed when the
    /// second of them is dropped, whichever order they go in.
    pub fn try_split(self) -> Result<(HeapProducer<N>, HeapConsumer<N>)> {
        if atomic::swap(&self.0.already_split, true, AcqRel) {
            return Err(Error::AlreadySplit);
        }

        unsafe {
            // Explicitly zero the data to avoid undefined behavior.
            // This is required, because we hand out references to the
            // storage, which mean that creating them as references is
            // technically UB for now
            let mu_ptr = self.0.buf.get();
            (*mu_ptr).as_mut_ptr().write_bytes(0u8, 1);

            let nn: NonNull<CharBuffer<N>> = Box::leak(self.0).into();
            let dealloc_on_drop = Arc::new(AtomicBool::new(false));

            Ok((
                HeapProducer {
                    inner: Producer {
                        cb: nn,
                        pd: PhantomData,
                    },
                    dealloc_on_drop: dealloc_on_drop.clone(),
                },
                HeapConsumer {
                    inner: Consumer {
                        cb: nn,
                        pd: PhantomData,
                    },
                    dealloc_on_drop,
                },
            ))
        }
    }
}

impl<const N: usize> Default for HeapCharBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Deref for HeapCharBuffer<N> {
    type Target = CharBuffer<N>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The writer half of a split [`HeapCharBuffer`]. See [`Producer`].
pub struct HeapProducer<const N: usize> {
    inner: Producer<'static, N>,
    dealloc_on_drop: Arc<AtomicBool>,
}

impl<const N: usize> HeapProducer<N> {
    /// Store one byte, waiting for space. See [`Producer::push`].
    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.inner.push(byte)
    }

    /// Store one byte if a slot is free, or skip it. See
    /// [`Producer::try_push`].
    pub fn try_push(&mut self, byte: u8) -> Result<()> {
        self.inner.try_push(byte)
    }

    /// Store bytes from `src` without waiting. See [`Producer::write`].
    pub fn write(&mut self, src: &[u8]) -> usize {
        self.inner.write(src)
    }

    /// Access the shared buffer for diagnostics.
    pub fn buffer(&self) -> &CharBuffer<N> {
        self.inner.buffer()
    }
}

/// The reader half of a split [`HeapCharBuffer`]. See [`Consumer`].
pub struct HeapConsumer<const N: usize> {
    inner: Consumer<'static, N>,
    dealloc_on_drop: Arc<AtomicBool>,
}

impl<const N: usize> HeapConsumer<N> {
    /// Take one byte, waiting for data. See [`Consumer::pop`].
    pub fn pop(&mut self) -> Result<u8> {
        self.inner.pop()
    }

    /// Take one byte if any is buffered. See [`Consumer::try_pop`].
    pub fn try_pop(&mut self) -> Result<u8> {
        self.inner.try_pop()
    }

    /// Read the next byte without consuming it. See [`Consumer::peek`].
    pub fn peek(&mut self) -> Result<u8> {
        self.inner.peek()
    }

    /// Drain buffered bytes into `dest`. See [`Consumer::read`].
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        self.inner.read(dest)
    }

    /// Read one complete line into `dest`. See [`Consumer::read_line`].
    pub fn read_line(&mut self, dest: &mut [u8]) -> usize {
        self.inner.read_line(dest)
    }

    /// Consume up to a buffered pattern match. See
    /// [`Consumer::read_until`].
    pub fn read_until(&mut self, dest: &mut [u8], pattern: &[u8]) -> usize {
        self.inner.read_until(dest, pattern)
    }

    /// Access the shared buffer for diagnostics.
    pub fn buffer(&self) -> &CharBuffer<N> {
        self.inner.buffer()
    }
}

impl<const N: usize> Drop for HeapProducer<N> {
    fn drop(&mut self) {
        if atomic::swap(&self.dealloc_on_drop, true, AcqRel) {
            // Second half to go: stop the buffer, then release the
            // allocation
            let cb = self.inner.cb.as_ptr();
            unsafe {
                (*cb).force_stop();
                drop(Box::from_raw(cb));
            }
        }
    }
}

impl<const N: usize> Drop for HeapConsumer<N> {
    fn drop(&mut self) {
        if atomic::swap(&self.dealloc_on_drop, true, AcqRel) {
            // Second half to go: stop the buffer, then release the
            // allocation
            let cb = self.inner.cb.as_ptr();
            unsafe {
                (*cb).force_stop();
                drop(Box::from_raw(cb));
            }
        }
    }
}
