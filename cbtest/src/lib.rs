//! NOTE: this crate is really just a shim for testing
//! the other no-std crate.


#[cfg(test)]
mod tests {
    use charbuf::{CharBuffer, Error, Hooks};
    use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

    #[test]
    fn split_once() {
        let buf: CharBuffer<8> = CharBuffer::new();
        let (_prod, _cons) = buf.try_split().unwrap();

        // Not possible to split twice
        assert!(matches!(buf.try_split(), Err(Error::AlreadySplit)));
    }

    #[test]
    fn release_and_resplit() {
        let buf: CharBuffer<8> = CharBuffer::new();
        let (mut prod, mut cons) = buf.try_split().unwrap();
        buf.start();

        prod.try_push(b'x').unwrap();
        assert_eq!(cons.try_pop(), Ok(b'x'));
        prod.try_push(b'y').unwrap();

        // Handles go back, cursors and counts are wiped
        assert!(buf.try_release(prod, cons).is_ok());
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());

        let (mut prod, mut cons) = buf.try_split().unwrap();
        prod.try_push(b'z').unwrap();
        assert_eq!(cons.try_pop(), Ok(b'z'));
    }

    #[test]
    fn release_rejects_foreign_handles() {
        let buf_a: CharBuffer<8> = CharBuffer::new();
        let buf_b: CharBuffer<8> = CharBuffer::new();
        let (prod_a, cons_a) = buf_a.try_split().unwrap();

        let (prod_a, cons_a) = buf_b.try_release(prod_a, cons_a).unwrap_err();
        assert!(buf_a.try_release(prod_a, cons_a).is_ok());
    }

    #[test]
    fn start_stop_lifecycle() {
        let buf: CharBuffer<4> = CharBuffer::new();
        let (_prod, _cons) = buf.try_split().unwrap();

        assert!(buf.is_stopped());
        assert!(buf.start());

        // Forced stop on an idle-but-active buffer: the activity bit is
        // cleared, but confirmation needs a second look
        assert!(!buf.force_stop());
        assert!(buf.force_stop());
        assert!(buf.is_stopped());

        // try_stop on a quiescent active buffer succeeds directly
        assert!(buf.start());
        assert!(buf.try_stop());
        assert!(buf.is_stopped());

        // ... and reports success again on an already-stopped buffer
        assert!(buf.try_stop());
    }

    #[test]
    fn zero_capacity_cannot_start() {
        let buf: CharBuffer<0> = CharBuffer::new();
        assert!(!buf.start());
        assert!(buf.is_stopped());

        let started: CharBuffer<0> = CharBuffer::new_started();
        assert!(started.is_stopped());
    }

    #[test]
    fn new_started_is_active() {
        let buf: CharBuffer<4> = CharBuffer::new_started();
        let (mut prod, mut cons) = buf.try_split().unwrap();

        prod.try_push(b'a').unwrap();
        assert_eq!(cons.try_pop(), Ok(b'a'));
    }

    #[test]
    fn stopped_buffer_noops() {
        let buf: CharBuffer<4> = CharBuffer::new();
        let (mut prod, mut cons) = buf.try_split().unwrap();

        assert_eq!(prod.try_push(b'a'), Err(Error::Stopped));
        assert_eq!(prod.push(b'a'), Err(Error::Stopped));
        assert_eq!(prod.write(b"abc"), 0);
        assert_eq!(cons.try_pop(), Err(Error::Stopped));
        assert_eq!(cons.pop(), Err(Error::Stopped));
        assert_eq!(cons.peek(), Err(Error::Stopped));
        assert_eq!(buf.len(), 0);

        let mut dest = [0u8; 8];
        assert_eq!(cons.read(&mut dest), 0);
        assert_eq!(cons.read_line(&mut dest), 0);
        assert_eq!(cons.read_until(&mut dest, b"x"), 0);
    }

    #[test]
    fn configuration_requires_stop() {
        let buf: CharBuffer<4> = CharBuffer::new();

        assert!(buf.set_eol(b';'));
        assert_eq!(buf.eol(), b';');
        assert!(buf.set_hooks(Hooks::new()));

        let (_prod, _cons) = buf.try_split().unwrap();
        buf.start();

        assert!(!buf.set_eol(b'\n'));
        assert_eq!(buf.eol(), b';');
        assert!(!buf.set_hooks(Hooks::new()));
    }

    #[test]
    fn reset_reinitializes() {
        static STOPS: AtomicUsize = AtomicUsize::new(0);

        fn count_stop(_buf: &CharBuffer<8>) {
            STOPS.fetch_add(1, Relaxed);
        }

        let buf: CharBuffer<8> = CharBuffer::new();
        assert!(buf.set_eol(b';'));
        assert!(buf.set_hooks(Hooks {
            on_stop: Some(count_stop),
            ..Hooks::new()
        }));

        let (mut prod, _cons) = buf.try_split().unwrap();
        buf.start();
        prod.write(b"ab;");
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.lines(), 1);

        // Not stopped when reset began
        assert!(!buf.reset(true));
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.lines(), 0);
        assert_eq!(buf.eol(), b'\n');
        assert_eq!(buf.hooks(), Hooks::new());
        assert!(!buf.is_stopped());

        assert!(buf.try_stop());
        assert!(buf.reset(false));
        assert!(buf.is_stopped());
        // The stop hook was wiped by the first reset, so nothing fired
        assert_eq!(STOPS.load(Relaxed), 0);
    }

    #[test]
    fn observed_eq_and_copy() {
        let a: CharBuffer<8> = CharBuffer::new();
        let b: CharBuffer<8> = CharBuffer::new();
        assert!(a.observed_eq(&b));

        let (mut prod, _cons) = a.try_split().unwrap();
        a.start();
        prod.write(b"hi\n");
        assert!(!a.observed_eq(&b));

        a.copy_into(&b);
        assert!(a.observed_eq(&b));
        assert_eq!(b.len(), 3);
        assert_eq!(b.lines(), 1);
        assert!(!b.is_stopped());
    }

    #[test]
    fn heap_flavor() {
        use charbuf::heap::HeapCharBuffer;

        let buf: HeapCharBuffer<16> = HeapCharBuffer::new();
        assert!(buf.start());

        let (mut prod, mut cons) = buf.try_split().unwrap();
        assert_eq!(prod.write(b"ping\n"), 5);
        assert_eq!(cons.buffer().lines(), 1);

        let mut dest = [0u8; 16];
        assert_eq!(cons.read_line(&mut dest), 4);
        assert_eq!(&dest[..4], b"ping");

        // Either drop order reclaims the allocation exactly once
        drop(cons);
        prod.try_push(b'x').unwrap();
        drop(prod);

        let buf: HeapCharBuffer<16> = HeapCharBuffer::new_started();
        let (prod, cons) = buf.try_split().unwrap();
        drop(prod);
        drop(cons);
    }
}
