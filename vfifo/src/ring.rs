//! Fixed-capacity byte ring.

use std::cell::UnsafeCell;
use std::sync::Arc;

/// Granularity the backing storage is rounded up to.
///
/// A [`DirectView`](crate::DirectView) always covers whole pages, like a
/// memory mapping of the device would.
pub const PAGE_SIZE: usize = 4096;

/// Zero-initialized backing bytes shared by the ring and any direct views.
pub(crate) struct Storage {
    cells: Box<[UnsafeCell<u8>]>,
}

// SAFETY: the ring only touches the cells through `&mut RingBuffer`, which the
// queue hands out under its lock. Unsynchronized access is only possible
// through the unsafe `DirectView` accessors, whose callers take on the
// aliasing contract.
unsafe impl Send for Storage {}
unsafe impl Sync for Storage {}

impl Storage {
    fn zeroed(capacity: usize) -> Self {
        let len = capacity.div_ceil(PAGE_SIZE) * PAGE_SIZE;
        let cells: Box<[UnsafeCell<u8>]> = (0..len).map(|_| UnsafeCell::new(0)).collect();
        Storage { cells }
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.cells.as_ptr())
    }
}

/// A fixed-capacity circular byte buffer.
///
/// `RingBuffer` only does the head/tail/size bookkeeping. It has no locking
/// of its own; [`SynchronizedQueue`](crate::SynchronizedQueue) serializes
/// every access.
///
/// Emptiness is tracked by `size`, not by `head == tail`, which holds both
/// when the ring is empty and when it is full.
///
/// # Example
///
/// ```
/// use vfifo::RingBuffer;
///
/// let mut ring = RingBuffer::new(2);
/// assert!(ring.push(b'a'));
/// assert!(ring.push(b'b'));
/// assert!(!ring.push(b'c'));
/// assert_eq!(ring.pop(), Some(b'a'));
/// assert_eq!(ring.available() + ring.capacity_free(), ring.capacity());
/// ```
pub struct RingBuffer {
    storage: Arc<Storage>,
    capacity: usize,
    head: usize, // write position
    tail: usize, // read position
    size: usize,
}

impl RingBuffer {
    /// Creates a zero-filled ring holding up to `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        RingBuffer {
            storage: Arc::new(Storage::zeroed(capacity)),
            capacity,
            head: 0,
            tail: 0,
            size: 0,
        }
    }

    /// Returns the ring capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of occupied bytes.
    pub fn available(&self) -> usize {
        self.size
    }

    /// Returns the number of bytes that can still be pushed.
    pub fn capacity_free(&self) -> usize {
        self.capacity - self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    /// Appends one byte at `head`.
    ///
    /// Returns false, leaving the ring untouched, if it is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        // SAFETY: head < capacity <= storage.len(), and `&mut self` excludes
        // every other safe access to the cells.
        unsafe { *self.storage.as_ptr().add(self.head) = byte };
        self.head = (self.head + 1) % self.capacity;
        self.size += 1;
        true
    }

    /// Returns the byte at `tail` without consuming it.
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: tail < capacity <= storage.len().
        Some(unsafe { *self.storage.as_ptr().add(self.tail) })
    }

    /// Removes and returns the byte at `tail`.
    pub fn pop(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.tail = (self.tail + 1) % self.capacity;
        self.size -= 1;
        Some(byte)
    }

    /// Appends all of `data`, or nothing if it does not fit.
    pub fn push_all(&mut self, data: &[u8]) -> bool {
        if data.len() > self.capacity_free() {
            return false;
        }
        for &byte in data {
            self.push(byte);
        }
        true
    }

    /// Empties the ring. The stored bytes are left in place.
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.size = 0;
    }

    /// Returns a copy of the occupied bytes in FIFO order.
    pub fn to_vec(&self) -> Vec<u8> {
        let base = self.storage.as_ptr();
        (0..self.size)
            .map(|i| {
                let idx = (self.tail + i) % self.capacity;
                // SAFETY: idx < capacity <= storage.len().
                unsafe { *base.add(idx) }
            })
            .collect()
    }

    pub(crate) fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_fifo() {
        let mut ring = RingBuffer::new(4);
        for &b in b"abc" {
            assert!(ring.push(b));
        }
        assert_eq!(ring.available(), 3);
        assert_eq!(ring.pop(), Some(b'a'));
        assert_eq!(ring.pop(), Some(b'b'));
        assert_eq!(ring.pop(), Some(b'c'));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_full_and_empty_by_size() {
        let mut ring = RingBuffer::new(3);
        assert!(ring.is_empty());
        assert!(ring.push_all(b"xyz"));
        assert!(ring.is_full());
        // head wrapped back onto tail, yet the ring is full, not empty
        assert_eq!(ring.head, ring.tail);
        assert!(!ring.push(b'!'));
        assert_eq!(ring.available(), 3);
    }

    #[test]
    fn test_wrap_around() {
        let mut ring = RingBuffer::new(3);
        ring.push_all(b"123");
        assert_eq!(ring.pop(), Some(b'1'));
        assert_eq!(ring.pop(), Some(b'2'));
        assert!(ring.push_all(b"45"));
        assert_eq!(ring.to_vec(), b"345");
        assert_eq!(ring.pop(), Some(b'3'));
        assert_eq!(ring.pop(), Some(b'4'));
        assert_eq!(ring.pop(), Some(b'5'));
    }

    #[test]
    fn test_push_all_is_all_or_nothing() {
        let mut ring = RingBuffer::new(4);
        ring.push_all(b"ab");
        assert!(!ring.push_all(b"xyz"));
        assert_eq!(ring.to_vec(), b"ab");
        assert!(ring.push_all(b"cd"));
        assert!(ring.is_full());
    }

    #[test]
    fn test_reset_keeps_bytes() {
        let mut ring = RingBuffer::new(4);
        ring.push_all(b"data");
        ring.reset();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity_free(), 4);
        // SAFETY: no other access to the storage in this test.
        let first = unsafe { *ring.storage().as_ptr() };
        assert_eq!(first, b'd');
    }

    #[test]
    fn test_accounting_invariant() {
        let mut ring = RingBuffer::new(5);
        for step in 0..50u8 {
            if step % 3 == 0 {
                ring.pop();
            } else {
                ring.push(step);
            }
            assert_eq!(ring.available() + ring.capacity_free(), ring.capacity());
        }
    }

    #[test]
    fn test_storage_rounded_to_page() {
        let ring = RingBuffer::new(1024);
        assert_eq!(ring.storage().len(), PAGE_SIZE);
        let ring = RingBuffer::new(PAGE_SIZE + 1);
        assert_eq!(ring.storage().len(), 2 * PAGE_SIZE);
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        RingBuffer::new(0);
    }
}
