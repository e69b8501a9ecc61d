//! Raw window onto the queue storage.

use std::sync::Arc;

use crate::ring::Storage;

/// An unsynchronized alias of the queue's backing bytes.
///
/// `DirectView` is the equivalent of memory-mapping the device. It covers the
/// whole page-rounded storage, takes no lock and never updates the ring's
/// head, tail or size:
///
/// - bytes written here are invisible to `available()`;
/// - a later write through the queue may overwrite them;
/// - bytes read here may be stale or half-updated if the queue is in use.
///
/// The queue does not try to reconcile any of this. Every accessor is
/// `unsafe`: the caller must guarantee that no read, write, clear or
/// producer append runs on the queue, and that no other view is accessed,
/// for as long as the returned slice or copy is in progress.
///
/// The view keeps the storage alive after the device is shut down.
pub struct DirectView {
    storage: Arc<Storage>,
}

impl DirectView {
    pub(crate) fn new(storage: Arc<Storage>) -> Self {
        DirectView { storage }
    }

    /// Length of the window in bytes, a multiple of [`PAGE_SIZE`](crate::PAGE_SIZE).
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.storage.as_ptr()
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.storage.as_ptr()
    }

    /// Borrows the window as a slice.
    ///
    /// # Safety
    ///
    /// Nothing may write the storage, through the queue or another view,
    /// while the slice is alive.
    pub unsafe fn as_slice(&self) -> &[u8] {
        // SAFETY: the pointer covers `len()` initialized bytes owned by
        // `storage`; exclusion is the caller's contract.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    /// Borrows the window as a mutable slice.
    ///
    /// # Safety
    ///
    /// Nothing else may read or write the storage, through the queue or
    /// another view, while the slice is alive.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as for `as_slice`, with exclusive access on the caller.
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), self.len()) }
    }

    /// Copies `data` into the window at `offset`, clamped to the window end.
    ///
    /// Returns the number of bytes copied.
    ///
    /// # Safety
    ///
    /// No other access to the storage may run concurrently.
    pub unsafe fn write_at(&self, offset: usize, data: &[u8]) -> usize {
        let n = data.len().min(self.len().saturating_sub(offset));
        if n > 0 {
            // SAFETY: offset + n <= len(); `data` is a separate allocation.
            unsafe {
                std::ptr::copy_nonoverlapping(data.as_ptr(), self.as_mut_ptr().add(offset), n)
            };
        }
        n
    }

    /// Copies bytes from the window at `offset` into `buf`.
    ///
    /// Returns the number of bytes copied.
    ///
    /// # Safety
    ///
    /// No concurrent writer may touch the storage.
    pub unsafe fn read_at(&self, offset: usize, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.len().saturating_sub(offset));
        if n > 0 {
            // SAFETY: offset + n <= len(); `buf` is a separate allocation.
            unsafe { std::ptr::copy_nonoverlapping(self.as_ptr().add(offset), buf.as_mut_ptr(), n) };
        }
        n
    }
}

impl std::fmt::Debug for DirectView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectView")
            .field("ptr", &self.as_ptr())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::SynchronizedQueue;
    use crate::ring::PAGE_SIZE;

    fn view_of(queue: &SynchronizedQueue) -> DirectView {
        DirectView::new(Arc::clone(queue.storage()))
    }

    #[test]
    fn test_window_is_page_rounded() {
        let queue = SynchronizedQueue::new(100);
        let view = view_of(&queue);
        assert_eq!(view.len(), PAGE_SIZE);
        assert!(!view.is_empty());
    }

    #[test]
    fn test_writes_bypass_accounting() {
        let queue = SynchronizedQueue::new(32);
        let view = view_of(&queue);

        let msg = b"Hello via Memory Map!";
        // SAFETY: the queue is idle for the duration of the copy.
        let n = unsafe { view.write_at(0, msg) };
        assert_eq!(n, msg.len());
        assert_eq!(queue.available(), 0);

        // the next queue write lands on the same bytes
        queue.write(b"XY").unwrap();
        let mut buf = [0u8; 5];
        // SAFETY: as above.
        unsafe { view.read_at(0, &mut buf) };
        assert_eq!(&buf, b"XYllo");
    }

    #[test]
    fn test_sees_queue_bytes() {
        let queue = SynchronizedQueue::new(8);
        queue.write(b"abc").unwrap();
        let view = view_of(&queue);
        // SAFETY: the queue is idle while the slice is alive.
        let bytes = unsafe { view.as_slice() };
        assert_eq!(&bytes[..3], b"abc");
        assert!(bytes[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clamped_at_end() {
        let queue = SynchronizedQueue::new(8);
        let mut view = view_of(&queue);
        let len = view.len();
        // SAFETY: single-threaded, no queue access in between.
        unsafe {
            assert_eq!(view.write_at(len - 2, b"abcd"), 2);
            assert_eq!(view.write_at(len + 10, b"abcd"), 0);
            assert_eq!(&view.as_mut_slice()[len - 2..], b"ab");
        }
    }
}
