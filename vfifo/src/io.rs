//! Caller-memory transfer traits.
//!
//! Reads and writes move one byte at a time between the ring and memory the
//! caller supplied. On a device transport that memory may turn out to be
//! unreadable or unwritable part way through a transfer, so both sides of a
//! copy can fail per byte. Plain slices never fail.

/// Caller memory a write copies from.
pub trait Source {
    /// Number of bytes the caller asked to write.
    fn len(&self) -> usize;

    /// Fetches the byte at `offset`, or `None` if it cannot be read.
    fn fetch(&self, offset: usize) -> Option<u8>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caller memory a read copies into.
pub trait Sink {
    /// Number of bytes the caller asked to read.
    fn len(&self) -> usize;

    /// Stores `byte` at `offset`. Returns false if it cannot be written.
    fn store(&mut self, offset: usize, byte: u8) -> bool;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Source for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn fetch(&self, offset: usize) -> Option<u8> {
        self.get(offset).copied()
    }
}

impl Sink for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn store(&mut self, offset: usize, byte: u8) -> bool {
        match self.get_mut(offset) {
            Some(slot) => {
                *slot = byte;
                true
            }
            None => false,
        }
    }
}

/// A write request whose claimed length exceeds the readable memory.
///
/// Models a caller passing a count larger than its buffer: the bytes inside
/// `data` copy normally, the first byte past it faults.
#[derive(Debug, Clone, Copy)]
pub struct UserSlice<'a> {
    data: &'a [u8],
    claimed: usize,
}

impl<'a> UserSlice<'a> {
    pub fn new(data: &'a [u8], claimed: usize) -> Self {
        UserSlice { data, claimed }
    }
}

impl Source for UserSlice<'_> {
    fn len(&self) -> usize {
        self.claimed
    }

    fn fetch(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }
}

/// A read request whose claimed length exceeds the writable memory.
#[derive(Debug)]
pub struct UserSliceMut<'a> {
    data: &'a mut [u8],
    claimed: usize,
}

impl<'a> UserSliceMut<'a> {
    pub fn new(data: &'a mut [u8], claimed: usize) -> Self {
        UserSliceMut { data, claimed }
    }
}

impl Sink for UserSliceMut<'_> {
    fn len(&self) -> usize {
        self.claimed
    }

    fn store(&mut self, offset: usize, byte: u8) -> bool {
        Sink::store(&mut *self.data, offset, byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source() {
        let data = b"abc";
        let src: &[u8] = data;
        assert_eq!(Source::len(src), 3);
        assert_eq!(src.fetch(2), Some(b'c'));
        assert_eq!(src.fetch(3), None);
    }

    #[test]
    fn test_slice_sink() {
        let mut buf = [0u8; 2];
        let sink: &mut [u8] = &mut buf;
        assert!(sink.store(1, b'z'));
        assert!(!sink.store(2, b'z'));
        assert_eq!(buf, [0, b'z']);
    }

    #[test]
    fn test_user_slice_faults_past_data() {
        let src = UserSlice::new(b"ab", 4);
        assert_eq!(src.len(), 4);
        assert_eq!(src.fetch(1), Some(b'b'));
        assert_eq!(src.fetch(2), None);

        let mut buf = [0u8; 1];
        let mut dst = UserSliceMut::new(&mut buf, 3);
        assert_eq!(dst.len(), 3);
        assert!(dst.store(0, b'x'));
        assert!(!dst.store(1, b'y'));
    }
}
