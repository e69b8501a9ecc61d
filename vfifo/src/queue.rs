//! Blocking byte queue over a ring buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, VfifoError};
use crate::io::{Sink, Source};
use crate::ring::{RingBuffer, Storage};

/// Generation mode of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Only callers put bytes into the queue.
    #[default]
    Manual,
    /// The deferred producer appends its payload periodically.
    AutoGenerate,
}

impl Mode {
    /// Decodes the integer argument of the set-mode command.
    ///
    /// Zero selects manual mode, any other value auto-generation.
    pub fn from_raw(value: i32) -> Mode {
        if value != 0 {
            Mode::AutoGenerate
        } else {
            Mode::Manual
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Mode::Manual => 0,
            Mode::AutoGenerate => 1,
        }
    }
}

/// How a read or write behaves when it cannot make progress.
#[derive(Debug, Clone, Copy)]
pub enum Wait<'a> {
    /// Fail with [`VfifoError::WouldBlock`].
    NonBlocking,
    /// Sleep until the queue changes, optionally abortable through an [`Interrupt`].
    Blocking(Option<&'a Interrupt>),
}

/// A pending-interrupt flag for blocking calls.
///
/// Raise it through [`SynchronizedQueue::interrupt`] so that sleeping callers
/// are woken. A blocking call that observes the flag while waiting clears it
/// and returns [`VfifoError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    pending: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an interrupt has been raised and not yet consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Drops a pending interrupt without delivering it.
    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }

    fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

/// A thread-safe bounded byte queue.
///
/// `SynchronizedQueue` wraps a [`RingBuffer`] with one mutex and two
/// condition variables. Reads sleep on `not_empty` while the ring is empty,
/// writes sleep on `not_full` while it is full.
///
/// # Semantics
///
/// - **Write**: accepts `min(len, free)` bytes; a short write is not an error
/// - **Read**: delivers `min(len, available)` bytes
/// - **Non-blocking**: returns `WouldBlock` instead of sleeping
/// - **Close**: wakes every sleeper; all later calls fail with `Closed`
///
/// There is no ordering between several blocked readers or several blocked
/// writers. Every waiter is woken and the ones that lose the race sleep again.
///
/// # Example
///
/// ```
/// use vfifo::SynchronizedQueue;
/// use std::thread;
/// use std::sync::Arc;
///
/// let queue = Arc::new(SynchronizedQueue::new(4));
/// let writer = Arc::clone(&queue);
///
/// let producer = thread::spawn(move || {
///     let mut sent = 0;
///     while sent < 10 {
///         sent += writer.write(&[7u8; 10][sent..]).unwrap();
///     }
/// });
///
/// let mut received = 0;
/// let mut buf = [0u8; 3];
/// while received < 10 {
///     received += queue.read(&mut buf).unwrap();
/// }
/// producer.join().unwrap();
/// assert!(queue.is_empty());
/// ```
pub struct SynchronizedQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    storage: Arc<Storage>,
    capacity: usize,
}

struct QueueState {
    ring: RingBuffer,
    mode: Mode,
    closed: bool,
}

impl SynchronizedQueue {
    /// Creates an empty queue holding up to `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let ring = RingBuffer::new(capacity);
        let storage = Arc::clone(ring.storage());
        SynchronizedQueue {
            state: Mutex::new(QueueState {
                ring,
                mode: Mode::Manual,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            storage,
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Every critical section leaves the ring consistent before it can
        // panic, so a poisoned state is still valid.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the queue capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bytes ready to be read.
    pub fn available(&self) -> usize {
        self.lock().ring.available()
    }

    /// Returns the number of bytes that can be written without blocking.
    pub fn capacity_free(&self) -> usize {
        self.lock().ring.capacity_free()
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    pub fn is_full(&self) -> bool {
        self.capacity_free() == 0
    }

    /// Returns the current generation mode.
    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns a copy of the queued bytes without consuming them.
    pub fn to_vec(&self) -> Vec<u8> {
        self.lock().ring.to_vec()
    }

    /// Writes `data`, sleeping while the queue is full.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.write_from(data, Wait::Blocking(None))
    }

    /// Writes `data`, failing with `WouldBlock` if the queue is full.
    pub fn try_write(&self, data: &[u8]) -> Result<usize> {
        self.write_from(data, Wait::NonBlocking)
    }

    /// Reads into `buf`, sleeping while the queue is empty.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.read_into(buf, Wait::Blocking(None))
    }

    /// Reads into `buf`, failing with `WouldBlock` if the queue is empty.
    pub fn try_read(&self, buf: &mut [u8]) -> Result<usize> {
        self.read_into(buf, Wait::NonBlocking)
    }

    /// Copies bytes from `src` into the queue.
    ///
    /// Waits for free space according to `wait`, then accepts as many bytes as
    /// fit and returns that count. If `src` faults, the bytes copied so far
    /// stay queued and `Fault` reports how many there were.
    pub fn write_from<S: Source + ?Sized>(&self, src: &S, wait: Wait<'_>) -> Result<usize> {
        if src.is_empty() {
            return Ok(0);
        }

        let state = self.lock();
        let mut state = self.wait_for(state, &self.not_full, wait, |ring| ring.capacity_free() > 0)?;

        let count = std::cmp::min(src.len(), state.ring.capacity_free());
        let mut written = 0;
        while written < count {
            let Some(byte) = src.fetch(written) else {
                break;
            };
            state.ring.push(byte);
            written += 1;
        }

        if written > 0 {
            self.not_empty.notify_all();
        }
        if written < count {
            return Err(VfifoError::Fault {
                transferred: written,
            });
        }
        Ok(written)
    }

    /// Copies bytes from the queue into `dst`.
    ///
    /// Waits for data according to `wait`, then delivers as many bytes as are
    /// queued, up to `dst.len()`. A byte that cannot be stored is left queued.
    pub fn read_into<S: Sink + ?Sized>(&self, dst: &mut S, wait: Wait<'_>) -> Result<usize> {
        if dst.is_empty() {
            return Ok(0);
        }

        let state = self.lock();
        let mut state = self.wait_for(state, &self.not_empty, wait, |ring| ring.available() > 0)?;

        let count = std::cmp::min(dst.len(), state.ring.available());
        let mut read = 0;
        while read < count {
            let Some(byte) = state.ring.peek() else {
                break;
            };
            if !dst.store(read, byte) {
                break;
            }
            state.ring.pop();
            read += 1;
        }

        if read > 0 {
            self.not_full.notify_all();
        }
        if read < count {
            return Err(VfifoError::Fault { transferred: read });
        }
        Ok(read)
    }

    /// Appends all of `data` or nothing, without ever blocking.
    ///
    /// Returns false if the queue lacks room for the whole slice or is
    /// closed. Readers are woken on success.
    pub fn push_all(&self, data: &[u8]) -> bool {
        let mut state = self.lock();
        if state.closed || !state.ring.push_all(data) {
            return false;
        }
        self.not_empty.notify_all();
        true
    }

    /// Empties the queue and wakes blocked writers.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(VfifoError::Closed);
        }
        state.ring.reset();
        self.not_full.notify_all();
        Ok(())
    }

    /// Sets the generation mode and returns the previous one.
    pub fn set_mode(&self, mode: Mode) -> Result<Mode> {
        let mut state = self.lock();
        if state.closed {
            return Err(VfifoError::Closed);
        }
        Ok(std::mem::replace(&mut state.mode, mode))
    }

    /// Delivers `interrupt` to any call sleeping with it.
    pub fn interrupt(&self, interrupt: &Interrupt) {
        interrupt.raise();
        // Taking the lock orders the flag before the waiter's next check.
        let _state = self.lock();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Closes the queue.
    ///
    /// All sleeping callers wake up and every later read, write or control
    /// call fails with `Closed`.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.mode = Mode::Manual;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub(crate) fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    fn wait_for<'a>(
        &self,
        mut state: MutexGuard<'a, QueueState>,
        cond: &Condvar,
        wait: Wait<'_>,
        ready: impl Fn(&RingBuffer) -> bool,
    ) -> Result<MutexGuard<'a, QueueState>> {
        loop {
            if state.closed {
                return Err(VfifoError::Closed);
            }
            if ready(&state.ring) {
                return Ok(state);
            }
            let interrupt = match wait {
                Wait::NonBlocking => return Err(VfifoError::WouldBlock),
                Wait::Blocking(interrupt) => interrupt,
            };
            if interrupt.is_some_and(Interrupt::take) {
                return Err(VfifoError::Cancelled);
            }
            state = cond.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl std::fmt::Debug for SynchronizedQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SynchronizedQueue")
            .field("ring", &state.ring)
            .field("mode", &state.mode)
            .field("closed", &state.closed)
            .finish()
    }
}
