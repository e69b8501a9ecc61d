//! The FIFO endpoint and its open handles.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::config::Config;
use crate::control::{Command, ControlChannel};
use crate::error::{Result, VfifoError};
use crate::io::{Sink, Source};
use crate::producer::DeferredProducer;
use crate::queue::{Interrupt, Mode, SynchronizedQueue, Wait};
use crate::view::DirectView;

/// A FIFO endpoint.
///
/// `Device` owns the queue, the control channel and the producer. Callers
/// [`open`](Device::open) any number of [`Handle`]s, which all share the one
/// queue.
///
/// Tear a device down with [`shutdown`](Device::shutdown), which stops the
/// producer before closing the queue.
///
/// # Example
///
/// ```
/// use vfifo::{Config, Device};
///
/// let device = Device::new(Config::default().with_capacity(8)).unwrap();
/// let handle = device.open().unwrap();
///
/// assert_eq!(handle.write(b"ABCDEFGH").unwrap(), 8);
/// let mut buf = [0u8; 3];
/// assert_eq!(handle.read(&mut buf).unwrap(), 3);
/// assert_eq!(&buf, b"ABC");
/// ```
pub struct Device {
    shared: Arc<Shared>,
}

struct Shared {
    config: Config,
    queue: Arc<SynchronizedQueue>,
    control: ControlChannel,
    handles: AtomicUsize,
}

impl Device {
    /// Creates a device from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(SynchronizedQueue::new(config.capacity));
        let producer = DeferredProducer::new(
            Arc::clone(&queue),
            config.interval(),
            config.payload.as_bytes(),
        );
        let control = ControlChannel::new(Arc::clone(&queue), producer);

        info!(capacity = config.capacity, "vfifo: device created");
        Ok(Device {
            shared: Arc::new(Shared {
                config,
                queue,
                control,
                handles: AtomicUsize::new(0),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Returns the number of bytes queued.
    pub fn available(&self) -> usize {
        self.shared.queue.available()
    }

    /// Returns the current generation mode.
    pub fn mode(&self) -> Mode {
        self.shared.queue.mode()
    }

    /// Returns the number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.shared.handles.load(Ordering::Acquire)
    }

    /// Opens a blocking handle.
    ///
    /// Fails with `Closed` once the device has been shut down.
    pub fn open(&self) -> Result<Handle> {
        if self.shared.queue.is_closed() {
            return Err(VfifoError::Closed);
        }
        let open = self.shared.handles.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(open, "vfifo: handle opened");
        Ok(Handle {
            shared: Arc::clone(&self.shared),
            nonblocking: false,
            interrupt: Interrupt::new(),
        })
    }

    /// Tears the device down.
    ///
    /// 1. The producer is disarmed and any in-flight append finishes.
    /// 2. The queue is closed: sleeping callers wake with `Closed` and no new
    ///    read, write or control call can start.
    /// 3. The storage is released once the last handle and view are dropped.
    pub async fn shutdown(self) {
        self.shared.control.shutdown().await;
        info!(
            open_handles = self.open_handles(),
            "vfifo: device shut down"
        );
    }
}

/// An open handle to a [`Device`].
///
/// Each handle carries its own blocking flag and interrupt, like a file
/// descriptor does. Dropping the handle closes it.
pub struct Handle {
    shared: Arc<Shared>,
    nonblocking: bool,
    interrupt: Interrupt,
}

impl Handle {
    /// Switches between blocking and non-blocking I/O.
    pub fn set_nonblocking(&mut self, nonblocking: bool) {
        self.nonblocking = nonblocking;
    }

    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }

    /// Returns the number of bytes queued.
    pub fn available(&self) -> usize {
        self.shared.queue.available()
    }

    /// Writes up to `data.len()` bytes and returns how many were accepted.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.write_from(data)
    }

    /// Writes from caller memory that may fault part way.
    pub fn write_from<S: Source + ?Sized>(&self, src: &S) -> Result<usize> {
        self.shared.queue.write_from(src, self.wait())
    }

    /// Reads up to `buf.len()` bytes and returns how many were delivered.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.read_into(buf)
    }

    /// Reads into caller memory that may fault part way.
    pub fn read_into<S: Sink + ?Sized>(&self, dst: &mut S) -> Result<usize> {
        self.shared.queue.read_into(dst, self.wait())
    }

    /// Runs a control command.
    pub async fn control(&self, cmd: Command) -> Result<()> {
        self.shared.control.execute(cmd).await
    }

    /// Decodes and runs a raw ioctl-style command.
    pub async fn ioctl(&self, cmd: u32, arg: Option<i32>) -> Result<()> {
        let cmd = Command::decode(cmd, arg)?;
        self.control(cmd).await
    }

    /// Maps the queue storage directly. See [`DirectView`] for the hazards.
    pub fn map_direct(&self) -> DirectView {
        DirectView::new(Arc::clone(self.shared.queue.storage()))
    }

    /// Returns a token that aborts this handle's blocking calls.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            queue: Arc::clone(&self.shared.queue),
            interrupt: self.interrupt.clone(),
        }
    }

    fn wait(&self) -> Wait<'_> {
        if self.nonblocking {
            Wait::NonBlocking
        } else {
            Wait::Blocking(Some(&self.interrupt))
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let open = self.shared.handles.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!(open, "vfifo: handle closed");
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("nonblocking", &self.nonblocking)
            .finish_non_exhaustive()
    }
}

/// Aborts blocking calls on one [`Handle`], like a signal to its thread.
///
/// If no call is sleeping, the interrupt stays pending and aborts the next
/// call on that handle that has to sleep.
#[derive(Clone)]
pub struct Interrupter {
    queue: Arc<SynchronizedQueue>,
    interrupt: Interrupt,
}

impl Interrupter {
    pub fn interrupt(&self) {
        self.queue.interrupt(&self.interrupt);
    }
}
