//! Out-of-band control commands.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::{Result, VfifoError};
use crate::producer::DeferredProducer;
use crate::queue::{Mode, SynchronizedQueue};

/// ioctl type byte shared by all commands.
pub const IOC_MAGIC: u8 = b'k';

const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;

const fn ioc(dir: u32, ty: u8, nr: u8, size: usize) -> u32 {
    (dir << 30) | ((size as u32) << 16) | ((ty as u32) << 8) | nr as u32
}

/// `_IO('k', 1)`: empty the queue.
pub const VFIFO_CLEAR: u32 = ioc(IOC_NONE, IOC_MAGIC, 1, 0);

/// `_IOW('k', 2, int)`: set the generation mode, `0` manual, otherwise auto.
pub const VFIFO_SET_MODE: u32 = ioc(IOC_WRITE, IOC_MAGIC, 2, std::mem::size_of::<i32>());

/// A control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reset the queue to empty and wake blocked writers.
    Clear,
    /// Switch between manual and auto-generation mode.
    SetMode(Mode),
}

impl Command {
    /// Decodes a raw command number and its integer argument.
    ///
    /// `arg` is `None` when the argument could not be copied from the caller.
    pub fn decode(cmd: u32, arg: Option<i32>) -> Result<Command> {
        match cmd {
            VFIFO_CLEAR => Ok(Command::Clear),
            VFIFO_SET_MODE => {
                let value = arg.ok_or(VfifoError::Fault { transferred: 0 })?;
                Ok(Command::SetMode(Mode::from_raw(value)))
            }
            other => Err(VfifoError::InvalidCommand(other)),
        }
    }

    /// Returns the raw command number.
    pub fn number(&self) -> u32 {
        match self {
            Command::Clear => VFIFO_CLEAR,
            Command::SetMode(_) => VFIFO_SET_MODE,
        }
    }
}

/// Executes control commands against a queue and its producer.
///
/// Commands take the queue lock like ordinary reads and writes. Mode changes
/// are additionally serialized with each other so the producer's armed state
/// always follows the last mode written.
pub struct ControlChannel {
    queue: Arc<SynchronizedQueue>,
    producer: DeferredProducer,
    serial: Mutex<()>,
}

impl ControlChannel {
    pub fn new(queue: Arc<SynchronizedQueue>, producer: DeferredProducer) -> Self {
        ControlChannel {
            queue,
            producer,
            serial: Mutex::new(()),
        }
    }

    pub fn producer(&self) -> &DeferredProducer {
        &self.producer
    }

    /// Runs one command.
    pub async fn execute(&self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Clear => self.clear(),
            Command::SetMode(mode) => self.set_mode(mode).await,
        }
    }

    /// Empties the queue. Writers blocked on a full queue are woken.
    pub fn clear(&self) -> Result<()> {
        self.queue.clear()?;
        info!("vfifo: buffer cleared");
        Ok(())
    }

    /// Sets the generation mode.
    ///
    /// Switching to manual returns only after the producer is fully stopped.
    pub async fn set_mode(&self, mode: Mode) -> Result<()> {
        let _serial = self.serial.lock().await;

        let previous = self.queue.set_mode(mode)?;
        if previous == mode {
            return Ok(());
        }

        match mode {
            Mode::AutoGenerate => {
                info!("vfifo: enabling auto-generation");
                self.producer.arm();
            }
            Mode::Manual => {
                info!("vfifo: disabling auto-generation");
                self.producer.disarm().await;
            }
        }
        Ok(())
    }

    /// Stops the producer and closes the queue, in that order.
    ///
    /// Holding the serial lock across both steps keeps a concurrent
    /// `set_mode` from re-arming the producer in between.
    pub async fn shutdown(&self) {
        let _serial = self.serial.lock().await;
        self.producer.disarm().await;
        self.queue.close();
    }
}
