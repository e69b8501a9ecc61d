//! Bounded blocking byte FIFO exposed as a device-like endpoint.
//!
//! This crate provides a fixed-capacity byte queue that many threads can read
//! and write concurrently, together with out-of-band control commands and a
//! background producer. It is layered bottom-up:
//!
//! - [`RingBuffer`]: head/tail/size bookkeeping over fixed storage, no locking
//! - [`SynchronizedQueue`]: the ring behind a mutex with `not_empty` and
//!   `not_full` condition variables; blocking, non-blocking and interruptible
//!   reads and writes
//! - [`ControlChannel`]: `Clear` and `SetMode` commands, also decodable from
//!   raw ioctl numbers
//! - [`DeferredProducer`]: a timer task that hands off to a blocking worker to
//!   append a fixed payload while auto-generation is on
//! - [`DirectView`]: an unsafe raw window onto the storage
//! - [`Device`] / [`Handle`]: the endpoint that ties it all together
//!
//! # Reading and Writing
//!
//! Writes accept as many bytes as fit and reads deliver as many as are
//! queued; short transfers are normal. A handle in non-blocking mode returns
//! [`VfifoError::WouldBlock`] instead of sleeping.
//!
//! ```
//! use vfifo::{Config, Device, VfifoError};
//!
//! let device = Device::new(Config::default().with_capacity(8)).unwrap();
//! let mut handle = device.open().unwrap();
//! handle.set_nonblocking(true);
//!
//! assert_eq!(handle.write(b"ABCDEFGH").unwrap(), 8);
//! assert!(matches!(handle.write(b"Z"), Err(VfifoError::WouldBlock)));
//!
//! let mut buf = [0u8; 3];
//! handle.read(&mut buf).unwrap();
//! assert_eq!(&buf, b"ABC");
//! assert_eq!(handle.write(b"Z").unwrap(), 1);
//!
//! let mut rest = [0u8; 6];
//! handle.read(&mut rest).unwrap();
//! assert_eq!(&rest, b"DEFGHZ");
//! ```
//!
//! # Auto-Generation
//!
//! Switching to [`Mode::AutoGenerate`] arms the producer, which appends the
//! configured payload once per interval when the whole payload fits.
//! Switching back to [`Mode::Manual`] returns only after the producer has
//! stopped. Control commands are async and need a tokio runtime.
//!
//! ```
//! use std::time::Duration;
//! use vfifo::{Command, Config, Device, Mode};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = Config::default().with_interval(Duration::from_millis(20));
//! let device = Device::new(config).unwrap();
//! let handle = device.open().unwrap();
//!
//! handle.control(Command::SetMode(Mode::AutoGenerate)).await.unwrap();
//! tokio::time::sleep(Duration::from_millis(100)).await;
//! handle.control(Command::SetMode(Mode::Manual)).await.unwrap();
//!
//! assert!(device.available() >= 5);
//! device.shutdown().await;
//! # }
//! ```
//!
//! # Thread Safety
//!
//! [`SynchronizedQueue`], [`Device`] and [`Handle`] are `Send + Sync`. All
//! state except the [`DirectView`] storage alias lives behind one mutex.

mod config;
mod control;
mod device;
mod error;
mod io;
mod producer;
mod queue;
mod ring;
mod view;

pub use config::{Config, DEFAULT_CAPACITY, DEFAULT_INTERVAL_MS, DEFAULT_PAYLOAD};
pub use control::{Command, ControlChannel, IOC_MAGIC, VFIFO_CLEAR, VFIFO_SET_MODE};
pub use device::{Device, Handle, Interrupter};
pub use error::{Result, VfifoError};
pub use io::{Sink, Source, UserSlice, UserSliceMut};
pub use producer::{DeferredProducer, ProducerState};
pub use queue::{Interrupt, Mode, SynchronizedQueue, Wait};
pub use ring::{PAGE_SIZE, RingBuffer};
pub use view::DirectView;
