//! Error types for FIFO operations.

use thiserror::Error;

/// FIFO operation error.
///
/// `WouldBlock` and `Cancelled` are routine outcomes of non-blocking and
/// interrupted calls. They are kept apart from `Fault` because the caller's
/// retry strategy differs for each.
#[derive(Error, Debug)]
pub enum VfifoError {
    /// A non-blocking call found no data (read) or no space (write).
    #[error("vfifo: operation would block")]
    WouldBlock,

    /// A blocking call was interrupted before it could make progress.
    #[error("vfifo: interrupted")]
    Cancelled,

    /// Copying to or from caller memory failed part way.
    ///
    /// Bytes moved before the fault stay moved.
    #[error("vfifo: bad address after {transferred} bytes")]
    Fault { transferred: usize },

    /// The control command number is not recognized.
    #[error("vfifo: invalid command {0:#x}")]
    InvalidCommand(u32),

    /// The device has been shut down.
    #[error("vfifo: device closed")]
    Closed,

    /// The configuration was rejected.
    #[error("vfifo: invalid config: {0}")]
    InvalidConfig(String),

    #[error("vfifo: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vfifo: config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl VfifoError {
    /// Returns the errno a character device would report for this error.
    pub fn errno(&self) -> i32 {
        match self {
            VfifoError::WouldBlock => 11, // EAGAIN
            VfifoError::Cancelled => 512, // ERESTARTSYS
            VfifoError::Fault { .. } => 14, // EFAULT
            VfifoError::InvalidCommand(_) => 25, // ENOTTY
            VfifoError::Closed => 19, // ENODEV
            VfifoError::InvalidConfig(_) | VfifoError::Yaml(_) => 22, // EINVAL
            VfifoError::Io(e) => e.raw_os_error().unwrap_or(5), // EIO
        }
    }

    /// Returns true for outcomes that are expected under load rather than failures.
    pub fn is_transient(&self) -> bool {
        matches!(self, VfifoError::WouldBlock | VfifoError::Cancelled)
    }
}

/// Result type for FIFO operations.
pub type Result<T> = std::result::Result<T, VfifoError>;
