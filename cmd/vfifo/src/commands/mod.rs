//! CLI commands module.

mod auto;
mod config;
mod io;
mod mmap;
mod util;

pub use auto::AutoCommand;
pub use config::ConfigCommand;
pub use io::{BlockingCommand, RoundtripCommand, ScenarioCommand};
pub use mmap::MmapCommand;

pub(crate) use util::*;
