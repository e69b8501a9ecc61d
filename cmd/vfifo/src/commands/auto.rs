//! Auto-generation command.

use std::time::Duration;

use clap::Args;

use vfifo::{Command, Mode, VFIFO_CLEAR, VFIFO_SET_MODE};

use super::{create_device, print_verbose};
use crate::Cli;

/// Lets the device produce data on its own for a while.
#[derive(Args)]
pub struct AutoCommand {
    /// How long to let the producer run, in milliseconds
    #[arg(long, default_value_t = 3000)]
    wait_ms: u64,

    /// Issue raw ioctl numbers instead of typed commands
    #[arg(long)]
    raw: bool,
}

impl AutoCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let device = create_device(cli)?;
        let mut handle = device.open()?;
        handle.set_nonblocking(true);

        println!("1. Clearing buffer...");
        if self.raw {
            handle.ioctl(VFIFO_CLEAR, None).await?;
        } else {
            handle.control(Command::Clear).await?;
        }

        println!("2. Enabling auto-generation...");
        self.set_mode(&handle, Mode::AutoGenerate).await?;

        println!("   Waiting for {} ms while the device generates data...", self.wait_ms);
        tokio::time::sleep(Duration::from_millis(self.wait_ms)).await;

        println!("3. Reading generated data...");
        let mut buf = [0u8; 100];
        match handle.read(&mut buf) {
            Ok(n) => println!("   Read {} bytes: {:?}", n, String::from_utf8_lossy(&buf[..n])),
            Err(e) if e.is_transient() => println!("   Read 0 bytes (buffer empty)"),
            Err(e) => return Err(e.into()),
        }

        println!("4. Disabling auto-generation...");
        self.set_mode(&handle, Mode::Manual).await?;
        print_verbose(cli, &format!("{} bytes left queued", handle.available()));

        drop(handle);
        device.shutdown().await;
        Ok(())
    }

    async fn set_mode(&self, handle: &vfifo::Handle, mode: Mode) -> anyhow::Result<()> {
        if self.raw {
            handle.ioctl(VFIFO_SET_MODE, Some(mode.as_raw())).await?;
        } else {
            handle.control(Command::SetMode(mode)).await?;
        }
        Ok(())
    }
}
