//! Direct memory view command.

use clap::Args;

use super::create_device;
use crate::Cli;

/// Writes into the device storage through the direct view.
///
/// The write bypasses the queue, so it is not visible to readers.
#[derive(Args)]
pub struct MmapCommand {
    /// Message written at the start of the storage
    #[arg(short = 'm', long, default_value = "Hello via Memory Map!")]
    message: String,
}

impl MmapCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let device = create_device(cli)?;
        let handle = device.open()?;
        let view = handle.map_direct();
        println!("Mapped {} bytes", view.len());

        println!("1. Writing to mapped memory directly...");
        // SAFETY: nothing else uses the device while the view is accessed.
        let written = unsafe { view.write_at(0, self.message.as_bytes()) };

        println!("2. Verifying data in memory...");
        let mut buf = vec![0u8; written];
        // SAFETY: as above.
        unsafe { view.read_at(0, &mut buf) };
        println!("   Mapped Content: {:?}", String::from_utf8_lossy(&buf));
        println!("   Queue sees {} bytes available", handle.available());

        drop(handle);
        device.shutdown().await;
        Ok(())
    }
}
