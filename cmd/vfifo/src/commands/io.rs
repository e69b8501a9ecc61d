//! Read and write commands.

use std::time::Duration;

use clap::Args;

use vfifo::{Device, Handle, VfifoError};

use super::{create_device, get_config, print_verbose};
use crate::Cli;

/// Writes a message and reads it back.
#[derive(Args)]
pub struct RoundtripCommand {
    /// Message to send through the device
    #[arg(short = 'm', long, default_value = "Hello from User Space!")]
    message: String,
}

impl RoundtripCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let device = create_device(cli)?;
        let mut handle = device.open()?;

        println!("Writing data: {:?}", self.message);
        let echoed = roundtrip(&mut handle, self.message.as_bytes());
        drop(handle);
        device.shutdown().await;

        let echoed = echoed?;
        let echoed = String::from_utf8_lossy(&echoed);
        if echoed != self.message {
            anyhow::bail!("data mismatch: wrote {:?}, read {:?}", self.message, echoed);
        }
        println!("SUCCESS: Data verified!");
        Ok(())
    }
}

/// Writes `message` and reads back whatever was accepted.
///
/// The read side is non-blocking: only the bytes this call wrote are
/// expected, so an empty queue means there is nothing to wait for.
fn roundtrip(handle: &mut Handle, message: &[u8]) -> anyhow::Result<Vec<u8>> {
    let written = handle.write(message)?;
    println!("Wrote {} bytes.", written);
    if written == 0 {
        return Ok(Vec::new());
    }

    handle.set_nonblocking(true);
    let mut buf = vec![0u8; written];
    let n = handle.read(&mut buf)?;
    buf.truncate(n);
    println!("Read {} bytes: {:?}", n, String::from_utf8_lossy(&buf));
    Ok(buf)
}

/// Replays the capacity-8 fill, backpressure and drain sequence.
#[derive(Args)]
pub struct ScenarioCommand {}

impl ScenarioCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?.with_capacity(SCENARIO_CAPACITY);
        print_verbose(cli, &format!("Device: capacity={}", cfg.capacity));
        let device = Device::new(cfg)?;
        let mut handle = device.open()?;

        let result = replay_scenario(&mut handle);
        drop(handle);
        device.shutdown().await;

        result?;
        println!("SUCCESS: Scenario verified!");
        Ok(())
    }
}

const SCENARIO_CAPACITY: usize = 8;

fn replay_scenario(handle: &mut Handle) -> anyhow::Result<()> {
    handle.set_nonblocking(true);

    let n = handle.write(b"ABCDEFGH")?;
    println!("1. Wrote {} bytes, {} queued", n, handle.available());
    anyhow::ensure!(n == 8, "expected to fill the queue, wrote {}", n);

    match handle.write(b"Z") {
        Err(VfifoError::WouldBlock) => println!("2. Full queue rejected write: would block"),
        other => anyhow::bail!("expected a full queue to reject the write, got {:?}", other),
    }
    anyhow::ensure!(handle.available() == 8, "rejected write changed the queue");

    let mut head = [0u8; 3];
    let n = handle.read(&mut head)?;
    println!("3. Read {:?}", String::from_utf8_lossy(&head[..n]));
    anyhow::ensure!(&head[..n] == b"ABC", "expected \"ABC\", read {:?}", &head[..n]);

    let n = handle.write(b"Z")?;
    println!("4. Wrote {} byte after freeing space", n);
    anyhow::ensure!(n == 1, "expected the freed space to take one byte");

    let mut rest = [0u8; 6];
    let n = handle.read(&mut rest)?;
    println!("5. Read {:?}", String::from_utf8_lossy(&rest[..n]));
    anyhow::ensure!(&rest[..n] == b"DEFGHZ", "expected \"DEFGHZ\", read {:?}", &rest[..n]);

    match handle.read(&mut rest) {
        Err(VfifoError::WouldBlock) => println!("6. Empty queue: would block"),
        other => anyhow::bail!("expected an empty queue, got {:?}", other),
    }
    Ok(())
}

/// Starts a reader on an empty device and writes after a delay.
#[derive(Args)]
pub struct BlockingCommand {
    /// Message written after the delay
    #[arg(short = 'm', long, default_value = "Delayed Data")]
    message: String,

    /// Delay before writing, in milliseconds
    #[arg(long, default_value_t = 2000)]
    delay_ms: u64,
}

impl BlockingCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let device = create_device(cli)?;
        let reader = device.open()?;
        let writer = device.open()?;

        let reading = tokio::task::spawn_blocking(move || {
            println!("[Reader] Trying to read (should block if empty)...");
            let mut buf = [0u8; 100];
            reader.read(&mut buf).map(|n| buf[..n].to_vec())
        });

        println!("[Main] Sleeping for {} ms to simulate delay...", self.delay_ms);
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

        println!("[Main] Writing data now...");
        let written = writer.write(self.message.as_bytes())?;
        print_verbose(cli, &format!("Wrote {} bytes", written));

        let data = reading.await??;
        println!(
            "[Reader] Read {} bytes: {:?}",
            data.len(),
            String::from_utf8_lossy(&data)
        );

        drop(writer);
        device.shutdown().await;
        Ok(())
    }
}
