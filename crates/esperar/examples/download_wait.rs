//! Wait for a file that appears asynchronously, the way a
//! download-and-verify helper would use the poller.
//!
//! Run with: `cargo run --example download_wait`

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use esperar::{PollOptions, Poller};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let dir = std::env::temp_dir().join("esperar-download-demo");
    std::fs::create_dir_all(&dir)?;
    let target = dir.join("report.pdf");
    let _ = std::fs::remove_file(&target);

    // Simulates a browser finishing a download a moment from now
    let writer = {
        let target = target.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            std::fs::write(&target, b"%PDF-1.7")
        })
    };

    let poller = Poller::with_options(
        PollOptions::new()
            .with_timeout(5_000)
            .with_poll_interval(25),
    );

    let found = poller.poll("download finished", || -> std::io::Result<Option<PathBuf>> {
        if target.exists() {
            Ok(Some(target.clone()))
        } else {
            Ok(None)
        }
    })?;

    println!("found {}", found.display());
    writer.join().expect("writer thread")?;
    Ok(())
}
