//! Plugwatch binary.
//!
//! # Usage
//!
//! ```bash
//! # Watch every device until the first one to arrive has left again
//! plugwatch
//!
//! # Only a given vendor/product, also reporting devices already plugged in
//! plugwatch 0x046d 0xc52b --enumerate
//!
//! # Any vendor and product, HID class only
//! plugwatch -1 -1 3
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use clap::Parser;
use plugwatch::{DriverError, MonitorConfig, library_version};
use plugwatch_core::{FilterError, MatchFilter};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// USB hotplug monitor
#[derive(Parser, Debug)]
#[command(name = "plugwatch")]
#[command(about = "Report USB devices as they arrive and leave")]
#[command(version)]
struct Args {
    /// Vendor ID to match (decimal, 0x-hex or 0-octal; -1 or "any" for all)
    #[arg(allow_negative_numbers = true)]
    vendor_id: Option<String>,

    /// Product ID to match
    #[arg(allow_negative_numbers = true)]
    product_id: Option<String>,

    /// Device class to match
    #[arg(allow_negative_numbers = true)]
    class_id: Option<String>,

    /// Report devices already connected at start
    #[arg(long)]
    enumerate: bool,

    /// Upper bound for one round of event handling, in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn filter(&self) -> Result<MatchFilter, FilterError> {
        let positional: Vec<&str> = [&self.vendor_id, &self.product_id, &self.class_id]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();

        MatchFilter::from_args(&positional)
    }

    fn config(&self) -> Result<MonitorConfig, DriverError> {
        Ok(MonitorConfig {
            filter: self.filter()?,
            enumerate: self.enumerate,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout carries the device reports
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let config = args.config().inspect_err(|e| tracing::error!("{}", e))?;

    tracing::info!("Plugwatch starting (libusb {})", library_version());
    tracing::info!("Matching {}", config.filter);

    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            signal_stop.store(true, Ordering::Relaxed);
        }
    });

    let summary = tokio::task::spawn_blocking(move || plugwatch::watch(config, &stop)).await?;
    let summary = summary.inspect_err(|e| tracing::error!("{}", e))?;

    tracing::info!(
        attached = summary.attached,
        detached = summary.detached,
        stopped_early = summary.stopped_early,
        "Plugwatch finished"
    );

    Ok(())
}
