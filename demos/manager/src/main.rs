//! Keeps a set of NTP servers polling and prints the aggregated clock offset
//!
//! ```
//! cargo run -- --well-known --duration 120
//! ```
use sntpm::{ClientEndpoint, Manager, NtpContext};
use sntpm_net_tokio::UdpSocketWrapper;

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

#[derive(Parser)]
#[command(name = "manager")]
#[command(version)]
struct Cli {
    /// NTP servers as `host` or `host:port`
    servers: Vec<ClientEndpoint>,

    /// Add the well-known public servers
    #[arg(short, long)]
    well_known: bool,

    /// Seconds to run before exiting
    #[arg(short, long, default_value_t = 60)]
    duration: u64,

    /// Seconds between status reports
    #[arg(short, long, default_value_t = 5)]
    interval: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "log")]
    if cfg!(debug_assertions) {
        simple_logger::init_with_level(log::Level::Trace)?;
    } else {
        simple_logger::init_with_level(log::Level::Info)?;
    }

    if cli.servers.is_empty() && !cli.well_known {
        bail!("No servers given, pass some or use --well-known");
    }

    let socket = UdpSocketWrapper::bind("0.0.0.0:0")
        .await
        .context("Unable to create UDP socket")?;
    let manager = Manager::new(NtpContext::new(socket));

    manager.set_clients(cli.servers);
    if cli.well_known {
        manager.add_well_known_servers();
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.interval.max(1)));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(cli.duration);

    while tokio::time::Instant::now() < deadline {
        ticker.tick().await;

        for (endpoint, entry) in manager.entries() {
            let state = match (entry.error, entry.offset) {
                (Some(err), _) => format!("error: {err}"),
                (None, Some(offset)) => format!("offset {offset:+.6} s"),
                (None, None) => "pending".to_owned(),
            };
            println!(
                "{endpoint}: {state}, {} requests, next {}{}",
                entry.number_of_requests,
                entry.next_request_window,
                if entry.in_flight { " (in flight)" } else { "" },
            );
        }

        let now = manager
            .now_datetime()
            .map_or_else(|| "out of range".to_owned(), |now| now.to_rfc3339());
        println!(
            "system clock offset {:+.6} s, corrected time {now}",
            manager.system_clock_offset()
        );
    }

    Ok(())
}
