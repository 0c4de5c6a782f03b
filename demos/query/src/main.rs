//! Queries each given NTP server once and prints the measured offset
//!
//! ```
//! cargo run -- -t 2 pool.ntp.org time.google.com:123
//! ```
//!
//! All servers share one UDP socket and are queried concurrently.
use sntpm::{Client, ClientEndpoint, NtpContext};
use sntpm_net_tokio::UdpSocketWrapper;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(name = "query")]
#[command(version)]
struct Cli {
    /// NTP servers as `host` or `host:port`
    #[arg(default_value = "pool.ntp.org")]
    servers: Vec<ClientEndpoint>,

    /// Reply timeout in seconds
    #[arg(short, long, default_value_t = 10.0)]
    timeout: f64,
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

    let socket = UdpSocketWrapper::bind("0.0.0.0:0")
        .await
        .context("Unable to create UDP socket")?;
    let context = NtpContext::new(socket);
    let clients: Vec<_> = cli
        .servers
        .into_iter()
        .map(|endpoint| {
            let client = Client::new(endpoint, context.clone());
            client.set_timeout_secs(cli.timeout);
            client
        })
        .collect();

    let mut queries = tokio::task::JoinSet::new();
    for client in clients {
        queries.spawn(async move {
            let outcome = client.query_time().await;
            (client.endpoint().clone(), outcome)
        });
    }

    while let Some(joined) = queries.join_next().await {
        let (endpoint, outcome) = joined?;

        match outcome.result {
            Ok(result) => println!(
                "{endpoint}: offset {:+.6} s, delay {:.6} s, stratum {}, reference {}",
                result.offset(),
                result.roundtrip(),
                result.stratum(),
                result.reference_id(),
            ),
            Err(err) => println!("{endpoint}: {err} (code {})", err.code()),
        }
        println!("{endpoint}: next request not before {}", outcome.next_request_window);
    }

    Ok(())
}
