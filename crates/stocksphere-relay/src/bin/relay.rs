//! # Standalone Relay Server
//!
//! Runs the barcode-scan relay on its own.
//!
//! ## Usage
//! ```bash
//! # Defaults: 0.0.0.0:8765
//! cargo run -p stocksphere-relay --bin relay
//!
//! # Custom port and bind address
//! cargo run -p stocksphere-relay --bin relay -- --port 9000 --bind 127.0.0.1
//!
//! # Verbose logging
//! RUST_LOG=debug cargo run -p stocksphere-relay --bin relay
//! ```

use std::env;

use tracing::info;
use tracing_subscriber::EnvFilter;

use stocksphere_relay::{RelayConfig, RelayServer, DEFAULT_RELAY_PORT};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut config = RelayConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    config.port = args[i + 1].parse().unwrap_or(DEFAULT_RELAY_PORT);
                    i += 1;
                }
            }
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("StockSphere Scan Relay");
                println!();
                println!("Usage: relay [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --port <PORT>   Port to listen on (default: {})", DEFAULT_RELAY_PORT);
                println!("  -b, --bind <ADDR>   Bind address (default: 0.0.0.0)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let handle = RelayServer::new(config).start().await?;
    info!(addr = %handle.local_addr(), "Scan relay ready; connect clients to /ws");

    // Run until interrupted.
    tokio::signal::ctrl_c().await?;
    info!("Interrupt received");
    handle.shutdown().await?;

    Ok(())
}
