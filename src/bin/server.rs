//! CinderKV Server Binary
//!
//! Starts the TCP server for CinderKV.

use clap::Parser;
use cinderkv::config::{DEFAULT_MAX_ARGS, DEFAULT_MAX_MESSAGE_SIZE};
use cinderkv::{Config, Engine, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// CinderKV Server
#[derive(Parser, Debug)]
#[command(name = "cinderkv-server")]
#[command(about = "Single-threaded in-memory key-value server")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:1234")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Largest frame payload accepted or sent, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,

    /// Most arguments allowed in one request
    #[arg(long, default_value_t = DEFAULT_MAX_ARGS)]
    max_args: usize,

    /// Upper bound on one poll wait, in milliseconds
    #[arg(short, long, default_value = "1000")]
    poll_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cinderkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("CinderKV Server v{}", cinderkv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .max_message_size(args.max_message_size)
        .max_args(args.max_args)
        .poll_timeout_ms(args.poll_timeout_ms)
        .build();

    let mut server = match Server::bind(config, Engine::new()) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
