use clap::Parser;
use tracing::info;

use kiwi::config::Config;
use kiwi::server;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(err) = server::run(config, shutdown_signal()).await {
        eprintln!("kiwi: {err}");
        std::process::exit(1);
    }
}

/// Completes on SIGINT or SIGTERM, triggering graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = term.recv() => info!("received SIGTERM"),
    }
}
