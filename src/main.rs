use std::net::SocketAddr;

use tracing_subscriber::{EnvFilter, fmt};

mod cli;

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (addr, config) = match cli::run() {
        cli::RunOutcome::Serve { port, config } => {
            (SocketAddr::from(([0, 0, 0, 0], port)), config)
        }
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    if let Err(err) = nourish::serve(addr, config).await {
        tracing::error!(error = %err, "server stopped");
        std::process::exit(1);
    }
}
