//! studio-api-server: command endpoint for the practice instrument
//!
//! Listens for framed requests of the form
//! `<marker><:COMMAND:>{command}<:FILEPATH:>{path}` and answers each
//! connection with a single framed `RESPONSE_AOK` or `RESPONSE_ERR`.
//!
//! Features:
//! - One request per connection, one read per request
//! - Sequential serving by default, opt-in concurrent connections
//! - Configuration via CLI arguments or TOML file

use studio_api_server::{Config, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = config.env_filter(rust_log.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        bind_address = %config.bind_address,
        bind_port = config.bind_port,
        read_buffer_size = config.read_buffer_size,
        max_connections = config.max_connections,
        "Starting studio-api-server"
    );

    let server = Server::bind(config).await?;
    server.run().await
}
