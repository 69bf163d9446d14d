use packet_log::{Config, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        log_file = %config.log_file.display(),
        max_message_size = config.max_message_size,
        "Starting packet-log server"
    );

    let server = Server::bind(&config).await?;
    server.run().await?;
    Ok(())
}
