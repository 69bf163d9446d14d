//! One-shot client: send a message, print the reply.

use clap::Parser;
use packet_log::config::ClientArgs;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ClientArgs::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(server = %args.connect, message = %args.message, "Sending request");

    let reply = packet_log::send_once(args.connect.as_str(), &args.message).await?;
    println!("{reply}");
    Ok(())
}
