//! Ride request client.
//!
//! Sends one request and prints every notification until the ride is over,
//! denied, or the server stops answering.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use fleet_agents::request_ride;
use fleet_model::{ClientId, Coordinate, RideRequest};
use fleet_net::endpoints::{self, DEFAULT_CLIENT_PORT};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rider", about = "Request a ride from the fleet")]
struct Args {
    /// Rider id; one active ride per id
    #[arg(long)]
    client_id: u32,

    #[arg(long)]
    from_x: i32,

    #[arg(long)]
    from_y: i32,

    #[arg(long)]
    to_x: i32,

    #[arg(long)]
    to_y: i32,

    /// Give up after this many seconds without a notification
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Server host (falls back to FLEET_SERVER_HOST, then 127.0.0.1)
    #[arg(long)]
    server: Option<String>,

    /// Server rider port
    #[arg(long, default_value_t = DEFAULT_CLIENT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fleet_agents=warn".parse()?))
        .init();

    let args = Args::parse();
    let host = endpoints::server_host(args.server.as_deref());
    let server = endpoints::resolve(&host, args.port).await?;

    let request = RideRequest {
        client_id: ClientId(args.client_id),
        origin: Coordinate::new(args.from_x, args.from_y),
        destination: Coordinate::new(args.to_x, args.to_y),
    };
    println!(
        "Requesting a ride from {} to {} as client {}",
        request.origin, request.destination, request.client_id
    );

    let outcome = request_ride(
        server,
        request,
        Duration::from_secs(args.timeout_secs),
        |notice| println!("{}", notice.text),
    )
    .await?;

    if outcome.is_none() {
        println!("No response from the server after {}s.", args.timeout_secs);
    }
    Ok(())
}
