//! Simulated taxi.
//!
//! Connects to the dispatch server, reports its position and drives every
//! ride it is assigned one grid step at a time.

use anyhow::Result;
use clap::Parser;
use fleet_agents::{VehicleConfig, VehicleRunner};
use fleet_model::{Coordinate, VehicleId};
use fleet_net::endpoints::{self, DEFAULT_VEHICLE_PORT};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vehicle", about = "Simulated fleet vehicle")]
struct Args {
    /// Vehicle id, unique across the fleet
    #[arg(long)]
    id: u32,

    /// Starting column
    #[arg(long, default_value_t = 0)]
    x: i32,

    /// Starting row
    #[arg(long, default_value_t = 0)]
    y: i32,

    /// Grid steps per second
    #[arg(long, default_value_t = 0.8)]
    speed: f64,

    /// Fare per grid unit
    #[arg(long, default_value_t = 80.0)]
    price: f64,

    /// Server host (falls back to FLEET_SERVER_HOST, then 127.0.0.1)
    #[arg(long)]
    server: Option<String>,

    /// Server vehicle port
    #[arg(long, default_value_t = DEFAULT_VEHICLE_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fleet_agents=info".parse()?))
        .init();

    let args = Args::parse();
    let host = endpoints::server_host(args.server.as_deref());
    let server = endpoints::resolve(&host, args.port).await?;

    let config = VehicleConfig::new(VehicleId(args.id), Coordinate::new(args.x, args.y), server)
        .with_speed(args.speed)
        .with_price(args.price);

    VehicleRunner::new(config)
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("vehicle shut down");
    Ok(())
}
