//! # dispatch_server
//!
//! Runs the fleet dispatch server.
//!
//! ## Startup Sequence
//!
//! 1. Parse arguments into a [`DispatchConfig`].
//! 2. Validate it and bind the vehicle (TCP) and rider (UDP) channels.
//!    Failure here is the only fatal error.
//! 3. Run the dispatch loop until Ctrl-C.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dispatch_server::{DispatchConfig, Server};
use fleet_net::endpoints::{DEFAULT_CLIENT_PORT, DEFAULT_VEHICLE_PORT};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dispatch_server", about = "Fleet dispatch server")]
struct Args {
    /// Address to bind both channels on
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// TCP port vehicles connect to
    #[arg(long, default_value_t = DEFAULT_VEHICLE_PORT)]
    vehicle_port: u16,

    /// UDP port riders send requests to
    #[arg(long, default_value_t = DEFAULT_CLIENT_PORT)]
    client_port: u16,

    /// Side length of the square service grid
    #[arg(long, default_value_t = 20)]
    grid_size: i32,

    /// Vehicle speed in grid steps per second
    #[arg(long, default_value_t = 0.8)]
    speed: f64,

    /// Fare per grid unit
    #[arg(long, default_value_t = 80.0)]
    price: f64,

    /// Send an approach notice every N en-route reports
    #[arg(long, default_value_t = 4)]
    approach_every: u32,

    /// Stop sending approach notices within this many units of the pickup
    #[arg(long, default_value_t = 2)]
    proximity: u32,

    /// Seconds between fleet status lines
    #[arg(long, default_value_t = 5)]
    status_secs: u64,
}

impl Args {
    fn into_config(self) -> DispatchConfig {
        let mut config = DispatchConfig::default()
            .with_bind_host(self.host)
            .with_ports(self.vehicle_port, self.client_port)
            .with_grid_size(self.grid_size)
            .with_speed(self.speed);
        config.price_per_unit = self.price;
        config.approach_every = self.approach_every;
        config.proximity_threshold = self.proximity;
        config.status_interval = Duration::from_secs(self.status_secs.max(1));
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("dispatch_server=info".parse()?),
        )
        .init();

    let config = Args::parse().into_config();

    info!(?config, "dispatch server starting");
    let server = Server::bind(config).await?;

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(%e, "could not listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("dispatch server shut down");
    Ok(())
}
