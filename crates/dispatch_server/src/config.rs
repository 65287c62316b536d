//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use fleet_net::endpoints::{DEFAULT_CLIENT_PORT, DEFAULT_VEHICLE_PORT};

use crate::error::DispatchError;

/// Fixed parameters of a dispatch server. Nothing here is negotiated per
/// session.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Address both channels bind on.
    pub bind_host: IpAddr,
    /// TCP port for vehicles (0 picks an ephemeral port).
    pub vehicle_port: u16,
    /// UDP port for riders (0 picks an ephemeral port).
    pub client_port: u16,
    /// Side length of the square service grid.
    pub grid_size: i32,
    /// Vehicle speed in grid steps per second, used for ETAs.
    pub speed: f64,
    /// Fare per grid unit carried.
    pub price_per_unit: f64,
    /// Send an approach notice on every n-th en-route report.
    pub approach_every: u32,
    /// No approach notice once the vehicle is this close to the pickup.
    pub proximity_threshold: u32,
    /// Upper bound on how long the loop waits without doing anything.
    pub status_interval: Duration,
    /// Outbound messages buffered per vehicle session.
    pub session_queue: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            vehicle_port: DEFAULT_VEHICLE_PORT,
            client_port: DEFAULT_CLIENT_PORT,
            grid_size: 20,
            speed: 0.8,
            price_per_unit: 80.0,
            approach_every: 4,
            proximity_threshold: 2,
            status_interval: Duration::from_secs(5),
            session_queue: 32,
        }
    }
}

impl DispatchConfig {
    /// Bind both channels on `host`.
    #[must_use]
    pub fn with_bind_host(mut self, host: IpAddr) -> Self {
        self.bind_host = host;
        self
    }

    /// Override both ports.
    #[must_use]
    pub fn with_ports(mut self, vehicle_port: u16, client_port: u16) -> Self {
        self.vehicle_port = vehicle_port;
        self.client_port = client_port;
        self
    }

    /// Override the grid size.
    #[must_use]
    pub fn with_grid_size(mut self, grid_size: i32) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Override the vehicle speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn vehicle_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.vehicle_port)
    }

    #[must_use]
    pub fn client_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.client_port)
    }

    /// Reject values that would make ETAs or the grid check meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if !(self.speed > 0.0 && self.speed.is_finite()) {
            return Err(DispatchError::InvalidConfig {
                field: "speed",
                value: self.speed.to_string(),
            });
        }
        if self.grid_size <= 0 {
            return Err(DispatchError::InvalidConfig {
                field: "grid_size",
                value: self.grid_size.to_string(),
            });
        }
        Ok(())
    }

    /// Seconds a vehicle needs to cover `distance` grid steps.
    #[must_use]
    pub fn eta_seconds(&self, distance: u32) -> f64 {
        f64::from(distance) / self.speed
    }
}
