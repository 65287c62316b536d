//! Vehicle runner: connects a [`VehicleSim`] to the dispatch server.
//!
//! The runner reports once on connect, then moves one step per tick while it
//! has a task. Assignments are accepted between ticks.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Result, bail};
use fleet_model::{Coordinate, VehicleId};
use fleet_net::{Message, VehicleLink};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::sim::VehicleSim;

/// Configuration for one simulated vehicle.
#[derive(Debug, Clone)]
pub struct VehicleConfig {
    pub id: VehicleId,
    pub start: Coordinate,
    /// Grid steps per second.
    pub speed: f64,
    /// Fare per grid unit carried.
    pub price_per_unit: f64,
    /// The server's vehicle channel.
    pub server: SocketAddr,
}

impl VehicleConfig {
    #[must_use]
    pub fn new(id: VehicleId, start: Coordinate, server: SocketAddr) -> Self {
        Self {
            id,
            start,
            speed: 0.8,
            price_per_unit: 80.0,
            server,
        }
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn with_price(mut self, price_per_unit: f64) -> Self {
        self.price_per_unit = price_per_unit;
        self
    }

    fn step_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.speed)
    }
}

/// Drives one vehicle for the lifetime of its connection.
#[derive(Debug)]
pub struct VehicleRunner {
    config: VehicleConfig,
}

impl VehicleRunner {
    #[must_use]
    pub fn new(config: VehicleConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` completes or the server hangs up.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable, the connection
    /// cannot be made, or a send fails.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let config = self.config;
        if !(config.speed > 0.0 && config.speed.is_finite()) {
            bail!("speed must be a positive number, got {}", config.speed);
        }

        let mut link = VehicleLink::connect(config.server).await?;
        let mut sim = VehicleSim::new(config.id, config.start, config.price_per_unit);
        link.send(&sim.report()).await?;
        info!(vehicle = %config.id, position = %config.start, "vehicle online");

        let mut ticker = time::interval(config.step_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(vehicle = %config.id, "vehicle going offline");
                    break;
                }

                inbound = link.recv() => match inbound {
                    Some(Message::TaskAssignment(task)) => {
                        if sim.on_assignment(task) {
                            info!(
                                vehicle = %config.id,
                                client = %task.client_id(),
                                pickup = %task.request.origin,
                                destination = %task.request.destination,
                                "task accepted"
                            );
                            link.send(&sim.report()).await?;
                        } else {
                            warn!(vehicle = %config.id, assigned = %task.vehicle_id, "task refused");
                        }
                    }
                    Some(other) => debug!(kind = other.kind(), "ignoring message from server"),
                    None => {
                        warn!(vehicle = %config.id, "server closed the connection");
                        break;
                    }
                },

                _ = ticker.tick() => {
                    for message in sim.step() {
                        if let Message::RideCompleted(report) = &message {
                            info!(
                                vehicle = %config.id,
                                client = %report.client_id,
                                distance = report.distance_covered,
                                fare = report.fare,
                                "ride completed"
                            );
                        }
                        link.send(&message).await?;
                    }
                }
            }
        }

        let stats = sim.state().stats;
        info!(
            vehicle = %config.id,
            rides = stats.rides_completed,
            distance = stats.distance_traveled,
            earnings = stats.earnings,
            "vehicle stopped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fleet_model::{ClientId, RideRequest, TaskAssignment, VehicleStatus};
    use fleet_net::{codec, frame};
    use tokio::net::TcpListener;

    use super::*;

    async fn read_message(stream: &mut tokio::net::TcpStream) -> Message {
        let payload = frame::read_frame(stream).await.unwrap().unwrap();
        codec::decode(&payload).unwrap()
    }

    #[tokio::test]
    async fn test_runner_reports_then_completes_assignment() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = VehicleConfig::new(
            VehicleId(4),
            Coordinate::new(0, 0),
            listener.local_addr().unwrap(),
        )
        .with_speed(200.0);

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let vehicle = tokio::spawn(VehicleRunner::new(config).run(async {
            let _ = stop_rx.await;
        }));

        let (mut stream, _) = listener.accept().await.unwrap();
        let Message::VehicleReport(first) = read_message(&mut stream).await else {
            panic!("expected an initial report");
        };
        assert_eq!(first.id, VehicleId(4));
        assert_eq!(first.status, VehicleStatus::Idle);

        let task = TaskAssignment {
            vehicle_id: VehicleId(4),
            request: RideRequest {
                client_id: ClientId(9),
                origin: Coordinate::new(1, 1),
                destination: Coordinate::new(3, 1),
            },
            estimated_distance: 1,
        };
        let payload = codec::encode(&Message::TaskAssignment(task)).unwrap();
        frame::write_frame(&mut stream, &payload).await.unwrap();

        let completion = loop {
            if let Message::RideCompleted(report) = read_message(&mut stream).await {
                break report;
            }
        };
        assert_eq!(completion.client_id, ClientId(9));
        assert!((completion.distance_covered - 2.0).abs() < f64::EPSILON);
        assert!((completion.fare - 160.0).abs() < f64::EPSILON);

        stop_tx.send(()).unwrap();
        vehicle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_runner_rejects_zero_speed() {
        let config = VehicleConfig::new(
            VehicleId(1),
            Coordinate::ORIGIN,
            ([127, 0, 0, 1], 9).into(),
        )
        .with_speed(0.0);
        let result = VehicleRunner::new(config).run(std::future::pending::<()>()).await;
        assert!(result.is_err());
    }
}
