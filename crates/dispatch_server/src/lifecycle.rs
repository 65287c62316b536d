//! Ride lifecycle tracker.
//!
//! Rides advance on vehicle reports, never on timers:
//!
//! ```text
//! GoingToPickup ──(distance 0)──▶ AtPickup ──(Transporting)──▶ Transporting
//!       │                                                          │
//!       └───────────────(completion report, any phase)─────────────┴──▶ removed
//! ```
//!
//! While going to the pickup, every `approach_every`-th en-route report
//! produces an approach notice unless the vehicle is already within
//! `proximity_threshold`. The arrival notice is sent at most once per ride.

use std::net::SocketAddr;

use fleet_model::{RideCompletionReport, VehicleState, VehicleStatus, fare_for, grid_distance};
use fleet_net::Notification;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::notices;
use crate::tasks::{ActiveRide, RidePhase, TaskRegistry};
use crate::vehicles::VehicleRegistry;

/// Advance `ride` on a report from its vehicle and return the notice, if
/// any, the rider should get.
pub fn on_report(
    ride: &mut ActiveRide,
    report: &VehicleState,
    config: &DispatchConfig,
) -> Option<Notification> {
    let vehicle = report.id;

    if report.status == VehicleStatus::Transporting {
        if ride.phase != RidePhase::Transporting {
            info!(vehicle = %vehicle, client = %ride.client_id(), "rider on board");
            ride.phase = RidePhase::Transporting;
        }
        return None;
    }
    if ride.phase == RidePhase::Transporting {
        return None;
    }

    let remaining = grid_distance(report.position, ride.assignment.request.origin);

    if report.status == VehicleStatus::EnRouteToPickup && ride.phase == RidePhase::GoingToPickup {
        ride.en_route_reports += 1;
        let due = config.approach_every > 0 && ride.en_route_reports % config.approach_every == 0;
        if due && remaining > config.proximity_threshold {
            debug!(vehicle = %vehicle, remaining, "approach notice due");
            return Some(notices::approaching(vehicle, config.eta_seconds(remaining)));
        }
    }

    if remaining == 0 && ride.phase == RidePhase::GoingToPickup {
        info!(vehicle = %vehicle, client = %ride.client_id(), "vehicle at pickup");
        ride.phase = RidePhase::AtPickup;
        return Some(notices::arrived_at_pickup(vehicle));
    }

    None
}

/// What finishing a ride removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    /// The ride that was in progress, if the server knew of one.
    pub ride: Option<ActiveRide>,
    /// Where to send the fare notice, if known.
    pub reply_to: Option<SocketAddr>,
}

/// Close out a ride on its completion report.
///
/// Always credits the vehicle with the reported distance and fare and
/// removes the ride from every index, whatever phase it was in.
pub fn finalize(
    report: &RideCompletionReport,
    vehicles: &mut VehicleRegistry,
    tasks: &mut TaskRegistry,
    config: &DispatchConfig,
) -> Finalized {
    let expected = fare_for(report.distance_covered, config.price_per_unit);
    if (expected - report.fare).abs() > f64::EPSILON {
        debug!(
            vehicle = %report.vehicle_id,
            reported = report.fare,
            expected,
            "reported fare differs from tariff"
        );
    }

    if !vehicles.record_ride(report.vehicle_id, report.distance_covered, report.fare) {
        warn!(vehicle = %report.vehicle_id, "completion from unregistered vehicle");
    }

    let assigned = tasks.ride(report.vehicle_id).map(ActiveRide::client_id);
    if let Some(assigned) = assigned
        && assigned != report.client_id
    {
        warn!(
            vehicle = %report.vehicle_id,
            reported = %report.client_id,
            %assigned,
            "completion names a different client than the assignment"
        );
    }

    // The address must be read before the ride's bookkeeping is dropped.
    let reply_to = tasks.reply_addr(assigned.unwrap_or(report.client_id));
    let ride = tasks.remove_by_vehicle(report.vehicle_id);
    if ride.is_none() {
        warn!(vehicle = %report.vehicle_id, client = %report.client_id, "completion without an active ride");
    }

    info!(
        vehicle = %report.vehicle_id,
        client = %report.client_id,
        distance = report.distance_covered,
        fare = report.fare,
        "ride completed"
    );
    Finalized { ride, reply_to }
}

#[cfg(test)]
mod tests {
    use fleet_model::{ClientId, Coordinate, RideRequest, TaskAssignment, VehicleId};
    use fleet_net::NoticeKind;

    use super::*;
    use crate::session::ConnectionId;

    fn ride() -> ActiveRide {
        ActiveRide::new(TaskAssignment {
            vehicle_id: VehicleId(1),
            request: RideRequest {
                client_id: ClientId(7),
                origin: Coordinate::new(0, 10),
                destination: Coordinate::new(10, 10),
            },
            estimated_distance: 10,
        })
    }

    fn report(y: i32, status: VehicleStatus) -> VehicleState {
        VehicleState {
            status,
            ..VehicleState::idle(VehicleId(1), Coordinate::new(0, y))
        }
    }

    #[test]
    fn test_every_fourth_en_route_report_sends_approach() {
        let config = DispatchConfig::default();
        let mut ride = ride();
        let mut notices = Vec::new();
        for y in 1..=8 {
            if let Some(n) = on_report(&mut ride, &report(y, VehicleStatus::EnRouteToPickup), &config) {
                notices.push((y, n));
            }
        }
        assert_eq!(notices.len(), 1);
        let (y, notice) = &notices[0];
        assert_eq!(*y, 4);
        assert_eq!(notice.kind, NoticeKind::Approaching);
        assert_eq!(ride.en_route_reports, 8);
    }

    #[test]
    fn test_no_approach_within_proximity_threshold() {
        let config = DispatchConfig::default();
        let mut ride = ride();
        ride.en_route_reports = 3;
        // Remaining distance 2 is not above the threshold.
        let notice = on_report(&mut ride, &report(8, VehicleStatus::EnRouteToPickup), &config);
        assert!(notice.is_none());
    }

    #[test]
    fn test_arrival_notice_sent_at_most_once() {
        let config = DispatchConfig::default();
        let mut ride = ride();
        let mut arrivals = 0;
        for y in [7, 8, 9, 10, 10, 10, 10, 10] {
            if let Some(n) = on_report(&mut ride, &report(y, VehicleStatus::EnRouteToPickup), &config)
                && n.kind == NoticeKind::ArrivedAtPickup
            {
                arrivals += 1;
            }
        }
        assert_eq!(arrivals, 1);
        assert_eq!(ride.phase, RidePhase::AtPickup);
    }

    #[test]
    fn test_transporting_report_moves_phase() {
        let config = DispatchConfig::default();
        let mut ride = ride();
        assert!(on_report(&mut ride, &report(10, VehicleStatus::Transporting), &config).is_none());
        assert_eq!(ride.phase, RidePhase::Transporting);
        // Nothing is announced once the rider is on board.
        assert!(on_report(&mut ride, &report(10, VehicleStatus::EnRouteToPickup), &config).is_none());
    }

    #[test]
    fn test_finalize_credits_vehicle_and_clears_ride() {
        let config = DispatchConfig::default();
        let mut vehicles = VehicleRegistry::new();
        vehicles.upsert(
            ConnectionId(1),
            VehicleState::idle(VehicleId(1), Coordinate::ORIGIN),
        );
        let mut tasks = TaskRegistry::new();
        let reply: SocketAddr = ([127, 0, 0, 1], 4000).into();
        tasks.insert(ride().assignment, reply);

        let done = finalize(
            &RideCompletionReport {
                vehicle_id: VehicleId(1),
                client_id: ClientId(7),
                distance_covered: 7.0,
                fare: 560.0,
            },
            &mut vehicles,
            &mut tasks,
            &config,
        );

        assert_eq!(done.reply_to, Some(reply));
        assert!(done.ride.is_some());
        assert!(tasks.knows_nothing_of(ClientId(7)));
        let stats = vehicles.get(VehicleId(1)).unwrap().state.stats;
        assert_eq!(stats.rides_completed, 1);
        assert!((stats.distance_traveled - 7.0).abs() < f64::EPSILON);
        assert!((stats.earnings - 560.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_finalize_without_ride_still_credits() {
        let config = DispatchConfig::default();
        let mut vehicles = VehicleRegistry::new();
        vehicles.upsert(
            ConnectionId(1),
            VehicleState::idle(VehicleId(1), Coordinate::ORIGIN),
        );
        let mut tasks = TaskRegistry::new();

        let done = finalize(
            &RideCompletionReport {
                vehicle_id: VehicleId(1),
                client_id: ClientId(7),
                distance_covered: 2.0,
                fare: 160.0,
            },
            &mut vehicles,
            &mut tasks,
            &config,
        );
        assert_eq!(done, Finalized { ride: None, reply_to: None });
        assert_eq!(
            vehicles.get(VehicleId(1)).unwrap().state.stats.rides_completed,
            1
        );
    }
}
