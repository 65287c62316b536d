//! Matching engine: admission guard and nearest-idle assignment.
//!
//! [`assign`] is the whole "check → look up → push → record" sequence for
//! one request. It runs on the dispatcher loop, so no other request can
//! observe the registries halfway through it.

use std::net::SocketAddr;

use fleet_model::{RideRequest, TaskAssignment, VehicleId, VehicleStatus, grid_distance};
use fleet_net::Message;
use tracing::{info, warn};

use crate::config::DispatchConfig;
use crate::outbox::Outbox;
use crate::tasks::TaskRegistry;
use crate::vehicles::VehicleRegistry;

/// Outcome of one assignment attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignmentResult {
    /// The vehicle has been sent the task and the ride is registered.
    Assigned {
        vehicle_id: VehicleId,
        distance: u32,
        eta_seconds: f64,
    },
    /// The client already has a ride in progress.
    AlreadyActive,
    /// No idle vehicle is connected.
    NoVehicleAvailable,
    /// The chosen vehicle could not be reached; nothing was registered.
    DeliveryFailed { vehicle_id: VehicleId },
}

/// Try to match `request` to the nearest idle vehicle.
///
/// On success exactly one assignment has been queued for the vehicle, the
/// ride is recorded under both the vehicle and the client, and `reply_to`
/// is remembered for later notices. On any other outcome the registries are
/// left as they were.
pub fn assign(
    request: RideRequest,
    reply_to: SocketAddr,
    vehicles: &mut VehicleRegistry,
    tasks: &mut TaskRegistry,
    config: &DispatchConfig,
    outbox: &mut impl Outbox,
) -> AssignmentResult {
    if tasks.has_active(request.client_id) {
        info!(client = %request.client_id, "request denied, ride already active");
        return AssignmentResult::AlreadyActive;
    }

    let Some(candidate) = vehicles.find_nearest_idle(request.origin, |id| tasks.is_assigned(id))
    else {
        info!(client = %request.client_id, origin = %request.origin, "no idle vehicle");
        return AssignmentResult::NoVehicleAvailable;
    };
    let vehicle_id = candidate.state.id;
    let connection = candidate.connection;
    let distance = grid_distance(candidate.state.position, request.origin);

    let assignment = TaskAssignment {
        vehicle_id,
        request,
        estimated_distance: distance,
    };
    if let Err(e) = outbox.send_to_vehicle(connection, Message::TaskAssignment(assignment)) {
        warn!(vehicle = %vehicle_id, %connection, %e, "could not deliver assignment");
        return AssignmentResult::DeliveryFailed { vehicle_id };
    }

    tasks.insert(assignment, reply_to);
    vehicles.set_status(vehicle_id, VehicleStatus::EnRouteToPickup);

    let eta_seconds = config.eta_seconds(distance);
    info!(
        vehicle = %vehicle_id,
        client = %request.client_id,
        distance,
        eta_seconds,
        "ride assigned"
    );
    AssignmentResult::Assigned {
        vehicle_id,
        distance,
        eta_seconds,
    }
}

#[cfg(test)]
mod tests {
    use fleet_model::{ClientId, Coordinate, VehicleState};

    use super::*;
    use crate::outbox::recording::RecordingOutbox;
    use crate::session::ConnectionId;

    fn request(client: u32, x: i32, y: i32) -> RideRequest {
        RideRequest {
            client_id: ClientId(client),
            origin: Coordinate::new(x, y),
            destination: Coordinate::new(0, 10),
        }
    }

    fn reply() -> SocketAddr {
        ([127, 0, 0, 1], 40_000).into()
    }

    fn fleet(positions: &[(u32, i32, i32)]) -> VehicleRegistry {
        let mut vehicles = VehicleRegistry::new();
        for &(id, x, y) in positions {
            vehicles.upsert(
                ConnectionId(u64::from(id)),
                VehicleState::idle(VehicleId(id), Coordinate::new(x, y)),
            );
        }
        vehicles
    }

    #[test]
    fn test_assigns_nearest_and_pushes_once() {
        let mut vehicles = fleet(&[(1, 0, 0), (2, 15, 15)]);
        let mut tasks = TaskRegistry::new();
        let mut outbox = RecordingOutbox::default();
        let config = DispatchConfig::default();

        let result = assign(
            request(7, 0, 3),
            reply(),
            &mut vehicles,
            &mut tasks,
            &config,
            &mut outbox,
        );

        let AssignmentResult::Assigned {
            vehicle_id,
            distance,
            eta_seconds,
        } = result
        else {
            panic!("expected an assignment, got {result:?}");
        };
        assert_eq!(vehicle_id, VehicleId(1));
        assert_eq!(distance, 3);
        assert!((eta_seconds - 3.75).abs() < 1e-9);

        assert_eq!(outbox.to_vehicles.len(), 1);
        let (connection, message) = &outbox.to_vehicles[0];
        assert_eq!(*connection, ConnectionId(1));
        assert!(matches!(
            message,
            Message::TaskAssignment(TaskAssignment { estimated_distance: 3, .. })
        ));
        assert_eq!(tasks.vehicle_for(ClientId(7)), Some(VehicleId(1)));
        assert_eq!(tasks.reply_addr(ClientId(7)), Some(reply()));
        assert_eq!(
            vehicles.get(VehicleId(1)).unwrap().state.status,
            VehicleStatus::EnRouteToPickup
        );
    }

    #[test]
    fn test_second_request_from_same_client_is_denied() {
        let mut vehicles = fleet(&[(1, 0, 0), (2, 1, 1)]);
        let mut tasks = TaskRegistry::new();
        let mut outbox = RecordingOutbox::default();
        let config = DispatchConfig::default();

        assign(request(7, 0, 3), reply(), &mut vehicles, &mut tasks, &config, &mut outbox);
        outbox.clear();

        let result = assign(request(7, 5, 5), reply(), &mut vehicles, &mut tasks, &config, &mut outbox);
        assert_eq!(result, AssignmentResult::AlreadyActive);
        assert!(outbox.to_vehicles.is_empty());
        assert_eq!(tasks.len(), 1);
        assert!(!tasks.is_assigned(VehicleId(2)));
    }

    #[test]
    fn test_no_vehicle_available() {
        let mut vehicles = VehicleRegistry::new();
        let mut tasks = TaskRegistry::new();
        let mut outbox = RecordingOutbox::default();

        let result = assign(
            request(3, 1, 1),
            reply(),
            &mut vehicles,
            &mut tasks,
            &DispatchConfig::default(),
            &mut outbox,
        );
        assert_eq!(result, AssignmentResult::NoVehicleAvailable);
        assert!(tasks.is_empty());
        assert!(outbox.to_vehicles.is_empty());
    }

    #[test]
    fn test_back_to_back_requests_never_share_a_vehicle() {
        let mut vehicles = fleet(&[(1, 0, 0)]);
        let mut tasks = TaskRegistry::new();
        let mut outbox = RecordingOutbox::default();
        let config = DispatchConfig::default();

        let first = assign(request(7, 0, 1), reply(), &mut vehicles, &mut tasks, &config, &mut outbox);
        assert!(matches!(first, AssignmentResult::Assigned { .. }));

        // A stale idle report from the vehicle must not make it matchable.
        vehicles.upsert(
            ConnectionId(1),
            VehicleState::idle(VehicleId(1), Coordinate::new(0, 0)),
        );
        let second = assign(request(8, 0, 1), reply(), &mut vehicles, &mut tasks, &config, &mut outbox);
        assert_eq!(second, AssignmentResult::NoVehicleAvailable);
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_delivery_failure_leaves_no_task() {
        let mut vehicles = fleet(&[(1, 0, 0)]);
        let mut tasks = TaskRegistry::new();
        let mut outbox = RecordingOutbox::default();
        outbox.broken.insert(ConnectionId(1));

        let result = assign(
            request(7, 0, 3),
            reply(),
            &mut vehicles,
            &mut tasks,
            &DispatchConfig::default(),
            &mut outbox,
        );
        assert_eq!(
            result,
            AssignmentResult::DeliveryFailed {
                vehicle_id: VehicleId(1)
            }
        );
        assert!(tasks.is_empty());
        assert!(tasks.knows_nothing_of(ClientId(7)));
        assert!(vehicles.get(VehicleId(1)).unwrap().state.is_idle());
    }
}
