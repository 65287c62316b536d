//! Task registry: the rides currently in progress.
//!
//! Each active ride is stored once, under its vehicle. The client index and
//! the reply-address table point back at it, and all three are only ever
//! changed together, so no lookup can outlive the ride it describes.

use std::collections::HashMap;
use std::net::SocketAddr;

use fleet_model::{ClientId, TaskAssignment, VehicleId};

/// Where a ride stands, as far as the server has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RidePhase {
    /// Vehicle is on its way to the rider.
    GoingToPickup,
    /// The rider has been told the vehicle is outside.
    AtPickup,
    /// The rider is on board.
    Transporting,
}

/// One ride in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRide {
    pub assignment: TaskAssignment,
    pub phase: RidePhase,
    /// En-route reports seen so far; drives approach-notice throttling.
    pub en_route_reports: u32,
}

impl ActiveRide {
    #[must_use]
    pub fn new(assignment: TaskAssignment) -> Self {
        Self {
            assignment,
            phase: RidePhase::GoingToPickup,
            en_route_reports: 0,
        }
    }

    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.assignment.client_id()
    }
}

/// Registry of active rides and how to reach their riders.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    by_vehicle: HashMap<VehicleId, ActiveRide>,
    by_client: HashMap<ClientId, VehicleId>,
    reply_to: HashMap<ClientId, SocketAddr>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the client already has a ride in progress.
    #[must_use]
    pub fn has_active(&self, client: ClientId) -> bool {
        self.by_client.contains_key(&client)
    }

    /// Returns `true` if the vehicle is carrying out a ride.
    #[must_use]
    pub fn is_assigned(&self, vehicle: VehicleId) -> bool {
        self.by_vehicle.contains_key(&vehicle)
    }

    /// Record a confirmed assignment and where to notify its rider.
    pub fn insert(&mut self, assignment: TaskAssignment, reply_to: SocketAddr) {
        let client = assignment.client_id();
        self.by_client.insert(client, assignment.vehicle_id);
        self.reply_to.insert(client, reply_to);
        self.by_vehicle
            .insert(assignment.vehicle_id, ActiveRide::new(assignment));
    }

    #[must_use]
    pub fn ride(&self, vehicle: VehicleId) -> Option<&ActiveRide> {
        self.by_vehicle.get(&vehicle)
    }

    pub fn ride_mut(&mut self, vehicle: VehicleId) -> Option<&mut ActiveRide> {
        self.by_vehicle.get_mut(&vehicle)
    }

    /// The vehicle serving `client`, if any.
    #[must_use]
    pub fn vehicle_for(&self, client: ClientId) -> Option<VehicleId> {
        self.by_client.get(&client).copied()
    }

    #[must_use]
    pub fn reply_addr(&self, client: ClientId) -> Option<SocketAddr> {
        self.reply_to.get(&client).copied()
    }

    /// Remove the vehicle's ride along with its client bookkeeping.
    pub fn remove_by_vehicle(&mut self, vehicle: VehicleId) -> Option<ActiveRide> {
        let ride = self.by_vehicle.remove(&vehicle)?;
        let client = ride.client_id();
        if self.by_client.get(&client) == Some(&vehicle) {
            self.by_client.remove(&client);
            self.reply_to.remove(&client);
        }
        Some(ride)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveRide> {
        self.by_vehicle.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_vehicle.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_vehicle.is_empty()
    }

    /// Returns `true` if nothing at all is recorded for `client`.
    #[must_use]
    pub fn knows_nothing_of(&self, client: ClientId) -> bool {
        !self.by_client.contains_key(&client)
            && !self.reply_to.contains_key(&client)
            && self.by_vehicle.values().all(|r| r.client_id() != client)
    }
}
