//! Ride requests, assignments and completion reports.

use serde::{Deserialize, Serialize};

use crate::coord::{Coordinate, grid_distance};
use crate::vehicle::VehicleId;

/// A rider identifier, chosen by the rider process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rider asks to be carried from `origin` to `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideRequest {
    pub client_id: ClientId,
    pub origin: Coordinate,
    pub destination: Coordinate,
}

impl RideRequest {
    /// Length of the carried leg in grid steps.
    #[must_use]
    pub fn trip_distance(&self) -> u32 {
        grid_distance(self.origin, self.destination)
    }
}

/// Binding of one ride request to one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub vehicle_id: VehicleId,
    pub request: RideRequest,
    /// Vehicle-to-pickup distance at the moment of matching.
    pub estimated_distance: u32,
}

impl TaskAssignment {
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.request.client_id
    }
}

/// Sent once by a vehicle when it drops its rider off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RideCompletionReport {
    pub vehicle_id: VehicleId,
    pub client_id: ClientId,
    pub distance_covered: f64,
    pub fare: f64,
}

/// Fare for a carried distance at the given unit price.
#[must_use]
pub fn fare_for(distance: f64, price_per_unit: f64) -> f64 {
    distance * price_per_unit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RideRequest {
        RideRequest {
            client_id: ClientId(7),
            origin: Coordinate::new(0, 3),
            destination: Coordinate::new(0, 10),
        }
    }

    #[test]
    fn test_trip_distance() {
        assert_eq!(request().trip_distance(), 7);
    }

    #[test]
    fn test_fare_is_linear_in_distance() {
        assert!((fare_for(7.0, 80.0) - 560.0).abs() < f64::EPSILON);
        assert_eq!(fare_for(0.0, 80.0), 0.0);
    }

    #[test]
    fn test_assignment_exposes_client() {
        let task = TaskAssignment {
            vehicle_id: VehicleId(1),
            request: request(),
            estimated_distance: 3,
        };
        assert_eq!(task.client_id(), ClientId(7));
    }
}
