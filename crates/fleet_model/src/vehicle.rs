//! Vehicle identity and reported state.
//!
//! A [`VehicleState`] is what a vehicle sends about itself after every step.
//! Vehicle ids are chosen by the vehicle process and trusted as-is.

use serde::{Deserialize, Serialize};

use crate::coord::Coordinate;

/// A vehicle identifier, assigned by the vehicle itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u32);

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a vehicle is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VehicleStatus {
    /// Free and eligible for matching.
    #[default]
    Idle,
    /// Driving to a rider's pickup point.
    EnRouteToPickup,
    /// Carrying a rider to the destination.
    Transporting,
}

/// Cumulative totals for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleStats {
    /// Total grid units driven.
    pub distance_traveled: f64,
    /// Total fares collected.
    pub earnings: f64,
    pub rides_completed: u32,
}

impl VehicleStats {
    /// Add one finished ride to the totals.
    pub fn record_ride(&mut self, distance: f64, fare: f64) {
        self.distance_traveled += distance;
        self.earnings += fare;
        self.rides_completed += 1;
    }
}

/// A vehicle's self-reported state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub id: VehicleId,
    pub position: Coordinate,
    pub status: VehicleStatus,
    pub stats: VehicleStats,
}

impl VehicleState {
    /// A fresh idle vehicle with zeroed totals.
    #[must_use]
    pub fn idle(id: VehicleId, position: Coordinate) -> Self {
        Self {
            id,
            position,
            status: VehicleStatus::Idle,
            stats: VehicleStats::default(),
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.status == VehicleStatus::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_vehicle_has_zero_stats() {
        let v = VehicleState::idle(VehicleId(4), Coordinate::new(2, 3));
        assert!(v.is_idle());
        assert_eq!(v.stats, VehicleStats::default());
        assert_eq!(v.stats.rides_completed, 0);
    }

    #[test]
    fn test_record_ride_accumulates() {
        let mut stats = VehicleStats::default();
        stats.record_ride(7.0, 560.0);
        stats.record_ride(3.0, 240.0);
        assert_eq!(stats.rides_completed, 2);
        assert!((stats.distance_traveled - 10.0).abs() < f64::EPSILON);
        assert!((stats.earnings - 800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_vehicle_ids_order_numerically() {
        assert!(VehicleId(2) < VehicleId(10));
        assert_eq!(VehicleId(10).to_string(), "10");
    }

    #[test]
    fn test_state_serialization_roundtrip() {
        let mut v = VehicleState::idle(VehicleId(9), Coordinate::new(1, 1));
        v.status = VehicleStatus::Transporting;
        let bytes = rmp_serde::to_vec(&v).unwrap();
        let restored: VehicleState = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(v, restored);
    }
}
