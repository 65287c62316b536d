//! # fleet_model
//!
//! Plain data shared by every process in the fleet: the dispatch server, the
//! simulated vehicles and the riders.
//!
//! This crate provides:
//!
//! - [`Coordinate`] and [`grid_distance`]: the grid and its movement metric.
//! - [`VehicleId`], [`VehicleStatus`], [`VehicleState`]: what a vehicle reports.
//! - [`ClientId`], [`RideRequest`], [`TaskAssignment`],
//!   [`RideCompletionReport`]: the ride lifecycle payloads.

pub mod coord;
pub mod ride;
pub mod vehicle;

pub use coord::{Coordinate, grid_distance};
pub use ride::{ClientId, RideCompletionReport, RideRequest, TaskAssignment, fare_for};
pub use vehicle::{VehicleId, VehicleStats, VehicleState, VehicleStatus};
