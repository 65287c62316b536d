//! # fleet_agents
//!
//! The processes at the edges of the dispatch system.
//!
//! - [`sim`]: the vehicle's movement model.
//! - [`vehicle`]: runs a [`sim::VehicleSim`] against the server.
//! - [`rider`]: sends one ride request and follows its notifications.

pub mod rider;
pub mod sim;
pub mod vehicle;

pub use rider::request_ride;
pub use sim::VehicleSim;
pub use vehicle::{VehicleConfig, VehicleRunner};
