//! # dispatch_server
//!
//! The dispatch server is the single source of truth for the fleet. It owns
//! the vehicle and task registries, matches each ride request to the nearest
//! idle vehicle, and follows every ride through to completion.
//!
//! ## Layout
//!
//! - [`vehicles`]: last known state of every connected vehicle.
//! - [`tasks`]: active rides, keyed by vehicle and by client.
//! - [`matching`]: admission guard and nearest-idle assignment.
//! - [`lifecycle`]: turns vehicle reports into rider notifications.
//! - [`dispatcher`]: event handlers tying the above together.
//! - [`server`]: the socket loop feeding events to the dispatcher.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod matching;
pub mod notices;
pub mod outbox;
pub mod server;
pub mod session;
pub mod tasks;
pub mod vehicles;

pub use config::DispatchConfig;
pub use dispatcher::{Dispatcher, FleetSummary};
pub use error::DispatchError;
pub use matching::AssignmentResult;
pub use outbox::Outbox;
pub use server::Server;
pub use session::ConnectionId;
