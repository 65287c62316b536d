//! # fleet_net
//!
//! Transport layer for the fleet dispatch system.
//!
//! This crate provides:
//!
//! - [`endpoints`]: default ports and host resolution.
//! - [`messages`]: the versioned [`Envelope`] and its [`Message`] variants.
//! - [`codec`]: MessagePack serialisation with version checking.
//! - [`frame`]: length-prefixed framing for the vehicle stream.
//! - [`link`]: client-side links used by vehicles and riders.
//! - [`error`]: Network-layer error types.

pub mod codec;
pub mod endpoints;
pub mod error;
pub mod frame;
pub mod link;
pub mod messages;

pub use codec::{decode, encode};
pub use error::NetError;
pub use link::{RiderLink, VehicleLink};
pub use messages::{Envelope, Message, NoticeKind, Notification, PROTOCOL_VERSION};
