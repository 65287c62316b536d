//! Dispatch-layer error types.

use std::net::SocketAddr;

use fleet_net::NetError;

use crate::session::ConnectionId;

/// Errors raised by the dispatch server.
///
/// Only [`DispatchError::Bind`] and [`DispatchError::InvalidConfig`] are
/// fatal; everything else is logged and confined to the connection it
/// happened on.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A listening channel could not be opened at startup.
    #[error("failed to bind {channel} channel on {addr}: {source}")]
    Bind {
        channel: &'static str,
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A configuration value is out of range.
    #[error("invalid {field}: {value}")]
    InvalidConfig { field: &'static str, value: String },

    /// No live session exists for the connection.
    #[error("no live session for {0}")]
    UnknownConnection(ConnectionId),

    /// The session's outbound queue is full.
    #[error("outbound queue for {0} is full")]
    QueueFull(ConnectionId),

    /// The session's writer has already shut down.
    #[error("session {0} is closed")]
    SessionClosed(ConnectionId),

    /// Encoding or socket failure.
    #[error(transparent)]
    Net(#[from] NetError),
}

impl From<std::io::Error> for DispatchError {
    fn from(e: std::io::Error) -> Self {
        Self::Net(NetError::Io(e))
    }
}
