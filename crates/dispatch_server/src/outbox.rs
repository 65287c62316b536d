//! The dispatcher's view of the transports.
//!
//! Handlers never hold sockets. They push messages through an [`Outbox`],
//! which the server backs with session queues and the rider socket.

use std::net::SocketAddr;

use fleet_net::{Message, Notification};

use crate::error::DispatchError;
use crate::session::ConnectionId;

/// Non-blocking delivery to vehicles and riders.
pub trait Outbox {
    /// Queue a message on a vehicle session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown, closed or backed up. The
    /// message has not been delivered in that case.
    fn send_to_vehicle(
        &mut self,
        connection: ConnectionId,
        message: Message,
    ) -> Result<(), DispatchError>;

    /// Send a notification datagram to a rider.
    ///
    /// # Errors
    ///
    /// Returns an error if the datagram could not be handed to the socket.
    fn send_to_client(
        &mut self,
        addr: SocketAddr,
        notice: Notification,
    ) -> Result<(), DispatchError>;

    /// Tear down a vehicle session. Unknown connections are ignored.
    fn close_vehicle(&mut self, connection: ConnectionId);
}

#[cfg(test)]
pub(crate) mod recording {
    use std::collections::HashSet;

    use super::*;

    /// Records everything sent; vehicle sends to connections in `broken`
    /// fail.
    #[derive(Debug, Default)]
    pub struct RecordingOutbox {
        pub to_vehicles: Vec<(ConnectionId, Message)>,
        pub to_clients: Vec<(SocketAddr, Notification)>,
        pub closed: Vec<ConnectionId>,
        pub broken: HashSet<ConnectionId>,
    }

    impl RecordingOutbox {
        pub fn texts_for(&self, addr: SocketAddr) -> Vec<&str> {
            self.to_clients
                .iter()
                .filter(|(to, _)| *to == addr)
                .map(|(_, n)| n.text.as_str())
                .collect()
        }

        pub fn clear(&mut self) {
            self.to_vehicles.clear();
            self.to_clients.clear();
            self.closed.clear();
        }
    }

    impl Outbox for RecordingOutbox {
        fn send_to_vehicle(
            &mut self,
            connection: ConnectionId,
            message: Message,
        ) -> Result<(), DispatchError> {
            if self.broken.contains(&connection) {
                return Err(DispatchError::SessionClosed(connection));
            }
            self.to_vehicles.push((connection, message));
            Ok(())
        }

        fn send_to_client(
            &mut self,
            addr: SocketAddr,
            notice: Notification,
        ) -> Result<(), DispatchError> {
            self.to_clients.push((addr, notice));
            Ok(())
        }

        fn close_vehicle(&mut self, connection: ConnectionId) {
            self.closed.push(connection);
        }
    }
}
