//! Vehicle sessions: one accepted TCP stream each.
//!
//! Every session runs two small tasks. The reader turns frames into
//! [`SessionEvent`]s for the dispatcher loop; the writer drains a bounded
//! outbound queue onto the socket. The dispatcher never touches the socket
//! directly, so pushing a message never waits.

use std::net::SocketAddr;

use fleet_net::{Message, NetError, codec, frame};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DispatchError;

/// Identifies one accepted vehicle connection for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Hands out monotonically increasing connection ids. Ids are never reused
/// within one server run.
#[derive(Debug)]
pub struct ConnectionIdAllocator {
    next_id: u64,
}

impl ConnectionIdAllocator {
    /// Creates a new allocator. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    pub fn allocate(&mut self) -> ConnectionId {
        let id = self.next_id;
        self.next_id += 1;
        ConnectionId(id)
    }
}

impl Default for ConnectionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that happened on a vehicle session.
#[derive(Debug)]
pub enum SessionEvent {
    /// One complete frame arrived. Decoding is left to the dispatcher.
    Frame {
        connection: ConnectionId,
        payload: Vec<u8>,
    },
    /// The vehicle closed the stream.
    Closed { connection: ConnectionId },
    /// Reading or writing failed; the session is unusable.
    Failed {
        connection: ConnectionId,
        error: NetError,
    },
}

impl SessionEvent {
    /// The session the event came from.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        match self {
            Self::Frame { connection, .. }
            | Self::Closed { connection }
            | Self::Failed { connection, .. } => *connection,
        }
    }
}

/// The dispatcher's handle on a live session.
#[derive(Debug)]
pub struct SessionHandle {
    connection: ConnectionId,
    peer: SocketAddr,
    outbound: mpsc::Sender<Message>,
    reader: JoinHandle<()>,
}

impl SessionHandle {
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queue a message for the vehicle without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::QueueFull`] if the vehicle is not draining
    /// its queue, or [`DispatchError::SessionClosed`] if the writer is gone.
    pub fn try_push(&self, message: Message) -> Result<(), DispatchError> {
        self.outbound.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull(self.connection),
            TrySendError::Closed(_) => DispatchError::SessionClosed(self.connection),
        })
    }

    /// Stop reading and let the writer finish whatever is queued, after
    /// which the socket closes.
    pub fn close(self) {
        self.reader.abort();
        debug!(connection = %self.connection, peer = %self.peer, "session closed");
    }
}

/// Split `stream` into reader and writer tasks and return the handle.
pub fn spawn_session(
    connection: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    events: mpsc::Sender<SessionEvent>,
    queue: usize,
) -> SessionHandle {
    let (mut read_half, mut write_half) = stream.into_split();
    let (outbound, mut outbound_rx) = mpsc::channel::<Message>(queue.max(1));

    let reader_events = events.clone();
    let reader = tokio::spawn(async move {
        loop {
            let event = match frame::read_frame(&mut read_half).await {
                Ok(Some(payload)) => SessionEvent::Frame {
                    connection,
                    payload,
                },
                Ok(None) => SessionEvent::Closed { connection },
                Err(error) => SessionEvent::Failed { connection, error },
            };
            let last = !matches!(event, SessionEvent::Frame { .. });
            if reader_events.send(event).await.is_err() || last {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let result = match codec::encode(&message) {
                Ok(payload) => frame::write_frame(&mut write_half, &payload).await,
                Err(e) => Err(e),
            };
            if let Err(error) = result {
                warn!(%connection, %error, kind = message.kind(), "write to vehicle failed");
                let _ = events.send(SessionEvent::Failed { connection, error }).await;
                break;
            }
        }
    });

    SessionHandle {
        connection,
        peer,
        outbound,
        reader,
    }
}

#[cfg(test)]
mod tests {
    use fleet_model::{Coordinate, VehicleId, VehicleState};
    use fleet_net::VehicleLink;
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn test_allocator_produces_unique_ids() {
        let mut ids = ConnectionIdAllocator::new();
        assert_eq!(ids.allocate(), ConnectionId(1));
        assert_eq!(ids.allocate(), ConnectionId(2));
        assert_eq!(ids.allocate(), ConnectionId(3));
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId(12).to_string(), "conn-12");
    }

    #[tokio::test]
    async fn test_session_forwards_frames_and_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (events_tx, mut events_rx) = mpsc::channel(8);

        let mut link = VehicleLink::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        let handle = spawn_session(ConnectionId(1), stream, peer, events_tx, 4);
        assert_eq!(handle.peer(), peer);

        let report = Message::VehicleReport(VehicleState::idle(VehicleId(5), Coordinate::new(1, 2)));
        link.send(&report).await.unwrap();
        match events_rx.recv().await.unwrap() {
            SessionEvent::Frame { connection, payload } => {
                assert_eq!(connection, ConnectionId(1));
                assert_eq!(codec::decode(&payload).unwrap(), report);
            }
            other => panic!("expected a frame, got {other:?}"),
        }

        handle.try_push(Message::Diagnostic("hi".to_string())).unwrap();
        assert_eq!(link.recv().await, Some(Message::Diagnostic("hi".to_string())));

        drop(link);
        let event = events_rx.recv().await.unwrap();
        assert_eq!(event.connection(), ConnectionId(1));
        assert!(matches!(
            event,
            SessionEvent::Closed { .. } | SessionEvent::Failed { .. }
        ));
        handle.close();
    }
}
