//! Connection multiplexer.
//!
//! One task runs [`Server::run`] and owns the [`Dispatcher`]. Everything that
//! changes dispatch state happens on that task, one event at a time:
//!
//! 1. A vehicle connects: allocate a [`ConnectionId`] and spawn its session.
//! 2. A datagram arrives on the rider socket: hand it to the dispatcher.
//! 3. A session reports a frame, a close or a failure: hand it over too.
//! 4. The status interval fires: log the fleet summary.
//!
//! Session I/O runs on its own tasks and only talks to the loop through the
//! event channel, so a slow or broken vehicle never stalls the loop.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;

use fleet_net::frame::MAX_DATAGRAM_LEN;
use fleet_net::{Message, Notification, codec};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::outbox::Outbox;
use crate::session::{ConnectionId, ConnectionIdAllocator, SessionEvent, SessionHandle, spawn_session};

/// Session events buffered ahead of the loop.
const EVENT_QUEUE: usize = 256;

/// A bound dispatch server, ready to run.
#[derive(Debug)]
pub struct Server {
    config: DispatchConfig,
    listener: TcpListener,
    socket: UdpSocket,
    vehicle_addr: SocketAddr,
    client_addr: SocketAddr,
}

impl Server {
    /// Bind the vehicle listener and the rider socket.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidConfig`] for an unusable
    /// configuration, or [`DispatchError::Bind`] if either channel cannot be
    /// opened.
    pub async fn bind(config: DispatchConfig) -> Result<Self, DispatchError> {
        config.validate()?;
        let requested = config.vehicle_addr();
        let listener = TcpListener::bind(requested)
            .await
            .map_err(|source| bind_error("vehicle", requested, source))?;
        let vehicle_addr = listener
            .local_addr()
            .map_err(|source| bind_error("vehicle", requested, source))?;

        let requested = config.client_addr();
        let socket = UdpSocket::bind(requested)
            .await
            .map_err(|source| bind_error("client", requested, source))?;
        let client_addr = socket
            .local_addr()
            .map_err(|source| bind_error("client", requested, source))?;

        info!(%vehicle_addr, %client_addr, grid = config.grid_size, "dispatch server bound");
        Ok(Self {
            config,
            listener,
            socket,
            vehicle_addr,
            client_addr,
        })
    }

    /// Address vehicles connect to.
    #[must_use]
    pub fn vehicle_addr(&self) -> SocketAddr {
        self.vehicle_addr
    }

    /// Address riders send requests to.
    #[must_use]
    pub fn client_addr(&self) -> SocketAddr {
        self.client_addr
    }

    /// Serve until `shutdown` completes. Open sessions are closed on the
    /// way out.
    ///
    /// Nothing inside the loop is fatal: failed accepts, reads and writes
    /// are logged and confined to the connection they happened on.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let Self {
            config,
            listener,
            socket,
            ..
        } = self;

        let session_queue = config.session_queue;
        let mut status = time::interval_at(
            Instant::now() + config.status_interval,
            config.status_interval,
        );
        status.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut dispatcher = Dispatcher::new(config);
        let mut sessions: HashMap<ConnectionId, SessionHandle> = HashMap::new();
        let mut ids = ConnectionIdAllocator::new();
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_QUEUE);
        let mut buffer = vec![0u8; MAX_DATAGRAM_LEN];

        tokio::pin!(shutdown);
        info!("dispatch loop started");

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(%peer, %e, "could not disable nagle");
                        }
                        let connection = ids.allocate();
                        let handle = spawn_session(
                            connection,
                            stream,
                            peer,
                            events_tx.clone(),
                            session_queue,
                        );
                        sessions.insert(connection, handle);
                        info!(%connection, %peer, "vehicle connected");
                        log_summary(&dispatcher, sessions.len());
                    }
                    Err(e) => warn!(%e, "accept failed"),
                },

                received = socket.recv_from(&mut buffer) => match received {
                    Ok((len, from)) => {
                        let mut transport = Transport {
                            sessions: &mut sessions,
                            socket: &socket,
                        };
                        dispatcher.handle_client_datagram(from, &buffer[..len], &mut transport);
                    }
                    // ICMP port-unreachable from a departed rider surfaces here on some
                    // platforms.
                    Err(e) => debug!(%e, "rider socket receive failed"),
                },

                Some(event) = events_rx.recv() => {
                    let connection = event.connection();
                    let peer = sessions.get(&connection).map(SessionHandle::peer);
                    let mut transport = Transport {
                        sessions: &mut sessions,
                        socket: &socket,
                    };
                    match event {
                        SessionEvent::Frame { payload, .. } => {
                            if peer.is_some() {
                                dispatcher.handle_vehicle_frame(connection, &payload, &mut transport);
                            } else {
                                debug!(%connection, "frame from closed session dropped");
                            }
                        }
                        SessionEvent::Closed { .. } => {
                            debug!(%connection, ?peer, "vehicle stream ended");
                            dispatcher.handle_disconnect(connection, &mut transport);
                            log_summary(&dispatcher, sessions.len());
                        }
                        SessionEvent::Failed { error, .. } => {
                            warn!(%connection, ?peer, %error, "vehicle session failed");
                            dispatcher.handle_disconnect(connection, &mut transport);
                            log_summary(&dispatcher, sessions.len());
                        }
                    }
                }

                _ = status.tick() => log_summary(&dispatcher, sessions.len()),
            }
        }

        for (_, session) in sessions.drain() {
            session.close();
        }
        info!("dispatch loop stopped");
    }
}

fn bind_error(channel: &'static str, addr: SocketAddr, source: std::io::Error) -> DispatchError {
    DispatchError::Bind {
        channel,
        addr,
        source,
    }
}

fn log_summary(dispatcher: &Dispatcher, sessions: usize) {
    let summary = dispatcher.summary();
    info!(
        sessions,
        vehicles = summary.vehicles,
        idle = summary.idle,
        active_rides = summary.active_rides,
        "fleet status"
    );
}

/// The live transports behind the dispatcher's [`Outbox`] for one event.
struct Transport<'a> {
    sessions: &'a mut HashMap<ConnectionId, SessionHandle>,
    socket: &'a UdpSocket,
}

impl Outbox for Transport<'_> {
    fn send_to_vehicle(
        &mut self,
        connection: ConnectionId,
        message: Message,
    ) -> Result<(), DispatchError> {
        self.sessions
            .get(&connection)
            .ok_or(DispatchError::UnknownConnection(connection))?
            .try_push(message)
    }

    fn send_to_client(
        &mut self,
        addr: SocketAddr,
        notice: Notification,
    ) -> Result<(), DispatchError> {
        let payload = codec::encode(&Message::Notification(notice))?;
        self.socket.try_send_to(&payload, addr)?;
        Ok(())
    }

    fn close_vehicle(&mut self, connection: ConnectionId) {
        if let Some(session) = self.sessions.remove(&connection) {
            session.close();
        }
    }
}
