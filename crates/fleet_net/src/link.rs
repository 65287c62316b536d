//! Client-side links to the dispatch server.
//!
//! [`VehicleLink`] is the framed TCP stream a vehicle keeps open for its
//! whole shift. [`RiderLink`] is the UDP socket a rider sends its request
//! from and listens on for notifications.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::NetError;
use crate::frame::{self, MAX_DATAGRAM_LEN};
use crate::messages::Message;

/// Inbound messages buffered ahead of the vehicle's own loop.
const INBOUND_QUEUE: usize = 16;

/// A vehicle's stream to the server.
///
/// Incoming frames are read on a background task so [`VehicleLink::recv`]
/// can sit in a `select!` next to a movement timer without losing partial
/// frames.
#[derive(Debug)]
pub struct VehicleLink {
    writer: OwnedWriteHalf,
    inbound: mpsc::Receiver<Message>,
    reader: JoinHandle<()>,
}

impl VehicleLink {
    /// Connect to the server's vehicle port.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the connection cannot be established.
    pub async fn connect(addr: SocketAddr) -> Result<Self, NetError> {
        info!(%addr, "connecting to dispatch server");
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (mut read_half, writer) = stream.into_split();
        let (tx, inbound) = mpsc::channel(INBOUND_QUEUE);

        let reader = tokio::spawn(async move {
            loop {
                match frame::read_frame(&mut read_half).await {
                    Ok(Some(payload)) => match codec::decode(&payload) {
                        Ok(message) => {
                            if tx.send(message).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(%e, "discarding undecodable frame from server"),
                    },
                    Ok(None) => {
                        debug!("server closed the stream");
                        break;
                    }
                    Err(e) => {
                        warn!(%e, "vehicle link read failed");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            writer,
            inbound,
            reader,
        })
    }

    /// Send one message as one frame.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding or writing fails.
    pub async fn send(&mut self, message: &Message) -> Result<(), NetError> {
        let payload = codec::encode(message)?;
        frame::write_frame(&mut self.writer, &payload).await
    }

    /// Wait for the next message from the server.
    ///
    /// Returns `None` once the server has closed the stream. Cancel-safe.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inbound.recv().await
    }
}

impl Drop for VehicleLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// A rider's datagram socket.
#[derive(Debug)]
pub struct RiderLink {
    socket: UdpSocket,
    server: SocketAddr,
    buffer: Vec<u8>,
}

impl RiderLink {
    /// Bind an ephemeral local port for talking to `server`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if no local port can be bound.
    pub async fn bind(server: SocketAddr) -> Result<Self, NetError> {
        let local: SocketAddr = if server.is_ipv6() {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(Self {
            socket,
            server,
            buffer: vec![0u8; MAX_DATAGRAM_LEN],
        })
    }

    /// The local address the server will reply to.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.socket.local_addr()?)
    }

    /// Send one message as one datagram.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding or sending fails.
    pub async fn send(&self, message: &Message) -> Result<(), NetError> {
        let payload = codec::encode(message)?;
        self.socket.send_to(&payload, self.server).await?;
        Ok(())
    }

    /// Wait up to `wait` for the next decodable message.
    ///
    /// Undecodable datagrams are logged and skipped without extending the
    /// deadline.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Timeout`] if nothing arrives in time, or
    /// [`NetError::Io`] on socket failure.
    pub async fn recv(&mut self, wait: Duration) -> Result<Message, NetError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let received =
                tokio::time::timeout_at(deadline, self.socket.recv_from(&mut self.buffer)).await;
            let (len, from) = match received {
                Ok(result) => result?,
                Err(_) => return Err(NetError::Timeout),
            };
            match codec::decode(&self.buffer[..len]) {
                Ok(message) => return Ok(message),
                Err(e) => warn!(%from, %e, "discarding undecodable datagram"),
            }
        }
    }
}
