//! Rider: one request, then notifications until the ride is over.

use std::net::SocketAddr;
use std::time::Duration;

use fleet_model::RideRequest;
use fleet_net::{Message, NetError, NoticeKind, Notification, RiderLink};
use tracing::{debug, info};

/// Send `request` to `server` and pass every notification to `on_notice`
/// until a terminal one arrives.
///
/// Returns the terminal kind, or `None` if the server went quiet for longer
/// than `wait`.
///
/// # Errors
///
/// Returns [`NetError`] if the socket cannot be bound or used.
pub async fn request_ride<F>(
    server: SocketAddr,
    request: RideRequest,
    wait: Duration,
    mut on_notice: F,
) -> Result<Option<NoticeKind>, NetError>
where
    F: FnMut(&Notification),
{
    let mut link = RiderLink::bind(server).await?;
    link.send(&Message::RideRequest(request)).await?;
    info!(
        %server,
        client = %request.client_id,
        origin = %request.origin,
        destination = %request.destination,
        "ride requested"
    );

    loop {
        match link.recv(wait).await {
            Ok(Message::Notification(notice)) => {
                on_notice(&notice);
                if notice.kind.is_terminal() {
                    return Ok(Some(notice.kind));
                }
            }
            Ok(other) => debug!(kind = other.kind(), "ignoring message from server"),
            Err(NetError::Timeout) => {
                info!(client = %request.client_id, ?wait, "no word from the server");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
    }
}
