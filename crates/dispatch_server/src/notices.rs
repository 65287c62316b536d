//! Rider-facing notification texts.

use fleet_model::VehicleId;
use fleet_net::{NoticeKind, Notification};

/// Round to one decimal, halves away from zero.
fn tenths(seconds: f64) -> f64 {
    (seconds * 10.0).round() / 10.0
}

#[must_use]
pub fn acknowledged(vehicle: VehicleId, eta_seconds: f64) -> Notification {
    Notification::new(
        NoticeKind::Acknowledged,
        format!(
            "Vehicle {vehicle} is arriving in approx {:.1} seconds!",
            tenths(eta_seconds)
        ),
    )
}

#[must_use]
pub fn approaching(vehicle: VehicleId, eta_seconds: f64) -> Notification {
    Notification::new(
        NoticeKind::Approaching,
        format!(
            "Vehicle {vehicle} is approaching, ETA approx {:.1} seconds.",
            tenths(eta_seconds)
        ),
    )
}

#[must_use]
pub fn arrived_at_pickup(vehicle: VehicleId) -> Notification {
    Notification::new(
        NoticeKind::ArrivedAtPickup,
        format!("Vehicle {vehicle} has arrived at your location!"),
    )
}

#[must_use]
pub fn completed(fare: f64) -> Notification {
    Notification::new(
        NoticeKind::Completed,
        format!("Arrived at destination! Ride fare: {fare}."),
    )
}

#[must_use]
pub fn already_active() -> Notification {
    Notification::new(
        NoticeKind::Denied,
        "Request denied: you already have an active ride.",
    )
}

#[must_use]
pub fn no_vehicle_available() -> Notification {
    Notification::new(NoticeKind::Denied, "No vehicles available at the moment.")
}

#[must_use]
pub fn outside_service_area() -> Notification {
    Notification::new(
        NoticeKind::Denied,
        "Request denied: coordinates outside the service area.",
    )
}

#[must_use]
pub fn delivery_failed() -> Notification {
    Notification::new(
        NoticeKind::Failed,
        "Assignment failed, please resend your request.",
    )
}

#[must_use]
pub fn canceled(vehicle: VehicleId) -> Notification {
    Notification::new(
        NoticeKind::Canceled,
        format!(
            "Vehicle {vehicle} disconnected. Your ride has been canceled, please resend your request."
        ),
    )
}

#[must_use]
pub fn receipt() -> Notification {
    Notification::new(NoticeKind::Receipt, "ACK")
}
