//! Dispatcher: event handlers over the registries.
//!
//! The [`Dispatcher`] owns the vehicle registry, the task registry and the
//! configuration. The server loop calls exactly one handler per event; each
//! handler runs to completion before the next event is looked at, so every
//! handler is a single transaction over all registries.
//!
//! Handlers never fail. Bad input is logged and dropped, and delivery
//! problems are confined to the connection they happened on.

use std::net::SocketAddr;

use fleet_model::{ClientId, RideCompletionReport, RideRequest, VehicleId, VehicleState};
use fleet_net::{Message, Notification, codec};
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::lifecycle;
use crate::matching::{self, AssignmentResult};
use crate::notices;
use crate::outbox::Outbox;
use crate::session::ConnectionId;
use crate::tasks::TaskRegistry;
use crate::vehicles::{Upsert, VehicleRegistry};

/// Point-in-time counts for the status log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FleetSummary {
    pub vehicles: usize,
    pub idle: usize,
    pub active_rides: usize,
}

/// Owner of all dispatch state.
#[derive(Debug)]
pub struct Dispatcher {
    config: DispatchConfig,
    vehicles: VehicleRegistry,
    tasks: TaskRegistry,
}

impl Dispatcher {
    #[must_use]
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            vehicles: VehicleRegistry::new(),
            tasks: TaskRegistry::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    #[must_use]
    pub fn vehicles(&self) -> &VehicleRegistry {
        &self.vehicles
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    #[must_use]
    pub fn summary(&self) -> FleetSummary {
        FleetSummary {
            vehicles: self.vehicles.len(),
            idle: self.vehicles.idle_count(),
            active_rides: self.tasks.len(),
        }
    }

    // ── Rider channel ───────────────────────────────────────────────────────

    /// Handle one datagram from a rider.
    pub fn handle_client_datagram(
        &mut self,
        from: SocketAddr,
        payload: &[u8],
        outbox: &mut impl Outbox,
    ) {
        match codec::decode(payload) {
            Ok(message) => self.handle_client_message(from, message, outbox),
            Err(e) => warn!(%from, %e, len = payload.len(), "discarding undecodable datagram"),
        }
    }

    pub fn handle_client_message(
        &mut self,
        from: SocketAddr,
        message: Message,
        outbox: &mut impl Outbox,
    ) {
        match message {
            Message::RideRequest(request) => {
                self.handle_ride_request(from, request, outbox);
            }
            Message::Diagnostic(text) => {
                info!(%from, %text, "diagnostic from rider");
                notify(outbox, from, notices::receipt());
            }
            other => warn!(%from, kind = other.kind(), "unexpected message on rider channel"),
        }
    }

    /// Validate, match and answer one ride request.
    ///
    /// The rider gets exactly one reply: the ETA on success, a denial or a
    /// failure notice otherwise.
    pub fn handle_ride_request(
        &mut self,
        from: SocketAddr,
        request: RideRequest,
        outbox: &mut impl Outbox,
    ) -> Option<AssignmentResult> {
        info!(
            %from,
            client = %request.client_id,
            origin = %request.origin,
            destination = %request.destination,
            "ride request"
        );

        let grid = self.config.grid_size;
        if !request.origin.within(grid) || !request.destination.within(grid) {
            warn!(client = %request.client_id, grid, "request outside the service area");
            notify(outbox, from, notices::outside_service_area());
            return None;
        }

        let result = matching::assign(
            request,
            from,
            &mut self.vehicles,
            &mut self.tasks,
            &self.config,
            outbox,
        );
        let reply = match result {
            AssignmentResult::Assigned {
                vehicle_id,
                eta_seconds,
                ..
            } => notices::acknowledged(vehicle_id, eta_seconds),
            AssignmentResult::AlreadyActive => notices::already_active(),
            AssignmentResult::NoVehicleAvailable => notices::no_vehicle_available(),
            AssignmentResult::DeliveryFailed { .. } => notices::delivery_failed(),
        };
        notify(outbox, from, reply);
        Some(result)
    }

    // ── Vehicle channel ─────────────────────────────────────────────────────

    /// Handle one frame from a vehicle session. Undecodable frames are
    /// dropped; the session stays open.
    pub fn handle_vehicle_frame(
        &mut self,
        connection: ConnectionId,
        payload: &[u8],
        outbox: &mut impl Outbox,
    ) {
        match codec::decode(payload) {
            Ok(message) => self.handle_vehicle_message(connection, message, outbox),
            Err(e) => warn!(%connection, %e, len = payload.len(), "discarding undecodable frame"),
        }
    }

    pub fn handle_vehicle_message(
        &mut self,
        connection: ConnectionId,
        message: Message,
        outbox: &mut impl Outbox,
    ) {
        match message {
            Message::VehicleReport(report) => self.handle_report(connection, report, outbox),
            Message::RideCompleted(report) => self.handle_completion(connection, report, outbox),
            Message::Diagnostic(text) => info!(%connection, %text, "diagnostic from vehicle"),
            other => warn!(%connection, kind = other.kind(), "unexpected message on vehicle channel"),
        }
    }

    fn handle_report(
        &mut self,
        connection: ConnectionId,
        report: VehicleState,
        outbox: &mut impl Outbox,
    ) {
        let outcome = self.vehicles.upsert(connection, report);
        match outcome {
            Upsert::Registered => {
                info!(
                    %connection,
                    vehicle = %report.id,
                    position = %report.position,
                    status = ?report.status,
                    "vehicle registered"
                );
            }
            Upsert::Updated => {
                debug!(
                    vehicle = %report.id,
                    position = %report.position,
                    status = ?report.status,
                    "vehicle report"
                );
            }
            Upsert::Rebound { previous, .. } => {
                warn!(vehicle = %report.id, %previous, %connection, "vehicle id moved to a new connection");
            }
            Upsert::Renamed { .. } => {}
        }
        if let Some(dropped) = outcome.dropped_id() {
            warn!(%connection, previous = %dropped, vehicle = %report.id, "connection changed its vehicle id");
            self.cancel_ride(dropped, outbox);
        }

        let Some(ride) = self.tasks.ride_mut(report.id) else {
            return;
        };
        if let Some(notice) = lifecycle::on_report(ride, &report, &self.config) {
            let client = ride.client_id();
            self.notify_client(client, notice, outbox);
        }
    }

    fn handle_completion(
        &mut self,
        connection: ConnectionId,
        report: RideCompletionReport,
        outbox: &mut impl Outbox,
    ) {
        if self.vehicles.vehicle_on(connection) != Some(report.vehicle_id) {
            warn!(%connection, vehicle = %report.vehicle_id, "completion for a vehicle not on this connection");
        }
        let done = lifecycle::finalize(&report, &mut self.vehicles, &mut self.tasks, &self.config);
        match done.reply_to {
            Some(addr) => notify(outbox, addr, notices::completed(report.fare)),
            None => debug!(client = %report.client_id, "no reply address, fare notice dropped"),
        }
    }

    /// Clean up after a vehicle session ends, for whatever reason.
    ///
    /// Safe to call more than once for the same connection.
    pub fn handle_disconnect(&mut self, connection: ConnectionId, outbox: &mut impl Outbox) {
        match self.vehicles.remove(connection) {
            Some(entry) => {
                info!(%connection, vehicle = %entry.state.id, "vehicle disconnected");
                self.cancel_ride(entry.state.id, outbox);
            }
            None => debug!(%connection, "unregistered session ended"),
        }
        outbox.close_vehicle(connection);
    }

    /// Drop the vehicle's ride, if any, and tell its rider to ask again.
    fn cancel_ride(&mut self, vehicle: VehicleId, outbox: &mut impl Outbox) {
        let Some(ride) = self.tasks.ride(vehicle) else {
            return;
        };
        let client = ride.client_id();
        self.notify_client(client, notices::canceled(vehicle), outbox);
        self.tasks.remove_by_vehicle(vehicle);
        info!(vehicle = %vehicle, %client, "ride canceled");
    }

    /// Best-effort notice to a rider by id. Dropped if the address is unknown.
    fn notify_client(
        &self,
        client: ClientId,
        notice: Notification,
        outbox: &mut impl Outbox,
    ) {
        match self.tasks.reply_addr(client) {
            Some(addr) => notify(outbox, addr, notice),
            None => debug!(%client, kind = ?notice.kind, "no reply address, notice dropped"),
        }
    }
}

fn notify(outbox: &mut impl Outbox, addr: SocketAddr, notice: Notification) {
    let kind = notice.kind;
    if let Err(e) = outbox.send_to_client(addr, notice) {
        warn!(%addr, ?kind, %e, "failed to notify rider");
    }
}
