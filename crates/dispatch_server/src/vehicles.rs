//! Vehicle registry: last known state of every reporting vehicle.
//!
//! A vehicle is registered by its first report, not by its connection, and
//! leaves the registry together with its connection. Each entry remembers
//! which connection it reports on; each connection owns at most one entry.

use std::collections::HashMap;

use fleet_model::{Coordinate, VehicleId, VehicleState, VehicleStatus, grid_distance};

use crate::session::ConnectionId;

/// A registered vehicle and the connection it reports on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleEntry {
    pub state: VehicleState,
    pub connection: ConnectionId,
}

/// What an [`VehicleRegistry::upsert`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First report for this id.
    Registered,
    /// Position and status replaced.
    Updated,
    /// The id was bound to another connection and now follows this one.
    /// If this connection used to report under another id, that entry is
    /// gone and named in `renamed_from`.
    Rebound {
        previous: ConnectionId,
        renamed_from: Option<VehicleId>,
    },
    /// This connection used to report as `previous`, whose entry is gone.
    Renamed { previous: VehicleId },
}

impl Upsert {
    /// The id whose entry this upsert removed, if any.
    #[must_use]
    pub fn dropped_id(self) -> Option<VehicleId> {
        match self {
            Self::Renamed { previous } => Some(previous),
            Self::Rebound { renamed_from, .. } => renamed_from,
            Self::Registered | Self::Updated => None,
        }
    }
}

/// Registry of vehicles known to the dispatcher.
#[derive(Debug, Default)]
pub struct VehicleRegistry {
    vehicles: HashMap<VehicleId, VehicleEntry>,
    by_connection: HashMap<ConnectionId, VehicleId>,
}

impl VehicleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a report received on `connection`.
    ///
    /// The first report for an id seeds the cumulative stats; later reports
    /// replace position and status only, since stats are incremented here on
    /// ride completion.
    pub fn upsert(&mut self, connection: ConnectionId, report: VehicleState) -> Upsert {
        let id = report.id;
        let mut renamed_from = None;

        if let Some(&old_id) = self.by_connection.get(&connection)
            && old_id != id
        {
            self.vehicles.remove(&old_id);
            renamed_from = Some(old_id);
        }
        let mut outcome = match renamed_from {
            Some(previous) => Upsert::Renamed { previous },
            None => Upsert::Updated,
        };

        match self.vehicles.get_mut(&id) {
            Some(entry) => {
                if entry.connection != connection {
                    self.by_connection.remove(&entry.connection);
                    outcome = Upsert::Rebound {
                        previous: entry.connection,
                        renamed_from,
                    };
                    entry.connection = connection;
                }
                entry.state.position = report.position;
                entry.state.status = report.status;
            }
            None => {
                self.vehicles.insert(
                    id,
                    VehicleEntry {
                        state: report,
                        connection,
                    },
                );
                if outcome == Upsert::Updated {
                    outcome = Upsert::Registered;
                }
            }
        }

        self.by_connection.insert(connection, id);
        outcome
    }

    /// Remove whichever vehicle reports on `connection`.
    ///
    /// Returns the removed entry, or `None` if the connection never reported
    /// (or has already been removed).
    pub fn remove(&mut self, connection: ConnectionId) -> Option<VehicleEntry> {
        let id = self.by_connection.remove(&connection)?;
        self.vehicles.remove(&id)
    }

    /// The idle vehicle closest to `origin`, skipping any id for which
    /// `exclude` returns `true`.
    ///
    /// Ties go to the lowest vehicle id.
    #[must_use]
    pub fn find_nearest_idle<F>(&self, origin: Coordinate, exclude: F) -> Option<&VehicleEntry>
    where
        F: Fn(VehicleId) -> bool,
    {
        self.vehicles
            .values()
            .filter(|entry| entry.state.is_idle() && !exclude(entry.state.id))
            .min_by_key(|entry| (grid_distance(entry.state.position, origin), entry.state.id))
    }

    #[must_use]
    pub fn get(&self, id: VehicleId) -> Option<&VehicleEntry> {
        self.vehicles.get(&id)
    }

    /// The vehicle reporting on `connection`, if it has reported yet.
    #[must_use]
    pub fn vehicle_on(&self, connection: ConnectionId) -> Option<VehicleId> {
        self.by_connection.get(&connection).copied()
    }

    /// Overwrite the recorded status until the vehicle's next report.
    pub fn set_status(&mut self, id: VehicleId, status: VehicleStatus) {
        if let Some(entry) = self.vehicles.get_mut(&id) {
            entry.state.status = status;
        }
    }

    /// Add a finished ride to the vehicle's totals.
    ///
    /// Returns `false` if the vehicle is not registered.
    pub fn record_ride(&mut self, id: VehicleId, distance: f64, fare: f64) -> bool {
        match self.vehicles.get_mut(&id) {
            Some(entry) => {
                entry.state.stats.record_ride(distance, fare);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleEntry> {
        self.vehicles.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.vehicles.values().filter(|e| e.state.is_idle()).count()
    }
}
