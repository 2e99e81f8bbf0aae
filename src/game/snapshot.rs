//! Snapshot broadcast cadence

use crate::game::simulation;
use crate::ws::protocol::{MatchSnapshot, ServerMsg};

/// Paces authoritative snapshot broadcasts relative to the
/// simulation tick rate. Clients hard-overwrite their prediction with
/// every snapshot, so important events force an immediate one.
pub struct SnapshotCadence {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotCadence {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force a snapshot on the next check (pause toggles, stale
    /// intents, match end)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build the snapshot broadcast message
    pub fn build(&self, tick: u64, snapshot: &MatchSnapshot) -> ServerMsg {
        ServerMsg::Snapshot {
            tick,
            status: simulation::status_of(snapshot),
            snapshot: snapshot.clone(),
        }
    }
}
