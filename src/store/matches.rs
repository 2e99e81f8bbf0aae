//! Match record persistence
//!
//! The `matches` table mirrors the in-memory `MatchRecord`. Clients
//! subscribed to row changes receive the snapshot column as their
//! reconciliation feed, so `save_state` runs on a fixed cadence from
//! the match task rather than on every tick.

use serde::Serialize;
use uuid::Uuid;

use crate::game::MatchRecord;
use crate::ws::protocol::{MatchSnapshot, MatchStatus, Winner};

use super::supabase::{SupabaseClient, SupabaseError};

#[derive(Debug, Serialize)]
struct StateUpdate<'a> {
    snapshot: &'a MatchSnapshot,
}

#[derive(Debug, Serialize)]
struct FinalizeUpdate<'a> {
    status: MatchStatus,
    winner_id: Option<Uuid>,
    winner: Option<Winner>,
    snapshot: &'a MatchSnapshot,
}

/// Match store operations
#[derive(Clone)]
pub struct MatchStore {
    client: SupabaseClient,
}

impl MatchStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Insert a freshly paired match row
    pub async fn create_match(&self, record: &MatchRecord) -> Result<MatchRecord, SupabaseError> {
        self.client.insert("matches", record).await
    }

    /// Overwrite the persisted snapshot for a running match
    pub async fn save_state(
        &self,
        match_id: Uuid,
        snapshot: &MatchSnapshot,
    ) -> Result<(), SupabaseError> {
        let query = format!("id=eq.{}", match_id);
        self.client
            .update("matches", &query, &StateUpdate { snapshot })
            .await
    }

    /// Write the terminal status and final snapshot. Status
    /// transitions are one-directional, so the filter refuses to
    /// touch a row already finalized.
    pub async fn finalize(&self, record: &MatchRecord) -> Result<(), SupabaseError> {
        let query = format!("id=eq.{}&status=eq.active", record.id);
        self.client
            .update(
                "matches",
                &query,
                &FinalizeUpdate {
                    status: record.status,
                    winner_id: record.winner_id(),
                    winner: record.snapshot.winner,
                    snapshot: &record.snapshot,
                },
            )
            .await
    }
}
