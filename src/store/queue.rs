//! Database mirror of the matchmaking queue
//!
//! The in-memory queue is the pairing authority; these rows exist so
//! the player's other sessions can see they are queued and so an
//! operator can inspect the queue.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ws::protocol::{FighterKind, StageKind};

use super::supabase::{SupabaseClient, SupabaseError};

/// Queue row as stored in the `matchmaking_queue` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRow {
    pub player_id: Uuid,
    pub fighter: FighterKind,
    pub stage: StageKind,
}

/// Queue mirror operations
#[derive(Clone)]
pub struct QueueStore {
    client: SupabaseClient,
}

impl QueueStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn add_entry(&self, row: &QueueRow) -> Result<(), SupabaseError> {
        let _: QueueRow = self.client.insert("matchmaking_queue", row).await?;
        Ok(())
    }

    pub async fn remove_entry(&self, player_id: Uuid) -> Result<(), SupabaseError> {
        let query = format!("player_id=eq.{}", player_id);
        self.client.delete("matchmaking_queue", &query).await
    }
}
