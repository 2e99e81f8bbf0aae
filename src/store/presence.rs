//! Player profiles and presence status
//!
//! Presence drives match-found delivery on the client side: the
//! client subscribes to its own profile row and reacts when the
//! status flips to `in_match:<id>`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};

/// User profile with presence status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// New profile for insertion
#[derive(Debug, Clone, Serialize)]
struct NewProfile<'a> {
    id: Uuid,
    display_name: &'a str,
    status: &'a str,
}

#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
    status: &'a str,
}

/// Presence store operations
#[derive(Clone)]
pub struct PresenceStore {
    client: SupabaseClient,
}

impl PresenceStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<PlayerProfile>, SupabaseError> {
        let query = format!("id=eq.{}", user_id);
        self.client.get_one("profiles", &query).await
    }

    /// Get or create profile (ensures profile exists)
    pub async fn ensure_profile(
        &self,
        user_id: Uuid,
        default_name: &str,
    ) -> Result<PlayerProfile, SupabaseError> {
        match self.get_profile(user_id).await? {
            Some(profile) => Ok(profile),
            None => {
                self.client
                    .insert(
                        "profiles",
                        &NewProfile {
                            id: user_id,
                            display_name: default_name,
                            status: "online",
                        },
                    )
                    .await
            }
        }
    }

    async fn set_status(&self, user_id: Uuid, status: &str) -> Result<(), SupabaseError> {
        let query = format!("id=eq.{}", user_id);
        self.client
            .update("profiles", &query, &StatusUpdate { status })
            .await
    }

    pub async fn mark_online(&self, user_id: Uuid) -> Result<(), SupabaseError> {
        self.set_status(user_id, "online").await
    }

    pub async fn mark_queued(&self, user_id: Uuid) -> Result<(), SupabaseError> {
        self.set_status(user_id, "queued").await
    }

    /// Marks the player as taken so other systems stop offering them
    /// new pairings; doubles as the match-found signal for the client.
    pub async fn mark_in_match(&self, user_id: Uuid, match_id: Uuid) -> Result<(), SupabaseError> {
        self.set_status(user_id, &format!("in_match:{}", match_id))
            .await
    }
}
