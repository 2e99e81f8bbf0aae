//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::MatchRegistry;
use crate::matchmaking::MatchmakingService;
use crate::store::{MatchStore, PresenceStore, QueueStore, SupabaseClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub supabase: SupabaseClient,
    pub match_store: MatchStore,
    pub presence_store: PresenceStore,
    pub matchmaking: Arc<MatchmakingService>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let supabase = SupabaseClient::new(&config);

        let match_store = MatchStore::new(supabase.clone());
        let presence_store = PresenceStore::new(supabase.clone());
        let queue_store = QueueStore::new(supabase.clone());

        let match_registry = Arc::new(MatchRegistry::new());

        let matchmaking = Arc::new(MatchmakingService::new(
            match_registry.clone(),
            match_store.clone(),
            presence_store.clone(),
            queue_store,
        ));

        Self {
            config,
            supabase,
            match_store,
            presence_store,
            matchmaking,
            match_registry,
        }
    }
}
