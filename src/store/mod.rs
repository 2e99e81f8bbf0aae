//! Data store modules for Supabase integration

pub mod matches;
pub mod presence;
pub mod queue;
pub mod supabase;

pub use matches::MatchStore;
pub use presence::PresenceStore;
pub use queue::QueueStore;
pub use supabase::SupabaseClient;
