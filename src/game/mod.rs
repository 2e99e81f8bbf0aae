//! Game simulation modules

pub mod combat;
pub mod fighter;
pub mod intent;
pub mod r#match;
pub mod physics;
pub mod simulation;
pub mod snapshot;

pub use r#match::{GameMatch, MatchHandle, MatchRecord, MatchRegistry};

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub user_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}
