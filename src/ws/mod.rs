//! WebSocket modules

pub mod handler;
pub mod protocol;
