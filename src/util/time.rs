//! Time and tick-rate utilities for the simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // 60 simulation ticks per second
pub const SNAPSHOT_TPS: u32 = 20; // 20 snapshot broadcasts per second
pub const PERSIST_TPS: u32 = 4; // 4 authoritative row writes per second

/// Wall-clock seconds elapsed per simulation tick.
///
/// The match timer counts real seconds; physics uses tick units
/// (one tick is dt = 1 in the integrator).
pub fn tick_seconds() -> f32 {
    1.0 / SIMULATION_TPS as f32
}

/// Convert a real-time duration in milliseconds to a tick count,
/// rounded to the nearest tick.
pub fn ms_to_ticks(ms: u32) -> u32 {
    (ms * SIMULATION_TPS + 500) / 1000
}
