//! Fighter physics integration and stage bounds
//!
//! Pure and deterministic: the server re-derives authoritative state
//! with the same integration clients use for prediction, so any
//! divergence here shows up as visible correction snaps.

use crate::ws::protocol::Vec2;

/// Stage and movement constants. These are part of the wire contract
/// shared with clients; changing them desyncs prediction.
pub const STAGE_WIDTH: f32 = 800.0;
pub const STAGE_HEIGHT: f32 = 300.0;
pub const GRAVITY: f32 = 0.5;
pub const JUMP_FORCE: f32 = -10.0;
pub const MOVE_SPEED: f32 = 5.0;
pub const FIGHTER_WIDTH: f32 = 48.0;
pub const FIGHTER_HEIGHT: f32 = 64.0;

/// Resting line for a fighter's top edge; smaller y is higher on
/// screen (top-down-screen coordinates)
pub const GROUND_Y: f32 = STAGE_HEIGHT - FIGHTER_HEIGHT;

pub const STARTING_HEALTH: f32 = 100.0;
pub const STARTING_TIMER_SECS: f32 = 99.0;

/// A fighter is airborne when its top edge sits above the resting line
pub fn is_airborne(position: Vec2) -> bool {
    position.y < GROUND_Y
}

/// Result of integrating one fighter for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integration {
    pub position: Vec2,
    pub velocity: Vec2,
    /// The fighter was airborne at tick start and is now clamped to
    /// ground. The state machine turns this into a same-tick
    /// jumping -> idle transition.
    pub landed: bool,
}

/// Advance position and velocity by `dt` ticks under gravity and
/// stage bounds.
pub fn integrate(position: Vec2, velocity: Vec2, dt: f32) -> Integration {
    let was_airborne = is_airborne(position);

    let new_position = Vec2 {
        x: (position.x + velocity.x * dt).clamp(0.0, STAGE_WIDTH - FIGHTER_WIDTH),
        y: (position.y + velocity.y * dt).clamp(GROUND_Y, STAGE_HEIGHT),
    };

    // Gravity only acts while airborne; grounded fighters shed all
    // vertical velocity.
    let new_velocity = Vec2 {
        x: velocity.x,
        y: if was_airborne {
            velocity.y + GRAVITY
        } else {
            0.0
        },
    };

    let landed = was_airborne && !is_airborne(new_position);

    Integration {
        position: new_position,
        velocity: new_velocity,
        landed,
    }
}
