//! Intent derivation
//!
//! Raw held-button state is collapsed into one structured
//! `PlayerIntent` per tick. The precedence rules here are part of the
//! gameplay contract: left wins over right, and the weakest held
//! attack wins, so mashing several buttons never accidentally fires a
//! special.

use crate::ws::protocol::{
    AttackKind, MoveDirection, PlayerIntent, PlayerState, RawInput, VerticalIntent,
};

/// Collapse raw input into a structured intent for this tick.
///
/// Blocking is gated on the holder's situation: the crouch control
/// only reads as a block while grounded and not mid-attack.
pub fn derive_intent(input: RawInput, state: PlayerState, airborne: bool) -> PlayerIntent {
    let move_direction = if input.left {
        MoveDirection::Left
    } else if input.right {
        MoveDirection::Right
    } else {
        MoveDirection::None
    };

    let vertical = if input.jump {
        VerticalIntent::Jump
    } else if input.crouch {
        VerticalIntent::Crouch
    } else {
        VerticalIntent::None
    };

    // Lowest tier wins when several attack buttons are down
    let attack = if input.light {
        Some(AttackKind::Light)
    } else if input.medium {
        Some(AttackKind::Medium)
    } else if input.heavy {
        Some(AttackKind::Heavy)
    } else if input.special {
        Some(AttackKind::Special)
    } else {
        None
    };

    let block = input.crouch && !airborne && state != PlayerState::Attacking;

    PlayerIntent {
        move_direction,
        vertical,
        attack,
        block,
    }
}
