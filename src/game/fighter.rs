//! Player state machine
//!
//! Discrete fighter states cycle until the match ends; transitions
//! are driven only by intents, timers, and the landing signal from
//! the physics step. The priority order below is a deliberate
//! tie-break for simultaneous inputs: attack pre-empts block
//! pre-empts jump pre-empts walk.

use crate::game::combat::{self, HitOutcome};
use crate::game::physics::{JUMP_FORCE, MOVE_SPEED, GROUND_Y, STARTING_HEALTH};
use crate::ws::protocol::{
    FighterState, MoveDirection, PlayerIntent, PlayerState, Vec2, VerticalIntent,
};

/// Create a fighter at rest on the ground line
pub fn spawn_fighter(x: f32, facing_right: bool) -> FighterState {
    FighterState {
        position: Vec2::new(x, GROUND_Y),
        velocity: Vec2::default(),
        health: STARTING_HEALTH,
        state: PlayerState::Idle,
        facing_right,
        active_hitboxes: Vec::new(),
        intent: PlayerIntent::default(),
        last_processed_seq: 0,
        attack_ticks_left: 0,
        stun_ticks_left: 0,
    }
}

/// Whether the fighter currently ignores intents entirely
pub fn is_uncontrollable(fighter: &FighterState) -> bool {
    matches!(fighter.state, PlayerState::Hit | PlayerState::KnockedDown)
}

/// Advance the per-fighter countdown timers by one tick.
///
/// Explicit countdowns replace deferred callbacks so the simulation
/// stays single-threaded and deterministic for server re-derivation.
pub fn tick_timers(fighter: &mut FighterState) {
    if fighter.attack_ticks_left > 0 {
        fighter.attack_ticks_left -= 1;
        if fighter.attack_ticks_left == 0 {
            // Active window over: the hitboxes never outlive the attack
            fighter.active_hitboxes.clear();
            if fighter.state == PlayerState::Attacking {
                fighter.state = PlayerState::Idle;
            }
        }
    }

    if fighter.stun_ticks_left > 0 {
        fighter.stun_ticks_left -= 1;
        if fighter.stun_ticks_left == 0 && is_uncontrollable(fighter) {
            fighter.state = PlayerState::Idle;
        }
    }
}

/// Run one tick of the state machine against the fighter's most
/// recent accepted intent.
pub fn apply_intent(fighter: &mut FighterState) {
    // Rule 1: stunned fighters are uncontrollable until the hitstun
    // timer resolves
    if is_uncontrollable(fighter) {
        return;
    }

    let intent = fighter.intent;
    let vx = match intent.move_direction {
        MoveDirection::Left => -MOVE_SPEED,
        MoveDirection::Right => MOVE_SPEED,
        MoveDirection::None => 0.0,
    };
    // Horizontal control is never taken away by state alone; only the
    // jump branch below also touches vertical velocity
    fighter.velocity.x = vx;

    let can_attack = matches!(fighter.state, PlayerState::Idle | PlayerState::Walking);
    let grounded_actionable =
        !matches!(fighter.state, PlayerState::Jumping | PlayerState::Attacking);

    if let Some(kind) = intent.attack {
        // Rule 2: attack pre-empts everything, but only from the
        // ground neutral states (no air attacks)
        if can_attack {
            fighter.state = PlayerState::Attacking;
            fighter.active_hitboxes.push(combat::spawn_hitbox(kind));
            fighter.attack_ticks_left = combat::attack_duration_ticks(kind);
            return;
        }
    }

    // Rule 3: block, and block release
    if intent.block && grounded_actionable {
        fighter.state = PlayerState::Blocking;
        return;
    }
    if fighter.state == PlayerState::Blocking && !intent.block {
        fighter.state = PlayerState::Idle;
        return;
    }

    // Rule 4: jump keeps the horizontal component from movement
    if intent.vertical == VerticalIntent::Jump && grounded_actionable {
        fighter.velocity = Vec2::new(vx, JUMP_FORCE);
        fighter.state = PlayerState::Jumping;
        return;
    }

    // Rule 5: walk
    if intent.move_direction != MoveDirection::None && grounded_actionable {
        fighter.state = PlayerState::Walking;
        return;
    }

    // Rule 6: movement released
    if fighter.state == PlayerState::Walking {
        fighter.state = PlayerState::Idle;
    }
}

/// Landing signal from the physics step: forces jumping -> idle in
/// the same tick the fighter is clamped to ground.
pub fn land(fighter: &mut FighterState) {
    if fighter.state == PlayerState::Jumping {
        fighter.state = PlayerState::Idle;
    }
}

/// Turn the fighter toward its opponent
pub fn face_opponent(fighter: &mut FighterState, opponent_x: f32) {
    fighter.facing_right = fighter.position.x <= opponent_x;
}

/// Apply a resolved hit to the defender
pub fn take_hit(fighter: &mut FighterState, outcome: &HitOutcome) {
    fighter.health = (fighter.health - outcome.damage).max(0.0);
    fighter.velocity = outcome.knockback;

    // A block soaks the stun: chip damage and the dampened push-back
    // land, but the defender stays in blocking and keeps control
    if outcome.blocked {
        return;
    }

    fighter.state = if outcome.knockdown {
        PlayerState::KnockedDown
    } else {
        PlayerState::Hit
    };
    fighter.stun_ticks_left = outcome.hitstun_ticks;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::attack_duration_ticks;
    use crate::ws::protocol::AttackKind;

    fn fighter_with_intent(intent: PlayerIntent) -> FighterState {
        let mut f = spawn_fighter(100.0, true);
        f.intent = intent;
        f
    }

    #[test]
    fn walk_intent_transitions_to_walking() {
        let mut f = fighter_with_intent(PlayerIntent {
            move_direction: MoveDirection::Right,
            ..Default::default()
        });
        apply_intent(&mut f);
        assert_eq!(f.state, PlayerState::Walking);
        assert_eq!(f.velocity.x, MOVE_SPEED);
    }

    #[test]
    fn movement_release_returns_walking_to_idle() {
        let mut f = fighter_with_intent(PlayerIntent::default());
        f.state = PlayerState::Walking;
        apply_intent(&mut f);
        assert_eq!(f.state, PlayerState::Idle);
        assert_eq!(f.velocity.x, 0.0);
    }

    #[test]
    fn attack_spawns_hitbox_and_arms_timer() {
        let mut f = fighter_with_intent(PlayerIntent {
            attack: Some(AttackKind::Medium),
            ..Default::default()
        });
        apply_intent(&mut f);
        assert_eq!(f.state, PlayerState::Attacking);
        assert_eq!(f.active_hitboxes.len(), 1);
        assert_eq!(f.attack_ticks_left, attack_duration_ticks(AttackKind::Medium));
    }

    #[test]
    fn attack_pre_empts_block_jump_and_walk() {
        let mut f = fighter_with_intent(PlayerIntent {
            move_direction: MoveDirection::Left,
            vertical: VerticalIntent::Jump,
            attack: Some(AttackKind::Light),
            block: true,
        });
        apply_intent(&mut f);
        assert_eq!(f.state, PlayerState::Attacking);
    }

    #[test]
    fn no_attack_while_jumping() {
        let mut f = fighter_with_intent(PlayerIntent {
            attack: Some(AttackKind::Light),
            ..Default::default()
        });
        f.state = PlayerState::Jumping;
        apply_intent(&mut f);
        assert_eq!(f.state, PlayerState::Jumping);
        assert!(f.active_hitboxes.is_empty());
    }

    #[test]
    fn block_pre_empts_jump_and_walk() {
        let mut f = fighter_with_intent(PlayerIntent {
            move_direction: MoveDirection::Right,
            vertical: VerticalIntent::Jump,
            block: true,
            ..Default::default()
        });
        apply_intent(&mut f);
        assert_eq!(f.state, PlayerState::Blocking);
    }

    #[test]
    fn block_release_returns_to_idle() {
        let mut f = fighter_with_intent(PlayerIntent::default());
        f.state = PlayerState::Blocking;
        apply_intent(&mut f);
        assert_eq!(f.state, PlayerState::Idle);
    }

    #[test]
    fn jump_applies_impulse_and_keeps_horizontal() {
        let mut f = fighter_with_intent(PlayerIntent {
            move_direction: MoveDirection::Left,
            vertical: VerticalIntent::Jump,
            ..Default::default()
        });
        apply_intent(&mut f);
        assert_eq!(f.state, PlayerState::Jumping);
        assert_eq!(f.velocity, Vec2::new(-MOVE_SPEED, JUMP_FORCE));
    }

    #[test]
    fn stunned_fighter_ignores_intents() {
        for state in [PlayerState::Hit, PlayerState::KnockedDown] {
            let mut f = fighter_with_intent(PlayerIntent {
                move_direction: MoveDirection::Right,
                attack: Some(AttackKind::Light),
                ..Default::default()
            });
            f.state = state;
            f.stun_ticks_left = 5;
            apply_intent(&mut f);
            assert_eq!(f.state, state);
            assert!(f.active_hitboxes.is_empty());
        }
    }

    #[test]
    fn hitstun_expiry_resolves_to_idle() {
        let mut f = spawn_fighter(100.0, true);
        f.state = PlayerState::Hit;
        f.stun_ticks_left = 2;
        tick_timers(&mut f);
        assert_eq!(f.state, PlayerState::Hit);
        tick_timers(&mut f);
        assert_eq!(f.state, PlayerState::Idle);
    }

    #[test]
    fn attack_expiry_clears_hitboxes_and_returns_to_idle() {
        let mut f = fighter_with_intent(PlayerIntent {
            attack: Some(AttackKind::Light),
            ..Default::default()
        });
        apply_intent(&mut f);
        let duration = f.attack_ticks_left;
        for _ in 0..duration {
            tick_timers(&mut f);
        }
        assert_eq!(f.state, PlayerState::Idle);
        assert!(f.active_hitboxes.is_empty());
    }

    #[test]
    fn attack_expiry_clears_hitboxes_even_if_hit_meanwhile() {
        let mut f = fighter_with_intent(PlayerIntent {
            attack: Some(AttackKind::Light),
            ..Default::default()
        });
        apply_intent(&mut f);
        let duration = f.attack_ticks_left;
        // Hit mid-swing: stun state wins, hitboxes still expire
        f.state = PlayerState::Hit;
        f.stun_ticks_left = duration + 10;
        for _ in 0..duration {
            tick_timers(&mut f);
        }
        assert!(f.active_hitboxes.is_empty());
        assert_eq!(f.state, PlayerState::Hit);
    }

    #[test]
    fn take_hit_applies_damage_knockback_and_stun() {
        let mut f = spawn_fighter(100.0, true);
        let outcome = HitOutcome {
            damage: 15.0,
            hitstun_ticks: 36,
            knockback: Vec2::new(-6.0, -3.0),
            knockdown: true,
            blocked: false,
        };
        take_hit(&mut f, &outcome);
        assert_eq!(f.health, 85.0);
        assert_eq!(f.state, PlayerState::KnockedDown);
        assert_eq!(f.stun_ticks_left, 36);
        assert_eq!(f.velocity, Vec2::new(-6.0, -3.0));
    }

    #[test]
    fn blocked_hit_chips_without_breaking_the_block() {
        let mut f = spawn_fighter(100.0, true);
        f.state = PlayerState::Blocking;
        let outcome = HitOutcome {
            damage: 1.0,
            hitstun_ticks: 6,
            knockback: Vec2::new(0.6, 0.0),
            knockdown: false,
            blocked: true,
        };
        take_hit(&mut f, &outcome);
        assert_eq!(f.health, 99.0);
        assert_eq!(f.state, PlayerState::Blocking);
        assert_eq!(f.stun_ticks_left, 0);
    }

    #[test]
    fn health_clamps_at_zero() {
        let mut f = spawn_fighter(100.0, true);
        f.health = 3.0;
        let outcome = HitOutcome {
            damage: 20.0,
            hitstun_ticks: 48,
            knockback: Vec2::default(),
            knockdown: true,
            blocked: false,
        };
        take_hit(&mut f, &outcome);
        assert_eq!(f.health, 0.0);
    }

    #[test]
    fn landing_signal_forces_only_jumping_to_idle() {
        let mut f = spawn_fighter(100.0, true);
        f.state = PlayerState::Jumping;
        land(&mut f);
        assert_eq!(f.state, PlayerState::Idle);

        f.state = PlayerState::Hit;
        land(&mut f);
        assert_eq!(f.state, PlayerState::Hit);
    }

    #[test]
    fn facing_follows_opponent() {
        let mut f = spawn_fighter(100.0, true);
        face_opponent(&mut f, 50.0);
        assert!(!f.facing_right);
        face_opponent(&mut f, 650.0);
        assert!(f.facing_right);
    }
}
