//! Combat resolution - hitboxes, hurtboxes, damage, blocking

use crate::game::physics::{self, FIGHTER_HEIGHT, FIGHTER_WIDTH};
use crate::util::time::ms_to_ticks;
use crate::ws::protocol::{AttackKind, FighterState, Hitbox, PlayerState, Vec2};

/// Damage dealt by each attack strength
pub fn attack_damage(kind: AttackKind) -> f32 {
    match kind {
        AttackKind::Light => 5.0,
        AttackKind::Medium => 10.0,
        AttackKind::Heavy => 15.0,
        AttackKind::Special => 20.0,
    }
}

/// Hitstun inflicted on an unblocked hit, in ticks
pub fn attack_hitstun_ticks(kind: AttackKind) -> u32 {
    let ms = match kind {
        AttackKind::Light => 200,
        AttackKind::Medium => 400,
        AttackKind::Heavy => 600,
        AttackKind::Special => 800,
    };
    ms_to_ticks(ms)
}

/// Velocity impulse applied to a hit defender, before facing mirror
pub fn attack_knockback(kind: AttackKind) -> Vec2 {
    match kind {
        AttackKind::Light => Vec2::new(2.0, 0.0),
        AttackKind::Medium => Vec2::new(4.0, -1.0),
        AttackKind::Heavy => Vec2::new(6.0, -3.0),
        AttackKind::Special => Vec2::new(8.0, -4.0),
    }
}

/// How long the attack's active window lasts, in ticks
pub fn attack_duration_ticks(kind: AttackKind) -> u32 {
    let ms = match kind {
        AttackKind::Light => 300,
        AttackKind::Medium => 500,
        AttackKind::Heavy => 700,
        AttackKind::Special => 1000,
    };
    ms_to_ticks(ms)
}

/// Build the hitbox an attack spawns, in attacker-relative
/// coordinates (offset from the attacker's top-left, facing right)
pub fn spawn_hitbox(kind: AttackKind) -> Hitbox {
    Hitbox {
        offset: Vec2::new(FIGHTER_WIDTH, 20.0),
        width: 30.0,
        height: 20.0,
        damage: attack_damage(kind),
        kind,
        hitstun_ticks: attack_hitstun_ticks(kind),
        knockback: attack_knockback(kind),
        consumed: false,
    }
}

/// Axis-aligned rectangle in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Translate an attacker-relative hitbox to world coordinates,
/// mirroring the x offset around the fighter's own width when the
/// attacker faces left.
pub fn world_hitbox(hitbox: &Hitbox, attacker_pos: Vec2, facing_right: bool) -> Rect {
    let x = if facing_right {
        attacker_pos.x + hitbox.offset.x
    } else {
        attacker_pos.x + FIGHTER_WIDTH - hitbox.offset.x - hitbox.width
    };
    Rect {
        x,
        y: attacker_pos.y + hitbox.offset.y,
        width: hitbox.width,
        height: hitbox.height,
    }
}

/// Derive the defender's hurtbox from its current state. Recomputed
/// every tick, never persisted: full body box by default, shrunk to
/// the lower three quarters while airborne.
pub fn hurtbox_for(fighter: &FighterState) -> Rect {
    let reduced = fighter.state == PlayerState::Jumping || physics::is_airborne(fighter.position);
    if reduced {
        let shrink = FIGHTER_HEIGHT * 0.25;
        Rect {
            x: fighter.position.x,
            y: fighter.position.y + shrink,
            width: FIGHTER_WIDTH,
            height: FIGHTER_HEIGHT - shrink,
        }
    } else {
        Rect {
            x: fighter.position.x,
            y: fighter.position.y,
            width: FIGHTER_WIDTH,
            height: FIGHTER_HEIGHT,
        }
    }
}

/// Resolved effect of one landed hit, after blocking mitigation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    pub damage: f32,
    pub hitstun_ticks: u32,
    pub knockback: Vec2,
    /// Damage above 10 knocks the defender down instead of staggering
    pub knockdown: bool,
    pub blocked: bool,
}

/// Check the attacker's active hitboxes against the defender for this
/// tick. The first overlapping unconsumed hitbox is consumed and
/// resolved; a hitbox never registers twice against the same defender.
pub fn resolve_strike(attacker: &mut FighterState, defender: &FighterState) -> Option<HitOutcome> {
    let hurtbox = hurtbox_for(defender);
    let blocked = defender.state == PlayerState::Blocking;
    // Knockback pushes along the attacker's facing
    let direction = if attacker.facing_right { 1.0 } else { -1.0 };

    for hitbox in attacker.active_hitboxes.iter_mut() {
        if hitbox.consumed {
            continue;
        }
        let world = world_hitbox(hitbox, attacker.position, attacker.facing_right);
        if !world.overlaps(&hurtbox) {
            continue;
        }
        hitbox.consumed = true;

        let outcome = if blocked {
            // Chip damage on block: deliberate, not an omission
            let damage = (hitbox.damage * 0.25).round();
            HitOutcome {
                damage,
                hitstun_ticks: (hitbox.hitstun_ticks as f32 * 0.5).round() as u32,
                knockback: Vec2::new(direction * hitbox.knockback.x.abs() * 0.3, 0.0),
                knockdown: damage > 10.0,
                blocked: true,
            }
        } else {
            HitOutcome {
                damage: hitbox.damage,
                hitstun_ticks: hitbox.hitstun_ticks,
                knockback: Vec2::new(direction * hitbox.knockback.x.abs(), hitbox.knockback.y),
                knockdown: hitbox.damage > 10.0,
                blocked: false,
            }
        };
        return Some(outcome);
    }
    None
}
