//! Simulation core - one fixed-size tick over a match snapshot
//!
//! The ordering inside `tick` is load-bearing: intent -> state ->
//! physics -> collision -> clock. Collision must see positions already
//! advanced this tick so hits register where fighters end up, not
//! where they started.

use crate::game::{combat, fighter, physics};
use crate::util::time::tick_seconds;
use crate::ws::protocol::{
    IntentStatus, MatchSnapshot, MatchStatus, PlayerIntent, PlayerNumber, Winner,
};

/// P1's seeded x; P2 mirrors it from the right stage edge
pub const P1_START_X: f32 = 100.0;

/// Fresh snapshot for a newly formed match: mirrored starting
/// positions, full health, full timer.
pub fn seeded_snapshot() -> MatchSnapshot {
    MatchSnapshot {
        fighter1: fighter::spawn_fighter(P1_START_X, true),
        fighter2: fighter::spawn_fighter(
            physics::STAGE_WIDTH - P1_START_X - physics::FIGHTER_WIDTH,
            false,
        ),
        timer: physics::STARTING_TIMER_SECS,
        paused: false,
        match_over: false,
        winner: None,
    }
}

/// Admit a sequenced intent into the snapshot.
///
/// Intents at or below the player's last processed sequence number
/// are replays or late arrivals: acknowledged as stale with no state
/// mutation, so resubmission is idempotent.
pub fn apply_intent(
    snapshot: &mut MatchSnapshot,
    player: PlayerNumber,
    seq: u32,
    intent: PlayerIntent,
) -> IntentStatus {
    let fighter = match player {
        PlayerNumber::P1 => &mut snapshot.fighter1,
        PlayerNumber::P2 => &mut snapshot.fighter2,
    };
    if seq <= fighter.last_processed_seq {
        return IntentStatus::Stale;
    }
    fighter.last_processed_seq = seq;
    fighter.intent = intent;
    IntentStatus::Accepted
}

/// Advance the match by `dt` ticks.
///
/// While paused or after match end the snapshot is frozen entirely,
/// timer included.
pub fn tick(snapshot: &mut MatchSnapshot, dt: f32) {
    if snapshot.paused || snapshot.match_over {
        return;
    }

    fighter::tick_timers(&mut snapshot.fighter1);
    fighter::tick_timers(&mut snapshot.fighter2);

    // Facing is derived, never client-supplied
    let (x1, x2) = (snapshot.fighter1.position.x, snapshot.fighter2.position.x);
    fighter::face_opponent(&mut snapshot.fighter1, x2);
    fighter::face_opponent(&mut snapshot.fighter2, x1);

    fighter::apply_intent(&mut snapshot.fighter1);
    fighter::apply_intent(&mut snapshot.fighter2);

    for f in [&mut snapshot.fighter1, &mut snapshot.fighter2] {
        let out = physics::integrate(f.position, f.velocity, dt);
        f.position = out.position;
        f.velocity = out.velocity;
        if out.landed {
            fighter::land(f);
        }
    }

    // Mutual hits resolve against the pre-hit states, so trading on
    // the same tick damages both fighters
    let pre1 = snapshot.fighter1.clone();
    let pre2 = snapshot.fighter2.clone();
    let hit_on_2 = combat::resolve_strike(&mut snapshot.fighter1, &pre2);
    let hit_on_1 = combat::resolve_strike(&mut snapshot.fighter2, &pre1);
    if let Some(out) = hit_on_2 {
        fighter::take_hit(&mut snapshot.fighter2, &out);
    }
    if let Some(out) = hit_on_1 {
        fighter::take_hit(&mut snapshot.fighter1, &out);
    }

    snapshot.timer = (snapshot.timer - dt * tick_seconds()).max(0.0);
    if snapshot.timer <= 0.0 {
        snapshot.match_over = true;
        snapshot.winner = Some(timer_winner(snapshot));
    }

    // Knockout overrides a timer result landed in the same tick
    if snapshot.fighter1.health <= 0.0 || snapshot.fighter2.health <= 0.0 {
        snapshot.match_over = true;
        snapshot.winner = Some(if snapshot.fighter1.health <= 0.0 {
            Winner::P2
        } else {
            Winner::P1
        });
    }
}

fn timer_winner(snapshot: &MatchSnapshot) -> Winner {
    if snapshot.fighter1.health > snapshot.fighter2.health {
        Winner::P1
    } else if snapshot.fighter2.health > snapshot.fighter1.health {
        Winner::P2
    } else {
        Winner::Draw
    }
}

/// Lifecycle status implied by a snapshot
pub fn status_of(snapshot: &MatchSnapshot) -> MatchStatus {
    if !snapshot.match_over {
        return MatchStatus::Active;
    }
    match snapshot.winner {
        Some(Winner::P1) => MatchStatus::P1Won,
        Some(Winner::P2) => MatchStatus::P2Won,
        _ => MatchStatus::Draw,
    }
}
