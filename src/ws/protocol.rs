//! WebSocket protocol message definitions
//! These are the wire types for client-server communication, and the
//! data model exchanged as the unit of authority between server and
//! clients (`MatchSnapshot`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 2D scalar pair for positions and velocities
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Discrete fighter state; exactly one is active per player per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    #[default]
    Idle,
    Walking,
    Jumping,
    Attacking,
    Blocking,
    Hit,
    KnockedDown,
}

/// Selectable fighters. Simulation constants are identical for every
/// fighter; the kind is carried through queueing and match records as
/// selection data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FighterKind {
    #[default]
    Brawler,
    Duelist,
    Juggernaut,
    Phantom,
    Volt,
}

/// Selectable stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    #[default]
    Downtown,
    Rooftop,
    Harbor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Left,
    Right,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalIntent {
    Jump,
    Crouch,
    #[default]
    None,
}

/// Attack strengths, weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Light,
    Medium,
    Heavy,
    Special,
}

/// Held buttons for one input sample, as thin clients report them.
/// Omitted buttons deserialize as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub crouch: bool,
    pub light: bool,
    pub medium: bool,
    pub heavy: bool,
    pub special: bool,
}

/// One structured input sample for one tick. Immutable once submitted;
/// the associated sequence number travels in `ClientMsg::Intent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerIntent {
    pub move_direction: MoveDirection,
    pub vertical: VerticalIntent,
    pub attack: Option<AttackKind>,
    pub block: bool,
}

/// Spatial region an attack can damage from, owned by the attacker for
/// the attack's active window. Offsets are attacker-relative and
/// mirrored around the fighter's own width when facing left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub offset: Vec2,
    pub width: f32,
    pub height: f32,
    pub damage: f32,
    pub kind: AttackKind,
    pub hitstun_ticks: u32,
    pub knockback: Vec2,
    /// A hitbox registers at most one hit per activation
    pub consumed: bool,
}

/// Which side of the match a player occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerNumber {
    P1,
    P2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    P1,
    P2,
    Draw,
}

/// Per-player authoritative runtime state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterState {
    pub position: Vec2,
    pub velocity: Vec2,
    /// 0-100, clamped; 0 is terminal for this match
    pub health: f32,
    pub state: PlayerState,
    pub facing_right: bool,
    pub active_hitboxes: Vec<Hitbox>,
    /// Most recently accepted intent, consumed every tick
    pub intent: PlayerIntent,
    /// Monotonic replay guard; intents at or below this are stale
    pub last_processed_seq: u32,
    /// Ticks until the current attack window closes
    pub attack_ticks_left: u32,
    /// Ticks until hit/knockdown stun releases
    pub stun_ticks_left: u32,
}

/// The unit of authority exchanged between server and clients.
/// Mutated once per tick by the simulation; frozen once `match_over`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub fighter1: FighterState,
    pub fighter2: FighterState,
    /// Seconds remaining, counts down from 99, clamped at 0
    pub timer: f32,
    pub paused: bool,
    pub match_over: bool,
    pub winner: Option<Winner>,
}

/// Match lifecycle status; transitions are one-directional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    Active,
    P1Won,
    P2Won,
    Draw,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::P1Won | Self::P2Won | Self::Draw)
    }
}

/// Outcome of an intent submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Accepted,
    Stale,
}

/// Player identity as carried in match-found notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub user_id: Uuid,
    pub fighter: FighterKind,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Structured intent for one tick, with its sequence number
    Intent {
        /// Per-player per-match monotonic sequence number
        seq: u32,
        intent: PlayerIntent,
    },

    /// Raw held-button sample; the server derives the intent from the
    /// fighter's current situation
    Input { seq: u32, input: RawInput },

    /// Toggle the shared pause flag (either player may)
    TogglePause,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave current match
    LeaveMatch,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { user_id: Uuid, server_time: u64 },

    /// A match was formed for this player
    MatchFound {
        match_id: Uuid,
        player1: MatchPlayer,
        player2: MatchPlayer,
        stage: StageKind,
    },

    /// Acknowledgement of an intent submission. Stale submissions are
    /// acknowledged without mutation and followed by an immediate
    /// snapshot broadcast so the sender can re-sync.
    IntentAck {
        player: PlayerNumber,
        seq: u32,
        status: IntentStatus,
    },

    /// Authoritative state push; local prediction is overwritten with
    /// this payload (hard overwrite, no rollback)
    Snapshot {
        /// Server tick number
        tick: u64,
        status: MatchStatus,
        snapshot: MatchSnapshot,
    },

    /// Match reached a terminal status
    MatchEnd {
        status: MatchStatus,
        winner: Option<Winner>,
    },

    /// A participant left mid-match; the match keeps running
    PlayerLeft { user_id: Uuid },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_round_trips_as_snake_case() {
        let msg = ClientMsg::Intent {
            seq: 7,
            intent: PlayerIntent {
                move_direction: MoveDirection::Left,
                vertical: VerticalIntent::Jump,
                attack: Some(AttackKind::Light),
                block: false,
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"intent\""));
        assert!(json.contains("\"left\""));
        let back: ClientMsg = serde_json::from_str(&json).unwrap();
        assert_eq!(format!("{:?}", back), format!("{:?}", msg));
    }

    #[test]
    fn raw_input_accepts_sparse_button_maps() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"input","seq":3,"input":{"right":true,"light":true}}"#)
                .unwrap();
        match msg {
            ClientMsg::Input { seq, input } => {
                assert_eq!(seq, 3);
                assert!(input.right && input.light);
                assert!(!input.left && !input.jump && !input.crouch);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn match_status_terminal_states() {
        assert!(!MatchStatus::Waiting.is_terminal());
        assert!(!MatchStatus::Active.is_terminal());
        assert!(MatchStatus::P1Won.is_terminal());
        assert!(MatchStatus::P2Won.is_terminal());
        assert!(MatchStatus::Draw.is_terminal());
    }

    #[test]
    fn status_serializes_with_db_names() {
        assert_eq!(
            serde_json::to_string(&MatchStatus::P1Won).unwrap(),
            "\"p1_won\""
        );
        assert_eq!(serde_json::to_string(&MatchStatus::Draw).unwrap(), "\"draw\"");
    }
}
