//! Match record, registry, and the authoritative tick loop

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::matches::MatchStore;
use crate::util::time::{PERSIST_TPS, SIMULATION_TPS, SNAPSHOT_TPS};
use crate::ws::protocol::{
    ClientMsg, FighterKind, IntentStatus, MatchStatus, PlayerIntent, PlayerNumber, RawInput,
    ServerMsg, StageKind, Winner,
};

use super::{intent, physics, simulation};
use super::snapshot::SnapshotCadence;
use super::PlayerInput;

/// The authoritative match record, mirrored to the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: Uuid,
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    pub player1_fighter: FighterKind,
    pub player2_fighter: FighterKind,
    pub stage: StageKind,
    pub status: MatchStatus,
    pub snapshot: crate::ws::protocol::MatchSnapshot,
}

impl MatchRecord {
    pub fn new(
        id: Uuid,
        player1_id: Uuid,
        player2_id: Uuid,
        player1_fighter: FighterKind,
        player2_fighter: FighterKind,
        stage: StageKind,
    ) -> Self {
        Self {
            id,
            player1_id,
            player2_id,
            player1_fighter,
            player2_fighter,
            stage,
            status: MatchStatus::Active,
            snapshot: simulation::seeded_snapshot(),
        }
    }

    /// Which side a user occupies, if they are a participant at all
    pub fn player_number_of(&self, user_id: Uuid) -> Option<PlayerNumber> {
        if user_id == self.player1_id {
            Some(PlayerNumber::P1)
        } else if user_id == self.player2_id {
            Some(PlayerNumber::P2)
        } else {
            None
        }
    }

    /// The winning user's id once the match is terminal
    pub fn winner_id(&self) -> Option<Uuid> {
        match self.status {
            MatchStatus::P1Won => Some(self.player1_id),
            MatchStatus::P2Won => Some(self.player2_id),
            _ => None,
        }
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative game match: one task, one serialized state
/// machine. All intents funnel through its input channel, so the two
/// players' updates can never interleave against stale state.
pub struct GameMatch {
    record: MatchRecord,
    tick: u64,
    input_rx: mpsc::Receiver<PlayerInput>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    cadence: SnapshotCadence,
    store: MatchStore,
    p1_connected: bool,
    p2_connected: bool,
}

impl GameMatch {
    pub fn new(record: MatchRecord, store: MatchStore) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);

        let handle = MatchHandle {
            id: record.id,
            input_tx,
            snapshot_tx: snapshot_tx.clone(),
        };

        let snapshot_interval = SIMULATION_TPS / SNAPSHOT_TPS;
        let game_match = Self {
            record,
            tick: 0,
            input_rx,
            snapshot_tx,
            cadence: SnapshotCadence::new(snapshot_interval),
            store,
            p1_connected: true,
            p2_connected: true,
        };

        (game_match, handle)
    }

    /// Run the authoritative tick loop until the match ends
    pub async fn run(mut self) {
        info!(match_id = %self.record.id, "Match started");

        let tick_duration = Duration::from_micros(1_000_000 / SIMULATION_TPS as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let persist_interval = (SIMULATION_TPS / PERSIST_TPS) as u64;

        loop {
            tick_interval.tick().await;

            self.process_inputs();

            simulation::tick(&mut self.record.snapshot, 1.0);
            self.tick += 1;

            if self.record.snapshot.match_over {
                self.cadence.force_next();
            }

            if self.cadence.should_send() {
                let _ = self
                    .snapshot_tx
                    .send(self.cadence.build(self.tick, &self.record.snapshot));
            }

            if self.record.snapshot.match_over {
                break;
            }

            // A lone disconnect leaves the match running; the match
            // only folds when nobody is left to play it
            if !self.p1_connected && !self.p2_connected {
                info!(match_id = %self.record.id, "Both players left, ending match as draw");
                self.record.snapshot.match_over = true;
                self.record.snapshot.winner = Some(Winner::Draw);
                break;
            }

            if self.tick % persist_interval == 0 {
                let store = self.store.clone();
                let id = self.record.id;
                let snapshot = self.record.snapshot.clone();
                tokio::spawn(async move {
                    if let Err(err) = store.save_state(id, &snapshot).await {
                        warn!(match_id = %id, error = %err, "Failed to persist match state");
                    }
                });
            }
        }

        self.record.status = simulation::status_of(&self.record.snapshot);

        let _ = self.snapshot_tx.send(ServerMsg::MatchEnd {
            status: self.record.status,
            winner: self.record.snapshot.winner,
        });

        if let Err(err) = self.store.finalize(&self.record).await {
            warn!(match_id = %self.record.id, error = %err, "Failed to finalize match record");
        }

        info!(match_id = %self.record.id, status = ?self.record.status, "Match ended");
    }

    /// Drain all pending inputs from both players
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            let queued_ms = crate::util::time::unix_millis().saturating_sub(input.received_at);
            if queued_ms > 1_000 {
                warn!(
                    match_id = %self.record.id,
                    user_id = %input.user_id,
                    queued_ms,
                    "Input sat in channel unusually long"
                );
            }

            let Some(player) = self.record.player_number_of(input.user_id) else {
                let _ = self.snapshot_tx.send(ServerMsg::Error {
                    code: "not_in_match".to_string(),
                    message: "Not a participant of this match".to_string(),
                });
                continue;
            };

            match input.msg {
                ClientMsg::Intent { seq, intent } => {
                    self.handle_intent(player, seq, intent);
                }
                ClientMsg::Input { seq, input } => {
                    self.handle_raw_input(player, seq, input);
                }
                ClientMsg::TogglePause => {
                    self.handle_toggle_pause(input.user_id);
                }
                ClientMsg::Ping { t } => {
                    let _ = self.snapshot_tx.send(ServerMsg::Pong { t });
                }
                ClientMsg::LeaveMatch => {
                    self.handle_leave(input.user_id, player);
                }
            }
        }
    }

    /// Derive a structured intent from held buttons against the
    /// fighter's current situation, then admit it like any intent
    fn handle_raw_input(&mut self, player: PlayerNumber, seq: u32, input: RawInput) {
        let fighter = match player {
            PlayerNumber::P1 => &self.record.snapshot.fighter1,
            PlayerNumber::P2 => &self.record.snapshot.fighter2,
        };
        let derived =
            intent::derive_intent(input, fighter.state, physics::is_airborne(fighter.position));
        self.handle_intent(player, seq, derived);
    }

    fn handle_intent(&mut self, player: PlayerNumber, seq: u32, intent: PlayerIntent) {
        if self.record.snapshot.match_over || self.record.status.is_terminal() {
            let _ = self.snapshot_tx.send(ServerMsg::Error {
                code: "match_not_active".to_string(),
                message: "Match is no longer accepting intents".to_string(),
            });
            return;
        }

        let status = simulation::apply_intent(&mut self.record.snapshot, player, seq, intent);

        let _ = self.snapshot_tx.send(ServerMsg::IntentAck {
            player,
            seq,
            status,
        });

        // A stale submission gets an immediate authoritative snapshot
        // so the sender can re-sync its prediction
        if status == IntentStatus::Stale {
            self.cadence.force_next();
        }
    }

    fn handle_toggle_pause(&mut self, user_id: Uuid) {
        if self.record.snapshot.match_over {
            return;
        }
        self.record.snapshot.paused = !self.record.snapshot.paused;
        self.cadence.force_next();
        info!(
            match_id = %self.record.id,
            user_id = %user_id,
            paused = self.record.snapshot.paused,
            "Pause toggled"
        );
    }

    fn handle_leave(&mut self, user_id: Uuid, player: PlayerNumber) {
        let connected = match player {
            PlayerNumber::P1 => &mut self.p1_connected,
            PlayerNumber::P2 => &mut self.p2_connected,
        };
        if !*connected {
            return;
        }
        *connected = false;

        let _ = self.snapshot_tx.send(ServerMsg::PlayerLeft { user_id });

        info!(
            match_id = %self.record.id,
            user_id = %user_id,
            "Player left match"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::supabase::SupabaseClient;
    use crate::util::time::unix_millis;
    use crate::ws::protocol::MoveDirection;

    fn test_store() -> MatchStore {
        let config = crate::config::Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "info".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_service_role_key: "service".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            client_origin: "http://localhost:5173".to_string(),
        };
        MatchStore::new(SupabaseClient::new(&config))
    }

    fn test_match() -> (GameMatch, MatchHandle, Uuid, Uuid) {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let record = MatchRecord::new(
            Uuid::new_v4(),
            p1,
            p2,
            FighterKind::Brawler,
            FighterKind::Duelist,
            StageKind::Downtown,
        );
        let (game, handle) = GameMatch::new(record, test_store());
        (game, handle, p1, p2)
    }

    fn send(handle: &MatchHandle, user_id: Uuid, msg: ClientMsg) {
        handle
            .input_tx
            .try_send(PlayerInput {
                user_id,
                msg,
                received_at: unix_millis(),
            })
            .unwrap();
    }

    fn intent_msg(seq: u32) -> ClientMsg {
        ClientMsg::Intent {
            seq,
            intent: PlayerIntent {
                move_direction: MoveDirection::Right,
                ..Default::default()
            },
        }
    }

    #[test]
    fn record_resolves_participants() {
        let (game, _handle, p1, p2) = test_match();
        assert_eq!(game.record.player_number_of(p1), Some(PlayerNumber::P1));
        assert_eq!(game.record.player_number_of(p2), Some(PlayerNumber::P2));
        assert_eq!(game.record.player_number_of(Uuid::new_v4()), None);
    }

    #[test]
    fn winner_id_follows_terminal_status() {
        let (mut game, _handle, p1, _p2) = test_match();
        assert_eq!(game.record.winner_id(), None);
        game.record.status = MatchStatus::P1Won;
        assert_eq!(game.record.winner_id(), Some(p1));
        game.record.status = MatchStatus::Draw;
        assert_eq!(game.record.winner_id(), None);
    }

    #[test]
    fn intent_is_acked_then_replay_reads_stale() {
        let (mut game, handle, p1, _p2) = test_match();
        let mut rx = handle.snapshot_tx.subscribe();

        send(&handle, p1, intent_msg(1));
        game.process_inputs();
        match rx.try_recv().unwrap() {
            ServerMsg::IntentAck { player, seq, status } => {
                assert_eq!(player, PlayerNumber::P1);
                assert_eq!(seq, 1);
                assert_eq!(status, IntentStatus::Accepted);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        send(&handle, p1, intent_msg(1));
        game.process_inputs();
        match rx.try_recv().unwrap() {
            ServerMsg::IntentAck { status, .. } => assert_eq!(status, IntentStatus::Stale),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn raw_button_input_is_derived_and_admitted() {
        let (mut game, handle, p1, _p2) = test_match();
        let mut rx = handle.snapshot_tx.subscribe();

        send(
            &handle,
            p1,
            ClientMsg::Input {
                seq: 1,
                input: RawInput {
                    right: true,
                    crouch: true,
                    ..Default::default()
                },
            },
        );
        game.process_inputs();

        match rx.try_recv().unwrap() {
            ServerMsg::IntentAck { player, seq, status } => {
                assert_eq!(player, PlayerNumber::P1);
                assert_eq!(seq, 1);
                assert_eq!(status, IntentStatus::Accepted);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        // Grounded crouch reads as a block; the direction rides along
        let derived = game.record.snapshot.fighter1.intent;
        assert_eq!(derived.move_direction, MoveDirection::Right);
        assert!(derived.block);
        assert_eq!(game.record.snapshot.fighter1.last_processed_seq, 1);
    }

    #[test]
    fn non_participant_intent_is_rejected() {
        let (mut game, handle, _p1, _p2) = test_match();
        let mut rx = handle.snapshot_tx.subscribe();

        send(&handle, Uuid::new_v4(), intent_msg(1));
        game.process_inputs();
        match rx.try_recv().unwrap() {
            ServerMsg::Error { code, .. } => assert_eq!(code, "not_in_match"),
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(game.record.snapshot.fighter1.last_processed_seq, 0);
        assert_eq!(game.record.snapshot.fighter2.last_processed_seq, 0);
    }

    #[test]
    fn intent_after_match_end_is_rejected() {
        let (mut game, handle, p1, _p2) = test_match();
        game.record.snapshot.match_over = true;
        let mut rx = handle.snapshot_tx.subscribe();

        send(&handle, p1, intent_msg(1));
        game.process_inputs();
        match rx.try_recv().unwrap() {
            ServerMsg::Error { code, .. } => assert_eq!(code, "match_not_active"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn either_player_toggles_the_shared_pause() {
        let (mut game, handle, p1, p2) = test_match();

        send(&handle, p1, ClientMsg::TogglePause);
        game.process_inputs();
        assert!(game.record.snapshot.paused);

        send(&handle, p2, ClientMsg::TogglePause);
        game.process_inputs();
        assert!(!game.record.snapshot.paused);
    }

    #[test]
    fn leave_is_broadcast_and_tracked() {
        let (mut game, handle, p1, _p2) = test_match();
        let mut rx = handle.snapshot_tx.subscribe();

        send(&handle, p1, ClientMsg::LeaveMatch);
        game.process_inputs();
        assert!(!game.p1_connected);
        assert!(game.p2_connected);
        match rx.try_recv().unwrap() {
            ServerMsg::PlayerLeft { user_id } => assert_eq!(user_id, p1),
            other => panic!("unexpected message: {other:?}"),
        }

        // Repeated leave is a no-op
        send(&handle, p1, ClientMsg::LeaveMatch);
        game.process_inputs();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn registry_round_trip() {
        let registry = MatchRegistry::new();
        let (_game, handle, _p1, _p2) = test_match();
        let id = handle.id;

        registry.insert(handle);
        assert_eq!(registry.active_matches(), 1);
        assert!(registry.get(&id).is_some());
        assert!(registry.remove(&id).is_some());
        assert!(registry.get(&id).is_none());
    }
}
