//! Matchmaking service - queue processing and match creation

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::{GameMatch, MatchRecord, MatchRegistry, PlayerInput};
use crate::store::{MatchStore, PresenceStore, QueueStore};
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, MatchPlayer, ServerMsg};

use super::queue::{MatchQueue, QueueEntry};

/// How often the pairing loop scans the queue
const PAIRING_INTERVAL_MS: u64 = 500;

/// Player connection handle for routing messages
#[derive(Clone)]
pub struct PlayerConnection {
    pub user_id: Uuid,
    /// Channel to send inputs toward the player's current match
    pub input_tx: mpsc::Sender<PlayerInput>,
    /// Personal channel carrying match broadcasts and service messages
    pub msg_tx: broadcast::Sender<ServerMsg>,
}

/// Result of a queue join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Queued,
    /// Repeated join while queued is idempotent
    AlreadyQueued,
    /// Mid-match players are never offered new pairings
    AlreadyInMatch,
}

/// Matchmaking service
#[derive(Clone)]
pub struct MatchmakingService {
    queue: Arc<Mutex<MatchQueue>>,
    registry: Arc<MatchRegistry>,
    /// Connected players awaiting or in matches
    players: Arc<DashMap<Uuid, PlayerConnection>>,
    /// Map of player -> current match
    player_matches: Arc<DashMap<Uuid, Uuid>>,
    matches: MatchStore,
    presence: PresenceStore,
    queue_store: QueueStore,
}

impl MatchmakingService {
    pub fn new(
        registry: Arc<MatchRegistry>,
        matches: MatchStore,
        presence: PresenceStore,
        queue_store: QueueStore,
    ) -> Self {
        Self {
            queue: Arc::new(Mutex::new(MatchQueue::new())),
            registry,
            players: Arc::new(DashMap::new()),
            player_matches: Arc::new(DashMap::new()),
            matches,
            presence,
            queue_store,
        }
    }

    /// Register a player connection (called when WebSocket connects).
    /// Returns the personal channels the session reads and writes.
    pub fn register_player(
        &self,
        user_id: Uuid,
    ) -> (mpsc::Sender<PlayerInput>, broadcast::Receiver<ServerMsg>) {
        let (input_tx, mut input_rx) = mpsc::channel::<PlayerInput>(64);
        let (msg_tx, msg_rx) = broadcast::channel::<ServerMsg>(64);

        let connection = PlayerConnection {
            user_id,
            input_tx: input_tx.clone(),
            msg_tx: msg_tx.clone(),
        };
        self.players.insert(user_id, connection);

        // Route inputs from the personal channel to whatever match the
        // player currently belongs to
        let registry = self.registry.clone();
        let player_matches = self.player_matches.clone();
        tokio::spawn(async move {
            while let Some(input) = input_rx.recv().await {
                let match_id = player_matches.get(&user_id).map(|r| *r);
                if let Some(match_id) = match_id {
                    if let Some(handle) = registry.get(&match_id) {
                        if handle.input_tx.send(input).await.is_err() {
                            warn!(user_id = %user_id, "Failed to send input to match");
                        }
                    }
                }
            }
        });

        // Route match broadcasts to the personal channel
        let registry = self.registry.clone();
        let player_matches = self.player_matches.clone();
        let players = self.players.clone();
        let msg_tx_out = msg_tx.clone();
        tokio::spawn(async move {
            let mut current_match_id: Option<Uuid> = None;
            let mut current_rx: Option<broadcast::Receiver<ServerMsg>> = None;

            loop {
                if !players.contains_key(&user_id) {
                    break;
                }

                let new_match_id = player_matches.get(&user_id).map(|r| *r);
                if new_match_id != current_match_id {
                    current_match_id = new_match_id;
                    current_rx = new_match_id
                        .and_then(|mid| registry.get(&mid).map(|h| h.snapshot_tx.subscribe()));
                }

                if let Some(ref mut rx) = current_rx {
                    match rx.recv().await {
                        Ok(msg) => {
                            let _ = msg_tx_out.send(msg);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(user_id = %user_id, lagged = n, "Snapshot receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            current_rx = None;
                            current_match_id = None;
                        }
                    }
                } else {
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                }
            }
        });

        (input_tx, msg_rx)
    }

    /// Unregister a player (called when WebSocket disconnects).
    /// A running match is informed but keeps going.
    pub async fn unregister_player(&self, user_id: Uuid) {
        if let Some(match_id) = self.player_matches.get(&user_id).map(|r| *r) {
            if let Some(handle) = self.registry.get(&match_id) {
                let _ = handle
                    .input_tx
                    .send(PlayerInput {
                        user_id,
                        msg: ClientMsg::LeaveMatch,
                        received_at: unix_millis(),
                    })
                    .await;
            }
        }

        self.players.remove(&user_id);
        self.leave_queue(user_id).await;

        info!(user_id = %user_id, "Player unregistered from matchmaking");
    }

    /// Join the matchmaking queue
    pub async fn join_queue(&self, entry: QueueEntry) -> JoinOutcome {
        let user_id = entry.player_id;

        if self.player_matches.contains_key(&user_id) {
            return JoinOutcome::AlreadyInMatch;
        }

        let mut queue = self.queue.lock().await;
        if queue.contains(&user_id) {
            return JoinOutcome::AlreadyQueued;
        }

        let row = crate::store::queue::QueueRow {
            player_id: user_id,
            fighter: entry.fighter,
            stage: entry.stage,
        };
        queue.enqueue(entry);
        let queue_size = queue.len();
        drop(queue);

        let queue_store = self.queue_store.clone();
        let presence = self.presence.clone();
        tokio::spawn(async move {
            if let Err(err) = queue_store.add_entry(&row).await {
                warn!(user_id = %user_id, error = %err, "Failed to mirror queue entry");
            }
            if let Err(err) = presence.mark_queued(user_id).await {
                warn!(user_id = %user_id, error = %err, "Failed to update presence");
            }
        });

        info!(user_id = %user_id, queue_size, "Player joined matchmaking queue");
        JoinOutcome::Queued
    }

    /// Leave the matchmaking queue
    pub async fn leave_queue(&self, user_id: Uuid) {
        let removed = self.queue.lock().await.dequeue(user_id).is_some();
        if !removed {
            return;
        }

        let queue_store = self.queue_store.clone();
        let presence = self.presence.clone();
        tokio::spawn(async move {
            if let Err(err) = queue_store.remove_entry(user_id).await {
                warn!(user_id = %user_id, error = %err, "Failed to remove queue entry");
            }
            if let Err(err) = presence.mark_online(user_id).await {
                warn!(user_id = %user_id, error = %err, "Failed to update presence");
            }
        });
    }

    /// Pair the two oldest queued entries into a match
    async fn create_match(&self, first: QueueEntry, second: QueueEntry) {
        let waited_ms = first.wait_time().as_millis() as u64;

        // Stage tie-break favors whoever queued first
        let record = MatchRecord::new(
            Uuid::new_v4(),
            first.player_id,
            second.player_id,
            first.fighter,
            second.fighter,
            first.stage,
        );
        let match_id = record.id;

        if let Err(err) = self.matches.create_match(&record).await {
            warn!(match_id = %match_id, error = %err, "Failed to insert match record");
        }

        let player_ids = [record.player1_id, record.player2_id];
        let found = ServerMsg::MatchFound {
            match_id,
            player1: MatchPlayer {
                user_id: record.player1_id,
                fighter: record.player1_fighter,
            },
            player2: MatchPlayer {
                user_id: record.player2_id,
                fighter: record.player2_fighter,
            },
            stage: record.stage,
        };

        let (game, handle) = GameMatch::new(record, self.matches.clone());
        self.registry.insert(handle);

        for pid in player_ids {
            self.player_matches.insert(pid, match_id);
        }

        let queue_store = self.queue_store.clone();
        let presence = self.presence.clone();
        tokio::spawn(async move {
            for pid in player_ids {
                if let Err(err) = queue_store.remove_entry(pid).await {
                    warn!(user_id = %pid, error = %err, "Failed to remove queue entry");
                }
                if let Err(err) = presence.mark_in_match(pid, match_id).await {
                    warn!(user_id = %pid, error = %err, "Failed to update presence");
                }
            }
        });

        for pid in player_ids {
            if let Some(conn) = self.players.get(&pid) {
                let _ = conn.msg_tx.send(found.clone());
            }
        }

        info!(
            match_id = %match_id,
            player1 = %player_ids[0],
            player2 = %player_ids[1],
            waited_ms,
            "Created new match"
        );

        let registry = self.registry.clone();
        let player_matches = self.player_matches.clone();
        let presence = self.presence.clone();
        tokio::spawn(async move {
            game.run().await;

            registry.remove(&match_id);
            for pid in player_ids {
                player_matches.remove(&pid);
                if let Err(err) = presence.mark_online(pid).await {
                    warn!(user_id = %pid, error = %err, "Failed to update presence");
                }
            }

            info!(match_id = %match_id, "Match removed from registry");
        });
    }

    /// Run the matchmaking service (periodic queue processing).
    /// Only players with a live connection are paired; everyone else
    /// keeps their place in line.
    pub async fn run(&self) {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_millis(PAIRING_INTERVAL_MS));

        loop {
            interval.tick().await;

            let pairs = {
                let mut queue = self.queue.lock().await;
                let mut pairs = Vec::new();
                while let Some(pair) =
                    queue.try_pair_where(|e| self.players.contains_key(&e.player_id))
                {
                    pairs.push(pair);
                }
                pairs
            };

            for (first, second) in pairs {
                self.create_match(first, second).await;
            }
        }
    }

    /// Get current queue size
    pub async fn queue_size(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Check if player is in queue
    pub async fn is_in_queue(&self, user_id: &Uuid) -> bool {
        self.queue.lock().await.contains(user_id)
    }

    /// Get player's current match ID
    pub fn get_player_match(&self, user_id: &Uuid) -> Option<Uuid> {
        self.player_matches.get(user_id).map(|r| *r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{FighterKind, StageKind};

    fn test_service() -> MatchmakingService {
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
        let supabase = crate::store::SupabaseClient::new(&config);
        MatchmakingService::new(
            Arc::new(MatchRegistry::new()),
            MatchStore::new(supabase.clone()),
            PresenceStore::new(supabase.clone()),
            QueueStore::new(supabase),
        )
    }

    fn entry(id: Uuid) -> QueueEntry {
        QueueEntry::new(id, FighterKind::Brawler, StageKind::Downtown)
    }

    #[test]
    fn queue_join_is_idempotent() {
        tokio_test::block_on(async {
            let svc = test_service();
            let id = Uuid::new_v4();

            assert_eq!(svc.join_queue(entry(id)).await, JoinOutcome::Queued);
            assert_eq!(svc.join_queue(entry(id)).await, JoinOutcome::AlreadyQueued);
            assert_eq!(svc.queue_size().await, 1);
        });
    }

    #[test]
    fn mid_match_player_is_not_requeued() {
        tokio_test::block_on(async {
            let svc = test_service();
            let id = Uuid::new_v4();
            let match_id = Uuid::new_v4();
            svc.player_matches.insert(id, match_id);

            assert_eq!(svc.join_queue(entry(id)).await, JoinOutcome::AlreadyInMatch);
            assert!(!svc.is_in_queue(&id).await);
            assert_eq!(svc.get_player_match(&id), Some(match_id));
        });
    }

    #[test]
    fn cancel_removes_from_queue() {
        tokio_test::block_on(async {
            let svc = test_service();
            let id = Uuid::new_v4();

            svc.join_queue(entry(id)).await;
            assert!(svc.is_in_queue(&id).await);

            svc.leave_queue(id).await;
            assert!(!svc.is_in_queue(&id).await);

            // Cancelling again is a no-op
            svc.leave_queue(id).await;
            assert_eq!(svc.queue_size().await, 0);
        });
    }
}
