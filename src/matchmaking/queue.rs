//! FIFO matchmaking queue

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::ws::protocol::{FighterKind, StageKind};

/// Player in the matchmaking queue
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub player_id: Uuid,
    pub fighter: FighterKind,
    pub stage: StageKind,
    pub joined_at: Instant,
}

impl QueueEntry {
    pub fn new(player_id: Uuid, fighter: FighterKind, stage: StageKind) -> Self {
        Self {
            player_id,
            fighter,
            stage,
            joined_at: Instant::now(),
        }
    }

    /// How long this player has been waiting
    pub fn wait_time(&self) -> Duration {
        self.joined_at.elapsed()
    }
}

/// The matchmaking queue. Strictly FIFO: the two oldest entries pair
/// first, and the older entry's chosen stage is used for both.
pub struct MatchQueue {
    queue: VecDeque<QueueEntry>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Add a player to the queue. Re-joining while already queued is
    /// a no-op that keeps the original position, so retried requests
    /// cannot push a player to the back of the line.
    pub fn enqueue(&mut self, entry: QueueEntry) {
        if self.contains(&entry.player_id) {
            return;
        }
        self.queue.push_back(entry);
    }

    /// Remove a player from the queue
    pub fn dequeue(&mut self, player_id: Uuid) -> Option<QueueEntry> {
        let pos = self.queue.iter().position(|e| e.player_id == player_id)?;
        self.queue.remove(pos)
    }

    /// Check if a player is in the queue
    pub fn contains(&self, player_id: &Uuid) -> bool {
        self.queue.iter().any(|e| &e.player_id == player_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop the two oldest entries for pairing
    pub fn try_pair(&mut self) -> Option<(QueueEntry, QueueEntry)> {
        if self.queue.len() < 2 {
            return None;
        }
        let first = self.queue.pop_front()?;
        let second = self.queue.pop_front()?;
        Some((first, second))
    }

    /// Pop the two oldest entries satisfying `eligible`, preserving
    /// everyone else's position. Used to pair only players with a
    /// live connection.
    pub fn try_pair_where<F>(&mut self, eligible: F) -> Option<(QueueEntry, QueueEntry)>
    where
        F: Fn(&QueueEntry) -> bool,
    {
        let mut picked = Vec::with_capacity(2);
        for (idx, entry) in self.queue.iter().enumerate() {
            if eligible(entry) {
                picked.push(idx);
                if picked.len() == 2 {
                    break;
                }
            }
        }
        if picked.len() < 2 {
            return None;
        }
        // Remove back-to-front so the first index stays valid
        let second = self.queue.remove(picked[1])?;
        let first = self.queue.remove(picked[0])?;
        Some((first, second))
    }
}

impl Default for MatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: Uuid) -> QueueEntry {
        QueueEntry::new(id, FighterKind::Brawler, StageKind::Downtown)
    }

    #[test]
    fn pairs_the_two_oldest_first() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut queue = MatchQueue::new();
        queue.enqueue(entry(a));
        queue.enqueue(entry(b));
        queue.enqueue(entry(c));

        let (first, second) = queue.try_pair().unwrap();
        assert_eq!(first.player_id, a);
        assert_eq!(second.player_id, b);
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(&c));
    }

    #[test]
    fn single_entry_does_not_pair() {
        let mut queue = MatchQueue::new();
        queue.enqueue(entry(Uuid::new_v4()));
        assert!(queue.try_pair().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn cancel_removes_exactly_that_entry() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut queue = MatchQueue::new();
        queue.enqueue(entry(a));
        queue.enqueue(entry(b));

        let removed = queue.dequeue(a).unwrap();
        assert_eq!(removed.player_id, a);
        assert!(!queue.contains(&a));
        assert!(queue.contains(&b));
        assert!(queue.dequeue(a).is_none());
    }

    #[test]
    fn rejoin_keeps_original_position() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut queue = MatchQueue::new();
        queue.enqueue(entry(a));
        queue.enqueue(entry(b));
        queue.enqueue(entry(a));

        assert_eq!(queue.len(), 2);
        let (first, _) = queue.try_pair().unwrap();
        assert_eq!(first.player_id, a);
    }

    #[test]
    fn pair_where_skips_ineligible_entries() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut queue = MatchQueue::new();
        queue.enqueue(entry(a));
        queue.enqueue(entry(b));
        queue.enqueue(entry(c));

        let (first, second) = queue.try_pair_where(|e| e.player_id != b).unwrap();
        assert_eq!(first.player_id, a);
        assert_eq!(second.player_id, c);
        // The skipped player keeps their place in line
        assert!(queue.contains(&b));
        assert_eq!(queue.len(), 1);
    }
}
