//! Pairing of incoming connections into two-player matches
//!
//! The matchmaker keeps a FIFO queue of matches that are still waiting for
//! their second player. A new connection either takes the top slot of the
//! oldest waiting match or opens a fresh match in the bottom slot. Opening a
//! match also starts its simulation loop, which idles until the countdown
//! started by the second registration flips the match to running.
//!
//! The queue has its own lock, separate from every match's lock, so pairing
//! contention only grows with the number of simultaneous connect attempts.

use crate::config::MatchSettings;
use crate::game::{Match, MatchId};
use crate::simulation;
use log::info;
use pong_shared::Slot;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Hands out match seats to new connections
///
/// Only matches short one player are tracked here. Once a match is full it is
/// owned by its sessions and its simulation loop, and it is dropped when all
/// of them have exited.
pub struct Matchmaker {
    /// Matches waiting for a second player, oldest first
    waiting: Mutex<VecDeque<Arc<Match>>>,
    /// Next identifier handed to a newly opened match
    next_match_id: AtomicU32,
    /// Timing every opened match runs with
    settings: MatchSettings,
}

impl Matchmaker {
    /// Creates a matchmaker with an empty queue
    ///
    /// Match identifiers start from 1 and increment for each new match.
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            waiting: Mutex::new(VecDeque::new()),
            next_match_id: AtomicU32::new(1),
            settings,
        }
    }

    pub fn settings(&self) -> MatchSettings {
        self.settings
    }

    /// Assigns a seat to a new connection
    ///
    /// Pops the oldest waiting match and returns its top slot. Matches that
    /// were retired while waiting (their only player left) are discarded on
    /// the way. If nothing is waiting, opens a new match, queues it, starts
    /// its simulation and returns its bottom slot.
    pub async fn pair(&self) -> (Arc<Match>, Slot) {
        let mut waiting = self.waiting.lock().await;

        while let Some(game) = waiting.pop_front() {
            if game.is_active().await {
                info!("Adding player to match {}", game.id());
                return (game, Slot::Top);
            }
            info!("Discarding retired match {} from the queue", game.id());
        }

        let id = self.next_match_id.fetch_add(1, Ordering::Relaxed);
        let game = Arc::new(Match::new(id));
        waiting.push_back(Arc::clone(&game));
        info!("Creating new match {}", id);

        simulation::spawn(Arc::clone(&game), self.settings.tick);
        (game, Slot::Bottom)
    }

    /// Drops a match from the waiting queue
    ///
    /// Called when a match is retired so the queue does not keep it alive.
    /// Returns true if the match was still queued.
    pub async fn forget(&self, id: MatchId) -> bool {
        let mut waiting = self.waiting.lock().await;
        let before = waiting.len();
        waiting.retain(|game| game.id() != id);
        before != waiting.len()
    }

    /// Number of matches currently waiting for a second player
    pub async fn waiting_len(&self) -> usize {
        self.waiting.lock().await.len()
    }
}
