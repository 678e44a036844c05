//! Per-match state container.
//!
//! A [`Match`] owns the mutable record of one two-player contest behind a
//! single lock. Callers never touch the fields directly: every read or write
//! goes through one of the short, atomic operations below, and none of them
//! awaits anything other than the lock itself, so the lock is never held
//! across network I/O or sleeps.

use log::info;
use pong_shared::{
    clamp_name, starting_ball, Rect, Slot, Snapshot, Vec2, BALL_START_VELOCITY,
    COUNTDOWN_START,
};
use thiserror::Error;
use tokio::sync::Mutex;

pub type MatchId = u32;

#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("match {0} is no longer active")]
    Closed(MatchId),
    #[error("match {0} already has two players")]
    Full(MatchId),
}

/// Ball and paddle positions handed to the simulation for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub ball: Rect,
    pub velocity: Vec2,
    pub paddles: [Rect; 2],
}

/// What the simulation should do on the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickStatus {
    /// The match was retired; the loop must exit.
    Retired,
    /// Waiting for the countdown or for a rematch.
    Idle,
    Running(Frame),
}

/// Result of one countdown step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountdownStep {
    /// The match was retired before the countdown finished.
    Aborted,
    /// Seconds still remaining.
    Counting(u32),
    /// Countdown reached zero and the round is live.
    Started,
}

#[derive(Debug, Clone)]
struct MatchState {
    paddles: [Rect; 2],
    ball: Rect,
    velocity: Vec2,
    winner: Option<Slot>,
    countdown: u32,
    started: bool,
    player_names: [String; 2],
    connected_players: u8,
    rematch_votes: u8,
    active: bool,
    player_left: bool,
    /// Set while a countdown coordinator owns the current (re)start.
    countdown_running: bool,
    /// Which slots already voted for a rematch this round.
    voted: [bool; 2],
}

impl MatchState {
    fn new() -> Self {
        Self {
            paddles: [Slot::Bottom.starting_paddle(), Slot::Top.starting_paddle()],
            ball: starting_ball(),
            velocity: BALL_START_VELOCITY,
            winner: None,
            countdown: COUNTDOWN_START,
            started: false,
            player_names: [String::new(), String::new()],
            connected_players: 0,
            rematch_votes: 0,
            active: true,
            player_left: false,
            countdown_running: false,
            voted: [false; 2],
        }
    }

    fn reset_round(&mut self) {
        self.paddles = [Slot::Bottom.starting_paddle(), Slot::Top.starting_paddle()];
        self.ball = starting_ball();
        self.velocity = BALL_START_VELOCITY;
        self.winner = None;
        self.started = false;
        self.countdown = COUNTDOWN_START;
        self.rematch_votes = 0;
        self.voted = [false; 2];
    }
}

#[derive(Debug)]
pub struct Match {
    id: MatchId,
    state: Mutex<MatchState>,
}

impl Match {
    pub fn new(id: MatchId) -> Self {
        Self {
            id,
            state: Mutex::new(MatchState::new()),
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Independent copy of every client-visible field at one instant.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        Snapshot {
            match_id: self.id,
            paddles: state.paddles,
            ball: state.ball,
            velocity: state.velocity,
            winner: state.winner,
            started: state.started,
            countdown: state.countdown,
            player_names: state.player_names.clone(),
            connected_players: state.connected_players,
            rematch_votes: state.rematch_votes,
            active: state.active,
            player_left: state.player_left,
        }
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    /// Records a player's name and counts them as connected.
    ///
    /// Names longer than `MAX_NAME_LEN` characters are cut short, so every
    /// snapshot of the match stays within one frame.
    ///
    /// Returns `true` when this registration filled the match and the caller
    /// now owns spawning the countdown for it.
    pub async fn register_player(&self, slot: Slot, name: &str) -> Result<bool, MatchError> {
        let mut state = self.state.lock().await;
        if !state.active {
            return Err(MatchError::Closed(self.id));
        }
        if state.connected_players >= 2 {
            return Err(MatchError::Full(self.id));
        }

        state.player_names[slot.index()] = clamp_name(name).to_string();
        state.connected_players += 1;

        let start_countdown =
            state.connected_players == 2 && !state.started && !state.countdown_running;
        if start_countdown {
            state.countdown_running = true;
        }
        Ok(start_countdown)
    }

    /// Moves a slot's paddle horizontally. Only `x` is taken from the client;
    /// the paddle keeps its row and size.
    pub async fn update_paddle(&self, slot: Slot, paddle: Rect) {
        let mut state = self.state.lock().await;
        let current = state.paddles[slot.index()];
        state.paddles[slot.index()] = current.moved_to(paddle.x, current.y);
    }

    /// Counts a rematch vote from `slot`.
    ///
    /// Votes only count once a winner is set and at most once per slot per
    /// round. Returns the new vote count, or `None` if the vote was ignored.
    pub async fn vote_rematch(&self, slot: Slot) -> Option<u8> {
        let mut state = self.state.lock().await;
        if state.winner.is_none() || state.voted[slot.index()] {
            return None;
        }

        state.voted[slot.index()] = true;
        state.rematch_votes += 1;
        Some(state.rematch_votes)
    }

    /// Starts a new round: ball, paddles, countdown and votes go back to their
    /// initial values while names, connection count and `active` are kept.
    ///
    /// Returns `true` when the caller should spawn the countdown for the new round.
    pub async fn reset(&self) -> bool {
        let mut state = self.state.lock().await;
        state.reset_round();

        if state.countdown_running {
            return false;
        }
        state.countdown_running = true;
        true
    }

    pub async fn mark_player_left(&self) {
        self.state.lock().await.player_left = true;
    }

    /// Returns the number of players still connected.
    pub async fn decrement_connected(&self) -> u8 {
        let mut state = self.state.lock().await;
        state.connected_players = state.connected_players.saturating_sub(1);
        state.connected_players
    }

    /// Retires the match once nobody is connected.
    ///
    /// Returns `true` only for the call that performed the retirement.
    pub async fn deactivate(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.active || state.connected_players > 0 {
            return false;
        }

        state.active = false;
        info!("Match {} retired - no players connected", self.id);
        true
    }

    /// Advances the countdown by one step.
    pub async fn countdown_step(&self) -> CountdownStep {
        let mut state = self.state.lock().await;
        if !state.active {
            state.countdown_running = false;
            return CountdownStep::Aborted;
        }

        state.countdown = state.countdown.saturating_sub(1);
        if state.countdown == 0 {
            state.started = true;
            state.countdown_running = false;
            CountdownStep::Started
        } else {
            CountdownStep::Counting(state.countdown)
        }
    }

    /// Reads what the simulation needs for the next tick.
    pub async fn tick_status(&self) -> TickStatus {
        let state = self.state.lock().await;
        if !state.active {
            TickStatus::Retired
        } else if !state.started || state.winner.is_some() {
            TickStatus::Idle
        } else {
            TickStatus::Running(Frame {
                ball: state.ball,
                velocity: state.velocity,
                paddles: state.paddles,
            })
        }
    }

    /// Writes back the result of a simulation tick.
    ///
    /// Ignored unless the round is still live, so a winner can only ever be
    /// recorded while the match is started. Returns `true` if this commit set
    /// the winner.
    pub async fn commit_tick(&self, ball: Rect, velocity: Vec2, winner: Option<Slot>) -> bool {
        let mut state = self.state.lock().await;
        if !state.active || !state.started || state.winner.is_some() {
            return false;
        }

        state.ball = ball;
        state.velocity = velocity;
        state.winner = winner;
        winner.is_some()
    }
}
