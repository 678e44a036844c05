//! Fixed-tick simulation loop, one per match.

use crate::game::{Match, TickStatus};
use crate::physics;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Spawns the simulation loop for `game` on the runtime.
pub fn spawn(game: Arc<Match>, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(run(game, tick))
}

/// Ticks the match until it is retired.
///
/// Ticks where the round has not started, or already has a winner, leave the
/// state untouched. Tick spacing is best effort: late ticks are skipped
/// rather than bunched up.
pub async fn run(game: Arc<Match>, tick: Duration) {
    info!("Starting simulation for match {}", game.id());

    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks: u64 = 0;

    loop {
        ticker.tick().await;

        let frame = match game.tick_status().await {
            TickStatus::Retired => break,
            TickStatus::Idle => continue,
            TickStatus::Running(frame) => frame,
        };

        let outcome = physics::step(&frame);
        ticks += 1;

        if game
            .commit_tick(outcome.ball, outcome.velocity, outcome.winner)
            .await
        {
            if let Some(winner) = outcome.winner {
                info!(
                    "Match {}: player {} won after {} ticks",
                    game.id(),
                    winner.index() + 1,
                    ticks
                );
            }
            ticks = 0;
        } else if ticks % 600 == 0 {
            debug!(
                "Match {}: tick {}, ball at ({:.1}, {:.1}) moving ({:.2}, {:.2})",
                game.id(),
                ticks,
                outcome.ball.x,
                outcome.ball.y,
                outcome.velocity.x,
                outcome.velocity.y
            );
        }
    }

    info!("Closing simulation for match {}", game.id());
}
