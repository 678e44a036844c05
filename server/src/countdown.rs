//! Pre-round countdown, one run per (re)start of a match.

use crate::game::{CountdownStep, Match};
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub fn spawn(game: Arc<Match>, step: Duration) -> JoinHandle<CountdownStep> {
    tokio::spawn(run(game, step))
}

/// Counts the match down one step per `step` until the round starts.
///
/// Returns early with `CountdownStep::Aborted` if the match is retired first.
pub async fn run(game: Arc<Match>, step: Duration) -> CountdownStep {
    info!("Starting countdown for match {}", game.id());

    loop {
        sleep(step).await;

        match game.countdown_step().await {
            CountdownStep::Counting(remaining) => {
                info!("Match {}: countdown = {}", game.id(), remaining);
            }
            CountdownStep::Started => {
                info!("Match {}: round started", game.id());
                return CountdownStep::Started;
            }
            CountdownStep::Aborted => {
                info!("Countdown for match {} aborted", game.id());
                return CountdownStep::Aborted;
            }
        }
    }
}
