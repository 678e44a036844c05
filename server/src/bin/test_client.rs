//! Headless client that plays a match against the server.
//!
//! Follows the ball with its paddle at a capped speed, answers every snapshot
//! with exactly one packet and can vote for a rematch when a round ends.

use clap::Parser;
use log::{info, warn};
use pong_shared::{
    read_packet, write_packet, Packet, ProtocolError, Rect, Slot, Snapshot, FIELD_WIDTH,
};
use rand::Rng;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval, MissedTickBehavior};

/// Horizontal distance the bot's paddle may cover per frame.
const PADDLE_SPEED: f32 = 9.0;
/// Largest offset between the paddle's aim point and the ball's centre.
const MAX_AIM_ERROR: f32 = 50.0;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5555")]
    server: String,

    /// Display name sent during the handshake
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Vote for a rematch whenever a round ends
    #[arg(short = 'r', long)]
    rematch: bool,
}

struct Bot {
    slot: Slot,
    paddle: Rect,
    aim_error: f32,
    voted: bool,
    announced_winner: bool,
}

impl Bot {
    fn new(slot: Slot) -> Self {
        Self {
            slot,
            paddle: slot.starting_paddle(),
            aim_error: rand::thread_rng().gen_range(-MAX_AIM_ERROR..MAX_AIM_ERROR),
            voted: false,
            announced_winner: false,
        }
    }

    /// Picks the reply to one snapshot.
    fn respond(&mut self, snapshot: &Snapshot, rematch: bool) -> Packet {
        if let Some(winner) = snapshot.winner {
            if !self.announced_winner {
                self.announced_winner = true;
                if winner == self.slot {
                    info!("Won against {}", snapshot.name(self.slot.opponent()));
                } else {
                    info!("Lost against {}", snapshot.name(self.slot.opponent()));
                }
            }
            if rematch && !self.voted {
                self.voted = true;
                return Packet::PlayAgain;
            }
            return Packet::PaddleMoved {
                paddle: self.paddle,
            };
        }

        if self.announced_winner {
            // A new round began.
            self.announced_winner = false;
            self.voted = false;
            self.paddle = self.slot.starting_paddle();
            self.aim_error = rand::thread_rng().gen_range(-MAX_AIM_ERROR..MAX_AIM_ERROR);
        }

        let ball_center = snapshot.ball.x + snapshot.ball.width / 2.0;
        let target = ball_center + self.aim_error - self.paddle.width / 2.0;
        let delta = (target - self.paddle.x).clamp(-PADDLE_SPEED, PADDLE_SPEED);
        self.paddle.x = (self.paddle.x + delta).clamp(0.0, FIELD_WIDTH - self.paddle.width);

        Packet::PaddleMoved {
            paddle: self.paddle,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let name = args
        .name
        .unwrap_or_else(|| format!("bot-{}", rand::thread_rng().gen_range(1000..10000)));

    let mut stream = TcpStream::connect(&args.server).await?;
    stream.set_nodelay(true)?;
    info!("Connected to {} as {}", args.server, name);

    let slot = match read_packet(&mut stream).await? {
        Packet::Welcome { slot } => slot,
        other => return Err(ProtocolError::Unexpected(other.kind()).into()),
    };
    info!("Assigned player {}", slot.index() + 1);

    write_packet(&mut stream, &Packet::Hello { name }).await?;

    let mut bot = Bot::new(slot);
    let mut frame = interval(Duration::from_secs_f64(1.0 / 60.0));
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        frame.tick().await;

        let snapshot = match read_packet(&mut stream).await {
            Ok(Packet::Snapshot(snapshot)) => snapshot,
            Ok(other) => return Err(ProtocolError::Unexpected(other.kind()).into()),
            Err(ProtocolError::ConnectionClosed) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if snapshot.player_left {
            warn!("Opponent disconnected, leaving match {}", snapshot.match_id);
            break;
        }

        let reply = bot.respond(&snapshot, args.rematch);
        write_packet(&mut stream, &reply).await?;
    }

    Ok(())
}
