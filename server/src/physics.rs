//! Ball physics for a single simulation tick.
//!
//! The step is discrete: the ball jumps by its full velocity every tick and
//! collisions are only tested at the destination, so a fast enough ball can
//! pass through a paddle between two ticks.

use crate::game::Frame;
use pong_shared::{Rect, Slot, Vec2, FIELD_HEIGHT, FIELD_WIDTH, MAX_BALL_SPEED, SPEED_INCREMENT};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub ball: Rect,
    pub velocity: Vec2,
    pub winner: Option<Slot>,
}

/// Grows the magnitude of one velocity component by `SPEED_INCREMENT`,
/// keeping its sign and never going past `MAX_BALL_SPEED`.
pub fn ramp_speed(speed: f32) -> f32 {
    if speed.abs() >= MAX_BALL_SPEED {
        return speed;
    }
    let magnitude = (speed.abs() + SPEED_INCREMENT).min(MAX_BALL_SPEED);
    magnitude.copysign(speed)
}

/// Advances the ball by one tick against the given paddles.
pub fn step(frame: &Frame) -> StepOutcome {
    let ball = frame.ball;
    let mut velocity = Vec2::new(ramp_speed(frame.velocity.x), ramp_speed(frame.velocity.y));

    let mut next_x = ball.x + velocity.x;
    let mut next_y = ball.y + velocity.y;

    // Side walls: one bounce per tick.
    if next_x <= 0.0 || next_x >= FIELD_WIDTH - ball.width {
        velocity.x = -velocity.x;
        next_x = ball.x + velocity.x;
    }

    let candidate = ball.moved_to(next_x, next_y);
    let bottom_paddle = frame.paddles[Slot::Bottom.index()];
    let top_paddle = frame.paddles[Slot::Top.index()];

    // Only reflect when heading towards the paddle, so a ball still
    // overlapping it on the next tick is not sent back again.
    if candidate.intersects(&bottom_paddle) && velocity.y > 0.0 {
        velocity.y = -velocity.y.abs();
        next_y = ball.y + velocity.y;
    } else if candidate.intersects(&top_paddle) && velocity.y < 0.0 {
        velocity.y = velocity.y.abs();
        next_y = ball.y + velocity.y;
    }

    // Reaching the top edge scores for the bottom slot and vice versa.
    let winner = if next_y <= 0.0 {
        Some(Slot::Bottom)
    } else if next_y >= FIELD_HEIGHT - ball.height {
        Some(Slot::Top)
    } else {
        None
    };

    StepOutcome {
        ball: ball.moved_to(next_x, next_y),
        velocity,
        winner,
    }
}
