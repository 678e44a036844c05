use serde::{Deserialize, Serialize};

pub mod codec;

pub use codec::{read_packet, write_packet, ProtocolError, MAX_PACKET_SIZE};

pub const FIELD_WIDTH: f32 = 960.0;
pub const FIELD_HEIGHT: f32 = 600.0;
pub const PADDLE_WIDTH: f32 = 120.0;
pub const PADDLE_HEIGHT: f32 = 10.0;
/// Gap between a paddle and the field edge behind it.
pub const PADDLE_MARGIN: f32 = 20.0;
pub const BALL_RADIUS: f32 = 8.0;
pub const BALL_START_VELOCITY: Vec2 = Vec2 { x: 4.0, y: 4.0 };
/// Added to each axis' speed on every tick until `MAX_BALL_SPEED` is reached.
pub const SPEED_INCREMENT: f32 = 0.005;
pub const MAX_BALL_SPEED: f32 = 12.0;
pub const COUNTDOWN_START: u32 = 3;
pub const DEFAULT_PLAYER_NAME: &str = "So-and-so";
/// Longest display name, in characters, a match keeps. Two names of this
/// length still leave a snapshot far below `MAX_PACKET_SIZE`.
pub const MAX_NAME_LEN: usize = 32;

/// Cuts `name` down to at most `MAX_NAME_LEN` characters.
pub fn clamp_name(name: &str) -> &str {
    match name.char_indices().nth(MAX_NAME_LEN) {
        Some((end, _)) => &name[..end],
        None => name,
    }
}

/// Axis-aligned rectangle; `x`/`y` is the top-left corner, y grows downwards.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Strict overlap test: rectangles that only share an edge do not intersect,
    /// and a rectangle with no area never intersects anything.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.width <= 0.0 || self.height <= 0.0 || other.width <= 0.0 || other.height <= 0.0 {
            return false;
        }

        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Same size, moved so the top-left corner sits at `(x, y)`.
    pub fn moved_to(&self, x: f32, y: f32) -> Rect {
        Rect { x, y, ..*self }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A player's fixed seat within a match.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Paddle along the bottom edge; the first player to join.
    Bottom,
    /// Paddle along the top edge; the second player to join.
    Top,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Bottom, Slot::Top];

    pub fn index(self) -> usize {
        match self {
            Slot::Bottom => 0,
            Slot::Top => 1,
        }
    }

    pub fn opponent(self) -> Slot {
        match self {
            Slot::Bottom => Slot::Top,
            Slot::Top => Slot::Bottom,
        }
    }

    /// Where this slot's paddle sits at the start of a round.
    pub fn starting_paddle(self) -> Rect {
        let x = FIELD_WIDTH / 2.0 - PADDLE_WIDTH / 2.0;
        let y = match self {
            Slot::Bottom => FIELD_HEIGHT - PADDLE_MARGIN - PADDLE_HEIGHT,
            Slot::Top => PADDLE_MARGIN,
        };
        Rect::new(x, y, PADDLE_WIDTH, PADDLE_HEIGHT)
    }
}

/// Ball rectangle at the centre of the field.
pub fn starting_ball() -> Rect {
    Rect::new(
        FIELD_WIDTH / 2.0 - BALL_RADIUS,
        FIELD_HEIGHT / 2.0 - BALL_RADIUS,
        BALL_RADIUS * 2.0,
        BALL_RADIUS * 2.0,
    )
}

/// Everything a client needs to draw one frame of a match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Snapshot {
    pub match_id: u32,
    /// Indexed by `Slot::index`.
    pub paddles: [Rect; 2],
    pub ball: Rect,
    pub velocity: Vec2,
    pub winner: Option<Slot>,
    pub started: bool,
    pub countdown: u32,
    pub player_names: [String; 2],
    pub connected_players: u8,
    pub rematch_votes: u8,
    pub active: bool,
    pub player_left: bool,
}

impl Snapshot {
    pub fn paddle(&self, slot: Slot) -> Rect {
        self.paddles[slot.index()]
    }

    pub fn name(&self, slot: Slot) -> &str {
        &self.player_names[slot.index()]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    /// Client's display name, sent once after `Welcome`.
    Hello { name: String },
    /// New position of the sender's own paddle.
    PaddleMoved { paddle: Rect },
    /// Request to replay a finished match.
    PlayAgain,

    /// Seat assigned to the client, sent once on connect.
    Welcome { slot: Slot },
    Snapshot(Snapshot),
}

impl Packet {
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Hello { .. } => "Hello",
            Packet::PaddleMoved { .. } => "PaddleMoved",
            Packet::PlayAgain => "PlayAgain",
            Packet::Welcome { .. } => "Welcome",
            Packet::Snapshot(_) => "Snapshot",
        }
    }
}
