//! # Pong Match Server Library
//!
//! This library provides the authoritative server for two-player networked
//! Pong. The server owns every piece of game truth (ball position and
//! velocity, winner, countdown, rematch state) and streams it to thin
//! presentation clients, which only report where they want their paddle to be.
//!
//! ## Core Responsibilities
//!
//! ### Matchmaking
//! Incoming connections are paired first come, first served: a connection
//! takes the free seat of the oldest match still waiting for an opponent, or
//! opens a new match and waits for one itself.
//!
//! ### Authoritative Simulation
//! Each match runs its own fixed-tick loop (60 Hz by default) that moves the
//! ball, bounces it off the side walls and paddles, ramps its speed up to a
//! cap and decides the winner when it reaches an end of the field.
//!
//! ### State Streaming
//! Every connection gets its own session that alternates between sending a
//! snapshot of the match and applying the client's single reply (a paddle
//! move or a rematch vote).
//!
//! ## Architecture Design
//!
//! ### Task Per Component
//! One tokio task per connection, one per match for the simulation, and a
//! short-lived one per countdown. Matches share nothing with each other
//! except the matchmaker's waiting queue.
//!
//! ### Lock-Guarded Match State
//! A match keeps its whole record behind one lock and only exposes short
//! atomic operations. The lock is never held across socket I/O or sleeps, so
//! a slow client stalls its own session and nothing else.
//!
//! ### Cooperative Shutdown
//! A match is retired once its last player leaves. Every loop bound to it
//! polls the `active` flag each iteration and exits on its own.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Bind address and per-match timing.
//!
//! ### Game Module (`game`)
//! The per-match state container and its atomic operations.
//!
//! ### Physics Module (`physics`)
//! The pure per-tick ball step: speed ramp, wall and paddle bounces, goals.
//!
//! ### Simulation Module (`simulation`)
//! The fixed-tick loop applying the physics step to a match.
//!
//! ### Countdown Module (`countdown`)
//! The pre-round countdown that flips a match to running.
//!
//! ### Matchmaker Module (`matchmaker`)
//! The FIFO queue pairing connections into matches.
//!
//! ### Session Module (`session`)
//! The per-connection handshake, streaming loop and cleanup.
//!
//! ### Network Module (`network`)
//! The TCP accept loop feeding the matchmaker.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pong_server::config::{MatchSettings, ServerConfig};
//! use pong_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("127.0.0.1", 5555, MatchSettings::default());
//!     let server = Server::bind(&config).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Known Limitations
//!
//! - Collisions are only checked at whole-tick positions, so a very fast ball
//!   can pass through a paddle.
//! - Sessions have no read timeout; a client that stops talking without
//!   closing its socket keeps its session parked.
//! - There is no reconnection: a dropped player has to start a new match.

pub mod config;
pub mod countdown;
pub mod game;
pub mod matchmaker;
pub mod network;
pub mod physics;
pub mod session;
pub mod simulation;
