//! Per-connection session handler.
//!
//! A session walks through three phases:
//!
//! 1. **Handshaking**: tell the client its slot, read its name, register it
//!    with the match (the second registration starts the countdown).
//! 2. **Streaming**: send a snapshot, read exactly one reply, apply it, and
//!    repeat while the match is active.
//! 3. **Closed**: release the slot, flag the departure for the opponent and
//!    retire the match once nobody is left.
//!
//! Any I/O or decoding fault ends the session the same way a clean
//! disconnect does. There is no read timeout: a client that stays connected
//! but silent parks its session until the socket closes.

use crate::countdown;
use crate::game::{Match, MatchError};
use crate::matchmaker::Matchmaker;
use log::{debug, info, warn};
use pong_shared::{read_packet, write_packet, Packet, ProtocolError, Slot, DEFAULT_PLAYER_NAME};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Match(#[from] MatchError),
}

impl SessionError {
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SessionError::Protocol(e) if e.is_disconnect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Handshaking,
    Streaming,
    Closed,
}

pub struct Session<S> {
    stream: S,
    game: Arc<Match>,
    slot: Slot,
    name: String,
    phase: Phase,
    registered: bool,
    matchmaker: Arc<Matchmaker>,
}

/// Runs a session for `stream` on its own task.
pub fn spawn<S>(
    stream: S,
    game: Arc<Match>,
    slot: Slot,
    matchmaker: Arc<Matchmaker>,
) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(Session::new(stream, game, slot, matchmaker).run())
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, game: Arc<Match>, slot: Slot, matchmaker: Arc<Matchmaker>) -> Self {
        Self {
            stream,
            game,
            slot,
            name: String::new(),
            phase: Phase::Handshaking,
            registered: false,
            matchmaker,
        }
    }

    /// Drives the session through all phases until the connection ends.
    pub async fn run(mut self) {
        info!(
            "Connected client: match {}, player {}",
            self.game.id(),
            self.slot.index() + 1
        );

        let result = match self.handshake().await {
            Ok(()) => {
                self.phase = Phase::Streaming;
                self.stream_state().await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_disconnect() => {
                debug!("{} disconnected while {:?}: {}", self.label(), self.phase, e)
            }
            Err(e) => warn!(
                "Error in communication with {} while {:?}: {}",
                self.label(),
                self.phase,
                e
            ),
        }

        self.close().await;
    }

    async fn handshake(&mut self) -> Result<(), SessionError> {
        write_packet(&mut self.stream, &Packet::Welcome { slot: self.slot }).await?;

        self.name = match read_packet(&mut self.stream).await {
            Ok(Packet::Hello { name }) => name,
            Ok(other) => return Err(ProtocolError::Unexpected(other.kind()).into()),
            Err(ProtocolError::Decode(e)) => {
                warn!("Could not decode player name: {}", e);
                DEFAULT_PLAYER_NAME.to_string()
            }
            Err(ProtocolError::TooLarge(len)) => {
                warn!("Player name frame of {} bytes is too large", len);
                self.discard(len).await?;
                DEFAULT_PLAYER_NAME.to_string()
            }
            Err(e) => return Err(e.into()),
        };

        let start_countdown = self.game.register_player(self.slot, &self.name).await?;
        self.registered = true;
        info!(
            "Player {} of match {} defined as: {}",
            self.slot.index() + 1,
            self.game.id(),
            self.name
        );

        if start_countdown {
            countdown::spawn(Arc::clone(&self.game), self.matchmaker.settings().countdown_step);
        }
        Ok(())
    }

    /// Skips the body of a frame `read_packet` refused, keeping the stream
    /// aligned on the next length prefix.
    async fn discard(&mut self, len: usize) -> Result<(), ProtocolError> {
        let mut body = (&mut self.stream).take(len as u64);
        let skipped = tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
        if skipped < len as u64 {
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok(())
    }

    async fn stream_state(&mut self) -> Result<(), SessionError> {
        while self.game.is_active().await {
            let snapshot = self.game.snapshot().await;
            write_packet(&mut self.stream, &Packet::Snapshot(snapshot)).await?;

            let packet = read_packet(&mut self.stream).await?;
            self.apply(packet).await?;
        }
        Ok(())
    }

    async fn apply(&mut self, packet: Packet) -> Result<(), SessionError> {
        match packet {
            Packet::PaddleMoved { paddle } => {
                self.game.update_paddle(self.slot, paddle).await;
            }
            Packet::PlayAgain => match self.game.vote_rematch(self.slot).await {
                Some(votes) => {
                    info!("Vote to restart match {}: {}/2", self.game.id(), votes);
                    if votes >= 2 {
                        info!("Restarting match {}", self.game.id());
                        if self.game.reset().await {
                            countdown::spawn(
                                Arc::clone(&self.game),
                                self.matchmaker.settings().countdown_step,
                            );
                        }
                    }
                }
                None => debug!("Ignoring rematch vote from {}", self.label()),
            },
            other => return Err(ProtocolError::Unexpected(other.kind()).into()),
        }
        Ok(())
    }

    async fn close(mut self) {
        self.phase = Phase::Closed;
        info!("Disconnecting {} from match {}", self.label(), self.game.id());

        if self.registered {
            self.game.decrement_connected().await;
        }
        self.game.mark_player_left().await;

        if self.game.deactivate().await {
            self.matchmaker.forget(self.game.id()).await;
        }

        if let Err(e) = self.stream.shutdown().await {
            debug!("Error closing connection of {}: {}", self.label(), e);
        }
    }

    fn label(&self) -> String {
        if self.name.is_empty() {
            format!("player {}", self.slot.index() + 1)
        } else {
            self.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchSettings;
    use pong_shared::{Rect, Snapshot, MAX_NAME_LEN, MAX_PACKET_SIZE};
    use std::time::Duration;
    use tokio::io::{duplex, DuplexStream};

    const FRAME: Duration = Duration::from_millis(16);

    struct TestClient {
        stream: DuplexStream,
        slot: Slot,
        session: JoinHandle<()>,
    }

    impl TestClient {
        async fn next_snapshot(&mut self) -> Snapshot {
            match read_packet(&mut self.stream).await.unwrap() {
                Packet::Snapshot(snapshot) => snapshot,
                other => panic!("expected snapshot, got {:?}", other),
            }
        }

        async fn send(&mut self, packet: Packet) {
            write_packet(&mut self.stream, &packet).await.unwrap();
        }

        /// Reads one snapshot and answers it, pacing like a 60 fps client.
        async fn exchange(&mut self, reply: Packet) -> Snapshot {
            let snapshot = self.next_snapshot().await;
            self.send(reply).await;
            tokio::time::sleep(FRAME).await;
            snapshot
        }
    }

    fn matchmaker() -> Arc<Matchmaker> {
        Arc::new(Matchmaker::new(MatchSettings::default()))
    }

    /// Pairs a new connection and starts its session without sending a name.
    async fn connect_raw(matchmaker: &Arc<Matchmaker>) -> (TestClient, Arc<Match>) {
        let (client, server) = duplex(4096);
        let (game, slot) = matchmaker.pair().await;
        let session = spawn(server, Arc::clone(&game), slot, Arc::clone(matchmaker));

        let mut client = TestClient {
            stream: client,
            slot,
            session,
        };
        match read_packet(&mut client.stream).await.unwrap() {
            Packet::Welcome { slot: welcomed } => assert_eq!(welcomed, slot),
            other => panic!("expected welcome, got {:?}", other),
        }
        (client, game)
    }

    async fn connect(matchmaker: &Arc<Matchmaker>, name: &str) -> (TestClient, Arc<Match>) {
        let (mut client, game) = connect_raw(matchmaker).await;
        client
            .send(Packet::Hello {
                name: name.to_string(),
            })
            .await;
        (client, game)
    }

    fn park(slot: Slot) -> Packet {
        // Well clear of the ball's path.
        let paddle = slot.starting_paddle();
        Packet::PaddleMoved {
            paddle: Rect::new(-500.0, paddle.y, paddle.width, paddle.height),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_registers_player() {
        let matchmaker = matchmaker();
        let (mut client, _game) = connect(&matchmaker, "ada").await;

        let snapshot = client.next_snapshot().await;

        assert_eq!(client.slot, Slot::Bottom);
        assert_eq!(snapshot.name(Slot::Bottom), "ada");
        assert_eq!(snapshot.connected_players, 1);
        assert!(!snapshot.started);
        assert_eq!(snapshot.countdown, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_name_falls_back_to_default() {
        let matchmaker = matchmaker();
        let (mut client, _game) = connect_raw(&matchmaker).await;

        client.stream.write_u32(4).await.unwrap();
        client.stream.write_all(&[0xFF; 4]).await.unwrap();

        let snapshot = client.next_snapshot().await;
        assert_eq!(snapshot.name(Slot::Bottom), DEFAULT_PLAYER_NAME);
        assert_eq!(snapshot.connected_players, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_name_frame_falls_back_to_default() {
        let matchmaker = matchmaker();
        let (mut client, _game) = connect_raw(&matchmaker).await;

        let len = MAX_PACKET_SIZE + 100;
        client.stream.write_u32(len as u32).await.unwrap();
        client.stream.write_all(&vec![b'x'; len]).await.unwrap();

        let snapshot = client.next_snapshot().await;
        assert_eq!(snapshot.name(Slot::Bottom), DEFAULT_PLAYER_NAME);
        assert_eq!(snapshot.connected_players, 1);

        // The stream is still aligned on frames.
        client
            .send(Packet::PaddleMoved {
                paddle: Rect::new(33.0, 0.0, 1.0, 1.0),
            })
            .await;
        assert_eq!(client.next_snapshot().await.paddle(Slot::Bottom).x, 33.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_name_does_not_disconnect_opponent() {
        let matchmaker = matchmaker();
        let (mut bottom, game) = connect(&matchmaker, "ada").await;
        let (mut top, _) = connect(&matchmaker, &"x".repeat(16_330)).await;

        bottom.next_snapshot().await;
        top.next_snapshot().await;
        bottom.send(park(Slot::Bottom)).await;
        top.send(park(Slot::Top)).await;

        for _ in 0..10 {
            let snapshot = bottom.exchange(park(Slot::Bottom)).await;
            top.exchange(park(Slot::Top)).await;

            assert_eq!(snapshot.connected_players, 2);
            assert_eq!(snapshot.name(Slot::Bottom), "ada");
            assert_eq!(snapshot.name(Slot::Top).chars().count(), MAX_NAME_LEN);
        }
        assert!(game.is_active().await);
        assert!(!game.snapshot().await.player_left);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_player_starts_countdown() {
        let matchmaker = matchmaker();
        let (mut bottom, game) = connect(&matchmaker, "ada").await;
        let (mut top, same_game) = connect(&matchmaker, "linus").await;
        assert!(Arc::ptr_eq(&game, &same_game));
        assert_eq!(top.slot, Slot::Top);

        let mut countdowns = Vec::new();
        for _ in 0..1_000 {
            // Votes before a winner exists are ignored.
            let snapshot = bottom.exchange(Packet::PlayAgain).await;
            top.exchange(Packet::PlayAgain).await;

            if countdowns.last() != Some(&snapshot.countdown) {
                countdowns.push(snapshot.countdown);
            }
            assert_eq!(snapshot.started, snapshot.countdown == 0);
            if snapshot.started {
                break;
            }
        }

        assert_eq!(countdowns, vec![3, 2, 1, 0]);
        let snapshot = game.snapshot().await;
        assert_eq!(snapshot.player_names, ["ada".to_string(), "linus".to_string()]);
        assert_eq!(snapshot.rematch_votes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paddle_update_is_applied() {
        let matchmaker = matchmaker();
        let (mut client, game) = connect(&matchmaker, "ada").await;

        client.next_snapshot().await;
        client
            .send(Packet::PaddleMoved {
                paddle: Rect::new(77.0, 0.0, 1.0, 1.0),
            })
            .await;

        let snapshot = client.next_snapshot().await;
        assert_eq!(snapshot.paddle(Slot::Bottom).x, 77.0);
        assert_eq!(snapshot.paddle(Slot::Bottom).y, Slot::Bottom.starting_paddle().y);
        assert_eq!(game.snapshot().await.paddle(Slot::Bottom).x, 77.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_packet_ends_session() {
        let matchmaker = matchmaker();
        let (mut client, game) = connect(&matchmaker, "ada").await;
        client.next_snapshot().await;

        client.stream.write_u32(3).await.unwrap();
        client.stream.write_all(&[9, 9, 9]).await.unwrap();
        client.session.await.unwrap();

        let snapshot = game.snapshot().await;
        assert_eq!(snapshot.connected_players, 0);
        assert!(snapshot.player_left);
        assert!(!snapshot.active);
        assert_eq!(matchmaker.waiting_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_only_packet_ends_session() {
        let matchmaker = matchmaker();
        let (mut client, game) = connect(&matchmaker, "ada").await;
        client.next_snapshot().await;

        client.send(Packet::Welcome { slot: Slot::Top }).await;
        client.session.await.unwrap();

        assert!(!game.is_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_before_name_does_not_underflow() {
        let matchmaker = matchmaker();
        let (mut waiting, game) = connect(&matchmaker, "ada").await;
        assert_eq!(waiting.next_snapshot().await.connected_players, 1);

        let (dropped, _) = connect_raw(&matchmaker).await;
        drop(dropped.stream);
        dropped.session.await.unwrap();

        waiting.send(park(Slot::Bottom)).await;
        let snapshot = waiting.next_snapshot().await;
        assert_eq!(snapshot.connected_players, 1);
        assert!(snapshot.player_left);
        assert!(game.is_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_flags_opponent_then_retires_match() {
        let matchmaker = matchmaker();
        let (mut bottom, game) = connect(&matchmaker, "ada").await;
        let (mut top, _) = connect(&matchmaker, "linus").await;
        // Both sessions have registered once their first snapshot arrives.
        bottom.next_snapshot().await;
        top.next_snapshot().await;
        top.send(park(Slot::Top)).await;

        drop(bottom.stream);
        bottom.session.await.unwrap();

        let mut flagged = None;
        for _ in 0..100 {
            let snapshot = top.exchange(park(Slot::Top)).await;
            if snapshot.player_left {
                flagged = Some(snapshot);
                break;
            }
        }
        let flagged = flagged.expect("opponent departure never surfaced");
        assert_eq!(flagged.connected_players, 1);
        assert!(flagged.active);

        drop(top.stream);
        top.session.await.unwrap();

        let snapshot = game.snapshot().await;
        assert_eq!(snapshot.connected_players, 0);
        assert!(!snapshot.active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rematch_after_both_votes() {
        let matchmaker = matchmaker();
        let (mut bottom, game) = connect(&matchmaker, "ada").await;
        let (mut top, _) = connect(&matchmaker, "linus").await;

        let mut finished = None;
        for _ in 0..2_000 {
            let snapshot = bottom.exchange(park(Slot::Bottom)).await;
            top.exchange(park(Slot::Top)).await;
            if snapshot.winner.is_some() {
                finished = Some(snapshot);
                break;
            }
        }
        let finished = finished.expect("round never finished");
        assert_eq!(finished.winner, Some(Slot::Top));
        assert!(finished.started);

        // A lone vote does not restart the round.
        bottom.exchange(Packet::PlayAgain).await;
        let snapshot = top.exchange(Packet::PlayAgain).await;
        assert_eq!(snapshot.winner, Some(Slot::Top));

        // Skip the snapshot taken before the second vote landed.
        bottom.exchange(park(Slot::Bottom)).await;
        let restarted = bottom.next_snapshot().await;
        assert_eq!(restarted.winner, None);
        assert!(!restarted.started);
        assert_eq!(restarted.rematch_votes, 0);
        assert!(restarted.countdown > 0);
        assert_eq!(restarted.connected_players, 2);
        assert_eq!(restarted.player_names, ["ada".to_string(), "linus".to_string()]);

        // The new countdown runs to completion.
        bottom.send(park(Slot::Bottom)).await;
        for _ in 0..1_000 {
            top.exchange(park(Slot::Top)).await;
            if game.snapshot().await.started {
                break;
            }
        }
        assert!(game.snapshot().await.started);
    }
}
