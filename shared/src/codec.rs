//! Length-prefixed framing for `Packet`s over a byte stream.
//!
//! Every frame is a 4-byte big-endian payload length followed by the bincode
//! encoding of one packet. Both the server and clients go through these two
//! functions so the encoding stays symmetric.

use crate::Packet;
use std::io::ErrorKind;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single encoded packet. A snapshot with two long names
/// stays far below this.
pub const MAX_PACKET_SIZE: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed packet: {0}")]
    Decode(#[from] bincode::Error),
    #[error("packet of {0} bytes exceeds the {max} byte limit", max = MAX_PACKET_SIZE)]
    TooLarge(usize),
    #[error("unexpected {0} packet")]
    Unexpected(&'static str),
}

impl ProtocolError {
    /// True for faults that mean the peer went away rather than misbehaved.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::ConnectionClosed => true,
            ProtocolError::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Encodes and writes one packet, flushing the stream.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let payload = bincode::serialize(packet)?;
    if payload.len() > MAX_PACKET_SIZE {
        return Err(ProtocolError::TooLarge(payload.len()));
    }

    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads and decodes one packet.
///
/// A stream that ends cleanly before a new frame starts yields
/// `ProtocolError::ConnectionClosed`; one that ends mid-frame yields an I/O
/// error. On `ProtocolError::TooLarge` the frame body is left unread.
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    };

    if len > MAX_PACKET_SIZE {
        return Err(ProtocolError::TooLarge(len));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    Ok(bincode::deserialize(&buffer)?)
}
