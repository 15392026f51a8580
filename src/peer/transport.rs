use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::error::PeerError;
use super::message::{Handshake, Message, HANDSHAKE_LEN};
use crate::constants::{INCOMING_TIMEOUT, MAX_MESSAGE_SIZE};

const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Length-framed I/O over one peer's TCP stream.
///
/// Reads accumulate into a single buffer and frames are split off it, so
/// a slow peer never costs more than one in-flight read. A read that
/// stays silent past the incoming deadline ends the session.
pub struct PeerTransport {
    stream: TcpStream,
    read_buf: BytesMut,
}

impl PeerTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(32 * 1024),
        }
    }

    pub async fn send_handshake(&mut self, handshake: &Handshake) -> Result<(), PeerError> {
        let data = handshake.encode();
        timeout(WRITE_TIMEOUT, self.stream.write_all(&data))
            .await
            .map_err(|_| PeerError::Timeout)??;
        Ok(())
    }

    /// Reads exactly the first 68 bytes and decodes them.
    ///
    /// Any leading garbage fails the decode: a handshake is strictly the
    /// first traffic on the wire.
    pub async fn receive_handshake(&mut self) -> Result<Handshake, PeerError> {
        self.fill_to(HANDSHAKE_LEN).await?;
        let data = self.read_buf.split_to(HANDSHAKE_LEN);
        Handshake::decode(&data)
    }

    pub async fn send_message(&mut self, message: &Message) -> Result<(), PeerError> {
        let data = message.encode();
        timeout(WRITE_TIMEOUT, self.stream.write_all(&data))
            .await
            .map_err(|_| PeerError::Timeout)??;
        Ok(())
    }

    pub async fn receive_message(&mut self) -> Result<Message, PeerError> {
        self.fill_to(4).await?;

        let length = u32::from_be_bytes([
            self.read_buf[0],
            self.read_buf[1],
            self.read_buf[2],
            self.read_buf[3],
        ]) as usize;

        if length > MAX_MESSAGE_SIZE {
            return Err(PeerError::Protocol(format!(
                "message too large: {}",
                length
            )));
        }

        self.fill_to(4 + length).await?;
        let frame = self.read_buf.split_to(4 + length);
        Message::decode(frame.freeze())
    }

    /// Reads until the buffer holds at least `needed` bytes.
    async fn fill_to(&mut self, needed: usize) -> Result<(), PeerError> {
        while self.read_buf.len() < needed {
            let n = timeout(INCOMING_TIMEOUT, self.stream.read_buf(&mut self.read_buf))
                .await
                .map_err(|_| PeerError::Disconnected)??;

            if n == 0 {
                return Err(PeerError::Disconnected);
            }
        }
        Ok(())
    }

    pub fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }
}
