use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::bitfield::Bitfield;
use super::block::{Block, BlockRequest};
use super::error::PeerError;
use super::extensions::Extensions;
use super::peer_id::PeerId;
use crate::metainfo::InfoHash;

/// The peer wire protocol identifier.
pub const PROTOCOL: &[u8] = b"BitTorrent protocol";
/// Length of the handshake in bytes.
pub const HANDSHAKE_LEN: usize = 68;

/// Message type identifiers in the peer wire protocol.
///
/// Each message except KeepAlive carries a one-byte ID after the length
/// prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageId {
    Choke = 0,
    Unchoke = 1,
    Interested = 2,
    NotInterested = 3,
    Have = 4,
    Bitfield = 5,
    Request = 6,
    Piece = 7,
    Cancel = 8,
    Port = 9,
}

impl TryFrom<u8> for MessageId {
    type Error = PeerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageId::Choke),
            1 => Ok(MessageId::Unchoke),
            2 => Ok(MessageId::Interested),
            3 => Ok(MessageId::NotInterested),
            4 => Ok(MessageId::Have),
            5 => Ok(MessageId::Bitfield),
            6 => Ok(MessageId::Request),
            7 => Ok(MessageId::Piece),
            8 => Ok(MessageId::Cancel),
            9 => Ok(MessageId::Port),
            n => Err(PeerError::Protocol(format!("unknown message id: {}", n))),
        }
    }
}

/// The handshake, strictly the first exchange on a peer connection.
///
/// Wire layout, 68 bytes total:
/// `[len=19]["BitTorrent protocol"][8 reserved][20 info_hash][20 peer_id]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Capability bits advertised to the peer.
    pub reserved: Extensions,
    /// The torrent this connection is about.
    pub info_hash: InfoHash,
    /// The sender's client instance id.
    pub peer_id: PeerId,
}

impl Handshake {
    pub fn new(info_hash: InfoHash, peer_id: PeerId, reserved: Extensions) -> Self {
        Self {
            reserved,
            info_hash,
            peer_id,
        }
    }

    /// Encodes the fixed 68-byte handshake.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HANDSHAKE_LEN);
        buf.put_u8(PROTOCOL.len() as u8);
        buf.put_slice(PROTOCOL);
        buf.put_slice(self.reserved.as_bytes());
        buf.put_slice(self.info_hash.as_bytes());
        buf.put_slice(self.peer_id.as_bytes());
        buf.freeze()
    }

    /// Decodes a handshake from the first 68 bytes of a connection.
    ///
    /// Any other byte sequence here is a protocol violation: the length
    /// prefix must be 19 and the protocol string must match exactly.
    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        if data.len() < HANDSHAKE_LEN {
            return Err(PeerError::Protocol("handshake too short".into()));
        }

        if data[0] as usize != PROTOCOL.len() || &data[1..20] != PROTOCOL {
            return Err(PeerError::Protocol("bad protocol header".into()));
        }

        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&data[20..28]);

        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&data[28..48]);

        // Length checked above, so the PeerId slice always fits.
        let peer_id = PeerId::from_bytes(&data[48..68])
            .ok_or_else(|| PeerError::Protocol("handshake too short".into()))?;

        Ok(Self {
            reserved: Extensions::from_bytes(reserved),
            info_hash: InfoHash::from_bytes(info_hash),
            peer_id,
        })
    }
}

/// A peer wire message.
///
/// Framing is a `u32` big-endian length followed by that many payload
/// bytes; length zero is a KeepAlive, otherwise the first payload byte is
/// the [`MessageId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Empty message that only resets the peer's silence timer.
    KeepAlive,
    /// We will not serve the peer's requests.
    Choke,
    /// We are ready to serve the peer's requests.
    Unchoke,
    /// We want data the peer has.
    Interested,
    /// We no longer want anything the peer has.
    NotInterested,
    /// Announce one newly acquired piece.
    Have(u32),
    /// Announce every piece we have; first message after the handshake.
    Bitfield(Bitfield),
    /// Ask for a block of data.
    Request(BlockRequest),
    /// Deliver a block of data.
    Piece(Block),
    /// Withdraw a pending request.
    Cancel(BlockRequest),
    /// DHT listen port announcement.
    Port(u16),
}

impl Message {
    /// Encodes the message including its length prefix.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        match self {
            Message::KeepAlive => buf.put_u32(0),
            Message::Choke => put_bare(&mut buf, MessageId::Choke),
            Message::Unchoke => put_bare(&mut buf, MessageId::Unchoke),
            Message::Interested => put_bare(&mut buf, MessageId::Interested),
            Message::NotInterested => put_bare(&mut buf, MessageId::NotInterested),
            Message::Have(piece) => {
                buf.put_u32(5);
                buf.put_u8(MessageId::Have as u8);
                buf.put_u32(*piece);
            }
            Message::Bitfield(field) => {
                let bytes = field.to_bytes();
                buf.put_u32(1 + bytes.len() as u32);
                buf.put_u8(MessageId::Bitfield as u8);
                buf.put_slice(&bytes);
            }
            Message::Request(req) => put_block_ix(&mut buf, MessageId::Request, req),
            Message::Piece(block) => {
                buf.put_u32(9 + block.data.len() as u32);
                buf.put_u8(MessageId::Piece as u8);
                buf.put_u32(block.piece);
                buf.put_u32(block.offset);
                buf.put_slice(&block.data);
            }
            Message::Cancel(req) => put_block_ix(&mut buf, MessageId::Cancel, req),
            Message::Port(port) => {
                buf.put_u32(3);
                buf.put_u8(MessageId::Port as u8);
                buf.put_u16(*port);
            }
        }

        buf.freeze()
    }

    /// Decodes one framed message.
    ///
    /// A decoded Bitfield carries byte-rounded capacity; the session
    /// resizes it to the torrent's piece count before use.
    pub fn decode(mut data: Bytes) -> Result<Self, PeerError> {
        if data.len() < 4 {
            return Err(PeerError::Protocol("frame shorter than prefix".into()));
        }

        let length = data.get_u32() as usize;
        if length == 0 {
            return Ok(Message::KeepAlive);
        }

        if data.remaining() < length {
            return Err(PeerError::Protocol("frame shorter than length".into()));
        }

        let id = MessageId::try_from(data.get_u8())?;
        let payload = length - 1;

        match id {
            MessageId::Choke => Ok(Message::Choke),
            MessageId::Unchoke => Ok(Message::Unchoke),
            MessageId::Interested => Ok(Message::Interested),
            MessageId::NotInterested => Ok(Message::NotInterested),
            MessageId::Have => {
                if payload < 4 {
                    return Err(PeerError::Protocol("have too short".into()));
                }
                Ok(Message::Have(data.get_u32()))
            }
            MessageId::Bitfield => {
                let bytes = data.copy_to_bytes(payload);
                Ok(Message::Bitfield(Bitfield::from_bytes(
                    &bytes,
                    bytes.len() as u32 * 8,
                )))
            }
            MessageId::Request => Ok(Message::Request(get_block_ix(&mut data, payload)?)),
            MessageId::Piece => {
                if payload < 8 {
                    return Err(PeerError::Protocol("piece too short".into()));
                }
                let piece = data.get_u32();
                let offset = data.get_u32();
                let block = data.copy_to_bytes(payload - 8);
                Ok(Message::Piece(Block::new(piece, offset, block)))
            }
            MessageId::Cancel => Ok(Message::Cancel(get_block_ix(&mut data, payload)?)),
            MessageId::Port => {
                if payload < 2 {
                    return Err(PeerError::Protocol("port too short".into()));
                }
                Ok(Message::Port(data.get_u16()))
            }
        }
    }
}

fn put_bare(buf: &mut BytesMut, id: MessageId) {
    buf.put_u32(1);
    buf.put_u8(id as u8);
}

fn put_block_ix(buf: &mut BytesMut, id: MessageId, req: &BlockRequest) {
    buf.put_u32(13);
    buf.put_u8(id as u8);
    buf.put_u32(req.piece);
    buf.put_u32(req.offset);
    buf.put_u32(req.length);
}

fn get_block_ix(data: &mut Bytes, payload: usize) -> Result<BlockRequest, PeerError> {
    if payload < 12 {
        return Err(PeerError::Protocol("block index too short".into()));
    }
    Ok(BlockRequest::new(
        data.get_u32(),
        data.get_u32(),
        data.get_u32(),
    ))
}
