//! Length-prefixed peer messages exchanged after the handshake.
//!
//! Every message on the wire is `<u32 length prefix><u8 id><payload>`,
//! except the zero-length keep-alive, which carries no id at all. This
//! core recognizes a reduced subset of ids: Choke, Unchoke, Interested,
//! Bitfield, Request, and Piece. That is everything a single-piece
//! downloader needs to drive the request/response loop; an id outside
//! this subset is a protocol error rather than something to ignore.
use super::{PeerError, PeerResult};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

const ID_CHOKE: u8 = 0;
const ID_UNCHOKE: u8 = 1;
const ID_INTERESTED: u8 = 2;
const ID_BITFIELD: u8 = 5;
const ID_REQUEST: u8 = 6;
const ID_PIECE: u8 = 7;

/// A peer protocol message, restricted to the ids this core understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMsg {
    Choke,
    Unchoke,
    Interested,
    Bitfield(Vec<u8>),
    Request { index: u32, begin: u32, length: u32 },
    Piece { index: u32, begin: u32, block: Vec<u8> },
}

impl PeerMsg {
    fn id(&self) -> u8 {
        match self {
            PeerMsg::Choke => ID_CHOKE,
            PeerMsg::Unchoke => ID_UNCHOKE,
            PeerMsg::Interested => ID_INTERESTED,
            PeerMsg::Bitfield(_) => ID_BITFIELD,
            PeerMsg::Request { .. } => ID_REQUEST,
            PeerMsg::Piece { .. } => ID_PIECE,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            PeerMsg::Choke | PeerMsg::Unchoke | PeerMsg::Interested => Vec::new(),
            PeerMsg::Bitfield(bits) => bits.clone(),
            PeerMsg::Request { index, begin, length } => {
                let mut buf = Vec::with_capacity(12);
                buf.write_u32::<BigEndian>(*index).unwrap();
                buf.write_u32::<BigEndian>(*begin).unwrap();
                buf.write_u32::<BigEndian>(*length).unwrap();
                buf
            }
            PeerMsg::Piece { index, begin, block } => {
                let mut buf = Vec::with_capacity(8 + block.len());
                buf.write_u32::<BigEndian>(*index).unwrap();
                buf.write_u32::<BigEndian>(*begin).unwrap();
                buf.extend_from_slice(block);
                buf
            }
        }
    }

    /// Writes this message as `<length prefix><id><payload>` to `stream`.
    pub fn write_to<W: Write>(&self, stream: &mut W) -> PeerResult<()> {
        let payload = self.payload();
        let length = 1 + payload.len() as u32;
        stream.write_u32::<BigEndian>(length)?;
        stream.write_u8(self.id())?;
        stream.write_all(&payload)?;
        Ok(())
    }

    /// Reads one message from `stream`. Returns `Ok(None)` for a
    /// zero-length keep-alive so callers can loop without treating it as
    /// a frame.
    pub fn read_from<R: Read>(stream: &mut R) -> PeerResult<Option<PeerMsg>> {
        let length = stream.read_u32::<BigEndian>()?;
        if length == 0 {
            return Ok(None);
        }

        let id = stream.read_u8()?;
        let mut payload = vec![0u8; length as usize - 1];
        stream.read_exact(&mut payload)?;

        let msg = match id {
            ID_CHOKE => PeerMsg::Choke,
            ID_UNCHOKE => PeerMsg::Unchoke,
            ID_INTERESTED => PeerMsg::Interested,
            ID_BITFIELD => PeerMsg::Bitfield(payload),
            ID_REQUEST => {
                if payload.len() != 12 {
                    return Err(PeerError::Protocol(format!(
                        "request payload must be 12 bytes, got {}",
                        payload.len()
                    )));
                }
                let mut cursor = &payload[..];
                PeerMsg::Request {
                    index: cursor.read_u32::<BigEndian>()?,
                    begin: cursor.read_u32::<BigEndian>()?,
                    length: cursor.read_u32::<BigEndian>()?,
                }
            }
            ID_PIECE => {
                if payload.len() < 8 {
                    return Err(PeerError::Protocol(format!(
                        "piece payload must be at least 8 bytes, got {}",
                        payload.len()
                    )));
                }
                let mut cursor = &payload[..8];
                let index = cursor.read_u32::<BigEndian>()?;
                let begin = cursor.read_u32::<BigEndian>()?;
                PeerMsg::Piece { index, begin, block: payload[8..].to_vec() }
            }
            other => {
                return Err(PeerError::Protocol(format!(
                    "unrecognized message id {other}"
                )))
            }
        };

        Ok(Some(msg))
    }
}
