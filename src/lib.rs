//! Library root for rs-torrent-client.
//!
//! Re-exports the core modules: bencode decoding/encoding, the metainfo
//! model, the tracker client, and the peer wire protocol. `main.rs` is a
//! thin CLI front-end over this library and never duplicates its logic.
pub mod bencode;
pub mod error;
pub mod peer;
pub mod torrent;
pub mod tracker;

/// Fixed 20-byte client identity sent to the tracker and in the peer
/// handshake. The core treats client identity as a constant rather than a
/// configurable value.
pub const PEER_ID: [u8; 20] = *b"00112233445566778899";

/// Fixed listening port advertised to the tracker. The core never actually
/// listens; this is the value reported in the announce request.
pub const LISTEN_PORT: u16 = 6881;

/// Block size used when splitting a piece into peer-wire requests.
pub const BLOCK_SIZE: u32 = 16 * 1024;

pub use error::{ClientError, ClientResult};
