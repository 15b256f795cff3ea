//! The peer wire protocol (C4, C5, C6): handshake framing, length-prefixed
//! message exchange, and the single-piece download state machine. All I/O
//! in this module is synchronous, blocking `std::net::TcpStream` —
//! no async runtime, no concurrency.
use thiserror::Error;

pub mod download;
pub mod handshake;
pub mod message;

pub use download::download_piece;
pub use handshake::Handshake;
pub use message::PeerMsg;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Handshake(String),

    #[error("{0}")]
    Protocol(String),

    #[error("{0}")]
    Hash(String),
}

pub type PeerResult<T> = std::result::Result<T, PeerError>;
