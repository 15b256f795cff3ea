//! Torrent metainfo parsing: typed projection of a decoded `.torrent`
//! dictionary, infohash derivation, and piece-hash indexing (C2).
use thiserror::Error;

pub mod info_hash;
pub mod metainfo;

pub use metainfo::{InfoDict, Metainfo};

#[derive(Debug, Error)]
pub enum TorrentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bencode decoding error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    #[error("{0}")]
    Schema(String),
}

pub type TorrentResult<T> = std::result::Result<T, TorrentError>;
