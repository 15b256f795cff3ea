//! The crate-wide error type (C8). Every subsystem keeps its own
//! `thiserror` enum for precise local matching and testing; this module
//! unifies them into one set of error kinds so the CLI front-end has
//! exactly one type to report on.
use crate::bencode::BencodeError;
use crate::peer::PeerError;
use crate::torrent::TorrentError;
use crate::tracker::TrackerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("malformed bencode: {0}")]
    Format(String),

    #[error("truncated input: unexpected end of data")]
    Truncated,

    #[error("schema error: {0}")]
    Schema(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tracker error: {0}")]
    Tracker(String),

    #[error("handshake error: {0}")]
    Handshake(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("piece hash mismatch: {0}")]
    Hash(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Returns a short, stable label for the error's kind — used by the CLI
    /// front-end to annotate its diagnostic line without destructuring the
    /// variant itself everywhere a message is printed.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Format(_) | ClientError::Truncated => "bencode",
            ClientError::Schema(_) => "schema",
            ClientError::Io(_) => "io",
            ClientError::Tracker(_) => "tracker",
            ClientError::Handshake(_) => "handshake",
            ClientError::Protocol(_) => "protocol",
            ClientError::Hash(_) => "hash",
        }
    }

    /// Prefixes this error's diagnostic message with `ctx`, preserving the
    /// variant (and therefore `kind()`) so callers can attach a stage
    /// description — e.g. which torrent file or peer address was involved —
    /// without losing the ability to match on what actually went wrong.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            ClientError::Format(m) => ClientError::Format(format!("{ctx}: {m}")),
            ClientError::Truncated => ClientError::Format(format!("{ctx}: truncated input")),
            ClientError::Schema(m) => ClientError::Schema(format!("{ctx}: {m}")),
            ClientError::Io(e) => ClientError::Io(std::io::Error::new(e.kind(), format!("{ctx}: {e}"))),
            ClientError::Tracker(m) => ClientError::Tracker(format!("{ctx}: {m}")),
            ClientError::Handshake(m) => ClientError::Handshake(format!("{ctx}: {m}")),
            ClientError::Protocol(m) => ClientError::Protocol(format!("{ctx}: {m}")),
            ClientError::Hash(m) => ClientError::Hash(format!("{ctx}: {m}")),
        }
    }
}

/// Extension trait mirroring `anyhow`'s `.context()` ergonomics, but
/// producing a `ClientError` that keeps its original kind for matching.
pub trait ResultExt<T> {
    fn context(self, ctx: impl std::fmt::Display) -> ClientResult<T>;
}

impl<T, E: Into<ClientError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, ctx: impl std::fmt::Display) -> ClientResult<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }
}

impl From<BencodeError> for ClientError {
    fn from(e: BencodeError) -> Self {
        match e {
            BencodeError::Format(msg) => ClientError::Format(msg),
            BencodeError::Truncated => ClientError::Truncated,
            BencodeError::InvalidInteger => ClientError::Format("invalid integer literal".into()),
            BencodeError::InvalidStringLength => {
                ClientError::Format("invalid string length prefix".into())
            }
            BencodeError::DictKeyNotString => {
                ClientError::Format("dictionary keys must be byte strings".into())
            }
            BencodeError::TrailingData => {
                ClientError::Format("trailing bytes after a complete value".into())
            }
            BencodeError::Io(e) => ClientError::Io(e),
        }
    }
}

impl From<TorrentError> for ClientError {
    fn from(e: TorrentError) -> Self {
        match e {
            TorrentError::Io(e) => ClientError::Io(e),
            TorrentError::Bencode(e) => e.into(),
            TorrentError::Schema(msg) => ClientError::Schema(msg),
        }
    }
}

impl From<TrackerError> for ClientError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::Io(e) => ClientError::Io(e),
            TrackerError::Bencode(e) => e.into(),
            TrackerError::Http(msg) => ClientError::Tracker(msg),
            TrackerError::Failure(msg) => ClientError::Tracker(msg),
            TrackerError::MalformedPeers(msg) => ClientError::Tracker(msg),
            TrackerError::UrlParse(e) => ClientError::Tracker(e.to_string()),
        }
    }
}

impl From<PeerError> for ClientError {
    fn from(e: PeerError) -> Self {
        match e {
            PeerError::Io(e) => ClientError::Io(e),
            PeerError::Handshake(msg) => ClientError::Handshake(msg),
            PeerError::Protocol(msg) => ClientError::Protocol(msg),
            PeerError::Hash(msg) => ClientError::Hash(msg),
        }
    }
}
