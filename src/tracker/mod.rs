//! Tracker client (C3): builds the HTTP GET announce request and decodes
//! the compact peer list from the bencoded response.
use crate::bencode::{self, BencodeValue};
use crate::torrent::Metainfo;
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

const TRACKER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bencode decoding error: {0}")]
    Bencode(#[from] bencode::BencodeError),

    #[error("tracker URL is invalid: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("tracker returned HTTP error: {0}")]
    Http(String),

    #[error("tracker failure: {0}")]
    Failure(String),

    #[error("malformed peers field: {0}")]
    MalformedPeers(String),
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// A peer advertised by the tracker: an IPv4 address and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[derive(Debug)]
pub struct AnnounceResponse {
    pub interval: i64,
    pub peers: Vec<Peer>,
}

/// A tracker client speaking the HTTP/compact-peers announce protocol.
#[derive(Debug)]
pub struct Client {
    peer_id: [u8; 20],
    port: u16,
    http: reqwest::blocking::Client,
}

impl Client {
    pub fn new() -> TrackerResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(TRACKER_TIMEOUT)
            .build()
            .map_err(|e| TrackerError::Http(e.to_string()))?;
        Ok(Self {
            peer_id: crate::PEER_ID,
            port: crate::LISTEN_PORT,
            http,
        })
    }

    /// Announces to the tracker named in `metainfo.announce` and returns
    /// its peer list.
    #[instrument(skip(self, metainfo), level = "debug")]
    pub fn announce(&self, metainfo: &Metainfo) -> TrackerResult<AnnounceResponse> {
        let mut url = url::Url::parse(&metainfo.announce)?;
        // `info_hash`/`peer_id` are raw bytes pre-encoded with our own
        // percent-encoder; building the query through `query_pairs_mut`
        // would run its own percent-encoding over the already-escaped `%XX`
        // sequences and mangle them. `set_query` only escapes the handful
        // of characters the query component forbids outright (space, `"`,
        // `#`, `<`, `>`), which our encoder never emits, so the raw string
        // survives untouched.
        let query = format!(
            "info_hash={}&peer_id={}&port={}&uploaded=0&downloaded=0&left={}&compact=1",
            url_encode(&metainfo.info.infohash),
            url_encode(&self.peer_id),
            self.port,
            metainfo.info.length,
        );
        url.set_query(Some(&query));
        debug!(%url, "announcing to tracker");

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| TrackerError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TrackerError::Http(format!(
                "tracker responded with status {}",
                response.status()
            )));
        }
        let body = response
            .bytes()
            .map_err(|e| TrackerError::Http(e.to_string()))?;

        parse_announce_response(&body)
    }
}

/// Decodes the bencoded tracker response body: a mapping with `interval`
/// and a compact `peers` byte string, or a `failure reason`.
fn parse_announce_response(body: &[u8]) -> TrackerResult<AnnounceResponse> {
    let decoded = bencode::decoder::decode(body)?;
    let dict = decoded
        .as_dict()
        .ok_or_else(|| TrackerError::MalformedPeers("tracker response is not a dictionary".into()))?;

    if let Some(BencodeValue::String(reason)) = dict.get(b"failure reason".as_slice()) {
        return Err(TrackerError::Failure(String::from_utf8_lossy(reason).into_owned()));
    }

    let interval = dict
        .get(b"interval".as_slice())
        .and_then(BencodeValue::as_integer)
        .unwrap_or(0);

    let peers_bytes = match dict.get(b"peers".as_slice()) {
        Some(BencodeValue::String(bytes)) => bytes,
        Some(_) => return Err(TrackerError::MalformedPeers("'peers' is not a byte string".into())),
        None => return Err(TrackerError::MalformedPeers("response has no 'peers' key".into())),
    };
    if peers_bytes.len() % 6 != 0 {
        return Err(TrackerError::MalformedPeers(format!(
            "'peers' length {} is not a multiple of 6",
            peers_bytes.len()
        )));
    }

    let peers = peers_bytes
        .chunks_exact(6)
        .map(|chunk| Peer {
            ip: Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]),
            port: u16::from_be_bytes([chunk[4], chunk[5]]),
        })
        .collect();

    Ok(AnnounceResponse { interval, peers })
}

/// RFC 3986 percent-encoding with unreserved characters left bare — used
/// for `info_hash`/`peer_id`, which are raw 20-byte strings rather than
/// text.
fn url_encode(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 3);
    for &byte in bytes {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_peer_list() {
        let body = b"d5:peers12:\x01\x02\x03\x04\x1a\xe1\x05\x06\x07\x08\x1a\xe2e";
        let response = parse_announce_response(body).unwrap();
        assert_eq!(
            response.peers,
            vec![
                Peer { ip: Ipv4Addr::new(1, 2, 3, 4), port: 6881 },
                Peer { ip: Ipv4Addr::new(5, 6, 7, 8), port: 6882 },
            ]
        );
    }

    #[test]
    fn failure_reason_is_tracker_error() {
        let body = b"d14:failure reason22:torrent not registerede";
        let err = parse_announce_response(body).unwrap_err();
        assert!(matches!(err, TrackerError::Failure(_)));
    }

    #[test]
    fn missing_peers_key_is_malformed() {
        let body = b"d8:intervali900ee";
        let err = parse_announce_response(body).unwrap_err();
        assert!(matches!(err, TrackerError::MalformedPeers(_)));
    }

    #[test]
    fn peers_length_not_multiple_of_six_is_malformed() {
        let body = b"d5:peers5:abcdee";
        let err = parse_announce_response(body).unwrap_err();
        assert!(matches!(err, TrackerError::MalformedPeers(_)));
    }

    #[test]
    fn url_encode_matches_percent_encoding() {
        assert_eq!(url_encode(b"Hello World!"), "Hello%20World%21");
    }
}
