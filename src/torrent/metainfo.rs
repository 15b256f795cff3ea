//! The typed projection of a decoded `.torrent` file (C2): `Metainfo` pairs
//! the tracker URL with a single-file `InfoDict`. Multi-file torrents are
//! an explicit non-goal, so a `files` key in place of `length` is a
//! schema error rather than a second code path.
use super::info_hash::calculate_info_hash;
use super::{TorrentError, TorrentResult};
use crate::bencode::{self, BencodeValue};
use tracing::instrument;

/// Typed view over the `info` sub-dictionary of a single-file torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoDict {
    pub length: i64,
    pub name: String,
    pub piece_length: i64,
    pub pieces: Vec<u8>,
    pub infohash: [u8; 20],
}

impl InfoDict {
    /// Partitions `pieces` into consecutive 20-byte SHA-1 windows.
    pub fn piece_hashes(&self) -> Vec<[u8; 20]> {
        self.pieces
            .chunks_exact(20)
            .map(|chunk| {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(chunk);
                hash
            })
            .collect()
    }

    pub fn num_pieces(&self) -> usize {
        self.pieces.len() / 20
    }

    /// Byte length of piece `index`: `piece_length` for every piece except
    /// the last, which absorbs whatever remains of `length`.
    pub fn piece_size(&self, index: usize) -> TorrentResult<i64> {
        let num_pieces = self.num_pieces();
        if index >= num_pieces {
            return Err(TorrentError::Schema(format!(
                "piece index {index} out of range (torrent has {num_pieces} pieces)"
            )));
        }
        if index < num_pieces - 1 {
            Ok(self.piece_length)
        } else {
            Ok(self.length - (num_pieces as i64 - 1) * self.piece_length)
        }
    }
}

/// `announce` paired with the single-file `info` dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metainfo {
    pub announce: String,
    pub info: InfoDict,
}

fn require_string(dict: &std::collections::BTreeMap<Vec<u8>, BencodeValue>, key: &[u8]) -> TorrentResult<Vec<u8>> {
    match dict.get(key) {
        Some(BencodeValue::String(s)) => Ok(s.clone()),
        Some(_) => Err(TorrentError::Schema(format!(
            "'{}' must be a byte string",
            String::from_utf8_lossy(key)
        ))),
        None => Err(TorrentError::Schema(format!(
            "missing required key '{}'",
            String::from_utf8_lossy(key)
        ))),
    }
}

fn require_integer(dict: &std::collections::BTreeMap<Vec<u8>, BencodeValue>, key: &[u8]) -> TorrentResult<i64> {
    match dict.get(key) {
        Some(BencodeValue::Integer(i)) => Ok(*i),
        Some(_) => Err(TorrentError::Schema(format!(
            "'{}' must be an integer",
            String::from_utf8_lossy(key)
        ))),
        None => Err(TorrentError::Schema(format!(
            "missing required key '{}'",
            String::from_utf8_lossy(key)
        ))),
    }
}

impl Metainfo {
    /// Parses a complete `.torrent` file's bytes.
    ///
    /// Infohash fidelity note: this re-encodes the typed projection of
    /// `info` with the canonical encoder rather than hashing the original
    /// byte range captured during decode. That is
    /// correct for any single-file `info` dictionary limited to the four
    /// keys this core recognizes — the only shape it accepts — but would
    /// diverge from the source bytes for a dictionary carrying unrecognized
    /// keys alongside them. The decoder does not track source spans, so
    /// span-based hashing is left as a documented limitation rather than
    /// built out.
    #[instrument(skip(data), level = "debug")]
    pub fn from_bytes(data: &[u8]) -> TorrentResult<Metainfo> {
        let root = bencode::decoder::decode(data)?;
        let mut root = match root {
            BencodeValue::Dict(d) => d,
            _ => return Err(TorrentError::Schema("torrent file is not a dictionary".into())),
        };

        let announce = String::from_utf8(require_string(&root, b"announce")?)
            .map_err(|e| TorrentError::Schema(format!("announce is not valid ASCII/UTF-8: {e}")))?;

        let info_value = root
            .remove(b"info".as_slice())
            .ok_or_else(|| TorrentError::Schema("missing required key 'info'".into()))?;
        let info_dict = match &info_value {
            BencodeValue::Dict(d) => d.clone(),
            _ => return Err(TorrentError::Schema("'info' must be a dictionary".into())),
        };

        let length = require_integer(&info_dict, b"length")?;
        if length < 0 {
            return Err(TorrentError::Schema("'length' must be non-negative".into()));
        }
        let name = String::from_utf8(require_string(&info_dict, b"name")?)
            .map_err(|e| TorrentError::Schema(format!("name is not valid UTF-8: {e}")))?;
        let piece_length = require_integer(&info_dict, b"piece length")?;
        if piece_length <= 0 {
            return Err(TorrentError::Schema("'piece length' must be positive".into()));
        }
        let pieces = require_string(&info_dict, b"pieces")?;
        if pieces.len() % 20 != 0 {
            return Err(TorrentError::Schema(
                "'pieces' length is not a multiple of 20".into(),
            ));
        }

        let expected_pieces = ((length as f64) / (piece_length as f64)).ceil() as usize;
        let actual_pieces = pieces.len() / 20;
        if length > 0 && expected_pieces != actual_pieces {
            return Err(TorrentError::Schema(format!(
                "piece count mismatch: expected {expected_pieces} from length/piece_length, got {actual_pieces} from pieces"
            )));
        }

        let infohash = calculate_info_hash(&info_dict)?;

        Ok(Metainfo {
            announce,
            info: InfoDict {
                length,
                name,
                piece_length,
                pieces,
                infohash,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_torrent_bytes() -> Vec<u8> {
        // length=92063, piece_length=32768 -> 3 pieces, last = 26527 bytes.
        let pieces = vec![0u8; 60];
        let mut buf = Vec::new();
        buf.extend_from_slice(b"d8:announce32:http://tracker.example/announce4:infod6:lengthi92063e4:name8:foo.file12:piece lengthi32768e6:pieces");
        buf.extend_from_slice(format!("{}:", pieces.len()).as_bytes());
        buf.extend_from_slice(&pieces);
        buf.extend_from_slice(b"ee");
        buf
    }

    #[test]
    fn parses_single_file_torrent_and_computes_piece_sizes() {
        let metainfo = Metainfo::from_bytes(&sample_torrent_bytes()).unwrap();
        assert_eq!(metainfo.announce, "http://tracker.example/announce");
        assert_eq!(metainfo.info.length, 92063);
        assert_eq!(metainfo.info.num_pieces(), 3);
        assert_eq!(metainfo.info.piece_size(0).unwrap(), 32768);
        assert_eq!(metainfo.info.piece_size(1).unwrap(), 32768);
        assert_eq!(metainfo.info.piece_size(2).unwrap(), 26527);
    }

    #[test]
    fn piece_hashes_partitions_into_twenty_byte_windows() {
        let metainfo = Metainfo::from_bytes(&sample_torrent_bytes()).unwrap();
        let hashes = metainfo.info.piece_hashes();
        assert_eq!(hashes.len(), 3);
        assert!(hashes.iter().all(|h| h.len() == 20));
    }

    #[test]
    fn out_of_range_piece_index_is_schema_error() {
        let metainfo = Metainfo::from_bytes(&sample_torrent_bytes()).unwrap();
        assert!(metainfo.info.piece_size(3).is_err());
    }

    #[test]
    fn missing_info_is_schema_error() {
        let err = Metainfo::from_bytes(b"d8:announce3:foo6:lengthi1ee").unwrap_err();
        assert!(matches!(err, TorrentError::Schema(_)));
    }

    #[test]
    fn bad_pieces_length_is_schema_error() {
        let bytes = b"d8:announce3:foo4:infod6:lengthi10e4:name1:x12:piece lengthi5e6:pieces3:abce".to_vec();
        let err = Metainfo::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, TorrentError::Schema(_)));
    }
}
