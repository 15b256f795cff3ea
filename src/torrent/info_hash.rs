use super::TorrentResult;
use crate::bencode;
use crate::bencode::BencodeValue;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// Computes the infohash: SHA-1 over the canonical bencode re-encoding of
/// the `info` dictionary. This re-encodes the typed projection rather than
/// hashing a captured source-byte span — see `Metainfo::from_bytes` for
/// the caveat.
pub fn calculate_info_hash(info_dict: &BTreeMap<Vec<u8>, BencodeValue>) -> TorrentResult<[u8; 20]> {
    let canonical = bencode::encoder::encode_to_vec(&BencodeValue::Dict(info_dict.clone()))?;

    let mut hasher = Sha1::new();
    hasher.update(&canonical);
    let digest = hasher.finalize();

    let mut info_hash = [0u8; 20];
    info_hash.copy_from_slice(&digest);
    Ok(info_hash)
}
