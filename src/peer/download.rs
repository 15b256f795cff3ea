//! Single-piece download state machine: bitfield, interested,
//! unchoke, then a strict request-one/receive-one loop over 16 KiB
//! blocks, verified by SHA-1 and written atomically to disk.
use super::message::PeerMsg;
use super::{PeerError, PeerResult};
use sha1::{Digest, Sha1};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, instrument};

/// Reads messages until the peer unchokes us, sending `Interested` once
/// a `Bitfield` (or any other early message) has been observed. Ignores
/// `Choke` retransmissions; anything besides `Bitfield`/`Choke`/`Unchoke`
/// received in this phase is tolerated and skipped, since this core only
/// needs to reach `Unchoke` to proceed.
fn await_unchoke<S: Read + Write>(stream: &mut S) -> PeerResult<()> {
    let mut sent_interested = false;
    loop {
        match PeerMsg::read_from(stream)? {
            None => continue, // keep-alive
            Some(PeerMsg::Unchoke) => return Ok(()),
            Some(PeerMsg::Choke) => continue,
            Some(_) => {
                if !sent_interested {
                    PeerMsg::Interested.write_to(stream)?;
                    sent_interested = true;
                }
            }
        }
    }
}

/// Downloads piece `piece_index` of `total_length` bytes (`piece_size`
/// bytes of it, per `InfoDict::piece_size`), verifies it against
/// `expected_hash`, and atomically writes it to `output_path`.
#[instrument(skip(stream, expected_hash), fields(piece_index))]
pub fn download_piece<S: Read + Write>(
    stream: &mut S,
    piece_index: u32,
    piece_size: i64,
    expected_hash: [u8; 20],
    output_path: &Path,
) -> PeerResult<()> {
    await_unchoke(stream)?;
    debug!(piece_index, piece_size, "peer unchoked, requesting blocks");

    let piece_size = piece_size as u32;
    let mut piece = Vec::with_capacity(piece_size as usize);
    let mut begin = 0u32;

    while begin < piece_size {
        let block_len = std::cmp::min(crate::BLOCK_SIZE, piece_size - begin);
        PeerMsg::Request { index: piece_index, begin, length: block_len }.write_to(stream)?;

        let block = loop {
            match PeerMsg::read_from(stream)? {
                None => continue,
                Some(PeerMsg::Piece { index, begin: recv_begin, block }) => {
                    if index != piece_index || recv_begin != begin {
                        return Err(PeerError::Protocol(format!(
                            "unexpected block (index={index}, begin={recv_begin}), expected (index={piece_index}, begin={begin})"
                        )));
                    }
                    if block.len() != block_len as usize {
                        return Err(PeerError::Protocol(format!(
                            "block length mismatch: expected {block_len}, got {}",
                            block.len()
                        )));
                    }
                    break block;
                }
                Some(PeerMsg::Choke) => {
                    return Err(PeerError::Protocol("peer choked mid-download".into()));
                }
                Some(_) => continue,
            }
        };

        piece.extend_from_slice(&block);
        begin += block_len;
    }

    let mut hasher = Sha1::new();
    hasher.update(&piece);
    let digest = hasher.finalize();
    if digest.as_slice() != expected_hash {
        return Err(PeerError::Hash(format!(
            "piece {piece_index} hash mismatch: expected {}, got {}",
            hex::encode(expected_hash),
            hex::encode(digest)
        )));
    }

    write_atomically(output_path, &piece)?;
    Ok(())
}

fn write_atomically(output_path: &Path, data: &[u8]) -> PeerResult<()> {
    let dir = output_path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(output_path)
        .map_err(|e| PeerError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{Cursor, Read as _, Write as _};

    /// An in-memory duplex stream: everything written goes to `outbox`,
    /// everything read comes from a scripted `inbox` of pre-encoded
    /// frames, one per `read` call into the bytes a real peer would send.
    struct FakeStream {
        inbox: Cursor<Vec<u8>>,
        outbox: Vec<u8>,
    }

    impl Read for FakeStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inbox.read(buf)
        }
    }

    impl Write for FakeStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.outbox.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn encode_frames(msgs: &[PeerMsg]) -> Vec<u8> {
        let mut buf = Vec::new();
        for msg in msgs {
            msg.write_to(&mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn downloads_single_block_piece_and_verifies_hash() {
        let block = vec![0xABu8; 4];
        let inbox = encode_frames(&[
            PeerMsg::Bitfield(vec![0xFF]),
            PeerMsg::Unchoke,
            PeerMsg::Piece { index: 0, begin: 0, block: block.clone() },
        ]);
        let mut stream = FakeStream { inbox: Cursor::new(inbox), outbox: Vec::new() };

        let mut hasher = Sha1::new();
        hasher.update(&block);
        let expected_hash: [u8; 20] = hasher.finalize().into();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("piece0");

        download_piece(&mut stream, 0, block.len() as i64, expected_hash, &out).unwrap();

        let written = std::fs::read(&out).unwrap();
        assert_eq!(written, block);
    }

    #[test]
    fn hash_mismatch_is_rejected() {
        let block = vec![1u8, 2, 3, 4];
        let inbox = encode_frames(&[
            PeerMsg::Unchoke,
            PeerMsg::Piece { index: 0, begin: 0, block },
        ]);
        let mut stream = FakeStream { inbox: Cursor::new(inbox), outbox: Vec::new() };

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("piece0");
        let err = download_piece(&mut stream, 0, 4, [0u8; 20], &out).unwrap_err();
        assert!(matches!(err, PeerError::Hash(_)));
    }

    #[test]
    fn mismatched_block_index_is_protocol_error() {
        let inbox = encode_frames(&[
            PeerMsg::Unchoke,
            PeerMsg::Piece { index: 9, begin: 0, block: vec![1, 2, 3, 4] },
        ]);
        let mut stream = FakeStream { inbox: Cursor::new(inbox), outbox: Vec::new() };

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("piece0");
        let err = download_piece(&mut stream, 0, 4, [0u8; 20], &out).unwrap_err();
        assert!(matches!(err, PeerError::Protocol(_)));
    }

    #[test]
    fn requests_multiple_blocks_for_large_piece() {
        let piece_size = crate::BLOCK_SIZE * 2 + 10;
        let block0 = vec![0xAAu8; crate::BLOCK_SIZE as usize];
        let block1 = vec![0xBBu8; crate::BLOCK_SIZE as usize];
        let block2 = vec![0xCCu8; 10];

        let inbox = encode_frames(&[
            PeerMsg::Unchoke,
            PeerMsg::Piece { index: 0, begin: 0, block: block0.clone() },
            PeerMsg::Piece { index: 0, begin: crate::BLOCK_SIZE, block: block1.clone() },
            PeerMsg::Piece { index: 0, begin: crate::BLOCK_SIZE * 2, block: block2.clone() },
        ]);
        let mut stream = FakeStream { inbox: Cursor::new(inbox), outbox: Vec::new() };

        let mut whole = Vec::new();
        whole.extend_from_slice(&block0);
        whole.extend_from_slice(&block1);
        whole.extend_from_slice(&block2);
        let mut hasher = Sha1::new();
        hasher.update(&whole);
        let expected_hash: [u8; 20] = hasher.finalize().into();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("piece0");
        download_piece(&mut stream, 0, piece_size as i64, expected_hash, &out).unwrap();

        let written = std::fs::read(&out).unwrap();
        assert_eq!(written, whole);

        let mut requests = VecDeque::new();
        let mut cursor = Cursor::new(stream.outbox);
        while let Some(msg) = PeerMsg::read_from(&mut cursor).unwrap() {
            requests.push_back(msg);
        }
        assert_eq!(requests.len(), 4); // Interested + 3 requests
    }
}
