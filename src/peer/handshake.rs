//! The BitTorrent peer handshake: the first 68 bytes exchanged
//! over a freshly-opened TCP connection, verifying both sides agree on
//! the torrent (via info_hash) before any message framing begins.
use super::{PeerError, PeerResult};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, instrument};

const PROTOCOL: &[u8; 19] = b"BitTorrent protocol";
// Applies to the TCP connect and to every subsequent read/write on the same
// stream, including the later block request/response loop in download.rs.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// A parsed handshake message: protocol header, reserved extension bytes,
/// info_hash, and peer_id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub reserved: [u8; 8],
    pub info_hash: [u8; 20],
    pub peer_id: [u8; 20],
}

impl Handshake {
    fn serialize(info_hash: [u8; 20], peer_id: [u8; 20]) -> [u8; 68] {
        let mut buf = [0u8; 68];
        buf[0] = 19;
        buf[1..20].copy_from_slice(PROTOCOL);
        buf[20..28].copy_from_slice(&[0u8; 8]);
        buf[28..48].copy_from_slice(&info_hash);
        buf[48..68].copy_from_slice(&peer_id);
        buf
    }

    fn read_from(stream: &mut TcpStream) -> PeerResult<Handshake> {
        let mut buf = [0u8; 68];
        stream.read_exact(&mut buf)?;

        if buf[0] != 19 {
            return Err(PeerError::Handshake(format!(
                "expected protocol length 19, got {}",
                buf[0]
            )));
        }
        if &buf[1..20] != PROTOCOL.as_slice() {
            return Err(PeerError::Handshake(format!(
                "unrecognized protocol string: {:?}",
                String::from_utf8_lossy(&buf[1..20])
            )));
        }

        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&buf[20..28]);
        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&buf[28..48]);
        let mut peer_id = [0u8; 20];
        peer_id.copy_from_slice(&buf[48..68]);

        Ok(Handshake {
            reserved,
            info_hash,
            peer_id,
        })
    }

    /// Connects to `peer_addr`, exchanges handshakes, and validates the
    /// peer's info_hash against `info_hash`. Returns the open stream and
    /// the peer's handshake so the caller can continue with message
    /// framing over the same connection.
    #[instrument(skip(info_hash, peer_id), level = "debug")]
    pub fn connect(
        peer_addr: &str,
        info_hash: [u8; 20],
        peer_id: [u8; 20],
    ) -> PeerResult<(TcpStream, Handshake)> {
        let addr = peer_addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| PeerError::Handshake(format!("could not resolve {peer_addr}")))?;

        let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;

        let outgoing = Handshake::serialize(info_hash, peer_id);
        stream.write_all(&outgoing)?;

        let peer_handshake = Handshake::read_from(&mut stream)?;
        if peer_handshake.info_hash != info_hash {
            return Err(PeerError::Handshake(format!(
                "info_hash mismatch: peer sent {}, expected {}",
                hex::encode(peer_handshake.info_hash),
                hex::encode(info_hash)
            )));
        }
        debug!(peer_id = %hex::encode(peer_handshake.peer_id), "handshake complete");

        Ok((stream, peer_handshake))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn serialize_then_parse_round_trips() {
        let info_hash = [7u8; 20];
        let peer_id = [9u8; 20];
        let bytes = Handshake::serialize(info_hash, peer_id);
        assert_eq!(bytes.len(), 68);
        assert_eq!(bytes[0], 19);
        assert_eq!(&bytes[1..20], PROTOCOL.as_slice());
    }

    #[test]
    fn rejects_wrong_protocol_length() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut incoming = [0u8; 68];
            socket.read_exact(&mut incoming).unwrap();
            let mut bad = [0u8; 68];
            bad[0] = 20;
            socket.write_all(&bad).unwrap();
        });

        let result = Handshake::connect(&addr.to_string(), [1u8; 20], [2u8; 20]);
        server.join().unwrap();
        assert!(matches!(result, Err(PeerError::Handshake(_))));
    }

    #[test]
    fn rejects_info_hash_mismatch() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut incoming = [0u8; 68];
            socket.read_exact(&mut incoming).unwrap();
            let reply = Handshake::serialize([0xAAu8; 20], [3u8; 20]);
            socket.write_all(&reply).unwrap();
        });

        let result = Handshake::connect(&addr.to_string(), [1u8; 20], [2u8; 20]);
        server.join().unwrap();
        assert!(matches!(result, Err(PeerError::Handshake(_))));
    }

    #[test]
    fn successful_handshake_returns_peer_id() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let info_hash = [5u8; 20];

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut incoming = [0u8; 68];
            socket.read_exact(&mut incoming).unwrap();
            let reply = Handshake::serialize(info_hash, [6u8; 20]);
            socket.write_all(&reply).unwrap();
        });

        let (_stream, handshake) = Handshake::connect(&addr.to_string(), info_hash, [2u8; 20]).unwrap();
        server.join().unwrap();
        assert_eq!(handshake.peer_id, [6u8; 20]);
    }
}
