//! CLI front-end (C7): argument parsing, logging initialization, and
//! presentation over the `rs_torrent_client` library. Never duplicates
//! core logic — every subcommand is a thin call into the library crate,
//! and every subcommand returns the unified `ClientError` so `main` has
//! exactly one type to match on for its diagnostic line.
use clap::{Parser, Subcommand};
use rs_torrent_client::error::{ClientError, ClientResult, ResultExt};
use rs_torrent_client::{bencode, peer, torrent::Metainfo, tracker};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rstc", about = "A minimal BitTorrent client core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a bencoded string and print it as JSON.
    Decode { value: String },
    /// Print tracker URL, length, infohash, piece length, and piece hashes.
    Info { torrent: PathBuf },
    /// Announce to the tracker and print the peer list.
    Peers { torrent: PathBuf },
    /// Perform a handshake with a peer and print its peer ID.
    Handshake { torrent: PathBuf, peer_addr: String },
    /// Download and verify a single piece.
    DownloadPiece {
        #[arg(short = 'o', long = "out")]
        out: PathBuf,
        torrent: PathBuf,
        index: u32,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("error ({}): {e}", e.kind());
        std::process::exit(1);
    }
}

fn run() -> ClientResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Decode { value } => decode(&value),
        Command::Info { torrent } => info(&torrent),
        Command::Peers { torrent } => peers(&torrent),
        Command::Handshake { torrent, peer_addr } => handshake(&torrent, &peer_addr),
        Command::DownloadPiece { out, torrent, index } => download_piece(&out, &torrent, index),
    }
}

fn decode(value: &str) -> ClientResult<()> {
    let decoded = bencode::decoder::decode(value.as_bytes()).context("decoding bencode value")?;
    let json = bencode::json::to_json(&decoded);
    println!("{json}");
    Ok(())
}

fn load_metainfo(torrent: &Path) -> ClientResult<Metainfo> {
    let data = std::fs::read(torrent)
        .context(format!("reading torrent file {}", torrent.display()))?;
    Metainfo::from_bytes(&data)
        .context(format!("parsing torrent file {}", torrent.display()))
}

fn info(torrent: &Path) -> ClientResult<()> {
    let metainfo = load_metainfo(torrent)?;
    println!("Tracker URL: {}", metainfo.announce);
    println!("Length: {}", metainfo.info.length);
    println!("Info Hash: {}", hex::encode(metainfo.info.infohash));
    println!("Piece Length: {}", metainfo.info.piece_length);
    println!("Piece Hashes:");
    for hash in metainfo.info.piece_hashes() {
        println!("{}", hex::encode(hash));
    }
    Ok(())
}

fn peers(torrent: &Path) -> ClientResult<()> {
    let metainfo = load_metainfo(torrent)?;
    let client = tracker::Client::new().context("building tracker client")?;
    let response = client.announce(&metainfo).context("announcing to tracker")?;
    for peer in response.peers {
        println!("{peer}");
    }
    Ok(())
}

fn handshake(torrent: &Path, peer_addr: &str) -> ClientResult<()> {
    let metainfo = load_metainfo(torrent)?;
    let (_stream, their_handshake) = peer::Handshake::connect(
        peer_addr,
        metainfo.info.infohash,
        rs_torrent_client::PEER_ID,
    )
    .context(format!("handshaking with {peer_addr}"))?;
    println!("Peer ID: {}", hex::encode(their_handshake.peer_id));
    Ok(())
}

fn download_piece(out: &Path, torrent: &Path, index: u32) -> ClientResult<()> {
    let metainfo = load_metainfo(torrent)?;
    let client = tracker::Client::new().context("building tracker client")?;
    let response = client.announce(&metainfo).context("announcing to tracker")?;
    let peer_addr = response
        .peers
        .first()
        .ok_or_else(|| ClientError::Tracker("tracker returned no peers".into()))?
        .to_string();

    let (mut stream, _their_handshake) = peer::Handshake::connect(
        &peer_addr,
        metainfo.info.infohash,
        rs_torrent_client::PEER_ID,
    )
    .context(format!("handshaking with {peer_addr}"))?;

    let piece_size = metainfo
        .info
        .piece_size(index as usize)
        .context("resolving piece size")?;
    let expected_hash = metainfo
        .info
        .piece_hashes()
        .get(index as usize)
        .copied()
        .ok_or_else(|| ClientError::Schema(format!("piece index {index} out of range")))?;

    peer::download_piece(&mut stream, index, piece_size, expected_hash, out)
        .context("downloading piece")?;

    tracing::info!(index, path = %out.display(), "piece verified");
    println!("Piece {index} downloaded to {}", out.display());
    Ok(())
}
