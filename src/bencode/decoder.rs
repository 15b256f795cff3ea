use super::BencodeError;
use super::BencodeResult;
use super::BencodeValue;

use std::collections::BTreeMap;
use std::io::{self, Read};
use tracing::instrument;

type ByteReader<R> = std::iter::Peekable<io::Bytes<R>>;

fn next_byte<R: Read>(reader: &mut ByteReader<R>) -> BencodeResult<u8> {
    reader
        .next()
        .ok_or(BencodeError::Truncated)?
        .map_err(BencodeError::Io)
}

fn peek_byte<R: Read>(reader: &mut ByteReader<R>) -> BencodeResult<u8> {
    match reader.peek() {
        Some(Ok(&b)) => Ok(b),
        Some(Err(_)) => {
            // Consuming turns the borrowed `io::Error` into an owned one.
            Err(next_byte(reader).unwrap_err())
        }
        None => Err(BencodeError::Truncated),
    }
}

/// Reads bytes up to (and consuming) `delimiter`, returning everything
/// before it as a decimal-digit ASCII string.
#[instrument(skip(reader), level = "trace")]
fn read_digits_until<R: Read>(reader: &mut ByteReader<R>, delimiter: u8) -> BencodeResult<String> {
    let mut buffer = Vec::new();
    loop {
        let current = peek_byte(reader)?;
        if current == delimiter {
            next_byte(reader)?;
            break;
        }
        buffer.push(next_byte(reader)?);
    }
    String::from_utf8(buffer)
        .map_err(|e| BencodeError::Format(format!("non-ASCII digits before '{delimiter}': {e}")))
}

/// Decodes a bencode byte string: `<length>:<bytes>`.
///
/// Zero length is legal and yields an empty vector. The payload is copied
/// byte-for-byte with no UTF-8 assumption — bencode strings are opaque.
#[instrument(skip(reader), level = "trace")]
pub fn decode_string<R: Read>(reader: &mut ByteReader<R>) -> BencodeResult<Vec<u8>> {
    let length_str = read_digits_until(reader, b':')?;
    let length = length_str
        .parse::<usize>()
        .map_err(|_| BencodeError::InvalidStringLength)?;

    let mut bytes = Vec::with_capacity(length);
    for _ in 0..length {
        bytes.push(next_byte(reader)?);
    }
    Ok(bytes)
}

/// Decodes a bencode integer: `i<decimal>e`.
///
/// Lenient: accepts leading zeros and `-0`, which the canonical encoder
/// never produces but real-world trackers and torrent files occasionally
/// do. This decoder is deliberately lenient about both for interop.
#[instrument(skip(reader), level = "trace")]
pub fn decode_integer<R: Read>(reader: &mut ByteReader<R>) -> BencodeResult<i64> {
    let tag = next_byte(reader)?;
    if tag != b'i' {
        return Err(BencodeError::Format("integer must start with 'i'".into()));
    }

    let digits = read_digits_until(reader, b'e')?;
    if digits.is_empty() || digits == "-" {
        return Err(BencodeError::InvalidInteger);
    }

    digits.parse::<i64>().map_err(|_| BencodeError::InvalidInteger)
}

/// Decodes a bencode list: `l<values>e`.
#[instrument(skip(reader), level = "trace")]
fn decode_list<R: Read>(reader: &mut ByteReader<R>) -> BencodeResult<Vec<BencodeValue>> {
    let tag = next_byte(reader)?;
    if tag != b'l' {
        return Err(BencodeError::Format("list must start with 'l'".into()));
    }

    let mut list = Vec::new();
    loop {
        if peek_byte(reader)? == b'e' {
            next_byte(reader)?;
            break;
        }
        list.push(decode_value(reader)?);
    }
    Ok(list)
}

/// Decodes a bencode dictionary: `d<key><value>...e`.
///
/// Keys must be byte strings; a non-digit at key position is a
/// `FormatError` since only byte strings begin with a decimal digit.
#[instrument(skip(reader), level = "trace")]
fn decode_dict<R: Read>(reader: &mut ByteReader<R>) -> BencodeResult<BTreeMap<Vec<u8>, BencodeValue>> {
    let tag = next_byte(reader)?;
    if tag != b'd' {
        return Err(BencodeError::Format("dict must start with 'd'".into()));
    }

    let mut dict = BTreeMap::new();
    loop {
        let lookahead = peek_byte(reader)?;
        if lookahead == b'e' {
            next_byte(reader)?;
            break;
        }
        if !lookahead.is_ascii_digit() {
            return Err(BencodeError::DictKeyNotString);
        }

        let key = decode_string(reader)?;
        let value = decode_value(reader)?;
        dict.insert(key, value);
    }
    Ok(dict)
}

/// Dispatches on the lookahead byte to decode one value of any kind.
#[instrument(skip(reader), level = "trace")]
fn decode_value<R: Read>(reader: &mut ByteReader<R>) -> BencodeResult<BencodeValue> {
    match peek_byte(reader)? {
        b'0'..=b'9' => decode_string(reader).map(BencodeValue::String),
        b'i' => decode_integer(reader).map(BencodeValue::Integer),
        b'l' => decode_list(reader).map(BencodeValue::List),
        b'd' => decode_dict(reader).map(BencodeValue::Dict),
        other => Err(BencodeError::Format(format!(
            "unexpected byte {other:#04x} ('{}')",
            other as char
        ))),
    }
}

/// Decodes exactly one value from a complete byte slice.
///
/// Fails with `TrailingData` if bytes remain after the value — every
/// caller in this crate (metainfo files, tracker responses, the `decode`
/// CLI argument) expects the whole buffer to be a single bencode document.
#[instrument(skip(data), level = "debug")]
pub fn decode(data: &[u8]) -> BencodeResult<BencodeValue> {
    let mut reader = io::Cursor::new(data).bytes().peekable();
    let value = decode_value(&mut reader)?;
    if reader.next().is_some() {
        return Err(BencodeError::TrailingData);
    }
    Ok(value)
}
