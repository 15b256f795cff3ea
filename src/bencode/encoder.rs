use super::BencodeResult;
use super::BencodeValue;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::instrument;

/// Encodes a byte slice as a bencode string: `<length>:<bytes>`.
#[instrument(skip(writer, s), level = "trace")]
fn encode_string<W: Write>(writer: &mut W, s: &[u8]) -> BencodeResult<()> {
    write!(writer, "{}:", s.len())?;
    writer.write_all(s)?;
    Ok(())
}

/// Encodes an integer as `i<decimal>e`.
#[instrument(skip(writer), level = "trace")]
fn encode_integer<W: Write>(writer: &mut W, i: i64) -> BencodeResult<()> {
    write!(writer, "i{i}e")?;
    Ok(())
}

/// Encodes a list as `l<values>e`.
#[instrument(skip(writer, list), level = "trace")]
fn encode_list<W: Write>(writer: &mut W, list: &[BencodeValue]) -> BencodeResult<()> {
    writer.write_all(b"l")?;
    for item in list {
        encode_value(writer, item)?;
    }
    writer.write_all(b"e")?;
    Ok(())
}

/// Encodes a dictionary as `d<key><value>...e` with keys sorted
/// lexicographically by raw bytes — the one rule that makes this encoder
/// canonical rather than merely a valid bencode writer.
#[instrument(skip(writer, dict), level = "trace")]
fn encode_dict<W: Write>(writer: &mut W, dict: &BTreeMap<Vec<u8>, BencodeValue>) -> BencodeResult<()> {
    writer.write_all(b"d")?;
    for (key, value) in dict {
        encode_string(writer, key)?;
        encode_value(writer, value)?;
    }
    writer.write_all(b"e")?;
    Ok(())
}

#[instrument(skip(writer), level = "trace")]
fn encode_value<W: Write>(writer: &mut W, value: &BencodeValue) -> BencodeResult<()> {
    match value {
        BencodeValue::String(s) => encode_string(writer, s),
        BencodeValue::Integer(i) => encode_integer(writer, *i),
        BencodeValue::List(list) => encode_list(writer, list),
        BencodeValue::Dict(dict) => encode_dict(writer, dict),
    }
}

/// Canonically encodes a `BencodeValue` into `writer`.
#[instrument(skip(writer), level = "debug")]
pub fn encode<W: Write>(writer: &mut W, value: &BencodeValue) -> BencodeResult<()> {
    encode_value(writer, value)
}

/// Convenience wrapper returning the encoded bytes directly.
pub fn encode_to_vec(value: &BencodeValue) -> BencodeResult<Vec<u8>> {
    let mut buf = Vec::new();
    encode(&mut buf, value)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::super::decoder::decode;
    use super::*;

    #[test]
    fn round_trips_through_decode() {
        let original = decode(b"d3:bar4:spam3:fooi42e4:listl1:a1:bee").unwrap();
        let encoded = encode_to_vec(&original).unwrap();
        // Canonical re-encode sorts keys, so this also checks key ordering.
        assert_eq!(encoded, b"d3:bar4:spam3:fooi42e4:listl1:a1:beee");
        let reparsed = decode(&encoded).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn encodes_integer_and_string() {
        assert_eq!(
            encode_to_vec(&BencodeValue::Integer(42)).unwrap(),
            b"i42e"
        );
        assert_eq!(
            encode_to_vec(&BencodeValue::String(b"hello".to_vec())).unwrap(),
            b"5:hello"
        );
    }
}
