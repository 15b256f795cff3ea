//! Best-effort JSON rendering of a decoded `BencodeValue`, used only by the
//! `decode` CLI command. Bencode byte strings are opaque binary and JSON
//! strings are not; the lossy UTF-8 conversion here is a debug convenience,
//! never a wire format.
use super::BencodeValue;
use serde_json::{Map, Number, Value};

pub fn to_json(value: &BencodeValue) -> Value {
    match value {
        BencodeValue::String(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        BencodeValue::Integer(i) => Value::Number(Number::from(*i)),
        BencodeValue::List(items) => Value::Array(items.iter().map(to_json).collect()),
        BencodeValue::Dict(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, val) in entries {
                map.insert(String::from_utf8_lossy(key).into_owned(), to_json(val));
            }
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::decoder::decode;
    use super::*;

    #[test]
    fn renders_nested_value_as_json() {
        let decoded = decode(b"d3:fooi42e4:listl5:helloee").unwrap();
        let json = to_json(&decoded);
        assert_eq!(json["foo"], 42);
        assert_eq!(json["list"][0], "hello");
    }

    #[test]
    fn non_utf8_bytes_are_lossily_rendered() {
        let decoded = BencodeValue::String(vec![0xff, 0xfe]);
        let json = to_json(&decoded);
        assert!(json.is_string());
    }
}
