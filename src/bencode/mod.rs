//! Bencode: the byte-oriented encoding BitTorrent uses for metainfo files and
//! tracker responses alike. This module owns the one decoder/encoder the
//! rest of the crate shares — metainfo parsing, tracker response parsing,
//! and the `decode` CLI command all go through it.
use std::collections::BTreeMap;
use thiserror::Error;

pub mod decoder;
pub mod encoder;
pub mod json;

/// A decoded Bencode value.
///
/// Dictionary keys must be byte strings, and a `BTreeMap` keeps them in
/// sorted order by construction — convenient since canonical encoding
/// requires lexicographic key order anyway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BencodeValue {
    String(Vec<u8>),
    Integer(i64),
    List(Vec<BencodeValue>),
    Dict(BTreeMap<Vec<u8>, BencodeValue>),
}

impl BencodeValue {
    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            BencodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BencodeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BencodeValue]> {
        match self {
            BencodeValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, BencodeValue>> {
        match self {
            BencodeValue::Dict(d) => Some(d),
            _ => None,
        }
    }
}

/// Errors a bencode decode/encode can produce.
#[derive(Debug, Error)]
pub enum BencodeError {
    #[error("malformed bencode: {0}")]
    Format(String),

    #[error("unexpected end of input")]
    Truncated,

    #[error("invalid integer literal")]
    InvalidInteger,

    #[error("invalid string length prefix")]
    InvalidStringLength,

    #[error("dictionary keys must be byte strings")]
    DictKeyNotString,

    #[error("trailing bytes after a complete value")]
    TrailingData,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BencodeResult<T> = std::result::Result<T, BencodeError>;
