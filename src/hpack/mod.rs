//! HPACK header compression (RFC 7541), as used by the HTTP/2 connection
//! engine (C7) to decode and encode HEADERS/CONTINUATION blocks.
//!
//! The dynamic table lives for the lifetime of one connection and, per
//! `spec.md` §3, is touched only by the connection's receive task — no
//! external locking is required.

mod decoder;
mod encoder;
mod huffman;
mod table;

pub use self::decoder::{Decoder, DecoderError};
pub use self::encoder::Encoder;
pub use self::table::{DynamicTable, STATIC_TABLE};
