//! HPACK header block encoding.
//!
//! `original_source/modules/access/http/hpackenc.c` documents itself as
//! "currently the simplest possible HPACK compressor: it does not compress
//! anything and is stateless" — every header is emitted as a literal with
//! never-indexed representation (RFC 7541 §6.2.3), with no Huffman coding
//! and no references into the static or dynamic tables. `spec.md` §4.1
//! keeps that contract: the encoder never grows a dynamic table and is
//! safe to call concurrently with the decoder's table (there is none to
//! race with).

use bytes::BufMut;

use crate::frame::headers::Pseudo;

/// Stateless HPACK encoder. Holds no dynamic table; `spec.md` explicitly
/// does not require one on the send side.
#[derive(Debug, Default)]
pub struct Encoder {
    _private: (),
}

impl Encoder {
    pub fn new() -> Encoder {
        Encoder { _private: () }
    }

    /// Appends the pseudo-header fields present on `pseudo`, in the
    /// conventional `:method`/`:scheme`/`:authority`/`:path`/`:status`
    /// order, as HPACK literal-never-indexed representations.
    pub fn encode_pseudo(&mut self, pseudo: &Pseudo, dst: &mut Vec<u8>) {
        if let Some(method) = &pseudo.method {
            self.encode_header(":method", method.as_str(), dst);
        }
        if let Some(scheme) = &pseudo.scheme {
            self.encode_header(":scheme", scheme, dst);
        }
        if let Some(authority) = &pseudo.authority {
            self.encode_header(":authority", authority, dst);
        }
        if let Some(path) = &pseudo.path {
            self.encode_header(":path", path, dst);
        }
        if let Some(status) = &pseudo.status {
            self.encode_header(":status", status.as_str(), dst);
        }
    }

    /// Encodes one header as "Literal Header Field Never Indexed" with a
    /// literal (not indexed) name: `0001 0000`, then the name string, then
    /// the value string. Names are lowercased per HTTP/2's requirement
    /// that field names be ASCII-lowercase (RFC 7540 §8.1.2).
    pub fn encode_header(&mut self, name: &str, value: &str, dst: &mut Vec<u8>) {
        dst.put_u8(0x10);
        encode_string(&name.to_ascii_lowercase(), dst);
        encode_string(value, dst);
    }
}

/// Encodes an HPACK string literal with the Huffman bit always clear: a
/// 7-bit-prefixed length followed by the raw octets.
fn encode_string(s: &str, dst: &mut Vec<u8>) {
    encode_integer(s.len() as u64, 0x00, 7, dst);
    dst.extend_from_slice(s.as_bytes());
}

/// Encodes an HPACK variable-length integer (RFC 7541 §5.1) with `prefix`
/// bits of `flags` already set in the top bits of the first byte.
fn encode_integer(mut value: u64, flags: u8, prefix_bits: u8, dst: &mut Vec<u8>) {
    let max_prefix = (1u64 << prefix_bits) - 1;
    if value < max_prefix {
        dst.put_u8(flags | value as u8);
        return;
    }

    dst.put_u8(flags | max_prefix as u8);
    value -= max_prefix;
    while value >= 0x80 {
        dst.put_u8(((value % 0x80) | 0x80) as u8);
        value /= 0x80;
    }
    dst.put_u8(value as u8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hpack::Decoder;
    use bytes::Bytes;

    #[test]
    fn encoded_headers_round_trip_through_decoder() {
        let mut enc = Encoder::new();
        let mut buf = Vec::new();
        enc.encode_header("Content-Type", "text/plain", &mut buf);
        enc.encode_header("x-custom", "value", &mut buf);

        let mut dec = Decoder::new(4096);
        let headers = dec
            .decode_block(&Bytes::from(buf), 100)
            .expect("decodes cleanly");
        assert_eq!(
            headers,
            vec![
                ("content-type".to_string(), "text/plain".to_string()),
                ("x-custom".to_string(), "value".to_string()),
            ]
        );
    }

    #[test]
    fn never_indexed_does_not_grow_any_dynamic_table() {
        let mut enc = Encoder::new();
        let mut buf = Vec::new();
        enc.encode_header("a", "b", &mut buf);
        assert_eq!(buf[0] & 0xf0, 0x10);
    }

    #[test]
    fn long_string_uses_multi_byte_length_prefix() {
        let long = "x".repeat(200);
        let mut enc = Encoder::new();
        let mut buf = Vec::new();
        enc.encode_header("k", &long, &mut buf);

        let mut dec = Decoder::new(4096);
        let headers = dec.decode_block(&Bytes::from(buf), 10).unwrap();
        assert_eq!(headers[0].1, long);
    }
}
