//! HPACK header block decoding (RFC 7541 §6).

use bytes::{Buf, Bytes};

use super::huffman;
use super::table::{lookup, DynamicTable};

/// Decoding failures. `spec.md` §4.1 calls for `EINVAL`/`ERANGE`-shaped
/// errors; we keep that distinction so callers can tell "malformed input"
/// from "input encoded a value outside what we support" apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecoderError {
    /// Malformed encoding: truncated integer/string, bad index, bad
    /// indexing-table-size update, too many headers.
    #[error("invalid HPACK encoding")]
    Invalid,
    /// A decoded integer required more continuation bytes than we accept.
    #[error("HPACK integer out of range")]
    Range,
}

/// A streaming HPACK decoder bound to one connection's dynamic table.
pub struct Decoder {
    dynamic: DynamicTable,
    configured_max_size: usize,
}

impl Decoder {
    pub fn new(configured_max_size: usize) -> Decoder {
        Decoder {
            dynamic: DynamicTable::new(configured_max_size),
            configured_max_size,
        }
    }

    pub fn dynamic_table_size(&self) -> usize {
        self.dynamic.max_size()
    }

    /// Decodes one full header block (the concatenation of a HEADERS
    /// frame's fragment with any CONTINUATION fragments). `max_headers`
    /// caps the number of headers accepted — exceeding it rejects the
    /// whole block, per `spec.md` §4.1, without retaining any partially
    /// decoded strings.
    pub fn decode_block(
        &mut self,
        block: &Bytes,
        max_headers: usize,
    ) -> Result<Vec<(String, String)>, DecoderError> {
        let mut cursor = &block[..];
        let mut out = Vec::new();

        while cursor.has_remaining() {
            let first = cursor[0];

            if first & 0x80 != 0 {
                let index = decode_integer(&mut cursor, first, 7)?;
                if index == 0 {
                    return Err(DecoderError::Invalid);
                }
                let (name, value) =
                    lookup(&self.dynamic, index as usize).ok_or(DecoderError::Invalid)?;
                out.push((name.to_owned(), value.to_owned()));
            } else if first & 0x40 != 0 {
                let (name, value) = self.decode_literal(&mut cursor, first, 6)?;
                self.dynamic.insert(name.clone(), value.clone());
                out.push((name, value));
            } else if first & 0x20 != 0 {
                let new_max = decode_integer(&mut cursor, first, 5)? as usize;
                if new_max > self.configured_max_size {
                    return Err(DecoderError::Invalid);
                }
                self.dynamic.set_max_size(new_max);
            } else {
                // Literal without indexing (0000xxxx) and literal never
                // indexed (0001xxxx) decode identically; we never
                // re-emit headers, so the never-indexed bit changes
                // nothing at the decode boundary.
                let (name, value) = self.decode_literal(&mut cursor, first, 4)?;
                out.push((name, value));
            }

            if out.len() > max_headers {
                return Err(DecoderError::Invalid);
            }
        }

        Ok(out)
    }

    fn decode_literal(
        &self,
        cursor: &mut &[u8],
        first: u8,
        prefix_bits: u8,
    ) -> Result<(String, String), DecoderError> {
        let index = decode_integer(cursor, first, prefix_bits)?;
        let name = if index == 0 {
            decode_string(cursor)?
        } else {
            lookup(&self.dynamic, index as usize)
                .map(|(n, _)| n.to_owned())
                .ok_or(DecoderError::Invalid)?
        };
        let value = decode_string(cursor)?;
        Ok((name, value))
    }
}

/// Decodes an HPACK variable-length integer (RFC 7541 §5.1) whose
/// `prefix_bits`-bit prefix byte has already been peeked as `first`.
/// Advances `cursor` past whatever continuation bytes it consumes.
fn decode_integer(cursor: &mut &[u8], first: u8, prefix_bits: u8) -> Result<u64, DecoderError> {
    if cursor.is_empty() {
        return Err(DecoderError::Invalid);
    }
    cursor.advance(1);

    let mask = (1u16 << prefix_bits) - 1;
    let prefix = (first as u16 & mask) as u64;
    if prefix < mask as u64 {
        return Ok(prefix);
    }

    let mut value = prefix;
    let mut shift: u32 = 0;
    for _ in 0..4 {
        if cursor.is_empty() {
            return Err(DecoderError::Invalid);
        }
        if shift >= 28 {
            return Err(DecoderError::Range);
        }
        let byte = cursor[0];
        cursor.advance(1);
        value += ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
    Err(DecoderError::Range)
}

/// Decodes a length-prefixed HPACK string (RFC 7541 §5.2): a 1-bit
/// Huffman flag, a 7-bit-prefixed length, then that many octets.
fn decode_string(cursor: &mut &[u8]) -> Result<String, DecoderError> {
    if cursor.is_empty() {
        return Err(DecoderError::Invalid);
    }
    let first = cursor[0];
    let huffman_coded = first & 0x80 != 0;
    let len = decode_integer(cursor, first, 7)? as usize;

    if cursor.len() < len {
        return Err(DecoderError::Invalid);
    }
    let raw = &cursor[..len];
    cursor.advance(len);

    let bytes = if huffman_coded {
        huffman::decode(raw).map_err(|_| DecoderError::Invalid)?
    } else {
        raw.to_vec()
    };
    String::from_utf8(bytes).map_err(|_| DecoderError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(bytes: &[u8]) -> Bytes {
        Bytes::copy_from_slice(bytes)
    }

    #[test]
    fn decode_indexed_static_method_get() {
        let mut d = Decoder::new(4096);
        let headers = d.decode_block(&block(&[0x82]), 100).unwrap();
        assert_eq!(headers, vec![(":method".into(), "GET".into())]);
    }

    #[test]
    fn decode_literal_new_name_no_indexing() {
        let mut d = Decoder::new(4096);
        let data = block(&[0x00, 0x03, b'f', b'o', b'o', 0x03, b'b', b'a', b'r']);
        let headers = d.decode_block(&data, 100).unwrap();
        assert_eq!(headers, vec![("foo".into(), "bar".into())]);
    }

    #[test]
    fn decode_literal_with_incremental_indexing_grows_dynamic_table() {
        let mut d = Decoder::new(4096);
        let data = block(&[
            0x40, 0x04, b't', b'e', b's', b't', 0x05, b'v', b'a', b'l', b'u', b'e',
        ]);
        d.decode_block(&data, 100).unwrap();
        // newest dynamic entry is wire index 62
        let headers = d.decode_block(&block(&[0xbe]), 100).unwrap();
        assert_eq!(headers, vec![("test".into(), "value".into())]);
    }

    #[test]
    fn dynamic_table_size_update_then_indexed() {
        let mut d = Decoder::new(4096);
        let headers = d.decode_block(&block(&[0x20, 0x82]), 100).unwrap();
        assert_eq!(headers, vec![(":method".into(), "GET".into())]);
    }

    #[test]
    fn index_zero_is_invalid() {
        let mut d = Decoder::new(4096);
        assert_eq!(
            d.decode_block(&block(&[0x80]), 100),
            Err(DecoderError::Invalid)
        );
    }

    #[test]
    fn size_update_above_configured_max_is_invalid() {
        let mut d = Decoder::new(4096);
        // 0x3f 0xe1 0x20 encodes 4096 + ... something above configured max
        let data = block(&[0x3f, 0xe1, 0x4f]);
        assert!(d.decode_block(&data, 100).is_err());
    }

    #[test]
    fn truncated_integer_is_invalid() {
        let mut d = Decoder::new(4096);
        // 0xff with no continuation byte: needs more.
        assert_eq!(d.decode_block(&block(&[0xff]), 100), Err(DecoderError::Invalid));
    }

    #[test]
    fn header_count_cap_rejects_whole_block() {
        let mut d = Decoder::new(4096);
        // Two indexed headers, cap of 1.
        let data = block(&[0x82, 0x84]);
        assert!(d.decode_block(&data, 1).is_err());
    }

    #[test]
    fn integer_with_four_continuation_bytes_is_accepted() {
        let mut cursor: &[u8] = &[0xff, 0x80, 0x80, 0x80, 0x00];
        let value = decode_integer(&mut cursor, 0xff, 7).unwrap();
        assert_eq!(value, 127);
        assert!(cursor.is_empty());
    }

    #[test]
    fn integer_with_five_continuation_bytes_is_rejected() {
        // A 5th continuation byte would accumulate bits past shift 28;
        // rejected before it is even read.
        let mut cursor: &[u8] = &[0xff, 0x80, 0x80, 0x80, 0x80, 0x00];
        assert_eq!(
            decode_integer(&mut cursor, 0xff, 7),
            Err(DecoderError::Range)
        );
    }
}
