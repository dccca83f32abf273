use bytes::{BufMut, Bytes, BytesMut};
use http::{Method, StatusCode};

use crate::hpack;

use super::{Error, Frame, Head, Kind, StreamId};

const END_STREAM: u8 = 0x1;
const END_HEADERS: u8 = 0x4;
const PADDED: u8 = 0x8;
const PRIORITY: u8 = 0x20;

/// The five pseudo-headers of RFC 7540 §8.1.2.3/§8.1.2.4, broken out of the
/// regular header list because (per `spec.md` §3) they are stored as
/// top-level message fields and never appear among the ordinary headers.
#[derive(Debug, Default, Clone)]
pub struct Pseudo {
    // request
    pub method: Option<Method>,
    pub scheme: Option<String>,
    pub authority: Option<String>,
    pub path: Option<String>,
    // response
    pub status: Option<StatusCode>,
}

impl Pseudo {
    pub fn request(method: Method, scheme: &str, authority: &str, path: &str) -> Pseudo {
        Pseudo {
            method: Some(method),
            scheme: Some(scheme.to_owned()),
            authority: Some(authority.to_owned()),
            path: Some(path.to_owned()),
            status: None,
        }
    }

    pub fn response(status: StatusCode) -> Pseudo {
        Pseudo {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_request(&self) -> bool {
        self.method.is_some()
    }
}

/// A HEADERS frame as received off the wire: padding and the 5-byte
/// priority prefix (if present) have already been stripped, but the
/// fragment itself is still HPACK-compressed bytes — decoding needs the
/// connection's shared dynamic table and so happens one layer up, in
/// `proto::connection`, once `end_headers` accumulation is complete.
#[derive(Debug)]
pub struct Headers {
    stream_id: StreamId,
    fragment: BytesMut,
    end_stream: bool,
    end_headers: bool,
}

impl Headers {
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn is_end_stream(&self) -> bool {
        self.end_stream
    }

    pub fn is_end_headers(&self) -> bool {
        self.end_headers
    }

    pub fn into_fragment(self) -> BytesMut {
        self.fragment
    }

    pub fn fragment(&self) -> &[u8] {
        &self.fragment
    }

    /// Reassembles a HEADERS frame whose fragment spanned one or more
    /// CONTINUATION frames. Called by `codec::FrameReader` once it has seen
    /// `END_HEADERS`; the fragment is still HPACK-compressed.
    pub(crate) fn assembled(stream_id: StreamId, fragment: BytesMut, end_stream: bool) -> Headers {
        Headers {
            stream_id,
            fragment,
            end_stream,
            end_headers: true,
        }
    }

    pub fn load(head: Head, mut payload: Bytes) -> Result<Headers, Error> {
        if head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }

        if head.flag() & PADDED != 0 {
            if payload.is_empty() {
                return Err(Error::TooMuchPadding);
            }
            let pad_len = payload[0] as usize;
            payload = payload.slice(1..);
            if pad_len > payload.len() {
                return Err(Error::TooMuchPadding);
            }
            payload = payload.slice(0..payload.len() - pad_len);
        }

        if head.flag() & PRIORITY != 0 {
            if payload.len() < 5 {
                return Err(Error::PayloadLengthTooShort);
            }
            payload = payload.slice(5..);
        }

        Ok(Headers {
            stream_id: head.stream_id(),
            fragment: BytesMut::from(&payload[..]),
            end_stream: head.flag() & END_STREAM != 0,
            end_headers: head.flag() & END_HEADERS != 0,
        })
    }
}

impl From<Headers> for Frame {
    fn from(src: Headers) -> Frame {
        Frame::Headers(src)
    }
}

/// A CONTINUATION frame (RFC 7540 §6.10): more header block fragment,
/// following a HEADERS frame whose `END_HEADERS` bit was clear. Valid only
/// immediately after its HEADERS on the same stream — no other frame may
/// interleave (`spec.md` §5).
#[derive(Debug)]
pub struct Continuation {
    stream_id: StreamId,
    fragment: BytesMut,
    end_headers: bool,
}

impl Continuation {
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn is_end_headers(&self) -> bool {
        self.end_headers
    }

    pub fn into_fragment(self) -> BytesMut {
        self.fragment
    }

    pub fn load(head: Head, payload: Bytes) -> Result<Continuation, Error> {
        if head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }
        Ok(Continuation {
            stream_id: head.stream_id(),
            fragment: BytesMut::from(&payload[..]),
            end_headers: head.flag() & END_HEADERS != 0,
        })
    }
}

/// Builds the HEADERS frame (and, if the encoded block overflows one
/// frame, the trailing CONTINUATION frames) for an outgoing message.
///
/// Per `spec.md` §4.2: only the first frame may carry `END_STREAM`; only
/// the last carries `END_HEADERS`.
pub fn encode(
    stream_id: StreamId,
    pseudo: &Pseudo,
    headers: &[(String, String)],
    end_stream: bool,
    max_frame_size: usize,
    encoder: &mut hpack::Encoder,
) -> Vec<BytesMut> {
    let mut block = Vec::new();
    encoder.encode_pseudo(pseudo, &mut block);
    for (name, value) in headers {
        encoder.encode_header(name, value, &mut block);
    }

    let mut frames = Vec::new();
    let mut remaining = Bytes::from(block);
    let mut first = true;

    loop {
        let take = remaining.len().min(max_frame_size.max(1));
        let chunk = remaining.slice(0..take);
        remaining = remaining.slice(take..);

        let is_last = remaining.is_empty();
        let mut flags = 0u8;
        if first && end_stream {
            flags |= END_STREAM;
        }
        if is_last {
            flags |= END_HEADERS;
        }

        let kind = if first { Kind::Headers } else { Kind::Continuation };
        let head = Head::new(kind, flags, stream_id);
        let mut frame = BytesMut::with_capacity(super::HEADER_LEN + chunk.len());
        head.encode(chunk.len(), &mut frame);
        frame.put_slice(&chunk);
        frames.push(frame);

        first = false;
        if is_last {
            break;
        }
    }

    frames
}
