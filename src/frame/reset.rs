use bytes::{BufMut, Bytes};

use crate::error::Reason;

use super::{Error, Frame, Head, Kind, StreamId};

/// RST_STREAM (RFC 7540 §6.4): abruptly terminates a stream with an error
/// code.
#[derive(Debug)]
pub struct Reset {
    stream_id: StreamId,
    error_code: Reason,
}

impl Reset {
    pub fn new(stream_id: StreamId, error_code: Reason) -> Reset {
        Reset {
            stream_id,
            error_code,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn reason(&self) -> Reason {
        self.error_code
    }

    pub fn load(head: Head, payload: &Bytes) -> Result<Reset, Error> {
        if head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }
        if payload.len() != 4 {
            return Err(Error::BadFrameSize);
        }
        let code = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        Ok(Reset {
            stream_id: head.stream_id(),
            error_code: Reason::from_u32(code),
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let head = Head::new(Kind::Reset, 0, self.stream_id);
        head.encode(4, dst);
        dst.put_u32(self.error_code.as_u32());
    }
}

impl From<Reset> for Frame {
    fn from(src: Reset) -> Frame {
        Frame::Reset(src)
    }
}
