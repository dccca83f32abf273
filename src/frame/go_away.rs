use bytes::{BufMut, Bytes};

use crate::error::Reason;

use super::{Error, Frame, Head, Kind, StreamId};

/// GOAWAY (RFC 7540 §6.8): the peer will process no streams above
/// `last_stream_id` and is shutting the connection down.
#[derive(Debug)]
pub struct GoAway {
    last_stream_id: StreamId,
    error_code: Reason,
}

impl GoAway {
    pub fn new(last_stream_id: StreamId, error_code: Reason) -> GoAway {
        GoAway {
            last_stream_id,
            error_code,
        }
    }

    pub fn last_stream_id(&self) -> StreamId {
        self.last_stream_id
    }

    pub fn reason(&self) -> Reason {
        self.error_code
    }

    pub fn load(payload: &Bytes) -> Result<GoAway, Error> {
        if payload.len() < 8 {
            return Err(Error::BadFrameSize);
        }
        let last_stream_id =
            u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & !(1 << 31);
        let code = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
        Ok(GoAway {
            last_stream_id: StreamId::new(last_stream_id),
            error_code: Reason::from_u32(code),
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let head = Head::new(Kind::GoAway, 0, StreamId::ZERO);
        head.encode(8, dst);
        dst.put_u32(self.last_stream_id.as_u32());
        dst.put_u32(self.error_code.as_u32());
    }
}

impl From<GoAway> for Frame {
    fn from(src: GoAway) -> Frame {
        Frame::GoAway(src)
    }
}
