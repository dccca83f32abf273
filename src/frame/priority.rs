use bytes::Bytes;

use super::{Error, Head, StreamId};

/// PRIORITY (RFC 7540 §6.3). We neither honor nor send priority signals
/// (`spec.md` §4.2): the frame is parsed only far enough to validate its
/// fixed size, then discarded.
#[derive(Debug)]
pub struct Priority {
    stream_id: StreamId,
}

impl Priority {
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn load(head: Head, payload: &Bytes) -> Result<Priority, Error> {
        if head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }
        if payload.len() != 5 {
            return Err(Error::BadFrameSize);
        }
        Ok(Priority {
            stream_id: head.stream_id(),
        })
    }
}
