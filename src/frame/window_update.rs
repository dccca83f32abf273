use bytes::{BufMut, Bytes};

use super::{Error, Frame, Head, Kind, StreamId};

/// WINDOW_UPDATE (RFC 7540 §6.9): credits flow-control window bytes to a
/// stream (or, on stream 0, the whole connection).
#[derive(Debug)]
pub struct WindowUpdate {
    stream_id: StreamId,
    increment: u32,
}

impl WindowUpdate {
    pub fn new(stream_id: StreamId, increment: u32) -> WindowUpdate {
        WindowUpdate {
            stream_id,
            increment,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn size_increment(&self) -> u32 {
        self.increment
    }

    pub fn load(head: Head, payload: &Bytes) -> Result<WindowUpdate, Error> {
        if payload.len() != 4 {
            return Err(Error::BadFrameSize);
        }
        let increment =
            u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & !(1 << 31);
        Ok(WindowUpdate {
            stream_id: head.stream_id(),
            increment,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let head = Head::new(Kind::WindowUpdate, 0, self.stream_id);
        head.encode(4, dst);
        dst.put_u32(self.increment);
    }
}

impl From<WindowUpdate> for Frame {
    fn from(src: WindowUpdate) -> Frame {
        Frame::WindowUpdate(src)
    }
}
