use bytes::{BufMut, Bytes};

use super::{Error, Frame, Head, Kind, StreamId};

const ACK_FLAG: u8 = 0x1;

/// PING (RFC 7540 §6.7): an 8-byte opaque roundtrip probe.
#[derive(Debug)]
pub struct Ping {
    ack: bool,
    payload: [u8; 8],
}

impl Ping {
    pub fn ping(payload: [u8; 8]) -> Ping {
        Ping { ack: false, payload }
    }

    pub fn pong(payload: [u8; 8]) -> Ping {
        Ping { ack: true, payload }
    }

    pub fn is_ack(&self) -> bool {
        self.ack
    }

    pub fn payload(&self) -> [u8; 8] {
        self.payload
    }

    pub fn load(head: Head, payload: &Bytes) -> Result<Ping, Error> {
        if !head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }
        if payload.len() != 8 {
            return Err(Error::BadFrameSize);
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(payload);
        Ok(Ping {
            ack: head.flag() & ACK_FLAG != 0,
            payload: buf,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        let flags = if self.ack { ACK_FLAG } else { 0 };
        let head = Head::new(Kind::Ping, flags, StreamId::ZERO);
        head.encode(8, dst);
        dst.put_slice(&self.payload);
    }
}

impl From<Ping> for Frame {
    fn from(src: Ping) -> Frame {
        Frame::Ping(src)
    }
}
