//! Frame-stream state machine (`spec.md` §4.2): `await-preface` → `generic`
//! ⇄ `await-continuation`, or `failed` on any violation.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Reason;
use crate::frame::{
    self, Continuation, Data, Frame, GoAway, Head, Headers, Kind, Ping, Priority, Reset, Settings,
    StreamId, WindowUpdate, DEFAULT_MAX_FRAME_LEN, HEADER_LEN,
};

/// A frame violation is either fatal to
/// one stream (answered with `RST_STREAM`) or to the whole connection
/// (answered with `GOAWAY`). The caller (`proto::connection`) decides how
/// to react; this reader only classifies.
#[derive(Debug)]
pub enum FrameError {
    Connection(Reason),
    Stream { id: StreamId, reason: Reason },
}

impl From<frame::Error> for FrameError {
    fn from(src: frame::Error) -> FrameError {
        let reason = match src {
            frame::Error::BadFrameSize
            | frame::Error::TooMuchPadding
            | frame::Error::PayloadLengthTooShort
            | frame::Error::PartialSettingLength
            | frame::Error::InvalidPayloadLength
            | frame::Error::InvalidPayloadAckSettings
            | frame::Error::FrameTooLarge => Reason::FrameSizeError,
            frame::Error::InvalidStreamId
            | frame::Error::Short
            | frame::Error::BadFlag
            | frame::Error::BadKind => Reason::ProtocolError,
        };
        FrameError::Connection(reason)
    }
}

enum State {
    AwaitPreface,
    Generic,
    AwaitContinuation(Accumulating),
    Failed,
}

struct Accumulating {
    stream_id: StreamId,
    fragment: BytesMut,
    end_stream: bool,
}

/// Reads one HTTP/2 frame at a time off a TLS session, accumulating
/// HEADERS+CONTINUATION sequences into a single assembled `Frame::Headers`.
/// HPACK decoding itself happens one layer up in `proto::connection`, which
/// owns the connection's dynamic table (`frame::headers`'s doc comment).
pub struct FrameReader {
    state: State,
    max_frame_len: usize,
}

impl FrameReader {
    pub fn new() -> FrameReader {
        FrameReader {
            state: State::AwaitPreface,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Raises the accepted frame size once our SETTINGS have been sent;
    /// RFC 7540 §4.2 requires us to accept up to what we advertised.
    pub fn set_max_frame_len(&mut self, len: usize) {
        self.max_frame_len = len;
    }

    fn fail(&mut self) {
        self.state = State::Failed;
    }

    /// Reads and classifies exactly one logical frame. Returns `Ok(None)`
    /// on a clean EOF between frames (peer closed the connection). Generic
    /// over the reader so the connection's receive task can hand this a
    /// `tokio::io::ReadHalf<TlsStream>` rather than the whole duplex session.
    pub async fn read_frame<R: AsyncRead + Unpin>(
        &mut self,
        session: &mut R,
    ) -> Result<Option<Frame>, FrameError> {
        loop {
            if matches!(self.state, State::Failed) {
                return Err(FrameError::Connection(Reason::ProtocolError));
            }

            let mut header = [0u8; HEADER_LEN];
            match read_or_eof(session, &mut header).await {
                Ok(false) => return Ok(None),
                Ok(true) => {}
                Err(_) => {
                    self.fail();
                    return Err(FrameError::Connection(Reason::InternalError));
                }
            }

            let (head, len) = Head::parse(&header);
            if len > self.max_frame_len {
                self.fail();
                return Err(FrameError::Connection(Reason::FrameSizeError));
            }

            let mut payload = vec![0u8; len];
            if session.read_exact(&mut payload).await.is_err() {
                self.fail();
                return Err(FrameError::Connection(Reason::InternalError));
            }
            let payload = Bytes::from(payload);

            if matches!(self.state, State::AwaitPreface) {
                let ack = head.flag() & 0x1 != 0;
                if head.kind() != Kind::Settings || ack || len > 16_384 {
                    self.fail();
                    return Err(FrameError::Connection(Reason::ProtocolError));
                }
                self.state = State::Generic;
                let settings = Settings::load(head, &payload)?;
                return Ok(Some(Frame::Settings(settings)));
            }

            if matches!(self.state, State::AwaitContinuation(_)) && head.kind() != Kind::Continuation {
                self.fail();
                return Err(FrameError::Connection(Reason::ProtocolError));
            }

            match head.kind() {
                Kind::Data => {
                    let data = Data::load(head, payload)?;
                    return Ok(Some(Frame::Data(data)));
                }
                Kind::Headers => {
                    let headers = Headers::load(head, payload)?;
                    if headers.is_end_headers() {
                        return Ok(Some(Frame::Headers(headers)));
                    }
                    self.state = State::AwaitContinuation(Accumulating {
                        stream_id: headers.stream_id(),
                        end_stream: headers.is_end_stream(),
                        fragment: headers.into_fragment(),
                    });
                }
                Kind::Continuation => {
                    let cont = Continuation::load(head, payload)?;
                    let mut acc = match std::mem::replace(&mut self.state, State::Generic) {
                        State::AwaitContinuation(acc) => acc,
                        _ => {
                            self.fail();
                            return Err(FrameError::Connection(Reason::ProtocolError));
                        }
                    };
                    if cont.stream_id() != acc.stream_id {
                        self.fail();
                        return Err(FrameError::Connection(Reason::ProtocolError));
                    }
                    let end_headers = cont.is_end_headers();
                    acc.fragment.extend_from_slice(&cont.into_fragment());
                    if !end_headers {
                        self.state = State::AwaitContinuation(acc);
                        continue;
                    }
                    return Ok(Some(Frame::Headers(Headers::assembled(
                        acc.stream_id,
                        acc.fragment,
                        acc.end_stream,
                    ))));
                }
                Kind::Priority => {
                    match Priority::load(head, &payload) {
                        Ok(_) => {}
                        Err(_) => {
                            return Err(FrameError::Stream {
                                id: head.stream_id(),
                                reason: Reason::FrameSizeError,
                            });
                        }
                    }
                    // Ignored: we neither honor nor forward priority signals.
                }
                Kind::Reset => {
                    let reset = Reset::load(head, &payload)?;
                    return Ok(Some(Frame::Reset(reset)));
                }
                Kind::Settings => {
                    let settings = Settings::load(head, &payload)?;
                    return Ok(Some(Frame::Settings(settings)));
                }
                Kind::PushPromise => {
                    self.fail();
                    return Err(FrameError::Connection(Reason::ProtocolError));
                }
                Kind::Ping => {
                    let ping = Ping::load(head, &payload)?;
                    return Ok(Some(Frame::Ping(ping)));
                }
                Kind::GoAway => {
                    let goaway = GoAway::load(&payload)?;
                    return Ok(Some(Frame::GoAway(goaway)));
                }
                Kind::WindowUpdate => {
                    let wu = WindowUpdate::load(head, &payload)?;
                    return Ok(Some(Frame::WindowUpdate(wu)));
                }
                Kind::Unknown => {
                    // Length already checked; payload already consumed. Discard.
                }
            }
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        FrameReader::new()
    }
}

/// Reads exactly `buf.len()` bytes, returning `Ok(false)` only if the very
/// first read hits EOF (a clean close between frames); any other partial
/// read is a protocol-level error.
async fn read_or_eof<R: AsyncRead + Unpin>(session: &mut R, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = session.read(&mut buf[filled..]).await?;
        if read == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-frame",
            ));
        }
        filled += read;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Head, Kind as FKind};
    use bytes::BufMut;
    use tokio::io::duplex;

    fn settings_frame_bytes(ack: bool) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let flags = if ack { 0x1 } else { 0 };
        Head::new(FKind::Settings, flags, StreamId::ZERO).encode(0, &mut buf);
        buf.to_vec()
    }

    #[tokio::test]
    async fn preface_must_be_settings_without_ack() {
        let (mut client, mut server) = duplex(4096);
        let bytes = settings_frame_bytes(true);
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let _ = client.write_all(&bytes).await;
        });
        let mut reader = FrameReader::new();
        let err = reader.read_frame(&mut server).await;
        assert!(matches!(err, Err(FrameError::Connection(Reason::ProtocolError))));
    }

    #[tokio::test]
    async fn accepts_settings_preface_then_ping() {
        let (mut client, mut server) = duplex(4096);
        let mut bytes = settings_frame_bytes(false);
        let mut ping = BytesMut::new();
        Head::new(FKind::Ping, 0, StreamId::ZERO).encode(8, &mut ping);
        ping.put_slice(&[0u8; 8]);
        bytes.extend_from_slice(&ping);
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let _ = client.write_all(&bytes).await;
        });
        let mut reader = FrameReader::new();
        let first = reader.read_frame(&mut server).await.unwrap();
        assert!(matches!(first, Some(Frame::Settings(_))));
        let second = reader.read_frame(&mut server).await.unwrap();
        assert!(matches!(second, Some(Frame::Ping(_))));
    }
}
