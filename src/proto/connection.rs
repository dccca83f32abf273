//! The HTTP/2 connection engine (C7), grounded on
//! `original_source/modules/access/http/h2conn.c`'s two-thread design: one
//! task drains frames off the wire and dispatches them (`vlc_h2_conn_loop`),
//! the other drains `output::OutputQueue` onto it (`vlc_h2_output_loop`,
//! folded into `output::run_send_worker`). Unlike the C original's
//! `active`/`released` reference-counted streams, a stream here is just an
//! entry in `streams::Store`, dropped lazily once the receive task can no
//! longer reach its `RecvStream` (`spec.md` §9's design note on this).

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{split, ReadHalf};
use tokio::sync::Mutex;
use tracing::{debug, trace, Instrument};

use crate::error::{Error, Reason, Result};
use crate::frame::{
    Frame, GoAway, Ping, Reset, Settings, StreamId, WindowUpdate, DEFAULT_SETTINGS_MAX_FRAME_SIZE,
};
use crate::hpack;
use crate::message::Message;
use crate::tls::TlsStream;

use crate::codec::{FrameError, FrameReader};

use super::output::{self, OutputQueue};
use super::streams::{RecvStream, Store, StreamEntry, StreamFrame};

/// `spec.md` §4.2: the frame size we advertise in our own SETTINGS, and so
/// must accept from the peer once it has been sent.
const OUR_MAX_FRAME_SIZE: usize = 1_048_576;

/// `spec.md` §4.2: the connection-level receive window we maintain by
/// crediting it back up to this floor whenever it drops below it, so the
/// peer is never connection-flow-controlled.
const CONNECTION_WINDOW_FLOOR: i64 = 1 << 30;

/// HPACK's `decode_block` caps the number of headers per block, not their
/// encoded byte size; this is a separate, coarser guard than the
/// `MAX_HEADER_LIST_SIZE` we advertise, picked generously for the header
/// counts real media origins send.
const MAX_HEADER_COUNT: usize = 256;

struct Shared {
    store: Store,
    next_id: u32,
    /// Set once a GOAWAY has been sent or received, or stream ids are
    /// exhausted: `open_stream` refuses from then on (`spec.md` §4.8).
    refuse_open: bool,
    /// `MAX_FRAME_SIZE` last advertised by the peer's SETTINGS, applied to
    /// our own outgoing HEADERS splitting.
    peer_max_frame_size: usize,
}

/// A live HTTP/2 connection. Cheaply `Clone`able: every clone shares the
/// same stream table and output queue, matching how the manager
/// (`spec.md` §4.8) hands the same connection out to concurrent callers.
#[derive(Clone)]
pub(crate) struct Connection {
    shared: Arc<Mutex<Shared>>,
    output: OutputQueue,
}

impl Connection {
    /// Splits `session`, spawns the send worker and the receive task, and
    /// enqueues our initial SETTINGS. Returns immediately; the handshake
    /// itself completes in the background.
    pub fn new(session: TlsStream, client_side: bool) -> Connection {
        let span = tracing::info_span!("h2_connection", client_side);
        let (read_half, write_half) = split(session);

        let output = OutputQueue::new();
        tokio::spawn(
            output::run_send_worker(write_half, output.clone(), client_side).instrument(span.clone()),
        );

        let mut ours = BytesMut::new();
        Settings::ours().encode(&mut ours);
        let _ = output.enqueue(ours);

        let shared = Arc::new(Mutex::new(Shared {
            store: Store::new(),
            next_id: 1,
            refuse_open: false,
            peer_max_frame_size: DEFAULT_SETTINGS_MAX_FRAME_SIZE,
        }));

        tokio::spawn(receive_loop(read_half, shared.clone(), output.clone()).instrument(span));

        Connection { shared, output }
    }

    /// `spec.md` §4.8: whether the manager may still hand this connection
    /// out for a new request.
    pub async fn is_usable(&self) -> bool {
        !self.shared.lock().await.refuse_open
    }

    /// Opens a new client-initiated stream: allocates the next odd stream
    /// id, HPACK-encodes and enqueues the request's HEADERS(+CONTINUATION),
    /// and returns the handle the caller reads the response from.
    pub async fn open_stream(&self, request: &Message) -> Result<RecvStream> {
        let mut guard = self.shared.lock().await;
        if guard.refuse_open {
            return Err(Error::RefusedStream);
        }
        if guard.next_id > StreamId::MAX.as_u32() {
            guard.refuse_open = true;
            return Err(Error::RefusedStream);
        }

        let stream_id = StreamId::new(guard.next_id);
        guard.next_id += 2;
        let max_frame_size = guard.peer_max_frame_size;

        let mut encoder = hpack::Encoder::new();
        let frames = request.to_h2_frames(stream_id, true, max_frame_size, &mut encoder)?;

        let (entry, rx, recv_flow) = StreamEntry::new();
        guard.store.insert(stream_id, entry);
        drop(guard);

        if self.output.enqueue_many(frames).is_err() {
            let mut guard = self.shared.lock().await;
            guard.store.remove(stream_id);
            guard.refuse_open = true;
            return Err(Error::RefusedStream);
        }

        Ok(RecvStream::new(stream_id, rx, recv_flow, self.output.clone()))
    }
}

/// The receive task: reads frames until EOF or a connection-fatal error,
/// dispatching each to the stream table or answering it directly
/// (SETTINGS/PING/WINDOW_UPDATE never reach a stream).
async fn receive_loop(mut read_half: ReadHalf<TlsStream>, shared: Arc<Mutex<Shared>>, output: OutputQueue) {
    let mut reader = FrameReader::new();
    reader.set_max_frame_len(OUR_MAX_FRAME_SIZE);
    let mut decoder = hpack::Decoder::new(crate::frame::DEFAULT_SETTINGS_HEADER_TABLE_SIZE);
    let mut conn_recv_window: i64 = CONNECTION_WINDOW_FLOOR;

    loop {
        match reader.read_frame(&mut read_half).await {
            Ok(None) => break,
            Ok(Some(frame)) => {
                if let Err(err) = dispatch(frame, &shared, &output, &mut decoder, &mut conn_recv_window).await
                {
                    if !answer_error(&output, err).await {
                        break;
                    }
                }
            }
            Err(err) => {
                if !answer_error(&output, err).await {
                    break;
                }
            }
        }
    }

    debug!("receive loop ending");
    output.close();
    let mut guard = shared.lock().await;
    guard.refuse_open = true;
    guard.store.drain_ids();
}

/// Turns a classified frame error into the RST_STREAM or GOAWAY that
/// answers it, per `spec.md` §4.2's per-type fatality table. Returns
/// whether the receive loop should keep reading: it does for a
/// stream-fatal error, but a connection-fatal one ends the connection.
async fn answer_error(output: &OutputQueue, err: FrameError) -> bool {
    match err {
        FrameError::Stream { id, reason } => {
            let mut buf = BytesMut::new();
            Reset::new(id, reason).encode(&mut buf);
            let _ = output.enqueue(buf);
            true
        }
        FrameError::Connection(reason) => {
            let mut buf = BytesMut::new();
            GoAway::new(StreamId::ZERO, reason).encode(&mut buf);
            let _ = output.enqueue(buf);
            false
        }
    }
}

async fn dispatch(
    frame: Frame,
    shared: &Mutex<Shared>,
    output: &OutputQueue,
    decoder: &mut hpack::Decoder,
    conn_recv_window: &mut i64,
) -> std::result::Result<(), FrameError> {
    match frame {
        Frame::Settings(settings) => {
            trace!(?settings, "recv settings");
            if settings.is_ack() {
                return Ok(());
            }
            if let Some(max_frame_size) = settings.max_frame_size() {
                shared.lock().await.peer_max_frame_size = max_frame_size as usize;
            }
            let mut ack = BytesMut::new();
            Settings::ack().encode(&mut ack);
            let _ = output.enqueue(ack);
            Ok(())
        }
        Frame::Ping(ping) => {
            if !ping.is_ack() {
                let mut buf = BytesMut::new();
                Ping::pong(ping.payload()).encode(&mut buf);
                let _ = output.enqueue_priority(buf);
            }
            Ok(())
        }
        // We never throttle our own sends, so credits toward us are moot.
        Frame::WindowUpdate(_) => Ok(()),
        Frame::Priority(_) => Ok(()),
        Frame::GoAway(goaway) => {
            debug!(last_stream_id = ?goaway.last_stream_id(), reason = %goaway.reason(), "recv goaway");
            let mut guard = shared.lock().await;
            guard.refuse_open = true;
            let stale = guard.store.ids_greater_than(goaway.last_stream_id());
            for id in stale {
                if let Some(entry) = guard.store.remove(id) {
                    let _ = entry.to_stream.send(StreamFrame::Reset(Reason::RefusedStream));
                }
            }
            Ok(())
        }
        Frame::Reset(reset) => {
            let mut guard = shared.lock().await;
            if let Some(entry) = guard.store.remove(reset.stream_id()) {
                let _ = entry.to_stream.send(StreamFrame::Reset(reset.reason()));
            }
            Ok(())
        }
        Frame::Headers(headers) => {
            let stream_id = headers.stream_id();
            let end_stream = headers.is_end_stream();
            trace!(?stream_id, end_stream, "recv headers");
            let fragment = Bytes::copy_from_slice(headers.fragment());
            let decoded = decoder
                .decode_block(&fragment, MAX_HEADER_COUNT)
                .map_err(|_| FrameError::Connection(Reason::CompressionError))?;

            let mut guard = shared.lock().await;
            let Some(entry) = guard.store.get_mut(stream_id) else {
                drop(guard);
                return Err(FrameError::Stream {
                    id: stream_id,
                    reason: Reason::RefusedStream,
                });
            };
            let delivered = entry.to_stream.send(StreamFrame::Headers(decoded)).is_ok();
            if end_stream {
                let _ = entry.to_stream.send(StreamFrame::End);
            }
            if !delivered || end_stream {
                guard.store.remove(stream_id);
            }
            Ok(())
        }
        Frame::Data(data) => {
            let stream_id = data.stream_id();
            let len = data.payload().len() as u32;

            *conn_recv_window -= len as i64;
            if *conn_recv_window < CONNECTION_WINDOW_FLOOR {
                let credit = CONNECTION_WINDOW_FLOOR as u32;
                let mut buf = BytesMut::new();
                WindowUpdate::new(StreamId::ZERO, credit).encode(&mut buf);
                if output.enqueue_priority(buf).is_ok() {
                    *conn_recv_window += credit as i64;
                }
            }

            let mut guard = shared.lock().await;
            let Some(entry) = guard.store.get_mut(stream_id) else {
                drop(guard);
                return Err(FrameError::Stream {
                    id: stream_id,
                    reason: Reason::StreamClosed,
                });
            };

            {
                let mut fc = entry.recv_flow.lock().await;
                if fc.consume(len).is_err() {
                    drop(fc);
                    guard.store.remove(stream_id);
                    return Err(FrameError::Stream {
                        id: stream_id,
                        reason: Reason::FlowControlError,
                    });
                }
            }

            let end_stream = data.is_end_stream();
            let delivered = entry.to_stream.send(StreamFrame::Data(data.into_payload())).is_ok();
            if end_stream {
                let _ = entry.to_stream.send(StreamFrame::End);
            }
            if !delivered || end_stream {
                guard.store.remove(stream_id);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use crate::hpack::Encoder;

    /// Reads exactly `n` bytes off `io`, for consuming the raw client
    /// preface ahead of the framed stream.
    async fn read_exact_bytes<R: tokio::io::AsyncRead + Unpin>(io: &mut R, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        io.read_exact(&mut buf).await.unwrap();
        buf
    }

    /// Scenario 5: a stream reset by the peer resolves as a clean end
    /// rather than an error, for both the header wait and the body read.
    #[tokio::test]
    async fn reset_stream_resolves_as_none_not_error() {
        let (client_io, mut server_io) = duplex(65536);
        let conn = Connection::new(Box::new(client_io), true);

        let req = Message::request("GET", Some("https"), Some("example.com"), Some("/")).unwrap();
        let mut stream = conn.open_stream(&req).await.unwrap();

        // Consume the 24-byte client preface, then the client's initial
        // SETTINGS, answering with our own so the client leaves
        // await-preface.
        read_exact_bytes(&mut server_io, output::CLIENT_PREFACE.len()).await;
        let mut reader = FrameReader::new();
        let settings = reader.read_frame(&mut server_io).await.unwrap().unwrap();
        assert!(matches!(settings, Frame::Settings(_)));

        let mut buf = BytesMut::new();
        Settings::ours().encode(&mut buf);
        server_io.write_all(&buf).await.unwrap();

        // The client's request HEADERS follow.
        let headers = reader.read_frame(&mut server_io).await.unwrap().unwrap();
        let stream_id = match headers {
            Frame::Headers(h) => h.stream_id(),
            other => panic!("expected request headers, got {other:?}"),
        };

        // Reset the stream instead of answering it.
        let mut reset = BytesMut::new();
        Reset::new(stream_id, Reason::Cancel).encode(&mut reset);
        server_io.write_all(&reset).await.unwrap();

        assert!(stream.read_headers().await.unwrap().is_none());
        assert!(stream.read().await.unwrap().is_none());
    }

    /// A response delivered before the reset is still handed to the
    /// caller; only the still-open body read resolves as a clean end.
    #[tokio::test]
    async fn reset_after_headers_still_ends_body_cleanly() {
        let (client_io, mut server_io) = duplex(65536);
        let conn = Connection::new(Box::new(client_io), true);

        let req = Message::request("GET", Some("https"), Some("example.com"), Some("/")).unwrap();
        let mut stream = conn.open_stream(&req).await.unwrap();

        read_exact_bytes(&mut server_io, output::CLIENT_PREFACE.len()).await;
        let mut reader = FrameReader::new();
        reader.read_frame(&mut server_io).await.unwrap();

        let mut buf = BytesMut::new();
        Settings::ours().encode(&mut buf);
        server_io.write_all(&buf).await.unwrap();

        let headers = reader.read_frame(&mut server_io).await.unwrap().unwrap();
        let stream_id = match headers {
            Frame::Headers(h) => h.stream_id(),
            other => panic!("expected request headers, got {other:?}"),
        };

        let response = Message::response(200).unwrap();
        let mut encoder = Encoder::new();
        for frame in response.to_h2_frames(stream_id, false, 16_384, &mut encoder).unwrap() {
            server_io.write_all(&frame).await.unwrap();
        }

        let mut reset = BytesMut::new();
        Reset::new(stream_id, Reason::Cancel).encode(&mut reset);
        server_io.write_all(&reset).await.unwrap();

        let received = stream.read_headers().await.unwrap();
        assert_eq!(received.unwrap().status(), Some(200));
        assert!(stream.read().await.unwrap().is_none());
    }
}
