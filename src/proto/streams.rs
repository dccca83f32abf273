//! HTTP/2 stream state (part of C7): per-stream state tracking built on
//! top of the stream table in `store`.

mod flow_control;
mod store;

pub use flow_control::INITIAL_WINDOW_SIZE as DEFAULT_INITIAL_WINDOW_SIZE;
pub(crate) use store::Store;

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::sync::{mpsc, Mutex};

use crate::error::{Reason, Result};
use crate::frame::{Reset, StreamId, WindowUpdate};
use crate::message::Message;

use self::flow_control::FlowControl;
use super::output::OutputQueue;

/// One event delivered from the connection's receive task to a stream's
/// [`RecvStream`] handle. Headers and data are delivered in arrival order,
/// which is also how `Message::get_final` wants to consume a 1xx followed
/// by the final response: no separate "supersede" step is needed.
#[derive(Debug)]
pub(crate) enum StreamFrame {
    Headers(Vec<(String, String)>),
    Data(Bytes),
    End,
    Reset(Reason),
}

/// What the connection's stream table stores per open stream.
pub(crate) struct StreamEntry {
    pub to_stream: mpsc::UnboundedSender<StreamFrame>,
    pub recv_flow: Arc<Mutex<FlowControl>>,
}

impl StreamEntry {
    pub fn new() -> (
        StreamEntry,
        mpsc::UnboundedReceiver<StreamFrame>,
        Arc<Mutex<FlowControl>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let recv_flow = Arc::new(Mutex::new(FlowControl::new(DEFAULT_INITIAL_WINDOW_SIZE)));
        (
            StreamEntry {
                to_stream: tx,
                recv_flow: recv_flow.clone(),
            },
            rx,
            recv_flow,
        )
    }
}

/// The caller-facing handle for one HTTP/2 stream's inbound half. This core
/// never sends a request body, so there is no outbound counterpart
/// (`spec.md` §4.3's "no request body is sent over HTTP/2"). Matches the
/// API `message::Body::H2` dispatches to: `read`, `read_headers`, `close`.
pub struct RecvStream {
    stream_id: StreamId,
    rx: mpsc::UnboundedReceiver<StreamFrame>,
    recv_flow: Arc<Mutex<FlowControl>>,
    output: OutputQueue,
    ended: bool,
}

impl RecvStream {
    pub(crate) fn new(
        stream_id: StreamId,
        rx: mpsc::UnboundedReceiver<StreamFrame>,
        recv_flow: Arc<Mutex<FlowControl>>,
        output: OutputQueue,
    ) -> RecvStream {
        RecvStream {
            stream_id,
            rx,
            recv_flow,
            output,
            ended: false,
        }
    }

    /// Dequeues one DATA payload, crediting the stream's receive window
    /// back to the peer once half of it has been consumed (`spec.md`
    /// §4.7's "Body read").
    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        if self.ended {
            return Ok(None);
        }
        loop {
            match self.rx.recv().await {
                None => {
                    self.ended = true;
                    return Ok(None);
                }
                Some(StreamFrame::Data(bytes)) => {
                    let credit = {
                        let mut fc = self.recv_flow.lock().await;
                        fc.take_credit()
                    };
                    if let Some(credit) = credit {
                        let mut buf = BytesMut::new();
                        WindowUpdate::new(self.stream_id, credit).encode(&mut buf);
                        let _ = self.output.enqueue_priority(buf);
                    }
                    return Ok(Some(bytes));
                }
                Some(StreamFrame::End) => {
                    self.ended = true;
                    return Ok(None);
                }
                Some(StreamFrame::Reset(_reason)) => {
                    self.ended = true;
                    return Ok(None);
                }
                // No trailers in this core; a stray mid-body header block is dropped.
                Some(StreamFrame::Headers(_)) => continue,
            }
        }
    }

    /// Waits for the next header block: the initial response, or a 1xx
    /// continuation ahead of it (`spec.md` §4.7's "Header wait").
    pub async fn read_headers(&mut self) -> Result<Option<Message>> {
        if self.ended {
            return Ok(None);
        }
        loop {
            match self.rx.recv().await {
                None => {
                    self.ended = true;
                    return Ok(None);
                }
                Some(StreamFrame::Headers(headers)) => {
                    return Message::from_h2_headers(headers).map(Some);
                }
                Some(StreamFrame::End) => {
                    self.ended = true;
                    return Ok(None);
                }
                Some(StreamFrame::Reset(_reason)) => {
                    self.ended = true;
                    return Ok(None);
                }
                Some(StreamFrame::Data(_)) => continue,
            }
        }
    }

    /// `spec.md` §4.7's "Stream close": abandoning the stream before the
    /// peer ended it cleanly sends `RST_STREAM(CANCEL)`.
    pub async fn close(mut self, abort: bool) {
        if abort && !self.ended {
            let mut buf = BytesMut::new();
            Reset::new(self.stream_id, Reason::Cancel).encode(&mut buf);
            let _ = self.output.enqueue(buf);
        }
        self.rx.close();
    }
}
