//! HTTP/2 output queue (C6): a prioritized-send design built as a tokio
//! task owning the write half, fed by an async-notified queue in place of
//! a condvar (`spec.md` §4.6).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::tls::TlsStream;

/// The 24-byte client connection preface (RFC 7540 §3.5), written before any
/// frame when we are the client.
pub const CLIENT_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Guards against adversarial PINGs/WINDOW_UPDATEs filling memory
/// (`spec.md` §4.6).
const MAX_QUEUED_BYTES: usize = 16 * 1024 * 1024;

struct State {
    priority: VecDeque<BytesMut>,
    normal: VecDeque<BytesMut>,
    queued_bytes: usize,
    closing: bool,
    failed: bool,
}

struct Shared {
    // Enqueue/pop never await while holding this, so a plain std mutex is
    // enough; the async half of the handshake is the `Notify`.
    state: Mutex<State>,
    notify: Notify,
}

/// A cloneable handle to the two-lane send queue. The actual TLS write
/// happens in a spawned task (`run_send_worker`); callers only ever enqueue.
#[derive(Clone)]
pub struct OutputQueue {
    shared: Arc<Shared>,
}

impl OutputQueue {
    pub fn new() -> OutputQueue {
        OutputQueue {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    priority: VecDeque::new(),
                    normal: VecDeque::new(),
                    queued_bytes: 0,
                    closing: false,
                    failed: false,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Enqueues on the normal lane: HEADERS, DATA, SETTINGS, SETTINGS_ACK,
    /// RST_STREAM, GOAWAY.
    pub fn enqueue(&self, frame: BytesMut) -> Result<()> {
        self.enqueue_many(std::iter::once(frame))
    }

    /// Enqueues several frames atomically on the normal lane, so a
    /// multi-frame HEADERS+CONTINUATION sequence from one caller can never
    /// be interleaved on the wire by a concurrent `open_stream` call.
    pub fn enqueue_many(&self, frames: impl IntoIterator<Item = BytesMut>) -> Result<()> {
        {
            let mut state = self.shared.state.lock().unwrap();
            enqueue_into(&mut state, false, frames)?;
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Enqueues on the priority lane: PING/PONG, WINDOW_UPDATE.
    pub fn enqueue_priority(&self, frame: BytesMut) -> Result<()> {
        {
            let mut state = self.shared.state.lock().unwrap();
            enqueue_into(&mut state, true, std::iter::once(frame))?;
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    /// The owner sets `closing`; the worker drains no further frames and
    /// exits once the queues run dry (`spec.md` §4.6's "Shutdown").
    pub fn close(&self) {
        self.shared.state.lock().unwrap().closing = true;
        self.shared.notify.notify_one();
    }

    async fn pop(&self) -> Option<BytesMut> {
        loop {
            {
                let mut state = self.shared.state.lock().unwrap();
                if let Some(frame) = state.priority.pop_front() {
                    state.queued_bytes -= frame.len();
                    return Some(frame);
                }
                if let Some(frame) = state.normal.pop_front() {
                    state.queued_bytes -= frame.len();
                    return Some(frame);
                }
                if state.closing || state.failed {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }

    fn mark_failed(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.failed = true;
        state.priority.clear();
        state.normal.clear();
        state.queued_bytes = 0;
    }
}

impl Default for OutputQueue {
    fn default() -> Self {
        OutputQueue::new()
    }
}

fn enqueue_into(
    state: &mut State,
    priority: bool,
    frames: impl IntoIterator<Item = BytesMut>,
) -> Result<()> {
    if state.closing || state.failed {
        return Err(queue_closed());
    }
    let frames: Vec<BytesMut> = frames.into_iter().collect();
    let total: usize = frames.iter().map(|f| f.len()).sum();
    if state.queued_bytes + total > MAX_QUEUED_BYTES {
        return Err(queue_closed());
    }
    state.queued_bytes += total;
    let lane = if priority {
        &mut state.priority
    } else {
        &mut state.normal
    };
    lane.extend(frames);
    Ok(())
}

fn queue_closed() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "http/2 output queue is closed or over budget",
    ))
}

/// The C6 send worker: writes the client preface (if applicable), then
/// drains the queue one frame at a time, priority lane first, until closed
/// or a write fails.
pub async fn run_send_worker(
    mut write_half: WriteHalf<TlsStream>,
    queue: OutputQueue,
    client_preface: bool,
) {
    if client_preface && write_half.write_all(CLIENT_PREFACE).await.is_err() {
        queue.mark_failed();
        return;
    }

    while let Some(frame) = queue.pop().await {
        if write_half.write_all(&frame).await.is_err() {
            queue.mark_failed();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_lane_drains_before_normal() {
        let q = OutputQueue::new();
        q.enqueue(BytesMut::from(&b"normal"[..])).unwrap();
        q.enqueue_priority(BytesMut::from(&b"prio"[..])).unwrap();
        let first = q.shared.state.lock().unwrap().priority.front().cloned();
        assert_eq!(first.unwrap(), BytesMut::from(&b"prio"[..]));
    }

    #[test]
    fn over_budget_enqueue_is_rejected() {
        let q = OutputQueue::new();
        let huge = BytesMut::zeroed(MAX_QUEUED_BYTES + 1);
        assert!(q.enqueue(huge).is_err());
    }

    #[test]
    fn closed_queue_rejects_further_enqueues() {
        let q = OutputQueue::new();
        q.close();
        assert!(q.enqueue(BytesMut::from(&b"x"[..])).is_err());
    }
}
