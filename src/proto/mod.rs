//! The HTTP/2 protocol engine: C6's output queue, C7's connection/stream
//! dispatch. HPACK (C1) and framing (C2) live in sibling top-level modules
//! and are consumed here rather than re-exported.

mod connection;
mod output;
mod streams;

pub(crate) use connection::Connection;
pub use streams::{RecvStream, DEFAULT_INITIAL_WINDOW_SIZE};
