//! Embeddable HTTP/1.1 and HTTP/2-over-TLS client transport stack for
//! media streaming, distilled from VLC's `modules/access/http`.
//!
//! This crate owns the wire protocols (HTTP/1.1 line format, HTTP/2
//! binary framing, HPACK) and the connection/resource state machines; it
//! is deliberately silent on TLS and sockets (see [`tls`]) and on cookie
//! storage (see [`cookie`]) — both are supplied by the embedder.

pub mod cancel;
pub mod codec;
pub mod cookie;
pub mod error;
pub mod frame;
pub mod h1;
pub mod hpack;
pub mod manager;
pub mod message;
pub mod ports;
pub mod proto;
pub mod resource;
pub mod tls;
pub mod tunnel;

pub use error::{Error, Result};
pub use message::Message;
