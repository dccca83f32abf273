//! HTTP/2 frame-stream reader (C2): dispatches on frame kind, reading
//! one frame at a time as a plain async method directly off a
//! [`crate::tls::TlsStream`].

mod framed_read;

pub use framed_read::{FrameError, FrameReader};
