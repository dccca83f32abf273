//! Crate-wide error taxonomy.
//!
//! Each layer (HPACK, frame codec, HTTP/1.1, HTTP/2 proto, connection
//! manager, resource) defines its own error type close to where the error
//! originates; this module collects them behind one `Error` so callers that
//! don't care which layer failed can match on `error.kind()`.

use std::fmt;

use crate::frame::StreamId;

/// The error-kind taxonomy of the design document, independent of any
/// particular platform error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Syntactic violation on the wire; connection-fatal.
    Protocol,
    /// HTTP/2 frame length invariant violated.
    FrameSize,
    /// DATA exceeded an advertised flow-control window.
    FlowControl,
    /// HPACK failure; connection-fatal.
    Compression,
    /// Frame referenced a stream that doesn't exist (or no longer does).
    StreamClosed,
    /// Stream could not be opened: capacity exhausted or past GOAWAY.
    RefusedStream,
    /// Local cancellation; quiet.
    Cancel,
    /// Transport is dead.
    Io,
    /// HTTP/1.1 line or header block malformed.
    Parse,
    /// Caller-initiated cancellation.
    Interrupted,
    /// Response status outside the `200..599` acceptance window.
    HttpStatus,
    /// `401` with a challenge the caller may retry against.
    AuthRequired,
    /// `201` or a redirecting `3xx`; the caller gets the resolved URL.
    Redirect,
}

/// The standard HTTP/2 error codes of RFC 7540 §7, used on `RST_STREAM` and
/// `GOAWAY` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Reason {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

impl Reason {
    pub fn from_u32(value: u32) -> Reason {
        use Reason::*;
        match value {
            0x0 => NoError,
            0x1 => ProtocolError,
            0x2 => InternalError,
            0x3 => FlowControlError,
            0x4 => SettingsTimeout,
            0x5 => StreamClosed,
            0x6 => FrameSizeError,
            0x7 => RefusedStream,
            0x8 => Cancel,
            0x9 => CompressionError,
            0xa => ConnectError,
            0xb => EnhanceYourCalm,
            0xc => InadequateSecurity,
            0xd => Http11Required,
            _ => InternalError,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::NoError => "no error",
            Reason::ProtocolError => "protocol error",
            Reason::InternalError => "internal error",
            Reason::FlowControlError => "flow control error",
            Reason::SettingsTimeout => "settings timeout",
            Reason::StreamClosed => "stream closed",
            Reason::FrameSizeError => "frame size error",
            Reason::RefusedStream => "refused stream",
            Reason::Cancel => "cancel",
            Reason::CompressionError => "compression error",
            Reason::ConnectError => "connect error",
            Reason::EnhanceYourCalm => "enhance your calm",
            Reason::InadequateSecurity => "inadequate security",
            Reason::Http11Required => "http/1.1 required",
        };
        f.write_str(s)
    }
}

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("protocol error: {0}")]
    Protocol(Reason),

    #[error("frame size error")]
    FrameSize,

    #[error("flow control error")]
    FlowControl,

    #[error("hpack compression error: {0}")]
    Compression(#[from] crate::hpack::DecoderError),

    #[error("stream {0} closed")]
    StreamClosed(StreamId),

    #[error("stream refused")]
    RefusedStream,

    #[error("operation cancelled")]
    Cancel,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed http/1.1 message: {0}")]
    Parse(String),

    #[error("interrupted")]
    Interrupted,

    #[error("http status {0}")]
    HttpStatus(u16),

    #[error("authentication required")]
    AuthRequired { realm: Option<String> },

    #[error("redirected to {0}")]
    Redirect(String),
}

impl Error {
    pub fn kind(&self) -> Kind {
        match self {
            Error::Protocol(_) => Kind::Protocol,
            Error::FrameSize => Kind::FrameSize,
            Error::FlowControl => Kind::FlowControl,
            Error::Compression(_) => Kind::Compression,
            Error::StreamClosed(_) => Kind::StreamClosed,
            Error::RefusedStream => Kind::RefusedStream,
            Error::Cancel => Kind::Cancel,
            Error::Io(_) => Kind::Io,
            Error::Parse(_) => Kind::Parse,
            Error::Interrupted => Kind::Interrupted,
            Error::HttpStatus(_) => Kind::HttpStatus,
            Error::AuthRequired { .. } => Kind::AuthRequired,
            Error::Redirect(_) => Kind::Redirect,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Error {
        Error::Parse(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
