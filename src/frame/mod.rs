//! HTTP/2 binary framing (RFC 7540 §4).
//!
//! Every frame is a 9-byte header (`length:24 | type:8 | flags:8 | R:1 |
//! stream_id:31`) followed by a `length`-byte payload. `Head` models the
//! header; `Kind` the frame type; the per-type modules model the payload.

mod data;
mod go_away;
mod head;
mod headers;
mod ping;
mod priority;
mod reset;
mod settings;
mod window_update;

pub use self::data::Data;
pub use self::go_away::GoAway;
pub use self::head::{Head, Kind, StreamId};
pub use self::headers::{Continuation, Headers, Pseudo};
pub use self::ping::Ping;
pub use self::priority::Priority;
pub use self::reset::Reset;
pub use self::settings::Settings;
pub use self::window_update::WindowUpdate;

pub use self::settings::{DEFAULT_SETTINGS_HEADER_TABLE_SIZE, DEFAULT_SETTINGS_MAX_FRAME_SIZE};

/// 9-byte frame header length, present ahead of every frame's payload.
pub const HEADER_LEN: usize = 9;

/// The largest frame length we will ever *accept*. RFC 7540 §4.2 only
/// requires peers to accept 16 KiB; we are generous on receive.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// The minimum frame size every HTTP/2 endpoint must accept (RFC 7540
/// §4.2), used as our default outbound cap until the peer's SETTINGS
/// raises it.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024;

#[derive(Debug)]
pub enum Frame {
    Data(Data),
    Headers(Headers),
    Priority(Priority),
    Reset(Reset),
    Settings(Settings),
    Ping(Ping),
    GoAway(GoAway),
    WindowUpdate(WindowUpdate),
}

impl Frame {
    pub fn stream_id(&self) -> StreamId {
        match self {
            Frame::Data(f) => f.stream_id(),
            Frame::Headers(f) => f.stream_id(),
            Frame::Priority(f) => f.stream_id(),
            Frame::Reset(f) => f.stream_id(),
            Frame::Settings(_) => StreamId::ZERO,
            Frame::Ping(_) => StreamId::ZERO,
            Frame::GoAway(_) => StreamId::ZERO,
            Frame::WindowUpdate(f) => f.stream_id(),
        }
    }
}

/// Errors that can occur while parsing an HTTP/2 frame.
///
/// The connection's receive loop (`proto::connection`) decides, per
/// `spec.md` §4.2's per-type table, whether a given variant is
/// connection-fatal or only stream-fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("frame header too short")]
    Short,
    #[error("unsupported flag bits set")]
    BadFlag,
    #[error("unsupported frame type")]
    BadKind,
    #[error("frame had the wrong fixed size")]
    BadFrameSize,
    #[error("padding length exceeded payload length")]
    TooMuchPadding,
    #[error("payload shorter than the frame type requires")]
    PayloadLengthTooShort,
    #[error("SETTINGS payload was not a multiple of 6 bytes")]
    PartialSettingLength,
    #[error("payload length invalid for this frame type")]
    InvalidPayloadLength,
    #[error("ACK frame carried a non-empty payload")]
    InvalidPayloadAckSettings,
    #[error("frame used a stream id that is invalid for its type")]
    InvalidStreamId,
    #[error("frame exceeded the advertised max frame size")]
    FrameTooLarge,
}

impl From<Error> for crate::error::Error {
    fn from(src: Error) -> crate::error::Error {
        match src {
            Error::BadFrameSize
            | Error::TooMuchPadding
            | Error::PayloadLengthTooShort
            | Error::PartialSettingLength
            | Error::InvalidPayloadLength
            | Error::InvalidPayloadAckSettings
            | Error::FrameTooLarge => crate::error::Error::FrameSize,
            Error::InvalidStreamId | Error::Short | Error::BadFlag | Error::BadKind => {
                crate::error::Error::Protocol(crate::error::Reason::ProtocolError)
            }
        }
    }
}
