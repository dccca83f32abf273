use bytes::{BufMut, Bytes};

use super::{Error, Frame, Head, Kind, StreamId};

const ACK_FLAG: u8 = 0x1;

const HEADER_TABLE_SIZE: u16 = 0x1;
const ENABLE_PUSH: u16 = 0x2;
const MAX_CONCURRENT_STREAMS: u16 = 0x3;
const INITIAL_WINDOW_SIZE: u16 = 0x4;
const MAX_FRAME_SIZE: u16 = 0x5;
const MAX_HEADER_LIST_SIZE: u16 = 0x6;

/// The default HPACK dynamic table size a fresh connection starts with,
/// before any SETTINGS exchange.
pub const DEFAULT_SETTINGS_HEADER_TABLE_SIZE: usize = 4_096;

/// The default outbound max frame size, i.e. the wire minimum every
/// endpoint must accept (RFC 7540 §4.2) until the peer raises it.
pub const DEFAULT_SETTINGS_MAX_FRAME_SIZE: usize = 16_384;

/// A single `(id, value)` SETTINGS entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    HeaderTableSize(u32),
    EnablePush(bool),
    MaxConcurrentStreams(u32),
    InitialWindowSize(u32),
    MaxFrameSize(u32),
    MaxHeaderListSize(u32),
}

/// SETTINGS (RFC 7540 §6.5): connection-level configuration, exchanged
/// once at startup and (per `spec.md` §4.2) never updated dynamically by
/// us afterwards.
#[derive(Debug, Default, Clone)]
pub struct Settings {
    ack: bool,
    header_table_size: Option<u32>,
    enable_push: Option<bool>,
    max_concurrent_streams: Option<u32>,
    initial_window_size: Option<u32>,
    max_frame_size: Option<u32>,
    max_header_list_size: Option<u32>,
}

impl Settings {
    pub fn ack() -> Settings {
        Settings {
            ack: true,
            ..Default::default()
        }
    }

    pub fn is_ack(&self) -> bool {
        self.ack
    }

    pub fn header_table_size(&self) -> Option<u32> {
        self.header_table_size
    }

    pub fn set_header_table_size(&mut self, v: Option<u32>) {
        self.header_table_size = v;
    }

    pub fn enable_push(&self) -> Option<bool> {
        self.enable_push
    }

    pub fn set_enable_push(&mut self, v: bool) {
        self.enable_push = Some(v);
    }

    pub fn max_concurrent_streams(&self) -> Option<u32> {
        self.max_concurrent_streams
    }

    pub fn set_max_concurrent_streams(&mut self, v: Option<u32>) {
        self.max_concurrent_streams = v;
    }

    pub fn initial_window_size(&self) -> Option<u32> {
        self.initial_window_size
    }

    pub fn set_initial_window_size(&mut self, v: Option<u32>) {
        self.initial_window_size = v;
    }

    pub fn max_frame_size(&self) -> Option<u32> {
        self.max_frame_size
    }

    pub fn set_max_frame_size(&mut self, v: Option<u32>) {
        self.max_frame_size = v;
    }

    pub fn max_header_list_size(&self) -> Option<u32> {
        self.max_header_list_size
    }

    pub fn set_max_header_list_size(&mut self, v: Option<u32>) {
        self.max_header_list_size = v;
    }

    /// The settings profile we advertise to every peer, per `spec.md`
    /// §4.2: we never accept server-initiated streams (`ENABLE_PUSH=0`,
    /// `MAX_CONCURRENT_STREAMS=0`), and we keep a generously large
    /// per-stream window so that flow control rarely stalls a reader.
    pub fn ours() -> Settings {
        Settings {
            ack: false,
            header_table_size: Some(DEFAULT_SETTINGS_HEADER_TABLE_SIZE as u32),
            enable_push: Some(false),
            max_concurrent_streams: Some(0),
            initial_window_size: Some(crate::proto::DEFAULT_INITIAL_WINDOW_SIZE),
            max_frame_size: Some(1_048_576),
            max_header_list_size: Some(65_536),
        }
    }

    pub fn load(head: Head, payload: &Bytes) -> Result<Settings, Error> {
        if !head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }

        if head.flag() & ACK_FLAG != 0 {
            if !payload.is_empty() {
                return Err(Error::InvalidPayloadAckSettings);
            }
            return Ok(Settings::ack());
        }

        if payload.len() % 6 != 0 {
            return Err(Error::PartialSettingLength);
        }

        let mut settings = Settings::default();
        for chunk in payload.chunks(6) {
            let id = u16::from_be_bytes([chunk[0], chunk[1]]);
            let value = u32::from_be_bytes([chunk[2], chunk[3], chunk[4], chunk[5]]);
            match id {
                HEADER_TABLE_SIZE => settings.header_table_size = Some(value),
                ENABLE_PUSH => settings.enable_push = Some(value != 0),
                MAX_CONCURRENT_STREAMS => settings.max_concurrent_streams = Some(value),
                INITIAL_WINDOW_SIZE => settings.initial_window_size = Some(value),
                MAX_FRAME_SIZE => settings.max_frame_size = Some(value),
                MAX_HEADER_LIST_SIZE => settings.max_header_list_size = Some(value),
                // Unknown setting identifiers MUST be ignored (RFC 7540 §6.5.2).
                _ => {}
            }
        }
        Ok(settings)
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        if self.ack {
            let head = Head::new(Kind::Settings, ACK_FLAG, StreamId::ZERO);
            head.encode(0, dst);
            return;
        }

        let mut entries = Vec::new();
        if let Some(v) = self.header_table_size {
            entries.push((HEADER_TABLE_SIZE, v));
        }
        if let Some(v) = self.enable_push {
            entries.push((ENABLE_PUSH, v as u32));
        }
        if let Some(v) = self.max_concurrent_streams {
            entries.push((MAX_CONCURRENT_STREAMS, v));
        }
        if let Some(v) = self.initial_window_size {
            entries.push((INITIAL_WINDOW_SIZE, v));
        }
        if let Some(v) = self.max_frame_size {
            entries.push((MAX_FRAME_SIZE, v));
        }
        if let Some(v) = self.max_header_list_size {
            entries.push((MAX_HEADER_LIST_SIZE, v));
        }

        let head = Head::new(Kind::Settings, 0, StreamId::ZERO);
        head.encode(entries.len() * 6, dst);
        for (id, value) in entries {
            dst.put_u16(id);
            dst.put_u32(value);
        }
    }
}

impl From<Settings> for Frame {
    fn from(src: Settings) -> Frame {
        Frame::Settings(src)
    }
}
