//! Chunked-decode stream (C5), grounded on
//! `original_source/modules/access/http/chunked.c`.

use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};
use crate::tls::TlsStream;

const CHUNK_READ_MAX: usize = 1536;

/// Decodes an HTTP/1.1 chunked-transfer body (`spec.md` §4.5): hex chunk
/// size line, up to `CHUNK_READ_MAX` bytes of chunk data at a time, then
/// a mandatory CRLF. Chunk size zero ends the stream; trailers are not
/// supported, matching the original's `vlc_chunked_wait` returning NULL
/// unconditionally.
pub struct ChunkedDecoder {
    chunk_remaining: u64,
    eof: bool,
}

impl ChunkedDecoder {
    pub fn new() -> ChunkedDecoder {
        ChunkedDecoder {
            chunk_remaining: 0,
            eof: false,
        }
    }

    pub async fn read(&mut self, session: &mut TlsStream) -> Result<Option<Bytes>> {
        if self.eof {
            return Ok(None);
        }

        if self.chunk_remaining == 0 {
            let line = read_line(session).await?;
            self.chunk_remaining = parse_chunk_size(&line)?;
        }

        if self.chunk_remaining == 0 {
            self.eof = true;
            read_crlf(session).await?;
            return Ok(None);
        }

        let want = self.chunk_remaining.min(CHUNK_READ_MAX as u64) as usize;
        let mut buf = vec![0u8; want];
        let read = session.read(&mut buf).await.map_err(Error::Io)?;
        if read == 0 {
            return Err(Error::parse("chunked stream ended mid-chunk"));
        }
        buf.truncate(read);
        self.chunk_remaining -= read as u64;

        if self.chunk_remaining == 0 {
            read_crlf(session).await?;
        }

        Ok(Some(Bytes::from(buf)))
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        ChunkedDecoder::new()
    }
}

/// Reads one line up to (not including) `\n`; a bare `\n` terminates a
/// line just as well as `\r\n` does.
async fn read_line(session: &mut TlsStream) -> Result<String> {
    let mut line = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        let read = session.read(&mut byte).await.map_err(Error::Io)?;
        if read == 0 {
            return Err(Error::parse("connection closed reading chunk size"));
        }
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line).map_err(|_| Error::parse("invalid chunk size line"))
}

async fn read_crlf(session: &mut TlsStream) -> Result<()> {
    let mut buf = [0u8; 2];
    session.read_exact(&mut buf).await.map_err(Error::Io)?;
    if &buf != b"\r\n" {
        return Err(Error::parse("missing chunk terminator"));
    }
    Ok(())
}

/// Parses the hex chunk-size, ignoring a trailing `;extension…`.
fn parse_chunk_size(line: &str) -> Result<u64> {
    let hex = line.split(';').next().unwrap_or(line).trim();
    u64::from_str_radix(hex, 16).map_err(|_| Error::parse("invalid chunk size"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_line_ignores_extension() {
        assert_eq!(parse_chunk_size("C;foo=bar").unwrap(), 12);
        assert_eq!(parse_chunk_size("0").unwrap(), 0);
        assert!(parse_chunk_size("zz").is_err());
    }
}
