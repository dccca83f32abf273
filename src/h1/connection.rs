//! HTTP/1.1 connection engine (C4), grounded on
//! `original_source/modules/access/http/h1conn.c`.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use tracing::{debug, trace};

use super::chunked::ChunkedDecoder;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::tls::TlsStream;

/// Header block budget: grown in increments until this many bytes have
/// been read without finding `\r\n\r\n` (`spec.md` §4.4).
const HEADER_BUDGET: usize = 65_536;
const BODY_READ_MAX: u64 = 2048;

struct Inner {
    session: TlsStream,
    dead: bool,
    connection_close: bool,
}

/// One HTTP/1.1 connection. Wraps the session in `Arc<Mutex<..>>`
/// (`spec.md` §9's concurrency note) so the attached [`Body`] can keep
/// reading from the same transport after `open_stream`/`read_headers`
/// return.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Mutex<Inner>>,
}

impl Connection {
    pub fn new(session: TlsStream) -> Connection {
        debug!("h1 connection opened");
        Connection {
            inner: Arc::new(Mutex::new(Inner {
                session,
                dead: false,
                connection_close: false,
            })),
        }
    }

    /// Whether another request may reuse this connection: no fatal error
    /// occurred, and the last response didn't carry `Connection: close`
    /// (or wasn't HTTP/1.1).
    pub async fn is_reusable(&self) -> bool {
        let inner = self.inner.lock().await;
        !inner.dead && !inner.connection_close
    }

    /// Serializes and writes `request` fully. A partial write marks the
    /// connection dead (`spec.md` §4.4's "Open stream").
    pub async fn open_stream(&self, request: &Message) -> Result<()> {
        let payload = request.to_h1_bytes();
        trace!(bytes = payload.len(), "writing h1 request");
        let mut inner = self.inner.lock().await;
        if inner.dead {
            return Err(dead_connection());
        }
        if let Err(e) = inner.session.write_all(payload.as_bytes()).await {
            inner.dead = true;
            return Err(Error::Io(e));
        }
        Ok(())
    }

    /// Writes one raw chunk of request-body bytes (the outfile subtype's
    /// chunked-encoded PUT payload, `spec.md` §4.9's outfile write, kept
    /// outside `open_stream` since the caller composes it incrementally
    /// after seeing a `100 Continue` interim response). A partial write
    /// kills the connection, mirroring `open_stream`.
    pub async fn write_body(&self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.dead {
            return Err(dead_connection());
        }
        if let Err(e) = inner.session.write_all(data).await {
            inner.dead = true;
            return Err(Error::Io(e));
        }
        Ok(())
    }

    /// Consumes the connection and hands back the underlying transport,
    /// discarding the HTTP/1.1 framing around it. Used by the CONNECT
    /// tunnel (`spec.md` §4.10's "discard the HTTP/1 connection but keep
    /// the underlying socket") once the proxy's response has been read.
    /// Fails if another clone of this connection is still alive.
    pub fn into_raw(self) -> Result<TlsStream> {
        let inner = Arc::try_unwrap(self.inner)
            .map_err(|_| Error::parse("connection still has other handles"))?
            .into_inner();
        Ok(inner.session)
    }

    /// Reads the response status line and headers, determines framing
    /// (`Content-Length`, chunked, `Connection: close`), and attaches a
    /// [`Body`] to the returned message. `Ok(None)` on a garbage response
    /// that doesn't parse as HTTP/1.x (scenario 1 in `spec.md` §8).
    pub async fn read_headers(&self) -> Result<Option<Message>> {
        let raw = {
            let mut inner = self.inner.lock().await;
            match read_header_block(&mut inner.session).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    inner.dead = true;
                    return Ok(None);
                }
                Err(e) => {
                    inner.dead = true;
                    return Err(e);
                }
            }
        };

        let text = String::from_utf8_lossy(&raw);
        let minor = parse_minor_version(&text);
        let mut message = match Message::parse_h1_response(&text) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };

        let mut connection_close = minor.map(|m| m < 1).unwrap_or(true);
        let mut chunked = false;
        if let Some(te) = message.get_header("Transfer-Encoding") {
            chunked = chunked_coding(&te)?;
        }
        if !connection_close {
            if let Some(conn) = message.get_header("Connection") {
                if has_close_token(&conn) {
                    connection_close = true;
                }
            }
        }

        let remaining = if chunked { None } else { message.get_size() };

        {
            let mut inner = self.inner.lock().await;
            inner.connection_close = connection_close;
        }

        let body = Body {
            conn: self.inner.clone(),
            remaining,
            chunked: chunked.then(ChunkedDecoder::new),
        };
        message.attach(crate::message::Body::H1(body));
        Ok(Some(message))
    }
}

/// The attached body of an HTTP/1.1 response (possibly chunked-decoded).
pub struct Body {
    conn: Arc<Mutex<Inner>>,
    remaining: Option<u64>,
    chunked: Option<ChunkedDecoder>,
}

impl Body {
    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        let mut inner = self.conn.lock().await;
        if inner.dead {
            return Err(dead_connection());
        }

        if let Some(decoder) = self.chunked.as_mut() {
            return match decoder.read(&mut inner.session).await {
                Ok(chunk) => Ok(chunk),
                Err(e) => {
                    inner.dead = true;
                    Err(e)
                }
            };
        }

        match self.remaining {
            Some(0) => Ok(None),
            Some(n) => {
                let want = n.min(BODY_READ_MAX) as usize;
                let mut buf = vec![0u8; want];
                match inner.session.read(&mut buf).await {
                    Ok(0) => {
                        inner.dead = true;
                        Err(premature_close())
                    }
                    Ok(read) => {
                        buf.truncate(read);
                        self.remaining = Some(n - read as u64);
                        Ok(Some(Bytes::from(buf)))
                    }
                    Err(e) => {
                        inner.dead = true;
                        Err(Error::Io(e))
                    }
                }
            }
            None => {
                let mut buf = vec![0u8; BODY_READ_MAX as usize];
                match inner.session.read(&mut buf).await {
                    Ok(0) => Ok(None),
                    Ok(read) => {
                        buf.truncate(read);
                        Ok(Some(Bytes::from(buf)))
                    }
                    Err(e) => {
                        inner.dead = true;
                        Err(Error::Io(e))
                    }
                }
            }
        }
    }

    /// HTTP/1.1 bodies never yield a follow-up header block: no trailers,
    /// no 1xx continuation beyond the initial response.
    pub async fn read_headers(&mut self) -> Result<Option<Message>> {
        Ok(None)
    }

    pub async fn close(self, abort: bool) {
        if abort {
            let mut inner = self.conn.lock().await;
            inner.dead = true;
        }
    }
}

fn dead_connection() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        "HTTP/1.1 connection is dead",
    ))
}

fn premature_close() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "connection closed before Content-Length was satisfied",
    ))
}

/// Reads until `\r\n\r\n`, growing the buffer as needed up to
/// `HEADER_BUDGET`. Mirrors `vlc_http_can_read`'s trick of computing how
/// many more bytes are needed to complete the terminator given the
/// current tail.
async fn read_header_block(session: &mut TlsStream) -> Result<Option<BytesMut>> {
    let mut buf = BytesMut::new();
    loop {
        let need = terminator_need(&buf);
        if need == 0 {
            break;
        }
        if buf.len() + need > HEADER_BUDGET {
            return Ok(None);
        }

        let mut chunk = vec![0u8; need];
        match session.read_exact(&mut chunk).await {
            Ok(()) => buf.extend_from_slice(&chunk),
            Err(_) => return Ok(None),
        }
    }
    Ok(Some(buf))
}

fn terminator_need(buf: &[u8]) -> usize {
    const END: &[u8] = b"\r\n\r\n";
    for i in (1..=4).rev() {
        if buf.len() >= i && &buf[buf.len() - i..] == &END[..i] {
            return 4 - i;
        }
    }
    4
}

fn parse_minor_version(text: &str) -> Option<u8> {
    let rest = text.strip_prefix("HTTP/1.")?;
    rest.as_bytes().first().map(|b| b - b'0')
}

/// `Connection` header token scan (Open Question resolution: proper
/// comma-separated scan, not a substring match).
fn has_close_token(value: &str) -> bool {
    value.split(',').any(|tok| tok.trim().eq_ignore_ascii_case("close"))
}

/// `Transfer-Encoding` coding scan. Returns whether `chunked` is present;
/// errors if it is present but not the last coding (Open Question
/// resolution: stricter than the original, which didn't check).
fn chunked_coding(value: &str) -> Result<bool> {
    let codings: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if codings.is_empty() {
        return Ok(false);
    }
    let has_chunked = codings.iter().any(|c| c.eq_ignore_ascii_case("chunked"));
    if !has_chunked {
        return Ok(false);
    }
    if !codings.last().unwrap().eq_ignore_ascii_case("chunked") {
        return Err(Error::parse("chunked must be the last transfer-coding"));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_need_matches_partial_tails() {
        assert_eq!(terminator_need(b""), 4);
        assert_eq!(terminator_need(b"X\r"), 3);
        assert_eq!(terminator_need(b"X\r\n"), 2);
        assert_eq!(terminator_need(b"X\r\n\r"), 1);
        assert_eq!(terminator_need(b"X\r\n\r\n"), 0);
    }

    #[test]
    fn close_token_requires_word_boundary() {
        assert!(has_close_token("close"));
        assert!(has_close_token("keep-alive, close"));
        assert!(!has_close_token("closely"));
    }

    #[test]
    fn chunked_must_be_last_coding() {
        assert_eq!(chunked_coding("chunked").unwrap(), true);
        assert_eq!(chunked_coding("gzip").unwrap(), false);
        assert!(chunked_coding("chunked, gzip").is_err());
    }
}
