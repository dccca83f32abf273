//! Outfile resource (C9, `spec.md` §8 scenario 12), grounded on
//! `original_source/modules/access/http/outfile.c`'s `vlc_http_outfile_*`:
//! a `PUT` with `Expect: 100-continue`, a chunked body written in caller
//! chosen blocks, and a final zero-length chunk that triggers the server's
//! real status response.
//!
//! This core never sends a request body over HTTP/2 ([`super`]'s shared
//! "Open" algorithm assumes a bodyless GET), so outfile dials its own
//! HTTP/1.1-only connection via [`ConnectionManager::dial_h1_only`] rather
//! than going through the shared cache, and drives the H1 engine directly
//! instead of through [`Message::iterate`] (that path is hardcoded to
//! treat an H1 body as never having a follow-up header block).

use super::ResourceContext;
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::h1;
use crate::manager::ConnectionManager;
use crate::message::Message;

pub struct OutfileResource {
    conn: h1::Connection,
    closed: bool,
}

impl OutfileResource {
    pub async fn open(
        uri: &str,
        ua: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        mgr: &ConnectionManager,
        cancel: &CancellationToken,
    ) -> Result<OutfileResource> {
        let ctx = ResourceContext::parse(uri, ua, None)?;
        let conn = mgr.dial_h1_only(&ctx.origin, cancel).await?;

        let mut req = Message::request("PUT", Some(ctx.scheme()), Some(&ctx.authority), Some(&ctx.path))?;
        req.add_header("Accept", "*/*")?;
        req.add_header("Expect", "100-continue")?;
        req.add_header("Transfer-Encoding", "chunked")?;
        if let (Some(user), Some(pass)) = (username, password) {
            req.add_basic_credentials(false, user, pass)?;
        }
        if let Some(agent) = ua {
            req.add_agent(agent)?;
        }

        conn.open_stream(&req).await?;

        let interim = conn
            .read_headers()
            .await?
            .ok_or_else(|| Error::parse("connection closed before 100 Continue"))?;
        if interim.status() != Some(100) {
            return Err(Error::HttpStatus(interim.status().unwrap_or(0)));
        }

        Ok(OutfileResource { conn, closed: false })
    }

    /// Writes one chunk of the request body. A zero-length block is a
    /// no-op; the real terminator is only written by [`close`].
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::parse("write after close"));
        }
        if data.is_empty() {
            return Ok(());
        }
        let mut chunk = format!("{:x}\r\n", data.len()).into_bytes();
        chunk.extend_from_slice(data);
        chunk.extend_from_slice(b"\r\n");
        self.conn.write_body(&chunk).await
    }

    /// Writes the terminating zero-length chunk and reads the server's
    /// real response status, succeeding on any 2xx.
    pub async fn close(mut self) -> Result<u16> {
        self.conn.write_body(b"0\r\n\r\n").await?;
        self.closed = true;

        let response = self
            .conn
            .read_headers()
            .await?
            .ok_or_else(|| Error::parse("connection closed before final status"))?;
        let status = response.status().unwrap_or(0);
        if status / 100 != 2 {
            return Err(Error::HttpStatus(status));
        }
        Ok(status)
    }
}
