//! Seekable file resource (C9), grounded on
//! `original_source/modules/access/http/file.c`'s `vlc_http_file_*` family:
//! range requests plus `If-Match`/`If-Unmodified-Since` revalidation, with
//! `seek`/`read` retrying the request rather than trusting the server to
//! honor a `Range` it never promised.

use std::sync::Arc;

use bytes::Bytes;

use super::{open_once, ResourceContext};
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::manager::ConnectionManager;
use crate::message::Message;

pub struct FileResource {
    ctx: ResourceContext,
    mgr: Arc<ConnectionManager>,
    response: Option<Message>,
    offset: u64,
    /// Set once a `read` has failed and could not be recovered by a
    /// reseek; further reads fail immediately rather than retrying again.
    failure: bool,
}

impl FileResource {
    pub async fn open(
        uri: &str,
        ua: Option<&str>,
        referrer: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        mgr: Arc<ConnectionManager>,
        cancel: &CancellationToken,
    ) -> Result<FileResource> {
        let mut ctx = ResourceContext::parse(uri, ua, referrer)?;
        ctx.set_login(username, password);
        let mut resource = FileResource {
            ctx,
            mgr,
            response: None,
            offset: 0,
            failure: false,
        };
        let response = resource.request_at(0, cancel).await?;
        resource.response = Some(response);
        Ok(resource)
    }

    pub fn get_status(&self) -> Option<u16> {
        self.response.as_ref().and_then(Message::status)
    }

    pub fn get_type(&self) -> Option<String> {
        self.response.as_ref().and_then(|r| r.get_header("Content-Type"))
    }

    pub fn get_redirect(&self) -> Option<String> {
        self.response.as_ref().and_then(|r| self.ctx.resolve_redirect(r))
    }

    /// Total resource size: `Content-Range`'s `/total` on a 206 or 416,
    /// falling back to `Content-Length` otherwise.
    pub fn get_size(&self) -> Option<u64> {
        let response = self.response.as_ref()?;
        match response.status() {
            Some(206) | Some(416) => {
                let range = response.get_header("Content-Range")?;
                parse_content_range_total(&range)
            }
            _ => response.get_size(),
        }
    }

    /// Whether the server confirmed it honors `Range` (a 206/416 on the
    /// last request already proves it; otherwise fall back to the
    /// advertised `Accept-Ranges`).
    pub fn can_seek(&self) -> bool {
        let Some(response) = &self.response else {
            return false;
        };
        match response.status() {
            Some(206) | Some(416) => true,
            _ => response
                .get_header("Accept-Ranges")
                .map(|v| v.eq_ignore_ascii_case("bytes"))
                .unwrap_or(false),
        }
    }

    /// Reissues the request at `offset`. The cached response is replaced
    /// only if the new one is a 206, a 416, or (at offset zero) any 2xx —
    /// otherwise the previous position is left untouched.
    pub async fn seek(&mut self, offset: u64, cancel: &CancellationToken) -> Result<()> {
        if !self.can_seek() {
            return Err(Error::parse("resource is not seekable"));
        }
        let response = self.request_at(offset, cancel).await?;
        let status = response.status().unwrap_or(0);
        let accepted = status == 206 || status == 416 || (status / 100 == 2 && offset == 0);
        if !accepted {
            return Err(Error::HttpStatus(status));
        }
        self.response = Some(response);
        self.offset = offset;
        Ok(())
    }

    /// Reads the next chunk of body bytes. A failed read is retried once
    /// by reseeking to the current offset, if the resource is seekable
    /// (`vlc_http_file_read`'s recovery path).
    pub async fn read(&mut self, cancel: &CancellationToken) -> Result<Option<Bytes>> {
        if self.failure {
            return Err(Error::parse("resource is in a failed state"));
        }

        let first = match &mut self.response {
            Some(response) => response.read().await,
            None => return Ok(None),
        };

        match first {
            Ok(Some(chunk)) => {
                self.offset += chunk.len() as u64;
                Ok(Some(chunk))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                if !self.can_seek() {
                    self.failure = true;
                    return Err(e);
                }
                let offset = self.offset;
                if self.seek(offset, cancel).await.is_err() {
                    self.failure = true;
                    return Err(e);
                }
                match self.response.as_mut().unwrap().read().await {
                    Ok(Some(chunk)) => {
                        self.offset += chunk.len() as u64;
                        Ok(Some(chunk))
                    }
                    Ok(None) => Ok(None),
                    Err(e2) => {
                        self.failure = true;
                        Err(e2)
                    }
                }
            }
        }
    }

    async fn request_at(&mut self, offset: u64, cancel: &CancellationToken) -> Result<Message> {
        let etag = self.response.as_ref().and_then(|r| r.get_header("ETag"));
        let mtime = self.response.as_ref().and_then(Message::get_mtime);

        open_once(&mut self.ctx, &self.mgr, cancel, move |req| {
            req.add_header("Range", format!("bytes={offset}-"))?;
            if let Some(etag) = &etag {
                let etag = etag.strip_prefix("W/").unwrap_or(etag);
                req.add_header("If-Match", etag)?;
            } else if let Some(mtime) = mtime {
                req.add_time("If-Unmodified-Since", mtime)?;
            }
            Ok(())
        })
        .await
    }
}

/// Parses the `/total` suffix of a `bytes <range-or-*>/<total>` value,
/// `None` for the `*` (unsatisfiable, total unknown) form.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let rest = value.strip_prefix("bytes ")?;
    let slash = rest.find('/')?;
    let total = rest[slash + 1..].trim();
    if total == "*" {
        return None;
    }
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total_parses_or_rejects_wildcard() {
        assert_eq!(parse_content_range_total("bytes 0-99/1234"), Some(1234));
        assert_eq!(parse_content_range_total("bytes */1234"), Some(1234));
        assert_eq!(parse_content_range_total("bytes */*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
