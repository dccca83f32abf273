//! Live (non-seekable) stream resource (C9), grounded on
//! `original_source/modules/access/http/live.c`: a clean end-of-body is
//! just the origin rotating encoders and is not an error, so `read`
//! reconnects silently; a transport/protocol error surfaces once and the
//! reconnect is deferred to the caller's next `read` (Open Question
//! resolution in `SPEC_FULL.md` §9, avoiding an unbounded retry loop on a
//! origin that is actually down).

use std::sync::Arc;

use bytes::Bytes;

use super::{open_once, ResourceContext};
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::manager::ConnectionManager;
use crate::message::Message;

pub struct LiveResource {
    ctx: ResourceContext,
    mgr: Arc<ConnectionManager>,
    response: Option<Message>,
    /// Set after a hard read error; cleared (and the connection reopened)
    /// on the next `read` call.
    failure: bool,
}

impl LiveResource {
    pub async fn open(
        uri: &str,
        ua: Option<&str>,
        referrer: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        mgr: Arc<ConnectionManager>,
        cancel: &CancellationToken,
    ) -> Result<LiveResource> {
        let mut ctx = ResourceContext::parse(uri, ua, referrer)?;
        ctx.set_login(username, password);
        let response = open_once(&mut ctx, &mgr, cancel, add_live_headers).await?;
        Ok(LiveResource {
            ctx,
            mgr,
            response: Some(response),
            failure: false,
        })
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

    /// Reads the next chunk, reconnecting (without surfacing an error)
    /// across a clean end-of-body, and across a prior hard error before
    /// trying again.
    pub async fn read(&mut self, cancel: &CancellationToken) -> Result<Option<Bytes>> {
        loop {
            if self.failure {
                self.failure = false;
                self.reconnect(cancel).await?;
            }

            let Some(response) = &mut self.response else {
                return Ok(None);
            };

            match response.read().await {
                Ok(Some(chunk)) => return Ok(Some(chunk)),
                Ok(None) => {
                    self.reconnect(cancel).await?;
                }
                Err(e) => {
                    self.failure = true;
                    return Err(e);
                }
            }
        }
    }

    async fn reconnect(&mut self, cancel: &CancellationToken) -> Result<()> {
        let response = open_once(&mut self.ctx, &self.mgr, cancel, add_live_headers).await?;
        self.response = Some(response);
        Ok(())
    }
}

fn add_live_headers(req: &mut Message) -> Result<()> {
    req.add_header("Accept-Encoding", "gzip, deflate")
}
