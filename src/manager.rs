//! Connection manager (C8), grounded on
//! `original_source/modules/access/http/resource.c`'s connection-reuse
//! dance (`vlc_http_mgr_request`).
//!
//! At most one H1 connection and one H2 connection are cached at a time,
//! keyed by [`Origin`]. `dispatch` tries to reuse a cached connection whose
//! origin matches before ever dialing.

use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use crate::cancel::CancellationToken;
use crate::cookie::{CookieJar, NullJar};
use crate::error::{Error, Reason, Result};
use crate::h1;
use crate::message::Message;
use crate::proto;
use crate::tls::TlsConnector;

/// The `(scheme, host, port)` tuple connections are keyed and reused by
/// (`spec.md`'s GLOSSARY entry for "Origin").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub secure: bool,
    pub host: String,
    pub port: u16,
}

impl Origin {
    pub fn new(secure: bool, host: impl Into<String>, port: u16) -> Origin {
        Origin {
            secure,
            host: host.into(),
            port,
        }
    }
}

enum Cached {
    H1 { origin: Origin, conn: h1::Connection },
    H2 { origin: Origin, conn: proto::Connection },
}

/// Holds the external TLS connector and cookie jar, plus the single cached
/// connection slot. `spec.md` §4.8: "at most one live H1 connection and one
/// H2 connection" is a simplification this crate inherits — only the most
/// recently dialed connection is kept, regardless of protocol.
pub struct ConnectionManager {
    connector: Arc<dyn TlsConnector>,
    jar: Arc<dyn CookieJar>,
    cached: tokio::sync::Mutex<Option<Cached>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn TlsConnector>) -> ConnectionManager {
        ConnectionManager {
            connector,
            jar: Arc::new(NullJar),
            cached: tokio::sync::Mutex::new(None),
        }
    }

    pub fn with_cookie_jar(connector: Arc<dyn TlsConnector>, jar: Arc<dyn CookieJar>) -> ConnectionManager {
        ConnectionManager {
            connector,
            jar,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    /// Dispatches `request` against `origin`, reusing a cached connection
    /// when possible and dialing (once) otherwise.
    ///
    /// **Idempotency caveat** (`spec.md` §4.8): this core never sends a
    /// request body, so every request is idempotent and safe to retry
    /// against a freshly dialed connection after a stale one fails. A
    /// future body-sending extension would need to disable this retry for
    /// non-idempotent methods.
    pub async fn dispatch(&self, origin: &Origin, mut request: Message, cancel: &CancellationToken) -> Result<Message> {
        request.add_cookies(self.jar.as_ref())?;

        if let Some(result) = self.try_h2(origin, &request).await {
            return self.finish(&request, result).await;
        }
        if let Some(result) = self.try_h1(origin, &request).await {
            return self.finish(&request, result).await;
        }

        self.dial(origin, cancel).await?;

        if let Some(result) = self.try_h2(origin, &request).await {
            return self.finish(&request, result).await;
        }
        if let Some(result) = self.try_h1(origin, &request).await {
            return self.finish(&request, result).await;
        }

        Err(Error::RefusedStream)
    }

    async fn finish(&self, request: &Message, result: Result<Message>) -> Result<Message> {
        if let Ok(response) = &result {
            let values = response.header_values("Set-Cookie");
            if !values.is_empty() {
                let host = request.authority().unwrap_or_default();
                let path = request.path().unwrap_or("/");
                self.jar.store(host, path, &values);
            }
        }
        result
    }

    /// `None` if no cached connection matches `origin`; `Some` otherwise,
    /// with the cached connection discarded on failure either way.
    async fn try_h2(&self, origin: &Origin, request: &Message) -> Option<Result<Message>> {
        let conn = {
            let mut guard = self.cached.lock().await;
            match guard.as_ref() {
                Some(Cached::H2 { origin: o, conn }) if o == origin => conn.clone(),
                _ => return None,
            }
        };

        if !conn.is_usable().await {
            self.discard(origin).await;
            return None;
        }

        let result = self.h2_roundtrip(&conn, request).await;
        if result.is_err() {
            self.discard(origin).await;
        }
        Some(result)
    }

    async fn h2_roundtrip(&self, conn: &proto::Connection, request: &Message) -> Result<Message> {
        let mut stream = conn.open_stream(request).await?;
        match stream.read_headers().await? {
            Some(mut response) => {
                response.attach(crate::message::Body::H2(stream));
                Ok(response)
            }
            None => Err(Error::StreamClosed(crate::frame::StreamId::ZERO)),
        }
    }

    async fn try_h1(&self, origin: &Origin, request: &Message) -> Option<Result<Message>> {
        let conn = {
            let mut guard = self.cached.lock().await;
            match guard.as_ref() {
                Some(Cached::H1 { origin: o, conn }) if o == origin => conn.clone(),
                _ => return None,
            }
        };

        if !conn.is_reusable().await {
            self.discard(origin).await;
            return None;
        }

        let result = self.h1_roundtrip(&conn, request).await;
        if result.is_err() {
            self.discard(origin).await;
        }
        Some(result)
    }

    async fn h1_roundtrip(&self, conn: &h1::Connection, request: &Message) -> Result<Message> {
        conn.open_stream(request).await?;
        match conn.read_headers().await? {
            Some(response) => Ok(response),
            None => Err(Error::Parse("garbage HTTP/1.1 response".to_owned())),
        }
    }

    /// Drops the cached connection if it is still the one keyed by
    /// `origin` (another task may have already replaced it).
    async fn discard(&self, origin: &Origin) {
        let mut guard = self.cached.lock().await;
        let matches = match guard.as_ref() {
            Some(Cached::H1 { origin: o, .. }) | Some(Cached::H2 { origin: o, .. }) => o == origin,
            None => false,
        };
        if matches {
            *guard = None;
        }
    }

    /// Dials `origin` through the external connector, racing the connect
    /// future against `cancel` (`spec.md` §4.8's "interruptible dial").
    async fn dial(&self, origin: &Origin, cancel: &CancellationToken) -> Result<()> {
        let span = info_span!("dial", host = %origin.host, port = origin.port, secure = origin.secure);
        async {
            let negotiated = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Interrupted),
                result = self.connector.connect(&origin.host, origin.port) => result?,
            };

            let cached = if negotiated.alpn_h2 {
                debug!("negotiated h2");
                Cached::H2 {
                    origin: origin.clone(),
                    conn: proto::Connection::new(negotiated.session, true),
                }
            } else {
                debug!("negotiated http/1.1");
                Cached::H1 {
                    origin: origin.clone(),
                    conn: h1::Connection::new(negotiated.session),
                }
            };

            *self.cached.lock().await = Some(cached);
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Dials `origin` directly, bypassing the cache entirely, for the
    /// outfile resource (`spec.md` §4.9): that core sends a request body,
    /// which this crate never does over HTTP/2, so a peer that negotiates
    /// h2 is rejected rather than silently falling back.
    pub async fn dial_h1_only(&self, origin: &Origin, cancel: &CancellationToken) -> Result<h1::Connection> {
        let span = info_span!("dial_h1_only", host = %origin.host, port = origin.port, secure = origin.secure);
        async {
            let negotiated = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Interrupted),
                result = self.connector.connect(&origin.host, origin.port) => result?,
            };
            if negotiated.alpn_h2 {
                return Err(Error::Protocol(Reason::Http11Required));
            }
            Ok(h1::Connection::new(negotiated.session))
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_equality_is_by_scheme_host_port() {
        let a = Origin::new(true, "example.com", 443);
        let b = Origin::new(true, "example.com", 443);
        let c = Origin::new(false, "example.com", 443);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
