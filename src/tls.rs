//! TLS session abstraction.
//!
//! `original_source/modules/access/http/transport.h` wraps a VLC-internal
//! `vlc_tls` handle behind `vlc_https_recv`/`vlc_https_send`/
//! `vlc_https_connect`. This crate has no TLS implementation of its own
//! (`spec.md`'s Non-goals exclude the TLS/transport layer); instead it
//! defines the seam a caller's TLS stack plugs into.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, Reason, Result};

/// A connected, already-handshaked transport. Any type implementing
/// ordinary async byte I/O qualifies — no crate-specific trait methods
/// are required; connection types stay generic over
/// `T: AsyncRead + AsyncWrite`.
pub trait TlsSession: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> TlsSession for T {}

/// A boxed, type-erased session, used once a connection has been dialed
/// and handed off to the H1 or H2 engine.
pub type TlsStream = Box<dyn TlsSession>;

/// The outcome of a dial: a connected session plus which protocol ALPN
/// negotiated (`vlc_https_connect`'s `two` out-parameter).
pub struct Negotiated {
    pub session: TlsStream,
    pub alpn_h2: bool,
}

/// Performs the TLS+ALPN handshake. Implemented by the embedder; this
/// crate only calls it (`spec.md` §9's "Cancellable dial" design note —
/// the connect itself is driven as a future, awaited with select-on-cancel
/// by the manager).
pub trait TlsConnector: Send + Sync {
    fn connect<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> Pin<Box<dyn Future<Output = Result<Negotiated>> + Send + 'a>>;

    /// Plain (non-TLS) TCP connect, used for the `http://` proxy leg of a
    /// CONNECT tunnel (`spec.md` §4.10). Embedders that never dial a proxy
    /// need not override this; the default reports the capability as
    /// unsupported.
    fn connect_plain<'a>(
        &'a self,
        _host: &'a str,
        _port: u16,
    ) -> Pin<Box<dyn Future<Output = Result<TlsStream>> + Send + 'a>> {
        Box::pin(async { Err(Error::Protocol(Reason::InternalError)) })
    }

    /// Performs a TLS handshake over an already-connected transport: the
    /// tunnel's inner, TLS-in-TLS leg against the real target, once a
    /// CONNECT through the proxy has succeeded. Default is unsupported,
    /// same rationale as [`connect_plain`](TlsConnector::connect_plain).
    fn handshake<'a>(
        &'a self,
        _stream: TlsStream,
        _host: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Negotiated>> + Send + 'a>> {
        Box::pin(async { Err(Error::Protocol(Reason::InternalError)) })
    }
}
