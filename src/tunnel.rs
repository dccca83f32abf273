//! CONNECT tunnel (C10), grounded on
//! `original_source/modules/access/http/tunnel.c`'s `vlc_https_connect_proxy`:
//! dial a proxy (plain `http`, or `https` wrapping the proxy connection
//! itself in TLS), speak one HTTP/1.1 `CONNECT` request/response over it,
//! then discard that HTTP/1.1 framing and perform a fresh TLS handshake
//! against the real target over the same socket (TLS-in-TLS is allowed —
//! only the outer proxy leg and the inner target leg ever see their own
//! independent handshake).
//!
//! Only HTTP/1 proxies are supported, matching the original's `assert(!ptwo)`
//! ("HTTP/2 proxy not supported yet").

use url::Url;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::h1;
use crate::message::Message;
use crate::tls::{Negotiated, TlsConnector};

/// Establishes a tunnel to `target_host:target_port` through `proxy_url`
/// (`http://` or `https://`, with optional `user:pass@` credentials), and
/// returns the negotiated TLS session to the target as if it had been
/// dialed directly.
pub async fn connect_tunnel(
    connector: &dyn TlsConnector,
    target_host: &str,
    target_port: u16,
    proxy_url: &str,
    cancel: &CancellationToken,
) -> Result<Negotiated> {
    let target_port = if target_port == 0 { 443 } else { target_port };

    let url = Url::parse(proxy_url).map_err(|_| Error::parse("invalid proxy URL"))?;
    let proxy_host = url.host_str().ok_or_else(|| Error::parse("proxy URL has no host"))?;
    let username = url.username();
    let password = url.password();

    let proxy_stream = match url.scheme() {
        "https" => {
            let proxy_port = url.port().unwrap_or(443);
            let negotiated = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Interrupted),
                result = connector.connect(proxy_host, proxy_port) => result?,
            };
            negotiated.session
        }
        "http" => {
            let proxy_port = url.port().unwrap_or(80);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Interrupted),
                result = connector.connect_plain(proxy_host, proxy_port) => result?,
            }
        }
        _ => return Err(Error::parse("unsupported proxy scheme")),
    };

    let conn = h1::Connection::new(proxy_stream);

    let authority = connect_authority(target_host, target_port);
    let mut req = Message::request("CONNECT", None, Some(&authority), None)?;
    req.add_header("ALPN", "h2, http%2F1.1")?;
    if !username.is_empty() {
        req.add_basic_credentials(false, username, password.unwrap_or(""))?;
    }

    conn.open_stream(&req).await?;
    let response = conn
        .read_headers()
        .await?
        .ok_or_else(|| Error::parse("proxy closed connection before a CONNECT response"))?;
    let response = response
        .get_final()
        .await?
        .ok_or_else(|| Error::parse("proxy closed connection before a CONNECT response"))?;

    let status = response.status().unwrap_or(0);
    if status / 100 != 2 {
        return Err(Error::HttpStatus(status));
    }

    let raw = conn.into_raw()?;

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Interrupted),
        result = connector.handshake(raw, target_host) => result,
    }
}

/// `vlc_http_authority`'s CONNECT-target form: always carries the port,
/// brackets an IPv6 literal.
fn connect_authority(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_authority_brackets_ipv6() {
        assert_eq!(connect_authority("example.com", 443), "example.com:443");
        assert_eq!(connect_authority("::1", 443), "[::1]:443");
    }
}
