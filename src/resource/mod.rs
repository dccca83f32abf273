//! Resource abstraction (C9), grounded on
//! `original_source/modules/access/http/resource.c`: a URL-scoped proxy
//! over the connection manager (C8) that builds requests from stored
//! context (UA, referrer, credentials, cookies) plus a subtype's
//! per-request callback.
//!
//! Split into one file per subtype (`file`, `live`, `outfile`), mirroring
//! the original's `file.c`/`live.c`/`outfile.c` split and this crate's own
//! `h1/` directory convention (`mod.rs` plus one file per concern).

pub mod file;
pub mod live;
pub mod outfile;

pub use file::FileResource;
pub use live::LiveResource;
pub use outfile::OutfileResource;

use url::Url;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::manager::{ConnectionManager, Origin};
use crate::message::Message;

/// The URL-derived, per-resource state shared by all three subtypes:
/// everything `resource.c` stores on `struct vlc_http_resource` besides the
/// cached response itself (which each subtype owns, since the redirect and
/// seek rules around discarding it differ per subtype).
pub(crate) struct ResourceContext {
    origin: Origin,
    authority: String,
    path: String,
    agent: Option<String>,
    referrer: Option<String>,
    username: Option<String>,
    password: Option<String>,
    /// Cleared permanently after one `406 Not Acceptable` retry
    /// (`spec.md` §4.9's negotiate/retry rule).
    negotiate: bool,
}

impl ResourceContext {
    pub(crate) fn parse(uri: &str, ua: Option<&str>, referrer: Option<&str>) -> Result<ResourceContext> {
        let url = Url::parse(uri).map_err(|_| Error::parse("invalid resource URL"))?;
        let secure = match url.scheme() {
            "https" => true,
            "http" => false,
            _ => return Err(Error::parse("unsupported resource scheme")),
        };
        let host = url.host_str().ok_or_else(|| Error::parse("resource URL has no host"))?;
        let explicit_port = url.port();
        let origin = Origin::new(secure, host, explicit_port.unwrap_or(if secure { 443 } else { 80 }));

        let authority = format_authority(host, explicit_port);
        let mut path = url.path().to_owned();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(ResourceContext {
            origin,
            authority,
            path,
            agent: ua.map(str::to_owned),
            referrer: referrer.map(str::to_owned),
            username: None,
            password: None,
            negotiate: true,
        })
    }

    /// Sets (or clears) the Basic credentials attached to every request
    /// this resource builds, mirroring `vlc_http_res_set_login`.
    fn set_login(&mut self, username: Option<&str>, password: Option<&str>) {
        self.username = username.map(str::to_owned);
        self.password = password.map(str::to_owned);
    }

    fn scheme(&self) -> &'static str {
        if self.origin.secure {
            "https"
        } else {
            "http"
        }
    }

    /// Builds the common part of a GET request; the subtype callback adds
    /// the rest (`spec.md` §4.9's "Open").
    fn base_request(&self) -> Result<Message> {
        let mut req = Message::request("GET", Some(self.scheme()), Some(&self.authority), Some(&self.path))?;
        req.add_header("Accept", "*/*")?;
        if self.negotiate {
            req.add_header("Accept-Language", "en_US")?;
        }
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            req.add_basic_credentials(false, user, pass)?;
        }
        if let Some(agent) = &self.agent {
            req.add_agent(agent)?;
        }
        if let Some(referrer) = &self.referrer {
            req.add_header("Referer", referrer)?;
        }
        Ok(req)
    }

    /// Resolves a `Location` (or MMS/ICY compatibility) redirect against
    /// this resource's current URL, fragment stripped.
    fn resolve_redirect(&self, response: &Message) -> Option<String> {
        let status = response.status()?;

        if status / 100 == 2 && !self.origin.secure {
            if let Some(pragma) = response.get_header("Pragma") {
                if pragma.eq_ignore_ascii_case("features") {
                    return Some(format!("mmsh://{}{}", self.authority, self.path));
                }
            }
            if response.get_header("Icy-Name").is_some() || response.get_header("Icy-Genre").is_some() {
                return Some(format!("icyx://{}{}", self.authority, self.path));
            }
        }

        if status != 201 && status / 100 != 3 {
            return None;
        }
        if status == 304 || status == 305 || status == 306 {
            return None;
        }

        let location = response.get_header("Location")?;
        let base = format!("{}://{}{}", self.scheme(), self.authority, self.path);
        let base = Url::parse(&base).ok()?;
        let mut resolved = base.join(&location).ok()?;
        resolved.set_fragment(None);
        Some(resolved.to_string())
    }
}

/// Performs one GET round trip through the manager, retrying once (with
/// `negotiate` cleared) on `406`, per `spec.md` §4.9's "Open".
pub(crate) async fn open_once(
    ctx: &mut ResourceContext,
    mgr: &ConnectionManager,
    cancel: &CancellationToken,
    add_subtype_headers: impl Fn(&mut Message) -> Result<()>,
) -> Result<Message> {
    loop {
        let mut req = ctx.base_request()?;
        add_subtype_headers(&mut req)?;

        let response = mgr.dispatch(&ctx.origin, req, cancel).await?;
        let response = response
            .get_final()
            .await?
            .ok_or_else(|| Error::parse("connection closed before final response headers"))?;

        let status = response.status().unwrap_or(0);
        if status < 200 || status > 599 {
            return Err(Error::HttpStatus(status));
        }
        if status == 406 && ctx.negotiate {
            ctx.negotiate = false;
            continue;
        }
        return Ok(response);
    }
}

fn format_authority(host: &str, port: Option<u16>) -> String {
    let bracketed = host.contains(':');
    match (bracketed, port) {
        (false, None) => host.to_owned(),
        (true, None) => format!("[{host}]"),
        (false, Some(p)) => format!("{host}:{p}"),
        (true, Some(p)) => format!("[{host}]:{p}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_non_http_schemes() {
        assert!(ResourceContext::parse("ftp://example.com/", None, None).is_err());
    }

    #[test]
    fn parse_splits_path_and_query() {
        let ctx = ResourceContext::parse("https://example.com:8443/a/b?c=d", None, None).unwrap();
        assert_eq!(ctx.authority, "example.com:8443");
        assert_eq!(ctx.path, "/a/b?c=d");
        assert!(ctx.origin.secure);
        assert_eq!(ctx.origin.port, 8443);
    }

    #[test]
    fn format_authority_brackets_ipv6() {
        assert_eq!(format_authority("::1", None), "[::1]");
        assert_eq!(format_authority("::1", Some(80)), "[::1]:80");
        assert_eq!(format_authority("example.com", None), "example.com");
    }
}
