//! Cookie storage, keyed by host and path (`spec.md` §3's Resource
//! credentials/cookie composition, grounded on
//! `original_source/modules/access/http/message.c`'s
//! `vlc_http_msg_add_cookies()` call site — the jar itself lives outside
//! this crate's minimal surface in the original, so this is a supplement).

/// A source of `Cookie` header values for a given request target.
///
/// Implementations decide storage, expiry and domain-matching policy; this
/// crate only needs to ask "what cookies apply to this host and path" when
/// composing a request (`spec.md` §4.3's add-cookies operation).
pub trait CookieJar: Send + Sync {
    /// Returns the `(name, value)` pairs that apply to `host`/`path`, in
    /// the order they should be sent.
    fn cookies_for(&self, host: &str, path: &str) -> Vec<(String, String)>;

    /// Records the raw `Set-Cookie` header values a response carried for
    /// `host`/`path` (`spec.md` §4.8's "extract-cookies-from-response").
    /// Parsing attributes (`Domain`, `Path`, `Expires`, ...) is the jar's
    /// concern; a jar that only ever reads from `cookies_for` may ignore
    /// this entirely.
    fn store(&self, host: &str, path: &str, set_cookie_values: &[String]) {
        let _ = (host, path, set_cookie_values);
    }
}

/// A jar that never has any cookies to offer. Used where no jar was
/// configured; `add_cookies` becomes a no-op against it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJar;

impl CookieJar for NullJar {
    fn cookies_for(&self, _host: &str, _path: &str) -> Vec<(String, String)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_jar_yields_nothing() {
        assert!(NullJar.cookies_for("example.com", "/").is_empty());
    }
}
