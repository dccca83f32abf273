//! Protocol-neutral HTTP message model (`spec.md` §3, §4.3 / C3).
//!
//! One [`Message`] represents either a request or a response; the same
//! type serializes to HTTP/1.1 wire bytes or an HTTP/2 HEADERS/CONTINUATION
//! sequence. Grounded on
//! `original_source/modules/access/http/message.c` — this module keeps
//! its header-token grammar, agent grammar, date formats and credential
//! encoding, but folds headers on read (the original's `get_header` left
//! that as a TODO; `spec.md` §4.3 requires it) and represents the
//! attached body as a typed enum rather than a C vtable.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use http::Method;

use crate::cookie::CookieJar;
use crate::error::{Error, Result};
use crate::frame::headers::Pseudo;
use crate::hpack;

/// The stream of body bytes (and, for HTTP/2, possible follow-up header
/// blocks) attached to a message. The two connection engines are the only
/// variants (`spec.md` §9's polymorphism note); there is no third kind.
pub enum Body {
    H1(crate::h1::Body),
    H2(crate::proto::RecvStream),
}

impl Body {
    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        match self {
            Body::H1(b) => b.read().await,
            Body::H2(s) => s.read().await,
        }
    }

    /// Discards the current header block and reads the next one from the
    /// same underlying stream (1xx continuation, or trailers).
    pub async fn read_headers(&mut self) -> Result<Option<Message>> {
        match self {
            Body::H1(b) => b.read_headers().await,
            Body::H2(s) => s.read_headers().await,
        }
    }

    pub async fn close(self, abort: bool) {
        match self {
            Body::H1(b) => b.close(abort).await,
            Body::H2(s) => s.close(abort).await,
        }
    }
}

/// A request or response. `status` distinguishes the two: `None` means
/// request, `Some(code)` means response (code is always `< 1000`).
pub struct Message {
    status: Option<u16>,
    method: Option<Method>,
    scheme: Option<String>,
    authority: Option<String>,
    path: Option<String>,
    headers: Vec<(String, String)>,
    body: Option<Body>,
}

impl Message {
    /// Builds a request. `spec.md` §3: method matches HTTP token grammar
    /// (enforced by `http::Method`'s own parser).
    pub fn request(
        method: &str,
        scheme: Option<&str>,
        authority: Option<&str>,
        path: Option<&str>,
    ) -> Result<Message> {
        let method = method
            .parse::<Method>()
            .map_err(|_| Error::parse("invalid request method"))?;
        Ok(Message {
            status: None,
            method: Some(method),
            scheme: scheme.map(str::to_owned),
            authority: authority.map(str::to_owned),
            path: path.map(str::to_owned),
            headers: Vec::new(),
            body: None,
        })
    }

    /// Builds a response. `status` must be a three-decimal-digit value.
    pub fn response(status: u16) -> Result<Message> {
        if status >= 1000 {
            return Err(Error::parse("status code out of range"));
        }
        Ok(Message {
            status: Some(status),
            method: None,
            scheme: None,
            authority: None,
            path: None,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn is_request(&self) -> bool {
        self.status.is_none()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Appends one header. Rejects names that are not an HTTP token; CR
    /// and LF in the value are each replaced by a space, matching
    /// `vlc_http_msg_vadd_header`'s RFC 7230 §3.2.4 folding.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        if !is_token(name) {
            return Err(Error::parse("invalid header name"));
        }
        let value = value.into();
        let value: String = value
            .chars()
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();
        self.headers.push((name.to_owned(), value));
        Ok(())
    }

    /// Case-insensitive lookup of every occurrence of `name`, unfolded.
    /// `Set-Cookie` in particular must never be comma-joined (RFC 6265
    /// §5.2), so the connection manager extracts cookies through this
    /// rather than through `get_header`.
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Case-insensitive lookup, folding multiple same-named headers per
    /// IETF semantics: `", "`-joined, except `Cookie`, which folds with
    /// `"; "` (RFC 6265 §4.2.1).
    pub fn get_header(&self, name: &str) -> Option<String> {
        let sep = fold_separator(name);
        let mut out: Option<String> = None;
        for (n, v) in &self.headers {
            if n.eq_ignore_ascii_case(name) {
                match &mut out {
                    Some(acc) => {
                        acc.push_str(sep);
                        acc.push_str(v);
                    }
                    None => out = Some(v.clone()),
                }
            }
        }
        out
    }

    /// Case-insensitive search for one parameter/token within a
    /// comma-separated header value (e.g. `Pragma`, `TE`), comparing only
    /// the part before `=` and skipping quoted-string content when
    /// scanning for the separator.
    pub fn get_token(&self, name: &str, token: &str) -> Option<String> {
        let value = self.get_header(name)?;
        for item in split_top_level(&value, ',') {
            let item = item.trim();
            let key = item.split('=').next().unwrap_or(item).trim();
            if key.eq_ignore_ascii_case(token) {
                return Some(item.to_owned());
            }
        }
        None
    }

    /// Sets `User-Agent` (request) or `Server` (response), validated
    /// against RFC 7231 §5.5.3 / §7.4.2's product grammar.
    pub fn add_agent(&mut self, value: &str) -> Result<()> {
        if !is_agent(value) {
            return Err(Error::parse("invalid agent string"));
        }
        let hname = self.agent_header_name();
        self.add_header(hname, value)
    }

    pub fn get_agent(&self) -> Option<String> {
        let hname = self.agent_header_name();
        let value = self.get_header(hname)?;
        is_agent(&value).then_some(value)
    }

    fn agent_header_name(&self) -> &'static str {
        if self.is_request() {
            "User-Agent"
        } else {
            "Server"
        }
    }

    /// Adds a timestamp header in fixed IMF-fixdate form.
    pub fn add_time(&mut self, name: &str, unix_time: i64) -> Result<()> {
        let system_time = UNIX_EPOCH + std::time::Duration::from_secs(unix_time.max(0) as u64);
        let formatted = httpdate::fmt_http_date(system_time);
        self.add_header(name, formatted)
    }

    /// Adds a `Date` header for the current time.
    pub fn add_atime(&mut self, now: SystemTime) -> Result<()> {
        let unix_time = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.add_time("Date", unix_time)
    }

    pub fn get_time(&self, name: &str) -> Option<i64> {
        let value = self.get_header(name)?;
        parse_http_date(&value)
    }

    pub fn get_atime(&self) -> Option<i64> {
        self.get_time("Date")
    }

    pub fn get_mtime(&self) -> Option<i64> {
        self.get_time("Last-Modified")
    }

    /// Seconds until the `Retry-After` deadline, clamped to zero if
    /// already past, zero if the header is missing or unparseable.
    pub fn get_retry_after(&self, now: SystemTime) -> u64 {
        let Some(value) = self.get_header("Retry-After") else {
            return 0;
        };
        if let Ok(seconds) = value.trim().parse::<u64>() {
            return seconds;
        }
        let Some(deadline) = parse_http_date(&value) else {
            return 0;
        };
        let now = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        (deadline - now).max(0) as u64
    }

    /// Adds `Authorization` (or `Proxy-Authorization` if `proxy`) with
    /// base64-encoded `user:pass` Basic credentials.
    pub fn add_basic_credentials(&mut self, proxy: bool, user: &str, pass: &str) -> Result<()> {
        let raw = format!("{user}:{pass}");
        let encoded = BASE64.encode(raw.as_bytes());
        let hname = if proxy {
            "Proxy-Authorization"
        } else {
            "Authorization"
        };
        self.add_header(hname, format!("Basic {encoded}"))
    }

    /// Parses `realm="..."` out of a `Basic` `WWW-Authenticate` challenge,
    /// unescaping backslash-quoted pairs.
    pub fn get_basic_realm(&self) -> Option<String> {
        let value = self.get_header("WWW-Authenticate")?;
        parse_basic_realm(&value)
    }

    /// Appends a `Cookie` header from the jar's entries matching
    /// `self.authority()`/`self.path()`.
    pub fn add_cookies(&mut self, jar: &dyn CookieJar) -> Result<()> {
        let host = self.authority.clone().unwrap_or_default();
        let path = self.path.clone().unwrap_or_else(|| "/".to_owned());
        let cookies = jar.cookies_for(&host, &path);
        if cookies.is_empty() {
            return Ok(());
        }
        let mut value = String::new();
        for (i, (name, val)) in cookies.iter().enumerate() {
            if i > 0 {
                value.push_str("; ");
            }
            value.push_str(name);
            value.push('=');
            value.push_str(val);
        }
        self.add_header("Cookie", value)
    }

    /// Payload length per RFC 7230 §3.3.3: zero for informational/204/205/304
    /// responses; `None` (unknown) if `Transfer-Encoding` is present; else
    /// parsed `Content-Length`; else zero for requests, `None` for
    /// responses.
    pub fn get_size(&self) -> Option<u64> {
        if let Some(status) = self.status {
            if status / 100 == 1 || status == 204 || status == 205 || status == 304 {
                return Some(0);
            }
        }
        if self.get_header("Transfer-Encoding").is_some() {
            return None;
        }
        match self.get_header("Content-Length") {
            Some(value) => value.trim().parse::<u64>().ok().or(None),
            None => {
                if self.is_request() {
                    Some(0)
                } else {
                    None
                }
            }
        }
    }

    /// Attaches the body stream. A message may be attached at most once;
    /// calling this twice is a programming error (`spec.md` §3).
    pub fn attach(&mut self, body: Body) {
        assert!(self.body.is_none(), "message already has an attached body");
        self.body = Some(body);
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        match &mut self.body {
            Some(body) => body.read().await,
            None => Ok(None),
        }
    }

    /// Discards `self` and reads the next header block from the same
    /// stream (1xx continuation, trailers).
    pub async fn iterate(mut self) -> Result<Option<Message>> {
        match self.body.take() {
            Some(mut body) => body.read_headers().await,
            None => Ok(None),
        }
    }

    /// Iterates past 1xx informational responses to the final header set.
    pub async fn get_final(mut self) -> Result<Option<Message>> {
        loop {
            if self.status.map(|s| s / 100) != Some(1) {
                return Ok(Some(self));
            }
            match self.iterate().await? {
                Some(next) => self = next,
                None => return Ok(None),
            }
        }
    }

    /// Serializes to HTTP/1.1 wire form: request-line or status-line,
    /// then `Name: Value\r\n` per header, then a terminating blank line.
    pub fn to_h1_bytes(&self) -> String {
        let mut out = String::new();
        match self.status {
            None => {
                let method = self.method.as_ref().map(Method::as_str).unwrap_or("GET");
                let path = self
                    .path
                    .as_deref()
                    .or(self.authority.as_deref())
                    .unwrap_or("/");
                let authority = self.authority.as_deref().unwrap_or("");
                out.push_str(method);
                out.push(' ');
                out.push_str(path);
                out.push_str(" HTTP/1.1\r\nHost: ");
                out.push_str(authority);
                out.push_str("\r\n");
            }
            Some(status) => {
                out.push_str(&format!("HTTP/1.1 {status:03} .\r\n"));
            }
        }
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }

    /// Serializes to an HTTP/2 HEADERS(+CONTINUATION) frame sequence.
    /// Connection-specific headers must never be present — checked here
    /// rather than left to an assertion deep in the frame encoder.
    pub fn to_h2_frames(
        &self,
        stream_id: crate::frame::StreamId,
        end_stream: bool,
        max_frame_size: usize,
        encoder: &mut hpack::Encoder,
    ) -> Result<Vec<bytes::BytesMut>> {
        for (name, _) in &self.headers {
            if name.eq_ignore_ascii_case("connection")
                || name.eq_ignore_ascii_case("upgrade")
                || name.eq_ignore_ascii_case("http2-settings")
            {
                return Err(Error::parse("connection-specific header on HTTP/2 message"));
            }
        }

        let pseudo = if self.is_request() {
            Pseudo::request(
                self.method.clone().unwrap_or(Method::GET),
                &self.scheme.clone().unwrap_or_default(),
                &self.authority.clone().unwrap_or_default(),
                &self.path.clone().unwrap_or_default(),
            )
        } else {
            let status = http::StatusCode::from_u16(self.status.unwrap_or(0))
                .map_err(|_| Error::parse("invalid status for HTTP/2 response"))?;
            Pseudo::response(status)
        };

        Ok(crate::frame::headers::encode(
            stream_id,
            &pseudo,
            &self.headers,
            end_stream,
            max_frame_size,
            encoder,
        ))
    }

    /// Parses an HTTP/1.1 response head: the exact line
    /// `HTTP/1.<minor> SSS TEXT\r\n`, then folded headers until the
    /// blank line. Rejects pseudo-header-looking names (containing `:`).
    pub fn parse_h1_response(input: &str) -> Result<Message> {
        let mut lines = input.split("\r\n");
        let status_line = lines.next().ok_or_else(|| Error::parse("empty message"))?;

        let rest = status_line
            .strip_prefix("HTTP/1.")
            .ok_or_else(|| Error::parse("missing status line"))?;
        let mut parts = rest.splitn(2, ' ');
        let _minor = parts
            .next()
            .ok_or_else(|| Error::parse("missing HTTP minor version"))?;
        let status_and_text = parts.next().ok_or_else(|| Error::parse("missing status"))?;
        if status_and_text.len() < 3 {
            return Err(Error::parse("missing status code"));
        }
        let status: u16 = status_and_text[..3]
            .parse()
            .map_err(|_| Error::parse("malformed status code"))?;

        let mut message = Message::response(status)?;

        // Re-fold obs-fold continuation lines (leading SP/HT) before
        // splitting into discrete header lines.
        let mut folded_lines: Vec<String> = Vec::new();
        for line in lines {
            if line.starts_with(' ') || line.starts_with('\t') {
                match folded_lines.last_mut() {
                    Some(prev) => {
                        prev.push(' ');
                        prev.push_str(line.trim_start_matches([' ', '\t']));
                    }
                    None => return Err(Error::parse("obs-fold on first header line")),
                }
            } else {
                folded_lines.push(line.to_owned());
            }
        }

        let mut saw_terminator = false;
        for line in folded_lines {
            if line.is_empty() {
                saw_terminator = true;
                break;
            }
            let colon = line.find(':').ok_or_else(|| Error::parse("missing colon"))?;
            if colon == 0 {
                return Err(Error::parse("empty header name"));
            }
            let name = &line[..colon];
            if name.contains(':') || name.starts_with(':') {
                return Err(Error::parse("pseudo-header in HTTP/1 message"));
            }
            let value = line[colon + 1..].trim_start_matches([' ', '\t']);
            message.add_header(name, value)?;
        }

        if !saw_terminator {
            return Err(Error::parse("missing terminating blank line"));
        }

        Ok(message)
    }

    /// Builds a message from already HPACK-decoded HTTP/2 headers. Splits
    /// pseudo-header fields (`:status`/`:method`/`:scheme`/`:authority`/
    /// `:path`) from regular headers; duplicate pseudo-fields are
    /// rejected.
    pub fn from_h2_headers(headers: Vec<(String, String)>) -> Result<Message> {
        let mut status = None;
        let mut method = None;
        let mut scheme = None;
        let mut authority = None;
        let mut path = None;
        let mut regular = Vec::with_capacity(headers.len());

        for (name, value) in headers {
            match name.as_str() {
                ":status" if status.is_none() => {
                    let code: u16 = value
                        .parse()
                        .map_err(|_| Error::parse("malformed :status pseudo-header"))?;
                    if code >= 1000 {
                        return Err(Error::parse(":status out of range"));
                    }
                    status = Some(code);
                }
                ":method" if method.is_none() => {
                    method = Some(
                        value
                            .parse::<Method>()
                            .map_err(|_| Error::parse("malformed :method pseudo-header"))?,
                    );
                }
                ":scheme" if scheme.is_none() => scheme = Some(value),
                ":authority" if authority.is_none() => authority = Some(value),
                ":path" if path.is_none() => path = Some(value),
                n if n.starts_with(':') => {
                    return Err(Error::parse("duplicate or unknown pseudo-header"));
                }
                _ => regular.push((name, value)),
            }
        }

        Ok(Message {
            status,
            method,
            scheme,
            authority,
            path,
            headers: regular,
            body: None,
        })
    }
}

fn fold_separator(name: &str) -> &'static str {
    if name.eq_ignore_ascii_case("cookie") {
        "; "
    } else {
        ", "
    }
}

/// Splits `value` on `sep` at the top level only, treating `"..."`
/// double-quoted runs (with `\`-escapes) as opaque so that separators
/// inside quoted parameter values don't split the item.
fn split_top_level(value: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let bytes = value.as_bytes();
    let mut start = 0;
    let mut i = 0;
    let mut in_quotes = false;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_quotes = !in_quotes,
            b'\\' if in_quotes => i += 1,
            b if !in_quotes && b as char == sep => {
                out.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    out.push(&value[start..]);
    out
}

/// RFC 7230 §3.2.6 `tchar`.
fn is_tchar(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&c)
}

fn token_len(s: &str) -> usize {
    s.bytes().take_while(|&c| is_tchar(c)).count()
}

fn is_token(s: &str) -> bool {
    let len = token_len(s);
    len > 0 && len == s.len()
}

fn is_ctext(c: u8) -> bool {
    c == b'\t' || c == b' ' || (0x21..=0x27).contains(&c) || (0x2a..=0x5b).contains(&c) || (0x5d..=0x7e).contains(&c) || c >= 0x80
}

/// Length of a balanced, possibly-nested RFC 7230 `comment`, or 0 if `s`
/// does not start with a well-formed one.
fn comment_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'(') {
        return 0;
    }
    let mut i = 1;
    let mut nested = 1;
    while nested > 0 {
        let Some(&c) = bytes.get(i) else {
            return 0;
        };
        match c {
            b')' => nested -= 1,
            b'(' => nested += 1,
            b'\\' => {
                i += 1;
                match bytes.get(i) {
                    Some(&next) if next >= 32 => {}
                    _ => return 0,
                }
            }
            c if !is_ctext(c) => return 0,
            _ => {}
        }
        i += 1;
    }
    i
}

/// RFC 7231 §5.5.3 / §7.4.2 `product ( RWS ( product / comment ) )*`.
fn is_agent(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() || !is_tchar(bytes[0]) {
        return false;
    }
    let mut rest = s;
    loop {
        let mut len = token_len(rest);
        if len != 0 {
            if rest.as_bytes().get(len) == Some(&b'/') {
                rest = &rest[len + 1..];
                len = token_len(rest);
            }
        } else {
            len = comment_len(rest);
        }
        if len == 0 {
            break;
        }
        rest = &rest[len..];
        if rest.is_empty() {
            return true;
        }
        let rws = rest.bytes().take_while(|&c| c == b'\t' || c == b' ').count();
        if rws == 0 {
            break;
        }
        rest = &rest[rws..];
    }
    false
}

/// Parses IMF-fixdate, RFC 850, and ANSI C asctime, including the
/// original's RFC 850 two-digit-year compatibility rule.
fn parse_http_date(s: &str) -> Option<i64> {
    httpdate::parse_http_date(s.trim())
        .ok()
        .map(|t| t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64)
}

/// Unescapes `\X` pairs inside an already-unquoted `quoted-string` body.
fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Parses `realm="..."` (optionally preceded by other auth-params) out of
/// a `Basic` challenge string, per the scheme's free-form parameter list.
fn parse_basic_realm(value: &str) -> Option<String> {
    let mut rest = value.trim_start();
    let scheme_len = token_len(rest);
    if scheme_len == 0 || !rest[..scheme_len].eq_ignore_ascii_case("basic") {
        return None;
    }
    rest = rest[scheme_len..].trim_start_matches([' ', '\t']);

    for item in split_top_level(rest, ',') {
        let item = item.trim_start_matches([' ', '\t', ',']);
        let eq = item.find('=')?;
        let name = item[..eq].trim_end_matches([' ', '\t']);
        if !name.eq_ignore_ascii_case("realm") {
            continue;
        }
        let value = item[eq + 1..].trim_start_matches([' ', '\t']);
        let value = value.strip_prefix('"')?;
        let end = find_unescaped_quote(value)?;
        return Some(unescape_quoted(&value[..end]));
    }
    None
}

fn find_unescaped_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Some(i),
            b'\\' => i += 1,
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_and_h1_serialization() {
        let mut m = Message::request("GET", Some("http"), Some("www.example.com"), Some("/")).unwrap();
        m.add_header("Cache-Control", "no-cache").unwrap();
        let out = m.to_h1_bytes();
        assert!(out.starts_with("GET / HTTP/1.1\r\nHost: www.example.com\r\n"));
        assert!(out.ends_with("\r\n\r\n"));
    }

    #[test]
    fn header_name_must_be_token() {
        let mut m = Message::request("GET", None, None, None).unwrap();
        assert!(m.add_header("/naughty", "header").is_err());
        assert!(m.add_header("", "void").is_err());
    }

    #[test]
    fn header_value_folds_cr_lf_to_space() {
        let mut m = Message::request("GET", None, None, None).unwrap();
        m.add_header("X-Folded", "Hello\n\tworld!").unwrap();
        assert_eq!(m.get_header("x-folded").unwrap(), "Hello \tworld!");
    }

    #[test]
    fn get_header_folds_with_comma_space() {
        let mut m = Message::response(200).unwrap();
        m.add_header("TE", "gzip").unwrap();
        m.add_header("TE", "deflate").unwrap();
        assert_eq!(m.get_header("TE").unwrap(), "gzip, deflate");
    }

    #[test]
    fn get_header_folds_cookie_with_semicolon() {
        let mut m = Message::request("GET", None, None, None).unwrap();
        m.add_header("Cookie", "a=1").unwrap();
        m.add_header("Cookie", "b=2").unwrap();
        assert_eq!(m.get_header("Cookie").unwrap(), "a=1; b=2");
    }

    #[test]
    fn get_token_scans_top_level_items_only() {
        let mut m = Message::response(200).unwrap();
        m.add_header("Pragma", " features=\"broadcast,playlist\"").unwrap();
        m.add_header("Pragma", " client-id=123456789 ").unwrap();
        m.add_header("Pragma", "no-cache ").unwrap();

        assert!(m.get_token("Pragma", "features").unwrap().starts_with("features=\""));
        assert!(m.get_token("Pragma", "broadcast").is_none());
        assert!(m.get_token("Pragma", "playlist").is_none());
        assert!(m.get_token("Pragma", "client-id").unwrap().starts_with("client-id="));
        assert_eq!(m.get_token("Pragma", "no-cache").unwrap(), "no-cache");
    }

    #[test]
    fn agent_validation_matches_spec_examples() {
        assert!(is_agent("Foo/1.0 (Hello world) Bar/2.3"));
        assert!(is_agent("Foo/1.0 (compatible (\\(!))"));
        assert!(!is_agent("Foo/1.0 \"Evil\""));
        assert!(!is_agent("/1.0"));
        assert!(!is_agent(""));
        assert!(!is_agent("Bad/1.0 (\\)"));
    }

    #[test]
    fn basic_credentials_are_base64_of_user_colon_pass() {
        let mut m = Message::request("PRI", Some("https"), Some("*"), None).unwrap();
        m.add_basic_credentials(false, "Aladdin", "open sesame").unwrap();
        assert_eq!(
            m.get_header("Authorization").unwrap(),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn basic_realm_parses_quoted_and_escaped_values() {
        assert_eq!(parse_basic_realm("Basic realm=\"kingdom\""), Some("kingdom".into()));
        assert_eq!(parse_basic_realm("BaSiC REALM= \"kingdom\""), Some("kingdom".into()));
        assert_eq!(parse_basic_realm("basic Realm\t=\"kingdom\""), Some("kingdom".into()));
        assert_eq!(
            parse_basic_realm("Basic charset=\"utf-8\", realm=\"kingdom\""),
            Some("kingdom".into())
        );
        assert_eq!(
            parse_basic_realm("Basic realm=\"Realm is \\\"Hello world!\\\"\""),
            Some("Realm is \"Hello world!\"".into())
        );
        assert_eq!(parse_basic_realm("Basic"), None);
    }

    #[test]
    fn date_formats_all_parse_to_same_instant() {
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(784111777));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(784111777));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(784111777));
        assert_eq!(parse_http_date("Sun, 06 Bug 1994 08:49:37 GMT"), None);
        assert_eq!(parse_http_date("bogus"), None);
    }

    #[test]
    fn get_size_rules_follow_rfc7230() {
        let mut m = Message::response(204).unwrap();
        assert_eq!(m.get_size(), Some(0));

        let mut m = Message::response(200).unwrap();
        m.add_header("Transfer-Encoding", "chunked").unwrap();
        assert_eq!(m.get_size(), None);

        let mut m = Message::response(200).unwrap();
        m.add_header("Content-Length", "1234").unwrap();
        assert_eq!(m.get_size(), Some(1234));

        let m = Message::response(200).unwrap();
        assert_eq!(m.get_size(), None);

        let m = Message::request("GET", None, None, None).unwrap();
        assert_eq!(m.get_size(), Some(0));
    }

    #[test]
    fn parse_h1_response_rejects_garbage_and_pseudo_headers() {
        assert!(Message::parse_h1_response("Go away!\r\n\r\n").is_err());
        assert!(Message::parse_h1_response("").is_err());
        assert!(Message::parse_h1_response("\r\n").is_err());
        assert!(Message::parse_h1_response("HTTP/1.1 200 OK\r\n").is_err());
        assert!(Message::parse_h1_response("HTTP/1.1 200 OK\r\n:status: 200\r\n\r\n").is_err());
    }

    #[test]
    fn parse_h1_response_folds_duplicate_headers_and_obs_fold() {
        let m = Message::parse_h1_response("HTTP/1.1 200 OK\r\nH: V\r\nH: W\r\n\r\n").unwrap();
        assert_eq!(m.get_header("H").unwrap(), "V, W");

        let m = Message::parse_h1_response("HTTP/1.1 200 OK\r\nX-Folded: Hello\r\n\tworld!\r\n\r\n").unwrap();
        assert_eq!(m.get_header("X-Folded").unwrap(), "Hello world!");
    }

    #[test]
    fn from_h2_headers_splits_pseudo_fields() {
        let headers = vec![
            (":status".to_string(), "200".to_string()),
            ("content-type".to_string(), "text/plain".to_string()),
        ];
        let m = Message::from_h2_headers(headers).unwrap();
        assert_eq!(m.status(), Some(200));
        assert_eq!(m.get_header("content-type").unwrap(), "text/plain");
    }
}
