//! HPACK static table (RFC 7541 Appendix A) and the per-connection dynamic
//! table (RFC 7541 §2.3.2).

use std::collections::VecDeque;

/// The 61-entry HPACK static table. Index `1` is the first entry; index
/// `0` is never valid (RFC 7541 §2.3.1) and is not represented here — add
/// 1 when converting a wire index to a Rust array index.
pub const STATIC_TABLE: [(&str, &str); 61] = [
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

/// Per-entry bookkeeping overhead counted towards the table size (RFC
/// 7541 §4.1): 32 bytes, plus the octet length of the name and value.
pub fn entry_size(name: &str, value: &str) -> usize {
    32 + name.len() + value.len()
}

/// The dynamic table: newest entries are pushed to the front (so dynamic
/// index 0 is the most recently inserted), oldest entries are evicted
/// from the back once the configured size is exceeded (`spec.md` §3).
#[derive(Debug, Default)]
pub struct DynamicTable {
    entries: VecDeque<(String, String)>,
    size: usize,
    max_size: usize,
}

impl DynamicTable {
    pub fn new(max_size: usize) -> DynamicTable {
        DynamicTable {
            entries: VecDeque::new(),
            size: 0,
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Lowers (or raises, up to the configured connection maximum) the
    /// table size and evicts FIFO until it fits.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict();
    }

    pub fn insert(&mut self, name: String, value: String) {
        self.size += entry_size(&name, &value);
        self.entries.push_front((name, value));
        self.evict();
    }

    fn evict(&mut self) {
        while self.size > self.max_size {
            match self.entries.pop_back() {
                Some((n, v)) => self.size -= entry_size(&n, &v),
                None => break,
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&(String, String)> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Resolves a 1-based HPACK index into either the static table or the
/// dynamic table (dynamic indices start right after the static table's 61
/// entries, i.e. wire index 62 is the newest dynamic entry).
pub fn lookup<'a>(
    dynamic: &'a DynamicTable,
    index: usize,
) -> Option<(&'a str, &'a str)> {
    if index == 0 {
        return None;
    }
    if index <= STATIC_TABLE.len() {
        let (n, v) = STATIC_TABLE[index - 1];
        return Some((n, v));
    }
    let dyn_index = index - STATIC_TABLE.len() - 1;
    dynamic
        .get(dyn_index)
        .map(|(n, v)| (n.as_str(), v.as_str()))
}
