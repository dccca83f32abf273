//! Special ports blocklist, grounded on
//! `original_source/modules/access/http/ports.c`'s sorted
//! `blocked_ports` table plus `bsearch` lookup (`spec.md` §6's
//! "Special ports blocklist", `SPEC_FULL.md` §4.11).
//!
//! Consulted by the (external) dialer collaborator before issuing a plain
//! TCP connect; matches modern browser policy of refusing to speak HTTP to
//! ports associated with other well-known protocols.

/// Ascending, matching the original's invariant that the table is
/// `bsearch`-ready.
const BLOCKED_PORTS: [u16; 63] = [
    1,    // tcpmux
    7,    // echo
    9,    // discard
    11,   // systat
    13,   // daytime
    15,   // netstat
    17,   // QOTD
    19,   // character generator
    20,   // FTP data
    21,   // FTP access
    22,   // SSH
    23,   // Telnet
    25,   // SMTP
    37,   // time
    42,   // name
    43,   // nicname
    53,   // DNS
    77,   // priv-rjs
    79,   // finger
    87,   // ttylink
    95,   // supdup
    101,  // hostriame
    102,  // iso-tsap
    103,  // gppitnp
    104,  // acr-nema
    109,  // POP2
    110,  // POP3
    111,  // Sun RPC
    113,  // auth
    115,  // SFTP
    117,  // UUCP path service
    119,  // NNTP (i.e. Usenet)
    123,  // NTP
    135,  // DCE endpoint resolution
    139,  // NetBIOS
    143,  // IMAP2
    179,  // BGP
    389,  // LDAP
    465,  // SMTP/TLS
    512,  // remote exec
    513,  // remote login
    514,  // remote shell
    515,  // printer
    526,  // tempo
    530,  // courier
    531,  // chat
    532,  // netnews
    540,  // UUCP
    556,  // remotefs
    563,  // NNTP/TLS
    587,  // Submission (i.e. first hop SMTP)
    601,  // rsyslog
    636,  // LDAP/TLS
    993,  // LDAP/TLS
    995,  // POP3/TLS
    2049, // NFS
    3659, // Apple SASL
    4045, // NFS RPC lockd
    6000, // X11
    6665, // IRC
    6666, // IRC
    6667, // IRC
    6668, // IRC
    6669, // IRC
];

/// Whether plain HTTP to `port` is forbidden by policy.
pub fn port_blocked(port: u16) -> bool {
    BLOCKED_PORTS.binary_search(&port).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted() {
        assert!(BLOCKED_PORTS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn known_ports_blocked() {
        assert!(port_blocked(21));
        assert!(port_blocked(25));
        assert!(port_blocked(6667));
    }

    #[test]
    fn ordinary_ports_allowed() {
        assert!(!port_blocked(80));
        assert!(!port_blocked(443));
        assert!(!port_blocked(8080));
    }
}
