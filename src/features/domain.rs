use once_cell::sync::Lazy;
use regex::Regex;

/// Dotted-quad shape, full-string match only. `127.0.0.1.evil.com` must not
/// count as an IP host.
static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}$").unwrap());

/// Whether a host is a dotted-quad IPv4 literal.
pub fn looks_like_ipv4(host: &str) -> bool {
    IPV4_RE.is_match(host)
}

/// Host decomposition against the embedded Public Suffix List.
///
/// The PSL data itself comes from the `psl` crate; this module only slices
/// the host around the registrable domain it reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainParts {
    /// Dot-joined labels left of the registrable domain (may be empty).
    pub subdomain: String,
    /// Domain one level above the public suffix, e.g. `example.com`.
    pub registrable: String,
    /// The public suffix itself, e.g. `com` or `co.uk`.
    pub suffix: String,
}

impl DomainParts {
    /// Number of non-empty subdomain labels; bare domains yield 0.
    pub fn subdomain_count(&self) -> usize {
        self.subdomain.split('.').filter(|s| !s.is_empty()).count()
    }
}

/// Split a host into subdomain, registrable domain, and public suffix.
///
/// Hosts the PSL cannot place (IP addresses, bare suffixes, empty strings)
/// come back with empty registrable/subdomain parts.
pub fn split_host(host: &str) -> DomainParts {
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    // The PSL wildcard rule would otherwise slice an IP literal into
    // bogus "labels".
    if looks_like_ipv4(&host) {
        return DomainParts::default();
    }

    let registrable = psl::domain_str(&host).unwrap_or("").to_string();
    let suffix = psl::suffix_str(&host).unwrap_or("").to_string();

    let subdomain = if !registrable.is_empty() && host.len() > registrable.len() {
        host[..host.len() - registrable.len()]
            .trim_end_matches('.')
            .to_string()
    } else {
        String::new()
    };

    DomainParts {
        subdomain,
        registrable,
        suffix,
    }
}
