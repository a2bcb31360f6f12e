pub mod domain;
pub mod normalizer;

use serde::Serialize;
use std::collections::HashMap;

pub use domain::{split_host, DomainParts};
pub use normalizer::{normalize, NormalizedUrl};

/// Bump whenever the feature set or its order changes. Saved models record
/// this and refuse to load against a different extractor.
pub const FEATURE_SET_VERSION: u32 = 1;

pub const FEATURE_COUNT: usize = 13;

/// Column order of the classifier's input matrix. This is a contract shared
/// by training and inference; reordering it invalidates every saved model.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "length",
    "num_digits",
    "num_special",
    "entropy",
    "has_ip",
    "num_subdomains",
    "path_length",
    "query_length",
    "fragment_length",
    "suspicious_kw",
    "at_sign",
    "dash_in_domain",
    "https",
];

/// Characters counted by the `num_special` feature.
const SPECIAL_CHARS: &[char] = &[
    '@', '-', '_', '.', '?', '=', '/', '#', '%', '&', ':', '+', '$', '!', '*', ',', '\'', '(',
    ')', '{', '}', '[', ']', '|', '\\',
];

/// Substrings that flip the `suspicious_kw` feature (matched lowercased).
const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "login",
    "verify",
    "update",
    "secure",
    "account",
    "password",
    "bank",
    "confirm",
    "invoice",
    "paypal",
    "apple",
    "microsoft",
    "amazon",
];

/// The thirteen named features for one URL, all as `f64` for classifier
/// compatibility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlFeatures {
    pub length: f64,
    pub num_digits: f64,
    pub num_special: f64,
    pub entropy: f64,
    pub has_ip: f64,
    pub num_subdomains: f64,
    pub path_length: f64,
    pub query_length: f64,
    pub fragment_length: f64,
    pub suspicious_kw: f64,
    pub at_sign: f64,
    pub dash_in_domain: f64,
    pub https: f64,
}

impl UrlFeatures {
    /// Assemble the fixed-order vector fed to the classifier. Training and
    /// inference both go through here so columns can never silently permute.
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.length,
            self.num_digits,
            self.num_special,
            self.entropy,
            self.has_ip,
            self.num_subdomains,
            self.path_length,
            self.query_length,
            self.fragment_length,
            self.suspicious_kw,
            self.at_sign,
            self.dash_in_domain,
            self.https,
        ]
    }
}

/// Extract the full feature set from arbitrary URL-like text.
///
/// Pure and total: no input can make this fail, and identical input always
/// produces an identical vector.
pub fn extract_features(text: &str) -> UrlFeatures {
    let norm = normalize(text);
    let full = norm.full.as_str();
    let lowered = full.to_lowercase();
    let parts = split_host(&norm.host);

    UrlFeatures {
        length: full.chars().count() as f64,
        num_digits: full.chars().filter(|c| c.is_ascii_digit()).count() as f64,
        num_special: full.chars().filter(|c| SPECIAL_CHARS.contains(c)).count() as f64,
        entropy: shannon_entropy(full),
        has_ip: bool_feature(domain::looks_like_ipv4(&norm.host)),
        num_subdomains: parts.subdomain_count() as f64,
        path_length: norm.path.chars().count() as f64,
        query_length: norm.query.chars().count() as f64,
        fragment_length: norm.fragment.chars().count() as f64,
        suspicious_kw: bool_feature(SUSPICIOUS_KEYWORDS.iter().any(|kw| lowered.contains(kw))),
        at_sign: bool_feature(full.contains('@')),
        dash_in_domain: bool_feature(norm.netloc.contains('-')),
        https: bool_feature(norm.scheme.eq_ignore_ascii_case("https")),
    }
}

/// Shannon entropy (base 2) of the character distribution, in bits.
pub fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let n = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum()
}

fn bool_feature(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
