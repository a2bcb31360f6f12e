use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Matches an explicit scheme prefix: letter, then letters/digits/`+`/`.`/`-`, then `://`.
static SCHEME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").unwrap());

/// A URL broken into the components the feature computers consume.
///
/// Absent components are empty strings. Parsing never fails: input that the
/// `url` crate rejects degrades to an empty decomposition with only `full`
/// populated, so downstream features come out near zero instead of erroring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// The canonical full URL string all whole-string features run over.
    pub full: String,
    pub scheme: String,
    /// host[:port] as written after canonicalization.
    pub netloc: String,
    /// Host with any port stripped.
    pub host: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

/// Normalize arbitrary URL-like text for feature extraction.
///
/// Leading/trailing whitespace is stripped and `http://` is prepended when no
/// scheme is present, so bare hosts like `paypal.com.secure-update.info`
/// still produce a non-empty network location.
pub fn normalize(text: &str) -> NormalizedUrl {
    let trimmed = text.trim();
    let candidate = if SCHEME_RE.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    match Url::parse(&candidate) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("").to_string();
            let netloc = match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.clone(),
            };
            NormalizedUrl {
                full: parsed.as_str().to_string(),
                scheme: parsed.scheme().to_string(),
                netloc,
                host,
                path: parsed.path().to_string(),
                query: parsed.query().unwrap_or("").to_string(),
                fragment: parsed.fragment().unwrap_or("").to_string(),
            }
        }
        Err(e) => {
            log::debug!("unparseable URL text {candidate:?}: {e}");
            NormalizedUrl {
                full: candidate,
                ..NormalizedUrl::default()
            }
        }
    }
}
