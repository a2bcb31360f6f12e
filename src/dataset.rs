use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// `name.tld` shape used when guessing which column holds URLs.
static URL_SHAPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9.-]+\.[a-z]{2,}(/|$)").unwrap());

/// Column names recognized as the URL column, in priority order.
const URL_COLUMN_NAMES: &[&str] = &[
    "url", "urls", "phishing_url", "link", "links", "hostname", "domain", "website", "entry",
];

/// Column names recognized as the label column, in priority order.
const LABEL_COLUMN_NAMES: &[&str] = &[
    "label", "type", "is_phishing", "target", "class", "status", "result",
];

/// Minimum fraction of URL-like values for a column to win the guess.
const URL_SHAPE_MIN_RATIO: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Benign,
    Malicious,
}

impl Label {
    /// Normalize the label vocabulary found in public URL datasets.
    /// Unknown values default to benign, matching the ingestion contract.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "malicious" | "phishing" | "malware" | "bad" | "1" | "true" => Label::Malicious,
            _ => Label::Benign,
        }
    }

    /// Class index used by the classifier: benign = 0, malicious = 1.
    pub fn as_class(&self) -> u32 {
        match self {
            Label::Benign => 0,
            Label::Malicious => 1,
        }
    }

    pub fn from_class(class: u32) -> Self {
        if class == 1 {
            Label::Malicious
        } else {
            Label::Benign
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Benign => "benign",
            Label::Malicious => "malicious",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled training example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub url: String,
    pub label: Label,
}

impl Sample {
    pub fn new(url: impl Into<String>, label: Label) -> Self {
        Self {
            url: url.into(),
            label,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("could not find a URL column in {0}")]
    NoUrlColumn(String),
    #[error("no datasets provided")]
    Empty,
}

/// Whether a cell value plausibly holds a URL or bare domain.
fn looks_like_url(value: &str) -> bool {
    let text = value.trim().to_lowercase();
    if text.is_empty() || text.contains(' ') {
        return false;
    }
    if text.starts_with("http://") || text.starts_with("https://") {
        return true;
    }
    URL_SHAPE_RE.is_match(&text)
}

/// Pick the column whose values look most URL-like, if any clears the
/// minimum ratio.
fn guess_url_column(column_count: usize, records: &[csv::StringRecord]) -> Option<usize> {
    if records.is_empty() {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for col in 0..column_count {
        let matches = records
            .iter()
            .filter(|r| looks_like_url(r.get(col).unwrap_or("")))
            .count();
        let ratio = matches as f64 / records.len() as f64;
        if ratio >= URL_SHAPE_MIN_RATIO && best.map_or(true, |(_, b)| ratio > b) {
            best = Some((col, ratio));
        }
    }
    best.map(|(col, _)| col)
}

/// Load one CSV file of URLs with an optional label column.
///
/// Column detection runs in three steps: known header names, then a
/// value-shape guess, then (for single-column files) a headerless fallback
/// where the header row itself is data.
pub fn load_dataset(path: &Path) -> Result<Vec<Sample>, DatasetError> {
    let display = path.display().to_string();
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| DatasetError::Read {
            path: display.clone(),
            source,
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| DatasetError::Read {
            path: display.clone(),
            source,
        })?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let records: Vec<csv::StringRecord> = reader.records().filter_map(|r| r.ok()).collect();

    let named_url_col = URL_COLUMN_NAMES
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name));

    let url_col = match named_url_col {
        Some(col) => col,
        None => {
            if headers.len() == 1 && looks_like_url(&headers[0]) {
                // Headerless single-column list: the "header" is the first URL
                let mut samples = vec![Sample::new(headers[0].clone(), Label::Benign)];
                samples.extend(
                    records
                        .iter()
                        .filter_map(|r| r.get(0))
                        .map(|url| Sample::new(url.trim(), Label::Benign)),
                );
                return Ok(samples);
            }
            guess_url_column(headers.len(), &records)
                .ok_or_else(|| DatasetError::NoUrlColumn(display.clone()))?
        }
    };

    let label_col = LABEL_COLUMN_NAMES
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name));

    let samples = records
        .iter()
        .map(|record| {
            let url = record.get(url_col).unwrap_or("").trim().to_string();
            let label = label_col
                .and_then(|col| record.get(col))
                .map(Label::parse)
                .unwrap_or(Label::Benign);
            Sample { url, label }
        })
        .collect();

    Ok(samples)
}

/// Load several CSV files, deduplicating by URL (first occurrence wins).
pub fn load_and_merge(paths: &[PathBuf]) -> Result<Vec<Sample>, DatasetError> {
    if paths.is_empty() {
        return Err(DatasetError::Empty);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    for path in paths {
        let samples = load_dataset(path)?;
        log::info!("loaded {} rows from {}", samples.len(), path.display());
        for sample in samples {
            if sample.url.is_empty() {
                continue;
            }
            if seen.insert(sample.url.clone()) {
                merged.push(sample);
            }
        }
    }
    log::info!("{} unique samples after merge", merged.len());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_label_vocabulary_normalization() {
        assert_eq!(Label::parse("phishing"), Label::Malicious);
        assert_eq!(Label::parse("MALWARE"), Label::Malicious);
        assert_eq!(Label::parse("1"), Label::Malicious);
        assert_eq!(Label::parse("true"), Label::Malicious);
        assert_eq!(Label::parse("benign"), Label::Benign);
        assert_eq!(Label::parse("good"), Label::Benign);
        assert_eq!(Label::parse("0"), Label::Benign);
        assert_eq!(Label::parse("weird"), Label::Benign);
    }

    #[test]
    fn test_load_named_columns() {
        let file = write_csv("url,label\nhttp://a.com,benign\nhttp://b.com,phishing\n");
        let samples = load_dataset(file.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, Label::Benign);
        assert_eq!(samples[1].label, Label::Malicious);
    }

    #[test]
    fn test_alternative_column_names() {
        let file = write_csv("website,status\nexample.com,bad\n");
        let samples = load_dataset(file.path()).unwrap();
        assert_eq!(samples[0].url, "example.com");
        assert_eq!(samples[0].label, Label::Malicious);
    }

    #[test]
    fn test_url_column_guessed_by_value_shape() {
        let file = write_csv("id,target_site\n1,http://evil.example/login\n2,http://good.example/\n");
        let samples = load_dataset(file.path()).unwrap();
        assert_eq!(samples[0].url, "http://evil.example/login");
    }

    #[test]
    fn test_headerless_single_column_list() {
        let file = write_csv("http://first.com/\nhttp://second.com/\n");
        let samples = load_dataset(file.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].url, "http://first.com/");
        assert_eq!(samples[1].url, "http://second.com/");
    }

    #[test]
    fn test_missing_label_column_defaults_to_benign() {
        let file = write_csv("url\nhttp://a.com\n");
        let samples = load_dataset(file.path()).unwrap();
        assert_eq!(samples[0].label, Label::Benign);
    }

    #[test]
    fn test_no_url_column_is_an_error() {
        let file = write_csv("a,b\n1,2\n3,4\n");
        assert!(matches!(
            load_dataset(file.path()),
            Err(DatasetError::NoUrlColumn(_))
        ));
    }

    #[test]
    fn test_merge_dedupes_by_url() {
        let first = write_csv("url,label\nhttp://a.com,phishing\nhttp://b.com,benign\n");
        let second = write_csv("url,label\nhttp://a.com,benign\nhttp://c.com,benign\n");
        let merged =
            load_and_merge(&[first.path().to_path_buf(), second.path().to_path_buf()]).unwrap();
        assert_eq!(merged.len(), 3);
        // First occurrence wins
        assert_eq!(merged[0].url, "http://a.com");
        assert_eq!(merged[0].label, Label::Malicious);
    }

    #[test]
    fn test_empty_path_list_is_an_error() {
        assert!(matches!(load_and_merge(&[]), Err(DatasetError::Empty)));
    }
}
