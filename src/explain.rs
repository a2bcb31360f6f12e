use crate::config::ExplainConfig;
use crate::dataset::Label;
use crate::features::extract_features;
use reqwest::Client;
use std::time::Duration;

/// Explanation provider, selected once at startup from configuration.
///
/// Remote failures never reach the caller: every path ends in a string,
/// falling back to the local heuristic text when the remote variant cannot
/// answer.
pub enum Explainer {
    Remote(RemoteExplainer),
    Heuristic,
}

impl Explainer {
    pub fn from_config(config: &ExplainConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());

        match (config.provider.as_str(), api_key) {
            ("heuristic", _) => Explainer::Heuristic,
            ("remote", Some(key)) | ("auto", Some(key)) => {
                match RemoteExplainer::new(config, key) {
                    Ok(remote) => {
                        log::info!("remote explanation provider enabled ({})", config.model);
                        Explainer::Remote(remote)
                    }
                    Err(e) => {
                        log::warn!("failed to build remote explanation client: {e}");
                        Explainer::Heuristic
                    }
                }
            }
            ("remote", None) => {
                log::warn!(
                    "remote explanation provider selected but {} is not set, using heuristic",
                    config.api_key_env
                );
                Explainer::Heuristic
            }
            ("auto", None) => Explainer::Heuristic,
            (other, _) => {
                log::warn!("unknown explanation provider {other:?}, using heuristic");
                Explainer::Heuristic
            }
        }
    }

    /// Produce an explanation for a prediction. Total: remote errors are
    /// logged and answered with the heuristic text instead.
    pub async fn explain(&self, text: &str, label: Label, confidence: f64) -> String {
        match self {
            Explainer::Heuristic => heuristic_explanation(text, label, confidence),
            Explainer::Remote(remote) => match remote.explain(text, label, confidence).await {
                Ok(explanation) => explanation,
                Err(e) => {
                    log::warn!("remote explanation failed, using heuristic: {e}");
                    heuristic_explanation(text, label, confidence)
                }
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("explanation endpoint returned HTTP {0}")]
    Status(u16),
    #[error("explanation response missing message content")]
    MalformedResponse,
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct RemoteExplainer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl RemoteExplainer {
    fn new(config: &ExplainConfig, api_key: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("phishguard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    async fn explain(
        &self,
        text: &str,
        label: Label,
        confidence: f64,
    ) -> Result<String, ExplainError> {
        let prompt = format!(
            "You are a security assistant. Explain in 2-4 concise sentences why the following \
             URL might be phishing or benign. Mention key indicators (keywords, domain patterns, \
             entropy, length, IP usage).\n\
             Text: {text}\n\
             Model prediction: {label} (confidence {confidence:.2})\n"
        );
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.4,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExplainError::Status(status.as_u16()));
        }

        let value: serde_json::Value = response.json().await?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(ExplainError::MalformedResponse)?;
        Ok(content.trim().to_string())
    }
}

/// Deterministic local explanation: lists which features fired, using the
/// same thresholds the classifier reasoning is explained with.
pub fn heuristic_explanation(text: &str, label: Label, confidence: f64) -> String {
    let features = extract_features(text);
    let mut reasons = Vec::new();

    if features.suspicious_kw > 0.0 {
        reasons.push("contains suspicious keywords");
    }
    if features.has_ip > 0.0 {
        reasons.push("uses raw IP in domain");
    }
    if features.num_subdomains > 2.0 {
        reasons.push("many subdomains");
    }
    if features.dash_in_domain > 0.0 {
        reasons.push("dash in domain");
    }
    if features.at_sign > 0.0 {
        reasons.push("contains '@'");
    }
    if features.entropy > 4.0 {
        reasons.push("high character entropy");
    }
    if features.num_special > 5.0 {
        reasons.push("many special characters");
    }
    if features.length > 80.0 {
        reasons.push("unusually long URL");
    }
    if reasons.is_empty() {
        reasons.push("overall pattern resembles known benign/malicious distributions");
    }

    format!(
        "Model predicts {label} with confidence {confidence:.2} because it {}.",
        reasons.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_lists_fired_features() {
        let explanation = heuristic_explanation(
            "http://paypal.com.secure-update.info/verify",
            Label::Malicious,
            0.93,
        );
        assert!(explanation.starts_with("Model predicts malicious with confidence 0.93"));
        assert!(explanation.contains("contains suspicious keywords"));
        assert!(explanation.contains("dash in domain"));
    }

    #[test]
    fn test_heuristic_ip_reason() {
        let explanation =
            heuristic_explanation("http://192.168.1.10/confirm", Label::Malicious, 0.88);
        assert!(explanation.contains("uses raw IP in domain"));
    }

    #[test]
    fn test_heuristic_fallback_reason_for_plain_urls() {
        let explanation = heuristic_explanation("http://a.com/", Label::Benign, 0.97);
        assert!(explanation.contains("overall pattern resembles known benign/malicious distributions"));
    }

    #[test]
    fn test_unset_key_selects_heuristic() {
        let config = ExplainConfig {
            provider: "auto".to_string(),
            api_key_env: "PHISHGUARD_TEST_UNSET_KEY".to_string(),
            ..ExplainConfig::default()
        };
        assert!(matches!(
            Explainer::from_config(&config),
            Explainer::Heuristic
        ));
    }

    #[test]
    fn test_heuristic_provider_is_explicit() {
        let config = ExplainConfig {
            provider: "heuristic".to_string(),
            ..ExplainConfig::default()
        };
        assert!(matches!(
            Explainer::from_config(&config),
            Explainer::Heuristic
        ));
    }
}
