use crate::dataset::{Label, Sample};
use crate::model::{ModelError, UrlClassifier};
use serde::Serialize;

/// Every Nth sample goes to the holdout slice.
const HOLDOUT_EVERY: usize = 5;
/// Below this many samples the holdout evaluation is skipped entirely.
const MIN_SAMPLES_FOR_HOLDOUT: usize = 5;

/// Outcome summary for one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub total_samples: usize,
    pub benign: usize,
    pub malicious: usize,
    pub holdout_size: usize,
    /// None when the dataset was too small or too lopsided to evaluate.
    pub holdout_accuracy: Option<f64>,
}

/// Train on the full dataset, first measuring accuracy on a deterministic
/// ~20% holdout when the data allows it. The returned model is always
/// trained on every sample.
pub fn train_and_evaluate(samples: &[Sample]) -> Result<(UrlClassifier, TrainingReport), ModelError> {
    let benign = samples.iter().filter(|s| s.label == Label::Benign).count();
    let malicious = samples.len() - benign;
    log::info!(
        "training on {} samples ({} benign, {} malicious)",
        samples.len(),
        benign,
        malicious
    );

    let mut holdout_size = 0;
    let mut holdout_accuracy = None;

    if samples.len() >= MIN_SAMPLES_FOR_HOLDOUT {
        let (train_split, holdout): (Vec<&Sample>, Vec<&Sample>) = split_deterministic(samples);
        let train_has_both = train_split.iter().any(|s| s.label == Label::Benign)
            && train_split.iter().any(|s| s.label == Label::Malicious);

        if train_has_both && !holdout.is_empty() {
            let owned: Vec<Sample> = train_split.iter().map(|s| (*s).clone()).collect();
            let eval_model = UrlClassifier::train(&owned)?;
            let correct = holdout
                .iter()
                .filter(|s| {
                    eval_model
                        .predict(&s.url)
                        .map(|p| p.label == s.label)
                        .unwrap_or(false)
                })
                .count();
            let accuracy = correct as f64 / holdout.len() as f64;
            log::info!(
                "holdout accuracy: {:.2}% ({}/{})",
                accuracy * 100.0,
                correct,
                holdout.len()
            );
            holdout_size = holdout.len();
            holdout_accuracy = Some(accuracy);
        } else {
            log::warn!("holdout split would be single-class; skipping evaluation");
        }
    } else {
        log::warn!(
            "dataset too small for holdout evaluation ({} samples)",
            samples.len()
        );
    }

    // The served model always trains on the full data
    let model = UrlClassifier::train(samples)?;

    Ok((
        model,
        TrainingReport {
            total_samples: samples.len(),
            benign,
            malicious,
            holdout_size,
            holdout_accuracy,
        },
    ))
}

/// Every HOLDOUT_EVERY-th sample is held out; the rest train. Deterministic
/// so repeated runs on the same data report the same accuracy.
fn split_deterministic(samples: &[Sample]) -> (Vec<&Sample>, Vec<&Sample>) {
    let mut train = Vec::new();
    let mut holdout = Vec::new();
    for (index, sample) in samples.iter().enumerate() {
        if index % HOLDOUT_EVERY == 0 {
            holdout.push(sample);
        } else {
            train.push(sample);
        }
    }
    (train, holdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled_corpus() -> Vec<Sample> {
        vec![
            Sample::new("https://www.google.com/", Label::Benign),
            Sample::new("http://paypal.com.secure-update.info/verify", Label::Malicious),
            Sample::new("https://github.com/rust-lang/rust", Label::Benign),
            Sample::new("http://192.168.1.10/confirm", Label::Malicious),
            Sample::new("https://docs.rs/serde", Label::Benign),
            Sample::new("http://amazon-account-verify.net/login", Label::Malicious),
            Sample::new("https://crates.io/", Label::Benign),
            Sample::new("http://10.2.3.4/password-update", Label::Malicious),
            Sample::new("https://en.wikipedia.org/wiki/Rust", Label::Benign),
            Sample::new("http://microsoft.secure-login.xyz/invoice", Label::Malicious),
            Sample::new("https://news.ycombinator.com/", Label::Benign),
            Sample::new("http://bank-confirm.example.ru/@update", Label::Malicious),
        ]
    }

    #[test]
    fn test_split_is_deterministic() {
        let samples = labeled_corpus();
        let (train_a, holdout_a) = split_deterministic(&samples);
        let (train_b, holdout_b) = split_deterministic(&samples);
        assert_eq!(train_a.len(), train_b.len());
        assert_eq!(holdout_a.len(), holdout_b.len());
        assert_eq!(holdout_a.len(), 3); // indices 0, 5, 10
        assert_eq!(train_a.len(), 9);
    }

    #[test]
    fn test_report_counts_and_holdout() {
        let (_, report) = train_and_evaluate(&labeled_corpus()).unwrap();
        assert_eq!(report.total_samples, 12);
        assert_eq!(report.benign, 6);
        assert_eq!(report.malicious, 6);
        assert_eq!(report.holdout_size, 3);
        let accuracy = report.holdout_accuracy.unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn test_small_dataset_skips_holdout() {
        let samples = vec![
            Sample::new("https://www.google.com/", Label::Benign),
            Sample::new("http://192.168.1.10/confirm", Label::Malicious),
        ];
        let (_, report) = train_and_evaluate(&samples).unwrap();
        assert_eq!(report.holdout_size, 0);
        assert!(report.holdout_accuracy.is_none());
    }

    #[test]
    fn test_single_class_dataset_fails() {
        let samples = vec![
            Sample::new("https://a.com/", Label::Benign),
            Sample::new("https://b.com/", Label::Benign),
        ];
        assert!(train_and_evaluate(&samples).is_err());
    }
}
