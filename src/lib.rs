pub mod config;
pub mod dataset;
pub mod explain;
pub mod features;
pub mod model;
pub mod server;
pub mod trainer;

pub use config::Config;
pub use dataset::{Label, Sample};
pub use features::{extract_features, UrlFeatures, FEATURE_NAMES, FEATURE_SET_VERSION};
pub use model::{Prediction, UrlClassifier};
