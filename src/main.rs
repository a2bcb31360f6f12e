use clap::{Arg, Command};
use log::LevelFilter;
use phishguard::config::Config;
use phishguard::dataset;
use phishguard::explain::Explainer;
use phishguard::features::extract_features;
use phishguard::model::UrlClassifier;
use phishguard::{server, trainer};
use std::path::{Path, PathBuf};
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("phishguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Phishing URL detection service with lexical features and a random forest")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/phishguard.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate configuration and print the effective settings")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("train")
                .long("train")
                .help("Train a model from --data files and save it to the model path")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("data")
                .long("data")
                .value_name("FILE")
                .help("CSV dataset of URLs with optional labels (repeatable)")
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("model-path")
                .long("model-path")
                .value_name("FILE")
                .help("Override the configured model path")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("predict")
                .long("predict")
                .value_name("URL")
                .help("Classify one URL and print the prediction as JSON")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("explain")
                .long("explain")
                .value_name("URL")
                .help("Classify one URL and print an explanation")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("features")
                .long("features")
                .value_name("URL")
                .help("Print the named features and the classifier vector for one URL")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match Config::default().to_file(generate_path) {
            Ok(()) => println!("Default configuration written to {generate_path}"),
            Err(e) => {
                eprintln!("Error writing configuration: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match Config::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    let mut builder = env_logger::Builder::from_default_env();
    if matches.get_flag("verbose") {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder.parse_filters(&config.logging.level);
    }
    builder.init();

    if Path::new(config_path).exists() {
        log::info!("configuration loaded from {config_path}");
    } else {
        log::info!("no config file at {config_path}, using built-in defaults");
    }

    if matches.get_flag("test-config") {
        match serde_yaml::to_string(&config) {
            Ok(yaml) => {
                println!("Effective configuration:\n{yaml}");
                if Path::new(&config.model.path).exists() {
                    println!("Model file present at {}", config.model.path);
                } else {
                    println!("No model file at {} (run --train)", config.model.path);
                }
            }
            Err(e) => {
                eprintln!("Configuration is not serializable: {e}");
                process::exit(1);
            }
        }
        return;
    }

    if let Some(text) = matches.get_one::<String>("features") {
        let features = extract_features(text);
        let vector = features.to_vector();
        let output = serde_json::json!({
            "features": features,
            "vector": vector,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        return;
    }

    let model_path = matches
        .get_one::<String>("model-path")
        .cloned()
        .unwrap_or_else(|| config.model.path.clone());

    if matches.get_flag("train") {
        let data_paths: Vec<PathBuf> = matches
            .get_many::<String>("data")
            .map(|values| values.map(PathBuf::from).collect())
            .unwrap_or_default();
        if data_paths.is_empty() {
            eprintln!("--train requires at least one --data FILE");
            process::exit(1);
        }

        let samples = match dataset::load_and_merge(&data_paths) {
            Ok(samples) => samples,
            Err(e) => {
                eprintln!("Failed to load training data: {e}");
                process::exit(1);
            }
        };

        match trainer::train_and_evaluate(&samples) {
            Ok((model, report)) => {
                if let Err(e) = model.save(Path::new(&model_path)) {
                    eprintln!("Failed to save model: {e}");
                    process::exit(1);
                }
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).unwrap_or_default()
                );
            }
            Err(e) => {
                eprintln!("Training failed: {e}");
                process::exit(1);
            }
        }
        return;
    }

    if let Some(text) = matches.get_one::<String>("predict") {
        let model = load_model_or_exit(&model_path);
        match model.predict(text) {
            Ok(prediction) => println!(
                "{}",
                serde_json::to_string_pretty(&prediction).unwrap_or_default()
            ),
            Err(e) => {
                eprintln!("Prediction failed: {e}");
                process::exit(1);
            }
        }
        return;
    }

    if let Some(text) = matches.get_one::<String>("explain") {
        let model = load_model_or_exit(&model_path);
        match model.predict(text) {
            Ok(prediction) => {
                let explainer = Explainer::from_config(&config.explain);
                let explanation = explainer
                    .explain(text, prediction.label, prediction.confidence)
                    .await;
                println!("{explanation}");
            }
            Err(e) => {
                eprintln!("Prediction failed: {e}");
                process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = server::run(&config).await {
        log::error!("server error: {e}");
        process::exit(1);
    }
}

fn load_model_or_exit(model_path: &str) -> UrlClassifier {
    match UrlClassifier::load(Path::new(model_path)) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
