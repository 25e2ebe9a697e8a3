//! Command-line arguments of the `predict` binary.

use crate::paths::{ArtifactLocation, MODEL_FILE, TRANSFORMER_FILE};
use clap::Parser;
use std::path::PathBuf;

/// Predict an optimized product price from a JSON feature vector.
#[derive(Parser, Debug)]
#[command(name = "predict", author, version, long_about = None)]
#[command(after_help = r#"Exit status:
    0  prediction printed to stdout
    1  feature argument missing or not valid JSON
    2  artifact loading or inference failed

Examples:
    predict '[100.0, 0.15, 4.5, 1200]'
    predict --artifact-dir /srv/models '[100.0, 0.15, 4.5, 1200]'
    printf '[100.0, 0.15, 4.5, 1200]\n' | predict --stdin"#)]
pub struct Cli {
    /// JSON array of numeric features, e.g. "[1200, 3, 2, 1]"
    #[arg(allow_hyphen_values = true)]
    pub features: Option<String>,

    /// Keep the artifacts loaded and answer one JSON array per stdin line
    #[arg(long, conflicts_with = "features")]
    pub stdin: bool,

    /// Directory holding the artifacts [default: directory of this executable]
    #[arg(long, env = "PRICE_ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// File name of the regression model artifact
    #[arg(long, env = "PRICE_MODEL_FILE", default_value = MODEL_FILE)]
    pub model_file: String,

    /// File name of the polynomial transformer artifact
    #[arg(long, env = "PRICE_TRANSFORMER_FILE", default_value = TRANSFORMER_FILE)]
    pub transformer_file: String,

    /// Log debug diagnostics to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn artifact_location(&self) -> ArtifactLocation {
        ArtifactLocation {
            dir: self.artifact_dir.clone(),
            model_file: self.model_file.clone(),
            transformer_file: self.transformer_file.clone(),
        }
    }
}
