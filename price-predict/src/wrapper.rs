//! The inference wrapper: parse the request, load the artifacts, predict.
//!
//! Failures fall into two classes with distinct exit codes so a calling
//! process can tell a bad request from a broken installation:
//! input errors exit with 1, pipeline errors with 2.

use crate::artifact;
use crate::output::round_price;
use crate::paths::{ArtifactLocation, ArtifactPaths};
use anyhow::{bail, Context};
use price_model::{FeatureTransform, LinearRegression, PolynomialFeatures, PricePipeline, Regressor};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, info, warn};

pub type Pipeline = PricePipeline<PolynomialFeatures, LinearRegression>;

/// Exit status for malformed or missing input.
pub const EXIT_INPUT: u8 = 1;
/// Exit status for artifact loading or inference failures.
pub const EXIT_PIPELINE: u8 = 2;

#[derive(Error, Debug)]
pub enum WrapperError {
    #[error("Invalid input JSON: {0}")]
    Input(String),

    #[error("Prediction failed: {0:#}")]
    Pipeline(anyhow::Error),
}

impl WrapperError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Input(_) => EXIT_INPUT,
            Self::Pipeline(_) => EXIT_PIPELINE,
        }
    }

    /// Short label used in resident-mode responses.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Input(_) => "invalid input JSON",
            Self::Pipeline(_) => "prediction failed",
        }
    }

    /// Text written to stderr before exiting.
    ///
    /// Pipeline errors carry the whole cause chain (and a backtrace when
    /// `RUST_BACKTRACE` is set) ahead of the one-line summary.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Input(_) => self.to_string(),
            Self::Pipeline(err) => format!("{err:?}\n{self}"),
        }
    }
}

/// Parse the raw command-line argument as JSON.
pub fn parse_input(raw: Option<&str>) -> Result<Value, WrapperError> {
    let raw = raw.ok_or_else(|| WrapperError::Input("missing feature argument".to_string()))?;
    serde_json::from_str(raw).map_err(|e| WrapperError::Input(e.to_string()))
}

/// Flatten a parsed request into one feature row.
///
/// A bare number is a single feature. Arrays, nested or not, are flattened in
/// row-major order as long as they are rectangular and hold only numbers.
/// Nothing checks the width here; the transformer does.
pub fn feature_vector(value: &Value) -> anyhow::Result<Vec<f64>> {
    if !matches!(value, Value::Array(_) | Value::Number(_)) {
        bail!("expected an array of numbers, got {value}");
    }
    let dims = shape(value)?;
    let mut features = Vec::with_capacity(dims.iter().product());
    flatten(value, &mut features)?;
    Ok(features)
}

/// Dimensions of a rectangular nesting of arrays; a number has none.
fn shape(value: &Value) -> anyhow::Result<Vec<usize>> {
    match value {
        Value::Number(_) => Ok(Vec::new()),
        Value::Array(items) => {
            let inner = match items.first() {
                Some(first) => shape(first)?,
                None => Vec::new(),
            };
            for (i, item) in items.iter().enumerate().skip(1) {
                if shape(item)? != inner {
                    bail!("element {i} does not match the shape of element 0: {item}");
                }
            }
            let mut dims = vec![items.len()];
            dims.extend(inner);
            Ok(dims)
        }
        other => bail!("feature is not a number: {other}"),
    }
}

fn flatten(value: &Value, out: &mut Vec<f64>) -> anyhow::Result<()> {
    match value {
        Value::Array(items) => items.iter().try_for_each(|item| flatten(item, out)),
        Value::Number(n) => match n.as_f64() {
            Some(v) => {
                out.push(v);
                Ok(())
            }
            None => bail!("feature is not representable as f64: {n}"),
        },
        other => bail!("feature is not a number: {other}"),
    }
}

/// Load the model and then the transformer.
pub fn load_pipeline(paths: &ArtifactPaths) -> anyhow::Result<Pipeline> {
    let model: LinearRegression = artifact::open(&paths.model).context("loading regression model")?;
    let transformer: PolynomialFeatures =
        artifact::open(&paths.transformer).context("loading feature transformer")?;
    debug!(
        n_features_in = transformer.n_features_in(),
        n_expanded = transformer.n_features_out(),
        n_model_features = model.n_features(),
        "artifacts loaded"
    );
    Ok(PricePipeline::new(transformer, model))
}

/// Run one request through a loaded pipeline and round the result.
pub fn predict(pipeline: &Pipeline, request: &Value) -> anyhow::Result<f64> {
    let features = feature_vector(request)?;
    let value = pipeline
        .predict_one(&features)
        .with_context(|| format!("predicting from {} features", features.len()))?;
    debug!(raw = value, "prediction");
    Ok(round_price(value))
}

/// The one-shot flow: parse, resolve, load, predict.
///
/// Input is parsed before any artifact is touched, so a malformed request is
/// reported as an input error even when the artifacts are missing.
pub fn run_once(raw: Option<&str>, location: &ArtifactLocation) -> Result<f64, WrapperError> {
    let request = parse_input(raw)?;
    let pipeline_result = || -> anyhow::Result<f64> {
        let paths = location.resolve()?;
        debug!(model = %paths.model.display(), transformer = %paths.transformer.display(), "resolved artifacts");
        let pipeline = load_pipeline(&paths)?;
        predict(&pipeline, &request)
    };
    pipeline_result().map_err(WrapperError::Pipeline)
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum Response<'a> {
    Price { optimized_price: f64 },
    Failure { error: &'a str, details: String },
}

/// Counters reported when resident mode finishes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub requests: usize,
    pub failures: usize,
}

/// Resident mode: answer one JSON line per non-blank input line.
///
/// The pipeline stays loaded for the whole session; bad requests are
/// answered with an error object and do not end the loop.
pub fn serve<R: BufRead, W: Write>(pipeline: &Pipeline, input: R, mut output: W) -> io::Result<ServeStats> {
    let mut stats = ServeStats::default();
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.requests += 1;

        let result = parse_input(Some(line))
            .and_then(|request| predict(pipeline, &request).map_err(WrapperError::Pipeline));
        let response = match &result {
            Ok(price) => Response::Price { optimized_price: *price },
            Err(err) => {
                stats.failures += 1;
                warn!(error = %err, "request failed");
                let details = match err {
                    WrapperError::Input(msg) => msg.clone(),
                    WrapperError::Pipeline(inner) => format!("{inner:#}"),
                };
                Response::Failure { error: err.category(), details }
            }
        };
        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }
    info!(requests = stats.requests, failures = stats.failures, "input closed");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline() -> Pipeline {
        let poly = PolynomialFeatures::new(2, 1, true, false).unwrap();
        let model = LinearRegression::new(vec![0.0, 1.0, 1.0], 0.001).unwrap();
        PricePipeline::new(poly, model)
    }

    #[test]
    fn test_parse_input_classes() {
        assert!(parse_input(Some("[1, 2.5]")).is_ok());
        let err = parse_input(Some("not json")).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.to_string().starts_with("Invalid input JSON: "));
        assert_eq!(parse_input(None).unwrap_err().exit_code(), EXIT_INPUT);
    }

    #[test]
    fn test_feature_vector_shapes() {
        assert_eq!(feature_vector(&json!([1200, 3, 2.5])).unwrap(), vec![1200.0, 3.0, 2.5]);
        assert_eq!(feature_vector(&json!(7)).unwrap(), vec![7.0]);
        assert!(feature_vector(&json!([])).unwrap().is_empty());
        assert!(feature_vector(&json!(["a"])).is_err());
        assert!(feature_vector(&json!({"features": [1]})).is_err());
    }

    #[test]
    fn test_feature_vector_flattens_nested_rows() {
        assert_eq!(feature_vector(&json!([[1, 2]])).unwrap(), vec![1.0, 2.0]);
        assert_eq!(feature_vector(&json!([[1, 2], [3, 4]])).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(feature_vector(&json!([[[0.5], [1.5]]])).unwrap(), vec![0.5, 1.5]);
        assert!(feature_vector(&json!([[], []])).unwrap().is_empty());

        assert!(feature_vector(&json!([[1, 2], [3]])).is_err());
        assert!(feature_vector(&json!([1, [2]])).is_err());
        assert!(feature_vector(&json!([[1, "2"]])).is_err());
    }

    #[test]
    fn test_predict_rounds() {
        let p = pipeline();
        assert_eq!(predict(&p, &json!([1.111, 2.222])).unwrap(), 3.33);
        assert_eq!(predict(&p, &json!([[1, 2]])).unwrap(), 3.0);
    }

    #[test]
    fn test_pipeline_error_diagnostic() {
        let err = WrapperError::Pipeline(anyhow::anyhow!("shape").context("predicting"));
        assert_eq!(err.exit_code(), EXIT_PIPELINE);
        let text = err.diagnostic();
        assert!(text.contains("Caused by"), "{text}");
        assert!(text.ends_with("Prediction failed: predicting: shape"), "{text}");
    }

    #[test]
    fn test_serve_answers_every_line() {
        let p = pipeline();
        let input = b"[1, 2]\n\nnot json\n[1]\n[0.5, 0.25]\n";
        let mut out = Vec::new();
        let stats = serve(&p, &input[..], &mut out).unwrap();
        assert_eq!(stats, ServeStats { requests: 4, failures: 2 });

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], json!({"optimized_price": 3.0}));
        assert_eq!(lines[1]["error"], "invalid input JSON");
        assert_eq!(lines[2]["error"], "prediction failed");
        assert_eq!(lines[3], json!({"optimized_price": 0.75}));
    }
}
