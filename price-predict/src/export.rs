//! Writing artifacts from already-fitted parameters.

use crate::artifact;
use crate::paths::ArtifactPaths;
use anyhow::{ensure, Context, Result};
use price_model::{FeatureTransform, LinearRegression, PolynomialFeatures};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Parameters of the fitted transformer and model, as produced by training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportParams {
    pub transformer: TransformerParams,
    pub model: ModelParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerParams {
    pub n_features_in: usize,
    pub degree: usize,
    #[serde(default = "default_include_bias")]
    pub include_bias: bool,
    #[serde(default)]
    pub interaction_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(default)]
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

fn default_include_bias() -> bool {
    true
}

impl ExportParams {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading parameters from {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Build both objects, checking the model consumes exactly the transformer's output.
    pub fn build(&self) -> Result<(PolynomialFeatures, LinearRegression)> {
        let t = &self.transformer;
        let poly = PolynomialFeatures::new(t.n_features_in, t.degree, t.include_bias, t.interaction_only)
            .context("invalid transformer parameters")?;
        let model = LinearRegression::new(self.model.coefficients.clone(), self.model.intercept)
            .context("invalid model parameters")?;
        ensure!(
            self.model.coefficients.len() == poly.n_features_out(),
            "model has {} coefficients but the transformer produces {} features",
            self.model.coefficients.len(),
            poly.n_features_out()
        );
        debug!(columns = ?poly.feature_names(), "expanded feature columns");
        Ok((poly, model))
    }

    /// Write both artifacts under `dir` with the default file names.
    pub fn write(&self, dir: &Path) -> Result<ArtifactPaths> {
        let (poly, model) = self.build()?;
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let paths = ArtifactPaths::default_in(dir);
        artifact::save(&model, &paths.model)?;
        artifact::save(&poly, &paths.transformer)?;
        info!(dir = %dir.display(), "artifacts written");
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let params: ExportParams = serde_json::from_str(
            r#"{"transformer": {"n_features_in": 2, "degree": 2},
                "model": {"coefficients": [0, 1, 1, 0, 0, 0]}}"#,
        )
        .unwrap();
        assert!(params.transformer.include_bias);
        assert!(!params.transformer.interaction_only);
        assert_eq!(params.model.intercept, 0.0);
        assert!(params.build().is_ok());
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let params = ExportParams {
            transformer: TransformerParams {
                n_features_in: 4,
                degree: 2,
                include_bias: true,
                interaction_only: false,
            },
            model: ModelParams { intercept: 1.0, coefficients: vec![1.0; 14] },
        };
        let err = params.build().unwrap_err();
        assert!(err.to_string().contains("produces 15 features"), "{err}");
    }
}
