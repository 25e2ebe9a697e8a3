//! Two-stage transform-then-predict pipeline.

use crate::error::{ModelError, Result};
use crate::model::{FeatureTransform, Regressor};
use ndarray::{Array1, Axis};
use tracing::debug;

/// Pairs a pre-fitted transformer with the regressor fitted on its output.
pub struct PricePipeline<T, R> {
    transformer: T,
    model: R,
}

impl<T: FeatureTransform, R: Regressor> PricePipeline<T, R> {
    pub fn new(transformer: T, model: R) -> Self {
        Self { transformer, model }
    }

    pub fn transformer(&self) -> &T {
        &self.transformer
    }

    pub fn model(&self) -> &R {
        &self.model
    }

    /// Predict a single scalar for one feature vector.
    ///
    /// The vector is reshaped into a one-row matrix and handed to the
    /// transformer as-is; a width mismatch is reported by the transformer.
    pub fn predict_one(&self, features: &[f64]) -> Result<f64> {
        let row = Array1::from(features.to_vec()).insert_axis(Axis(0));
        let expanded = self.transformer.transform(&row)?;
        debug!(
            n_in = features.len(),
            n_out = expanded.ncols(),
            "expanded feature row"
        );

        let predictions = self.model.predict(&expanded)?;
        let value = match predictions.get(0) {
            Some(&v) => v,
            None => return Err(ModelError::shape("1 prediction", "0")),
        };
        if !value.is_finite() {
            return Err(ModelError::NonFinite(format!("prediction evaluated to {value}")));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinearRegression, PolynomialFeatures};

    fn pipeline() -> PricePipeline<PolynomialFeatures, LinearRegression> {
        let poly = PolynomialFeatures::new(2, 2, true, false).unwrap();
        // 1, a, b, a^2, ab, b^2
        let model = LinearRegression::new(vec![0.0, 1.0, 1.0, 0.5, 0.0, 0.0], 3.0).unwrap();
        PricePipeline::new(poly, model)
    }

    #[test]
    fn test_predict_one() {
        let p = pipeline();
        // 3 + 2 + 4 + 0.5 * 4
        assert_eq!(p.predict_one(&[2.0, 4.0]).unwrap(), 11.0);
    }

    #[test]
    fn test_predict_one_is_deterministic() {
        let p = pipeline();
        let a = p.predict_one(&[1.25, -7.5]).unwrap();
        let b = p.predict_one(&[1.25, -7.5]).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_empty_and_wrong_width_fail_in_transform() {
        let p = pipeline();
        assert!(matches!(p.predict_one(&[]), Err(ModelError::ShapeMismatch { .. })));
        assert!(matches!(p.predict_one(&[1.0, 2.0, 3.0]), Err(ModelError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_model_width_mismatch_surfaces_at_predict() {
        let poly = PolynomialFeatures::new(2, 2, true, false).unwrap();
        let model = LinearRegression::new(vec![1.0, 1.0], 0.0).unwrap();
        let p = PricePipeline::new(poly, model);
        assert!(p.predict_one(&[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_overflow_is_non_finite() {
        let p = pipeline();
        let err = p.predict_one(&[f64::MAX, 1.0]).unwrap_err();
        assert!(matches!(err, ModelError::NonFinite(_)));
    }
}
