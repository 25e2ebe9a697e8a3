//! Library crate exposing the pre-fitted price model components.
//!
//! A prediction is a two-stage pipeline: a polynomial feature expansion
//! followed by a linear regressor. Both stages are loaded already fitted and
//! never change after construction.

pub mod error;
pub mod model;
pub mod pipeline;

pub use error::{ModelError, Result};
pub use model::{FeatureTransform, LinearRegression, PolynomialFeatures, Regressor};
pub use pipeline::PricePipeline;
