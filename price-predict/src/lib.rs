//! Runtime side of the price model: artifact files, the `predict` wrapper
//! and its command line.

pub mod artifact;
pub mod cli;
pub mod export;
pub mod logging;
pub mod output;
pub mod paths;
pub mod wrapper;

pub use artifact::{Artifact, ArtifactError, ArtifactKind};
pub use paths::{ArtifactLocation, ArtifactPaths};
pub use wrapper::{Pipeline, WrapperError};
