//! Locating the artifact files next to the installed binary.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const MODEL_FILE: &str = "price_optimization_model.bin";
pub const TRANSFORMER_FILE: &str = "poly_transformer.bin";

/// Resolved locations of both artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub transformer: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path, model_file: &str, transformer_file: &str) -> Self {
        Self {
            model: dir.join(model_file),
            transformer: dir.join(transformer_file),
        }
    }

    /// Default file names inside `dir`.
    pub fn default_in(dir: &Path) -> Self {
        Self::in_dir(dir, MODEL_FILE, TRANSFORMER_FILE)
    }
}

/// Where to look for artifacts before the directory has been resolved.
#[derive(Clone, Debug)]
pub struct ArtifactLocation {
    /// Explicit directory; `None` means the executable's own directory.
    pub dir: Option<PathBuf>,
    pub model_file: String,
    pub transformer_file: String,
}

impl Default for ArtifactLocation {
    fn default() -> Self {
        Self {
            dir: None,
            model_file: MODEL_FILE.to_string(),
            transformer_file: TRANSFORMER_FILE.to_string(),
        }
    }
}

impl ArtifactLocation {
    pub fn resolve(&self) -> Result<ArtifactPaths> {
        let dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => install_dir()?,
        };
        Ok(ArtifactPaths::in_dir(&dir, &self.model_file, &self.transformer_file))
    }
}

/// Directory containing the running executable, independent of the caller's cwd.
pub fn install_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine executable path")?;
    exe.parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("executable path {} has no parent directory", exe.display()))
}
