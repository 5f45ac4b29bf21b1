//! Error taxonomy for pipeline configuration assembly.
//!
//! Every variant is raised during the load/validate/assemble phase and aborts
//! the current invocation. Failures inside a pipeline executor are not part of
//! this enum; they travel as `anyhow::Error`.

use std::path::PathBuf;

/// Errors produced while loading, validating or materializing a pipeline config.
#[derive(Debug, thiserror::Error)]
pub enum CiError {
    #[error("manifest not found: {}", path.display())]
    ManifestMissing { path: PathBuf },

    #[error("malformed manifest {}: {reason}", path.display())]
    ManifestMalformed { path: PathBuf, reason: String },

    #[error("dependency '{name}' declared in more than one partition")]
    DependencyConflict { name: String },

    #[error("invalid version constraint for '{name}': {constraint}")]
    InvalidVersionConstraint { name: String, constraint: String },

    #[error("module '{module}' depends on unresolved '{dependency}'")]
    UnresolvedModuleDependency { module: String, dependency: String },

    #[error("invalid module spec: {0}")]
    InvalidModuleSpec(String),

    #[error("entry file of module '{module}' not found: {}", path.display())]
    EntryFileMissing { module: String, path: PathBuf },

    #[error("duplicate artifact id: {0}")]
    DuplicateArtifact(String),

    #[error("unknown artifact id: {0}")]
    UnknownArtifact(String),

    #[error("asset not found: {}", path.display())]
    AssetMissing { path: PathBuf },

    #[error("template file missing: {file}")]
    TemplateFileMissing { file: String },

    #[error("invalid setup file: {0}")]
    InvalidSetup(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("setup file parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, CiError>;
