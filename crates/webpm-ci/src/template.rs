//! Scaffold file materialization.
//!
//! Copies a fixed, ordered list of scaffold files from a template directory
//! into the project root. Contents are copied verbatim; generating the
//! template directory is done upstream.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{CiError, Result};
use crate::setup::is_project_relative;

/// Default template directory, relative to the project root.
pub const TEMPLATE_DIR: &str = ".w3nest/.template";

/// Scaffold files kept in sync for library packages.
pub const LIBRARY_FILES: &[&str] = &[
    "README.md",
    "package.json",
    ".gitignore",
    "jest.config.ts",
    "webpack.config.ts",
];

/// Scaffold files kept in sync for application packages.
pub const APPLICATION_FILES: &[&str] = &[
    "README.md",
    ".gitignore",
    ".npmignore",
    ".prettierignore",
    "package.json",
    "webpack.config.ts",
];

/// Copies named scaffold files from a template directory.
#[derive(Debug, Clone)]
pub struct TemplateMaterializer {
    template_dir: PathBuf,
    files: Vec<String>,
}

impl TemplateMaterializer {
    pub fn new<I, S>(template_dir: impl Into<PathBuf>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            template_dir: template_dir.into(),
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Copy every file, in list order, into `project_root`, overwriting.
    ///
    /// Stops at the first file absent from the template directory; files
    /// copied before it stay in place. Re-running is idempotent. Entries
    /// that would land outside `project_root` are rejected before any copy.
    pub fn materialize(&self, config: &PipelineConfig, project_root: &Path) -> Result<Vec<PathBuf>> {
        if let Some(file) = self.files.iter().find(|f| !is_project_relative(Path::new(f))) {
            return Err(CiError::InvalidSetup(format!(
                "template file must stay inside the project: {}",
                file
            )));
        }

        info!(
            project = %config.project().name,
            template = %self.template_dir.display(),
            files = self.files.len(),
            "Materializing scaffold files"
        );

        let mut written = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let src = self.template_dir.join(file);
            if !src.is_file() {
                return Err(CiError::TemplateFileMissing { file: file.clone() });
            }
            let dst = project_root.join(file);
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&src, &dst)?;
            debug!(file = %file, "Copied scaffold file");
            written.push(dst);
        }
        Ok(written)
    }
}
