//! Pipeline templates per project kind.
//!
//! [`PipelineFactory::get`] dispatches on [`ProjectKind`] and returns a fully
//! built [`PipelineConfig`]. It never runs build steps itself.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::artifact::{self, FileListing, Link};
use crate::config::{
    BrowserAppGraphics, PipelineConfig, PipelineConfigBuilder, PublishConfig, Target, TestConfig,
};
use crate::error::{CiError, Result};
use crate::executor::ExecutionContext;
use crate::setup::ProjectSetup;
use crate::step::{BuildStep, DefaultStep};

/// Options of a library package.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryOptions {
    /// Command chained after both build flows, e.g. copying a config file
    /// into `dist`.
    #[serde(default)]
    pub post_build: Option<String>,
}

/// Options of a browser application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserAppOptions {
    pub display_name: String,

    /// Icon file, relative to the project root.
    pub icon: PathBuf,

    #[serde(default = "standalone_default")]
    pub standalone: bool,
}

fn standalone_default() -> bool {
    true
}

/// Options of a documentation site.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocSiteOptions {
    #[serde(default)]
    pub dev_server_port: Option<u16>,
}

/// Project kinds with their kind-specific options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectKind {
    Library(LibraryOptions),
    BrowserApplication(BrowserAppOptions),
    DocumentationSite(DocSiteOptions),
}

impl ProjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProjectKind::Library(_) => "library",
            ProjectKind::BrowserApplication(_) => "browser_application",
            ProjectKind::DocumentationSite(_) => "documentation_site",
        }
    }
}

/// Where the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub project_root: PathBuf,
}

impl Environment {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }
}

/// Builds the pipeline config of one project.
#[derive(Debug, Clone)]
pub struct PipelineFactory {
    setup: ProjectSetup,
}

impl PipelineFactory {
    pub fn new(setup: ProjectSetup) -> Self {
        Self { setup }
    }

    pub fn setup(&self) -> &ProjectSetup {
        &self.setup
    }

    /// Assemble the config for the project kind.
    ///
    /// Browser applications read their icon from disk; a missing icon fails
    /// with [`CiError::AssetMissing`].
    pub fn get(&self, env: &Environment, context: &ExecutionContext) -> Result<PipelineConfig> {
        let setup = &self.setup;
        let builder = match &setup.kind {
            ProjectKind::Library(opts) => self.library(opts),
            ProjectKind::BrowserApplication(opts) => self.browser_app(opts, &env.project_root)?,
            ProjectKind::DocumentationSite(opts) => self.doc_site(opts),
        };
        let config = builder
            .overrides(setup.step_overrides.iter().cloned())
            .links(setup.links.clone())
            .in_package_json(setup.in_package_json.clone())
            .build()?;

        info!(
            run_id = %context.run_id,
            kind = setup.kind.name(),
            project = %config.project().name,
            steps = config.steps().len(),
            "Pipeline config assembled"
        );
        Ok(config)
    }

    fn base(&self, target: Target) -> PipelineConfigBuilder {
        PipelineConfigBuilder::new(
            self.setup.project.clone(),
            self.setup.dependencies.clone(),
            self.setup.bundles.clone(),
            target,
        )
    }

    fn library(&self, opts: &LibraryOptions) -> PipelineConfigBuilder {
        let target = Target::JsBundle {
            links: vec![
                Link::new("doc", "dist/docs/modules/MainModule.html"),
                Link::new("coverage", "coverage/lcov-report/index.html"),
                Link::new("bundle-analysis", "dist/bundle-analysis.html"),
            ],
        };
        let overrides: Vec<BuildStep> = match &opts.post_build {
            Some(cmd) => [DefaultStep::BuildDev, DefaultStep::BuildProd]
                .into_iter()
                .map(|step| BuildStep::new(step.id(), format!("{} && {}", step.command(), cmd)))
                .collect(),
            None => Vec::new(),
        };

        self.base(target)
            .artifacts([
                artifact::dist(),
                artifact::docs(),
                artifact::test_result(),
                artifact::test_coverage(),
                artifact::test_html_outputs(),
            ])
            .test(TestConfig {
                artifacts: ids(&[
                    artifact::TEST_RESULT,
                    artifact::TEST_COVERAGE,
                    artifact::TEST_HTML_OUTPUTS,
                ]),
                config_url: self.setup.test_config.clone(),
            })
            .publish(PublishConfig {
                packaged_artifacts: ids(&[
                    artifact::DIST,
                    artifact::DOCS,
                    artifact::TEST_COVERAGE,
                    artifact::TEST_HTML_OUTPUTS,
                ]),
                packaged_folders: Vec::new(),
            })
            .default_steps(default_steps(&[
                DefaultStep::Init,
                DefaultStep::BuildDev,
                DefaultStep::BuildProd,
                DefaultStep::Doc,
                DefaultStep::Test,
            ]))
            .overrides(overrides)
    }

    fn browser_app(&self, opts: &BrowserAppOptions, root: &Path) -> Result<PipelineConfigBuilder> {
        let mut app_icon = BTreeMap::new();
        app_icon.insert("tag".to_string(), "img".to_string());
        app_icon.insert("src".to_string(), icon_data_url(&root.join(&opts.icon))?);

        let target = Target::BrowserApp {
            display_name: opts.display_name.clone(),
            standalone: opts.standalone,
            graphics: BrowserAppGraphics {
                app_icon,
                file_icon: BTreeMap::new(),
            },
            links: vec![
                Link::new("doc", "dist/docs/index.html"),
                Link::new("coverage", "coverage/lcov-report/index.html"),
                Link::new("bundle-analysis", "dist/bundle-analysis.html"),
            ],
        };

        Ok(self
            .base(target)
            .artifacts([
                artifact::dist(),
                artifact::docs(),
                artifact::test_result(),
                artifact::test_coverage(),
            ])
            .test(TestConfig {
                artifacts: ids(&[artifact::TEST_RESULT, artifact::TEST_COVERAGE]),
                config_url: self.setup.test_config.clone(),
            })
            .publish(PublishConfig {
                packaged_artifacts: ids(&[artifact::DIST]),
                packaged_folders: ids(&["assets"]),
            })
            .default_steps(default_steps(&[
                DefaultStep::Init,
                DefaultStep::BuildDev,
                DefaultStep::BuildProd,
                DefaultStep::Doc,
                DefaultStep::Test,
            ])))
    }

    fn doc_site(&self, opts: &DocSiteOptions) -> PipelineConfigBuilder {
        let target = Target::DocSite {
            dev_server_port: opts.dev_server_port,
            distribution: FileListing::include(["assets/*", "README.md"]),
            icon: "/assets/favicon.svg".to_string(),
            readme: "/README.md".to_string(),
            license: self.setup.project.license.clone(),
            links: vec![Link::new("bundle-analysis", "dist/bundle-analysis.html")],
        };

        self.base(target)
            .artifacts([artifact::dist()])
            .publish(PublishConfig {
                packaged_artifacts: ids(&[artifact::DIST]),
                packaged_folders: ids(&["assets"]),
            })
            .default_steps(default_steps(&[
                DefaultStep::Init,
                DefaultStep::BuildProd,
                DefaultStep::Doc,
            ]))
    }
}

/// Read an image and encode it as a base64 `data:` URL.
pub fn icon_data_url(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(CiError::AssetMissing {
            path: path.to_path_buf(),
        });
    }
    let bytes = std::fs::read(path)?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    };
    Ok(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
}

fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_steps(steps: &[DefaultStep]) -> Vec<BuildStep> {
    steps.iter().copied().map(BuildStep::from_default).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_icon_data_url_svg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.svg");
        std::fs::write(&path, b"<svg/>").unwrap();
        let url = icon_data_url(&path).unwrap();
        assert_eq!(url, format!("data:image/svg+xml;base64,{}", BASE64.encode(b"<svg/>")));
    }

    #[test]
    fn test_icon_missing() {
        let dir = tempdir().unwrap();
        let err = icon_data_url(&dir.path().join("absent.svg")).unwrap_err();
        assert!(matches!(err, CiError::AssetMissing { .. }));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ProjectKind::Library(LibraryOptions::default()).name(), "library");
        assert_eq!(
            ProjectKind::DocumentationSite(DocSiteOptions::default()).name(),
            "documentation_site"
        );
    }
}
