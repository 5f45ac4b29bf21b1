//! Pipeline configuration and its validating builder.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

use crate::artifact::{ArtifactSpec, FileListing, Link};
use crate::bundle::BundleSpec;
use crate::dependencies::DependencySpec;
use crate::descriptor::ProjectDescriptor;
use crate::error::{CiError, Result};
use crate::step::{apply_overrides, BuildStep};

/// Graphics of a browser application, as tag/attribute maps.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BrowserAppGraphics {
    pub app_icon: BTreeMap<String, String>,
    pub file_icon: BTreeMap<String, String>,
}

/// What the pipeline produces.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// An ES module bundle consumed by other packages.
    JsBundle { links: Vec<Link> },

    /// An application started from the browser.
    BrowserApp {
        display_name: String,
        standalone: bool,
        graphics: BrowserAppGraphics,
        links: Vec<Link>,
    },

    /// A documentation site served as a web application.
    DocSite {
        dev_server_port: Option<u16>,
        distribution: FileListing,
        /// Site icon, absolute within the served package.
        icon: String,
        readme: String,
        license: Option<String>,
        links: Vec<Link>,
    },
}

impl Target {
    pub fn links(&self) -> &[Link] {
        match self {
            Target::JsBundle { links }
            | Target::BrowserApp { links, .. }
            | Target::DocSite { links, .. } => links,
        }
    }
}

/// Artifacts collected by the test step.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TestConfig {
    pub artifacts: Vec<String>,
    /// Location of the shared integration-test configuration.
    pub config_url: Option<String>,
}

/// What gets packaged on publish.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PublishConfig {
    pub packaged_artifacts: Vec<String>,
    pub packaged_folders: Vec<String>,
}

/// Extra entries merged into the generated `package.json`.
pub type PackageJsonEntries = serde_json::Map<String, serde_json::Value>;

/// Fully assembled, validated pipeline configuration.
///
/// Built once per invocation through [`PipelineConfigBuilder`] and handed by
/// value to an executor. Fields are read-only.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineConfig {
    project: ProjectDescriptor,
    dependencies: DependencySpec,
    bundles: BundleSpec,
    target: Target,
    artifacts: Vec<ArtifactSpec>,
    test: TestConfig,
    publish: PublishConfig,
    steps: Vec<BuildStep>,
    links: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    in_package_json: PackageJsonEntries,
}

impl PipelineConfig {
    pub fn project(&self) -> &ProjectDescriptor {
        &self.project
    }

    pub fn dependencies(&self) -> &DependencySpec {
        &self.dependencies
    }

    pub fn bundles(&self) -> &BundleSpec {
        &self.bundles
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn artifacts(&self) -> &[ArtifactSpec] {
        &self.artifacts
    }

    pub fn artifact(&self, id: &str) -> Option<&ArtifactSpec> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    pub fn test(&self) -> &TestConfig {
        &self.test
    }

    pub fn publish(&self) -> &PublishConfig {
        &self.publish
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&BuildStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Project-level links (documentation, home page).
    pub fn links(&self) -> &BTreeMap<String, String> {
        &self.links
    }

    pub fn in_package_json(&self) -> &PackageJsonEntries {
        &self.in_package_json
    }

    /// SHA-256 hex digest of the canonical JSON form.
    pub fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Aggregates validated parts into a [`PipelineConfig`]. Performs no I/O.
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    project: ProjectDescriptor,
    dependencies: DependencySpec,
    bundles: BundleSpec,
    target: Target,
    artifacts: Vec<ArtifactSpec>,
    test: TestConfig,
    publish: PublishConfig,
    default_steps: Vec<BuildStep>,
    overrides: Vec<BuildStep>,
    links: BTreeMap<String, String>,
    in_package_json: PackageJsonEntries,
}

impl PipelineConfigBuilder {
    pub fn new(
        project: ProjectDescriptor,
        dependencies: DependencySpec,
        bundles: BundleSpec,
        target: Target,
    ) -> Self {
        Self {
            project,
            dependencies,
            bundles,
            target,
            artifacts: Vec::new(),
            test: TestConfig::default(),
            publish: PublishConfig::default(),
            default_steps: Vec::new(),
            overrides: Vec::new(),
            links: BTreeMap::new(),
            in_package_json: PackageJsonEntries::new(),
        }
    }

    pub fn artifacts<I: IntoIterator<Item = ArtifactSpec>>(mut self, artifacts: I) -> Self {
        self.artifacts.extend(artifacts);
        self
    }

    pub fn test(mut self, test: TestConfig) -> Self {
        self.test = test;
        self
    }

    pub fn publish(mut self, publish: PublishConfig) -> Self {
        self.publish = publish;
        self
    }

    pub fn default_steps<I: IntoIterator<Item = BuildStep>>(mut self, steps: I) -> Self {
        self.default_steps = steps.into_iter().collect();
        self
    }

    /// Ordered overrides, applied on top of the default steps.
    pub fn overrides<I: IntoIterator<Item = BuildStep>>(mut self, steps: I) -> Self {
        self.overrides.extend(steps);
        self
    }

    pub fn links(mut self, links: BTreeMap<String, String>) -> Self {
        self.links = links;
        self
    }

    pub fn in_package_json(mut self, entries: PackageJsonEntries) -> Self {
        self.in_package_json = entries;
        self
    }

    /// Validate artifact references and module resolution, then assemble
    /// the config.
    pub fn build(self) -> Result<PipelineConfig> {
        self.bundles.check_resolution(&self.dependencies)?;

        let mut ids = HashSet::new();
        for artifact in &self.artifacts {
            if !ids.insert(artifact.id.as_str()) {
                return Err(CiError::DuplicateArtifact(artifact.id.clone()));
            }
        }
        let referenced = self
            .test
            .artifacts
            .iter()
            .chain(&self.publish.packaged_artifacts);
        for id in referenced {
            if !ids.contains(id.as_str()) {
                return Err(CiError::UnknownArtifact(id.clone()));
            }
        }

        Ok(PipelineConfig {
            steps: apply_overrides(self.default_steps, self.overrides),
            project: self.project,
            dependencies: self.dependencies,
            bundles: self.bundles,
            target: self.target,
            artifacts: self.artifacts,
            test: self.test,
            publish: self.publish,
            links: self.links,
            in_package_json: self.in_package_json,
        })
    }
}
