//! Pipeline step definitions and override merging.

use serde::{Deserialize, Serialize};

/// Steps every pipeline template starts from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultStep {
    /// yarn
    Init,

    /// yarn build:dev
    BuildDev,

    /// yarn build:prod
    BuildProd,

    /// yarn doc
    Doc,

    /// yarn test-coverage
    Test,
}

impl DefaultStep {
    /// Step id as used by overrides.
    pub fn id(&self) -> &'static str {
        match self {
            DefaultStep::Init => "init",
            DefaultStep::BuildDev => "build-dev",
            DefaultStep::BuildProd => "build-prod",
            DefaultStep::Doc => "doc",
            DefaultStep::Test => "test",
        }
    }

    /// Shell command run by the step.
    pub fn command(&self) -> &'static str {
        match self {
            DefaultStep::Init => "yarn",
            DefaultStep::BuildDev => "yarn build:dev",
            DefaultStep::BuildProd => "yarn build:prod",
            DefaultStep::Doc => "yarn doc",
            DefaultStep::Test => "yarn test-coverage",
        }
    }
}

/// A named pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildStep {
    /// Identifier; an override with the same id replaces the default.
    pub id: String,

    /// Shell command line.
    pub run: String,

    /// Timeout in seconds, 0 for none.
    #[serde(default)]
    pub timeout_secs: u64,

    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl BuildStep {
    pub fn new(id: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            run: run.into(),
            timeout_secs: 0,
            enabled: true,
        }
    }

    pub fn from_default(step: DefaultStep) -> Self {
        Self::new(step.id(), step.command())
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Apply overrides to a step list.
///
/// An override whose id matches an existing step replaces it in place;
/// otherwise it is appended, keeping override order.
pub fn apply_overrides(defaults: Vec<BuildStep>, overrides: Vec<BuildStep>) -> Vec<BuildStep> {
    let mut steps = defaults;
    for step in overrides {
        match steps.iter_mut().find(|s| s.id == step.id) {
            Some(slot) => *slot = step,
            None => steps.push(step),
        }
    }
    steps
}
