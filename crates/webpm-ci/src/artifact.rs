//! Artifact declarations exposed to the pipeline executor.

use serde::{Deserialize, Serialize};

/// Glob include/ignore lists, relative to the project root.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileListing {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl FileListing {
    pub fn include<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: patterns.into_iter().map(Into::into).collect(),
            ignore: Vec::new(),
        }
    }
}

/// Named link displayed next to an artifact or a target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub url: String,
}

impl Link {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A build output the executor locates by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Stable external identifier.
    pub id: String,
    pub files: FileListing,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl ArtifactSpec {
    pub fn new(id: impl Into<String>, files: FileListing) -> Self {
        Self {
            id: id.into(),
            files,
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }
}

pub const DIST: &str = "dist";
pub const DOCS: &str = "docs";
pub const TEST_RESULT: &str = "test-result";
pub const TEST_COVERAGE: &str = "test-coverage";
pub const TEST_HTML_OUTPUTS: &str = "test-html-outputs";

/// Bundled output.
pub fn dist() -> ArtifactSpec {
    ArtifactSpec::new(DIST, FileListing::include(["dist/*", "src/**/*.ts", "package.json"]))
}

/// Generated API documentation.
pub fn docs() -> ArtifactSpec {
    ArtifactSpec::new(DOCS, FileListing::include(["dist/docs/**"]))
        .with_link(Link::new("documentation", "dist/docs/index.html"))
}

/// Junit-style test report.
pub fn test_result() -> ArtifactSpec {
    ArtifactSpec::new(TEST_RESULT, FileListing::include(["junit.xml"]))
}

/// Coverage report.
pub fn test_coverage() -> ArtifactSpec {
    ArtifactSpec::new(TEST_COVERAGE, FileListing::include(["coverage/**"]))
        .with_link(Link::new("Coverage", "coverage/lcov-report/index.html"))
}

/// HTML snapshots written by the test suite.
pub fn test_html_outputs() -> ArtifactSpec {
    ArtifactSpec::new(
        TEST_HTML_OUTPUTS,
        FileListing::include(["src/tests/.html-outputs/*"]),
    )
    .with_link(Link::new("HTML outputs", "src/tests/.html-outputs/index.html"))
}
