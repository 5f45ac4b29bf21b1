//! Project setup file (`.w3nest/setup.toml`).
//!
//! Holds the project-specific literals: project kind, dependency partitions,
//! bundle modules, links and step overrides. [`ProjectSetup::load`] reads the
//! manifest and the setup file once and validates everything.
//!
//! ```toml
//! version_from = "../package.json"
//! test_config = "https://github.com/youwol/integration-tests-conf"
//!
//! [project]
//! kind = "library"
//!
//! [links]
//! Documentation = "https://w3nest.org/apps/@webpm-client/doc/{version}"
//!
//! [dependencies.externals]
//! rxjs = "^7.5.6"
//!
//! [bundles.main]
//! entry_file = "./index.ts"
//! aliases = ["webpm"]
//!
//! [[bundles.auxiliary]]
//! name = "workersPool"
//! entry_file = "./lib/workers-pool/index.ts"
//! load_dependencies = ["rxjs"]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::bundle::{BundleSpec, ModuleSpec};
use crate::config::PackageJsonEntries;
use crate::dependencies::{DependencyMap, DependencySpec};
use crate::descriptor::ProjectDescriptor;
use crate::error::{CiError, Result};
use crate::factory::ProjectKind;
use crate::step::BuildStep;
use crate::template::{APPLICATION_FILES, LIBRARY_FILES, TEMPLATE_DIR};

/// Manifest file name.
pub const MANIFEST_FILE: &str = "package.json";

/// Setup file, relative to the project root.
pub const SETUP_FILE: &str = ".w3nest/setup.toml";

/// Entry files are resolved against this directory.
pub const SOURCE_DIR: &str = "src";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SetupFile {
    project: ProjectKind,
    #[serde(default)]
    version_from: Option<PathBuf>,
    #[serde(default)]
    test_config: Option<String>,
    #[serde(default)]
    links: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: DependencySection,
    bundles: BundleSection,
    #[serde(default)]
    steps: Vec<BuildStep>,
    #[serde(default)]
    template_files: Option<Vec<String>>,
    #[serde(default)]
    in_package_json: PackageJsonEntries,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DependencySection {
    #[serde(default)]
    externals: DependencyMap,
    #[serde(default)]
    included_in_bundle: DependencyMap,
    #[serde(default)]
    dev_time: DependencyMap,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleSection {
    main: ModuleSpec,
    #[serde(default)]
    auxiliary: Vec<ModuleSpec>,
}

/// Validated project inputs, ready for a [`crate::PipelineFactory`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSetup {
    pub kind: ProjectKind,
    pub project: ProjectDescriptor,
    pub dependencies: DependencySpec,
    pub bundles: BundleSpec,
    pub links: BTreeMap<String, String>,
    pub test_config: Option<String>,
    pub step_overrides: Vec<BuildStep>,
    pub template_files: Vec<String>,
    /// Extra entries merged into the generated `package.json`.
    pub in_package_json: PackageJsonEntries,
}

impl ProjectSetup {
    /// Load `package.json` and `.w3nest/setup.toml` from `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let project = ProjectDescriptor::load(&root.join(MANIFEST_FILE))?;
        let setup_path = root.join(SETUP_FILE);
        if !setup_path.is_file() {
            return Err(CiError::InvalidSetup(format!(
                "{} not found",
                setup_path.display()
            )));
        }
        let content = std::fs::read_to_string(&setup_path)?;
        let setup = Self::parse(project, &content, root)?;
        info!(
            project = %setup.project.name,
            version = %setup.project.version,
            kind = setup.kind.name(),
            modules = setup.bundles.modules().count(),
            "Loaded project setup"
        );
        Ok(setup)
    }

    /// Validate setup file content against an already loaded manifest.
    ///
    /// `root` anchors `version_from`.
    pub fn parse(project: ProjectDescriptor, content: &str, root: &Path) -> Result<Self> {
        let file: SetupFile = toml::from_str(content)?;

        let project = match &file.version_from {
            Some(rel) => {
                let other = ProjectDescriptor::load(&root.join(rel))?;
                debug!(from = %rel.display(), version = %other.version, "Version taken from other manifest");
                project.with_version_of(&other)
            }
            None => project,
        };

        let vars = [
            ("{version}", project.version.clone()),
            ("{release_version}", project.release_version()),
        ];
        let expand = |map: DependencyMap| -> DependencyMap {
            map.into_iter()
                .map(|(k, v)| (k, interpolate(&v, &vars)))
                .collect()
        };

        let dependencies = DependencySpec::new(
            expand(file.dependencies.externals),
            expand(file.dependencies.included_in_bundle),
            expand(file.dependencies.dev_time),
        )?;
        let bundles = BundleSpec::new(file.bundles.main, file.bundles.auxiliary, &dependencies)?;
        let links = file
            .links
            .into_iter()
            .map(|(k, v)| (k, interpolate(&v, &vars)))
            .collect();

        let defaults = match file.project {
            ProjectKind::Library(_) => LIBRARY_FILES,
            _ => APPLICATION_FILES,
        };
        let template_files = file
            .template_files
            .unwrap_or_else(|| defaults.iter().map(|s| s.to_string()).collect());
        check_template_files(&template_files)?;

        Ok(Self {
            kind: file.project,
            project,
            dependencies,
            bundles,
            links,
            test_config: file.test_config,
            step_overrides: file.steps,
            template_files,
            in_package_json: file.in_package_json,
        })
    }

    /// Default template directory of a project rooted at `root`.
    pub fn template_dir(root: &Path) -> PathBuf {
        root.join(TEMPLATE_DIR)
    }

    /// Check entry files exist under `<root>/src`.
    pub fn verify_sources(&self, root: &Path) -> Result<()> {
        self.bundles.verify_entry_files(&root.join(SOURCE_DIR))
    }
}

fn check_template_files(files: &[String]) -> Result<()> {
    for file in files {
        if !is_project_relative(Path::new(file)) {
            return Err(CiError::InvalidSetup(format!(
                "template file must stay inside the project: {}",
                file
            )));
        }
    }
    Ok(())
}

/// Relative path without `..` components.
pub(crate) fn is_project_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn interpolate(value: &str, vars: &[(&str, String)]) -> String {
    vars.iter()
        .fold(value.to_string(), |acc, (key, val)| acc.replace(*key, val))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::LibraryOptions;

    fn descriptor(version: &str) -> ProjectDescriptor {
        ProjectDescriptor::parse(&format!(
            r#"{{"name":"@w3nest/webpm-client","version":"{}","description":"d","author":"a"}}"#,
            version
        ))
        .unwrap()
    }

    const LIBRARY_SETUP: &str = r#"
test_config = "https://github.com/youwol/integration-tests-conf"

[project]
kind = "library"
post_build = "cp ./yw-backend.config.json ./dist/config.json"

[links]
Documentation = "https://w3nest.org/apps/@webpm-client/doc/{version}"
W3Nest = "https://w3nest.org"

[dependencies.externals]
rxjs = "^7.5.6"
"@w3nest/http-clients" = "^0.1.5"
rx-vdom = "^0.1.3"

[dependencies.included_in_bundle]
semver = "^7.3.4"

[dependencies.dev_time]
brotli = "^1.3.2"

[bundles.main]
entry_file = "./index.ts"
aliases = ["webpm"]

[[bundles.auxiliary]]
name = "workersPool"
entry_file = "./lib/workers-pool/index.ts"
load_dependencies = ["rxjs"]

[[bundles.auxiliary]]
name = "views"
entry_file = "./lib/views/index.ts"
load_dependencies = ["rxjs", "rx-vdom"]
"#;

    #[test]
    fn test_parse_library_setup() {
        let setup = ProjectSetup::parse(descriptor("0.2.0"), LIBRARY_SETUP, Path::new(".")).unwrap();
        assert_eq!(
            setup.kind,
            ProjectKind::Library(LibraryOptions {
                post_build: Some("cp ./yw-backend.config.json ./dist/config.json".to_string()),
            })
        );
        assert_eq!(setup.dependencies.externals().len(), 3);
        assert_eq!(setup.bundles.main().aliases, vec!["webpm"]);
        assert_eq!(setup.bundles.auxiliaries().len(), 2);
        assert_eq!(
            setup.links["Documentation"],
            "https://w3nest.org/apps/@webpm-client/doc/0.2.0"
        );
        assert_eq!(setup.template_files.len(), LIBRARY_FILES.len());
        assert!(setup.step_overrides.is_empty());
    }

    #[test]
    fn test_parse_rejects_conflicting_partitions() {
        let content = LIBRARY_SETUP.replace("brotli = \"^1.3.2\"", "rxjs = \"^7.0.0\"");
        let err = ProjectSetup::parse(descriptor("0.2.0"), &content, Path::new(".")).unwrap_err();
        assert!(matches!(err, CiError::DependencyConflict { name } if name == "rxjs"));
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let content = LIBRARY_SETUP.replace("kind = \"library\"", "kind = \"backend\"");
        let err = ProjectSetup::parse(descriptor("0.2.0"), &content, Path::new(".")).unwrap_err();
        assert!(matches!(err, CiError::Toml(_)));
    }

    #[test]
    fn test_version_from_and_release_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name":"@w3nest/webpm-client","version":"0.3.0-wip"}"#,
        )
        .unwrap();
        let doc_root = dir.path().join("doc");
        std::fs::create_dir_all(&doc_root).unwrap();

        let content = r#"
version_from = "../package.json"

[project]
kind = "documentation_site"
dev_server_port = 3029

[dependencies.externals]
"@w3nest/webpm-client" = "^{release_version}"
"@w3nest/ui-tk" = "^0.1.5"

[bundles.main]
entry_file = "app/main.ts"
load_dependencies = ["@w3nest/webpm-client", "@w3nest/ui-tk/Badges"]
"#;
        let setup = ProjectSetup::parse(descriptor("0.0.1"), content, &doc_root).unwrap();
        assert_eq!(setup.project.version, "0.3.0-wip");
        assert_eq!(setup.dependencies.externals()["@w3nest/webpm-client"], "^0.3.0");
        assert_eq!(setup.template_files.len(), APPLICATION_FILES.len());
    }

    #[test]
    fn test_in_package_json_entries() {
        let content = format!(
            "{}\n[in_package_json.scripts]\ndoc = \"npx tsx .w3nest/doc.ts\"\n",
            LIBRARY_SETUP
        );
        let setup = ProjectSetup::parse(descriptor("0.2.0"), &content, Path::new(".")).unwrap();
        assert_eq!(setup.in_package_json["scripts"]["doc"], "npx tsx .w3nest/doc.ts");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let content = LIBRARY_SETUP.replace(
            "load_dependencies = [\"rxjs\", \"rx-vdom\"]",
            "load_dependancies = [\"y\"]",
        );
        assert_ne!(content, LIBRARY_SETUP);
        let err = ProjectSetup::parse(descriptor("0.2.0"), &content, Path::new(".")).unwrap_err();
        assert!(matches!(err, CiError::Toml(_)));

        let content = format!("{}\n[dependencies.peer]\nfoo = \"^1.0.0\"\n", LIBRARY_SETUP);
        let err = ProjectSetup::parse(descriptor("0.2.0"), &content, Path::new(".")).unwrap_err();
        assert!(matches!(err, CiError::Toml(_)));
    }

    #[test]
    fn test_template_files_must_stay_in_project() {
        for entry in ["../escaped.txt", "/etc/passwd", "a/../../b"] {
            let content = format!("template_files = [\"{}\"]\n{}", entry, LIBRARY_SETUP);
            let err = ProjectSetup::parse(descriptor("0.2.0"), &content, Path::new(".")).unwrap_err();
            assert!(matches!(err, CiError::InvalidSetup(_)), "{entry} accepted");
        }
    }

    #[test]
    fn test_load_requires_setup_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"name":"pkg","version":"1.0.0"}"#)
            .unwrap();
        let err = ProjectSetup::load(dir.path()).unwrap_err();
        assert!(matches!(err, CiError::InvalidSetup(_)));
    }
}
