//! Bundle layout: one main module plus ordered auxiliary modules.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path};

use crate::dependencies::DependencySpec;
use crate::error::{CiError, Result};

/// Name of the main module.
pub const MAIN_MODULE: &str = "";

/// One bundle entry point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpec {
    /// Module name; empty for the main module.
    #[serde(default)]
    pub name: String,

    /// Entry file, relative to the project source root.
    pub entry_file: String,

    /// Dependencies loaded alongside the module, in declaration order.
    #[serde(default)]
    pub load_dependencies: Vec<String>,

    /// Global aliases the module is exposed under (main module only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl ModuleSpec {
    /// Main module with the given entry file.
    pub fn main(entry_file: impl Into<String>) -> Self {
        Self {
            name: MAIN_MODULE.to_string(),
            entry_file: entry_file.into(),
            load_dependencies: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Auxiliary module.
    pub fn auxiliary(name: impl Into<String>, entry_file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_file: entry_file.into(),
            load_dependencies: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn with_load_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_main(&self) -> bool {
        self.name.is_empty()
    }

    fn display_name(&self) -> &str {
        if self.is_main() {
            "<main>"
        } else {
            &self.name
        }
    }
}

/// Validated bundle layout. Declaration order is the build order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BundleSpec {
    main: ModuleSpec,
    auxiliaries: Vec<ModuleSpec>,
}

impl BundleSpec {
    /// Validate entry paths, auxiliary names and load-dependency resolution.
    ///
    /// Every load dependency must name an external (or a sub-path of one) or
    /// another declared auxiliary module.
    pub fn new(
        main: ModuleSpec,
        auxiliaries: Vec<ModuleSpec>,
        dependencies: &DependencySpec,
    ) -> Result<Self> {
        if !main.is_main() {
            return Err(CiError::InvalidModuleSpec(format!(
                "main module must be unnamed, got '{}'",
                main.name
            )));
        }

        let mut names = HashSet::new();
        for module in &auxiliaries {
            if module.name.is_empty() {
                return Err(CiError::InvalidModuleSpec(
                    "auxiliary module name cannot be empty".to_string(),
                ));
            }
            if !names.insert(module.name.as_str()) {
                return Err(CiError::InvalidModuleSpec(format!(
                    "duplicate module name '{}'",
                    module.name
                )));
            }
        }

        for module in std::iter::once(&main).chain(&auxiliaries) {
            check_entry_path(module)?;
        }

        let bundle = Self { main, auxiliaries };
        bundle.check_resolution(dependencies)?;
        Ok(bundle)
    }

    /// Check every load dependency resolves against `dependencies` or a
    /// sibling auxiliary module.
    pub fn check_resolution(&self, dependencies: &DependencySpec) -> Result<()> {
        for module in self.modules() {
            for dep in &module.load_dependencies {
                let sibling = dep != &module.name
                    && self.auxiliaries.iter().any(|m| &m.name == dep);
                if !sibling && !dependencies.resolves_external(dep) {
                    return Err(CiError::UnresolvedModuleDependency {
                        module: module.display_name().to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn main(&self) -> &ModuleSpec {
        &self.main
    }

    pub fn auxiliaries(&self) -> &[ModuleSpec] {
        &self.auxiliaries
    }

    /// All modules, main first, then auxiliaries in declaration order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleSpec> {
        std::iter::once(&self.main).chain(self.auxiliaries.iter())
    }

    /// Check every entry file exists under `source_root`.
    pub fn verify_entry_files(&self, source_root: &Path) -> Result<()> {
        for module in self.modules() {
            let path = source_root.join(&module.entry_file);
            if !path.is_file() {
                return Err(CiError::EntryFileMissing {
                    module: module.display_name().to_string(),
                    path,
                });
            }
        }
        Ok(())
    }
}

fn check_entry_path(module: &ModuleSpec) -> Result<()> {
    let path = Path::new(&module.entry_file);
    if module.entry_file.trim().is_empty() {
        return Err(CiError::InvalidModuleSpec(format!(
            "module '{}' has an empty entry file",
            module.display_name()
        )));
    }
    if path.is_absolute() || path.components().any(|c| matches!(c, Component::Prefix(_))) {
        return Err(CiError::InvalidModuleSpec(format!(
            "entry file of module '{}' must be relative: {}",
            module.display_name(),
            module.entry_file
        )));
    }
    Ok(())
}
