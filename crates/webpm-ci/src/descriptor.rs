//! Project metadata loaded from `package.json`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{CiError, Result};

/// Static project metadata. Loaded once per invocation and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectDescriptor {
    /// Package name, unique per registry.
    pub name: String,

    /// Semantic version string.
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// `scripts` entries of the manifest.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,
}

impl ProjectDescriptor {
    /// Read and parse the manifest at `path`.
    ///
    /// `name` and `version` are required strings and `version` must be valid
    /// semver. `author` may be a string or an object with a `name` field.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CiError::ManifestMissing {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let descriptor = Self::parse(&content).map_err(|reason| CiError::ManifestMalformed {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!(name = %descriptor.name, version = %descriptor.version, "Loaded manifest");
        Ok(descriptor)
    }

    /// Parse manifest JSON text.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let json: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let obj = json
            .as_object()
            .ok_or_else(|| "manifest root must be an object".to_string())?;

        let name = required_str(obj, "name")?;
        let version = required_str(obj, "version")?;
        semver::Version::parse(&version)
            .map_err(|e| format!("version '{}' is not semver: {}", version, e))?;

        let author = match obj.get("author") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(person)) => person
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };

        let scripts = obj
            .get("scripts")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name,
            version,
            description: optional_str(obj, "description"),
            author,
            license: optional_str(obj, "license"),
            scripts,
        })
    }

    /// Same descriptor with its version replaced by the one of another manifest.
    pub fn with_version_of(mut self, other: &ProjectDescriptor) -> Self {
        self.version = other.version.clone();
        self
    }

    /// Version with any pre-release tag stripped (`0.2.0-wip` -> `0.2.0`).
    pub fn release_version(&self) -> String {
        match semver::Version::parse(&self.version) {
            Ok(v) => format!("{}.{}.{}", v.major, v.minor, v.patch),
            Err(_) => self.version.clone(),
        }
    }
}

fn required_str(obj: &serde_json::Map<String, Value>, key: &str) -> std::result::Result<String, String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(format!("field '{}' must not be empty", key)),
        Some(_) => Err(format!("field '{}' must be a string", key)),
        None => Err(format!("missing required field '{}'", key)),
    }
}

fn optional_str(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_minimal_manifest() {
        let d = ProjectDescriptor::parse(
            r#"{"name":"pkg","version":"1.0.0","description":"d","author":"a"}"#,
        )
        .unwrap();
        assert_eq!(d.name, "pkg");
        assert_eq!(d.version, "1.0.0");
        assert_eq!(d.description.as_deref(), Some("d"));
        assert_eq!(d.author.as_deref(), Some("a"));
        assert!(d.scripts.is_empty());
    }

    #[test]
    fn test_author_object_form() {
        let d = ProjectDescriptor::parse(
            r#"{"name":"pkg","version":"0.1.0","author":{"name":"greinisch","email":"x@y.z"}}"#,
        )
        .unwrap();
        assert_eq!(d.author.as_deref(), Some("greinisch"));
    }

    #[test]
    fn test_missing_version_rejected() {
        let err = ProjectDescriptor::parse(r#"{"name":"pkg"}"#).unwrap_err();
        assert!(err.contains("version"));
    }

    #[test]
    fn test_non_string_name_rejected() {
        let err = ProjectDescriptor::parse(r#"{"name":3,"version":"1.0.0"}"#).unwrap_err();
        assert!(err.contains("name"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = ProjectDescriptor::load(&dir.path().join("package.json")).unwrap_err();
        assert!(matches!(err, CiError::ManifestMissing { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, r#"{"name":"pkg","version":"not-a-version"}"#).unwrap();
        let err = ProjectDescriptor::load(&path).unwrap_err();
        assert!(matches!(err, CiError::ManifestMalformed { .. }));
    }

    #[test]
    fn test_serde_roundtrip_keeps_identity_fields() {
        let d = ProjectDescriptor::parse(
            r#"{"name":"@w3nest/webpm-client","version":"0.2.0-wip","description":"d","author":"a","license":"MIT","scripts":{"doc":"npx tsx .w3nest/doc.ts"}}"#,
        )
        .unwrap();
        let json = serde_json::to_string(&d).unwrap();
        let back = ProjectDescriptor::parse(&json).unwrap();
        assert_eq!(d, back);
    }

    #[test]
    fn test_release_version_strips_prerelease() {
        let d = ProjectDescriptor::parse(r#"{"name":"pkg","version":"0.2.0-wip"}"#).unwrap();
        assert_eq!(d.release_version(), "0.2.0");
    }
}
