//! Runtime and development dependency partitions.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{CiError, Result};

/// Package name -> npm version range.
pub type DependencyMap = BTreeMap<String, String>;

/// Dependencies split into three disjoint partitions.
///
/// A package name appears in at most one of `externals`,
/// `included_in_bundle` and `dev_time`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DependencySpec {
    externals: DependencyMap,
    included_in_bundle: DependencyMap,
    dev_time: DependencyMap,
}

impl DependencySpec {
    /// Validate and build the partitions.
    pub fn new(
        externals: DependencyMap,
        included_in_bundle: DependencyMap,
        dev_time: DependencyMap,
    ) -> Result<Self> {
        for partition in [&externals, &included_in_bundle, &dev_time] {
            for (name, constraint) in partition {
                if !is_npm_range(constraint) {
                    return Err(CiError::InvalidVersionConstraint {
                        name: name.clone(),
                        constraint: constraint.clone(),
                    });
                }
            }
        }

        let partitions = [&externals, &included_in_bundle, &dev_time];
        for (i, partition) in partitions.iter().enumerate() {
            for name in partition.keys() {
                if partitions[i + 1..].iter().any(|other| other.contains_key(name)) {
                    return Err(CiError::DependencyConflict { name: name.clone() });
                }
            }
        }

        Ok(Self {
            externals,
            included_in_bundle,
            dev_time,
        })
    }

    /// Dependencies supplied by consumers at runtime.
    pub fn externals(&self) -> &DependencyMap {
        &self.externals
    }

    /// Dependencies vendored into the bundle.
    pub fn included_in_bundle(&self) -> &DependencyMap {
        &self.included_in_bundle
    }

    /// Build/test-only dependencies.
    pub fn dev_time(&self) -> &DependencyMap {
        &self.dev_time
    }

    /// Whether `name` (or the package it is a sub-path of) is an external.
    ///
    /// `@w3nest/ui-tk/Badges` resolves against `@w3nest/ui-tk`,
    /// `rxjs/operators` against `rxjs`.
    pub fn resolves_external(&self, name: &str) -> bool {
        self.externals.contains_key(name) || self.externals.contains_key(package_name(name))
    }
}

/// Whether `range` is a usable npm version range.
///
/// Accepts `||` unions, space-separated comparator sets (`>=1.2.0 <2.0.0`),
/// hyphen ranges (`1.2.3 - 2.3.4`), wildcards and dist tags (`latest`).
/// Individual comparators are checked with [`semver::Comparator`].
pub fn is_npm_range(range: &str) -> bool {
    !range.trim().is_empty() && range.split("||").all(|alt| is_range_set(alt.trim()))
}

fn is_range_set(set: &str) -> bool {
    if set.is_empty() {
        return false;
    }
    if let Some((low, high)) = set.split_once(" - ") {
        return is_comparator(low.trim()) && is_comparator(high.trim());
    }
    if is_dist_tag(set) {
        return true;
    }

    let mut pending_op = String::new();
    for token in set.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        let comparator = format!("{}{}", pending_op, token);
        pending_op.clear();
        if !is_comparator(&comparator) {
            return false;
        }
    }
    pending_op.is_empty()
}

fn is_comparator(text: &str) -> bool {
    let bare = text.trim_start_matches(|c| matches!(c, '<' | '>' | '=' | '~' | '^'));
    matches!(bare, "*" | "x" | "X")
        || semver::Comparator::parse(text.trim_start_matches('v')).is_ok()
}

fn is_dist_tag(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic())
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// Package part of an import path, accounting for `@scope/` prefixes.
pub fn package_name(import: &str) -> &str {
    let segments = if import.starts_with('@') { 2 } else { 1 };
    match import.match_indices('/').nth(segments - 1) {
        Some((idx, _)) => &import[..idx],
        None => import,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> DependencyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_disjoint_partitions_accepted() {
        let spec = DependencySpec::new(
            map(&[("rxjs", "^7.5.6"), ("rx-vdom", "^0.1.3")]),
            map(&[("semver", "^7.3.4")]),
            map(&[("brotli", "^1.3.2")]),
        )
        .unwrap();
        assert_eq!(spec.externals().len(), 2);
        assert_eq!(spec.included_in_bundle()["semver"], "^7.3.4");
        assert!(spec.dev_time().contains_key("brotli"));
    }

    #[test]
    fn test_duplicate_across_partitions_rejected() {
        let err = DependencySpec::new(
            map(&[("@w3nest/http-clients", "^0.1.5")]),
            map(&[]),
            map(&[("@w3nest/http-clients", "^0.1.5")]),
        )
        .unwrap_err();
        match err {
            CiError::DependencyConflict { name } => assert_eq!(name, "@w3nest/http-clients"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_bundle_and_dev_rejected() {
        let err = DependencySpec::new(
            map(&[]),
            map(&[("semver", "^7.3.4")]),
            map(&[("semver", "^7.0.0")]),
        )
        .unwrap_err();
        assert!(matches!(err, CiError::DependencyConflict { name } if name == "semver"));
    }

    #[test]
    fn test_invalid_constraint_rejected() {
        for constraint in ["", "   ", "^1.0.0 ||", ">=", "not a range!", "1.2.3 - "] {
            let err = DependencySpec::new(map(&[("rxjs", constraint)]), map(&[]), map(&[]))
                .unwrap_err();
            assert!(
                matches!(err, CiError::InvalidVersionConstraint { .. }),
                "{constraint:?} accepted"
            );
        }
    }

    #[test]
    fn test_npm_ranges_accepted() {
        for constraint in [
            "^7.5.6",
            "^1.0.0 || ^2.0.0",
            ">=1.2.0 <2.0.0",
            ">= 1.2.0",
            "1.2.3 - 2.3.4",
            "~0.2.0-wip",
            "*",
            "latest",
        ] {
            assert!(is_npm_range(constraint), "{constraint:?} rejected");
            DependencySpec::new(map(&[("x", constraint)]), map(&[]), map(&[]))
                .unwrap_or_else(|e| panic!("{constraint:?}: {e}"));
        }
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("rxjs"), "rxjs");
        assert_eq!(package_name("rxjs/operators"), "rxjs");
        assert_eq!(package_name("@w3nest/ui-tk"), "@w3nest/ui-tk");
        assert_eq!(package_name("@w3nest/ui-tk/Badges"), "@w3nest/ui-tk");
    }

    #[test]
    fn test_resolves_external_sub_path() {
        let spec =
            DependencySpec::new(map(&[("@w3nest/ui-tk", "^0.1.5")]), map(&[]), map(&[])).unwrap();
        assert!(spec.resolves_external("@w3nest/ui-tk/Mkdocs"));
        assert!(!spec.resolves_external("@w3nest/webpm-client"));
    }
}
