//! Manifest (package.json) handling.
//!
//! The application manifest is treated as an open record: the whole document
//! is held as a passthrough [`serde_json::Map`], so fields this tool does not
//! model survive a rewrite byte-for-byte in their original order
//! (`serde_json` is built with `preserve_order`). Only the `version` field is
//! ever changed: a partial update, not a regeneration.

pub mod deps;
pub mod version;

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{RepackError, Result};
use version::NormalizationResult;

pub use version::normalize;

/// An application manifest loaded from disk.
///
/// Read once, normalized once, written back once; see [`Manifest::normalize_version`].
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    root: Map<String, Value>,
}

impl Manifest {
    /// Load a manifest from `path`.
    ///
    /// Fails when the file is unreadable or its top level is not a JSON object.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RepackError::InvalidManifest {
            path: path.to_path_buf(),
            reason: format!("failed to read: {e}"),
        })?;

        let value: Value = serde_json::from_str(&text).map_err(|e| RepackError::InvalidManifest {
            path: path.to_path_buf(),
            reason: format!("failed to parse: {e}"),
        })?;

        let Value::Object(root) = value else {
            return Err(RepackError::InvalidManifest {
                path: path.to_path_buf(),
                reason: "top level is not a JSON object".to_string(),
            });
        };

        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    /// Application name, when declared.
    pub fn name(&self) -> Option<&str> {
        self.root.get("name").and_then(Value::as_str)
    }

    /// Raw version field. `None` when absent or not a string.
    pub fn version(&self) -> Option<&str> {
        self.root.get("version").and_then(Value::as_str)
    }

    /// Declared range for `name`, searching `dependencies` then
    /// `devDependencies`.
    pub fn dependency_range(&self, name: &str) -> Option<&str> {
        ["dependencies", "devDependencies"].iter().find_map(|key| {
            self.root
                .get(*key)
                .and_then(Value::as_object)
                .and_then(|deps| deps.get(name))
                .and_then(Value::as_str)
        })
    }

    /// Run the version through [`version::normalize`] and update the field
    /// in place when a repair was needed. An absent field counts as empty
    /// input and is inserted as the first key, npm's conventional position.
    ///
    /// Returns the normalization outcome; the manifest is only dirty when
    /// `was_modified` is true.
    pub fn normalize_version(&mut self) -> NormalizationResult {
        let raw = self.version().unwrap_or("").to_string();
        let result = version::normalize(&raw);

        if result.was_modified {
            let normalized = Value::String(result.version.clone());
            if self.root.contains_key("version") {
                self.root.insert("version".to_string(), normalized);
            } else {
                let mut fresh = Map::new();
                fresh.insert("version".to_string(), normalized);
                fresh.append(&mut self.root);
                self.root = fresh;
            }
        }

        result
    }

    /// Write the manifest back to the path it was loaded from.
    pub fn store(&self) -> Result<()> {
        let mut text = serde_json::to_string_pretty(&self.root)?;
        text.push('\n');
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("package.json");
        fs::write(&path, body).expect("write fixture");
        path
    }

    #[test]
    fn partial_rewrite_preserves_unknown_fields_and_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_manifest(
            &dir,
            r#"{"name":"codex","zeta":1,"version":"260202.0859","alpha":{"nested":true}}"#,
        );

        let mut manifest = Manifest::load(&path).expect("load");
        let result = manifest.normalize_version();
        assert!(result.was_modified);
        manifest.store().expect("store");

        let rewritten = fs::read_to_string(&path).expect("read back");
        let reparsed: Map<String, Value> = serde_json::from_str(&rewritten).expect("parse");
        let keys: Vec<&str> = reparsed.keys().map(String::as_str).collect();
        assert_eq!(keys, ["name", "zeta", "version", "alpha"]);
        assert!(rewritten.contains(r#""version": "260202.859.0""#));
        assert!(rewritten.contains(r#""nested": true"#));
    }

    #[test]
    fn conforming_version_leaves_manifest_clean() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_manifest(&dir, r#"{"name":"codex","version":"1.2.3"}"#);

        let mut manifest = Manifest::load(&path).expect("load");
        let result = manifest.normalize_version();
        assert_eq!(result.version, "1.2.3");
        assert!(!result.was_modified);
    }

    #[test]
    fn absent_version_is_inserted_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_manifest(&dir, r#"{"name":"codex","main":"index.js"}"#);

        let mut manifest = Manifest::load(&path).expect("load");
        let result = manifest.normalize_version();
        assert_eq!(result.version, "0.0.0");
        assert!(result.was_modified);
        manifest.store().expect("store");

        let rewritten = fs::read_to_string(&path).expect("read back");
        let reparsed: Map<String, Value> = serde_json::from_str(&rewritten).expect("parse");
        let keys: Vec<&str> = reparsed.keys().map(String::as_str).collect();
        assert_eq!(keys, ["version", "name", "main"]);
    }

    #[test]
    fn dependency_range_checks_both_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_manifest(
            &dir,
            r#"{
                "version": "1.0.0",
                "dependencies": {"better-sqlite3": "^11.3.0"},
                "devDependencies": {"electron": "~31.0.0"}
            }"#,
        );

        let manifest = Manifest::load(&path).expect("load");
        assert_eq!(manifest.dependency_range("better-sqlite3"), Some("^11.3.0"));
        assert_eq!(manifest.dependency_range("electron"), Some("~31.0.0"));
        assert_eq!(manifest.dependency_range("left-pad"), None);
    }

    #[test]
    fn non_object_manifest_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_manifest(&dir, r#"["not", "an", "object"]"#);
        assert!(matches!(
            Manifest::load(&path),
            Err(RepackError::InvalidManifest { .. })
        ));
    }
}
