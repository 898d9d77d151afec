//! Exact-version resolution for declared dependency ranges.
//!
//! The native-module rebuild installs against an exact version, but manifests
//! declare ranges (`^11.3.0`, `~0.5.0`, `>=2.0.0`). Resolution is a pure
//! prefix trim: everything before the first ASCII digit is dropped. A range
//! with no digit at all (`latest`, `*`, a git URL without a tag) is a hard
//! error; proceeding without a resolvable version would make the rebuild
//! meaningless.

use crate::error::{RepackError, Result};
use crate::manifest::Manifest;

/// Strip the range operator prefix from a declared version range.
pub fn exact_version(name: &str, range: &str) -> Result<String> {
    let bare: String = match range.find(|c: char| c.is_ascii_digit()) {
        Some(idx) => range[idx..].to_string(),
        None => String::new(),
    };

    if bare.is_empty() {
        return Err(RepackError::MissingDependencyVersion {
            name: name.to_string(),
            range: Some(range.to_string()),
        });
    }

    Ok(bare)
}

/// Resolve the exact install version for `name` from `manifest`.
///
/// An undeclared dependency is the same hard error as an unresolvable range.
pub fn resolve(manifest: &Manifest, name: &str) -> Result<String> {
    let range = manifest
        .dependency_range(name)
        .ok_or_else(|| RepackError::MissingDependencyVersion {
            name: name.to_string(),
            range: None,
        })?;
    exact_version(name, range)
}
