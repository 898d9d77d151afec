//! Native module replacement.
//!
//! The macOS distribution ships mach-O `.node` binaries under
//! `app.asar.unpacked/node_modules`. Those cannot load on Linux, so each
//! native dependency is reinstalled at the exact version the manifest pins
//! and rebuilt against the app's Electron ABI, then the rebuilt binaries
//! replace the shipped ones. Installation and rebuild are black boxes
//! (`npm` and `@electron/rebuild`); this module owns version pinning and the
//! after-the-fact check that a loadable binary actually exists.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{RepackError, Result, ToolError};
use crate::manifest::{Manifest, deps};
use crate::util::{fs, process};

/// Packages under `unpacked` that ship at least one `.node` binary.
///
/// Sorted for deterministic rebuild order.
pub fn discover_native_deps(unpacked: &Path) -> Vec<String> {
    let node_modules = unpacked.join("node_modules");
    let mut found = BTreeSet::new();

    for entry in walkdir::WalkDir::new(&node_modules)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file()
            || entry.path().extension().and_then(|e| e.to_str()) != Some("node")
        {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(&node_modules) {
            if let Some(first) = rel.components().next() {
                found.insert(first.as_os_str().to_string_lossy().into_owned());
            }
        }
    }

    found.into_iter().collect()
}

/// Rebuild every native dependency for Linux and swap the binaries into the
/// unpacked tree.
///
/// `manifest` must already be normalized: `@electron/rebuild` refuses a
/// project whose version field is not strict semver.
pub async fn swap_native_modules(
    unpacked: &Path,
    manifest: &Manifest,
    work_dir: &Path,
) -> Result<()> {
    let native = discover_native_deps(unpacked);
    if native.is_empty() {
        log::info!("No native modules found; nothing to rebuild");
        return Ok(());
    }
    log::info!("Native modules to rebuild: {}", native.join(", "));

    let npm = which::which("npm").map_err(|_| ToolError::NotFound {
        tool: "npm".to_string(),
        hint: "Install Node.js/npm; the native-module rebuild runs through it.".to_string(),
    })?;

    // Exact versions resolve before any tool runs, so a version hole fails
    // fast instead of after minutes of compilation.
    let electron_version = deps::resolve(manifest, "electron")?;
    let mut pinned: Vec<(String, String)> = Vec::with_capacity(native.len());
    for name in &native {
        pinned.push((name.clone(), deps::resolve(manifest, name)?));
    }

    let staging = work_dir.join("native");
    fs::create_dir_all(&staging, true).await?;
    tokio::fs::write(staging.join("package.json"), "{}\n").await?;

    for (name, version) in &pinned {
        let spec = format!("{name}@{version}");
        log::info!("Installing {spec} ...");
        process::run_checked(
            &npm,
            &["install", "--no-save", "--ignore-scripts", spec.as_str()],
            Some(&staging),
        )
        .await?;
    }

    log::info!("Rebuilding against Electron {electron_version} ...");
    let npx = which::which("npx").map_err(|_| ToolError::NotFound {
        tool: "npx".to_string(),
        hint: "npx ships with npm; reinstall Node.js/npm.".to_string(),
    })?;
    process::run_checked(
        &npx,
        &["-y", "@electron/rebuild", "-v", electron_version.as_str(), "-m", "."],
        Some(&staging),
    )
    .await?;

    for (name, _) in &pinned {
        let rebuilt = staging.join("node_modules").join(name);
        let target = unpacked.join("node_modules").join(name);

        let binary = first_node_binary(&rebuilt).ok_or_else(|| {
            RepackError::missing_file(
                rebuilt.join("**/*.node"),
                format!("no native binary produced for `{name}` after rebuild"),
            )
        })?;
        log::debug!("rebuilt binary: {}", binary.display());

        fs::remove_dir_all(&target).await?;
        fs::copy_dir(&rebuilt, &target).await?;
        log::info!("✓ Swapped native module {name}");
    }

    Ok(())
}

fn first_node_binary(dir: &Path) -> Option<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| {
            e.file_type().is_file()
                && e.path().extension().and_then(|ext| ext.to_str()) == Some("node")
        })
        .map(|e| e.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    #[test]
    fn discovers_packages_shipping_node_binaries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nm = dir.path().join("node_modules");
        stdfs::create_dir_all(nm.join("better-sqlite3/build/Release")).expect("mkdir");
        stdfs::write(
            nm.join("better-sqlite3/build/Release/better_sqlite3.node"),
            b"\x7fELF",
        )
        .expect("write");
        stdfs::create_dir_all(nm.join("lodash")).expect("mkdir");
        stdfs::write(nm.join("lodash/index.js"), b"js").expect("write");

        assert_eq!(discover_native_deps(dir.path()), ["better-sqlite3"]);
    }

    #[test]
    fn empty_tree_discovers_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(discover_native_deps(dir.path()).is_empty());
    }

    #[test]
    fn finds_first_node_binary() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(first_node_binary(dir.path()).is_none());

        let deep = dir.path().join("build/Release");
        stdfs::create_dir_all(&deep).expect("mkdir");
        stdfs::write(deep.join("mod.node"), b"bin").expect("write");
        assert_eq!(first_node_binary(dir.path()), Some(deep.join("mod.node")));
    }
}
