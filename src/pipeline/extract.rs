//! Disk-image extraction and app.asar discovery.
//!
//! The macOS distribution arrives as a DMG. 7-Zip understands the HFS+/APFS
//! payload well enough to pull the `.app` bundle out without mounting
//! anything, so extraction is a single checked `7z x` invocation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{RepackError, Result, ToolError};
use crate::util::{fs, process};

/// Check if 7z is available for DMG extraction.
///
/// Cached result to avoid repeated subprocess calls.
static SEVEN_ZIP: LazyLock<Option<PathBuf>> = LazyLock::new(|| match which::which("7z") {
    Ok(path) => {
        log::debug!("Found 7z at: {}", path.display());
        Some(path)
    }
    Err(e) => {
        log::debug!("7z not found in PATH: {}", e);
        None
    }
});

fn seven_zip() -> Result<&'static Path> {
    SEVEN_ZIP.as_deref().ok_or_else(|| {
        ToolError::NotFound {
            tool: "7z".to_string(),
            hint: "Install p7zip (e.g. `apt install p7zip-full`) to extract the DMG.".to_string(),
        }
        .into()
    })
}

/// Extract a DMG into `<work>/extracted` and return the path to the
/// application's `Resources` directory.
pub async fn extract_dmg(dmg: &Path, work_dir: &Path) -> Result<PathBuf> {
    if !dmg.exists() {
        return Err(RepackError::missing_file(dmg, "input disk image"));
    }
    let tool = seven_zip()?;

    let extracted = work_dir.join("extracted");
    fs::create_dir_all(&extracted, true).await?;

    log::info!("Extracting {} ...", dmg.display());

    let dmg_str = fs::path_str(dmg)?;
    let out_flag = format!("-o{}", fs::path_str(&extracted)?);
    // -snld: extracted symlinks become links rather than errors
    process::run_checked(tool, &["x", "-y", "-snld", dmg_str, out_flag.as_str()], None).await?;

    let resources = find_resources_dir(&extracted)?;
    log::info!("✓ Extracted app resources: {}", resources.display());
    Ok(resources)
}

/// Locate `<something>.app/Contents/Resources` under the extraction root.
fn find_resources_dir(extracted: &Path) -> Result<PathBuf> {
    for entry in walkdir::WalkDir::new(extracted)
        .max_depth(3)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("app")
        {
            let resources = entry.path().join("Contents/Resources");
            if resources.is_dir() {
                return Ok(resources);
            }
        }
    }
    Err(RepackError::missing_file(
        extracted.join("*.app/Contents/Resources"),
        "no application bundle inside the extracted disk image",
    ))
}

/// Locate the `app.asar` to operate on when the caller did not pass one.
///
/// Probes well-known locations first, then falls back to a recursive scan.
/// More than one scan hit is an error naming every candidate.
pub fn find_default_asar(root: &Path) -> Result<PathBuf> {
    let candidates = [
        root.join("squashfs-root/resources/app.asar"),
        root.join("extracted/resources/app.asar"),
        root.join("extracted/Codex.app/Contents/Resources/app.asar"),
    ];
    for candidate in candidates {
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let mut matches: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == "app.asar")
        .map(|e| e.into_path())
        .collect();

    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(RepackError::missing_file(
            root.join("**/app.asar"),
            "no app.asar found; pass one explicitly",
        )),
        _ => Err(RepackError::AmbiguousAsar { candidates: matches }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    #[test]
    fn default_asar_prefers_known_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let known = dir.path().join("squashfs-root/resources");
        stdfs::create_dir_all(&known).expect("mkdir");
        stdfs::write(known.join("app.asar"), b"asar").expect("write");

        let found = find_default_asar(dir.path()).expect("find");
        assert_eq!(found, known.join("app.asar"));
    }

    #[test]
    fn extraction_output_wins_over_scattered_archives() {
        let dir = tempfile::tempdir().expect("tempdir");
        let known = dir.path().join("extracted/resources");
        stdfs::create_dir_all(&known).expect("mkdir");
        stdfs::write(known.join("app.asar"), b"asar").expect("write");

        let stray = dir.path().join("stash");
        stdfs::create_dir_all(&stray).expect("mkdir");
        stdfs::write(stray.join("app.asar"), b"asar").expect("write");

        let found = find_default_asar(dir.path()).expect("find");
        assert_eq!(found, known.join("app.asar"));
    }

    #[test]
    fn single_scan_hit_is_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let odd = dir.path().join("somewhere/else");
        stdfs::create_dir_all(&odd).expect("mkdir");
        stdfs::write(odd.join("app.asar"), b"asar").expect("write");

        let found = find_default_asar(dir.path()).expect("find");
        assert_eq!(found, odd.join("app.asar"));
    }

    #[test]
    fn multiple_hits_are_ambiguous() {
        let dir = tempfile::tempdir().expect("tempdir");
        for sub in ["a", "b"] {
            let p = dir.path().join(sub);
            stdfs::create_dir_all(&p).expect("mkdir");
            stdfs::write(p.join("app.asar"), b"asar").expect("write");
        }
        assert!(matches!(
            find_default_asar(dir.path()),
            Err(RepackError::AmbiguousAsar { .. })
        ));
    }

    #[test]
    fn no_hit_is_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            find_default_asar(dir.path()),
            Err(RepackError::MissingFile { .. })
        ));
    }
}
