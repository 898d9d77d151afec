//! Repack pipeline orchestration.
//!
//! Coordinates the sequential steps that turn a macOS disk image into a
//! Linux-distributable build:
//!
//! 1. extract the DMG (7z)
//! 2. unpack `app.asar` (asar CLI)
//! 3. normalize the manifest version and persist it when repaired
//! 4. rebuild and swap native modules (npm / @electron/rebuild)
//! 5. back up and repack the archive, recording checksums
//! 6. stage an AppDir and build the AppImage (appimagetool)
//!
//! Every step is fatal on failure; there is no partial-failure recovery.

pub mod appimage;
pub mod asar;
pub mod extract;
pub mod native;

use std::path::PathBuf;

use crate::error::{RepackError, Result};
use crate::manifest::Manifest;
use crate::util::fs;

/// Pipeline configuration, assembled from CLI arguments.
#[derive(Debug, Clone)]
pub struct RepackConfig {
    /// Input macOS disk image.
    pub dmg: PathBuf,
    /// Where the final artifacts land.
    pub output_dir: PathBuf,
    /// Scratch directory for extraction and rebuild staging.
    pub work_dir: PathBuf,
    /// Keep the work directory for manual inspection.
    pub keep_work: bool,
    /// Stop after repacking the archive; skip the AppImage build.
    pub skip_appimage: bool,
    /// Explicit asar CLI path (flag or `ASAR_CLI` env).
    pub asar_cli: Option<PathBuf>,
    /// Product name used for the AppDir, desktop entry, and artifact names.
    pub product_name: String,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RepackSummary {
    /// The repacked archive.
    pub asar: PathBuf,
    /// Timestamped copy of the original archive, when a rewrite happened.
    pub backup: Option<PathBuf>,
    /// SHA-256 of the backup archive, when one was made.
    pub backup_sha256: Option<String>,
    /// SHA-256 of the repacked archive.
    pub asar_sha256: String,
    /// SHA-256 of the repacked archive's header JSON.
    pub header_sha256: String,
    /// Normalized application version.
    pub version: String,
    /// The AppImage, unless the build was skipped.
    pub appimage: Option<PathBuf>,
}

/// Run the whole pipeline.
pub async fn run(config: &RepackConfig) -> Result<RepackSummary> {
    fs::create_dir_all(&config.work_dir, true).await?;

    let resources = extract::extract_dmg(&config.dmg, &config.work_dir).await?;

    let asar_path = {
        let direct = resources.join("app.asar");
        if direct.exists() {
            direct
        } else {
            extract::find_default_asar(&config.work_dir)?
        }
    };

    let cli = asar::AsarCli::resolve(config.asar_cli.as_deref())?;
    let app_dir = config.work_dir.join("app");
    cli.extract(&asar_path, &app_dir).await?;

    let manifest_path = app_dir.join("package.json");
    let mut manifest = Manifest::load(&manifest_path)?;
    log::info!(
        "Application: {} {}",
        manifest.name().unwrap_or("<unnamed>"),
        manifest.version().unwrap_or("<no version>")
    );
    let normalized = manifest.normalize_version();
    if normalized.was_modified {
        if let Some(warning) = &normalized.warning {
            log::warn!("{warning}");
        }
        manifest.store()?;
        log::info!("✓ Manifest version normalized to {}", normalized.version);
    } else {
        log::debug!("manifest version {} already conformant", normalized.version);
    }

    let unpacked = asar_path
        .parent()
        .map(|dir| dir.join("app.asar.unpacked"))
        .filter(|p| p.is_dir());
    match &unpacked {
        Some(unpacked) => {
            native::swap_native_modules(unpacked, &manifest, &config.work_dir).await?;
        }
        None => log::info!("No app.asar.unpacked next to the archive; skipping native swap"),
    }

    // The work tree is scratch; the repacked archive and the pre-overwrite
    // backup must outlive it.
    fs::create_dir_all(&config.output_dir, false).await?;
    let out_asar = config.output_dir.join("app.asar");

    let out_backup = if normalized.was_modified {
        // Repack through a temporary file so a failed pack never clobbers
        // the original archive; the backup happens before the overwrite.
        let backup = asar::backup(&asar_path).await?;
        let packed_tmp = config.work_dir.join("app.asar.packed");
        cli.pack(&app_dir, &packed_tmp).await?;
        tokio::fs::copy(&packed_tmp, &asar_path).await?;

        match backup.file_name() {
            Some(name) => {
                let dst = config.output_dir.join(name);
                tokio::fs::copy(&backup, &dst).await?;
                Some(dst)
            }
            None => Some(backup),
        }
    } else {
        log::info!("No manifest changes to write; archive left as shipped");
        None
    };
    tokio::fs::copy(&asar_path, &out_asar).await?;

    let asar_sha256 = fs::sha256_file(&out_asar).await?;
    let header_sha256 = asar::header_sha256(&out_asar).await?;
    let backup_sha256 = match &out_backup {
        Some(backup) => Some(fs::sha256_file(backup).await?),
        None => None,
    };
    log::info!("✓ Archive ready: {}", out_asar.display());
    if let Some(backup) = &out_backup {
        log::info!("  backup:             {}", backup.display());
    }
    log::info!("  sha256(new):        {asar_sha256}");
    if let Some(digest) = &backup_sha256 {
        log::info!("  sha256(bak):        {digest}");
    }
    log::info!("  asar_header_sha256: {header_sha256}");

    let appimage = if config.skip_appimage {
        log::info!("Skipping AppImage build (--skip-appimage)");
        None
    } else {
        // The archive is not always in the probed resources dir, so stage
        // from wherever it actually lives.
        let stage_root = asar_path.parent().unwrap_or(resources.as_path());
        let built = appimage::bundle_appimage(
            &config.product_name,
            &normalized.version,
            stage_root,
            &config.output_dir,
        )
        .await?;
        if !built.exists() {
            return Err(RepackError::missing_file(
                built,
                "appimagetool reported success but produced nothing",
            ));
        }
        Some(built)
    };

    if config.keep_work {
        log::info!("Keeping work directory: {}", config.work_dir.display());
    } else {
        fs::remove_dir_all(&config.work_dir).await?;
    }

    Ok(RepackSummary {
        asar: out_asar,
        backup: out_backup,
        backup_sha256,
        asar_sha256,
        header_sha256,
        version: normalized.version,
        appimage,
    })
}
