//! AppImage repackaging - portable Linux build of the extracted app.
//!
//! Stages an AppDir around the repacked `app.asar` and hands it to
//! `appimagetool`. The tool is downloaded on first use into a cache
//! directory and extracted with `--appimage-extract`, since containers
//! usually lack FUSE.

use std::path::{Path, PathBuf};

use crate::error::{RepackError, Result, ToolError};
use crate::util::{fs, process};

const APPIMAGETOOL_BASE_URL: &str =
    "https://github.com/AppImage/appimagetool/releases/download/continuous";

/// Build an AppImage from the repacked application resources.
///
/// # Process
///
/// 1. Stages an AppDir (`usr/lib/<app>` resources, AppRun, desktop entry, icon)
/// 2. Downloads appimagetool (cached)
/// 3. Invokes appimagetool on the AppDir
///
/// Returns the path to the generated `.AppImage`.
pub async fn bundle_appimage(
    product_name: &str,
    version: &str,
    resources: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x86_64",
        "aarch64" => "aarch64",
        other => {
            return Err(RepackError::Anyhow(anyhow::anyhow!(
                "unsupported architecture for AppImage: {other}"
            )));
        }
    };

    log::info!("Building AppImage for {product_name}");
    log::debug!("Using architecture: {arch}");

    fs::create_dir_all(output_dir, false).await?;

    let app_dir = output_dir.join(format!("{product_name}.AppDir"));
    stage_app_dir(product_name, resources, &app_dir).await?;

    let appimagetool = download_appimagetool(arch).await?;

    let appimage_path = output_dir.join(format!("{product_name}-{version}-{arch}.AppImage"));
    let app_dir_str = fs::path_str(&app_dir)?;
    let out_str = fs::path_str(&appimage_path)?;

    let mut command = tokio::process::Command::new(&appimagetool);
    command
        .env("ARCH", arch)
        .args([app_dir_str, out_str]);
    let status = command.status().await.map_err(|e| ToolError::ExecutionFailed {
        command: format!("{} {app_dir_str} {out_str}", appimagetool.display()),
        code: None,
        output: format!("failed to spawn: {e}"),
    })?;
    if !status.success() {
        return Err(ToolError::ExecutionFailed {
            command: format!("{} {app_dir_str} {out_str}", appimagetool.display()),
            code: status.code(),
            output: "appimagetool failed".to_string(),
        }
        .into());
    }

    fs::set_executable(&appimage_path).await?;
    log::info!("✓ Created AppImage: {}", appimage_path.display());
    Ok(appimage_path)
}

/// Lay out the AppDir structure around the app resources.
async fn stage_app_dir(product_name: &str, resources: &Path, app_dir: &Path) -> Result<()> {
    fs::create_dir_all(app_dir, true).await?;

    let lib_dir = app_dir.join("usr/lib").join(product_name.to_lowercase());
    let res_dir = lib_dir.join("resources");
    fs::create_dir_all(&res_dir, false).await?;

    for name in ["app.asar", "app.asar.unpacked"] {
        let src = resources.join(name);
        if !src.exists() {
            if name == "app.asar" {
                return Err(RepackError::missing_file(src, "staging AppDir"));
            }
            continue; // not every build ships unpacked files
        }
        let dst = res_dir.join(name);
        if src.is_dir() {
            fs::copy_dir(&src, &dst).await?;
        } else {
            tokio::fs::copy(&src, &dst).await?;
        }
    }

    create_apprun(product_name, app_dir).await?;
    create_desktop_file(product_name, app_dir).await?;
    copy_icon(product_name, resources, app_dir).await?;
    Ok(())
}

/// AppRun launches the bundled archive through the system Electron.
async fn create_apprun(product_name: &str, app_dir: &Path) -> Result<()> {
    let lib = format!("usr/lib/{}", product_name.to_lowercase());
    let script = format!(
        "#!/bin/sh\n\
         HERE=\"$(dirname \"$(readlink -f \"$0\")\")\"\n\
         exec electron \"$HERE/{lib}/resources/app.asar\" \"$@\"\n"
    );
    let apprun = app_dir.join("AppRun");
    tokio::fs::write(&apprun, script).await?;
    fs::set_executable(&apprun).await?;
    Ok(())
}

/// Generate a freedesktop.org compliant desktop entry.
async fn create_desktop_file(product_name: &str, app_dir: &Path) -> Result<()> {
    let entry = format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name={product_name}\n\
         Exec=AppRun %U\n\
         Icon={icon}\n\
         Terminal=false\n\
         Categories=Development;\n",
        icon = product_name.to_lowercase(),
    );
    let path = app_dir.join(format!("{}.desktop", product_name.to_lowercase()));
    tokio::fs::write(&path, entry).await?;
    Ok(())
}

/// Reuse an icon shipped inside the app resources when one exists.
///
/// appimagetool requires a top-level PNG; a missing icon only degrades the
/// desktop integration, so absence is logged, not fatal.
async fn copy_icon(product_name: &str, resources: &Path, app_dir: &Path) -> Result<()> {
    let icon = walkdir::WalkDir::new(resources)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| {
            e.file_type().is_file()
                && e.path().extension().and_then(|ext| ext.to_str()) == Some("png")
        });

    match icon {
        Some(entry) => {
            let icon_name = format!("{}.png", product_name.to_lowercase());
            let dst = app_dir.join(&icon_name);
            tokio::fs::copy(entry.path(), &dst).await?;

            #[cfg(unix)]
            {
                let diricon = app_dir.join(".DirIcon");
                if !diricon.exists() {
                    tokio::fs::symlink(&icon_name, &diricon).await?;
                }
            }
        }
        None => log::warn!("No PNG icon found in app resources; AppImage will have none"),
    }
    Ok(())
}

/// Download and extract appimagetool.
///
/// Downloads the AppImage from GitHub, extracts it (no FUSE assumption),
/// and returns the path to the extracted AppRun binary.
async fn download_appimagetool(arch: &str) -> Result<PathBuf> {
    let cache_root = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("codex-repack/tools");
    let tool_name = format!("appimagetool-{arch}.AppImage");
    let tool_path = cache_root.join(&tool_name);
    let extracted_dir = cache_root.join(format!("appimagetool-{arch}-extracted"));
    let extracted_apprun = extracted_dir.join("AppRun");

    if extracted_apprun.exists() {
        log::debug!("appimagetool already extracted at {:?}", extracted_apprun);
        return Ok(extracted_apprun);
    }

    if !tool_path.exists() {
        log::info!("Downloading appimagetool for {arch}...");
        fs::create_dir_all(&cache_root, false).await?;

        let url = format!("{APPIMAGETOOL_BASE_URL}/{tool_name}");
        let data = download(&url).await?;
        tokio::fs::write(&tool_path, data).await?;
        fs::set_executable(&tool_path).await?;
    }

    log::info!("Extracting appimagetool for {arch}...");
    fs::create_dir_all(&extracted_dir, false).await?;

    process::run_checked(&tool_path, &["--appimage-extract"], Some(&extracted_dir)).await?;

    // --appimage-extract always writes to squashfs-root/; hoist its contents
    let squashfs_root = extracted_dir.join("squashfs-root");
    if !squashfs_root.exists() {
        return Err(RepackError::missing_file(
            squashfs_root,
            "appimagetool extraction did not create squashfs-root",
        ));
    }
    let mut entries = tokio::fs::read_dir(&squashfs_root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let dst = extracted_dir.join(entry.file_name());
        tokio::fs::rename(entry.path(), &dst).await?;
    }
    tokio::fs::remove_dir(&squashfs_root).await?;

    if !extracted_apprun.exists() {
        return Err(RepackError::missing_file(
            extracted_apprun,
            "AppRun not found after appimagetool extraction",
        ));
    }
    fs::set_executable(&extracted_apprun).await?;
    Ok(extracted_apprun)
}

/// Downloads a file from a URL, returning its contents.
async fn download(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading {url}");

    let response = reqwest::get(url)
        .await
        .map_err(|e| anyhow::anyhow!("download failed: {e}"))?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("download failed: {e}"))?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| anyhow::anyhow!("failed to read response: {e}"))?;

    Ok(bytes.to_vec())
}
