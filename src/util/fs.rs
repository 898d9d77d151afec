//! File system utilities for the repack pipeline.
//!
//! Safe file operations with idempotent directory handling and SHA-256
//! checksums for the repacked artifacts.

use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::error::{RepackError, Result};

/// Borrow a path as UTF-8 for handing to external tools.
pub fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        RepackError::Anyhow(anyhow::anyhow!(
            "path contains non-UTF8 characters: {}",
            path.display()
        ))
    })
}

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }
    Ok(fs::create_dir_all(path).await?)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e.into()),
    }
}

/// Recursively copies `src` into `dst`, preserving relative layout.
///
/// Symlinks are followed; the extracted app bundle contains none that matter
/// after 7z extraction.
pub async fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).await?;

    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::other(e.to_string()))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).await?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::copy(entry.path(), &target).await?;
        }
    }

    Ok(())
}

/// Marks a file executable (0o755) on Unix; no-op elsewhere.
pub async fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Calculates the SHA-256 checksum of a single file.
///
/// Reads in 8KB chunks to handle large archives efficiently. Returns the
/// hex-encoded hash (64 characters).
pub async fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sha256_matches_known_vector() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data");
        tokio::fs::write(&path, b"abc").await.expect("write");

        let digest = sha256_file(&path).await.expect("hash");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn copy_dir_preserves_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src");
        tokio::fs::create_dir_all(src.join("nested")).await.expect("mkdir");
        tokio::fs::write(src.join("a.txt"), b"a").await.expect("write");
        tokio::fs::write(src.join("nested/b.txt"), b"b").await.expect("write");

        let dst = dir.path().join("dst");
        copy_dir(&src, &dst).await.expect("copy");

        assert!(dst.join("a.txt").exists());
        assert_eq!(
            tokio::fs::read(dst.join("nested/b.txt")).await.expect("read"),
            b"b"
        );
    }

    #[tokio::test]
    async fn create_dir_all_erase_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("work");
        tokio::fs::create_dir_all(target.join("stale")).await.expect("mkdir");

        create_dir_all(&target, true).await.expect("recreate");
        assert!(target.exists());
        assert!(!target.join("stale").exists());

        // Erasing a path that does not exist is fine too.
        remove_dir_all(&dir.path().join("absent")).await.expect("noop");
    }
}
