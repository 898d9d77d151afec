//! app.asar unpack/repack via the `asar` CLI, plus archive verification.
//!
//! The asar format itself stays a black box: unpack and repack shell out to
//! the `asar` tool. Resolution order for the tool is the `ASAR_CLI`
//! environment override, a PATH `asar`, then `npx -y asar`. What this module
//! does own is the safety rail around the rewrite: a timestamped backup of
//! the original archive, and SHA-256 digests of the result (whole file and
//! header JSON) so a patched build can be identified later.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{RepackError, Result, ToolError};
use crate::util::{fs, process};

/// Resolved asar tool invocation.
#[derive(Debug, Clone)]
pub struct AsarCli {
    program: PathBuf,
    prefix: Vec<String>,
}

impl AsarCli {
    /// Resolve the asar CLI. `override_path` wins when given (CLI flag or
    /// `ASAR_CLI` env, wired through clap).
    pub fn resolve(override_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = override_path {
            return Ok(Self {
                program: path.to_path_buf(),
                prefix: Vec::new(),
            });
        }

        if let Ok(path) = which::which("asar") {
            log::debug!("Found asar at: {}", path.display());
            return Ok(Self {
                program: path,
                prefix: Vec::new(),
            });
        }

        match which::which("npx") {
            Ok(path) => {
                log::debug!("asar not in PATH; falling back to npx at {}", path.display());
                Ok(Self {
                    program: path,
                    prefix: vec!["-y".to_string(), "asar".to_string()],
                })
            }
            Err(_) => Err(ToolError::NotFound {
                tool: "asar".to_string(),
                hint: "Install it with `npm install -g @electron/asar`, or install npm so \
                       the npx fallback works, or set ASAR_CLI."
                    .to_string(),
            }
            .into()),
        }
    }

    /// Unpack `asar` into `dest`.
    pub async fn extract(&self, asar: &Path, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest, true).await?;
        self.run(&["extract", fs::path_str(asar)?, fs::path_str(dest)?]).await?;
        log::info!("✓ Unpacked {}", asar.display());
        Ok(())
    }

    /// Pack `dir` into the archive at `out`.
    pub async fn pack(&self, dir: &Path, out: &Path) -> Result<()> {
        self.run(&["pack", fs::path_str(dir)?, fs::path_str(out)?]).await?;
        log::info!("✓ Packed {}", out.display());
        Ok(())
    }

    async fn run(&self, args: &[&str]) -> Result<()> {
        let mut full: Vec<&str> = self.prefix.iter().map(String::as_str).collect();
        full.extend_from_slice(args);
        process::run_checked(&self.program, &full, None).await?;
        Ok(())
    }
}

/// Copy a timestamped `.bak` of the archive next to it before overwriting.
///
/// Returns the backup path.
pub async fn backup(asar: &Path) -> Result<PathBuf> {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let backup = asar.with_extension(format!("asar.bak.{stamp}"));
    tokio::fs::copy(asar, &backup).await?;
    log::info!("✓ Backed up original archive to {}", backup.display());
    Ok(backup)
}

/// SHA-256 of the archive's header JSON.
///
/// The asar layout is two pickle blocks: the u32-LE at byte offset 12 is the
/// header JSON length, and the JSON itself starts at offset 16. Hashing just
/// the header identifies the file table independent of content ordering.
pub async fn header_sha256(asar: &Path) -> Result<String> {
    let blob = tokio::fs::read(asar).await?;
    header_sha256_bytes(&blob).ok_or_else(|| {
        RepackError::Anyhow(anyhow::anyhow!(
            "archive too short to contain an asar header: {}",
            asar.display()
        ))
    })
}

fn header_sha256_bytes(blob: &[u8]) -> Option<String> {
    let len_bytes: [u8; 4] = blob.get(12..16)?.try_into().ok()?;
    let json_len = u32::from_le_bytes(len_bytes) as usize;
    let header = blob.get(16..16 + json_len)?;
    Some(hex::encode(Sha256::digest(header)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_asar(header_json: &[u8]) -> Vec<u8> {
        // 4-byte pickle size, 4-byte header record size, 4-byte string
        // envelope, then the JSON length and payload.
        let mut blob = vec![0u8; 12];
        blob.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
        blob.extend_from_slice(header_json);
        blob
    }

    #[test]
    fn header_hash_covers_exactly_the_json() {
        let json = br#"{"files":{}}"#;
        let mut blob = fake_asar(json);
        // Content after the header must not affect the digest.
        blob.extend_from_slice(b"file contents here");

        let expected = hex::encode(Sha256::digest(json.as_slice()));
        assert_eq!(header_sha256_bytes(&blob).as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn truncated_archive_is_rejected() {
        assert!(header_sha256_bytes(b"short").is_none());

        let mut blob = vec![0u8; 12];
        blob.extend_from_slice(&100u32.to_le_bytes()); // claims 100 bytes, has none
        assert!(header_sha256_bytes(&blob).is_none());
    }

    #[tokio::test]
    async fn backup_copies_the_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let asar = dir.path().join("app.asar");
        tokio::fs::write(&asar, b"payload").await.expect("write");

        let bak = backup(&asar).await.expect("backup");
        assert!(bak.file_name().unwrap().to_str().unwrap().starts_with("app.asar.bak."));
        assert_eq!(tokio::fs::read(&bak).await.expect("read"), b"payload");
    }

    #[tokio::test]
    async fn backup_digest_matches_the_shipped_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let asar = dir.path().join("app.asar");
        tokio::fs::write(&asar, fake_asar(br#"{"files":{}}"#))
            .await
            .expect("write");
        let original = fs::sha256_file(&asar).await.expect("digest");

        let bak = backup(&asar).await.expect("backup");
        // The digest reported for the backup must identify the archive as
        // it shipped, before any rewrite touches app.asar.
        assert_eq!(fs::sha256_file(&bak).await.expect("digest"), original);
        tokio::fs::write(&asar, b"rewritten").await.expect("write");
        assert_eq!(fs::sha256_file(&bak).await.expect("digest"), original);
    }

    #[test]
    fn explicit_override_skips_discovery() {
        let cli = AsarCli::resolve(Some(Path::new("/opt/asar"))).expect("resolve");
        assert_eq!(cli.program, Path::new("/opt/asar"));
        assert!(cli.prefix.is_empty());
    }
}
