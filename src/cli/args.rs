//! Command line argument parsing and validation.

use clap::Parser;
use std::path::PathBuf;

/// Repackages the Codex desktop app for Linux
#[derive(Parser, Debug)]
#[command(
    name = "codex-repack",
    version,
    about = "Repackages the macOS disk-image distribution of the Codex desktop app as a Linux AppImage",
    long_about = "Extracts a macOS DMG of the Codex desktop app, unpacks its app.asar, repairs the \
manifest version field, swaps macOS native modules for Linux rebuilds, and repackages the result \
as an AppImage.

All heavy lifting is delegated to external tools: 7z (DMG extraction), the asar CLI (archive \
unpack/pack), npm + @electron/rebuild (native modules), and appimagetool (bundling).

Usage:
  codex-repack Codex-1.2.3.dmg --output dist/
  codex-repack Codex.dmg --output dist/ --work-dir /tmp/codex-work --keep-work
  ASAR_CLI=/usr/local/bin/asar codex-repack Codex.dmg --output dist/ --skip-appimage

Exit code 0 = the repacked artifact exists at the output path."
)]
pub struct Args {
    /// Input macOS disk image (.dmg)
    #[arg(value_name = "DMG")]
    pub dmg: PathBuf,

    /// Output directory for the created artifacts
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: PathBuf,

    /// Scratch directory for extraction and rebuild staging
    #[arg(long, value_name = "DIR", default_value = "work")]
    pub work_dir: PathBuf,

    /// Do not delete the work directory (for manual inspection)
    #[arg(long)]
    pub keep_work: bool,

    /// Stop after repacking app.asar; skip the AppImage build
    #[arg(long)]
    pub skip_appimage: bool,

    /// Path to the asar CLI (overrides PATH lookup and the npx fallback)
    #[arg(long, value_name = "PATH", env = "ASAR_CLI")]
    pub asar_cli: Option<PathBuf>,

    /// Product name used for the AppDir, desktop entry, and artifact names
    #[arg(long, value_name = "NAME", default_value = "Codex")]
    pub product_name: String,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.dmg.extension().and_then(|e| e.to_str()) != Some("dmg") {
            return Err(format!(
                "Input does not look like a disk image: {}",
                self.dmg.display()
            ));
        }

        if self.product_name.is_empty() {
            return Err("Product name cannot be empty".to_string());
        }
        if self
            .product_name
            .chars()
            .any(|c| !c.is_ascii_alphanumeric() && c != '-' && c != '_')
        {
            return Err(format!(
                "Product name must be alphanumeric (got {:?})",
                self.product_name
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dmg: &str, product: &str) -> Args {
        Args {
            dmg: PathBuf::from(dmg),
            output: PathBuf::from("dist"),
            work_dir: PathBuf::from("work"),
            keep_work: false,
            skip_appimage: false,
            asar_cli: None,
            product_name: product.to_string(),
        }
    }

    #[test]
    fn accepts_dmg_input() {
        assert!(args("Codex-1.2.3.dmg", "Codex").validate().is_ok());
    }

    #[test]
    fn rejects_non_dmg_input() {
        assert!(args("Codex.zip", "Codex").validate().is_err());
        assert!(args("Codex", "Codex").validate().is_err());
    }

    #[test]
    fn rejects_hostile_product_names() {
        assert!(args("a.dmg", "").validate().is_err());
        assert!(args("a.dmg", "../etc").validate().is_err());
        assert!(args("a.dmg", "My App").validate().is_err());
        assert!(args("a.dmg", "My-App_2").validate().is_ok());
    }
}
