//! Repackaging toolkit for the Codex desktop app on Linux.
//!
//! Extracts the macOS disk-image distribution, unpacks the bundled
//! `app.asar`, repairs the manifest version field, swaps macOS native
//! modules for Linux rebuilds, and repackages the result as an AppImage.
//! Archive extraction, native-module compilation, and AppImage assembly are
//! delegated to external tools; the reusable core of this crate is the
//! version normalization and dependency-resolution preprocessing in
//! [`manifest`].
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod util;

// Re-export commonly used types
pub use error::{CliError, RepackError, Result, ToolError};
pub use manifest::{Manifest, version::NormalizationResult, version::normalize};
