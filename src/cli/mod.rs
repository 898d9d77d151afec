//! Command line interface for codex-repack.

mod args;

pub use args::Args;

use crate::error::{CliError, Result};
use crate::pipeline::{self, RepackConfig};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let config = RepackConfig {
        dmg: args.dmg,
        output_dir: args.output,
        work_dir: args.work_dir,
        keep_work: args.keep_work,
        skip_appimage: args.skip_appimage,
        asar_cli: args.asar_cli,
        product_name: args.product_name,
    };

    let summary = pipeline::run(&config).await?;

    println!("REPACKED");
    println!("asar:               {}", summary.asar.display());
    if let Some(backup) = &summary.backup {
        println!("backup:             {}", backup.display());
    }
    println!("version:            {}", summary.version);
    println!("sha256(new):        {}", summary.asar_sha256);
    if let Some(digest) = &summary.backup_sha256 {
        println!("sha256(bak):        {}", digest);
    }
    println!("asar_header_sha256: {}", summary.header_sha256);
    if let Some(appimage) = &summary.appimage {
        println!("appimage:           {}", appimage.display());
    }

    Ok(0)
}
