//! codex-repack - repackages the Codex desktop app's macOS distribution
//! as a Linux AppImage, with manifest version repair along the way.

mod cli;
mod error;
mod manifest;
mod pipeline;
mod util;

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
