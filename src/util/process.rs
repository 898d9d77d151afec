//! Checked external tool invocation.
//!
//! Every heavy step of the pipeline delegates to an external tool. All of
//! them go through [`run_checked`] so a non-zero exit always surfaces the
//! full command line and the tool's combined output.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{Result, ToolError};

/// Runs a command to completion, capturing output.
///
/// Returns captured stdout on success; a non-zero exit becomes
/// [`ToolError::ExecutionFailed`] carrying stdout and stderr combined.
pub async fn run_checked(program: &Path, args: &[&str], cwd: Option<&Path>) -> Result<String> {
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    log::debug!("running: {} {}", program.display(), args.join(" "));

    let output = command.output().await.map_err(|e| ToolError::ExecutionFailed {
        command: render(program, args),
        code: None,
        output: format!("failed to spawn: {e}"),
    })?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(ToolError::ExecutionFailed {
            command: render(program, args),
            code: output.status.code(),
            output: combined,
        }
        .into());
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn render(program: &Path, args: &[&str]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
