//! Source revision lookup

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::NotAvailable;

/// Hash of the current `HEAD` commit of the working directory's repository
pub fn git_revision_hash() -> Result<String, NotAvailable> {
    revision_hash(&mut rev_parse())
}

/// Hash of the current `HEAD` commit of the repository containing `dir`
pub fn git_revision_hash_in(dir: &Path) -> Result<String, NotAvailable> {
    revision_hash(rev_parse().current_dir(dir))
}

fn rev_parse() -> Command {
    let mut command = Command::new("git");
    command.args(["rev-parse", "HEAD"]);
    command
}

fn revision_hash(command: &mut Command) -> Result<String, NotAvailable> {
    let output = command.output().map_err(|e| NotAvailable {
        reason: format!("failed to run git: {}", e),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(stderr = %stderr.trim(), "git rev-parse failed");
        return Err(NotAvailable {
            reason: stderr.trim().to_string(),
        });
    }

    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hash.is_empty() {
        return Err(NotAvailable {
            reason: "empty revision".to_string(),
        });
    }
    Ok(hash)
}
