// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

use storage_contracts::{CommandOutput, CommandRunner, StorageError, StorageResult};

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &str, args: &[String]) -> StorageResult<CommandOutput> {
        let output = Command::new(command).args(args).output().map_err(|e| {
            tracing::error!("Failed to run {command}: {e}");
            StorageError::external_tool(format!("Failed to run {command}: {e}"))
        })?;

        Ok(CommandOutput {
            // Killed by a signal: no exit code, report it as a failure.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_contracts::StorageErrorKind;

    #[test]
    fn missing_binary_is_an_external_tool_error() {
        let error = SystemCommandRunner
            .run("storage-lvm-definitely-missing-binary", &[])
            .unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::ExternalTool);
    }
}
