// SPDX-License-Identifier: GPL-3.0-only

use crate::StorageResult;

/// Raw result of one external command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// stderr followed by stdout, trimmed, for diagnostics
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        match (stderr.is_empty(), stdout.is_empty()) {
            (false, false) => format!("{stderr}\n{stdout}"),
            (false, true) => stderr.to_string(),
            (true, false) => stdout.to_string(),
            (true, true) => String::new(),
        }
    }
}

/// Runs the volume-management tool-chain on behalf of the managers.
///
/// Implementations spawn the process, wait for it and return its exit
/// status and output. A nonzero exit is reported through
/// [`CommandOutput::exit_code`]; `Err` is reserved for failing to run the
/// command at all.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str, args: &[String]) -> StorageResult<CommandOutput>;
}

#[cfg(test)]
mod tests {
    use super::CommandOutput;

    #[test]
    fn diagnostic_combines_streams() {
        let output = CommandOutput {
            exit_code: 5,
            stdout: "  partial progress\n".to_string(),
            stderr: "Device /dev/sdz not found.\n".to_string(),
        };
        assert_eq!(output.diagnostic(), "Device /dev/sdz not found.\npartial progress");
        assert!(!output.is_success());
        assert!(CommandOutput::success("").is_success());
    }
}
