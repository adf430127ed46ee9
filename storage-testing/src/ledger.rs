use std::sync::Mutex;

use crate::cmd::{ParsedArgs, command_name, render};

/// Commands that only read state
pub const REPORT_COMMANDS: [&str; 3] = ["pvs", "vgs", "pvscan"];

/// One command received by the fake tool-chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn command(&self) -> &str {
        command_name(&self.program)
    }

    pub fn parsed(&self) -> ParsedArgs {
        ParsedArgs::parse(&self.args)
    }

    pub fn is_mutating(&self) -> bool {
        !REPORT_COMMANDS.contains(&self.command())
    }

    pub fn rendered(&self) -> String {
        render(&self.program, &self.args)
    }
}

/// Append-only record of every invocation, in order
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Mutex<Vec<Invocation>>,
}

impl Ledger {
    pub fn record(&self, invocation: Invocation) {
        self.lock().push(invocation);
    }

    pub fn entries(&self) -> Vec<Invocation> {
        self.lock().clone()
    }

    pub fn mutating(&self) -> Vec<Invocation> {
        self.lock()
            .iter()
            .filter(|invocation| invocation.is_mutating())
            .cloned()
            .collect()
    }

    pub fn count(&self, command: &str) -> usize {
        self.lock()
            .iter()
            .filter(|invocation| invocation.command() == command)
            .count()
    }

    pub fn last(&self) -> Option<Invocation> {
        self.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Invocation>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
