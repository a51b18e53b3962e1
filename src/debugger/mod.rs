//! External debugger invocation
//!
//! Builds and spawns `windbg.exe -z <dump> -y srv*;<symbols> -c "!analyze -v"`
//! with the working directory set to the configured install folder. An
//! instance cap is enforced by polling the OS process table immediately
//! before each spawn; the count can go stale between check and spawn, which
//! is tolerated (the cap is a soft guard, not a correctness invariant).

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use sysinfo::System;
use tracing::{debug, info};

use crate::config::Settings;
use crate::constants::debugger;
use crate::types::DumpEntry;

/// Everything needed to start one debugger instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub dump_path: PathBuf,
    pub symbol_dir: PathBuf,
    pub windbg_dir: PathBuf,
}

impl LaunchPlan {
    pub fn new(settings: &Settings, entry: &DumpEntry, symbol_dir: PathBuf) -> Self {
        Self {
            dump_path: entry.path.clone(),
            symbol_dir,
            windbg_dir: PathBuf::from(&settings.windbg_path),
        }
    }

    /// The `-y` argument: symbol server prefix plus the resolved directory
    pub fn symbol_path_arg(&self) -> OsString {
        let mut arg = OsString::from("srv*;");
        arg.push(self.symbol_dir.as_os_str());
        arg
    }

    /// Argument vector passed to windbg (everything after the executable)
    pub fn arguments(&self) -> Vec<OsString> {
        vec![
            OsString::from("-z"),
            self.dump_path.clone().into_os_string(),
            OsString::from("-y"),
            self.symbol_path_arg(),
            OsString::from("-c"),
            OsString::from(debugger::ANALYZE_COMMAND),
        ]
    }

    /// Spawn the debugger detached, output piped and otherwise ignored.
    pub fn launch(&self) -> Result<Child> {
        let executable = self.windbg_dir.join(debugger::WINDBG_EXE);
        debug!(dump = ?self.dump_path, symbols = ?self.symbol_dir, "Launching debugger");

        let child = Command::new(&executable)
            .args(self.arguments())
            .current_dir(&self.windbg_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to launch {}", executable.display()))?;

        info!(pid = child.id(), dump = ?self.dump_path, "Debugger started");
        Ok(child)
    }
}

/// Count currently running debugger processes by polling the process table.
pub fn running_instances() -> usize {
    let mut system = System::new();
    system.refresh_processes();
    system
        .processes()
        .values()
        .filter(|process| process.name().eq_ignore_ascii_case(debugger::WINDBG_EXE))
        .count()
}

/// Whether one more instance may be spawned under the cap.
pub fn can_spawn(running: usize, cap: u32) -> bool {
    running < cap as usize
}

/// Whether launching `batch` more instances would exceed the cap.
/// Used for the pre-batch warning; individual spawns still re-check.
pub fn batch_would_exceed(running: usize, batch: usize, cap: u32) -> bool {
    running + batch > cap as usize
}
