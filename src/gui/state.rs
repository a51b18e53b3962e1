//! Shared GUI state and background job plumbing
//!
//! Scans and file dialogs run on worker threads and report back over an
//! `mpsc` channel drained once per frame. Failures surface as colored status
//! messages; the offending action is skipped, nothing is retried.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{error, info, warn};

use crate::config::Settings;
use crate::constants::gui::{COLOR_ERROR, COLOR_SUCCESS, COLOR_WARNING};
use crate::debugger::{self, LaunchPlan};
use crate::scanner;
use crate::symbols::{self, SymbolResolution, versions};
use crate::types::DumpEntry;

/// One-line feedback shown at the bottom of the window
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub color: egui::Color32,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: COLOR_SUCCESS,
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: COLOR_WARNING,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: COLOR_ERROR,
        }
    }
}

/// The five configurable paths, addressed uniformly by the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathField {
    SymbolBase,
    BackupSymbol,
    DumpBase,
    BackupDump,
    WinDbg,
}

impl PathField {
    pub const ALL: &[PathField] = &[
        PathField::SymbolBase,
        PathField::BackupSymbol,
        PathField::DumpBase,
        PathField::BackupDump,
        PathField::WinDbg,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PathField::SymbolBase => "Symbol root",
            PathField::BackupSymbol => "Backup symbol share",
            PathField::DumpBase => "Dump root",
            PathField::BackupDump => "Backup dump share",
            PathField::WinDbg => "WinDbg folder",
        }
    }

    pub fn get(self, settings: &Settings) -> &str {
        match self {
            PathField::SymbolBase => &settings.symbol_base_path,
            PathField::BackupSymbol => &settings.backup_symbol_path,
            PathField::DumpBase => &settings.dump_base_path,
            PathField::BackupDump => &settings.backup_dump_path,
            PathField::WinDbg => &settings.windbg_path,
        }
    }

    pub fn get_mut(self, settings: &mut Settings) -> &mut String {
        match self {
            PathField::SymbolBase => &mut settings.symbol_base_path,
            PathField::BackupSymbol => &mut settings.backup_symbol_path,
            PathField::DumpBase => &mut settings.dump_base_path,
            PathField::BackupDump => &mut settings.backup_dump_path,
            PathField::WinDbg => &mut settings.windbg_path,
        }
    }

    /// Existence check shown as the validity indicator. The WinDbg folder is
    /// only valid if it actually contains the executable.
    pub fn is_valid(self, settings: &Settings) -> bool {
        match self {
            PathField::WinDbg => settings.windbg_is_valid(),
            _ => {
                let value = self.get(settings);
                !value.is_empty() && PathBuf::from(value).is_dir()
            }
        }
    }
}

/// What a directory/file picker result should be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPurpose {
    /// Pick a case folder directly instead of typing a case number
    CaseFolder,
    /// Add one individual dump file to the table
    AddDumpFile,
    /// Re-select one of the configured paths
    PathSetting(PathField),
    /// Manual symbol override for the table row that failed resolution
    SymbolOverride(usize),
}

/// Payload of a finished scan worker
#[derive(Debug)]
pub struct ScanReport {
    pub dumps: Vec<DumpEntry>,
    pub seen: HashSet<PathBuf>,
    pub warnings: Vec<String>,
}

/// Message sent back from worker threads
pub enum JobResult {
    Scan(anyhow::Result<ScanReport>),
    PickedPath {
        purpose: DialogPurpose,
        path: Option<PathBuf>,
    },
}

pub struct SharedState {
    pub settings: Settings,
    pub paths_dirty: bool,
    pub case_number: String,
    pub dumps: Vec<DumpEntry>,
    pub selected_row: Option<usize>,
    pub versions: Vec<String>,
    pub selected_version: String,
    pub status_message: Option<StatusMessage>,
    pub jobs_in_flight: usize,

    job_tx: Sender<JobResult>,
    job_rx: Receiver<JobResult>,
    seen: HashSet<PathBuf>,
}

impl SharedState {
    pub fn new(settings: Settings) -> Self {
        let (job_tx, job_rx) = mpsc::channel();
        let mut state = Self {
            settings,
            paths_dirty: false,
            case_number: String::new(),
            dumps: Vec::new(),
            selected_row: None,
            versions: Vec::new(),
            selected_version: String::new(),
            status_message: None,
            jobs_in_flight: 0,
            job_tx,
            job_rx,
            seen: HashSet::new(),
        };
        state.refresh_versions();
        state
    }

    /// Re-read the version list from the symbol root, keeping the selection
    /// when it still exists.
    pub fn refresh_versions(&mut self) {
        match versions::list_versions(self.settings.symbol_base()) {
            Ok(list) => {
                if !list.contains(&self.selected_version) {
                    self.selected_version = list.last().cloned().unwrap_or_default();
                }
                self.versions = list;
            }
            Err(err) => {
                error!(error = %err, "Failed to list symbol versions");
                self.status_message =
                    Some(StatusMessage::error(format!("Version listing failed: {err:#}")));
            }
        }
    }

    pub fn save_settings(&mut self) {
        match self.settings.save() {
            Ok(()) => {
                self.paths_dirty = false;
                self.status_message = Some(StatusMessage::success("Settings saved"));
            }
            Err(err) => {
                error!(error = %err, "Failed to save settings");
                self.status_message = Some(StatusMessage::error(format!("Save failed: {err:#}")));
            }
        }
    }

    /// Drop one row, letting the file reappear on a later scan.
    pub fn remove_entry(&mut self, index: usize) {
        if index >= self.dumps.len() {
            return;
        }
        let entry = self.dumps.remove(index);
        let canonical = entry.path.canonicalize().unwrap_or(entry.path);
        self.seen.remove(&canonical);

        self.selected_row = match self.selected_row {
            Some(row) if row == index => None,
            Some(row) if row > index => Some(row - 1),
            other => other,
        };
    }

    pub fn clear_table(&mut self) {
        self.dumps.clear();
        self.seen.clear();
        self.selected_row = None;
        self.status_message = None;
    }

    /// Resolve the case folder and scan it on a worker thread.
    pub fn start_scan(&mut self, picked_dir: Option<PathBuf>) {
        let settings = self.settings.clone();
        let case_number = self.case_number.trim().to_string();
        let mut seen = self.seen.clone();
        let tx = self.job_tx.clone();

        self.jobs_in_flight += 1;
        std::thread::spawn(move || {
            let result = scanner::resolve_case_dir(&settings, &case_number, picked_dir.as_deref())
                .and_then(|resolution| {
                    let outcome = scanner::scan_for_dumps(&resolution.dir, &mut seen)?;
                    let mut warnings = resolution.warnings;
                    warnings.extend(outcome.warnings);
                    Ok(ScanReport {
                        dumps: outcome.dumps,
                        seen,
                        warnings,
                    })
                });
            let _ = tx.send(JobResult::Scan(result));
        });
    }

    /// Open an async directory picker on a worker thread. The dialog future
    /// is driven by a current-thread tokio runtime inside that thread.
    pub fn open_folder_dialog(&mut self, purpose: DialogPurpose, title: &str) {
        let tx = self.job_tx.clone();
        let title = title.to_string();
        let initial_dir = self.dialog_start_dir(purpose);

        self.jobs_in_flight += 1;
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build Tokio runtime for dialog");

            let path = runtime.block_on(async {
                let mut dialog = rfd::AsyncFileDialog::new().set_title(&title);
                if let Some(dir) = initial_dir {
                    dialog = dialog.set_directory(dir);
                }
                dialog.pick_folder().await.map(|h| h.path().to_path_buf())
            });
            let _ = tx.send(JobResult::PickedPath { purpose, path });
        });
    }

    /// Open an async file picker filtered to dump files.
    pub fn open_dump_file_dialog(&mut self) {
        let tx = self.job_tx.clone();
        let initial_dir = self.dialog_start_dir(DialogPurpose::AddDumpFile);

        self.jobs_in_flight += 1;
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build Tokio runtime for dialog");

            let path = runtime.block_on(async {
                let mut dialog = rfd::AsyncFileDialog::new()
                    .set_title("Select a memory dump")
                    .add_filter("Dump files", &["dmp", "DMP"])
                    .add_filter("All files", &["*"]);
                if let Some(dir) = initial_dir {
                    dialog = dialog.set_directory(dir);
                }
                dialog.pick_file().await.map(|h| h.path().to_path_buf())
            });
            let _ = tx.send(JobResult::PickedPath {
                purpose: DialogPurpose::AddDumpFile,
                path,
            });
        });
    }

    fn dialog_start_dir(&self, purpose: DialogPurpose) -> Option<PathBuf> {
        let candidate = match purpose {
            DialogPurpose::CaseFolder | DialogPurpose::AddDumpFile => {
                PathBuf::from(&self.settings.dump_base_path)
            }
            DialogPurpose::PathSetting(field) => PathBuf::from(field.get(&self.settings)),
            DialogPurpose::SymbolOverride(_) => PathBuf::from(&self.settings.symbol_base_path),
        };
        candidate.is_dir().then_some(candidate)
    }

    /// Drain finished worker results. Called once per frame.
    pub fn poll_jobs(&mut self) {
        while let Ok(result) = self.job_rx.try_recv() {
            self.jobs_in_flight = self.jobs_in_flight.saturating_sub(1);
            match result {
                JobResult::Scan(Ok(report)) => self.apply_scan_report(report),
                JobResult::Scan(Err(err)) => {
                    warn!(error = %err, "Scan failed");
                    self.status_message = Some(StatusMessage::error(format!("{err:#}")));
                }
                JobResult::PickedPath { purpose, path } => self.apply_picked_path(purpose, path),
            }
        }
    }

    fn apply_scan_report(&mut self, report: ScanReport) {
        for warning in &report.warnings {
            warn!(warning = %warning, "Scan warning");
        }

        // The worker scanned against a snapshot of the seen-set; entries
        // added while it ran (add_dump_file, another scan) are only in ours.
        // Merge rather than replace, and drop report dumps we already have.
        let mut found = 0usize;
        for dump in report.dumps {
            let canonical = dump.path.canonicalize().unwrap_or_else(|_| dump.path.clone());
            if self.seen.insert(canonical) {
                self.dumps.push(dump);
                found += 1;
            }
        }
        self.seen.extend(report.seen);

        self.status_message = Some(if found == 0 {
            StatusMessage::warning("No new dumps found")
        } else if report.warnings.is_empty() {
            StatusMessage::success(format!("Found {found} dump(s)"))
        } else {
            StatusMessage::warning(format!(
                "Found {found} dump(s), {} file(s) skipped",
                report.warnings.len()
            ))
        });
    }

    fn apply_picked_path(&mut self, purpose: DialogPurpose, path: Option<PathBuf>) {
        let Some(path) = path else {
            // Dialog dismissed; leave whatever status was there
            return;
        };

        match purpose {
            DialogPurpose::CaseFolder => {
                self.case_number = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.start_scan(Some(path));
            }
            DialogPurpose::AddDumpFile => self.add_dump_file(path),
            DialogPurpose::PathSetting(field) => {
                *field.get_mut(&mut self.settings) = path.to_string_lossy().to_string();
                self.save_settings();
                if field == PathField::SymbolBase {
                    self.refresh_versions();
                }
            }
            DialogPurpose::SymbolOverride(index) => self.launch_entry(index, Some(path)),
        }
    }

    /// Append one individually picked dump file to the table.
    pub fn add_dump_file(&mut self, path: PathBuf) {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if !self.seen.insert(canonical) {
            self.status_message = Some(StatusMessage::warning(format!(
                "{} is already in the table",
                path.display()
            )));
            return;
        }

        info!(path = ?path, "Added individual dump");
        self.dumps.push(DumpEntry::from_path(path));
        self.status_message = Some(StatusMessage::success("Dump added"));
    }

    /// Launch the debugger for one table row. With no override the symbol
    /// path is resolved first; a missing resolution opens a picker so the
    /// user can point at the symbols manually (used for that launch only).
    pub fn launch_entry(&mut self, index: usize, symbol_override: Option<PathBuf>) {
        let Some(entry) = self.dumps.get(index).cloned() else {
            return;
        };

        let symbol_dir = match symbol_override {
            Some(dir) => dir,
            None => match symbols::resolve_symbol_path(
                &self.settings,
                &self.selected_version,
                entry.kind,
                entry.arch,
                entry.role,
            ) {
                Ok(SymbolResolution::Found(dir)) => dir,
                Ok(SymbolResolution::Missing(candidate)) => {
                    self.status_message = Some(StatusMessage::warning(format!(
                        "No symbols found at {}. Select the symbol folder to use.",
                        candidate.display()
                    )));
                    self.open_folder_dialog(
                        DialogPurpose::SymbolOverride(index),
                        "Select the symbol folder...",
                    );
                    return;
                }
                Err(err) => {
                    self.status_message =
                        Some(StatusMessage::error(format!("Symbol lookup failed: {err:#}")));
                    return;
                }
            },
        };

        let cap = self.settings.max_debugger_instances;
        let running = debugger::running_instances();
        if !debugger::can_spawn(running, cap) {
            self.status_message = Some(StatusMessage::warning(format!(
                "Instance limit reached ({cap}). Close some WinDbg instances before launching more."
            )));
            return;
        }

        match LaunchPlan::new(&self.settings, &entry, symbol_dir).launch() {
            Ok(_) => {
                self.status_message =
                    Some(StatusMessage::success(format!("Launched {}", entry.file_name())));
            }
            Err(err) => {
                error!(error = %err, dump = ?entry.path, "Debugger launch failed");
                self.status_message =
                    Some(StatusMessage::error(format!("Launch failed: {err:#}")));
            }
        }
    }

    /// Launch every dump in the table, skipping rows whose symbols cannot be
    /// resolved and stopping once the instance cap is hit.
    pub fn launch_all(&mut self) {
        if self.dumps.is_empty() {
            self.status_message = Some(StatusMessage::warning("No dumps selected"));
            return;
        }

        let cap = self.settings.max_debugger_instances;
        if debugger::batch_would_exceed(debugger::running_instances(), self.dumps.len(), cap) {
            warn!(cap, batch = self.dumps.len(), "Batch launch may exceed the instance cap");
            self.status_message = Some(StatusMessage::warning(format!(
                "Launching these dumps may exceed the instance limit ({cap}); instances will launch until the limit is reached."
            )));
        }

        let mut launched = 0usize;
        let mut skipped = Vec::new();

        for entry in self.dumps.clone() {
            let resolution = symbols::resolve_symbol_path(
                &self.settings,
                &self.selected_version,
                entry.kind,
                entry.arch,
                entry.role,
            );
            let symbol_dir = match resolution {
                Ok(SymbolResolution::Found(dir)) => dir,
                Ok(SymbolResolution::Missing(candidate)) => {
                    skipped.push(format!(
                        "{}: no symbols at {}",
                        entry.file_name(),
                        candidate.display()
                    ));
                    continue;
                }
                Err(err) => {
                    skipped.push(format!("{}: {err:#}", entry.file_name()));
                    continue;
                }
            };

            // Re-poll right before each spawn; the count may have moved
            if !debugger::can_spawn(debugger::running_instances(), cap) {
                self.status_message = Some(StatusMessage::warning(format!(
                    "Instance limit reached ({cap}); launched {launched} of {} dumps",
                    self.dumps.len()
                )));
                return;
            }

            match LaunchPlan::new(&self.settings, &entry, symbol_dir).launch() {
                Ok(_) => launched += 1,
                Err(err) => skipped.push(format!("{}: {err:#}", entry.file_name())),
            }
        }

        for line in &skipped {
            warn!(skipped = %line, "Dump skipped during batch launch");
        }

        self.status_message = Some(if skipped.is_empty() {
            StatusMessage::success(format!("Launched {launched} debugger instance(s)"))
        } else {
            StatusMessage::warning(format!(
                "Launched {launched} instance(s), skipped {}",
                skipped.len()
            ))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn state_with_dump_base(dir: &std::path::Path) -> SharedState {
        let mut settings = Settings::default();
        settings.dump_base_path = dir.to_string_lossy().to_string();
        SharedState::new(settings)
    }

    #[test]
    fn test_scan_job_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let case_dir = temp.path().join("1234");
        fs::create_dir_all(&case_dir).unwrap();
        fs::write(case_dir.join("crash.dmp"), b"dump").unwrap();

        let mut state = state_with_dump_base(temp.path());
        state.case_number = "1234".to_string();
        state.start_scan(None);

        // Wait for the worker to post its result
        let report = state.job_rx.recv().unwrap();
        state.jobs_in_flight = 0;
        match report {
            JobResult::Scan(Ok(report)) => {
                assert_eq!(report.dumps.len(), 1);
                state.apply_scan_report(report);
            }
            _ => panic!("expected successful scan"),
        }
        assert_eq!(state.dumps.len(), 1);
    }

    #[test]
    fn test_scan_job_unknown_case_is_error() {
        let temp = tempfile::tempdir().unwrap();
        let mut state = state_with_dump_base(temp.path());
        state.case_number = "does-not-exist".to_string();
        state.start_scan(None);

        match state.job_rx.recv().unwrap() {
            JobResult::Scan(result) => assert!(result.is_err()),
            _ => panic!("expected scan result"),
        }
    }

    #[test]
    fn test_scan_report_merges_with_concurrent_add() {
        let temp = tempfile::tempdir().unwrap();
        let case_dir = temp.path().join("1234");
        fs::create_dir_all(&case_dir).unwrap();
        let dump = case_dir.join("crash.dmp");
        fs::write(&dump, b"dump").unwrap();

        let mut state = state_with_dump_base(temp.path());
        state.case_number = "1234".to_string();
        state.start_scan(None);

        let JobResult::Scan(Ok(report)) = state.job_rx.recv().unwrap() else {
            panic!("expected successful scan");
        };

        // Same dump added by hand while the scan was in flight
        state.add_dump_file(dump);
        state.apply_scan_report(report);
        assert_eq!(state.dumps.len(), 1);

        // The merged seen-set still deduplicates the next scan
        state.start_scan(None);
        let JobResult::Scan(Ok(report)) = state.job_rx.recv().unwrap() else {
            panic!("expected successful scan");
        };
        state.apply_scan_report(report);
        assert_eq!(state.dumps.len(), 1);
    }

    #[test]
    fn test_add_dump_file_deduplicates() {
        let temp = tempfile::tempdir().unwrap();
        let dump = temp.path().join("crash.dmp");
        fs::write(&dump, b"dump").unwrap();

        let mut state = state_with_dump_base(temp.path());
        state.add_dump_file(dump.clone());
        state.add_dump_file(dump);

        assert_eq!(state.dumps.len(), 1);
    }

    #[test]
    fn test_remove_entry_allows_rediscovery() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("first.dmp");
        let second = temp.path().join("second.dmp");
        fs::write(&first, b"dump").unwrap();
        fs::write(&second, b"dump").unwrap();

        let mut state = state_with_dump_base(temp.path());
        state.add_dump_file(first.clone());
        state.add_dump_file(second);
        state.selected_row = Some(1);

        state.remove_entry(0);
        assert_eq!(state.dumps.len(), 1);
        assert_eq!(state.selected_row, Some(0));

        // Removed file is no longer considered seen
        state.add_dump_file(first);
        assert_eq!(state.dumps.len(), 2);
    }

    #[test]
    fn test_clear_table_resets_seen_set() {
        let temp = tempfile::tempdir().unwrap();
        let dump = temp.path().join("crash.dmp");
        fs::write(&dump, b"dump").unwrap();

        let mut state = state_with_dump_base(temp.path());
        state.add_dump_file(dump.clone());
        state.clear_table();
        assert!(state.dumps.is_empty());

        // Same file can be re-added after a clear
        state.add_dump_file(dump);
        assert_eq!(state.dumps.len(), 1);
    }

    #[test]
    fn test_picked_case_folder_sets_case_number() {
        let temp = tempfile::tempdir().unwrap();
        let picked = temp.path().join("cases/4242");
        fs::create_dir_all(&picked).unwrap();
        fs::write(picked.join("crash.dmp"), b"dump").unwrap();

        let mut state = state_with_dump_base(&temp.path().join("dumps"));
        fs::create_dir_all(temp.path().join("dumps")).unwrap();
        state.apply_picked_path(DialogPurpose::CaseFolder, Some(picked));

        assert_eq!(state.case_number, "4242");
        // A scan was kicked off for the staged folder
        match state.job_rx.recv().unwrap() {
            JobResult::Scan(Ok(report)) => assert_eq!(report.dumps.len(), 1),
            _ => panic!("expected successful scan"),
        }
    }

    #[test]
    fn test_path_field_accessors() {
        let mut settings = Settings::default();
        *PathField::DumpBase.get_mut(&mut settings) = "/srv/dumps".to_string();
        assert_eq!(PathField::DumpBase.get(&settings), "/srv/dumps");
        assert_eq!(PathField::WinDbg.label(), "WinDbg folder");
    }

    #[test]
    fn test_path_field_validity() {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.dump_base_path = temp.path().to_string_lossy().to_string();
        settings.symbol_base_path = "/nonexistent".to_string();

        assert!(PathField::DumpBase.is_valid(&settings));
        assert!(!PathField::SymbolBase.is_valid(&settings));
        // Default windbg dir does not exist on the test machine
        assert!(!PathField::WinDbg.is_valid(&settings));
    }
}
