//! Domain types for dump classification
//!
//! A discovered dump carries three categorical fields shown in the table UI.
//! Kernel dumps have no meaningful architecture or client/server role, so the
//! type makes those fields `Option` and the setters enforce the pairing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::scan;

/// User-mode or kernel-mode memory dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpKind {
    User,
    Kernel,
}

impl DumpKind {
    pub const ALL: &[DumpKind] = &[DumpKind::User, DumpKind::Kernel];

    pub fn label(self) -> &'static str {
        match self {
            DumpKind::User => "User",
            DumpKind::Kernel => "Kernel",
        }
    }
}

/// Process architecture of the faulting application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppArch {
    X64,
    X86,
}

impl AppArch {
    pub const ALL: &[AppArch] = &[AppArch::X64, AppArch::X86];

    pub fn label(self) -> &'static str {
        match self {
            AppArch::X64 => "64-bit",
            AppArch::X86 => "32-bit",
        }
    }
}

/// Whether the faulting component ran on the client or the server side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppRole {
    Client,
    Server,
}

impl AppRole {
    pub const ALL: &[AppRole] = &[AppRole::Client, AppRole::Server];

    pub fn label(self) -> &'static str {
        match self {
            AppRole::Client => "Client",
            AppRole::Server => "Server",
        }
    }

    /// Lowercase directory name used by the symbol rule table
    pub fn dir_name(self) -> &'static str {
        match self {
            AppRole::Client => "client",
            AppRole::Server => "server",
        }
    }
}

/// Placeholder shown in table cells that do not apply to the current kind
pub const FIELD_PLACEHOLDER: &str = "-";

/// A discovered dump file plus its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpEntry {
    pub path: PathBuf,
    pub kind: DumpKind,
    /// `None` for kernel dumps (shown as `-`)
    pub arch: Option<AppArch>,
    /// `None` for kernel dumps (shown as `-`)
    pub role: Option<AppRole>,
}

impl DumpEntry {
    /// Classify a freshly discovered file. `MEMORY.DMP` is a kernel dump,
    /// everything else defaults to a 64-bit server-side user dump.
    pub fn from_path(path: PathBuf) -> Self {
        let is_kernel = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(scan::KERNEL_DUMP_NAME));

        if is_kernel {
            Self {
                path,
                kind: DumpKind::Kernel,
                arch: None,
                role: None,
            }
        } else {
            Self {
                path,
                kind: DumpKind::User,
                arch: Some(AppArch::X64),
                role: Some(AppRole::Server),
            }
        }
    }

    /// Change the dump kind, keeping the arch/role fields consistent:
    /// Kernel clears them, User restores the defaults if they were cleared.
    pub fn set_kind(&mut self, kind: DumpKind) {
        self.kind = kind;
        match kind {
            DumpKind::Kernel => {
                self.arch = None;
                self.role = None;
            }
            DumpKind::User => {
                if self.arch.is_none() {
                    self.arch = Some(AppArch::X64);
                }
                if self.role.is_none() {
                    self.role = Some(AppRole::Server);
                }
            }
        }
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<invalid name>")
    }

    pub fn arch_label(&self) -> &'static str {
        self.arch.map_or(FIELD_PLACEHOLDER, AppArch::label)
    }

    pub fn role_label(&self) -> &'static str {
        self.role.map_or(FIELD_PLACEHOLDER, AppRole::label)
    }
}

/// True for UNC-style network paths (`//share/...` or `\\share\...`).
/// Extraction and tree copies refuse to touch these.
pub fn is_network_path(path: &Path) -> bool {
    let text = path.to_string_lossy();
    text.starts_with("//") || text.starts_with("\\\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_dump_detected_by_name() {
        let entry = DumpEntry::from_path(PathBuf::from("/cases/1234/MEMORY.DMP"));
        assert_eq!(entry.kind, DumpKind::Kernel);
        assert!(entry.arch.is_none());
        assert!(entry.role.is_none());
        assert_eq!(entry.arch_label(), "-");
        assert_eq!(entry.role_label(), "-");
    }

    #[test]
    fn test_kernel_dump_name_case_insensitive() {
        let entry = DumpEntry::from_path(PathBuf::from("/cases/1234/memory.dmp"));
        assert_eq!(entry.kind, DumpKind::Kernel);
    }

    #[test]
    fn test_user_dump_defaults() {
        let entry = DumpEntry::from_path(PathBuf::from("/cases/1234/aps.dmp"));
        assert_eq!(entry.kind, DumpKind::User);
        assert_eq!(entry.arch, Some(AppArch::X64));
        assert_eq!(entry.role, Some(AppRole::Server));
        assert_eq!(entry.file_name(), "aps.dmp");
    }

    #[test]
    fn test_set_kind_kernel_clears_fields() {
        let mut entry = DumpEntry::from_path(PathBuf::from("crash.dmp"));
        entry.set_kind(DumpKind::Kernel);
        assert!(entry.arch.is_none());
        assert!(entry.role.is_none());
    }

    #[test]
    fn test_set_kind_user_restores_defaults() {
        let mut entry = DumpEntry::from_path(PathBuf::from("MEMORY.DMP"));
        entry.set_kind(DumpKind::User);
        assert_eq!(entry.arch, Some(AppArch::X64));
        assert_eq!(entry.role, Some(AppRole::Server));
    }

    #[test]
    fn test_labels() {
        assert_eq!(DumpKind::User.label(), "User");
        assert_eq!(AppArch::X86.label(), "32-bit");
        assert_eq!(AppRole::Client.dir_name(), "client");
    }

    #[test]
    fn test_network_path_detection() {
        assert!(is_network_path(Path::new("//supportnas/support/Cases")));
        assert!(is_network_path(Path::new("\\\\qnapnas\\Builds")));
        assert!(!is_network_path(Path::new("/home/user/dumps")));
        assert!(!is_network_path(Path::new("C:\\dumps")));
    }
}
