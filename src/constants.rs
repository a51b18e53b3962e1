//! Application-wide constants
//!
//! Single source of truth for magic values: default paths, the symbol rule
//! table fragments, and GUI layout/colors.

/// Configuration paths and filenames
pub mod config {
    /// Application directory name under the platform config dir
    pub const APP_DIR: &str = "dump-triage";

    /// Configuration filename
    pub const FILENAME: &str = "config.json";

    /// Environment variable overriding the config directory (used by tests)
    pub const DIR_ENV_VAR: &str = "DUMP_TRIAGE_CONFIG_DIR";
}

/// Debugger invocation constants
pub mod debugger {
    /// Executable name looked for inside the configured install directory
    pub const WINDBG_EXE: &str = "windbg.exe";

    /// Default WinDbg install directory on a stock Windows SDK setup
    pub const DEFAULT_WINDBG_DIR: &str =
        "C:\\Program Files (x86)\\Windows Kits\\10\\Debuggers\\x64";

    /// Analysis command passed to every WinDbg instance
    pub const ANALYZE_COMMAND: &str = "!analyze -v";

    /// Default ceiling on concurrently running WinDbg processes
    pub const DEFAULT_MAX_INSTANCES: u32 = 10;
}

/// Well-known network share locations
pub mod shares {
    /// Default backup share holding uploaded case folders
    pub const BACKUP_DUMP_PATH: &str = "//supportnas.graphon.com/support/Cases";

    /// Default backup share holding archived build output (symbols)
    pub const BACKUP_SYMBOL_PATH: &str = "//qnapnas.graphon.com/Builds/";
}

/// Dump discovery constants
pub mod scan {
    /// Extension of memory dump files (matched case-insensitively)
    pub const DUMP_EXTENSION: &str = "dmp";

    /// Extension of archives expanded during discovery
    pub const ARCHIVE_EXTENSION: &str = "zip";

    /// File name that marks a kernel dump (matched case-insensitively)
    pub const KERNEL_DUMP_NAME: &str = "MEMORY.DMP";
}

/// Symbol rule table fragments
pub mod symbols {
    /// Subdirectory holding kernel-mode driver symbols under a version root
    pub const KERNEL_SUBDIR: &str = "AttestationSigning_DisplayAudioDriver/DisplayDriver";

    /// Build output directory for 64-bit user-mode components
    pub const ARCH_DIR_X64: &str = "devKit-x64Release";

    /// Build output directory for 32-bit user-mode components
    pub const ARCH_DIR_X86: &str = "devKit-Win32Release";

    /// Fixed path segment between the arch directory and the role directory
    pub const RELEASE_SEGMENT: &str = "Release";

    /// Width of the build-number buckets on the backup share (e.g. 2300-2399)
    pub const BUILD_BUCKET_SIZE: u32 = 100;
}

/// GUI-specific constants (egui window)
pub mod gui {
    /// Main window dimensions
    pub const WINDOW_WIDTH: f32 = 860.0;
    pub const WINDOW_HEIGHT: f32 = 560.0;

    /// Layout spacing
    pub const SECTION_SPACING: f32 = 12.0;

    /// Alert level colors
    pub const COLOR_SUCCESS: egui::Color32 = egui::Color32::from_rgb(100, 200, 100);
    pub const COLOR_WARNING: egui::Color32 = egui::Color32::from_rgb(255, 200, 0);
    pub const COLOR_ERROR: egui::Color32 = egui::Color32::from_rgb(200, 100, 100);

    /// Repaint interval while background jobs are in flight
    pub const JOB_POLL_INTERVAL_MS: u64 = 200;
}
