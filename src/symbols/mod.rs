//! Debug-symbol path resolution
//!
//! Maps a dump classification plus product version onto the directory of
//! matching symbols under the configured symbol root. Missing versions are
//! fetched from the backup build share when present; anything still missing
//! is reported back so the GUI can offer an interactive override.

pub mod versions;

use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::config::Settings;
use crate::constants::symbols;
use crate::scanner::archive::unzip_in_place;
use crate::scanner::copy_dir_all;
use crate::types::{AppArch, AppRole, DumpKind};

/// Outcome of a resolution attempt. `Missing` carries the candidate path so
/// the caller can show it and offer a manual override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolResolution {
    Found(PathBuf),
    Missing(PathBuf),
}

/// The rule table: relative symbol subdirectory for a classification.
///
/// Kernel dumps always use the signed driver output. User dumps pick the
/// build flavor from the architecture and the client/server directory from
/// the role, both of which must be present.
pub fn rule_subpath(
    kind: DumpKind,
    arch: Option<AppArch>,
    role: Option<AppRole>,
) -> Result<PathBuf> {
    match kind {
        DumpKind::Kernel => Ok(PathBuf::from(symbols::KERNEL_SUBDIR)),
        DumpKind::User => {
            let (Some(arch), Some(role)) = (arch, role) else {
                bail!("User dump classification is incomplete (architecture or location missing)");
            };
            let arch_dir = match arch {
                AppArch::X64 => symbols::ARCH_DIR_X64,
                AppArch::X86 => symbols::ARCH_DIR_X86,
            };
            Ok(PathBuf::from(arch_dir)
                .join(symbols::RELEASE_SEGMENT)
                .join(role.dir_name()))
        }
    }
}

/// Resolve the symbol directory for one dump.
///
/// Checks the local symbol root first (expanding any zipped symbol bundles
/// in place), then tries to stage the version from the backup share and
/// checks again.
pub fn resolve_symbol_path(
    settings: &Settings,
    version: &str,
    kind: DumpKind,
    arch: Option<AppArch>,
    role: Option<AppRole>,
) -> Result<SymbolResolution> {
    if version.is_empty() {
        bail!("No version selected");
    }

    let rule = rule_subpath(kind, arch, role)?;
    let candidate = settings.symbol_base().join(version).join(&rule);

    if unzip_in_place(&candidate)? {
        return Ok(SymbolResolution::Found(candidate));
    }

    if fetch_version_from_backup(settings, version)? && unzip_in_place(&candidate)? {
        return Ok(SymbolResolution::Found(candidate));
    }

    Ok(SymbolResolution::Missing(candidate))
}

/// Copy `<backup>/<release>/<bucket>/<version>` into the local symbol root.
/// Returns whether anything was staged.
fn fetch_version_from_backup(settings: &Settings, version: &str) -> Result<bool> {
    let backup_root = PathBuf::from(&settings.backup_symbol_path);
    let Some(expected) = versions::backup_version_dir(&backup_root, version) else {
        warn!(version, "Version does not follow the x.x.x.xxxxx scheme, skipping backup lookup");
        return Ok(false);
    };

    if !expected.is_dir() {
        return Ok(false);
    }

    let destination = settings.symbol_base().join(version);
    info!(from = ?expected, to = ?destination, "Staging symbols from backup share");
    copy_dir_all(&expected, &destination)?;
    Ok(true)
}
