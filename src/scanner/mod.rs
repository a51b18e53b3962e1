//! Case folder resolution and recursive dump discovery
//!
//! A case lives under `<dump_base>/<case_number>`, with a backup copy on the
//! support share. Discovery walks the case folder collecting `.dmp` files,
//! expanding `.zip` archives into sibling directories named after the archive
//! stem and recursing into the extracted content. A seen-set of canonical
//! paths keeps re-scans and nested archives from producing duplicates.

pub mod archive;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::config::Settings;
use crate::constants::scan;
use crate::types::DumpEntry;

use archive::{ensure_local, extract_archive};

/// Resolved case directory plus non-fatal problems hit along the way
#[derive(Debug)]
pub struct CaseResolution {
    pub dir: PathBuf,
    pub warnings: Vec<String>,
}

/// Result of one discovery pass
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub dumps: Vec<DumpEntry>,
    pub warnings: Vec<String>,
}

/// Locate (and if necessary stage) the local folder for a case.
///
/// If the user picked a folder elsewhere, its tree is copied into the primary
/// location first. If the primary is missing but the backup share has the
/// case, the backup is copied over. Copy failures are reported as warnings
/// and resolution continues with whatever exists on disk.
pub fn resolve_case_dir(
    settings: &Settings,
    case_number: &str,
    picked_dir: Option<&Path>,
) -> Result<CaseResolution> {
    if case_number.is_empty() {
        bail!("No case number given");
    }

    let primary = settings.dump_base().join(case_number);
    let secondary = Path::new(&settings.backup_dump_path).join(case_number);
    let mut warnings = Vec::new();

    if let Some(picked) = picked_dir
        && picked != primary
    {
        if let Err(err) = copy_dir_all(picked, &primary) {
            warn!(from = ?picked, to = ?primary, error = %err, "Failed to stage picked case folder");
            warnings.push(format!("Copy from {} failed: {err:#}", picked.display()));
        }
    }

    if !primary.is_dir() && secondary.is_dir() {
        info!(case = case_number, "Case missing locally, copying from backup share");
        if let Err(err) = copy_dir_all(&secondary, &primary) {
            warn!(from = ?secondary, to = ?primary, error = %err, "Failed to copy case from backup");
            warnings.push(format!("Copy from {} failed: {err:#}", secondary.display()));
        }
    }

    if primary.is_dir() {
        Ok(CaseResolution {
            dir: primary,
            warnings,
        })
    } else {
        bail!(
            "No dumps found in any path.\n{}\n{}",
            primary.display(),
            secondary.display()
        )
    }
}

/// Walk `case_dir` collecting dump files and expanding archives in place.
///
/// `seen` persists across scans so repeated "Get Dumps" clicks only surface
/// new files.
pub fn scan_for_dumps(case_dir: &Path, seen: &mut HashSet<PathBuf>) -> Result<ScanOutcome> {
    let mut outcome = ScanOutcome::default();
    walk(case_dir, seen, &mut outcome);
    info!(
        case_dir = ?case_dir,
        found = outcome.dumps.len(),
        warnings = outcome.warnings.len(),
        "Scan finished"
    );
    Ok(outcome)
}

fn walk(dir: &Path, seen: &mut HashSet<PathBuf>, outcome: &mut ScanOutcome) {
    // An unreadable directory (permissions, or an archive stem colliding
    // with a plain file) skips that subtree, never the whole scan.
    let listing = match fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(err) => {
            warn!(dir = ?dir, error = %err, "Skipping unreadable directory");
            outcome.warnings.push(format!("{}: {err}", dir.display()));
            return;
        }
    };

    // Snapshot the listing so directories created by extraction below are
    // only visited through the explicit recursion.
    let mut entries: Vec<PathBuf> = listing.filter_map(|e| e.ok().map(|e| e.path())).collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk(&path, seen, outcome);
            continue;
        }

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };

        if ext.eq_ignore_ascii_case(scan::DUMP_EXTENSION) {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if seen.insert(canonical) {
                outcome.dumps.push(DumpEntry::from_path(path));
            }
        } else if ext.eq_ignore_ascii_case(scan::ARCHIVE_EXTENSION) {
            let Some(stem) = path.file_stem() else {
                continue;
            };
            let extract_to = dir.join(stem);

            if !extract_to.exists() {
                match extract_archive(&path, &extract_to) {
                    Ok(report) => outcome.warnings.extend(
                        report
                            .skipped
                            .into_iter()
                            .map(|s| format!("{}: {s}", path.display())),
                    ),
                    Err(err) => {
                        warn!(archive = ?path, error = %err, "Failed to extract archive");
                        outcome
                            .warnings
                            .push(format!("{}: {err:#}", path.display()));
                        continue;
                    }
                }
            }

            walk(&extract_to, seen, outcome);
        }
    }
}

/// Recursive tree copy, merging into an existing destination (files are
/// overwritten). The destination must be a local path.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    ensure_local(dst)?;
    if !src.is_dir() {
        bail!("Not a directory: {}", src.display());
    }

    fs::create_dir_all(dst).with_context(|| format!("Failed to create {}", dst.display()))?;

    for entry in fs::read_dir(src).with_context(|| format!("Failed to read {}", src.display()))? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn make_case_tree(root: &Path) {
        fs::create_dir_all(root.join("session")).unwrap();
        fs::write(root.join("aps.dmp"), b"user dump").unwrap();
        fs::write(root.join("session/MEMORY.DMP"), b"kernel dump").unwrap();
        fs::write(root.join("notes.txt"), b"not a dump").unwrap();
    }

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_scan_collects_dumps_recursively() {
        let temp = tempfile::tempdir().unwrap();
        make_case_tree(temp.path());

        let mut seen = HashSet::new();
        let outcome = scan_for_dumps(temp.path(), &mut seen).unwrap();

        let names: Vec<&str> = outcome.dumps.iter().map(|d| d.file_name()).collect();
        assert_eq!(names, vec!["aps.dmp", "MEMORY.DMP"]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_scan_expands_nested_archives() {
        let temp = tempfile::tempdir().unwrap();
        let inner = zip_bytes(&[("deep.dmp", b"nested dump")]);
        let outer = zip_bytes(&[("upload.dmp", b"dump"), ("inner.zip", inner.as_slice())]);
        fs::write(temp.path().join("case.zip"), outer).unwrap();

        let mut seen = HashSet::new();
        let outcome = scan_for_dumps(temp.path(), &mut seen).unwrap();

        let mut names: Vec<&str> = outcome.dumps.iter().map(|d| d.file_name()).collect();
        names.sort();
        assert_eq!(names, vec!["deep.dmp", "upload.dmp"]);
        assert!(temp.path().join("case/inner").is_dir());
    }

    #[test]
    fn test_rescan_skips_already_seen_files() {
        let temp = tempfile::tempdir().unwrap();
        make_case_tree(temp.path());

        let mut seen = HashSet::new();
        let first = scan_for_dumps(temp.path(), &mut seen).unwrap();
        assert_eq!(first.dumps.len(), 2);

        let second = scan_for_dumps(temp.path(), &mut seen).unwrap();
        assert!(second.dumps.is_empty());

        // New file shows up on the next pass
        fs::write(temp.path().join("fresh.dmp"), b"new").unwrap();
        let third = scan_for_dumps(temp.path(), &mut seen).unwrap();
        assert_eq!(third.dumps.len(), 1);
    }

    #[test]
    fn test_scan_survives_stem_collision() {
        // A plain file sharing an archive's stem blocks extraction; the
        // subtree is skipped with a warning instead of aborting the scan.
        let temp = tempfile::tempdir().unwrap();
        let archive = zip_bytes(&[("inside.dmp", b"dump")]);
        fs::write(temp.path().join("upload.zip"), archive).unwrap();
        fs::write(temp.path().join("upload"), b"not a directory").unwrap();
        fs::write(temp.path().join("ok.dmp"), b"dump").unwrap();

        let mut seen = HashSet::new();
        let outcome = scan_for_dumps(temp.path(), &mut seen).unwrap();

        let names: Vec<&str> = outcome.dumps.iter().map(|d| d.file_name()).collect();
        assert_eq!(names, vec!["ok.dmp"]);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_scan_survives_corrupt_archive() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("broken.zip"), b"not really a zip").unwrap();
        fs::write(temp.path().join("ok.dmp"), b"dump").unwrap();

        let mut seen = HashSet::new();
        let outcome = scan_for_dumps(temp.path(), &mut seen).unwrap();

        assert_eq!(outcome.dumps.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_resolve_case_prefers_primary() {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.dump_base_path = temp.path().join("dumps").to_string_lossy().to_string();
        settings.backup_dump_path = temp.path().join("backup").to_string_lossy().to_string();
        fs::create_dir_all(temp.path().join("dumps/1234")).unwrap();

        let resolution = resolve_case_dir(&settings, "1234", None).unwrap();
        assert_eq!(resolution.dir, temp.path().join("dumps/1234"));
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_resolve_case_copies_from_backup() {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.dump_base_path = temp.path().join("dumps").to_string_lossy().to_string();
        settings.backup_dump_path = temp.path().join("backup").to_string_lossy().to_string();

        fs::create_dir_all(temp.path().join("backup/5678")).unwrap();
        fs::write(temp.path().join("backup/5678/crash.dmp"), b"dump").unwrap();

        let resolution = resolve_case_dir(&settings, "5678", None).unwrap();
        assert_eq!(resolution.dir, temp.path().join("dumps/5678"));
        assert!(resolution.dir.join("crash.dmp").exists());
    }

    #[test]
    fn test_resolve_case_stages_picked_folder() {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.dump_base_path = temp.path().join("dumps").to_string_lossy().to_string();
        settings.backup_dump_path = temp.path().join("backup").to_string_lossy().to_string();

        let picked = temp.path().join("elsewhere/9999");
        fs::create_dir_all(&picked).unwrap();
        fs::write(picked.join("crash.dmp"), b"dump").unwrap();

        let resolution = resolve_case_dir(&settings, "9999", Some(&picked)).unwrap();
        assert!(resolution.dir.join("crash.dmp").exists());
    }

    #[test]
    fn test_resolve_case_missing_everywhere() {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.dump_base_path = temp.path().join("dumps").to_string_lossy().to_string();
        settings.backup_dump_path = temp.path().join("backup").to_string_lossy().to_string();

        let err = resolve_case_dir(&settings, "0000", None).unwrap_err();
        assert!(err.to_string().contains("No dumps found"));
    }

    #[test]
    fn test_resolve_case_empty_number() {
        let settings = Settings::default();
        assert!(resolve_case_dir(&settings, "", None).is_err());
    }

    #[test]
    fn test_copy_dir_all_merges() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a.txt"), b"a").unwrap();
        fs::write(src.join("sub/b.txt"), b"b").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("existing.txt"), b"keep").unwrap();

        copy_dir_all(&src, &dst).unwrap();

        assert!(dst.join("a.txt").exists());
        assert!(dst.join("sub/b.txt").exists());
        assert!(dst.join("existing.txt").exists());
    }
}
