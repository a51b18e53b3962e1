//! Zip extraction with per-entry fallback
//!
//! The high-level `zip` reader handles stored/deflate/bzip2/lzma entries.
//! Case uploads occasionally contain archives with odd or damaged entries,
//! so when the high-level path fails for one entry we retry by decompressing
//! the raw entry bytes manually. A failing entry is skipped and reported,
//! never fatal for the rest of the archive.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::constants::scan;
use crate::types::is_network_path;

/// Outcome of extracting one archive
#[derive(Debug, Default)]
pub struct ExtractReport {
    pub extracted: usize,
    /// Entry names that could not be extracted, with the reason
    pub skipped: Vec<String>,
}

/// Refuse destructive filesystem operations on network shares.
pub fn ensure_local(path: &Path) -> Result<()> {
    if is_network_path(path) {
        bail!("Operation not allowed on network path: {}", path.display());
    }
    Ok(())
}

/// Extract `zip_path` into `extract_to`, creating it if needed.
pub fn extract_archive(zip_path: &Path, extract_to: &Path) -> Result<ExtractReport> {
    ensure_local(zip_path)?;
    ensure_local(extract_to)?;

    let file = fs::File::open(zip_path)
        .with_context(|| format!("Failed to open archive {}", zip_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Not a valid zip archive: {}", zip_path.display()))?;

    fs::create_dir_all(extract_to)
        .with_context(|| format!("Failed to create {}", extract_to.display()))?;

    let mut report = ExtractReport::default();

    for index in 0..archive.len() {
        let (entry_name, target, is_dir, method) = {
            let entry = archive
                .by_index_raw(index)
                .with_context(|| format!("Failed to read entry {index} of {zip_path:?}"))?;
            let name = entry.name().to_string();
            // enclosed_name rejects entries that would escape the target dir
            let Some(relative) = entry.enclosed_name() else {
                warn!(entry = %name, archive = ?zip_path, "Skipping entry with unsafe path");
                report.skipped.push(format!("{name}: unsafe path"));
                continue;
            };
            (name, extract_to.join(relative), entry.is_dir(), entry.compression())
        };

        if is_dir {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        match extract_entry(&mut archive, index, &target) {
            Ok(()) => report.extracted += 1,
            Err(err) => {
                debug!(entry = %entry_name, error = %err, "High-level extraction failed, trying manual decompression");
                match extract_entry_manual(&mut archive, index, method, &target) {
                    Ok(()) => report.extracted += 1,
                    Err(manual_err) => {
                        warn!(
                            entry = %entry_name,
                            archive = ?zip_path,
                            error = %manual_err,
                            "Could not extract entry, skipping"
                        );
                        report.skipped.push(format!("{entry_name}: {manual_err}"));
                    }
                }
            }
        }
    }

    debug!(
        archive = ?zip_path,
        extracted = report.extracted,
        skipped = report.skipped.len(),
        "Archive extracted"
    );
    Ok(report)
}

/// Extract one entry through the decompressing reader.
fn extract_entry<R: Read + io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    index: usize,
    target: &Path,
) -> Result<()> {
    let mut entry = archive.by_index(index)?;
    let mut out = fs::File::create(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    io::copy(&mut entry, &mut out)?;
    Ok(())
}

/// Fallback: read the raw compressed bytes and decompress them by hand.
/// Covers stored, deflate and bzip2 entries; anything else is unsupported.
fn extract_entry_manual<R: Read + io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    index: usize,
    method: zip::CompressionMethod,
    target: &Path,
) -> Result<()> {
    let mut raw = Vec::new();
    archive.by_index_raw(index)?.read_to_end(&mut raw)?;

    let data = match method {
        zip::CompressionMethod::Stored => raw,
        zip::CompressionMethod::Deflated => {
            let mut decoded = Vec::new();
            flate2::read::DeflateDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
            decoded
        }
        zip::CompressionMethod::Bzip2 => {
            let mut decoded = Vec::new();
            bzip2::read::BzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
            decoded
        }
        other => bail!("Unsupported compression method: {other:?}"),
    };

    fs::write(target, data).with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}

/// Expand every zip archive sitting directly in `dir` into `dir` itself.
/// Returns whether the directory exists at all. Used on resolved symbol
/// directories, where build output ships as zipped pdb bundles.
pub fn unzip_in_place(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    ensure_local(dir)?;

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(scan::ARCHIVE_EXTENSION));
        if path.is_file() && is_zip {
            if let Err(err) = extract_archive(&path, dir) {
                warn!(archive = ?path, error = %err, "Failed to expand symbol archive");
            }
        }
    }
    Ok(true)
}
