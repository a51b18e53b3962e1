//! Product version handling
//!
//! Versions are directory names under the symbol root, normally of the form
//! `major.minor.patch.build`. The backup share buckets builds into ranges of
//! one hundred (`.../6.2.1/2300-2399/6.2.1.2301`).

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::constants::symbols::BUILD_BUCKET_SIZE;

/// A version split into its release prefix and numeric build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVersion {
    /// `major.minor.patch`
    pub release: String,
    pub build: u32,
}

/// Parse `a.b.c.build` with exactly four numeric parts.
pub fn parse_build_version(version: &str) -> Option<BuildVersion> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    for part in &parts[..3] {
        part.parse::<u32>().ok()?;
    }
    let build = parts[3].parse::<u32>().ok()?;
    Some(BuildVersion {
        release: parts[..3].join("."),
        build,
    })
}

/// Build-number bucket directory name on the backup share, e.g. `2300-2399`.
pub fn build_bucket(build: u32) -> String {
    let lo = (build / BUILD_BUCKET_SIZE) * BUILD_BUCKET_SIZE;
    format!("{lo}-{}", lo + BUILD_BUCKET_SIZE - 1)
}

/// Expected location of a version on the backup share, or `None` when the
/// version string does not follow the four-part scheme.
pub fn backup_version_dir(backup_root: &Path, version: &str) -> Option<PathBuf> {
    let parsed = parse_build_version(version)?;
    Some(
        backup_root
            .join(&parsed.release)
            .join(build_bucket(parsed.build))
            .join(version),
    )
}

/// Subdirectory names of the symbol root, sorted for display.
/// A missing root yields an empty list rather than an error.
pub fn list_versions(symbol_base: &Path) -> Result<Vec<String>> {
    if !symbol_base.is_dir() {
        return Ok(Vec::new());
    }

    let mut versions = Vec::new();
    for entry in fs::read_dir(symbol_base)
        .with_context(|| format!("Failed to read {}", symbol_base.display()))?
    {
        let entry = entry?;
        if entry.path().is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            versions.push(name.to_string());
        }
    }

    sort_versions(&mut versions);
    versions.dedup();
    Ok(versions)
}

/// Sort versions numerically where possible: well-formed dotted-integer
/// versions come first in numeric order, everything else follows
/// alphabetically.
pub fn sort_versions(versions: &mut [String]) {
    fn numeric_parts(version: &str) -> Option<Vec<u64>> {
        version.split('.').map(|p| p.parse::<u64>().ok()).collect()
    }

    versions.sort_by(|a, b| match (numeric_parts(a), numeric_parts(b)) {
        (Some(pa), Some(pb)) => pa.cmp(&pb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_version_valid() {
        let parsed = parse_build_version("6.2.1.2301").unwrap();
        assert_eq!(parsed.release, "6.2.1");
        assert_eq!(parsed.build, 2301);
    }

    #[test]
    fn test_parse_build_version_rejects_malformed() {
        assert!(parse_build_version("6.2.1").is_none());
        assert!(parse_build_version("6.2.1.2301.9").is_none());
        assert!(parse_build_version("6.2.x.2301").is_none());
        assert!(parse_build_version("").is_none());
    }

    #[test]
    fn test_build_bucket_ranges() {
        assert_eq!(build_bucket(2301), "2300-2399");
        assert_eq!(build_bucket(2300), "2300-2399");
        assert_eq!(build_bucket(99), "0-99");
        assert_eq!(build_bucket(100), "100-199");
    }

    #[test]
    fn test_backup_version_dir_layout() {
        let dir = backup_version_dir(Path::new("/builds"), "6.2.1.2301").unwrap();
        assert_eq!(dir, Path::new("/builds/6.2.1/2300-2399/6.2.1.2301"));

        assert!(backup_version_dir(Path::new("/builds"), "nightly").is_none());
    }

    #[test]
    fn test_sort_versions_numeric_before_lexical() {
        let mut versions = vec![
            "banana".to_string(),
            "6.10.0.100".to_string(),
            "6.2.1.2301".to_string(),
            "6.9.1.50".to_string(),
        ];
        sort_versions(&mut versions);
        assert_eq!(versions, vec!["6.2.1.2301", "6.9.1.50", "6.10.0.100", "banana"]);
    }

    #[test]
    fn test_list_versions_dirs_only() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("6.2.1.2301")).unwrap();
        fs::create_dir(temp.path().join("6.2.0.1800")).unwrap();
        fs::write(temp.path().join("readme.txt"), b"").unwrap();

        let versions = list_versions(temp.path()).unwrap();
        assert_eq!(versions, vec!["6.2.0.1800", "6.2.1.2301"]);
    }

    #[test]
    fn test_list_versions_missing_root() {
        let versions = list_versions(Path::new("/nonexistent/symbols")).unwrap();
        assert!(versions.is_empty());
    }
}
