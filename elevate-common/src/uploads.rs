//! Uploads directory analysis
//!
//! The upload workflow stores files as `<millis>-<random>_<original name>`.
//! Re-uploading an already uploaded file stacks another prefix on top, so the
//! same asset can end up on disk several times under different names. This
//! module groups files by their original name to surface those duplicates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::Result;

/// One file in the uploads directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Files sharing the same original name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub base_name: String,
    pub files: Vec<UploadedFile>,
}

impl DuplicateGroup {
    /// Bytes that could be reclaimed by keeping only the newest copy
    pub fn redundant_bytes(&self) -> u64 {
        let newest = self.files.iter().max_by_key(|f| f.modified);
        let total: u64 = self.files.iter().map(|f| f.size_bytes).sum();
        total - newest.map_or(0, |f| f.size_bytes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateAnalysis {
    pub total_files: usize,
    pub duplicates: Vec<DuplicateGroup>,
}

/// Strip every leading `<digits>-<digits>_` upload prefix from a file name.
///
/// # Examples
///
/// ```
/// use elevate_common::uploads::original_name;
///
/// assert_eq!(
///     original_name("1759645895818-863657805_1744171745218-801987053_deepmedi.wav"),
///     "deepmedi.wav"
/// );
/// assert_eq!(original_name("cover.png"), "cover.png");
/// ```
pub fn original_name(file_name: &str) -> &str {
    let mut name = file_name;
    while let Some(rest) = strip_upload_prefix(name) {
        name = rest;
    }
    name
}

fn strip_upload_prefix(name: &str) -> Option<&str> {
    let (stamp, rest) = name.split_once('_')?;
    let (millis, random) = stamp.split_once('-')?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if all_digits(millis) && all_digits(random) && !rest.is_empty() {
        Some(rest)
    } else {
        None
    }
}

/// Group the regular files directly inside `dir` by original name and return
/// the groups holding more than one file.
///
/// Groups are sorted by base name; files within a group oldest first.
pub fn analyze_duplicates(dir: &Path) -> Result<DuplicateAnalysis> {
    let mut groups: BTreeMap<String, Vec<UploadedFile>> = BTreeMap::new();
    let mut total_files = 0;

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry.metadata().map_err(std::io::Error::from)?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let base_name = original_name(&file_name).to_string();

        total_files += 1;
        groups.entry(base_name).or_default().push(UploadedFile {
            file_name,
            path: entry.path().to_path_buf(),
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        });
    }

    let duplicates: Vec<DuplicateGroup> = groups
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(base_name, mut files)| {
            files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.file_name.cmp(&b.file_name)));
            DuplicateGroup { base_name, files }
        })
        .collect();

    debug!(dir = %dir.display(), total_files, groups = duplicates.len(), "Analyzed uploads directory");

    Ok(DuplicateAnalysis {
        total_files,
        duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_original_name_strips_stacked_prefixes() {
        assert_eq!(
            original_name("1759645696973-485761936_1743967747415-583304618_Kya-Dil-Ne-Kaha.mp3"),
            "Kya-Dil-Ne-Kaha.mp3"
        );
        assert_eq!(original_name("1745716639415-502869343_12Hz.png"), "12Hz.png");
    }

    #[test]
    fn test_original_name_leaves_other_names_alone() {
        assert_eq!(original_name("963-and-2hz_sleep.wav"), "963-and-2hz_sleep.wav");
        assert_eq!(original_name("1759-_x.wav"), "1759-_x.wav");
        assert_eq!(original_name("1759-123_"), "1759-123_");
    }

    #[test]
    fn test_analyze_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        fs::write(dir.join("1759645895818-863657805_deepmedi.wav"), b"aaaa").unwrap();
        fs::write(dir.join("1759653482431-642056432_1759645895818-863657805_deepmedi.wav"), b"aaaa").unwrap();
        fs::write(dir.join("1745716639415-502869343_12Hz.png"), b"png").unwrap();
        fs::create_dir(dir.join("nested")).unwrap();
        fs::write(dir.join("nested").join("1-2_deepmedi.wav"), b"ignored").unwrap();

        let analysis = analyze_duplicates(dir).unwrap();
        assert_eq!(analysis.total_files, 3);
        assert_eq!(analysis.duplicates.len(), 1);

        let group = &analysis.duplicates[0];
        assert_eq!(group.base_name, "deepmedi.wav");
        assert_eq!(group.files.len(), 2);
        assert_eq!(group.redundant_bytes(), 4);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(analyze_duplicates(&temp_dir.path().join("absent")).is_err());
    }
}
