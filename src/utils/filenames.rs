//! Filename hygiene for record files.
//!
//! Record file names are assembled from user-provided strings (chip name,
//! device id/type, measurement name) and must end up portable across
//! filesystems, and must never overwrite an earlier record.

use std::fs;
use std::path::{Path, PathBuf};

/// Reduce an arbitrary string to a portable file name fragment.
///
/// Keeps ASCII alphanumerics, underscores and hyphens; runs of whitespace
/// and hyphens collapse into a single hyphen; everything else is dropped.
pub fn make_filename_compliant(value: &str) -> String {
    let filtered: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut out = String::with_capacity(filtered.len());
    let mut pending_separator = false;
    for c in filtered.trim().chars() {
        if c == '-' || c.is_whitespace() {
            pending_separator = true;
        } else {
            if pending_separator {
                out.push('-');
                pending_separator = false;
            }
            out.push(c);
        }
    }
    out
}

/// Make a desired file stem unique against files already on disk.
///
/// `desired` is a path without extension; if any existing file in its parent
/// directory starts with the same stem, `_2`, `_3`, ... is appended until no
/// such file exists.
pub fn uniquify_file_stem(desired: &Path) -> PathBuf {
    if !stem_collides(desired) {
        return desired.to_path_buf();
    }
    let mut idx: u32 = 2;
    loop {
        let candidate = PathBuf::from(format!("{}_{}", desired.display(), idx));
        if !stem_collides(&candidate) {
            return candidate;
        }
        idx += 1;
    }
}

fn stem_collides(stem: &Path) -> bool {
    let parent = match stem.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let prefix = match stem.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };
    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(_) => return false,
    };
    for entry in entries.flatten() {
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(prefix) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliant_keeps_word_characters() {
        assert_eq!(make_filename_compliant("Chip1_idA_laser"), "Chip1_idA_laser");
    }

    #[test]
    fn compliant_collapses_spaces_and_hyphens() {
        assert_eq!(
            make_filename_compliant("  my chip -- sweep  "),
            "my-chip-sweep"
        );
    }

    #[test]
    fn compliant_drops_non_ascii_and_punctuation() {
        assert_eq!(make_filename_compliant("läser/01: (fast)"), "lser01-fast");
    }

    #[test]
    fn uniquify_returns_input_when_no_collision() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("record_a");
        assert_eq!(uniquify_file_stem(&stem), stem);
    }

    #[test]
    fn uniquify_appends_counter_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("record_a");
        std::fs::write(dir.path().join("record_a.json"), b"{}").unwrap();
        let unique = uniquify_file_stem(&stem);
        assert_eq!(unique, dir.path().join("record_a_2"));

        std::fs::write(dir.path().join("record_a_2.json.part"), b"{}").unwrap();
        let unique = uniquify_file_stem(&stem);
        assert_eq!(unique, dir.path().join("record_a_3"));
    }
}
