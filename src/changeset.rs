// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Working-set resolution through glob algebra.
//!
//! Every orapack operation works on a set of files selected by glob
//! patterns. A pattern list mixes positive patterns with negated patterns
//! prefixed by `!`. A path belongs to the set when it matches at least one
//! positive pattern and no negated pattern.
//!
//! The set can be resolved two ways. [`expand`] walks the real file system
//! and is used when an operation targets the whole project. [`intersect`]
//! filters an already known candidate list, e.g. the changed-file paths a
//! version-control diff produced, without touching the file system at all.
//!
//! All matching is case-insensitive, and every returned path is normalized
//! to `./`-rooted POSIX form so downstream classification sees one spelling
//! per file.

use crate::pattern::MATCH_OPTIONS;

use glob::{glob_with, Pattern};
use tracing::debug;

/// Resolve glob patterns against the real file system.
///
/// Positive patterns are expanded on disk, negated patterns filter the
/// expansion. The result is deduplicated, sorted, and `./`-rooted.
///
/// # Errors
///
/// - Return [`ChangeSetError::BadPattern`] if any pattern fails to parse.
pub fn expand(patterns: &[impl AsRef<str>]) -> Result<Vec<String>> {
    let (positive, negative) = split_patterns(patterns)?;

    let mut paths = Vec::new();
    for pattern in &positive {
        let walk =
            glob_with(pattern.as_str(), MATCH_OPTIONS).map_err(|source| {
                ChangeSetError::BadPattern {
                    pattern: pattern.as_str().to_string(),
                    source,
                }
            })?;

        for entry in walk.flatten() {
            if entry.is_file() {
                paths.push(rooted(&entry.to_string_lossy().replace('\\', "/")));
            }
        }
    }

    paths.retain(|path| !matches_any(&negative, path));
    paths.sort();
    paths.dedup();

    debug!("expanded {} patterns into {} paths", patterns.len(), paths.len());
    Ok(paths)
}

/// Filter a candidate path list through glob patterns.
///
/// Pure set algebra over the given candidates. The file system is never
/// consulted, so candidates may name files that no longer exist. Candidate
/// order is preserved.
///
/// # Errors
///
/// - Return [`ChangeSetError::BadPattern`] if any pattern fails to parse.
pub fn intersect(
    patterns: &[impl AsRef<str>],
    candidates: &[impl AsRef<str>],
) -> Result<Vec<String>> {
    let (positive, negative) = split_patterns(patterns)?;

    Ok(candidates
        .iter()
        .map(|candidate| rooted(&candidate.as_ref().replace('\\', "/")))
        .filter(|path| matches_any(&positive, path) && !matches_any(&negative, path))
        .collect())
}

/// Whether the patterns select exactly the given candidates.
///
/// Compares the intersection element-for-element against the candidate
/// list, so order matters. Callers wanting order-independence must sort
/// both sides themselves first.
///
/// # Errors
///
/// - Return [`ChangeSetError::BadPattern`] if any pattern fails to parse.
pub fn set_equals(
    patterns: &[impl AsRef<str>],
    candidates: &[impl AsRef<str>],
) -> Result<bool> {
    let selected = intersect(patterns, candidates)?;
    let normalized: Vec<String> = candidates
        .iter()
        .map(|candidate| rooted(&candidate.as_ref().replace('\\', "/")))
        .collect();

    Ok(selected == normalized)
}

fn split_patterns(patterns: &[impl AsRef<str>]) -> Result<(Vec<Pattern>, Vec<Pattern>)> {
    let mut positive = Vec::new();
    let mut negative = Vec::new();

    for pattern in patterns {
        let raw = pattern.as_ref();
        let (bucket, body) = match raw.strip_prefix('!') {
            Some(body) => (&mut negative, body),
            None => (&mut positive, raw),
        };

        let compiled = Pattern::new(body).map_err(|source| ChangeSetError::BadPattern {
            pattern: raw.to_string(),
            source,
        })?;
        bucket.push(compiled);
    }

    Ok((positive, negative))
}

fn matches_any(patterns: &[Pattern], path: &str) -> bool {
    // Globs written without the ./ prefix still have to hit rooted paths.
    let bare = path.strip_prefix("./").unwrap_or(path);
    patterns.iter().any(|pattern| {
        pattern.matches_with(path, MATCH_OPTIONS) || pattern.matches_with(bare, MATCH_OPTIONS)
    })
}

fn rooted(path: &str) -> String {
    let mut path = path;
    while let Some(stripped) = path.strip_prefix("./") {
        path = stripped;
    }
    let path = path.trim_start_matches('/');
    format!("./{path}")
}

/// Change-set resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum ChangeSetError {
    /// Glob pattern fails to parse.
    #[error("glob pattern {pattern:?} fails to parse")]
    BadPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ChangeSetError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs;

    #[test]
    fn intersect_applies_negated_patterns() {
        let result = intersect(
            &["./test/src/**/*.sql", "!./test/src/FUNCTIONS/*.sql"],
            &["./test/src/FUNCTIONS/FUNC_TEST1.sql"],
        )
        .unwrap();
        assert_eq!(result, Vec::<String>::new());
    }

    #[test]
    fn intersect_keeps_candidate_order() {
        let result = intersect(
            &["./src/**/*.sql"],
            &[
                "./src/HR/VIEWS/v2.sql",
                "./src/HR/VIEWS/v1.sql",
                "./doc/readme.md",
            ],
        )
        .unwrap();
        assert_eq!(result, vec!["./src/HR/VIEWS/v2.sql", "./src/HR/VIEWS/v1.sql"]);
    }

    #[test]
    fn intersect_is_case_insensitive() {
        let result = intersect(&["./src/**/*.sql"], &["./SRC/HR/VIEWS/V1.SQL"]).unwrap();
        assert_eq!(result, vec!["./SRC/HR/VIEWS/V1.SQL"]);
    }

    #[test]
    fn intersect_normalizes_candidate_spelling() {
        let result = intersect(&["./src/**/*.sql"], &["src\\HR\\VIEWS\\v1.sql"]).unwrap();
        assert_eq!(result, vec!["./src/HR/VIEWS/v1.sql"]);
    }

    #[test]
    fn set_equals_compares_element_for_element() {
        let patterns = ["./src/**/*.sql"];
        let all = ["./src/HR/VIEWS/v1.sql", "./src/HR/VIEWS/v2.sql"];
        let mixed = ["./src/HR/VIEWS/v1.sql", "./doc/readme.md"];

        assert!(set_equals(&patterns, &all).unwrap());
        assert!(!set_equals(&patterns, &mixed).unwrap());
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let result = intersect(&["./src/[oops"], &["./src/a.sql"]);
        assert!(matches!(result, Err(ChangeSetError::BadPattern { .. })));
    }

    // Runs in its own process with a fresh working directory.
    #[sealed_test]
    fn expand_walks_disk_and_filters_negations() {
        fs::create_dir_all("src/HR/VIEWS").unwrap();
        fs::create_dir_all("src/HR/FUNCTIONS").unwrap();
        fs::write("src/HR/VIEWS/v1.sql", "x").unwrap();
        fs::write("src/HR/VIEWS/v2.sql", "x").unwrap();
        fs::write("src/HR/FUNCTIONS/f1.sql", "x").unwrap();

        let result = expand(&["src/**/*.sql", "!src/**/FUNCTIONS/*.sql"]).unwrap();

        let expect = vec![
            "./src/HR/VIEWS/v1.sql".to_string(),
            "./src/HR/VIEWS/v2.sql".to_string(),
        ];
        assert_eq!(result, expect);
    }

    // Duplicate selection collapses to one entry per file.
    #[sealed_test]
    fn expand_deduplicates_overlapping_patterns() {
        fs::create_dir_all("src/HR/VIEWS").unwrap();
        fs::write("src/HR/VIEWS/v1.sql", "x").unwrap();

        let result = expand(&["src/**/*.sql", "src/HR/VIEWS/v1.sql"]).unwrap();
        assert_eq!(result, vec!["./src/HR/VIEWS/v1.sql".to_string()]);
    }
}
