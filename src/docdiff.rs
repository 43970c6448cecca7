//! # Document Diff
//!
//! Deterministic line-level diff between two stored document versions,
//! based on a longest-common-subsequence pass over lines.
//!
//! Bodies are bounded before the quadratic LCS table is allocated.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Upper bound on lines per side; the DP table is old_lines × new_lines.
const MAX_LINES: usize = 10_000;

/// Kind of one diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiffTag {
    Equal,
    Added,
    Removed,
}

/// One line of diff output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub text: String,
}

/// Full diff between two document bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffSummary {
    /// True when both sides are identical.
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Errors from the diff computation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error("document too large to diff: {lines} lines")]
    TooLarge { lines: usize },
}

/// Compute a line-level diff from `old` to `new`.
pub fn diff_lines(old: &str, new: &str) -> Result<DiffSummary, DiffError> {
    let old_lines: Vec<&str> = split_lines(old);
    let new_lines: Vec<&str> = split_lines(new);

    let largest = old_lines.len().max(new_lines.len());
    if largest > MAX_LINES {
        return Err(DiffError::TooLarge { lines: largest });
    }

    let lcs = lcs_table(&old_lines, &new_lines);
    let mut lines = Vec::new();
    backtrack(&lcs, &old_lines, &new_lines, &mut lines);

    let added = lines.iter().filter(|l| l.tag == DiffTag::Added).count();
    let removed = lines.iter().filter(|l| l.tag == DiffTag::Removed).count();
    let unchanged = lines.len() - added - removed;

    Ok(DiffSummary {
        added,
        removed,
        unchanged,
        lines,
    })
}

fn split_lines(body: &str) -> Vec<&str> {
    if body.is_empty() {
        Vec::new()
    } else {
        body.lines().collect()
    }
}

fn lcs_table(old: &[&str], new: &[&str]) -> Vec<Vec<u32>> {
    let mut table = vec![vec![0u32; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            table[i][j] = if old[i] == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    table
}

fn backtrack(table: &[Vec<u32>], old: &[&str], new: &[&str], out: &mut Vec<DiffLine>) {
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            out.push(DiffLine {
                tag: DiffTag::Equal,
                text: old[i].to_string(),
            });
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            out.push(DiffLine {
                tag: DiffTag::Removed,
                text: old[i].to_string(),
            });
            i += 1;
        } else {
            out.push(DiffLine {
                tag: DiffTag::Added,
                text: new[j].to_string(),
            });
            j += 1;
        }
    }
    while i < old.len() {
        out.push(DiffLine {
            tag: DiffTag::Removed,
            text: old[i].to_string(),
        });
        i += 1;
    }
    while j < new.len() {
        out.push(DiffLine {
            tag: DiffTag::Added,
            text: new[j].to_string(),
        });
        j += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bodies_produce_no_changes() {
        let body = "a\nb\nc";
        let diff = diff_lines(body, body).unwrap();
        assert!(diff.is_unchanged());
        assert_eq!(diff.unchanged, 3);
        assert_eq!(diff.lines.len(), 3);
    }

    #[test]
    fn empty_to_body_is_all_additions() {
        let diff = diff_lines("", "one\ntwo").unwrap();
        assert_eq!(diff.added, 2);
        assert_eq!(diff.removed, 0);
        assert_eq!(diff.unchanged, 0);
    }

    #[test]
    fn body_to_empty_is_all_removals() {
        let diff = diff_lines("one\ntwo", "").unwrap();
        assert_eq!(diff.added, 0);
        assert_eq!(diff.removed, 2);
    }

    #[test]
    fn changed_line_is_remove_plus_add() {
        let diff = diff_lines("keep\nold line\nkeep2", "keep\nnew line\nkeep2").unwrap();
        assert_eq!(diff.added, 1);
        assert_eq!(diff.removed, 1);
        assert_eq!(diff.unchanged, 2);

        let tags: Vec<DiffTag> = diff.lines.iter().map(|l| l.tag).collect();
        assert_eq!(
            tags,
            vec![
                DiffTag::Equal,
                DiffTag::Removed,
                DiffTag::Added,
                DiffTag::Equal
            ]
        );
    }

    #[test]
    fn counts_match_line_tags() {
        let diff = diff_lines("a\nb\nc\nd", "a\nc\nd\ne\nf").unwrap();
        let added = diff.lines.iter().filter(|l| l.tag == DiffTag::Added).count();
        let removed = diff
            .lines
            .iter()
            .filter(|l| l.tag == DiffTag::Removed)
            .count();
        assert_eq!(diff.added, added);
        assert_eq!(diff.removed, removed);
        assert_eq!(diff.added, 2);
        assert_eq!(diff.removed, 1);
    }

    #[test]
    fn insertion_preserves_surrounding_context() {
        let diff = diff_lines("a\nc", "a\nb\nc").unwrap();
        assert_eq!(diff.added, 1);
        assert_eq!(diff.removed, 0);
        assert_eq!(diff.unchanged, 2);
    }

    #[test]
    fn oversized_body_is_rejected() {
        let big = "x\n".repeat(MAX_LINES + 1);
        let err = diff_lines(&big, "x").unwrap_err();
        assert!(matches!(err, DiffError::TooLarge { .. }));
    }

    #[test]
    fn trailing_newline_does_not_add_phantom_line() {
        let diff = diff_lines("a\nb\n", "a\nb").unwrap();
        assert!(diff.is_unchanged());
    }
}
