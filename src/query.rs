//! Revision query construction.
//!
//! Builds the backend revset expressions that select pipeline-relevant
//! commits: included by path and not excluded by path, on the tracked
//! branch, matching the tag filter, and not carrying the skip marker.
//! Every configuration-supplied literal goes through [escape] first.

use crate::domain::Repository;

/// Commits whose message contains this marker never become versions
pub const SKIP_MARKER: &str = "[ci skip]";

/// Fragment matching every commit
pub const MATCH_ALL: &str = "all()";

/// Fragment matching no commit
pub const MATCH_NONE: &str = "not all()";

/// Escape a literal for use inside a single-quoted revset string.
///
/// A backslash is doubled once for the string literal and once more for
/// the regex it ends up in, so `\` becomes four backslashes. Single quotes
/// are backslash-escaped.
pub fn escape(literal: &str) -> String {
    literal.replace('\\', "\\\\\\\\").replace('\'', "\\'")
}

/// Quote an escaped literal as a revset string
fn quoted(literal: &str) -> String {
    format!("'{}'", escape(literal))
}

/// Union of one `file('re:...')` predicate per path
pub fn union_of_paths(paths: &[String]) -> String {
    paths
        .iter()
        .map(|path| format!("file('re:{}')", escape(path)))
        .collect::<Vec<_>>()
        .join("|")
}

/// Builds filter expressions for one [Repository] descriptor
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    repo: &'a Repository,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        QueryBuilder { repo }
    }

    /// Matches everything when no include paths are configured
    pub fn include_fragment(&self) -> String {
        if self.repo.include_paths.is_empty() {
            MATCH_ALL.to_string()
        } else {
            union_of_paths(&self.repo.include_paths)
        }
    }

    /// Matches nothing when no exclude paths are configured
    pub fn exclude_fragment(&self) -> String {
        if self.repo.exclude_paths.is_empty() {
            MATCH_NONE.to_string()
        } else {
            union_of_paths(&self.repo.exclude_paths)
        }
    }

    pub fn branch_fragment(&self) -> String {
        format!("branch({})", quoted(&self.repo.branch))
    }

    pub fn tag_fragment(&self) -> String {
        match &self.repo.tag_filter {
            Some(filter) => format!("tag('re:{}')", escape(filter)),
            None => MATCH_ALL.to_string(),
        }
    }

    pub fn skip_fragment(&self) -> String {
        format!("desc({})", quoted(SKIP_MARKER))
    }

    /// `(included - excluded) & branch & tag - skip-marker`, fully parenthesized
    pub fn filter(&self) -> String {
        format!(
            "(((({}) - ({})) & {} & {}) - {})",
            self.include_fragment(),
            self.exclude_fragment(),
            self.branch_fragment(),
            self.tag_fragment(),
            self.skip_fragment()
        )
    }

    /// The single most recent qualifying commit
    pub fn latest(&self) -> String {
        format!("last({})", self.filter())
    }

    /// Qualifying commits strictly descending from `commit_id`
    pub fn descendants_of(&self, commit_id: &str) -> String {
        let commit = quoted(commit_id);
        format!(
            "(descendants({}) - {}) & {}",
            commit,
            commit,
            self.filter()
        )
    }
}
