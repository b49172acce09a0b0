use crate::error::{HgResourceError, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Format used for the `author_date` property, e.g. `2016-03-15 00:14:53 +0900`
const AUTHOR_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Whether the backend allows history rewriting on a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Public,
    Draft,
    Secret,
}

impl Phase {
    /// Draft and secret commits may be rebased
    pub fn is_mutable(&self) -> bool {
        !matches!(self, Phase::Public)
    }
}

/// A commit as read back from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub id: String,
    pub branch: String,
    pub phase: Phase,
    pub author: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
    pub bookmarks: Vec<String>,
    pub tags: Vec<String>,
    pub parents: Vec<String>,
}

/// One flattened, orderable piece of commit metadata for pipeline reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitProperty {
    pub name: String,
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl CommitProperty {
    fn plain(name: &str, value: impl Into<String>) -> Self {
        CommitProperty {
            name: name.to_string(),
            value: value.into(),
            kind: None,
        }
    }

    fn typed(name: &str, value: impl Into<String>, kind: &str) -> Self {
        CommitProperty {
            name: name.to_string(),
            value: value.into(),
            kind: Some(kind.to_string()),
        }
    }
}

/// Record shape of the backend's `json` log template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Changeset {
    #[serde(default)]
    pub rev: i64,
    pub node: String,
    #[serde(default)]
    pub branch: String,
    pub phase: Phase,
    #[serde(default)]
    pub user: String,
    pub date: Vec<i64>,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub bookmarks: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

/// Convert a backend `[epoch, offset]` pair into a zoned timestamp.
///
/// The backend stores the offset with the inverse sign of the usual
/// UTC offset: `-32400` means `+09:00`.
pub fn parse_backend_date(date: &[i64]) -> Result<DateTime<FixedOffset>> {
    let [epoch, offset] = date else {
        return Err(HgResourceError::metadata(format!(
            "expected date as [epoch, offset], found {} elements",
            date.len()
        )));
    };

    let offset = i32::try_from(-*offset)
        .ok()
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| HgResourceError::metadata(format!("invalid UTC offset {}", offset)))?;

    let utc = DateTime::from_timestamp(*epoch, 0)
        .ok_or_else(|| HgResourceError::metadata(format!("invalid timestamp {}", epoch)))?;

    Ok(utc.with_timezone(&offset))
}

impl TryFrom<Changeset> for Commit {
    type Error = HgResourceError;

    fn try_from(changeset: Changeset) -> Result<Self> {
        let timestamp = parse_backend_date(&changeset.date)?;

        Ok(Commit {
            id: changeset.node,
            branch: changeset.branch,
            phase: changeset.phase,
            author: changeset.user,
            timestamp,
            message: changeset.desc,
            bookmarks: changeset.bookmarks,
            tags: changeset.tags,
            parents: changeset.parents,
        })
    }
}

impl From<&Commit> for Changeset {
    fn from(commit: &Commit) -> Self {
        Changeset {
            rev: 0,
            node: commit.id.clone(),
            branch: commit.branch.clone(),
            phase: commit.phase,
            user: commit.author.clone(),
            date: vec![
                commit.timestamp.timestamp(),
                -i64::from(commit.timestamp.offset().local_minus_utc()),
            ],
            desc: commit.message.clone(),
            bookmarks: commit.bookmarks.clone(),
            tags: commit.tags.clone(),
            parents: commit.parents.clone(),
        }
    }
}

impl Commit {
    /// Parse the backend's JSON log output, which must describe exactly one commit
    pub fn parse_log_json(output: &str) -> Result<Self> {
        let mut changesets: Vec<Changeset> = serde_json::from_str(output)?;

        if changesets.len() != 1 {
            return Err(HgResourceError::metadata(format!(
                "expected 1 commit, found {}",
                changesets.len()
            )));
        }

        Commit::try_from(changesets.remove(0))
    }

    /// The five reported properties, always in this order:
    /// commit, author, author_date, message, tags
    pub fn properties(&self) -> Vec<CommitProperty> {
        vec![
            CommitProperty::plain("commit", self.id.as_str()),
            CommitProperty::plain("author", self.author.as_str()),
            CommitProperty::typed(
                "author_date",
                self.timestamp.format(AUTHOR_DATE_FORMAT).to_string(),
                "time",
            ),
            CommitProperty::typed("message", self.message.as_str(), "message"),
            CommitProperty::plain("tags", self.tags.join(", ")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const LOG_RESPONSE: &str = r#"[
        {
            "rev": 16,
            "node": "f47d10f40bf7a96c2d853c6c6025ba35b6a9c499",
            "branch": "default",
            "phase": "draft",
            "user": "Jane Doe <jdoe@example.com>",
            "date": [1457968493, -32400],
            "desc": "foo",
            "bookmarks": [],
            "tags": ["tip"],
            "parents": ["4484191cd2e41c174ecc2604af06aeb2a21c247f"]
        }
    ]"#;

    #[test]
    fn test_parse_log_json() {
        let commit = Commit::parse_log_json(LOG_RESPONSE).unwrap();
        assert_eq!(commit.id, "f47d10f40bf7a96c2d853c6c6025ba35b6a9c499");
        assert_eq!(commit.branch, "default");
        assert_eq!(commit.phase, Phase::Draft);
        assert!(commit.phase.is_mutable());
        assert_eq!(
            commit.parents,
            vec!["4484191cd2e41c174ecc2604af06aeb2a21c247f".to_string()]
        );
    }

    #[test]
    fn test_date_offset_sign_is_inverted() {
        let parsed = parse_backend_date(&[1457968493, -32400]).unwrap();
        assert_eq!(
            (parsed.year(), parsed.month(), parsed.day()),
            (2016, 3, 15)
        );
        assert_eq!(
            (parsed.hour(), parsed.minute(), parsed.second()),
            (0, 14, 53)
        );
        assert_eq!(parsed.offset().local_minus_utc(), 32400);
    }

    #[test]
    fn test_date_requires_two_elements() {
        assert!(parse_backend_date(&[1457968493]).is_err());
        assert!(parse_backend_date(&[]).is_err());
    }

    #[test]
    fn test_properties_fixed_order() {
        let commit = Commit::parse_log_json(LOG_RESPONSE).unwrap();
        let properties = commit.properties();

        let names: Vec<&str> = properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["commit", "author", "author_date", "message", "tags"]
        );

        assert_eq!(properties[1].value, "Jane Doe <jdoe@example.com>");
        assert_eq!(properties[2].value, "2016-03-15 00:14:53 +0900");
        assert_eq!(properties[2].kind.as_deref(), Some("time"));
        assert_eq!(properties[3].value, "foo");
        assert_eq!(properties[3].kind.as_deref(), Some("message"));
        assert_eq!(properties[4].value, "tip");
        assert_eq!(properties[4].kind, None);
    }

    #[test]
    fn test_tags_joined() {
        let mut commit = Commit::parse_log_json(LOG_RESPONSE).unwrap();
        commit.tags = vec!["tip".to_string(), "v1.0".to_string()];
        assert_eq!(commit.properties()[4].value, "tip, v1.0");
    }

    #[test]
    fn test_untyped_property_omits_type() {
        let commit = Commit::parse_log_json(LOG_RESPONSE).unwrap();
        let json = serde_json::to_string(&commit.properties()[0]).unwrap();
        assert_eq!(
            json,
            r#"{"name":"commit","value":"f47d10f40bf7a96c2d853c6c6025ba35b6a9c499"}"#
        );
    }

    #[test]
    fn test_rejects_multiple_commits() {
        let output = format!(
            "[{}, {}]",
            LOG_RESPONSE.trim().trim_start_matches('[').trim_end_matches(']'),
            LOG_RESPONSE.trim().trim_start_matches('[').trim_end_matches(']')
        );
        let err = Commit::parse_log_json(&output).unwrap_err();
        assert!(err.to_string().contains("expected 1 commit, found 2"));
    }

    #[test]
    fn test_changeset_conversion_keeps_offset() {
        let commit = Commit::parse_log_json(LOG_RESPONSE).unwrap();
        let changeset = Changeset::from(&commit);
        assert_eq!(changeset.date, vec![1457968493, -32400]);
    }
}
