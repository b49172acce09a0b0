use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque version reference exchanged with the pipeline: a commit id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "ref", default)]
    pub reference: String,
}

impl Version {
    pub fn new(reference: impl Into<String>) -> Self {
        Version {
            reference: reference.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.reference
    }

    /// A version without a reference carries no information
    pub fn is_empty(&self) -> bool {
        self.reference.trim().is_empty()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_ref() {
        let version = Version::new("f47d10f40bf7a96c2d853c6c6025ba35b6a9c499");
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, r#"{"ref":"f47d10f40bf7a96c2d853c6c6025ba35b6a9c499"}"#);
    }

    #[test]
    fn test_missing_ref_is_empty() {
        let version: Version = serde_json::from_str("{}").unwrap();
        assert!(version.is_empty());
    }
}
