//! JSON documents exchanged with the pipeline on stdin and stdout.

use crate::domain::{CommitProperty, Repository, Version};
use crate::error::{HgResourceError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Where the repository lives and which of its commits count as versions
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Source {
    #[serde(deserialize_with = "null_as_default")]
    pub uri: String,
    #[serde(deserialize_with = "null_as_default")]
    pub private_key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub paths: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub ignore_paths: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub branch: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tag_filter: String,
    #[serde(deserialize_with = "null_as_default")]
    pub skip_ssl_verification: bool,
}

impl Source {
    /// Descriptor for a working copy of this source at `path`
    pub fn repository(&self, path: impl Into<PathBuf>) -> Repository {
        Repository::new(path, self.branch.as_str())
            .with_include_paths(self.paths.clone())
            .with_exclude_paths(self.ignore_paths.clone())
            .with_tag_filter(Some(self.tag_filter.clone()))
            .with_insecure(self.skip_ssl_verification)
    }

    /// The configured URI, required by every operation that talks to it
    pub fn require_uri(&self) -> Result<&str> {
        let uri = self.uri.trim();
        if uri.is_empty() {
            return Err(HgResourceError::config("Repository URI must be provided"));
        }
        Ok(uri)
    }
}

/// Publish parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Working copy to publish, relative to the sources directory
    #[serde(deserialize_with = "null_as_default")]
    pub repository: String,
    /// Push target overriding `source.uri`
    #[serde(deserialize_with = "null_as_default")]
    pub destination: String,
    /// File (relative to the sources directory) holding the tag name
    #[serde(deserialize_with = "null_as_default")]
    pub tag: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tag_prefix: String,
    #[serde(deserialize_with = "null_as_default")]
    pub rebase: bool,
}

/// Request document read from stdin
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResourceInput {
    #[serde(deserialize_with = "null_as_default")]
    pub source: Source,
    pub version: Option<Version>,
    #[serde(deserialize_with = "null_as_default")]
    pub params: Params,
}

/// Response document of `in` and `out`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOutput {
    pub version: Version,
    pub metadata: Vec<CommitProperty>,
}

/// Read and parse the request document
pub fn parse_input(mut reader: impl Read) -> Result<ResourceInput> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;

    serde_json::from_str(&raw)
        .map_err(|e| HgResourceError::config(format!("Error parsing input JSON: {}", e)))
}

/// Write `value` as a single JSON document followed by a newline
pub fn write_json<T: Serialize + ?Sized>(mut writer: impl Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
