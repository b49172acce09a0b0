use std::path::PathBuf;

/// Branch used when the pipeline does not configure one
pub const DEFAULT_BRANCH: &str = "default";

/// Descriptor of one working copy and the filters that select its versions.
///
/// Immutable for the duration of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub path: PathBuf,
    pub branch: String,
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub tag_filter: Option<String>,
    pub insecure: bool,
}

impl Repository {
    /// Create a descriptor for the working copy at `path` tracking `branch`.
    ///
    /// A blank branch falls back to [DEFAULT_BRANCH].
    pub fn new(path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        let branch = branch.into();
        let branch = if branch.trim().is_empty() {
            DEFAULT_BRANCH.to_string()
        } else {
            branch
        };

        Repository {
            path: path.into(),
            branch,
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            tag_filter: None,
            insecure: false,
        }
    }

    pub fn with_include_paths(mut self, paths: Vec<String>) -> Self {
        self.include_paths = paths;
        self
    }

    pub fn with_exclude_paths(mut self, paths: Vec<String>) -> Self {
        self.exclude_paths = paths;
        self
    }

    /// Set the tag filter; blank patterns mean "no filter"
    pub fn with_tag_filter(mut self, filter: Option<String>) -> Self {
        self.tag_filter = filter.filter(|f| !f.is_empty());
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Same filters and transport settings, different working copy
    pub fn relocated(&self, path: impl Into<PathBuf>) -> Self {
        Repository {
            path: path.into(),
            ..self.clone()
        }
    }

    /// Whether the path already holds a working copy
    pub fn is_checked_out(&self) -> bool {
        self.path.join(".hg").is_dir()
    }

    /// Path rendered as a source location for clone operations
    pub fn as_source_uri(&self) -> String {
        self.path.display().to_string()
    }
}
