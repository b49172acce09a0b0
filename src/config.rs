use crate::error::{HgResourceError, Result};
use crate::publish::state::DEFAULT_MAX_ATTEMPTS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the current directory and the user config directory
pub const SETTINGS_FILE_NAME: &str = "hgresource.toml";

/// Operator settings for hg-resource.
///
/// Pipeline-specific configuration arrives as JSON on stdin; these settings
/// describe the environment the resource runs in.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub publish: PublishSettings,

    #[serde(default)]
    pub check: CheckSettings,

    #[serde(default)]
    pub credentials: CredentialSettings,
}

fn default_binary() -> String {
    "hg".to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_askpass() -> PathBuf {
    PathBuf::from("/opt/resource/askpass.sh")
}

/// How the backend executable is invoked
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackendSettings {
    #[serde(default = "default_binary")]
    pub binary: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            binary: default_binary(),
        }
    }
}

/// Publish retry ceiling and workspace handling
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PublishSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Leave the temporary clone on disk after publishing
    #[serde(default)]
    pub keep_workspace: bool,

    #[serde(default)]
    pub workspace_dir: Option<PathBuf>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        PublishSettings {
            max_attempts: default_max_attempts(),
            keep_workspace: false,
            workspace_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct CheckSettings {
    /// Working copy reused between checks
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

/// Where the private key is staged and which askpass helper `ssh-add` uses
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CredentialSettings {
    #[serde(default)]
    pub key_dir: Option<PathBuf>,

    #[serde(default = "default_askpass")]
    pub askpass: PathBuf,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        CredentialSettings {
            key_dir: None,
            askpass: default_askpass(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.publish.max_attempts == 0 {
            return Err(HgResourceError::config(
                "publish.max_attempts must be at least 1",
            ));
        }
        if self.backend.binary.trim().is_empty() {
            return Err(HgResourceError::config("backend.binary must not be empty"));
        }
        Ok(())
    }

    /// Parent directory for publish workspaces; honours `TMPDIR`
    pub fn workspace_root(&self) -> PathBuf {
        self.publish
            .workspace_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn check_cache_dir(&self) -> PathBuf {
        self.check
            .cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("hg-resource-repo-cache"))
    }

    pub fn key_dir(&self) -> PathBuf {
        self.credentials
            .key_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Loads settings from file or returns defaults.
///
/// Attempts to load settings in the following order:
/// 1. Custom path provided as parameter
/// 2. `hgresource.toml` in current directory
/// 3. `hgresource.toml` in the user config directory
/// 4. Default settings if no file found
///
/// # Returns
/// * `Ok(Settings)` - Loaded (and validated) or default settings
/// * `Err` - If a file exists but cannot be read, parsed, or validated
pub fn load_settings(settings_path: Option<&Path>) -> Result<Settings> {
    let candidate = match settings_path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(SETTINGS_FILE_NAME);
            if local.exists() {
                Some(local)
            } else {
                dirs::config_dir()
                    .map(|dir| dir.join(SETTINGS_FILE_NAME))
                    .filter(|path| path.exists())
            }
        }
    };

    let settings = match candidate {
        Some(path) => {
            let content = fs::read_to_string(&path).map_err(|e| {
                HgResourceError::config(format!(
                    "Cannot read settings file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            toml::from_str(&content)?
        }
        None => Settings::default(),
    };

    settings.validate()?;
    Ok(settings)
}
