use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DocsweepError;
use crate::types::VcsKind;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".docsweep.toml";

/// Top-level configuration loaded from `.docsweep.toml`.
///
/// Resolution order: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use docsweep_core::{DocsweepConfig, VcsKind};
///
/// let config = DocsweepConfig::default();
/// assert_eq!(config.vcs, VcsKind::Git);
/// assert!(config.follow_rename);
/// assert_eq!(config.max_changes, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocsweepConfig {
    /// Which version control system the analyzed files live in.
    #[serde(default)]
    pub vcs: VcsKind,
    /// Follow renames when walking a file's history.
    #[serde(default = "default_follow_rename")]
    pub follow_rename: bool,
    /// Units with at most this many body changes since their last
    /// documentation change are not reported as outdated.
    #[serde(default)]
    pub max_changes: usize,
    /// Number of files analyzed concurrently. Defaults to the available parallelism.
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Git backend settings.
    #[serde(default = "ExecutableConfig::git")]
    pub git: ExecutableConfig,
    /// Mercurial backend settings.
    #[serde(default = "ExecutableConfig::hg")]
    pub hg: ExecutableConfig,
}

fn default_follow_rename() -> bool {
    true
}

impl Default for DocsweepConfig {
    fn default() -> Self {
        Self {
            vcs: VcsKind::default(),
            follow_rename: default_follow_rename(),
            max_changes: 0,
            jobs: None,
            git: ExecutableConfig::git(),
            hg: ExecutableConfig::hg(),
        }
    }
}

impl DocsweepConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DocsweepError::Io`] if the file cannot be read, or
    /// [`DocsweepError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use docsweep_core::DocsweepConfig;
    /// use std::path::Path;
    ///
    /// let config = DocsweepConfig::from_file(Path::new(".docsweep.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, DocsweepError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`DocsweepError::Toml`] if parsing fails or a key is unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use docsweep_core::{DocsweepConfig, VcsKind};
    ///
    /// let toml = r#"
    /// vcs = "hg"
    /// max_changes = 3
    /// "#;
    /// let config = DocsweepConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.vcs, VcsKind::Mercurial);
    /// assert_eq!(config.max_changes, 3);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, DocsweepError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// The configured executable for `kind`.
    pub fn executable_for(&self, kind: VcsKind) -> &Path {
        match kind {
            VcsKind::Git => &self.git.executable,
            VcsKind::Mercurial => &self.hg.executable,
        }
    }

    /// Settings handed to the version control backend.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use docsweep_core::DocsweepConfig;
    ///
    /// let vcs = DocsweepConfig::default().vcs_config();
    /// assert_eq!(vcs.executable, Path::new("git"));
    /// assert!(vcs.follow_renames);
    /// ```
    pub fn vcs_config(&self) -> VcsConfig {
        VcsConfig {
            kind: self.vcs,
            executable: self.executable_for(self.vcs).to_path_buf(),
            follow_renames: self.follow_rename,
        }
    }
}

/// Location of a version control executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutableConfig {
    /// Path or `PATH`-resolved name of the executable.
    pub executable: PathBuf,
}

impl ExecutableConfig {
    fn git() -> Self {
        Self {
            executable: PathBuf::from(VcsKind::Git.default_executable()),
        }
    }

    fn hg() -> Self {
        Self {
            executable: PathBuf::from(VcsKind::Mercurial.default_executable()),
        }
    }
}

/// Everything a backend needs to open a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsConfig {
    /// Which backend to use.
    pub kind: VcsKind,
    /// Executable the backend invokes.
    pub executable: PathBuf,
    /// Follow renames when enumerating history.
    pub follow_renames: bool,
}

impl VcsConfig {
    /// Backend settings using the default executable for `kind`.
    ///
    /// # Examples
    ///
    /// ```
    /// use docsweep_core::{VcsConfig, VcsKind};
    ///
    /// let config = VcsConfig::new(VcsKind::Mercurial);
    /// assert_eq!(config.executable.to_str(), Some("hg"));
    /// ```
    pub fn new(kind: VcsKind) -> Self {
        Self {
            kind,
            executable: PathBuf::from(kind.default_executable()),
            follow_renames: true,
        }
    }
}
