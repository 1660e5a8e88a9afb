//! Configuration for annotation transfer
//!
//! Settings can be built in code or loaded from a TOML file:
//!
//! ```toml
//! [selection]
//! base_id = "figure_1"
//! ignore_prefixes = ["axes_"]
//! include = ["g10"]
//! exclude = []
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Id of the group a plotting library wraps the whole figure in
pub const DEFAULT_BASE_ID: &str = "figure_1";

/// Id prefixes matplotlib gives to groups belonging to the generated figure
pub const MATPLOTLIB_PREFIXES: &[&str] = &[
    "figure_",
    "axes_",
    "patch_",
    "legend_",
    "line",
    "xtick_",
    "ytick_",
    "matplotlib.axis_",
    "polycollection_",
    "pathcollection_",
    "streamplot_",
    "quiver_",
    "table_",
    "text_",
    "image_",
    "spine_",
    "pane_",
    "eventplot_",
    "barcontainer_",
    "mpl_toolkits",
];

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Options controlling one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Id of the base-figure group, never copied
    pub base_id: String,
    /// Groups whose id starts with one of these are treated as base figure
    pub ignore_prefixes: Vec<String>,
    /// If set, copy exactly these groups
    pub include: Option<Vec<String>>,
    /// Groups to leave out
    pub exclude: Vec<String>,
    /// Compute the result without writing the target
    pub dry_run: bool,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    selection: TomlSelection,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlSelection {
    base_id: Option<String>,
    #[serde(default)]
    ignore_prefixes: Vec<String>,
    #[serde(default)]
    matplotlib_prefixes: bool,
    include: Option<Vec<String>>,
    #[serde(default)]
    exclude: Vec<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            base_id: DEFAULT_BASE_ID.to_string(),
            ignore_prefixes: vec![],
            include: None,
            exclude: vec![],
            dry_run: false,
        }
    }
}

impl TransferConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let selection = parsed.selection;

        let mut config = Self {
            base_id: selection
                .base_id
                .unwrap_or_else(|| DEFAULT_BASE_ID.to_string()),
            ignore_prefixes: selection.ignore_prefixes,
            include: selection.include,
            exclude: selection.exclude,
            dry_run: false,
        };
        if selection.matplotlib_prefixes {
            config = config.with_matplotlib_prefixes();
        }
        Ok(config)
    }

    /// Set the base-figure group id
    pub fn with_base_id(mut self, id: impl Into<String>) -> Self {
        self.base_id = id.into();
        self
    }

    /// Add id prefixes that mark groups as part of the base figure
    pub fn with_ignore_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for prefix in prefixes {
            let prefix = prefix.into();
            if !self.ignore_prefixes.contains(&prefix) {
                self.ignore_prefixes.push(prefix);
            }
        }
        self
    }

    /// Treat every matplotlib-generated group as base figure
    pub fn with_matplotlib_prefixes(self) -> Self {
        self.with_ignore_prefixes(MATPLOTLIB_PREFIXES.iter().copied())
    }

    /// Copy only the listed groups
    pub fn with_include<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Skip the listed groups
    pub fn with_exclude<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable preview mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// True if a group with this id belongs to the base figure
    pub fn is_base_group(&self, id: &str) -> bool {
        id == self.base_id || self.ignore_prefixes.iter().any(|p| id.starts_with(p.as_str()))
    }
}
