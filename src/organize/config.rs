//! Configuration for sorting manga archives.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::organize::title::TitleParser;
use crate::print_error;

/// Archive extensions picked up by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["zip", "cbz"];
/// Minimum similarity for a folder to be listed as a candidate.
pub const DEFAULT_MIN_SCORE: f64 = 0.6;
/// Similarity at which a single candidate is used without asking.
pub const DEFAULT_AUTO_SCORE: f64 = 0.9;
/// Shortest title that may be used for substring matching.
pub const DEFAULT_MIN_PARTIAL_CHARS: usize = 2;

/// How ambiguous matches are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMode {
    /// Full screen terminal dialog.
    #[default]
    Tui,
    /// Numbered line prompt.
    Prompt,
    /// Pick the best candidate without asking.
    Best,
    /// Skip everything that needs a decision.
    Skip,
}

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct MangaSortConfig {
    #[serde(default)]
    pub source_directory: Option<PathBuf>,
    #[serde(default)]
    pub destination_directory: Option<PathBuf>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub folder_prefix_pattern: Option<String>,
    #[serde(default)]
    pub volume_pattern: Option<String>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub auto_score: Option<f64>,
    #[serde(default)]
    pub min_partial_chars: Option<usize>,
    #[serde(default)]
    pub resolver: Option<ResolverMode>,
    #[serde(default)]
    pub keep_names: bool,
    #[serde(default)]
    pub trash_duplicates: bool,
    #[serde(default)]
    pub recurse: bool,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub log: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the user config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    mangasort: MangaSortConfig,
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    /// Directory containing the archives to sort.
    pub source: PathBuf,
    /// Library root containing the series folders.
    pub destination: PathBuf,
    pub extensions: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub titles: TitleParser,
    pub min_score: f64,
    pub auto_score: f64,
    pub min_partial_chars: usize,
    pub resolver: ResolverMode,
    pub keep_names: bool,
    pub trash_duplicates: bool,
    pub recurse: bool,
    pub dryrun: bool,
    pub log: bool,
    pub debug: bool,
    pub verbose: bool,
}

impl MangaSortConfig {
    /// Try to read user config from the given file or the default location.
    /// Falls back to default config if the file is missing or invalid.
    #[must_use]
    pub fn get_user_config(path: Option<&Path>) -> Self {
        let path = path.or_else(|| crate::config::CONFIG_PATH.as_deref());
        path.filter(|path| path.exists())
            .and_then(|path| {
                fs::read_to_string(path)
                    .map_err(|e| {
                        print_error!("Error reading config file {}: {e}", path.display());
                    })
                    .ok()
            })
            .and_then(|config_string| {
                Self::from_toml_str(&config_string)
                    .map_err(|e| print_error!("{e}"))
                    .ok()
            })
            .unwrap_or_default()
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.mangasort)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))
    }
}

impl OrganizeConfig {
    /// Default settings for the given source and destination directories.
    #[must_use]
    pub fn new(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination,
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            include: Vec::new(),
            exclude: Vec::new(),
            titles: TitleParser::default(),
            min_score: DEFAULT_MIN_SCORE,
            auto_score: DEFAULT_AUTO_SCORE,
            min_partial_chars: DEFAULT_MIN_PARTIAL_CHARS,
            resolver: ResolverMode::default(),
            keep_names: false,
            trash_duplicates: false,
            recurse: false,
            dryrun: false,
            log: false,
            debug: false,
            verbose: false,
        }
    }

    /// Check that the score thresholds make sense.
    ///
    /// # Errors
    /// Returns an error if a score is outside `0.0..=1.0` or the auto score is below the minimum score.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [("min_score", self.min_score), ("auto_score", self.auto_score)] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{name} must be between 0.0 and 1.0, got {value}");
            }
        }
        if self.auto_score < self.min_score {
            anyhow::bail!(
                "auto_score ({}) must not be lower than min_score ({})",
                self.auto_score,
                self.min_score
            );
        }
        if self.extensions.is_empty() {
            anyhow::bail!("No archive extensions configured");
        }
        Ok(())
    }
}

impl fmt::Display for ResolverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tui => "tui",
            Self::Prompt => "prompt",
            Self::Best => "best",
            Self::Skip => "skip",
        };
        write!(f, "{name}")
    }
}
