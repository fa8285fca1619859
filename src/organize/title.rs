use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Author prefix in series folder names, for example "あ) [作者名] ".
pub const DEFAULT_FOLDER_PREFIX_PATTERN: &str = r"^.*\)\s\[.*\]";

/// Volume or chapter marker in archive filenames.
/// The leftmost match starts the suffix: "第1巻", "01巻", "_v12", " vol.3", "_c1", " ch.10" or a trailing " 12".
pub const DEFAULT_VOLUME_PATTERN: &str = r"(?i)(\s*第\s*\d+\s*[巻話]|\s*\d+\s*[巻話]|[\s_.\-]+(v|vol|volume|c|ch|chapter)\.?\s*\d+|[\s_\-]+\d+(\.\d+)?\s*$)";

static RE_FOLDER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_FOLDER_PREFIX_PATTERN).expect("Invalid folder prefix regex"));

static RE_VOLUME: LazyLock<Regex> = LazyLock::new(|| Regex::new(DEFAULT_VOLUME_PATTERN).expect("Invalid volume regex"));

static RE_MULTI_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").expect("Invalid spaces regex"));

/// Characters that are not allowed in folder names on at least one platform.
const INVALID_FOLDER_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Extracts series titles from folder names and archive filenames.
#[derive(Debug, Clone)]
pub struct TitleParser {
    folder_prefix: Regex,
    volume: Regex,
}

impl Default for TitleParser {
    fn default() -> Self {
        Self {
            folder_prefix: RE_FOLDER_PREFIX.clone(),
            volume: RE_VOLUME.clone(),
        }
    }
}

impl TitleParser {
    /// Create a parser with optional custom patterns.
    ///
    /// # Errors
    /// Returns an error if a pattern is not a valid regex.
    pub fn new(folder_prefix_pattern: Option<&str>, volume_pattern: Option<&str>) -> anyhow::Result<Self> {
        let folder_prefix = match folder_prefix_pattern {
            Some(pattern) => {
                Regex::new(pattern).with_context(|| format!("Invalid folder prefix pattern: {pattern}"))?
            }
            None => RE_FOLDER_PREFIX.clone(),
        };
        let volume = match volume_pattern {
            Some(pattern) => Regex::new(pattern).with_context(|| format!("Invalid volume pattern: {pattern}"))?,
            None => RE_VOLUME.clone(),
        };
        Ok(Self { folder_prefix, volume })
    }

    /// Canonical series title for a folder name.
    #[must_use]
    pub fn folder_title(&self, dir_name: &str) -> String {
        self.folder_prefix.replace(dir_name, "").trim().to_string()
    }

    /// Split an archive filename stem into the series title and the volume suffix.
    ///
    /// If no volume marker is found, or nothing would be left of the title,
    /// the whole stem is the title and the suffix is empty.
    #[must_use]
    pub fn split_archive_stem(&self, stem: &str) -> (String, String) {
        if let Some(found) = self.volume.find(stem) {
            let title = stem[..found.start()].trim();
            if !title.is_empty() {
                return (title.to_string(), stem[found.start()..].to_string());
            }
        }
        (stem.trim().to_string(), String::new())
    }

    pub fn folder_prefix_pattern(&self) -> &str {
        self.folder_prefix.as_str()
    }

    pub fn volume_pattern(&self) -> &str {
        self.volume.as_str()
    }
}

/// Fold a title for comparison.
///
/// NFKC turns full-width letters and digits into their ASCII forms,
/// then everything is lowercased and only alphanumeric characters are kept.
///
/// ```rust
/// use manga_organizer::organize::normalize_title;
///
/// assert_eq!(normalize_title("One Piece"), "onepiece");
/// assert_eq!(normalize_title("ONE_PIECE!"), "onepiece");
/// assert_eq!(normalize_title("ＯＮＥ　ＰＩＥＣＥ"), "onepiece");
/// ```
#[must_use]
pub fn normalize_title(title: &str) -> String {
    title
        .nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Make an operator-provided name safe to use as a folder name.
#[must_use]
pub fn sanitize_folder_name(name: &str) -> String {
    let replaced: String = name
        .nfc()
        .map(|c| {
            if c.is_control() || INVALID_FOLDER_CHARS.contains(&c) {
                ' '
            } else {
                c
            }
        })
        .collect();
    RE_MULTI_SPACES
        .replace_all(&replaced, " ")
        .trim()
        .trim_end_matches('.')
        .trim_end()
        .to_string()
}
