use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::organize::title::normalize_title;
use crate::path_to_filename_string;

/// An archive file waiting to be sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// Current location of the archive.
    pub path: PathBuf,
    /// Filename without extension, NFC normalized.
    pub stem: String,
    /// Series title inferred from the filename.
    pub title: String,
    /// Volume or chapter part of the filename, including its leading separator.
    pub suffix: String,
    /// Lowercase file extension.
    pub extension: String,
    /// Name of the single top-level folder inside the container, if there is one.
    pub internal_root: Option<String>,
}

/// A destination directory named after a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFolder {
    pub path: PathBuf,
    /// Canonical title with the author prefix removed.
    pub title: String,
    /// Title folded for comparison.
    pub normalized: String,
}

/// One possible destination for an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub folder: SeriesFolder,
    /// Similarity in the range `0.0..=1.0`.
    pub score: f64,
    /// Edit distance between the normalized titles.
    pub distance: usize,
}

/// Content fingerprint of a file in a destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRecord {
    pub path: PathBuf,
    pub size: u64,
    /// SHA-1 hex digest, computed on first use.
    pub fingerprint: Option<String>,
}

/// Answer from a resolver for an archive without an automatic match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Use the candidate at this index.
    Select(usize),
    /// Create a new series folder with this name.
    CreateFolder(String),
    /// Leave the archive where it is.
    Skip,
}

/// Answer from a resolver when the target name is taken by a file with different content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionDecision {
    Skip,
    /// Move the archive with a numbered suffix.
    KeepBoth,
    /// Trash the existing file and move the archive in its place.
    Replace,
}

/// Result of comparing incoming content against a destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateStatus {
    NoDuplicate,
    /// Identical content already exists.
    ExactDuplicate { existing: PathBuf },
    /// Same filename with different content.
    NameCollision { existing: PathBuf },
}

/// Outcome of processing a single archive.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    Moved {
        target: PathBuf,
        renamed: bool,
        created_folder: bool,
        resolved_by_operator: bool,
    },
    /// Dry run: the move that would have happened.
    Planned { target: PathBuf, renamed: bool },
    AlreadyInPlace,
    Skipped(SkipReason),
    Failed { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoMatch,
    OperatorSkipped,
    ExactDuplicate { existing: PathBuf },
    NameConflict { existing: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Permission,
    ArchiveRead,
    Io,
}

impl ArchiveFile {
    /// Filename including extension.
    #[must_use]
    pub fn file_name(&self) -> String {
        path_to_filename_string(&self.path)
    }

    /// Title folded for comparison.
    #[must_use]
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }
}

impl SeriesFolder {
    #[must_use]
    pub fn new(path: PathBuf, title: String) -> Self {
        let normalized = normalize_title(&title);
        Self {
            path,
            title,
            normalized,
        }
    }
}

impl MatchCandidate {
    #[must_use]
    pub const fn new(folder: SeriesFolder, score: f64, distance: usize) -> Self {
        Self {
            folder,
            score,
            distance,
        }
    }

    /// True when the folder title equals the archive title after normalization.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.distance == 0 && self.score >= 1.0
    }
}

impl DuplicateRecord {
    #[must_use]
    pub const fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            fingerprint: None,
        }
    }
}

impl ProcessResult {
    /// Build a failure result from an error, classifying it by its cause chain.
    #[must_use]
    pub fn failed(error: &anyhow::Error) -> Self {
        Self::Failed {
            kind: FailureKind::classify(error),
            message: format!("{error:#}"),
        }
    }
}

impl SkipReason {
    /// Skipped items the operator still needs to look at.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        !matches!(self, Self::ExactDuplicate { .. })
    }

    #[must_use]
    pub fn existing_path(&self) -> Option<&Path> {
        match self {
            Self::ExactDuplicate { existing } | Self::NameConflict { existing } => Some(existing),
            Self::NoMatch | Self::OperatorSkipped => None,
        }
    }
}

impl FailureKind {
    /// Classify an error by walking its cause chain.
    #[must_use]
    pub fn classify(error: &anyhow::Error) -> Self {
        for cause in error.chain() {
            if cause.downcast_ref::<zip::result::ZipError>().is_some() {
                return Self::ArchiveRead;
            }
            if let Some(io_error) = cause.downcast_ref::<std::io::Error>()
                && io_error.kind() == ErrorKind::PermissionDenied
            {
                return Self::Permission;
            }
        }
        Self::Io
    }
}

impl fmt::Display for SeriesFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoMatch => "no-match-found",
            Self::OperatorSkipped => "operator-skipped",
            Self::ExactDuplicate { .. } => "exact-duplicate",
            Self::NameConflict { .. } => "duplicate-name-conflict",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Permission => "filesystem-permission-error",
            Self::ArchiveRead => "archive-read-error",
            Self::Io => "io-error",
        };
        write!(f, "{name}")
    }
}
