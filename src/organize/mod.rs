//! Sort manga archives into series folders.
//!
//! The pipeline scans a source directory for archives and a destination library for series folders,
//! matches each archive title against the folder titles, asks a [`Resolver`] when the match is
//! ambiguous, and finally moves the archive after a duplicate check.
//! Archives moved under a different title get their filename and the top-level folder
//! inside the zip container rewritten to the canonical title.

mod archive;
mod config;
mod dedup;
mod logger;
mod matcher;
mod mover;
mod organizer;
mod resolver;
mod scanner;
mod summary;
mod title;
mod types;

pub use archive::{ArchiveContents, STAGING_PREFIX, commit_staged, inspect_archive, is_zip_container, stage_root_folder_rename};
pub use config::{
    DEFAULT_AUTO_SCORE, DEFAULT_EXTENSIONS, DEFAULT_MIN_PARTIAL_CHARS, DEFAULT_MIN_SCORE, MangaSortConfig,
    OrganizeConfig, ResolverMode,
};
pub use dedup::{Deduplicator, fingerprint};
pub use logger::FileLogger;
pub use matcher::Matcher;
pub use mover::{MovePlan, Mover, move_file, next_free_path};
pub use organizer::Organizer;
pub use resolver::{BatchPolicy, BatchResolver, CollisionRequest, MatchRequest, PromptResolver, Resolver, file_size};
pub use scanner::{LibrarySnapshot, ScanFailure, ScanResult, Scanner};
pub use summary::RunSummary;
pub use title::{TitleParser, normalize_title, sanitize_folder_name};
pub use types::{
    ArchiveFile, CollisionDecision, DuplicateRecord, DuplicateStatus, FailureKind, MatchCandidate, ProcessResult,
    Resolution, SeriesFolder, SkipReason,
};
