use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::format_duration;
use crate::organize::config::OrganizeConfig;
use crate::organize::summary::RunSummary;
use crate::organize::types::ProcessResult;

/// Run log with buffered writes.
pub struct FileLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLogger {
    /// Create a new file logger, writing to `~/logs/manga-organizer/mangasort_<timestamp>.log`.
    ///
    /// # Errors
    /// Returns an error if the log directory or file cannot be created.
    pub fn new() -> Result<Self> {
        let log_dir = crate::config::LOG_DIR
            .as_deref()
            .context("Failed to get home directory")?;
        Self::in_dir(log_dir)
    }

    /// Create a new file logger in the given directory.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be created.
    pub fn in_dir(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let path = log_dir.join(format!("mangasort_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn log_init(&mut self, config: &OrganizeConfig) {
        let _ = writeln!(
            self.writer,
            "[{}] INIT \"{}\" -> \"{}\"",
            Self::timestamp(),
            config.source.display(),
            config.destination.display()
        );
        let _ = writeln!(self.writer, "  extensions: {:?}", config.extensions);
        if !config.include.is_empty() {
            let _ = writeln!(self.writer, "  include: {:?}", config.include);
        }
        if !config.exclude.is_empty() {
            let _ = writeln!(self.writer, "  exclude: {:?}", config.exclude);
        }
        let _ = writeln!(self.writer, "  min_score: {}", config.min_score);
        let _ = writeln!(self.writer, "  auto_score: {}", config.auto_score);
        let _ = writeln!(self.writer, "  resolver: {}", config.resolver);
        let _ = writeln!(self.writer, "  keep_names: {}", config.keep_names);
        let _ = writeln!(self.writer, "  recurse: {}", config.recurse);
        let _ = writeln!(self.writer, "  dryrun: {}", config.dryrun);
        let _ = self.writer.flush();
    }

    /// Log the outcome for a single archive.
    pub fn log_result(&mut self, path: &Path, file_index: &str, result: &ProcessResult) {
        let line = match result {
            ProcessResult::Moved { target, renamed, .. } => format!(
                "MOVE    {file_index} - \"{}\" -> \"{}\"{}",
                path.display(),
                target.display(),
                if *renamed { " | renamed" } else { "" }
            ),
            ProcessResult::Planned { target, .. } => {
                format!("PLAN    {file_index} - \"{}\" -> \"{}\"", path.display(), target.display())
            }
            ProcessResult::AlreadyInPlace => format!("KEEP    {file_index} - \"{}\"", path.display()),
            ProcessResult::Skipped(reason) => match reason.existing_path() {
                Some(existing) => format!(
                    "SKIP    {file_index} - \"{}\" | {reason} \"{}\"",
                    path.display(),
                    existing.display()
                ),
                None => format!("SKIP    {file_index} - \"{}\" | {reason}", path.display()),
            },
            ProcessResult::Failed { kind, message } => {
                format!("ERROR   {file_index} - \"{}\" | {kind}: {message}", path.display())
            }
        };
        let _ = writeln!(self.writer, "[{}] {line}", Self::timestamp());
        let _ = self.writer.flush();
    }

    pub fn log_stats(&mut self, summary: &RunSummary) {
        let _ = writeln!(self.writer, "[{}] STATISTICS", Self::timestamp());
        let _ = writeln!(self.writer, "  Archives scanned: {}", summary.archives_scanned);
        let _ = writeln!(self.writer, "  Archives moved:   {}", summary.moved);
        let _ = writeln!(self.writer, "  Archives renamed: {}", summary.renamed);
        let _ = writeln!(self.writer, "  Folders created:  {}", summary.folders_created);
        let _ = writeln!(self.writer, "  Already in place: {}", summary.already_in_place);
        let _ = writeln!(self.writer, "  Exact duplicates: {}", summary.exact_duplicates());
        let _ = writeln!(self.writer, "  Unresolved:       {}", summary.unresolved().count());
        let _ = writeln!(self.writer, "  Failed:           {}", summary.failed.len());
        let _ = writeln!(self.writer, "  Total time: {}", format_duration(summary.duration));
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::organize::types::SkipReason;

    use tempfile::tempdir;

    #[test]
    fn writes_init_result_and_stats_lines() {
        let dir = tempdir().unwrap();
        let config = OrganizeConfig::new(PathBuf::from("/in"), PathBuf::from("/library"));
        let mut logger = FileLogger::in_dir(&dir.path().join("logs")).unwrap();

        logger.log_init(&config);
        logger.log_result(
            Path::new("/in/a.zip"),
            "[1/2]",
            &ProcessResult::Skipped(SkipReason::NameConflict {
                existing: PathBuf::from("/library/A/a.zip"),
            }),
        );
        logger.log_stats(&RunSummary {
            archives_scanned: 2,
            ..RunSummary::default()
        });

        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("INIT \"/in\" -> \"/library\""));
        assert!(content.contains("SKIP    [1/2] - \"/in/a.zip\" | duplicate-name-conflict \"/library/A/a.zip\""));
        assert!(content.contains("Archives scanned: 2"));
        assert!(content.trim_end().ends_with("END"));
    }
}
