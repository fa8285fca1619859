use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use colored::Colorize;
use tempfile::NamedTempFile;

use crate::organize::config::OrganizeConfig;
use crate::organize::dedup::Deduplicator;
use crate::organize::logger::FileLogger;
use crate::organize::matcher::Matcher;
use crate::organize::mover::{Mover, next_free_path};
use crate::organize::resolver::{CollisionRequest, MatchRequest, Resolver};
use crate::organize::scanner::{LibrarySnapshot, Scanner};
use crate::organize::summary::RunSummary;
use crate::organize::title::sanitize_folder_name;
use crate::organize::types::{
    ArchiveFile, CollisionDecision, DuplicateStatus, MatchCandidate, ProcessResult, Resolution, SeriesFolder,
    SkipReason,
};
use crate::{get_relative_path_or_filename, path_to_filename_string, print_error, print_warning, show_diff};

/// Runs the whole pipeline: scan, match, resolve, deduplicate and move.
pub struct Organizer {
    config: OrganizeConfig,
    matcher: Matcher,
    mover: Mover,
    dedup: Deduplicator,
    logger: Option<FileLogger>,
}

/// Where an archive is going and how that was decided.
struct Destination {
    folder: SeriesFolder,
    created_folder: bool,
    resolved_by_operator: bool,
}

impl Organizer {
    #[must_use]
    pub fn new(config: OrganizeConfig) -> Self {
        Self {
            matcher: Matcher::from_config(&config),
            mover: Mover::new(config.keep_names),
            dedup: Deduplicator::new(),
            logger: None,
            config,
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: FileLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &OrganizeConfig {
        &self.config
    }

    /// Sort every archive in the source directory.
    ///
    /// Each archive is visited exactly once. Problems with a single archive are recorded in the summary
    /// and never stop the run.
    ///
    /// # Errors
    /// Returns an error if the source or destination directory cannot be read.
    pub fn run(&mut self, resolver: &mut dyn Resolver) -> anyhow::Result<RunSummary> {
        let start = Instant::now();
        let scanner = Scanner::new(&self.config);
        let mut library = scanner.scan_library()?;
        let scan = scanner.scan_archives()?;

        if let Some(logger) = self.logger.as_mut() {
            logger.log_init(&self.config);
        }

        let mut summary = RunSummary {
            archives_scanned: scan.archives.len() + scan.failures.len(),
            ..RunSummary::default()
        };

        for failure in scan.failures {
            print_error!("{}: {}", path_to_filename_string(&failure.path), failure.message);
            let result = ProcessResult::Failed {
                kind: failure.kind,
                message: failure.message,
            };
            if let Some(logger) = self.logger.as_mut() {
                logger.log_result(&failure.path, "[scan]", &result);
            }
            summary.add_result(&failure.path, &result);
        }

        let total = scan.archives.len();
        if total == 0 {
            if self.config.verbose {
                println!("No archives found in {}", self.config.source.display());
            }
        } else if self.config.verbose {
            println!(
                "Sorting {total} archive(s) into {} series folder(s)",
                library.len()
            );
        }

        let mut pending: VecDeque<ArchiveFile> = scan.archives.into();
        let mut position = 0;
        while let Some(archive) = pending.pop_front() {
            position += 1;
            let file_index = format!("[{position}/{total}]");
            let result = self
                .process_archive(&archive, &mut library, resolver, position, total)
                .unwrap_or_else(|error| ProcessResult::failed(&error));

            self.report(&archive, &file_index, &result);
            if let Some(logger) = self.logger.as_mut() {
                logger.log_result(&archive.path, &file_index, &result);
            }
            summary.add_result(&archive.path, &result);
        }

        summary.duration = start.elapsed();
        if let Some(logger) = self.logger.as_mut() {
            logger.log_stats(&summary);
        }
        Ok(summary)
    }

    /// Decide on and carry out the move for one archive.
    ///
    /// # Errors
    /// Returns an error if the resolver fails or a filesystem operation fails.
    pub fn process_archive(
        &mut self,
        archive: &ArchiveFile,
        library: &mut LibrarySnapshot,
        resolver: &mut dyn Resolver,
        position: usize,
        total: usize,
    ) -> anyhow::Result<ProcessResult> {
        let candidates = self.matcher.candidates(&archive.title, library.folders());
        if self.is_filed_in_candidate(archive, &candidates) {
            return Ok(ProcessResult::AlreadyInPlace);
        }

        let destination = match self.find_destination(archive, &candidates, library, resolver, position, total)? {
            Ok(destination) => destination,
            Err(reason) => return Ok(ProcessResult::Skipped(reason)),
        };

        let mut plan = self.mover.plan(archive, &destination.folder);
        if plan.is_in_place() {
            return Ok(ProcessResult::AlreadyInPlace);
        }

        if self.config.dryrun {
            let status = self
                .dedup
                .check(&plan.source, plan.target_dir(), &plan.target_name())?;
            return Ok(match status {
                DuplicateStatus::NoDuplicate => {
                    self.dedup.register_planned(&plan.target, &plan.source)?;
                    ProcessResult::Planned {
                        renamed: plan.renamed(),
                        target: plan.target,
                    }
                }
                DuplicateStatus::ExactDuplicate { existing } => {
                    ProcessResult::Skipped(SkipReason::ExactDuplicate { existing })
                }
                DuplicateStatus::NameCollision { existing } => {
                    ProcessResult::Skipped(SkipReason::NameConflict { existing })
                }
            });
        }

        let staged = self.mover.stage(&plan)?;
        let status = self
            .dedup
            .check(content_path(staged.as_ref(), &plan.source), plan.target_dir(), &plan.target_name())?;

        match status {
            DuplicateStatus::NoDuplicate => {}
            DuplicateStatus::ExactDuplicate { existing } => {
                drop(staged);
                if self.config.trash_duplicates {
                    crate::trash_or_delete(&archive.path)?;
                }
                return Ok(ProcessResult::Skipped(SkipReason::ExactDuplicate { existing }));
            }
            DuplicateStatus::NameCollision { existing } => {
                let decision = resolver.resolve_collision(&CollisionRequest {
                    archive,
                    incoming: content_path(staged.as_ref(), &plan.source),
                    existing: &existing,
                })?;
                match decision {
                    CollisionDecision::Skip => {
                        return Ok(ProcessResult::Skipped(SkipReason::NameConflict { existing }));
                    }
                    CollisionDecision::KeepBoth => plan.target = next_free_path(&plan.target),
                    CollisionDecision::Replace => {
                        crate::trash_or_delete(&existing)?;
                        self.dedup.forget(&existing);
                    }
                }
            }
        }

        self.mover.commit(&plan, staged)?;
        self.dedup.register(&plan.target);

        Ok(ProcessResult::Moved {
            renamed: plan.renamed(),
            target: plan.target,
            created_folder: destination.created_folder,
            resolved_by_operator: destination.resolved_by_operator,
        })
    }

    /// Pick the series folder for an archive, asking the resolver when the match is not certain.
    /// The inner result holds the skip reason when the archive stays where it is.
    fn find_destination(
        &mut self,
        archive: &ArchiveFile,
        candidates: &[MatchCandidate],
        library: &mut LibrarySnapshot,
        resolver: &mut dyn Resolver,
        position: usize,
        total: usize,
    ) -> anyhow::Result<Result<Destination, SkipReason>> {
        if let Some(candidate) = self.matcher.auto_select(candidates) {
            return Ok(Ok(Destination {
                folder: candidate.folder.clone(),
                created_folder: false,
                resolved_by_operator: false,
            }));
        }

        let resolution = resolver.resolve_match(&MatchRequest {
            archive,
            candidates,
            position,
            total,
        })?;

        match resolution {
            Resolution::Select(index) => {
                let candidate = candidates
                    .get(index)
                    .with_context(|| format!("Resolver selected unknown candidate {index}"))?;
                Ok(Ok(Destination {
                    folder: candidate.folder.clone(),
                    created_folder: false,
                    resolved_by_operator: true,
                }))
            }
            Resolution::CreateFolder(name) => {
                let (folder, created_folder) = self.create_folder(&name, library)?;
                Ok(Ok(Destination {
                    folder,
                    created_folder,
                    resolved_by_operator: true,
                }))
            }
            Resolution::Skip if candidates.is_empty() => Ok(Err(SkipReason::NoMatch)),
            Resolution::Skip => Ok(Err(SkipReason::OperatorSkipped)),
        }
    }

    /// True when the archive already sits in one of its candidate folders under the name it would get there.
    fn is_filed_in_candidate(&self, archive: &ArchiveFile, candidates: &[MatchCandidate]) -> bool {
        let Some(parent) = archive.path.parent() else {
            return false;
        };
        candidates
            .iter()
            .filter(|candidate| candidate.folder.path == parent)
            .any(|candidate| self.mover.plan(archive, &candidate.folder).is_in_place())
    }

    /// Get or create a series folder directly under the library root.
    ///
    /// A folder with the same name that is already known, or already exists on disk, is reused.
    /// Returns the folder and whether it was created.
    fn create_folder(&self, name: &str, library: &mut LibrarySnapshot) -> anyhow::Result<(SeriesFolder, bool)> {
        let name = sanitize_folder_name(name);
        if name.is_empty() {
            anyhow::bail!("Invalid folder name");
        }

        let path = library.root().join(&name);
        if let Some(folder) = library.find_by_path(&path) {
            return Ok((folder.clone(), false));
        }

        let title = self.config.titles.folder_title(&name);
        let folder = SeriesFolder::new(path.clone(), if title.is_empty() { name } else { title });
        let created = !path.is_dir();
        if created && !self.config.dryrun {
            fs::create_dir(&path).with_context(|| format!("Failed to create folder {}", path.display()))?;
        }
        library.insert(folder.clone());
        Ok((folder, created))
    }

    fn report(&self, archive: &ArchiveFile, file_index: &str, result: &ProcessResult) {
        let name = archive.file_name();
        match result {
            ProcessResult::Moved { target, renamed, .. } | ProcessResult::Planned { target, renamed } => {
                let prefix = if matches!(result, ProcessResult::Planned { .. }) {
                    "Would move"
                } else {
                    "Moved"
                };
                println!(
                    "{file_index} {prefix} {} {} {}",
                    name,
                    "→".green(),
                    get_relative_path_or_filename(target, &self.config.destination).cyan()
                );
                if *renamed {
                    show_diff(&name, &path_to_filename_string(target));
                }
            }
            ProcessResult::AlreadyInPlace => {
                if self.config.verbose {
                    println!("{file_index} Already in place: {name}");
                }
            }
            ProcessResult::Skipped(reason @ SkipReason::ExactDuplicate { .. }) => {
                if self.config.verbose {
                    println!("{file_index} Skipped {name}: {reason}");
                }
            }
            ProcessResult::Skipped(reason) => print_warning!("{file_index} Skipped {name}: {reason}"),
            ProcessResult::Failed { kind, message } => print_error!("{file_index} {name} ({kind}): {message}"),
        }
    }
}

fn content_path<'a>(staged: Option<&'a NamedTempFile>, source: &'a Path) -> &'a Path {
    staged.map_or(source, NamedTempFile::path)
}
