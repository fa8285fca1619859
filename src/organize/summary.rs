use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;

use crate::organize::types::{FailureKind, ProcessResult, SkipReason};
use crate::{format_duration, path_to_filename_string};

/// Statistics for one sorting run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub archives_scanned: usize,
    pub moved: usize,
    pub renamed: usize,
    pub folders_created: usize,
    /// Moves decided by the operator instead of the matcher.
    pub resolved_by_operator: usize,
    /// Dry run moves.
    pub planned: usize,
    pub already_in_place: usize,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub failed: Vec<(PathBuf, FailureKind, String)>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn add_result(&mut self, path: &Path, result: &ProcessResult) {
        match result {
            ProcessResult::Moved {
                renamed,
                created_folder,
                resolved_by_operator,
                ..
            } => {
                self.moved += 1;
                self.renamed += usize::from(*renamed);
                self.folders_created += usize::from(*created_folder);
                self.resolved_by_operator += usize::from(*resolved_by_operator);
            }
            ProcessResult::Planned { renamed, .. } => {
                self.planned += 1;
                self.renamed += usize::from(*renamed);
            }
            ProcessResult::AlreadyInPlace => self.already_in_place += 1,
            ProcessResult::Skipped(reason) => self.skipped.push((path.to_path_buf(), reason.clone())),
            ProcessResult::Failed { kind, message } => self.add_failure(path, *kind, message.clone()),
        }
    }

    pub fn add_failure(&mut self, path: &Path, kind: FailureKind, message: String) {
        self.failed.push((path.to_path_buf(), kind, message));
    }

    /// Skipped archives that still need attention.
    pub fn unresolved(&self) -> impl Iterator<Item = &(PathBuf, SkipReason)> {
        self.skipped.iter().filter(|(_, reason)| reason.is_unresolved())
    }

    #[must_use]
    pub fn exact_duplicates(&self) -> usize {
        self.skipped.len() - self.unresolved().count()
    }

    pub fn print_summary(&self) {
        println!("{}", "\n--- Sort Summary ---".bold().magenta());
        println!("Archives scanned:       {}", self.archives_scanned);
        if self.planned > 0 {
            println!("Archives to move:       {}", self.planned);
        } else {
            println!("Archives moved:         {}", self.moved);
        }
        println!("Archives renamed:       {}", self.renamed);
        println!("Folders created:        {}", self.folders_created);
        println!("Operator decisions:     {}", self.resolved_by_operator);
        println!("Already in place:       {}", self.already_in_place);
        println!("Exact duplicates:       {}", self.exact_duplicates());
        println!(
            "Failed:                 {}",
            if self.failed.is_empty() {
                "0".normal()
            } else {
                self.failed.len().to_string().red()
            }
        );

        let unresolved: Vec<_> = self.unresolved().collect();
        println!(
            "Unresolved:             {}",
            if unresolved.is_empty() {
                "0".normal()
            } else {
                unresolved.len().to_string().yellow()
            }
        );
        for (path, reason) in unresolved {
            println!("  - {} ({reason})", path_to_filename_string(path));
        }
        for (path, kind, message) in &self.failed {
            println!("  - {} ({kind}): {message}", path_to_filename_string(path).red());
        }

        println!("Total time:             {}", format_duration(self.duration));
    }
}
