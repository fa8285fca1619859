use std::fs;
use std::io::{self, BufRead, StdinLock, Stdout, Write};
use std::path::Path;

use colored::Colorize;

use crate::organize::title::sanitize_folder_name;
use crate::organize::types::{ArchiveFile, CollisionDecision, MatchCandidate, Resolution};
use crate::{format_size, path_to_filename_string};

/// An archive that needs a decision on where it goes.
#[derive(Debug, Clone, Copy)]
pub struct MatchRequest<'a> {
    pub archive: &'a ArchiveFile,
    /// Candidates sorted best first. May be empty.
    pub candidates: &'a [MatchCandidate],
    /// One-based position of this archive in the run.
    pub position: usize,
    pub total: usize,
}

/// An archive whose target filename is taken by a different file.
#[derive(Debug, Clone, Copy)]
pub struct CollisionRequest<'a> {
    pub archive: &'a ArchiveFile,
    /// File that would be moved, possibly a rewritten copy of the archive.
    pub incoming: &'a Path,
    pub existing: &'a Path,
}

/// Makes the decisions the matcher cannot make on its own.
pub trait Resolver {
    /// Pick a candidate folder, name a new folder or skip the archive.
    ///
    /// # Errors
    /// Returns an error if the operator cannot be asked.
    fn resolve_match(&mut self, request: &MatchRequest<'_>) -> anyhow::Result<Resolution>;

    /// Decide what to do when the target filename is already taken.
    ///
    /// # Errors
    /// Returns an error if the operator cannot be asked.
    fn resolve_collision(&mut self, request: &CollisionRequest<'_>) -> anyhow::Result<CollisionDecision>;
}

/// What a non-interactive run does with ambiguous matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Take the highest scoring candidate.
    BestMatch,
    Skip,
}

/// Resolver for unattended runs. Never creates folders or replaces files.
#[derive(Debug, Clone, Copy)]
pub struct BatchResolver {
    policy: BatchPolicy,
}

impl BatchResolver {
    #[must_use]
    pub const fn new(policy: BatchPolicy) -> Self {
        Self { policy }
    }
}

impl Resolver for BatchResolver {
    fn resolve_match(&mut self, request: &MatchRequest<'_>) -> anyhow::Result<Resolution> {
        Ok(match self.policy {
            BatchPolicy::BestMatch if !request.candidates.is_empty() => Resolution::Select(0),
            _ => Resolution::Skip,
        })
    }

    fn resolve_collision(&mut self, _request: &CollisionRequest<'_>) -> anyhow::Result<CollisionDecision> {
        Ok(CollisionDecision::Skip)
    }
}

/// Line based prompt for terminals without full screen support.
pub struct PromptResolver<R, W> {
    input: R,
    output: W,
}

impl PromptResolver<StdinLock<'static>, Stdout> {
    /// Prompt on standard input and output.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptResolver<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Read one trimmed line. `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        write!(self.output, "{}", prompt.magenta())?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask_folder_name(&mut self, default: &str) -> anyhow::Result<Option<String>> {
        loop {
            let Some(answer) = self.read_line(&format!("New folder name [{default}]: "))? else {
                return Ok(None);
            };
            let name = sanitize_folder_name(if answer.is_empty() { default } else { &answer });
            if !name.is_empty() {
                return Ok(Some(name));
            }
            writeln!(self.output, "{}", "Folder name cannot be empty".red())?;
        }
    }
}

impl<R: BufRead, W: Write> Resolver for PromptResolver<R, W> {
    fn resolve_match(&mut self, request: &MatchRequest<'_>) -> anyhow::Result<Resolution> {
        writeln!(
            self.output,
            "\n{} {}",
            format!("[{}/{}]", request.position, request.total).bold(),
            request.archive.file_name().cyan().bold()
        )?;
        if request.candidates.is_empty() {
            writeln!(self.output, "  No matching folders")?;
        }
        for (index, candidate) in request.candidates.iter().enumerate() {
            writeln!(
                self.output,
                "  {}) {} {}",
                index + 1,
                candidate.folder.title,
                format!("({:.2})", candidate.score).dimmed()
            )?;
        }

        let count = request.candidates.len();
        let prompt = if count == 0 {
            "[n]ew folder / [s]kip: ".to_string()
        } else {
            format!("Select 1-{count} / [n]ew folder / [s]kip: ")
        };

        loop {
            let Some(answer) = self.read_line(&prompt)? else {
                return Ok(Resolution::Skip);
            };
            match answer.to_lowercase().as_str() {
                "" | "s" => return Ok(Resolution::Skip),
                "n" => {
                    return Ok(self
                        .ask_folder_name(&request.archive.title)?
                        .map_or(Resolution::Skip, Resolution::CreateFolder));
                }
                other => match other.parse::<usize>() {
                    Ok(number) if (1..=count).contains(&number) => return Ok(Resolution::Select(number - 1)),
                    _ => writeln!(self.output, "{}", format!("Invalid choice: {answer}").red())?,
                },
            }
        }
    }

    fn resolve_collision(&mut self, request: &CollisionRequest<'_>) -> anyhow::Result<CollisionDecision> {
        writeln!(
            self.output,
            "{} {} already exists with different content",
            "Name taken:".yellow(),
            path_to_filename_string(request.existing)
        )?;
        writeln!(
            self.output,
            "  existing {}, incoming {}",
            file_size(request.existing),
            file_size(request.incoming)
        )?;
        loop {
            let Some(answer) = self.read_line("[s]kip / [k]eep both / [r]eplace: ")? else {
                return Ok(CollisionDecision::Skip);
            };
            match answer.to_lowercase().as_str() {
                "" | "s" => return Ok(CollisionDecision::Skip),
                "k" => return Ok(CollisionDecision::KeepBoth),
                "r" => return Ok(CollisionDecision::Replace),
                _ => writeln!(self.output, "{}", format!("Invalid choice: {answer}").red())?,
            }
        }
    }
}

/// Human readable size, or "?" when the file cannot be read.
#[must_use]
pub fn file_size(path: &Path) -> String {
    fs::metadata(path).map_or_else(|_| "?".to_string(), |metadata| format_size(metadata.len()))
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::collections::VecDeque;

    use super::{CollisionRequest, MatchRequest, Resolver};
    use crate::organize::types::{CollisionDecision, Resolution};

    /// Resolver answering from a fixed list, skipping once the list runs out.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedResolver {
        pub(crate) matches: VecDeque<Resolution>,
        pub(crate) collisions: VecDeque<CollisionDecision>,
        /// Archive filenames in the order they were asked about.
        pub(crate) asked: Vec<String>,
    }

    impl ScriptedResolver {
        pub(crate) fn new(matches: Vec<Resolution>) -> Self {
            Self {
                matches: matches.into(),
                ..Self::default()
            }
        }

        pub(crate) fn with_collisions(mut self, collisions: Vec<CollisionDecision>) -> Self {
            self.collisions = collisions.into();
            self
        }
    }

    impl Resolver for ScriptedResolver {
        fn resolve_match(&mut self, request: &MatchRequest<'_>) -> anyhow::Result<Resolution> {
            self.asked.push(request.archive.file_name());
            Ok(self.matches.pop_front().unwrap_or(Resolution::Skip))
        }

        fn resolve_collision(&mut self, _request: &CollisionRequest<'_>) -> anyhow::Result<CollisionDecision> {
            Ok(self.collisions.pop_front().unwrap_or(CollisionDecision::Skip))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use std::path::PathBuf;

    use crate::organize::types::SeriesFolder;

    fn archive() -> ArchiveFile {
        ArchiveFile {
            path: PathBuf::from("/in/Naruto_c1.zip"),
            stem: "Naruto_c1".to_string(),
            title: "Naruto".to_string(),
            suffix: "_c1".to_string(),
            extension: "zip".to_string(),
            internal_root: None,
        }
    }

    fn candidates() -> Vec<MatchCandidate> {
        ["Naruto", "Naruto Shippuden"]
            .iter()
            .map(|title| {
                MatchCandidate::new(
                    SeriesFolder::new(PathBuf::from("/library").join(title), (*title).to_string()),
                    0.8,
                    0,
                )
            })
            .collect()
    }

    fn resolve(input: &str, candidates: &[MatchCandidate]) -> (Resolution, String) {
        let archive = archive();
        let mut output = Vec::new();
        let resolution = {
            let mut resolver = PromptResolver::new(Cursor::new(input.as_bytes()), &mut output);
            resolver
                .resolve_match(&MatchRequest {
                    archive: &archive,
                    candidates,
                    position: 1,
                    total: 1,
                })
                .unwrap()
        };
        (resolution, String::from_utf8(output).unwrap())
    }

    fn collide(input: &str) -> CollisionDecision {
        let archive = archive();
        let mut resolver = PromptResolver::new(Cursor::new(input.as_bytes()), Vec::new());
        resolver
            .resolve_collision(&CollisionRequest {
                archive: &archive,
                incoming: Path::new("/in/Naruto_c1.zip"),
                existing: Path::new("/library/Naruto/Naruto_c1.zip"),
            })
            .unwrap()
    }

    #[test]
    fn prompt_selects_numbered_candidate() {
        let (resolution, output) = resolve("2\n", &candidates());
        assert_eq!(resolution, Resolution::Select(1));
        assert!(output.contains("Naruto Shippuden"));
    }

    #[test]
    fn prompt_retries_after_invalid_input() {
        let (resolution, output) = resolve("7\nfoo\n1\n", &candidates());
        assert_eq!(resolution, Resolution::Select(0));
        assert!(output.contains("Invalid choice: 7"));
        assert!(output.contains("Invalid choice: foo"));
    }

    #[test]
    fn prompt_skip_and_end_of_input() {
        assert_eq!(resolve("s\n", &candidates()).0, Resolution::Skip);
        assert_eq!(resolve("\n", &candidates()).0, Resolution::Skip);
        assert_eq!(resolve("", &candidates()).0, Resolution::Skip);
    }

    #[test]
    fn prompt_new_folder_uses_given_name() {
        assert_eq!(
            resolve("n\nNaruto: Gaiden\n", &[]).0,
            Resolution::CreateFolder("Naruto Gaiden".to_string())
        );
    }

    #[test]
    fn prompt_new_folder_defaults_to_archive_title() {
        assert_eq!(resolve("n\n\n", &candidates()).0, Resolution::CreateFolder("Naruto".to_string()));
    }

    #[test]
    fn prompt_without_candidates_rejects_numbers() {
        let (resolution, output) = resolve("1\ns\n", &[]);
        assert_eq!(resolution, Resolution::Skip);
        assert!(output.contains("No matching folders"));
        assert!(output.contains("Invalid choice: 1"));
    }

    #[test]
    fn prompt_collision_choices() {
        assert_eq!(collide("k\n"), CollisionDecision::KeepBoth);
        assert_eq!(collide("R\n"), CollisionDecision::Replace);
        assert_eq!(collide("x\ns\n"), CollisionDecision::Skip);
        assert_eq!(collide(""), CollisionDecision::Skip);
    }

    #[test]
    fn file_size_of_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.zip");
        assert_eq!(file_size(&path), "?");
        fs::write(&path, vec![0_u8; 2048]).unwrap();
        assert_eq!(file_size(&path), "2.00 KB");
    }

    #[test]
    fn batch_best_match_takes_first_candidate() {
        let archive = archive();
        let candidates = candidates();
        let mut resolver = BatchResolver::new(BatchPolicy::BestMatch);
        let request = MatchRequest {
            archive: &archive,
            candidates: &candidates,
            position: 1,
            total: 1,
        };
        assert_eq!(resolver.resolve_match(&request).unwrap(), Resolution::Select(0));

        let empty = MatchRequest {
            candidates: &[],
            ..request
        };
        assert_eq!(resolver.resolve_match(&empty).unwrap(), Resolution::Skip);
    }

    #[test]
    fn batch_skip_never_moves() {
        let archive = archive();
        let candidates = candidates();
        let mut resolver = BatchResolver::new(BatchPolicy::Skip);
        let request = MatchRequest {
            archive: &archive,
            candidates: &candidates,
            position: 1,
            total: 1,
        };
        assert_eq!(resolver.resolve_match(&request).unwrap(), Resolution::Skip);
        assert_eq!(
            resolver
                .resolve_collision(&CollisionRequest {
                    archive: &archive,
                    incoming: Path::new("a.zip"),
                    existing: Path::new("b.zip"),
                })
                .unwrap(),
            CollisionDecision::Skip
        );
    }
}
