mod config;
mod manga_sort;
mod tui;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::manga_sort::MangaSort;

#[derive(Parser)]
#[command(author, version, name = env!("CARGO_BIN_NAME"), about = "Sort manga archives into series folders")]
struct Args {
    /// Directory containing the archives to sort
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Library root containing the series folders
    #[arg(short = 'd', long, name = "DIR", value_hint = clap::ValueHint::DirPath)]
    dest: Option<PathBuf>,

    /// Move to the best match without asking
    #[arg(short = 'a', long, conflicts_with_all = ["skip", "plain"])]
    auto: bool,

    /// Skip archives that need a decision
    #[arg(short = 's', long, conflicts_with = "plain")]
    skip: bool,

    /// Ask with a line prompt instead of the full screen dialog
    #[arg(short = 'P', long)]
    plain: bool,

    /// Keep original archive names
    #[arg(short = 'k', long)]
    keep_names: bool,

    /// Move exact duplicates from the source to trash
    #[arg(short = 't', long)]
    trash_duplicates: bool,

    /// Only print changes without moving files
    #[arg(short = 'p', long)]
    print: bool,

    /// Recurse into source subdirectories
    #[arg(short = 'r', long)]
    recurse: bool,

    /// Include only archives whose name contains this
    #[arg(short = 'n', long, num_args = 1, action = clap::ArgAction::Append, name = "INCLUDE")]
    include: Vec<String>,

    /// Exclude archives whose name contains this
    #[arg(short = 'e', long, num_args = 1, action = clap::ArgAction::Append, name = "EXCLUDE")]
    exclude: Vec<String>,

    /// Archive extensions to include
    #[arg(short = 'x', long, num_args = 1, action = clap::ArgAction::Append, name = "EXTENSION")]
    extension: Vec<String>,

    /// Minimum similarity for a folder to be a candidate
    #[arg(short = 'm', long, name = "MIN")]
    min_score: Option<f64>,

    /// Similarity at which a single candidate is used without asking
    #[arg(short = 'A', long, name = "AUTO")]
    auto_score: Option<f64>,

    /// Use this config file instead of the default one
    #[arg(short = 'c', long, name = "FILE", value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Write a run log to the log directory
    #[arg(short = 'L', long)]
    log: bool,

    /// Print debug information
    #[arg(short = 'D', long)]
    debug: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        manga_organizer::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        MangaSort::new(args)?.run()
    }
}

#[cfg(test)]
mod cli_args_tests {
    use super::*;

    #[test]
    fn empty_by_default() {
        let args = Args::try_parse_from(["test"]).expect("should parse");
        assert!(args.path.is_none());
        assert!(args.dest.is_none());
        assert!(!args.auto);
        assert!(!args.skip);
        assert!(!args.plain);
        assert!(!args.keep_names);
        assert!(!args.print);
        assert!(!args.recurse);
        assert!(args.include.is_empty());
        assert!(args.extension.is_empty());
        assert!(args.min_score.is_none());
    }

    #[test]
    fn parses_source_and_destination() {
        let args = Args::try_parse_from(["test", "/inbox", "-d", "/library"]).expect("should parse");
        assert_eq!(args.path, Some(PathBuf::from("/inbox")));
        assert_eq!(args.dest, Some(PathBuf::from("/library")));

        let args = Args::try_parse_from(["test", "--dest", "/library"]).expect("should parse");
        assert_eq!(args.dest, Some(PathBuf::from("/library")));
    }

    #[test]
    fn parses_multiple_filters() {
        let args = Args::try_parse_from(["test", "-n", "naruto", "-n", "bleach", "-e", "raw", "-x", "cbz"])
            .expect("should parse");
        assert_eq!(args.include, vec!["naruto", "bleach"]);
        assert_eq!(args.exclude, vec!["raw"]);
        assert_eq!(args.extension, vec!["cbz"]);
    }

    #[test]
    fn parses_scores() {
        let args = Args::try_parse_from(["test", "-m", "0.5", "--auto-score", "0.95"]).expect("should parse");
        assert_eq!(args.min_score, Some(0.5));
        assert_eq!(args.auto_score, Some(0.95));
    }

    #[test]
    fn rejects_invalid_score() {
        assert!(Args::try_parse_from(["test", "-m", "high"]).is_err());
    }

    #[test]
    fn parses_combined_flags() {
        let args = Args::try_parse_from(["test", "-kprtv"]).expect("should parse");
        assert!(args.keep_names);
        assert!(args.print);
        assert!(args.recurse);
        assert!(args.trash_duplicates);
        assert!(args.verbose);
    }

    #[test]
    fn resolver_flags_conflict() {
        assert!(Args::try_parse_from(["test", "-a", "-s"]).is_err());
        assert!(Args::try_parse_from(["test", "--auto", "--plain"]).is_err());
        assert!(Args::try_parse_from(["test", "-s", "-P"]).is_err());
        assert!(Args::try_parse_from(["test", "-a"]).is_ok());
    }

    #[test]
    fn parses_config_and_log_flags() {
        let args = Args::try_parse_from(["test", "-c", "/tmp/custom.toml", "-L", "-D"]).expect("should parse");
        assert_eq!(args.config, Some(PathBuf::from("/tmp/custom.toml")));
        assert!(args.log);
        assert!(args.debug);
    }

    #[test]
    fn parses_completion() {
        let args = Args::try_parse_from(["test", "-l", "zsh"]).expect("should parse");
        assert_eq!(args.completion, Some(Shell::Zsh));
    }
}
