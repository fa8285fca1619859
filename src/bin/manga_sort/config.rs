//! Configuration for `MangaSort`.
//!
//! Combines CLI arguments with the `[mangasort]` section of the user config file.

use anyhow::{Context, Result};
use itertools::Itertools;

use manga_organizer::organize::{
    DEFAULT_AUTO_SCORE, DEFAULT_EXTENSIONS, DEFAULT_MIN_PARTIAL_CHARS, DEFAULT_MIN_SCORE, MangaSortConfig,
    OrganizeConfig, ResolverMode, TitleParser,
};

use crate::Args;

/// Create config from given command line args and user config file.
///
/// # Errors
/// Returns an error if a directory is missing or a setting is invalid.
pub fn from_args(args: Args) -> Result<OrganizeConfig> {
    let user_config = MangaSortConfig::get_user_config(args.config.as_deref());
    merge(args, user_config)
}

/// CLI arguments take precedence over the user config file.
fn merge(args: Args, user_config: MangaSortConfig) -> Result<OrganizeConfig> {
    let source = manga_organizer::resolve_input_path(args.path.as_deref().or(user_config.source_directory.as_deref()))?;

    let destination = args
        .dest
        .as_deref()
        .or(user_config.destination_directory.as_deref())
        .context("No destination library given. Use --dest or set destination_directory in the config file")?;
    let destination = manga_organizer::resolve_required_input_path(destination)?;

    let mut extensions: Vec<String> = user_config
        .extensions
        .into_iter()
        .chain(args.extension)
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .unique()
        .collect();

    if extensions.is_empty() {
        extensions = DEFAULT_EXTENSIONS.iter().map(|&s| s.to_string()).collect();
    }

    let include: Vec<String> = user_config
        .include
        .into_iter()
        .chain(args.include)
        .map(|s| s.to_lowercase())
        .unique()
        .collect();

    let exclude: Vec<String> = user_config
        .exclude
        .into_iter()
        .chain(args.exclude)
        .map(|s| s.to_lowercase())
        .unique()
        .collect();

    let titles = TitleParser::new(
        user_config.folder_prefix_pattern.as_deref(),
        user_config.volume_pattern.as_deref(),
    )?;

    let resolver = if args.auto {
        ResolverMode::Best
    } else if args.skip {
        ResolverMode::Skip
    } else if args.plain {
        ResolverMode::Prompt
    } else {
        user_config.resolver.unwrap_or_default()
    };

    let config = OrganizeConfig {
        source,
        destination,
        extensions,
        include,
        exclude,
        titles,
        min_score: args.min_score.or(user_config.min_score).unwrap_or(DEFAULT_MIN_SCORE),
        auto_score: args.auto_score.or(user_config.auto_score).unwrap_or(DEFAULT_AUTO_SCORE),
        min_partial_chars: user_config.min_partial_chars.unwrap_or(DEFAULT_MIN_PARTIAL_CHARS),
        resolver,
        keep_names: args.keep_names || user_config.keep_names,
        trash_duplicates: args.trash_duplicates || user_config.trash_duplicates,
        recurse: args.recurse || user_config.recurse,
        dryrun: args.print || user_config.dryrun,
        log: args.log || user_config.log,
        debug: args.debug || user_config.debug,
        verbose: args.verbose || user_config.verbose,
    };

    config.validate()?;
    Ok(config)
}
