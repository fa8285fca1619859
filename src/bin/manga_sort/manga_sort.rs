use std::io::IsTerminal;

use colored::Colorize;

use manga_organizer::organize::{
    BatchPolicy, BatchResolver, FileLogger, OrganizeConfig, Organizer, PromptResolver, Resolver, ResolverMode,
};
use manga_organizer::print_bold;

use crate::Args;
use crate::tui::TuiResolver;

pub struct MangaSort {
    config: OrganizeConfig,
}

impl MangaSort {
    pub fn new(args: Args) -> anyhow::Result<Self> {
        let config = crate::config::from_args(args)?;
        if config.debug {
            println!("{config:#?}");
        }
        Ok(Self { config })
    }

    pub fn run(self) -> anyhow::Result<()> {
        let dryrun = self.config.dryrun;
        if self.config.verbose {
            println!(
                "Sorting {} into {}",
                self.config.source.display().to_string().magenta(),
                self.config.destination.display().to_string().cyan()
            );
            println!("Extensions: {:?}", self.config.extensions);
        }
        if dryrun {
            print_bold!("Dry run: nothing will be moved");
        }

        let mut resolver = build_resolver(self.config.resolver);
        let mut organizer = Organizer::new(self.config);
        if organizer.config().log {
            let logger = FileLogger::new()?;
            if organizer.config().verbose {
                println!("Logging to {}", logger.path().display());
            }
            organizer = organizer.with_logger(logger);
        }

        let summary = organizer.run(resolver.as_mut())?;
        summary.print_summary();
        Ok(())
    }
}

/// Pick the resolver for the configured mode.
///
/// The full screen dialog needs an interactive terminal,
/// otherwise the line prompt is used so input can be piped in.
fn build_resolver(mode: ResolverMode) -> Box<dyn Resolver> {
    match mode {
        ResolverMode::Tui if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() => {
            Box::new(TuiResolver::new())
        }
        ResolverMode::Tui | ResolverMode::Prompt => Box::new(PromptResolver::stdio()),
        ResolverMode::Best => Box::new(BatchResolver::new(BatchPolicy::BestMatch)),
        ResolverMode::Skip => Box::new(BatchResolver::new(BatchPolicy::Skip)),
    }
}
