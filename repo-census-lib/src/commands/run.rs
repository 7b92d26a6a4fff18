//! Command dispatch logic for repo-census

use super::{CountArgs, CrawlArgs, InitArgs, UpdateArgs, init_config, process_count, process_crawl, process_update};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "repo-census", version, author, long_about = None)]
#[command(about = "Incrementally crawl GitHub repository statistics into a local dataset")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: CensusSubcommand,
}

#[derive(Subcommand, Debug)]
enum CensusSubcommand {
    /// Update every record under the records directory
    Crawl(Box<CrawlArgs>),
    /// Update a single record
    Update(Box<UpdateArgs>),
    /// Count the issues, commits, or contributors of one repository
    Count(Box<CountArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        CensusSubcommand::Crawl(crawl_args) => process_crawl(host, crawl_args).await,
        CensusSubcommand::Update(update_args) => process_update(host, update_args).await,
        CensusSubcommand::Count(count_args) => process_count(host, count_args).await,
        CensusSubcommand::Init(init_args) => init_config(host, init_args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::common::LogLevel;
    use crate::commands::count::CountKind;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_crawl_with_repeated_tokens() {
        let cli = Cli::try_parse_from([
            "repo-census",
            "crawl",
            "--github-token",
            "a",
            "--github-token",
            "b,c",
            "--concurrency",
            "8",
            "--force",
        ])
        .unwrap();

        let CensusSubcommand::Crawl(args) = cli.command else {
            panic!("expected crawl");
        };
        assert_eq!(args.common.github_tokens, vec!["a", "b", "c"]);
        assert_eq!(args.concurrency, Some(8));
        assert!(args.force);
        assert_eq!(args.common.log_level, LogLevel::Info);
    }

    #[test]
    fn test_parse_count() {
        let cli = Cli::try_parse_from(["repo-census", "count", "rust-lang/rust", "contributors", "--github-token", "t"]).unwrap();

        let CensusSubcommand::Count(args) = cli.command else {
            panic!("expected count");
        };
        assert_eq!(args.repo, "rust-lang/rust");
        assert_eq!(args.kind, CountKind::Contributors);
    }

    #[test]
    fn test_parse_update() {
        let cli = Cli::try_parse_from(["repo-census", "update", "records/a.json", "--force", "--log-level", "none"]).unwrap();

        let CensusSubcommand::Update(args) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.path, "records/a.json");
        assert!(args.force);
        assert_eq!(args.common.log_level, LogLevel::None);
    }

    #[test]
    fn test_unknown_count_kind_is_rejected() {
        assert!(Cli::try_parse_from(["repo-census", "count", "a/b", "stars"]).is_err());
    }
}
