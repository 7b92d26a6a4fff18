use super::Host;
use super::common::{CommonArgs, Session};
use crate::Result;
use crate::crawl::Progress;
use crate::github::RepoApi;
use clap::{Parser, ValueEnum};
use ohno::bail;
use std::io::Write;

/// What to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CountKind {
    /// Issues and pull requests in any state
    Issues,

    /// Commits on the default branch
    Commits,

    /// Contributors, including anonymous ones
    Contributors,
}

#[derive(Parser, Debug)]
pub struct CountArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Repository as `owner/name`
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// What to count
    #[arg(value_name = "WHAT")]
    pub kind: CountKind,
}

pub async fn process_count<H: Host>(host: &mut H, args: &CountArgs) -> Result<()> {
    let repo = args.repo.trim().trim_matches('/');
    if repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
        bail!("repository must be given as 'owner/name', got '{}'", args.repo);
    }

    let session = Session::new(&args.common)?;
    let client = session.client.as_ref();

    let count = match args.kind {
        CountKind::Issues => client.issue_count(repo).await?,
        CountKind::Commits => client.commit_count(repo).await?,
        CountKind::Contributors => client.contributor_count(repo).await?,
    };
    session.progress.done();

    let _ = writeln!(host.output(), "{count}");
    Ok(())
}
