use super::Host;
use super::common::{CommonArgs, Session};
use crate::Result;
use crate::crawl::Progress;
use crate::records::{UpdateOutcome, update_record};
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Record file to update
    #[arg(value_name = "PATH")]
    pub path: Utf8PathBuf,

    /// Refetch every facet, even those already present
    #[arg(long)]
    pub force: bool,
}

pub async fn process_update<H: Host>(host: &mut H, args: &UpdateArgs) -> Result<()> {
    let session = Session::new(&args.common)?;

    let outcome = update_record(session.client.as_ref(), &args.path, args.force).await?;
    session.progress.done();

    let message = match outcome {
        UpdateOutcome::Written => format!("Updated '{}'", args.path),
        UpdateOutcome::Unchanged => format!("'{}' is already up to date", args.path),
    };

    let _ = writeln!(host.output(), "{message} ({} API calls)", session.client.calls().total());
    Ok(())
}
