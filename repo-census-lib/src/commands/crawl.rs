use super::Host;
use super::common::{CommonArgs, Session};
use crate::Result;
use crate::crawl::{CrawlOptions, CrawlStats, format_hms, run_crawl};
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct CrawlArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Directory of records to update (overrides `records_dir` from the configuration)
    #[arg(long, value_name = "PATH")]
    pub records_dir: Option<Utf8PathBuf>,

    /// Maximum number of records updated at once (overrides `concurrency` from the configuration)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Refetch every facet, even those already present
    #[arg(long)]
    pub force: bool,

    /// Exit with status code 1 if any record could not be updated
    #[arg(long)]
    pub error_if_failures: bool,
}

pub async fn process_crawl<H: Host>(host: &mut H, args: &CrawlArgs) -> Result<()> {
    let session = Session::new(&args.common)?;

    let root = args.records_dir.clone().unwrap_or_else(|| session.config.records_dir.clone());
    let options = CrawlOptions {
        concurrency: args.concurrency.unwrap_or(session.config.concurrency),
        force: args.force,
        report_interval: session.config.report_interval,
    };

    let stats = run_crawl(session.client, root.as_std_path(), &options, &session.progress).await?;
    write_summary(host, &stats);

    if args.error_if_failures && !stats.failures.is_empty() {
        host.exit(1);
    }

    Ok(())
}

fn write_summary<H: Host>(host: &mut H, stats: &CrawlStats) {
    if !stats.failures.is_empty() {
        let mut err = host.error();
        let _ = writeln!(err, "\nUnable to update {} record(s)", stats.failures.len());
        for failure in &stats.failures {
            let _ = writeln!(err, "  {}: {}", failure.path.display(), failure.error);
        }
    }

    let _ = writeln!(
        host.output(),
        "Processed {} of {} records in {} ({} written, {} failed, {} skipped, {} API calls)",
        stats.completed,
        stats.discovered(),
        format_hms(stats.elapsed),
        stats.written,
        stats.failures.len(),
        stats.skipped,
        stats.calls
    );
}
