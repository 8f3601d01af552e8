//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use contracts::{CommandLine, JobBackend};
use dispatcher::{Dispatcher, DispatcherBuilder};
use observability::DispatchStats;

use crate::cli::RunArgs;
use crate::overrides::resolve_config;

/// Execute the `run` command
pub async fn run_dispatch(args: &RunArgs) -> Result<()> {
    let config = resolve_config(&args.dispatch).context("Failed to resolve configuration")?;

    info!(
        backend = config.backend.label(),
        job_name = %config.defaults.name,
        threads = config.defaults.threads,
        max_malloc_gb = config.defaults.max_malloc_gb,
        "Configuration resolved"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        println!(
            "{}",
            config_loader::ConfigLoader::to_toml(&config).context("Failed to render config")?
        );
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let mut dispatcher = DispatcherBuilder::new(config)
        .build()
        .await
        .context("Failed to start dispatcher")?;
    let mut stats = DispatchStats::new();

    let result = match &args.commands {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            dispatch_lines(BufReader::new(file), &mut dispatcher, &mut stats).await
        }
        None => dispatch_lines(BufReader::new(tokio::io::stdin()), &mut dispatcher, &mut stats).await,
    };

    // Join whatever was already handed over, even after a failure
    let report = dispatcher.wait().await.context("Failed to wait for jobs")?;
    stats.record_drain(report);
    eprint!("{stats}");

    result?;
    if report.failed > 0 {
        warn!(failed = report.failed, "Some jobs ended unsuccessfully; see their logfiles");
    }
    info!("mtsh finished");
    Ok(())
}

/// A command line, or `None` for blank input
pub fn parse_line(line: &str) -> Option<CommandLine> {
    let line = line.trim();
    (!line.is_empty()).then(|| CommandLine::shell(line))
}

/// Run every non-blank line of `reader`, stopping at the first failure
pub async fn dispatch_lines<R, B>(
    reader: R,
    dispatcher: &mut Dispatcher<B>,
    stats: &mut DispatchStats,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    B: JobBackend,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read command")? {
        let Some(command) = parse_line(&line) else {
            continue;
        };

        let started = Instant::now();
        let result = dispatcher.run_command(command).await;
        stats.record_submit(started.elapsed().as_secs_f64() * 1000.0, result.is_ok());
        result.with_context(|| format!("Failed to run '{}'", line.trim()))?;
    }
    Ok(())
}
