//! `render` command implementation.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use contracts::{BackendKind, BatchSpec, CommandLine, DispatchConfig, EnvSnapshot};
use dispatcher::render_script;

use crate::cli::RenderArgs;
use crate::overrides::resolve_config;

/// Execute the `render` command
pub fn run_render(args: &RenderArgs) -> Result<()> {
    let config = resolve_config(&args.dispatch).context("Failed to resolve configuration")?;
    let working_dir = working_dir(&config)?;
    let command = command_from_args(&args.command)?;
    let script = render_for(&config, command, &working_dir, &EnvSnapshot::capture());

    info!(backend = config.backend.label(), "Rendered batch script");
    print!("{script}");
    Ok(())
}

/// One argument is a shell line; more are argv and get quoted
fn command_from_args(args: &[String]) -> Result<CommandLine> {
    match args {
        [] => anyhow::bail!("No command given"),
        [line] => Ok(CommandLine::shell(line.clone())),
        [program, rest @ ..] => Ok(CommandLine::new(program.clone()).args(rest.iter().cloned())),
    }
}

fn working_dir(config: &DispatchConfig) -> Result<PathBuf> {
    match &config.working_dir {
        Some(dir) => dir
            .canonicalize()
            .with_context(|| format!("Working directory not found: {}", dir.display())),
        None => std::env::current_dir().context("Failed to read current directory"),
    }
}

/// Script for `command`, using the batch settings when the configuration
/// selects the batch backend and the defaults otherwise
fn render_for(
    config: &DispatchConfig,
    command: CommandLine,
    working_dir: &std::path::Path,
    env: &EnvSnapshot,
) -> String {
    let spec = match &config.backend {
        BackendKind::BatchQueue(spec) => spec.clone(),
        _ => BatchSpec::default(),
    };
    let job = config.defaults.job(command);
    render_script(&job, &spec, working_dir, env)
}
