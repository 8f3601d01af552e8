//! Merge the configuration file with command-line overrides.

use config_loader::ConfigLoader;
use contracts::{BackendKind, BatchSpec, DispatchConfig, PoolSpec, RankSpec};
use tracing::info;

use crate::cli::DispatchArgs;
use crate::error::{CliError, Result};

/// Cores per job when neither a configuration file nor `--threads` sets them
const DEFAULT_THREADS: u32 = 2;

/// Load the configuration (if any), apply flags, then validate the result
///
/// Without a configuration file the thread-pool backend is used unless a
/// flag selects another one, and each job asks for two cores.
pub fn resolve_config(args: &DispatchArgs) -> Result<DispatchConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)?
        }
        None => {
            let mut config = DispatchConfig {
                backend: BackendKind::ThreadPool(PoolSpec::default()),
                ..Default::default()
            };
            config.defaults.threads = DEFAULT_THREADS;
            config
        }
    };

    apply_overrides(&mut config, args)?;
    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn apply_overrides(config: &mut DispatchConfig, args: &DispatchArgs) -> Result<()> {
    // `--mpi 0` leaves MPI off
    let mpi = args.mpi.filter(|&n| n > 0);

    if args.pbs {
        if !matches!(config.backend, BackendKind::BatchQueue(_)) {
            config.backend = BackendKind::BatchQueue(BatchSpec::default());
        }
    } else if mpi.is_some() {
        if !matches!(config.backend, BackendKind::DistributedRanks(_)) {
            config.backend = BackendKind::DistributedRanks(RankSpec::default());
        }
    } else if args.local {
        config.backend = BackendKind::Local;
    }

    match &mut config.backend {
        BackendKind::Local => {}
        BackendKind::ThreadPool(spec) => {
            if let Some(threads) = args.threads {
                spec.threads = threads;
            }
        }
        BackendKind::DistributedRanks(spec) => {
            if let Some(processes) = mpi {
                spec.processes = processes;
            }
            if !args.mpi_host.is_empty() {
                spec.hosts = args.mpi_host.clone();
                spec.hosts_file = None;
            }
            if let Some(ref file) = args.mpi_host_file {
                spec.hosts_file = Some(file.clone());
                spec.hosts.clear();
            }
            if let Some(ref dir) = args.mpi_dir {
                spec.mpi_dir = Some(dir.clone());
            }
        }
        BackendKind::BatchQueue(spec) => {
            if let Some(ref queue) = args.pbs_queue {
                spec.queue = Some(queue.clone());
            }
            if args.pbs_no_block {
                spec.block_until_complete = false;
            }
        }
    }

    let defaults = &mut config.defaults;
    if let Some(threads) = args.threads {
        if threads == 0 {
            return Err(CliError::invalid_argument("--threads", "must be at least 1"));
        }
        defaults.threads = threads;
    }
    if let Some(gb) = args.max_malloc {
        defaults.max_malloc_gb = gb;
    }
    if let Some(ref name) = args.name {
        defaults.name = name.clone();
    }
    if let Some(ref log) = args.logfile {
        defaults.logfile = Some(log.clone());
    }
    if let Some(ref id) = args.pbs_after {
        defaults.after = Some(id.clone());
    }
    if let Some(ref id) = args.pbs_before {
        defaults.before = Some(id.clone());
    }

    if let Some(ref dir) = args.toolkit_dir {
        config.toolkit_dir = Some(dir.clone());
    }
    if let Some(ref dir) = args.workdir {
        config.working_dir = Some(dir.clone());
    }

    Ok(())
}
