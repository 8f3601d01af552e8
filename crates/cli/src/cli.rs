//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// mtsh - run shell command lines through a job backend
#[derive(Parser, Debug)]
#[command(
    name = "mtsh",
    author,
    version,
    about = "Run shell command lines locally, on a thread pool, over MPI or through PBS",
    long_about = "Reads one shell command per line and dispatches each to the selected backend.\n\n\
                  Without --pbs, --mpi or --local the commands are fed to a thread-pool \n\
                  worker (thrsh) located in the toolkit directory."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MTSH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "MTSH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch command lines read from stdin or a file
    Run(RunArgs),

    /// Print the PBS script a command would be submitted with
    Render(RenderArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Backend selection and job defaults shared by `run` and `render`
#[derive(Args, Debug, Clone, Default)]
pub struct DispatchArgs {
    /// Configuration file (TOML or JSON); flags override its values
    #[arg(short, long, env = "MTSH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Threads for the thread pool and cores requested per batch job
    #[arg(long, env = "MTSH_THREADS")]
    pub threads: Option<u32>,

    /// Memory ceiling per batch job in GB (0 = no memory clause)
    #[arg(long, value_name = "GB", env = "MTSH_MAX_MALLOC")]
    pub max_malloc: Option<f64>,

    /// Toolkit directory holding thrsh and mpish
    #[arg(long, value_name = "DIRECTORY", env = "MTSH_TOOLKIT_DIR")]
    pub toolkit_dir: Option<PathBuf>,

    /// Run each command directly and wait for it
    #[arg(long, conflicts_with_all = ["pbs", "mpi"])]
    pub local: bool,

    /// MPI process count (mpirun --np); selects the MPI backend
    #[arg(long, value_name = "N", conflicts_with = "pbs")]
    pub mpi: Option<u32>,

    /// MPI installation prefix containing mpirun
    #[arg(long, value_name = "DIRECTORY", env = "MTSH_MPI_DIR")]
    pub mpi_dir: Option<PathBuf>,

    /// Hosts to run ranks on (mpirun --host)
    #[arg(long, value_name = "HOSTS", value_delimiter = ',', conflicts_with = "mpi_host_file")]
    pub mpi_host: Vec<String>,

    /// Host file (mpirun --hostfile)
    #[arg(long, value_name = "FILE")]
    pub mpi_host_file: Option<PathBuf>,

    /// Submit each command as a PBS job
    #[arg(long)]
    pub pbs: bool,

    /// PBS queue
    #[arg(long, value_name = "NAME", env = "MTSH_PBS_QUEUE")]
    pub pbs_queue: Option<String>,

    /// Run PBS jobs after this job id
    #[arg(long, value_name = "ID")]
    pub pbs_after: Option<String>,

    /// Run PBS jobs before this job id
    #[arg(long, value_name = "ID")]
    pub pbs_before: Option<String>,

    /// Return once PBS has queued each job instead of waiting for it to finish
    #[arg(long)]
    pub pbs_no_block: bool,

    /// Job name
    #[arg(long, env = "MTSH_NAME")]
    pub name: Option<String>,

    /// Redirect each job's stderr to this file
    #[arg(long, value_name = "FILE")]
    pub logfile: Option<PathBuf>,

    /// Working directory for jobs
    #[arg(long, value_name = "DIRECTORY", env = "MTSH_WORKDIR")]
    pub workdir: Option<PathBuf>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Read command lines from this file instead of stdin
    #[arg(long, value_name = "FILE")]
    pub commands: Option<PathBuf>,

    /// Resolve the configuration and exit without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MTSH_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `render` command
#[derive(Parser, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Command line to render
    ///
    /// A single argument is used as a shell line verbatim; several
    /// arguments are a program and its arguments, quoted as needed.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "mtsh.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
