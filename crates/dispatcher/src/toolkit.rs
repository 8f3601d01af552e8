//! Toolkit discovery - worker shims and the MPI launcher
//!
//! The persistent backends need two helper programs shipped with the
//! toolkit: `thrsh` (thread-pool worker) and `mpish` (per-rank worker).
//! Both read newline-delimited commands on stdin.

use std::path::{Path, PathBuf};

use contracts::ContractError;
use tracing::debug;

/// Thread-pool worker shim
pub const THREAD_SHIM: &str = "thrsh";
/// MPI worker shim
pub const MPI_SHIM: &str = "mpish";
/// MPI launcher
pub const MPIRUN: &str = "mpirun";

/// Search path for toolkit executables
#[derive(Debug, Clone)]
pub struct Toolkit {
    root: PathBuf,
    bindirs: Vec<PathBuf>,
}

impl Toolkit {
    /// Build the search path.
    ///
    /// With `dir`, searches `<dir>/bin`, `<dir>/progs`, `<dir>/scripts` and
    /// `<dir>`. Without it, the running executable's directory and its
    /// parent come first, then the same subdirectories of the parent.
    ///
    /// # Errors
    /// `MissingInput` if `dir` does not exist.
    pub fn locate(dir: Option<&Path>) -> Result<Self, ContractError> {
        let mut bindirs = Vec::new();

        let root = match dir {
            Some(dir) => {
                if !dir.exists() {
                    return Err(ContractError::missing_input(dir));
                }
                dir.canonicalize()?
            }
            None => {
                let exe = std::env::current_exe()?;
                let exe_dir = exe
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                bindirs.push(exe_dir.clone());
                match exe_dir.parent() {
                    Some(parent) => {
                        bindirs.push(parent.to_path_buf());
                        parent.to_path_buf()
                    }
                    None => exe_dir,
                }
            }
        };

        for sub in ["bin", "progs", "scripts"] {
            let candidate = root.join(sub);
            if candidate.is_dir() {
                bindirs.push(candidate);
            }
        }
        bindirs.push(root.clone());

        debug!(root = %root.display(), bindirs = ?bindirs, "Toolkit search path");
        Ok(Self { root, bindirs })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.bindirs
    }

    /// First regular file called `name` on the search path
    pub fn find(&self, name: &str) -> Result<PathBuf, ContractError> {
        self.bindirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| ContractError::missing_executable(name, self.bindirs.clone()))
    }

    pub fn thread_shim(&self) -> Result<PathBuf, ContractError> {
        self.find(THREAD_SHIM)
    }

    pub fn mpi_shim(&self) -> Result<PathBuf, ContractError> {
        self.find(MPI_SHIM)
    }
}

/// Resolve `mpirun`.
///
/// Looks in `<mpi_dir>/bin` then `<mpi_dir>`; without `mpi_dir` the bare
/// name is returned and resolved through `PATH` at spawn time.
pub fn locate_mpirun(mpi_dir: Option<&Path>) -> Result<PathBuf, ContractError> {
    let Some(dir) = mpi_dir else {
        return Ok(PathBuf::from(MPIRUN));
    };

    if !dir.exists() {
        return Err(ContractError::missing_input(dir));
    }
    let dir = dir.canonicalize()?;

    let searched = vec![dir.join("bin"), dir.clone()];
    searched
        .iter()
        .map(|d| d.join(MPIRUN))
        .find(|p| p.exists())
        .ok_or_else(|| ContractError::missing_executable(MPIRUN, searched.clone()))
}
