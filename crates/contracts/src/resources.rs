//! Batch resource requests
//!
//! Memory ceilings are given in GB and rendered in the smallest unit that
//! keeps the value at or above one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Memory clause of a resource request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryRequest {
    Kilobytes(u64),
    Megabytes(u64),
    Gigabytes(u64),
}

impl MemoryRequest {
    /// Convert a ceiling in GB.
    ///
    /// Returns `None` for zero, negative, non-finite values and for values
    /// that truncate to zero kilobytes; the request then carries no memory
    /// clause at all.
    pub fn from_gigabytes(gb: f64) -> Option<Self> {
        if !gb.is_finite() || gb <= 0.0 {
            return None;
        }

        if gb >= 1.0 {
            Some(Self::Gigabytes(gb.trunc() as u64))
        } else if gb * 1_000.0 >= 1.0 {
            Some(Self::Megabytes((gb * 1_000.0).trunc() as u64))
        } else if gb * 1_000_000.0 >= 1.0 {
            Some(Self::Kilobytes((gb * 1_000_000.0).trunc() as u64))
        } else {
            None
        }
    }
}

impl fmt::Display for MemoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kilobytes(v) => write!(f, "{v}kb"),
            Self::Megabytes(v) => write!(f, "{v}mb"),
            Self::Gigabytes(v) => write!(f, "{v}gb"),
        }
    }
}

/// Per-job reservation: one node, `threads` cores, optional memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRequest {
    pub threads: u32,
    pub memory: Option<MemoryRequest>,
}

impl ResourceRequest {
    pub fn new(threads: u32, memory_gb: f64) -> Self {
        Self {
            threads: threads.max(1),
            memory: MemoryRequest::from_gigabytes(memory_gb),
        }
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select=1:ncpus={}:mpiprocs=1", self.threads)?;
        if let Some(memory) = self.memory {
            write!(f, ":mem={memory}")?;
        }
        Ok(())
    }
}
