//! Processing strategies for independent work items

use coastflood_core::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How independent work items are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// One item after another on the calling thread
    Sequential,
    /// Rayon's global pool, all available cores
    #[default]
    Parallel,
    /// A dedicated pool with the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for an optional thread count as given on a command line
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            None | Some(0) => ProcessingMode::Parallel,
            Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    /// Number of workers this mode will use
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => *n,
        }
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices, keeping results in index order
    /// whatever the completion order.
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(range.map(f).collect()),
            ProcessingMode::Parallel => Ok(range.into_par_iter().map(f).collect()),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Other(format!("failed to build thread pool: {}", e)))?;
                Ok(pool.install(|| range.into_par_iter().map(f).collect()))
            }
        }
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}
