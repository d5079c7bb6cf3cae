//! Launches an in-process group: one thread per rank, each owning the
//! communicator for its rank.

use crate::error::{Error, Result};
use crate::message::{LocalCommunicator, LocalGroup};
use std::thread;

/// Run `job` once per rank of a new group of the given size, each on its own
/// thread named `rank-{r}`, and return the results in rank order. If `pin`
/// is set, rank threads are pinned round-robin to CPU cores.
///
/// All rank threads are joined before this returns. The first error in rank
/// order is returned, and a rank thread that panics is reported as
/// [`Error::RankPanicked`].
pub fn run_local<T, F>(size: usize, pin: bool, job: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(LocalCommunicator) -> Result<T> + Sync,
{
    if size == 0 {
        return Err(Error::Config("a group needs at least one rank".into()));
    }
    let cores = if pin { Cores::detect() } else { Cores::none() };
    let job = &job;
    let cores = &cores;

    thread::scope(|scope| {
        let handles = LocalGroup::new(size)
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                thread::Builder::new()
                    .name(format!("rank-{}", rank))
                    .spawn_scoped(scope, move || {
                        cores.pin(rank);
                        job(comm)
                    })
                    .map_err(|e| Error::Bootstrap(format!("cannot start rank {}: {}", rank, e)))
            })
            .collect::<Vec<_>>();

        let mut results = Vec::with_capacity(size);
        let mut first_error = None;
        for (rank, handle) in handles.into_iter().enumerate() {
            let result = handle.and_then(|h| h.join().unwrap_or_else(|_| Err(Error::RankPanicked(rank))));
            match result {
                Ok(value) => results.push(value),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    })
}

#[cfg(feature = "core_affinity")]
struct Cores(Vec<core_affinity::CoreId>);

#[cfg(feature = "core_affinity")]
impl Cores {
    fn detect() -> Self {
        Cores(core_affinity::get_core_ids().unwrap_or_default())
    }

    fn none() -> Self {
        Cores(Vec::new())
    }

    fn pin(&self, rank: usize) {
        if !self.0.is_empty() {
            core_affinity::set_for_current(self.0[rank % self.0.len()]);
        }
    }
}

#[cfg(not(feature = "core_affinity"))]
struct Cores;

#[cfg(not(feature = "core_affinity"))]
impl Cores {
    fn detect() -> Self {
        tracing::warn!("core pinning requested, but the core_affinity feature is disabled");
        Cores
    }

    fn none() -> Self {
        Cores
    }

    fn pin(&self, _rank: usize) {}
}
