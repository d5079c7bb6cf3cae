//! Acquisition and release of the process group.
//!
//! [`Group::init`] takes ownership of a transport and produces the
//! [`GroupContext`] that the peer and root logic are handed explicitly. The
//! group is finalized when the guard is dropped, so it is released on every
//! exit path, including an early return with an error.
//!
//! Only one group may be active at a time per thread of execution. Ranks of
//! an in-process group each run on their own thread, so each of them can hold
//! a group of its own.

use crate::error::{Error, Result};
use crate::message::Communicator;
use crate::protocol::ROOT;
use std::cell::Cell;
use tracing::debug;

thread_local! {
    static GROUP_ACTIVE: Cell<bool> = Cell::new(false);
}

/// The identity of the calling process within its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupContext {
    pub rank: usize,
    pub size: usize,
}

impl GroupContext {
    pub fn is_root(&self) -> bool {
        self.rank == ROOT
    }

    /// The ranks the root collects from, in the order it collects them.
    pub fn peers(&self) -> std::ops::Range<usize> {
        ROOT + 1..self.size
    }
}

/// An initialized group. There can only be one per thread at a time; when
/// dropped, the group is finalized and the transport released.
pub struct Group<C: Communicator> {
    comm: C,
    context: GroupContext,
}

impl<C: Communicator> Group<C> {
    /// Initialize the group over the given transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] if a group is already active on
    /// this thread, or [`Error::Bootstrap`] if the transport reports an empty
    /// group or a rank outside of it.
    pub fn init(comm: C) -> Result<Self> {
        if GROUP_ACTIVE.with(|active| active.replace(true)) {
            return Err(Error::AlreadyInitialized);
        }

        let context = GroupContext {
            rank: comm.rank(),
            size: comm.size(),
        };
        if context.size == 0 || context.rank >= context.size {
            GROUP_ACTIVE.with(|active| active.set(false));
            return Err(Error::Bootstrap(format!(
                "rank {} is not a member of a group of size {}",
                context.rank, context.size
            )));
        }

        debug!(rank = context.rank, size = context.size, "group initialized");
        Ok(Self { comm, context })
    }

    pub fn context(&self) -> GroupContext {
        self.context
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Release the group. Equivalent to dropping it.
    pub fn finalize(self) {}
}

impl<C: Communicator> Drop for Group<C> {
    fn drop(&mut self) {
        GROUP_ACTIVE.with(|active| active.set(false));
        debug!(rank = self.context.rank, "group finalized");
    }
}
