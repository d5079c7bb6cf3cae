//! Provides a communicator backed by an MPI implementation, for groups
//! launched with `mpiexec`. MPI point-to-point messages between one pair of
//! ranks are non-overtaking, which gives the FIFO guarantee the trait asks
//! for.

use super::comm;
use super::{check_rank, TransportError};
use rsmpi::environment::Universe;
use rsmpi::point_to_point::{Destination, Source};
use rsmpi::topology::{Communicator, SystemCommunicator};

pub struct MpiCommunicator {
    world: SystemCommunicator,
    // Dropping the universe finalizes MPI, so it must outlive `world`.
    _universe: Universe,
}

impl MpiCommunicator {
    /// Initialize MPI. Fails if MPI has already been initialized in this
    /// process.
    pub fn init() -> Result<Self, TransportError> {
        let universe = rsmpi::initialize()
            .ok_or(TransportError::Unsupported("MPI has already been initialized"))?;
        Ok(Self {
            world: universe.world(),
            _universe: universe,
        })
    }
}

impl comm::Communicator for MpiCommunicator {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn send(&self, rank: usize, tag: usize, message: Vec<u8>) -> Result<(), TransportError> {
        check_rank(rank, self.size())?;
        self.world
            .process_at_rank(rank as i32)
            .send_with_tag(&message[..], tag as i32);
        Ok(())
    }

    fn recv(&self, rank: usize, tag: usize) -> Result<Vec<u8>, TransportError> {
        check_rank(rank, self.size())?;
        let (message, _status) = self
            .world
            .process_at_rank(rank as i32)
            .receive_vec_with_tag::<u8>(tag as i32);
        Ok(message)
    }
}
