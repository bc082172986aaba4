//! Thin façade over the broadcast-from-root primitive the reader needs.
//!
//! Rank 0 is authoritative: after [`Communicator::broadcast_bytes`] every rank
//! holds rank 0's buffer. Three backends are provided: [`NoComm`] for a single
//! process, [`ThreadComm`] for several ranks living in one process (used by the
//! multi-rank tests), and `MpiComm` behind the `mpi-support` feature.

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};

/// Root-0 broadcast interface (minimal by design).
pub trait Communicator {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Replace `buf` on every non-root rank with rank 0's contents.
    fn broadcast_bytes(&self, buf: &mut Vec<u8>);

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// Single-process comm; broadcasting is a no-op.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast_bytes(&self, _buf: &mut Vec<u8>) {}
}

// --- ThreadComm: several ranks inside one process ---
type Key = (u64, usize, u64); // (group, dst, sequence)

static MAILBOX: Lazy<DashMap<Key, Bytes>> = Lazy::new(DashMap::new);
static NEXT_GROUP: AtomicU64 = AtomicU64::new(1);

/// One rank of an in-process group. Each rank must live on its own thread and
/// every rank must take part in every broadcast, in the same order.
#[derive(Debug)]
pub struct ThreadComm {
    group: u64,
    rank: usize,
    size: usize,
    sequence: AtomicU64,
}

impl ThreadComm {
    /// Create the `size` ranks of a fresh group.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let group = NEXT_GROUP.fetch_add(1, Ordering::Relaxed);
        (0..size)
            .map(|rank| ThreadComm {
                group,
                rank,
                size,
                sequence: AtomicU64::new(0),
            })
            .collect()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast_bytes(&self, buf: &mut Vec<u8>) {
        if self.size <= 1 {
            return;
        }
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        if self.rank == 0 {
            let payload = Bytes::copy_from_slice(buf);
            for dst in 1..self.size {
                MAILBOX.insert((self.group, dst, seq), payload.clone());
            }
            return;
        }
        let key = (self.group, self.rank, seq);
        loop {
            if let Some((_, bytes)) = MAILBOX.remove(&key) {
                buf.clear();
                buf.extend_from_slice(&bytes);
                return;
            }
            std::thread::yield_now();
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as _, Root as _};

    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new(world: SimpleCommunicator) -> Self {
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self { world, rank, size }
        }

        pub fn world(&self) -> &SimpleCommunicator {
            &self.world
        }
    }

    impl super::Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn broadcast_bytes(&self, buf: &mut Vec<u8>) {
            let root = self.world.process_at_rank(0);
            let mut len = buf.len() as u64;
            root.broadcast_into(&mut len);
            buf.resize(len as usize, 0);
            root.broadcast_into(&mut buf[..]);
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_comm_is_single_root() {
        let comm = NoComm;
        let mut buf = vec![1, 2, 3];
        comm.broadcast_bytes(&mut buf);
        assert_eq!(buf, vec![1, 2, 3]);
        assert!(comm.is_root());
        assert_eq!(comm.size(), 1);
    }

    #[test]
    fn thread_group_receives_root_buffer() {
        let comms = ThreadComm::group(3);
        let received: Vec<Vec<u8>> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let mut first = if comm.is_root() { vec![9, 8, 7] } else { vec![0] };
                        comm.broadcast_bytes(&mut first);
                        let mut second = if comm.is_root() { vec![1] } else { Vec::new() };
                        comm.broadcast_bytes(&mut second);
                        first.extend(second);
                        first
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for buf in received {
            assert_eq!(buf, vec![9, 8, 7, 1]);
        }
    }

    #[cfg(feature = "mpi-support")]
    #[test]
    fn mpi_comm_is_a_reader_communicator() {
        fn reader_comm<C: Communicator>() {}
        reader_comm::<MpiComm>();
    }
}
