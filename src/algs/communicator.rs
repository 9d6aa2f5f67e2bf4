//! Thin façade over in-process or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! Point-to-point handles are **waitable** but non-blocking; the two
//! collectives the face resolver needs are provided on top of them and may be
//! overridden by backends with native collectives.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};

use crate::algs::exchange;
use crate::mesh_error::MeshFaceError;

/// Typed message tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Tag `k` steps after this one (wrapping).
    pub const fn offset(self, k: u16) -> Self {
        Self(self.0.wrapping_add(k))
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Communication interface used by the parallel face resolver.
///
/// Every rank must call the collectives in the same order with consistent
/// arguments; a rank that skips one leaves every other rank blocked.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// `true` for the serial stand-in that never talks to anyone.
    fn is_no_comm(&self) -> bool {
        false
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// `buf.len()` is the expected message length.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// All-to-all of one count per rank: `send[r]` goes to rank `r`,
    /// result `[r]` is what rank `r` sent here.
    fn all_to_all_counts(&self, send: &[usize], tag: CommTag) -> Result<Vec<usize>, MeshFaceError>
    where
        Self: Sized,
    {
        exchange::exchange_counts(self, send, tag)
    }

    /// Variable-length all-to-all: `send[r]` goes to rank `r`; `recv_len[r]`
    /// is the byte count announced by rank `r` in the counts phase.
    fn all_to_all_bytes(
        &self,
        send: &[Vec<u8>],
        recv_len: &[usize],
        tag: CommTag,
    ) -> Result<Vec<Vec<u8>>, MeshFaceError>
    where
        Self: Sized,
    {
        exchange::exchange_payloads(self, send, recv_len, tag)
    }
}

/// Compile-time no-op comm for pure serial runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn is_no_comm(&self) -> bool {
        true
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- RayonComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)

/// Shared mailbox of one in-process universe.
#[derive(Default)]
struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
    posted: Mutex<u64>,
    arrived: Condvar,
}

impl Mailbox {
    fn post(&self, key: Key, data: Bytes) {
        self.slots.entry(key).or_default().push_back(data);
        let mut generation = self.posted.lock();
        *generation += 1;
        self.arrived.notify_all();
    }

    fn try_take(&self, key: &Key) -> Option<Bytes> {
        self.slots.get_mut(key)?.pop_front()
    }

    /// Block until a message for `key` arrives.
    fn take(&self, key: &Key) -> Bytes {
        let mut generation = self.posted.lock();
        loop {
            if let Some(bytes) = self.try_take(key) {
                return bytes;
            }
            self.arrived.wait(&mut generation);
        }
    }
}

static MAILBOX: Lazy<Arc<Mailbox>> = Lazy::new(|| Arc::new(Mailbox::default()));

pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        Some(self.mailbox.take(&self.key).to_vec())
    }
}

/// In-process rank: one per thread, all ranks of a universe share a mailbox.
#[derive(Clone)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl std::fmt::Debug for RayonComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl RayonComm {
    /// Rank on the process-global mailbox.
    pub fn new(rank: usize, size: usize) -> Self {
        Self {
            rank,
            size,
            mailbox: Arc::clone(&MAILBOX),
        }
    }

    /// A fresh, isolated universe of `size` ranks.
    pub fn world(size: usize) -> Vec<Self> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.mailbox
            .post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::datatype::{Partition, PartitionMut};
    use mpi::environment::Universe;
    use mpi::request::StaticScope;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as _, CommunicatorCollectives, Destination, Source};
    use mpi::Count;

    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        // dropped last: finalizes MPI
        _universe: Option<Universe>,
    }

    impl MpiComm {
        /// Initialize MPI and wrap `MPI_COMM_WORLD`.
        pub fn new() -> Result<Self, MeshFaceError> {
            let universe = mpi::initialize().ok_or_else(|| MeshFaceError::CommError {
                neighbor: 0,
                message: "MPI already initialized or unavailable".to_string(),
            })?;
            let mut comm = Self::from_world(universe.world());
            comm._universe = Some(universe);
            Ok(comm)
        }

        /// Wrap a communicator owned by an already initialized environment.
        pub fn from_world(world: SimpleCommunicator) -> Self {
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self {
                world,
                rank,
                size,
                _universe: None,
            }
        }
    }

    pub struct MpiHandle(Box<dyn FnOnce() -> Option<Vec<u8>>>);

    impl Wait for MpiHandle {
        fn wait(self) -> Option<Vec<u8>> {
            (self.0)()
        }
    }

    fn to_counts(v: &[usize], peer: usize) -> Result<Vec<Count>, MeshFaceError> {
        v.iter()
            .map(|&n| {
                Count::try_from(n).map_err(|_| MeshFaceError::CommError {
                    neighbor: peer,
                    message: format!("count {n} exceeds MPI count range"),
                })
            })
            .collect()
    }

    fn displacements(counts: &[Count]) -> Vec<Count> {
        counts
            .iter()
            .scan(0, |acc, &x| {
                let old = *acc;
                *acc += x;
                Some(old)
            })
            .collect()
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            let raw: *mut [u8] = Box::into_raw(buf.to_vec().into_boxed_slice());
            // SAFETY: the allocation is reclaimed only after the request completes.
            let data: &'static [u8] = unsafe { &*raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, data, tag as i32);
            MpiHandle(Box::new(move || {
                req.wait();
                drop(unsafe { Box::from_raw(raw) });
                None
            }))
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiHandle {
            let raw: *mut [u8] = Box::into_raw(vec![0u8; buf.len()].into_boxed_slice());
            // SAFETY: as above; the buffer is handed back only after completion.
            let data: &'static mut [u8] = unsafe { &mut *raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_receive_into_with_tag(StaticScope, data, tag as i32);
            MpiHandle(Box::new(move || {
                req.wait();
                Some(unsafe { Box::from_raw(raw) }.into_vec())
            }))
        }

        fn all_to_all_counts(
            &self,
            send: &[usize],
            _tag: CommTag,
        ) -> Result<Vec<usize>, MeshFaceError> {
            exchange::check_rank_vector(self.rank, self.size, send.len())?;
            let counts = to_counts(send, self.rank)?;
            let mut recv = vec![0 as Count; self.size];
            self.world.all_to_all_into(&counts[..], &mut recv[..]);
            Ok(recv.into_iter().map(|c| c as usize).collect())
        }

        fn all_to_all_bytes(
            &self,
            send: &[Vec<u8>],
            recv_len: &[usize],
            _tag: CommTag,
        ) -> Result<Vec<Vec<u8>>, MeshFaceError> {
            exchange::check_rank_vector(self.rank, self.size, send.len())?;
            exchange::check_rank_vector(self.rank, self.size, recv_len.len())?;
            let send_counts = to_counts(&send.iter().map(Vec::len).collect::<Vec<_>>(), self.rank)?;
            let recv_counts = to_counts(recv_len, self.rank)?;
            let flat: Vec<u8> = send.concat();
            let mut recv = vec![0u8; recv_len.iter().sum()];
            {
                let send_displs = displacements(&send_counts);
                let recv_displs = displacements(&recv_counts);
                let send_part = Partition::new(&flat[..], send_counts, send_displs);
                let mut recv_part = PartitionMut::new(&mut recv[..], recv_counts, recv_displs);
                self.world.all_to_all_varcount_into(&send_part, &mut recv_part);
            }
            let mut out = Vec::with_capacity(self.size);
            let mut start = 0;
            for &len in recv_len {
                out.push(recv[start..start + len].to_vec());
                start += len;
            }
            Ok(out)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
