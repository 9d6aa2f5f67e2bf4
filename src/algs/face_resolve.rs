//! Resolve faces cut by a partition boundary.
//!
//! After local generation, a face on a partition cut looks like an outer
//! boundary face: only one local element uses it. Such a face is a
//! *potential match* with rank `R` when every one of its corner nodes is
//! shared with `R`. Potential matches are exchanged in two collective
//! phases (counts, then payload) and every received candidate that names a
//! local face gets its element-face reference appended.
//!
//! All ranks must call [`ParallelFaceResolver::resolve`] the same number of
//! times in the same order, even ranks with nothing to send.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use itertools::Itertools;

use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::sharing::{NodeSharingMap, SharingIndex};
use crate::algs::wire::{WireFaceCandidate, cast_slice, decode_records};
use crate::mesh_error::MeshFaceError;
use crate::topology::face::{Face, FaceTable, GlobalNodeId, LocalNodeIndex};

/// Default base tag; the payload phase uses `tag + 1`.
pub const FACE_EXCHANGE_TAG: CommTag = CommTag::new(0xFACE);

/// Counters of one resolution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResolveStats {
    /// Candidates sent, summed over peers.
    pub candidates_sent: usize,
    /// Candidates received, summed over peers.
    pub candidates_received: usize,
    /// Received candidates that upgraded a local face to two owners.
    pub merged: usize,
    /// Received candidates with no local face of the same node set.
    pub unmatched: usize,
}

impl std::ops::AddAssign for ResolveStats {
    fn add_assign(&mut self, rhs: Self) {
        self.candidates_sent += rhs.candidates_sent;
        self.candidates_received += rhs.candidates_received;
        self.merged += rhs.merged;
        self.unmatched += rhs.unmatched;
    }
}

pub struct ParallelFaceResolver<'a, C: Communicator> {
    comm: &'a C,
    index: SharingIndex,
    local_of: HashMap<GlobalNodeId, LocalNodeIndex>,
    tag: CommTag,
}

impl<'a, C: Communicator> ParallelFaceResolver<'a, C> {
    /// Validate the sharing map and build the node → ranks index.
    ///
    /// `node_ids[i]` is the id faces use for local node `i`. Every check
    /// happens here, before any collective is issued.
    pub fn new(
        comm: &'a C,
        sharing: &NodeSharingMap,
        node_ids: &[GlobalNodeId],
    ) -> Result<Self, MeshFaceError> {
        sharing.validate(node_ids.len(), comm.rank(), comm.size())?;
        let index = SharingIndex::build(sharing, node_ids.len())?;
        let local_of = node_ids
            .iter()
            .enumerate()
            .filter(|&(i, _)| index.is_shared(i))
            .map(|(i, &id)| (id, i))
            .collect();
        Ok(Self {
            comm,
            index,
            local_of,
            tag: FACE_EXCHANGE_TAG,
        })
    }

    /// Use `tag` (and `tag + 1`) instead of [`FACE_EXCHANGE_TAG`].
    pub fn with_tag(mut self, tag: CommTag) -> Self {
        self.tag = tag;
        self
    }

    pub fn sharing_index(&self) -> &SharingIndex {
        &self.index
    }

    /// Remote ranks that hold every corner node of `face`.
    fn ranks_sharing_whole_face(&self, face: &Face) -> Vec<usize> {
        let corners: Vec<LocalNodeIndex> = match face
            .connectivity()
            .iter()
            .filter(|&&id| id != 0)
            .map(|id| self.local_of.get(id).copied())
            .collect::<Option<Vec<_>>>()
        {
            Some(corners) => corners,
            // some corner is not shared with anyone
            None => return Vec::new(),
        };

        // ranks_of lists each rank once per node
        corners
            .iter()
            .flat_map(|&node| self.index.ranks_of(node).iter().copied())
            .counts()
            .into_iter()
            .filter(|&(_, n)| n == corners.len())
            .map(|(r, _)| r)
            .collect()
    }

    /// Per-rank candidate lists for every single-owner face of `table`.
    ///
    /// Candidates are sorted so repeated runs send identical payloads.
    pub fn potential_matches(&self, table: &FaceTable) -> BTreeMap<usize, Vec<WireFaceCandidate>> {
        let mut out: BTreeMap<usize, Vec<WireFaceCandidate>> = BTreeMap::new();
        for face in table.boundary_faces() {
            for rank in self.ranks_sharing_whole_face(face) {
                out.entry(rank).or_default().push(WireFaceCandidate::new(
                    face.hash_id(),
                    face.connectivity(),
                    face.element_refs()[0],
                ));
            }
        }
        for list in out.values_mut() {
            list.sort_unstable_by_key(|c| (c.hash_id(), c.connectivity(), c.face_ref()));
        }
        out
    }

    /// Exchange candidates with every rank and merge confirmed matches.
    ///
    /// Serial communicators return immediately without communicating.
    pub fn resolve(&self, table: &mut FaceTable) -> Result<ResolveStats, MeshFaceError> {
        let mut stats = ResolveStats::default();
        if self.comm.is_no_comm() || self.comm.size() <= 1 {
            return Ok(stats);
        }
        let (me, size) = (self.comm.rank(), self.comm.size());

        let outgoing = self.potential_matches(table);
        let send_counts: Vec<usize> = (0..size)
            .map(|r| outgoing.get(&r).map_or(0, Vec::len))
            .collect();
        stats.candidates_sent = send_counts.iter().sum();
        for (rank, list) in &outgoing {
            log::debug!("rank {me}: {} face candidates for rank {rank}", list.len());
        }

        // --- Phase 1: counts ---------------------------------------------
        // A failed count exchange still enters phase 2 so no peer is left
        // waiting on this rank's payload.
        let (recv_counts, counts_err) = match self.comm.all_to_all_counts(&send_counts, self.tag) {
            Ok(counts) => (counts, None),
            Err(err) => (vec![0; size], Some(err)),
        };

        // --- Phase 2: payload --------------------------------------------
        let send_bytes: Vec<Vec<u8>> = (0..size)
            .map(|r| outgoing.get(&r).map_or_else(Vec::new, |v| cast_slice(v).to_vec()))
            .collect();
        let recv_len: Vec<usize> = recv_counts
            .iter()
            .enumerate()
            .map(|(r, &n)| if r == me { send_bytes[r].len() } else { n * WireFaceCandidate::SIZE })
            .collect();
        let received = self
            .comm
            .all_to_all_bytes(&send_bytes, &recv_len, self.tag.offset(1));
        if let Some(err) = counts_err {
            return Err(err);
        }
        let received = received?;

        // --- Merge -------------------------------------------------------
        for (peer, bytes) in received.iter().enumerate() {
            if peer == me {
                continue;
            }
            let candidates: Vec<WireFaceCandidate> =
                decode_records(bytes).ok_or(MeshFaceError::PayloadSizeMismatch {
                    neighbor: peer,
                    expected: recv_len[peer],
                    found: bytes.len(),
                })?;
            stats.candidates_received += candidates.len();
            for cand in &candidates {
                let conn = cand.connectivity();
                if table.attach_existing(cand.hash_id(), &conn, cand.face_ref())? {
                    log::trace!("rank {me}: {conn:?} joined with {} from rank {peer}", cand.face_ref());
                    stats.merged += 1;
                } else {
                    stats.unmatched += 1;
                }
            }
        }
        if stats.unmatched > 0 {
            log::warn!(
                "rank {me}: {} received face candidates matched no local face",
                stats.unmatched
            );
        }
        log::debug!(
            "rank {me}: sent {} / received {} face candidates, merged {}",
            stats.candidates_sent,
            stats.candidates_received,
            stats.merged
        );
        Ok(stats)
    }
}
