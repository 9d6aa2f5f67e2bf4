//! Nodal sharing map and its CSR index.
//!
//! The mesh layer reports, for every local node that also lives on other
//! ranks, one `(local node, remote rank)` pair per remote copy. The resolver
//! needs the reverse view (node → ranks), built here as a compressed
//! sparse row structure:
//!
//! * `offsets[n] .. offsets[n + 1]` = range of node `n` inside `ranks`
//! * `ranks` = remote ranks, ascending within each node's range

use std::collections::BTreeSet;

use crate::mesh_error::MeshFaceError;
use crate::topology::face::LocalNodeIndex;

/// Unordered `(local node, remote rank)` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeSharingMap {
    pairs: Vec<(LocalNodeIndex, usize)>,
}

impl NodeSharingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: Vec<(LocalNodeIndex, usize)>) -> Self {
        Self { pairs }
    }

    /// Record that `node` also exists on `rank`.
    pub fn add(&mut self, node: LocalNodeIndex, rank: usize) {
        self.pairs.push((node, rank));
    }

    pub fn pairs(&self) -> &[(LocalNodeIndex, usize)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Reject entries naming unknown nodes, out-of-world ranks or `my_rank`.
    pub fn validate(
        &self,
        node_count: usize,
        my_rank: usize,
        size: usize,
    ) -> Result<(), MeshFaceError> {
        for &(node, rank) in &self.pairs {
            if node >= node_count {
                return Err(MeshFaceError::SharingNodeOutOfRange { node, node_count });
            }
            if rank >= size || rank == my_rank {
                return Err(MeshFaceError::InvalidSharingRank { node, rank, size });
            }
        }
        Ok(())
    }
}

/// CSR view: local node → ranks that also hold it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharingIndex {
    offsets: Vec<usize>,
    ranks: Vec<usize>,
}

impl SharingIndex {
    /// Build the index for `node_count` local nodes. Duplicate pairs collapse.
    pub fn build(map: &NodeSharingMap, node_count: usize) -> Result<Self, MeshFaceError> {
        let mut sorted = map.pairs.clone();
        sorted.sort_unstable();
        sorted.dedup();

        // 1) count per node
        let mut offsets = vec![0usize; node_count + 1];
        for &(node, _) in &sorted {
            if node >= node_count {
                return Err(MeshFaceError::SharingNodeOutOfRange { node, node_count });
            }
            offsets[node + 1] += 1;
        }
        // 2) prefix-sum into offsets
        for n in 0..node_count {
            offsets[n + 1] += offsets[n];
        }
        // 3) pairs are already grouped by node, ranks ascending
        let ranks = sorted.into_iter().map(|(_, rank)| rank).collect();

        Ok(Self { offsets, ranks })
    }

    pub fn node_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Remote ranks holding `node` (ascending); empty for unshared nodes.
    pub fn ranks_of(&self, node: LocalNodeIndex) -> &[usize] {
        match (self.offsets.get(node), self.offsets.get(node + 1)) {
            (Some(&lo), Some(&hi)) => &self.ranks[lo..hi],
            _ => &[],
        }
    }

    pub fn is_shared(&self, node: LocalNodeIndex) -> bool {
        !self.ranks_of(node).is_empty()
    }

    /// Every rank this process shares at least one node with.
    pub fn neighbor_ranks(&self) -> BTreeSet<usize> {
        self.ranks.iter().copied().collect()
    }
}
