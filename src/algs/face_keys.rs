//! Per-element face descriptor emission.
//!
//! For every `(element, local face)` pair of a volume block, gather the
//! face's corner nodes through the topology's face map, translate them to
//! node ids, and sum their fingerprints into the face hash id. Descriptors
//! are handed to a sink, normally [`FaceTable::insert_or_update`].

use crate::algs::node_hash::combine;
use crate::mesh_error::MeshFaceError;
use crate::topology::block::ElementBlock;
use crate::topology::face::{
    ElementFaceRef, FaceConnectivity, FaceTable, GlobalNodeId, HashedId, MAX_FACE_NODES,
};

/// Where element ids inside [`ElementFaceRef`]s come from.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ElementIdSource {
    /// 1-based position in the traversal, continuing across blocks.
    Positional,
    /// The block's own global element ids (positional if the block has none).
    #[default]
    FromBlock,
}

/// One emitted face descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceDescriptor {
    pub hash_id: HashedId,
    pub connectivity: FaceConnectivity,
    pub face_ref: ElementFaceRef,
}

/// Emits face descriptors for element blocks over one node-id array.
#[derive(Clone, Copy, Debug)]
pub struct FaceKeyBuilder<'a> {
    node_ids: &'a [GlobalNodeId],
    hashed: &'a [HashedId],
    element_ids: ElementIdSource,
}

impl<'a> FaceKeyBuilder<'a> {
    /// `hashed[i]` must be the fingerprint of `node_ids[i]`.
    pub fn new(
        node_ids: &'a [GlobalNodeId],
        hashed: &'a [HashedId],
        element_ids: ElementIdSource,
    ) -> Result<Self, MeshFaceError> {
        if node_ids.len() != hashed.len() {
            return Err(MeshFaceError::HashCountMismatch {
                hashed: hashed.len(),
                nodes: node_ids.len(),
            });
        }
        Ok(Self {
            node_ids,
            hashed,
            element_ids,
        })
    }

    /// Walk `block` and pass every descriptor to `emit`.
    ///
    /// `position` is the running 1-based element counter for
    /// [`ElementIdSource::Positional`]; it advances by the block's element
    /// count even when the block contributes no faces, so positional ids
    /// match the local element numbering. Returns the number of descriptors
    /// emitted.
    pub fn build<F>(
        &self,
        block: &ElementBlock,
        position: &mut u64,
        mut emit: F,
    ) -> Result<usize, MeshFaceError>
    where
        F: FnMut(FaceDescriptor) -> Result<(), MeshFaceError>,
    {
        let first_position = *position;
        *position += block.element_count() as u64;

        let cell_type = block.cell_type();
        if cell_type.parametric_dimension() != 3 {
            log::debug!(
                "block `{}` ({cell_type}) has no faces; skipped",
                block.name()
            );
            return Ok(0);
        }
        block.validate(self.node_ids.len())?;

        let block_ids = match self.element_ids {
            ElementIdSource::FromBlock => block.element_ids(),
            ElementIdSource::Positional => None,
        };

        let faces = cell_type.faces();
        let mut emitted = 0usize;
        for elem in 0..block.element_count() {
            let element_id = match block_ids {
                Some(ids) => ids[elem],
                None => first_position + elem as u64,
            };
            let nodes = block.element_nodes(elem);
            for (local_face, corners) in faces.iter().enumerate() {
                debug_assert!(corners.len() <= MAX_FACE_NODES);
                let mut connectivity: FaceConnectivity = [0; MAX_FACE_NODES];
                for (slot, &corner) in connectivity.iter_mut().zip(corners.iter()) {
                    *slot = self.node_ids[nodes[corner]];
                }
                let hash_id = combine(corners.iter().map(|&c| self.hashed[nodes[c]]));
                emit(FaceDescriptor {
                    hash_id,
                    connectivity,
                    face_ref: ElementFaceRef::new(element_id, local_face)?,
                })?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    /// Collect every descriptor of `block` in emission order.
    pub fn descriptors(
        &self,
        block: &ElementBlock,
        position: &mut u64,
    ) -> Result<Vec<FaceDescriptor>, MeshFaceError> {
        let mut out = Vec::with_capacity(block.element_count() * block.cell_type().number_faces());
        self.build(block, position, |d| {
            out.push(d);
            Ok(())
        })?;
        Ok(out)
    }

    /// Emit `block` straight into `table`.
    pub fn build_into(
        &self,
        block: &ElementBlock,
        position: &mut u64,
        table: &mut FaceTable,
    ) -> Result<usize, MeshFaceError> {
        self.build(block, position, |d| {
            table.insert_or_update(d.hash_id, d.connectivity, d.face_ref)
        })
    }
}
