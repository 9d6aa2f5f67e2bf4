//! Element blocks: the read-only mesh view the face generator consumes.
//!
//! A block is a homogeneous set of elements sharing one [`CellType`], with
//! raw local connectivity (`LocalNodeIndex` per element-node slot, element
//! after element) and optionally the authoritative global element ids.

use crate::mesh_error::MeshFaceError;
use crate::topology::cell_type::CellType;
use crate::topology::face::LocalNodeIndex;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ElementBlock {
    name: String,
    cell_type: CellType,
    connectivity: Vec<LocalNodeIndex>,
    element_ids: Option<Vec<u64>>,
}

impl ElementBlock {
    /// Create a block from flat connectivity.
    ///
    /// # Errors
    /// `ConnectivityLength` if the connectivity is not a whole number of elements.
    pub fn new(
        name: impl Into<String>,
        cell_type: CellType,
        connectivity: Vec<LocalNodeIndex>,
    ) -> Result<Self, MeshFaceError> {
        let name = name.into();
        let per_elem = cell_type.number_nodes();
        if connectivity.len() % per_elem != 0 {
            return Err(MeshFaceError::ConnectivityLength {
                block: name,
                expected: connectivity.len().div_ceil(per_elem) * per_elem,
                found: connectivity.len(),
            });
        }
        Ok(Self {
            name,
            cell_type,
            connectivity,
            element_ids: None,
        })
    }

    /// Attach global element ids (one per element, block order).
    pub fn with_element_ids(mut self, ids: Vec<u64>) -> Result<Self, MeshFaceError> {
        let expected = self.element_count();
        if ids.len() != expected {
            return Err(MeshFaceError::ElementIdCount {
                block: self.name,
                expected,
                found: ids.len(),
            });
        }
        self.element_ids = Some(ids);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn element_count(&self) -> usize {
        self.connectivity.len() / self.cell_type.number_nodes()
    }

    pub fn connectivity(&self) -> &[LocalNodeIndex] {
        &self.connectivity
    }

    /// Local node indices of element `elem` (0-based position in the block).
    pub fn element_nodes(&self, elem: usize) -> &[LocalNodeIndex] {
        let n = self.cell_type.number_nodes();
        &self.connectivity[elem * n..(elem + 1) * n]
    }

    pub fn element_ids(&self) -> Option<&[u64]> {
        self.element_ids.as_deref()
    }

    /// Check block shape and every connectivity entry against a local node
    /// array of `node_count`.
    ///
    /// Deserialized blocks bypass the constructors, so the connectivity
    /// length and element-id count are checked here again.
    pub fn validate(&self, node_count: usize) -> Result<(), MeshFaceError> {
        let n = self.cell_type.number_nodes();
        if self.connectivity.len() % n != 0 {
            return Err(MeshFaceError::ConnectivityLength {
                block: self.name.clone(),
                expected: self.connectivity.len().div_ceil(n) * n,
                found: self.connectivity.len(),
            });
        }
        if let Some(ids) = &self.element_ids {
            if ids.len() != self.element_count() {
                return Err(MeshFaceError::ElementIdCount {
                    block: self.name.clone(),
                    expected: self.element_count(),
                    found: ids.len(),
                });
            }
        }
        if let Some((pos, &index)) = self
            .connectivity
            .iter()
            .enumerate()
            .find(|&(_, &idx)| idx >= node_count)
        {
            return Err(MeshFaceError::NodeIndexOutOfRange {
                block: self.name.clone(),
                element: pos / n,
                index,
                node_count,
            });
        }
        Ok(())
    }
}
