//! Faces, element-face references and the content-addressed [`FaceTable`].
//!
//! A face is identified by its corner-node *set*. The table keys each face
//! by `(hash_id, sorted nodes)`: the hash id (a sum of per-node
//! fingerprints) drives bucket placement, and the sorted node tuple is the
//! authoritative equality check, so two node sets that collide on the hash
//! id always stay separate entries.

use std::fmt;
use std::hash::{Hash, Hasher};

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::mesh_error::MeshFaceError;

/// Global node identifier, unique across all processes. `0` is reserved.
pub type GlobalNodeId = u64;
/// Zero-based index into one process's local node array.
pub type LocalNodeIndex = usize;
/// 64-bit fingerprint of a [`GlobalNodeId`].
pub type HashedId = u64;
/// Corner nodes of a face in winding order; unused slots hold `0`.
pub type FaceConnectivity = [GlobalNodeId; MAX_FACE_NODES];

/// Largest corner-node count of any supported face.
pub const MAX_FACE_NODES: usize = 4;

/// Stride used to pack a local face index next to an element id.
/// No supported element has ten or more faces.
pub const FACE_REF_STRIDE: u64 = 10;

/// Packed `(element id, local face)` reference: `element_id * 10 + face`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct ElementFaceRef(u64);

impl ElementFaceRef {
    /// Pack an element id and 0-based local face index.
    ///
    /// # Errors
    /// `InvalidLocalFace` when `local_face >= 10`, `ElementIdOverflow` when
    /// the packed value does not fit in a `u64`.
    pub fn new(element_id: u64, local_face: usize) -> Result<Self, MeshFaceError> {
        if local_face as u64 >= FACE_REF_STRIDE {
            return Err(MeshFaceError::InvalidLocalFace {
                cell_type: "element-face reference".to_string(),
                face: local_face,
            });
        }
        element_id
            .checked_mul(FACE_REF_STRIDE)
            .and_then(|v| v.checked_add(local_face as u64))
            .map(ElementFaceRef)
            .ok_or(MeshFaceError::ElementIdOverflow(element_id))
    }

    /// Wrap an already packed value (e.g. one received over the wire).
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        ElementFaceRef(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn element_id(self) -> u64 {
        self.0 / FACE_REF_STRIDE
    }

    #[inline]
    pub const fn local_face(self) -> usize {
        (self.0 % FACE_REF_STRIDE) as usize
    }
}

impl fmt::Debug for ElementFaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementFaceRef")
            .field(&self.element_id())
            .field(&self.local_face())
            .finish()
    }
}

impl fmt::Display for ElementFaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element {} face {}", self.element_id(), self.local_face())
    }
}

/// Nonzero nodes of `conn`, sorted ascending, zero-padded at the end.
pub fn sorted_node_set(conn: &FaceConnectivity) -> FaceConnectivity {
    let mut nodes = *conn;
    // zeros sort last so padding never participates in the comparison
    nodes.sort_unstable_by_key(|&n| (n == 0, n));
    nodes
}

/// Lookup key: hash id for bucketing, sorted node set for equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceKey {
    hash_id: HashedId,
    nodes: FaceConnectivity,
}

impl FaceKey {
    fn new(hash_id: HashedId, conn: &FaceConnectivity) -> Self {
        Self {
            hash_id,
            nodes: sorted_node_set(conn),
        }
    }
}

impl Hash for FaceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Equal node sets always have equal hash ids, so hashing the id alone
        // stays consistent with `Eq`.
        self.hash_id.hash(state);
    }
}

/// One unique face and the one or two element faces that reference it.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "FaceRecord", into = "FaceRecord")]
pub struct Face {
    hash_id: HashedId,
    connectivity: FaceConnectivity,
    refs: [ElementFaceRef; 2],
    count: u8,
}

impl Face {
    fn new(hash_id: HashedId, connectivity: FaceConnectivity, first: ElementFaceRef) -> Self {
        Self {
            hash_id,
            connectivity,
            refs: [first, ElementFaceRef::from_raw(0)],
            count: 1,
        }
    }

    fn attach(&mut self, incoming: ElementFaceRef) -> Result<(), MeshFaceError> {
        if self.count >= 2 {
            return Err(MeshFaceError::FaceOveruse {
                connectivity: self.connectivity,
                existing: self.refs,
                incoming,
            });
        }
        self.refs[1] = incoming;
        self.count = 2;
        Ok(())
    }

    #[inline]
    pub fn hash_id(&self) -> HashedId {
        self.hash_id
    }

    /// Corner nodes in the winding of the element that created this face.
    #[inline]
    pub fn connectivity(&self) -> &FaceConnectivity {
        &self.connectivity
    }

    /// Number of corner nodes (3 or 4).
    pub fn node_count(&self) -> usize {
        self.connectivity.iter().filter(|&&n| n != 0).count()
    }

    /// Corner nodes as an ascending set, without padding.
    pub fn sorted_nodes(&self) -> Vec<GlobalNodeId> {
        sorted_node_set(&self.connectivity)
            .into_iter()
            .filter(|&n| n != 0)
            .collect()
    }

    #[inline]
    pub fn element_refs(&self) -> &[ElementFaceRef] {
        &self.refs[..self.count as usize]
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.count as usize
    }

    /// `true` when exactly one element uses this face.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.count == 1
    }
}

/// Serialized form of a [`Face`]: owners as a plain list.
#[derive(serde::Serialize, serde::Deserialize)]
struct FaceRecord {
    hash_id: HashedId,
    connectivity: FaceConnectivity,
    element_refs: Vec<ElementFaceRef>,
}

impl From<Face> for FaceRecord {
    fn from(face: Face) -> Self {
        Self {
            hash_id: face.hash_id,
            connectivity: face.connectivity,
            element_refs: face.element_refs().to_vec(),
        }
    }
}

impl TryFrom<FaceRecord> for Face {
    type Error = MeshFaceError;

    fn try_from(record: FaceRecord) -> Result<Self, Self::Error> {
        match record.element_refs.as_slice() {
            [first] => Ok(Face::new(record.hash_id, record.connectivity, *first)),
            [first, second] => {
                let mut face = Face::new(record.hash_id, record.connectivity, *first);
                face.attach(*second)?;
                Ok(face)
            }
            refs => Err(MeshFaceError::FaceRefCount(refs.len())),
        }
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("hash_id", &self.hash_id)
            .field("connectivity", &self.connectivity)
            .field("element_refs", &self.element_refs())
            .finish()
    }
}

/// Content-addressed set of unique faces produced by one generation run.
#[derive(Clone, Debug, Default)]
pub struct FaceTable {
    faces: HashMap<FaceKey, Face>,
}

impl FaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            faces: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a face descriptor, or attach `face_ref` to the existing face
    /// with the same node set.
    ///
    /// The first insertion fixes the face's stored winding.
    ///
    /// # Errors
    /// [`MeshFaceError::FaceOveruse`] if the face already has two owners.
    pub fn insert_or_update(
        &mut self,
        hash_id: HashedId,
        connectivity: FaceConnectivity,
        face_ref: ElementFaceRef,
    ) -> Result<(), MeshFaceError> {
        match self.faces.entry(FaceKey::new(hash_id, &connectivity)) {
            Entry::Occupied(mut slot) => slot.get_mut().attach(face_ref),
            Entry::Vacant(slot) => {
                slot.insert(Face::new(hash_id, connectivity, face_ref));
                Ok(())
            }
        }
    }

    /// Attach `face_ref` to an existing face only; never creates one.
    ///
    /// Returns `Ok(false)` when no face with this node set exists.
    pub fn attach_existing(
        &mut self,
        hash_id: HashedId,
        connectivity: &FaceConnectivity,
        face_ref: ElementFaceRef,
    ) -> Result<bool, MeshFaceError> {
        match self.faces.get_mut(&FaceKey::new(hash_id, connectivity)) {
            Some(face) => face.attach(face_ref).map(|()| true),
            None => Ok(false),
        }
    }

    /// Look up a face by hash id and node set (winding ignored).
    pub fn get(&self, hash_id: HashedId, connectivity: &FaceConnectivity) -> Option<&Face> {
        self.faces.get(&FaceKey::new(hash_id, connectivity))
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Iterate over all faces in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Face> {
        self.faces.values()
    }

    pub fn faces_with_element_count(&self, count: usize) -> impl Iterator<Item = &Face> {
        self.iter().filter(move |f| f.element_count() == count)
    }

    /// Faces used by exactly one element.
    pub fn boundary_faces(&self) -> impl Iterator<Item = &Face> {
        self.faces_with_element_count(1)
    }

    /// Faces shared by two elements.
    pub fn interior_faces(&self) -> impl Iterator<Item = &Face> {
        self.faces_with_element_count(2)
    }
}

impl IntoIterator for FaceTable {
    type Item = Face;
    type IntoIter = hashbrown::hash_map::IntoValues<FaceKey, Face>;

    fn into_iter(self) -> Self::IntoIter {
        self.faces.into_values()
    }
}
