//! MeshFaceError: Unified error type for mesh-faces public APIs
//!
//! Every fallible operation in the crate returns this error. None of the
//! variants describe a transient condition: each one means the mesh is
//! malformed or the SPMD protocol was violated, so callers should abort the
//! generation run rather than retry it.

use thiserror::Error;

use crate::topology::face::{ElementFaceRef, FaceConnectivity};

/// Unified error type for mesh-faces operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshFaceError {
    /// A third element tried to claim a face that already has two owners.
    #[error(
        "Face overuse: face with nodes {connectivity:?} is already used by {} and {}; \
         cannot also attach {incoming} (non-manifold mesh)",
        existing[0], existing[1]
    )]
    FaceOveruse {
        connectivity: FaceConnectivity,
        existing: [ElementFaceRef; 2],
        incoming: ElementFaceRef,
    },
    /// A hash scheme name did not match any known scheme.
    #[error("Unknown node-id hash scheme `{0}` (expected identity, random or murmur)")]
    UnknownHashScheme(String),
    /// A cell type name did not match any known topology.
    #[error("Unknown cell type `{0}`")]
    UnknownCellType(String),
    /// A generation mode name did not match any known mode.
    #[error("Unknown generation mode `{0}` (expected per_block or whole_model)")]
    UnknownGenerationMode(String),
    /// A block's connectivity array is not `elements * nodes_per_element` long.
    #[error("Block `{block}`: connectivity has {found} entries, expected {expected}")]
    ConnectivityLength {
        block: String,
        expected: usize,
        found: usize,
    },
    /// A connectivity entry points past the end of the local node array.
    #[error(
        "Block `{block}`: element {element} references local node {index}, \
         but only {node_count} nodes exist"
    )]
    NodeIndexOutOfRange {
        block: String,
        element: usize,
        index: usize,
        node_count: usize,
    },
    /// A serialized face lists no owner or more than two.
    #[error("Face has {0} element references; expected 1 or 2")]
    FaceRefCount(usize),
    /// A block's element-id array does not match its element count.
    #[error("Block `{block}`: {found} element ids supplied for {expected} elements")]
    ElementIdCount {
        block: String,
        expected: usize,
        found: usize,
    },
    /// Global node id 0 is reserved as the connectivity padding sentinel.
    #[error("Global node id at local index {index} is 0 (reserved as padding sentinel)")]
    ZeroGlobalNodeId { index: usize },
    /// A sharing entry names a rank outside the communicator, or the local rank itself.
    #[error("Sharing map: node {node} lists rank {rank}, which is invalid for a world of size {size}")]
    InvalidSharingRank {
        node: usize,
        rank: usize,
        size: usize,
    },
    /// A sharing entry names a local node that does not exist.
    #[error("Sharing map: local node {node} out of range (only {node_count} nodes)")]
    SharingNodeOutOfRange { node: usize, node_count: usize },
    /// The hashed-id array is not parallel to the global-id array.
    #[error("Hashed id array has {hashed} entries but there are {nodes} nodes")]
    HashCountMismatch { hashed: usize, nodes: usize },
    /// A local face index is outside the topology's face range.
    #[error("Cell type {cell_type} has no local face {face}")]
    InvalidLocalFace { cell_type: String, face: usize },
    /// An element id is too large to be packed into an `ElementFaceRef`.
    #[error("Element id {0} is too large to pack into an element-face reference")]
    ElementIdOverflow(u64),
    /// Two blocks share one name, so per-block results would collide.
    #[error("Duplicate element block name `{0}`")]
    DuplicateBlockName(String),
    /// Communication with a neighbor failed.
    #[error("Communication error with rank {neighbor}: {message}")]
    CommError { neighbor: usize, message: String },
    /// A received buffer does not have the size announced in the counts phase.
    #[error("Payload from rank {neighbor}: expected {expected} bytes, got {found}")]
    PayloadSizeMismatch {
        neighbor: usize,
        expected: usize,
        found: usize,
    },
}
