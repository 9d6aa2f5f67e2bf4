#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-faces
//!
//! mesh-faces computes the unique faces of a finite-element volume mesh and
//! classifies each one as *interior* (shared by two elements) or *boundary*
//! (used by one). Meshes may be partitioned across cooperating ranks: faces
//! on a partition cut look like boundary faces locally and are resolved by
//! exchanging candidate descriptors with the ranks that share their nodes.
//!
//! ## Features
//! - Content-addressed [`FaceTable`](topology::face::FaceTable) keyed by a
//!   summed node fingerprint plus the sorted node set
//! - Selectable node-id fingerprinting ([`HashScheme`](algs::node_hash::HashScheme))
//! - Per-block or whole-model generation
//! - Pluggable communication backends (serial, in-process, MPI) for the
//!   two-phase candidate exchange
//!
//! ## Non-manifold meshes
//! A third element claiming a face is a hard error
//! ([`MeshFaceError::FaceOveruse`](mesh_error::MeshFaceError::FaceOveruse)),
//! never a silently recorded extra owner.
//!
//! ## Determinism
//! Which faces exist and which elements own them never depends on traversal
//! order. The stored winding of a face is the winding of the first element
//! that emitted it.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! mesh-faces = "0.1"
//! # Optional features:
//! # features = ["mpi-support", "rayon"]
//! ```

pub mod algs;
pub mod mesh_error;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{CommTag, Communicator, NoComm, RayonComm, Wait};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::face_generator::{
        FaceGeneration, FaceGenerator, GenerationConfig, GenerationMode, GenerationStats,
        MeshModel, NodeNumbering, WHOLE_MODEL_KEY,
    };
    pub use crate::algs::face_keys::{ElementIdSource, FaceKeyBuilder};
    pub use crate::algs::face_resolve::ParallelFaceResolver;
    pub use crate::algs::node_hash::HashScheme;
    pub use crate::algs::sharing::{NodeSharingMap, SharingIndex};
    pub use crate::mesh_error::MeshFaceError;
    pub use crate::topology::block::ElementBlock;
    pub use crate::topology::cell_type::CellType;
    pub use crate::topology::face::{ElementFaceRef, Face, FaceTable};
}
