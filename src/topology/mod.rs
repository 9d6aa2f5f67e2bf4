//! Mesh-side types: element topologies, element blocks, and faces.
//!
//! It includes:
//! - [`cell_type::CellType`] topology descriptors with local face maps
//! - [`block::ElementBlock`], the per-block connectivity view
//! - [`face::Face`] and the content-addressed [`face::FaceTable`]

pub mod block;
pub mod cell_type;
pub mod face;

pub use face::{ElementFaceRef, Face, FaceTable};
