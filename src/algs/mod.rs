//! Face generation algorithms, from node hashing to parallel resolution.

pub mod communicator;
pub mod exchange;
pub mod face_generator;
pub mod face_keys;
pub mod face_resolve;
pub mod node_hash;
pub mod sharing;
pub mod wire;

pub use face_generator::{FaceGeneration, FaceGenerator, GenerationConfig, GenerationMode};
pub use node_hash::HashScheme;
