//! Node-id fingerprinting for face keys.
//!
//! A face's hash id is the wrapping *sum* of its corner fingerprints, so it
//! does not depend on winding or starting corner. Every scheme is a pure
//! function of the global id: the same node must fingerprint identically on
//! every rank, or cross-partition matching silently fails.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::mesh_error::MeshFaceError;
use crate::topology::face::{GlobalNodeId, HashedId};

/// Environment variable consulted by [`HashScheme::from_env`].
pub const HASH_SCHEME_ENV: &str = "MESH_FACES_HASH";

const MURMUR_M: u64 = 0xc6a4_a793_5bd1_e995;
const MURMUR_R: u32 = 47;
const MURMUR_SEED: u64 = 24;

/// Strategy used to fingerprint global node ids.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    /// `hash(id) = id`. Cheapest; collides easily on structured numbering.
    Identity,
    /// First output of a PRNG seeded with the id.
    Random,
    /// Fixed-seed MurmurHash64A over the id's 8 little-endian bytes.
    #[default]
    Murmur,
}

impl HashScheme {
    /// Scheme named by `MESH_FACES_HASH`, or the default when unset.
    pub fn from_env() -> Result<Self, MeshFaceError> {
        match std::env::var(HASH_SCHEME_ENV) {
            Ok(name) => name.parse(),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Fingerprint one global node id.
    #[inline]
    pub fn hash(self, id: GlobalNodeId) -> HashedId {
        match self {
            HashScheme::Identity => id,
            HashScheme::Random => StdRng::seed_from_u64(id).next_u64(),
            HashScheme::Murmur => murmur64a(id, MURMUR_SEED),
        }
    }

    /// Fingerprint every node once; output is parallel to `ids`.
    pub fn hash_all(self, ids: &[GlobalNodeId]) -> Vec<HashedId> {
        #[cfg(feature = "rayon")]
        {
            ids.par_iter().map(|&id| self.hash(id)).collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            ids.iter().map(|&id| self.hash(id)).collect()
        }
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HashScheme::Identity => "identity",
            HashScheme::Random => "random",
            HashScheme::Murmur => "murmur",
        })
    }
}

impl FromStr for HashScheme {
    type Err = MeshFaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" | "id" => Ok(HashScheme::Identity),
            "random" | "rand" => Ok(HashScheme::Random),
            "murmur" | "murmur64" => Ok(HashScheme::Murmur),
            _ => Err(MeshFaceError::UnknownHashScheme(s.to_string())),
        }
    }
}

/// Sum of corner fingerprints; padding (`0`) slots are skipped by the caller.
#[inline]
pub fn combine<I: IntoIterator<Item = HashedId>>(parts: I) -> HashedId {
    parts.into_iter().fold(0, HashedId::wrapping_add)
}

/// MurmurHash64A specialised to a single 8-byte block.
fn murmur64a(key: u64, seed: u64) -> u64 {
    let mut h = seed ^ 8u64.wrapping_mul(MURMUR_M);

    let mut k = u64::from_le_bytes(key.to_le_bytes());
    k = k.wrapping_mul(MURMUR_M);
    k ^= k >> MURMUR_R;
    k = k.wrapping_mul(MURMUR_M);

    h ^= k;
    h = h.wrapping_mul(MURMUR_M);

    h ^= h >> MURMUR_R;
    h = h.wrapping_mul(MURMUR_M);
    h ^= h >> MURMUR_R;
    h
}
