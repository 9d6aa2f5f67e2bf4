//! Fixed, versioned, little-endian wire types for the face exchange.

use bytemuck::{Pod, Zeroable};
use static_assertions::{const_assert_eq, const_assert};
use std::mem::{align_of, size_of};

use crate::topology::face::{ElementFaceRef, FaceConnectivity, HashedId, MAX_FACE_NODES};

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Decode a received byte buffer into records.
///
/// Copies, because receive buffers carry no alignment guarantee.
pub fn decode_records<T: Pod>(bytes: &[u8]) -> Option<Vec<T>> {
    if bytes.len() % size_of::<T>() != 0 {
        return None;
    }
    let mut out = vec![T::zeroed(); bytes.len() / size_of::<T>()];
    cast_slice_mut(&mut out).copy_from_slice(bytes);
    Some(out)
}

/// All multi-byte integers in these structs are **little-endian** on the wire.
/// We store them pre-LE with `.to_le()` and decode with `.from_le()`.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32,
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u32).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// One potential cross-partition face: hash id, corner ids (0-padded), and
/// the sender's packed element-face reference.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireFaceCandidate {
    pub hash_le: u64,
    pub conn_le: [u64; MAX_FACE_NODES],
    pub face_ref_le: u64,
}

impl WireFaceCandidate {
    pub const SIZE: usize = 48; // 8 + 4*8 + 8

    pub fn new(hash_id: HashedId, conn: &FaceConnectivity, face_ref: ElementFaceRef) -> Self {
        Self {
            hash_le: hash_id.to_le(),
            conn_le: conn.map(u64::to_le),
            face_ref_le: face_ref.raw().to_le(),
        }
    }

    pub fn hash_id(&self) -> HashedId {
        u64::from_le(self.hash_le)
    }

    pub fn connectivity(&self) -> FaceConnectivity {
        self.conn_le.map(u64::from_le)
    }

    pub fn face_ref(&self) -> ElementFaceRef {
        ElementFaceRef::from_raw(u64::from_le(self.face_ref_le))
    }
}

// ===== Compile-time sanity checks =========================================

const_assert_eq!(size_of::<WireCount>(), 4);
const_assert_eq!(size_of::<WireFaceCandidate>(), WireFaceCandidate::SIZE);
const_assert!(align_of::<WireFaceCandidate>() == 8);
