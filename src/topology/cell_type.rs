//! Cell type metadata for element blocks.
//!
//! Each [`CellType`] is a topology descriptor: parametric dimension, node
//! count per element, and the local-face → local-node maps used to emit face
//! descriptors. Face maps list **corner nodes only**, in the outward-normal
//! winding of the Exodus/Ioss numbering, so higher-order variants share the
//! face maps of their linear parent.

use std::fmt;
use std::str::FromStr;

use crate::mesh_error::MeshFaceError;

/// Element topologies understood by the face generator.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// 1D two-node bar/beam/truss.
    Bar2,
    /// 2D three-node triangle.
    Tri3,
    /// 2D four-node quadrilateral.
    Quad4,
    /// Three-node shell (2D parametric).
    Shell3,
    /// Four-node shell (2D parametric).
    Shell4,
    /// Linear tetrahedron.
    Tet4,
    /// Quadratic tetrahedron.
    Tet10,
    /// Linear pyramid.
    Pyramid5,
    /// Quadratic (serendipity) pyramid.
    Pyramid13,
    /// Linear wedge/prism.
    Wedge6,
    /// Quadratic (serendipity) wedge.
    Wedge15,
    /// Linear hexahedron.
    Hex8,
    /// Quadratic (serendipity) hexahedron.
    Hex20,
    /// Triquadratic hexahedron.
    Hex27,
}

const TET_FACES: &[&[usize]] = &[&[0, 1, 3], &[1, 2, 3], &[0, 3, 2], &[0, 2, 1]];

const PYRAMID_FACES: &[&[usize]] = &[
    &[0, 1, 4],
    &[1, 2, 4],
    &[2, 3, 4],
    &[3, 0, 4],
    &[0, 3, 2, 1],
];

const WEDGE_FACES: &[&[usize]] = &[
    &[0, 1, 4, 3],
    &[1, 2, 5, 4],
    &[0, 3, 5, 2],
    &[0, 2, 1],
    &[3, 4, 5],
];

const HEX_FACES: &[&[usize]] = &[
    &[0, 1, 5, 4],
    &[1, 2, 6, 5],
    &[2, 3, 7, 6],
    &[0, 4, 7, 3],
    &[0, 3, 2, 1],
    &[4, 5, 6, 7],
];

impl CellType {
    /// Every supported cell type, in declaration order.
    pub const ALL: [CellType; 14] = [
        CellType::Bar2,
        CellType::Tri3,
        CellType::Quad4,
        CellType::Shell3,
        CellType::Shell4,
        CellType::Tet4,
        CellType::Tet10,
        CellType::Pyramid5,
        CellType::Pyramid13,
        CellType::Wedge6,
        CellType::Wedge15,
        CellType::Hex8,
        CellType::Hex20,
        CellType::Hex27,
    ];

    /// Parametric dimension of the element. Only dimension-3 cells have faces.
    pub fn parametric_dimension(self) -> u8 {
        match self {
            CellType::Bar2 => 1,
            CellType::Tri3 | CellType::Quad4 | CellType::Shell3 | CellType::Shell4 => 2,
            _ => 3,
        }
    }

    /// Number of nodes stored per element in block connectivity.
    pub fn number_nodes(self) -> usize {
        match self {
            CellType::Bar2 => 2,
            CellType::Tri3 | CellType::Shell3 => 3,
            CellType::Quad4 | CellType::Shell4 => 4,
            CellType::Tet4 => 4,
            CellType::Tet10 => 10,
            CellType::Pyramid5 => 5,
            CellType::Pyramid13 => 13,
            CellType::Wedge6 => 6,
            CellType::Wedge15 => 15,
            CellType::Hex8 => 8,
            CellType::Hex20 => 20,
            CellType::Hex27 => 27,
        }
    }

    /// Corner-node maps of every local face; empty for non-volume cells.
    pub fn faces(self) -> &'static [&'static [usize]] {
        match self {
            CellType::Tet4 | CellType::Tet10 => TET_FACES,
            CellType::Pyramid5 | CellType::Pyramid13 => PYRAMID_FACES,
            CellType::Wedge6 | CellType::Wedge15 => WEDGE_FACES,
            CellType::Hex8 | CellType::Hex20 | CellType::Hex27 => HEX_FACES,
            CellType::Bar2
            | CellType::Tri3
            | CellType::Quad4
            | CellType::Shell3
            | CellType::Shell4 => &[],
        }
    }

    /// Number of local faces contributed by one element.
    pub fn number_faces(self) -> usize {
        self.faces().len()
    }

    /// Corner nodes of local face `face` (0-based).
    pub fn face_connectivity(self, face: usize) -> Result<&'static [usize], MeshFaceError> {
        self.faces()
            .get(face)
            .copied()
            .ok_or_else(|| MeshFaceError::InvalidLocalFace {
                cell_type: self.to_string(),
                face,
            })
    }

    /// Corner-node count of local face `face` (3 or 4).
    pub fn face_corner_count(self, face: usize) -> Result<usize, MeshFaceError> {
        self.face_connectivity(face).map(<[usize]>::len)
    }

    fn name(self) -> &'static str {
        match self {
            CellType::Bar2 => "bar2",
            CellType::Tri3 => "tri3",
            CellType::Quad4 => "quad4",
            CellType::Shell3 => "shell3",
            CellType::Shell4 => "shell4",
            CellType::Tet4 => "tet4",
            CellType::Tet10 => "tet10",
            CellType::Pyramid5 => "pyramid5",
            CellType::Pyramid13 => "pyramid13",
            CellType::Wedge6 => "wedge6",
            CellType::Wedge15 => "wedge15",
            CellType::Hex8 => "hex8",
            CellType::Hex20 => "hex20",
            CellType::Hex27 => "hex27",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CellType {
    type Err = MeshFaceError;

    /// Accepts canonical names plus the common Exodus spellings
    /// (`hex`, `hexahedron`, `tetra4`, `penta6`, `beam2`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "bar2" | "bar" | "beam2" | "beam" | "truss2" | "truss" => CellType::Bar2,
            "tri3" | "tri" | "triangle" => CellType::Tri3,
            "quad4" | "quad" | "quadrilateral" => CellType::Quad4,
            "shell3" | "trishell" | "trishell3" => CellType::Shell3,
            "shell4" | "shell" => CellType::Shell4,
            "tet4" | "tet" | "tetra4" | "tetra" | "tetrahedron" => CellType::Tet4,
            "tet10" | "tetra10" => CellType::Tet10,
            "pyramid5" | "pyramid" | "pyr5" => CellType::Pyramid5,
            "pyramid13" | "pyr13" => CellType::Pyramid13,
            "wedge6" | "wedge" | "penta6" | "prism" | "prism6" => CellType::Wedge6,
            "wedge15" | "penta15" | "prism15" => CellType::Wedge15,
            "hex8" | "hex" | "hexahedron" => CellType::Hex8,
            "hex20" => CellType::Hex20,
            "hex27" => CellType::Hex27,
            _ => return Err(MeshFaceError::UnknownCellType(s.to_string())),
        };
        Ok(ty)
    }
}
