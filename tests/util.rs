#![allow(dead_code)]
use std::collections::{BTreeMap, BTreeSet};

use mesh_faces::algs::communicator::RayonComm;
use mesh_faces::algs::face_generator::{FaceGeneration, FaceGenerator, GenerationConfig, MeshModel};
use mesh_faces::algs::sharing::NodeSharingMap;
use mesh_faces::mesh_error::MeshFaceError;
use mesh_faces::topology::block::ElementBlock;
use mesh_faces::topology::cell_type::CellType;
use mesh_faces::topology::face::FaceTable;

/// A mesh described entirely in global ids, before partitioning.
#[derive(Clone, Debug)]
pub struct GlobalMesh {
    pub block: String,
    pub cell_type: CellType,
    /// Per element: its global node ids in topology order.
    pub elements: Vec<Vec<u64>>,
    /// Per element: its global element id.
    pub element_ids: Vec<u64>,
}

impl GlobalMesh {
    /// Serial model: local node `i` carries the `i`-th smallest global id.
    pub fn serial_model(&self) -> MeshModel {
        let all: Vec<usize> = (0..self.elements.len()).collect();
        self.model_for(&all, |_| BTreeSet::new())
    }

    fn model_for(
        &self,
        elems: &[usize],
        shared_with: impl Fn(u64) -> BTreeSet<usize>,
    ) -> MeshModel {
        let nodes: BTreeSet<u64> = elems
            .iter()
            .flat_map(|&e| self.elements[e].iter().copied())
            .collect();
        let ids: Vec<u64> = nodes.into_iter().collect();
        let local: BTreeMap<u64, usize> = ids.iter().enumerate().map(|(i, &g)| (g, i)).collect();
        let conn: Vec<usize> = elems
            .iter()
            .flat_map(|&e| self.elements[e].iter().map(|g| local[g]))
            .collect();
        let block = ElementBlock::new(self.block.clone(), self.cell_type, conn)
            .unwrap()
            .with_element_ids(elems.iter().map(|&e| self.element_ids[e]).collect())
            .unwrap();

        let mut sharing = NodeSharingMap::new();
        for (i, &g) in ids.iter().enumerate() {
            for rank in shared_with(g) {
                sharing.add(i, rank);
            }
        }
        let mut model = MeshModel::new(ids).with_sharing(sharing);
        model.add_block(block).unwrap();
        model
    }

    /// One model per rank; `owner[e]` is the rank of element `e`.
    pub fn partition(&self, owner: &[usize], nranks: usize) -> Vec<MeshModel> {
        let mut users: BTreeMap<u64, BTreeSet<usize>> = BTreeMap::new();
        for (e, nodes) in self.elements.iter().enumerate() {
            for &g in nodes {
                users.entry(g).or_default().insert(owner[e]);
            }
        }
        (0..nranks)
            .map(|rank| {
                let elems: Vec<usize> = (0..self.elements.len())
                    .filter(|&e| owner[e] == rank)
                    .collect();
                self.model_for(&elems, |g| {
                    users[&g].iter().copied().filter(|&r| r != rank).collect()
                })
            })
            .collect()
    }
}

/// Stack the blocks of `b` after those of `a` on one rank.
///
/// Global node ids of the two models must be disjoint.
pub fn stack_models(a: &MeshModel, b: &MeshModel) -> MeshModel {
    let offset = a.node_count();
    let ids: Vec<u64> = a
        .global_node_ids()
        .iter()
        .chain(b.global_node_ids())
        .copied()
        .collect();
    let mut sharing = a.sharing().clone();
    for &(node, rank) in b.sharing().pairs() {
        sharing.add(node + offset, rank);
    }
    let mut model = MeshModel::new(ids).with_sharing(sharing);
    for block in a.blocks() {
        model.add_block(block.clone()).unwrap();
    }
    for block in b.blocks() {
        let conn = block.connectivity().iter().map(|&i| i + offset).collect();
        let mut moved = ElementBlock::new(block.name(), block.cell_type(), conn).unwrap();
        if let Some(ids) = block.element_ids() {
            moved = moved.with_element_ids(ids.to_vec()).unwrap();
        }
        model.add_block(moved).unwrap();
    }
    model
}

/// Three tets around triangle {101,102,103}; apexes 104, 105, 106.
pub fn tet_fan(block: &str) -> GlobalMesh {
    GlobalMesh {
        block: block.into(),
        cell_type: CellType::Tet4,
        elements: vec![
            vec![101, 102, 103, 104],
            vec![101, 102, 103, 105],
            vec![101, 102, 103, 106],
        ],
        element_ids: vec![10, 11, 12],
    }
}

/// The two unit hexahedra of the reference scenario: ids 1..=12, shared
/// face {5,6,7,8}; hex 1 uses it as local face 5, hex 2 as local face 4.
pub fn two_hex() -> GlobalMesh {
    GlobalMesh {
        block: "hex".into(),
        cell_type: CellType::Hex8,
        elements: vec![(1..=8).collect(), (5..=12).collect()],
        element_ids: vec![1, 2],
    }
}

/// `nx * ny * nz` unit hexahedra, node ids 1-based lexicographic (x fastest).
pub fn hex_grid(nx: usize, ny: usize, nz: usize) -> GlobalMesh {
    let nid = |i: usize, j: usize, k: usize| (1 + i + (nx + 1) * (j + (ny + 1) * k)) as u64;
    let mut elements = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                elements.push(vec![
                    nid(i, j, k),
                    nid(i + 1, j, k),
                    nid(i + 1, j + 1, k),
                    nid(i, j + 1, k),
                    nid(i, j, k + 1),
                    nid(i + 1, j, k + 1),
                    nid(i + 1, j + 1, k + 1),
                    nid(i, j + 1, k + 1),
                ]);
            }
        }
    }
    let element_ids = (1..=elements.len() as u64).collect();
    GlobalMesh {
        block: "hex".into(),
        cell_type: CellType::Hex8,
        elements,
        element_ids,
    }
}

/// Expected (interior, boundary) face counts of a structured hex grid.
pub fn hex_grid_face_counts(nx: usize, ny: usize, nz: usize) -> (usize, usize) {
    let interior = (nx - 1) * ny * nz + nx * (ny - 1) * nz + nx * ny * (nz - 1);
    let boundary = 2 * (ny * nz + nx * nz + nx * ny);
    (interior, boundary)
}

/// `(sorted nodes, sorted packed element-face refs)` per face.
pub type FaceSignature = (Vec<u64>, Vec<u64>);

pub fn signatures(table: &FaceTable) -> BTreeSet<FaceSignature> {
    table
        .iter()
        .map(|f| {
            let mut refs: Vec<u64> = f.element_refs().iter().map(|r| r.raw()).collect();
            refs.sort_unstable();
            (f.sorted_nodes(), refs)
        })
        .collect()
}

/// Run `generate` on every model concurrently, one in-process rank each.
pub fn run_ranks(
    models: &[MeshModel],
    config: &GenerationConfig,
) -> Vec<Result<FaceGeneration, MeshFaceError>> {
    let world = RayonComm::world(models.len());
    std::thread::scope(|s| {
        let handles: Vec<_> = world
            .iter()
            .zip(models)
            .map(|(comm, model)| {
                s.spawn(move || FaceGenerator::new(model, comm).generate(config))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Union of the signatures of every rank's table under `key`.
pub fn union_signatures(results: &[FaceGeneration], key: &str) -> BTreeSet<FaceSignature> {
    results
        .iter()
        .flat_map(|r| signatures(r.table(key).unwrap()))
        .collect()
}
