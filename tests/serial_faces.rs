mod util;
use util::*;

use mesh_faces::prelude::*;

#[test]
fn two_hex_share_exactly_one_face() {
    let mesh = two_hex().serial_model();
    let out = FaceGenerator::serial(&mesh)
        .generate(&GenerationConfig::default())
        .unwrap();
    let table = out.table("hex").unwrap();

    assert_eq!(table.len(), 11);
    assert_eq!(table.boundary_faces().count(), 10);
    let shared: Vec<&Face> = table.interior_faces().collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].sorted_nodes(), vec![5, 6, 7, 8]);

    let mut refs: Vec<(u64, usize)> = shared[0]
        .element_refs()
        .iter()
        .map(|r| (r.element_id(), r.local_face()))
        .collect();
    refs.sort_unstable();
    assert_eq!(refs, vec![(1, 5), (2, 4)]);

    // hex 1 was visited first, so its winding is kept
    assert_eq!(shared[0].connectivity(), &[5, 6, 7, 8]);
}

#[test]
fn two_hex_stats_count_descriptors_and_faces() {
    // 6 + 6 element faces with the shared one stored once
    let mesh = two_hex().serial_model();
    let out = FaceGenerator::serial(&mesh)
        .generate(&GenerationConfig::default())
        .unwrap();
    assert_eq!(out.stats.descriptors, 12);
    assert_eq!(out.stats.faces, 11);
    assert_eq!(out.stats.interior_faces, 1);
    assert_eq!(out.stats.boundary_faces, 10);
    assert_eq!(out.stats.resolve, Default::default());
}

#[test]
fn structured_grid_classification_matches_closed_form() {
    for (nx, ny, nz) in [(1, 1, 1), (2, 2, 2), (3, 1, 2), (4, 3, 2)] {
        let mesh = hex_grid(nx, ny, nz).serial_model();
        for scheme in [HashScheme::Identity, HashScheme::Random, HashScheme::Murmur] {
            let out = FaceGenerator::serial(&mesh)
                .generate_with(GenerationMode::PerBlock, scheme)
                .unwrap();
            let (interior, boundary) = hex_grid_face_counts(nx, ny, nz);
            assert_eq!(out.stats.interior_faces, interior, "{nx}x{ny}x{nz} {scheme}");
            assert_eq!(out.stats.boundary_faces, boundary, "{nx}x{ny}x{nz} {scheme}");
            let table = out.table("hex").unwrap();
            assert!(table.iter().all(|f| (1..=2).contains(&f.element_count())));
        }
    }
}

#[test]
fn hash_schemes_agree_on_face_sets() {
    let mesh = hex_grid(3, 2, 2).serial_model();
    let sig = |scheme| {
        let out = FaceGenerator::serial(&mesh)
            .generate_with(GenerationMode::PerBlock, scheme)
            .unwrap();
        signatures(out.table("hex").unwrap())
    };
    let murmur = sig(HashScheme::Murmur);
    assert_eq!(sig(HashScheme::Identity), murmur);
    assert_eq!(sig(HashScheme::Random), murmur);
}

#[test]
fn repeated_generation_is_idempotent() {
    let mesh = hex_grid(3, 3, 2).serial_model();
    let generator = FaceGenerator::serial(&mesh);
    let first = generator.generate(&GenerationConfig::default()).unwrap();
    let second = generator.generate(&GenerationConfig::default()).unwrap();
    assert_eq!(
        signatures(first.table("hex").unwrap()),
        signatures(second.table("hex").unwrap())
    );
    assert_eq!(first.stats, second.stats);
}

#[test]
fn three_tets_on_one_triangle_is_fatal() {
    // tets (1,2,3,a) for apexes a = 4, 5, 6 all carry triangle {1,2,3}
    let mut mesh = MeshModel::new(vec![1, 2, 3, 4, 5, 6]);
    let conn = vec![0, 1, 2, 3, 0, 1, 2, 4, 0, 1, 2, 5];
    mesh.add_block(ElementBlock::new("fan", CellType::Tet4, conn).unwrap())
        .unwrap();
    let err = FaceGenerator::serial(&mesh)
        .generate(&GenerationConfig::default())
        .unwrap_err();
    match err {
        MeshFaceError::FaceOveruse {
            connectivity,
            existing,
            incoming,
        } => {
            let mut nodes: Vec<u64> = connectivity.iter().copied().filter(|&n| n != 0).collect();
            nodes.sort_unstable();
            assert_eq!(nodes, vec![1, 2, 3]);
            let mut elems: Vec<u64> = existing.iter().map(|r| r.element_id()).collect();
            elems.push(incoming.element_id());
            elems.sort_unstable();
            assert_eq!(elems, vec![1, 2, 3]);
        }
        other => panic!("expected FaceOveruse, got {other:?}"),
    }
}

#[test]
fn colliding_hash_ids_do_not_merge_distinct_faces() {
    // With identity hashing the triangles {1,2,7} and {1,4,5} of the two
    // tets below both sum to 10.
    let mut mesh = MeshModel::new(vec![1, 2, 7, 20, 4, 5, 30]);
    let conn = vec![0, 1, 3, 2, 0, 4, 6, 5];
    mesh.add_block(ElementBlock::new("t", CellType::Tet4, conn).unwrap())
        .unwrap();
    let out = FaceGenerator::serial(&mesh)
        .generate_with(GenerationMode::PerBlock, HashScheme::Identity)
        .unwrap();
    let table = out.table("t").unwrap();
    assert_eq!(table.len(), 8);
    assert_eq!(table.interior_faces().count(), 0);
    assert!(table.get(10, &[1, 2, 7, 0]).is_some());
    assert!(table.get(10, &[1, 4, 5, 0]).is_some());
}

#[test]
fn mixed_blocks_merge_only_in_whole_model_mode() {
    // a hex (1..8) with a pyramid (5,6,7,8,9) on its top face
    let mut mesh = MeshModel::new((1..=9).collect());
    mesh.add_block(ElementBlock::new("hex", CellType::Hex8, (0..8).collect()).unwrap())
        .unwrap();
    mesh.add_block(
        ElementBlock::new("pyr", CellType::Pyramid5, vec![4, 7, 6, 5, 8])
            .unwrap()
            .with_element_ids(vec![2])
            .unwrap(),
    )
    .unwrap();
    mesh.add_block(ElementBlock::new("skin", CellType::Shell4, vec![0, 1, 2, 3]).unwrap())
        .unwrap();

    let per_block = FaceGenerator::serial(&mesh)
        .generate_with(GenerationMode::PerBlock, HashScheme::Murmur)
        .unwrap();
    assert_eq!(per_block.tables.len(), 3);
    assert_eq!(per_block.table("hex").unwrap().len(), 6);
    assert_eq!(per_block.table("pyr").unwrap().len(), 5);
    assert!(per_block.table("skin").unwrap().is_empty());
    assert_eq!(per_block.stats.interior_faces, 0);

    let whole = FaceGenerator::serial(&mesh)
        .generate_with(GenerationMode::WholeModel, HashScheme::Murmur)
        .unwrap();
    let table = whole.whole_model().unwrap();
    assert_eq!(table.len(), 10);
    let shared: Vec<&Face> = table.interior_faces().collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].sorted_nodes(), vec![5, 6, 7, 8]);
    let mut refs: Vec<(u64, usize)> = shared[0]
        .element_refs()
        .iter()
        .map(|r| (r.element_id(), r.local_face()))
        .collect();
    refs.sort_unstable();
    // hex has no ids: positional 1; pyramid base is its local face 4
    assert_eq!(refs, vec![(1, 5), (2, 4)]);
}

#[test]
fn two_wedges_share_a_quad() {
    // prism (1,2,3 / 4,5,6) and its mirror sharing quad {2,3,6,5}
    let mut mesh = MeshModel::new((1..=8).collect());
    let conn = vec![0, 1, 2, 3, 4, 5, 1, 6, 2, 4, 7, 5];
    mesh.add_block(ElementBlock::new("w", CellType::Wedge6, conn).unwrap())
        .unwrap();
    let out = FaceGenerator::serial(&mesh)
        .generate(&GenerationConfig::default())
        .unwrap();
    let table = out.table("w").unwrap();
    assert_eq!(table.len(), 9);
    let shared: Vec<&Face> = table.interior_faces().collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].sorted_nodes(), vec![2, 3, 5, 6]);
    assert_eq!(shared[0].node_count(), 4);
}

#[test]
fn out_of_range_connectivity_fails_validation() {
    let mut mesh = MeshModel::new(vec![1, 2, 3]);
    mesh.add_block(ElementBlock::new("t", CellType::Tet4, vec![0, 1, 2, 3]).unwrap())
        .unwrap();
    let err = FaceGenerator::serial(&mesh)
        .generate(&GenerationConfig::default())
        .unwrap_err();
    assert!(matches!(err, MeshFaceError::NodeIndexOutOfRange { index: 3, node_count: 3, .. }));
}
