mod util;
use util::*;

use mesh_faces::prelude::*;
use proptest::prelude::*;

fn schemes() -> impl Strategy<Value = HashScheme> {
    prop_oneof![
        Just(HashScheme::Identity),
        Just(HashScheme::Random),
        Just(HashScheme::Murmur),
    ]
}

fn serial_signatures(mesh: &GlobalMesh, scheme: HashScheme) -> std::collections::BTreeSet<FaceSignature> {
    let model = mesh.serial_model();
    let out = FaceGenerator::serial(&model)
        .generate_with(GenerationMode::PerBlock, scheme)
        .unwrap();
    signatures(out.table(&mesh.block).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn partitioning_does_not_change_the_face_set(
        nranks in 2usize..=3,
        seeds in proptest::collection::vec(any::<usize>(), 6),
        scheme in schemes(),
    ) {
        let mesh = hex_grid(3, 2, 1);
        let owner: Vec<usize> = seeds.iter().map(|s| s % nranks).collect();
        let models = mesh.partition(&owner, nranks);
        let config = GenerationConfig::default().with_hash_scheme(scheme);
        let results: Vec<FaceGeneration> = run_ranks(&models, &config)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        prop_assert_eq!(union_signatures(&results, "hex"), serial_signatures(&mesh, scheme));
    }

    #[test]
    fn element_order_does_not_change_the_face_set(
        order in Just((0..12usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let mesh = hex_grid(3, 2, 2);
        let shuffled = GlobalMesh {
            elements: order.iter().map(|&e| mesh.elements[e].clone()).collect(),
            element_ids: order.iter().map(|&e| mesh.element_ids[e]).collect(),
            ..mesh.clone()
        };
        prop_assert_eq!(
            serial_signatures(&shuffled, HashScheme::Murmur),
            serial_signatures(&mesh, HashScheme::Murmur)
        );
    }

    #[test]
    fn hash_scheme_does_not_change_the_face_set(
        nx in 1usize..=3,
        ny in 1usize..=3,
        nz in 1usize..=2,
        a in schemes(),
        b in schemes(),
    ) {
        let mesh = hex_grid(nx, ny, nz);
        prop_assert_eq!(serial_signatures(&mesh, a), serial_signatures(&mesh, b));
    }
}
