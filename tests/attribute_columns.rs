use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use mesh_attrib::algs::mapping::IndexMapping;
use mesh_attrib::data::attribute::{AttributeProperties, ReadOnlyAttribute};
use mesh_attrib::data::manager::AttributeManager;
use mesh_attrib::mesh_error::MeshError;
use mesh_attrib::topology::index::{Index, NO_ID};

#[derive(Debug, Clone)]
enum Op {
    Resize(Index),
    Set(Index, i32),
    Delete(Vec<bool>),
    Permute(u64),
    Copy(Index, Index),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..24).prop_map(Op::Resize),
        (0u32..24, -3i32..4).prop_map(|(e, v)| Op::Set(e, v)),
        prop::collection::vec(any::<bool>(), 0..24).prop_map(Op::Delete),
        any::<u64>().prop_map(Op::Permute),
        (0u32..24, 0u32..24).prop_map(|(a, b)| Op::Copy(a, b)),
    ]
}

/// Apply `op` to `manager`, adapting indices to the current element count.
fn apply(manager: &mut AttributeManager, dense: &str, sparse: &str, op: &Op) {
    let nb = manager.nb_elements();
    match op {
        Op::Resize(n) => manager.resize(*n),
        Op::Set(element, value) if nb > 0 => {
            let element = element % nb;
            manager
                .find_or_create_attribute(dense, 0i32, AttributeProperties::default())
                .unwrap()
                .write()
                .set_value(element, *value);
            manager
                .find_or_create_sparse_attribute(sparse, 0i32, AttributeProperties::default())
                .unwrap()
                .write()
                .set_value(element, *value);
        }
        Op::Delete(bits) => {
            let mask: Vec<bool> = (0..nb as usize)
                .map(|i| bits.get(i).copied().unwrap_or(false))
                .collect();
            manager.delete_elements(&mask).unwrap();
        }
        Op::Permute(seed) => {
            let mut permutation: Vec<Index> = (0..nb).collect();
            permutation.shuffle(&mut StdRng::seed_from_u64(*seed));
            manager.permute_elements(&permutation).unwrap();
        }
        Op::Copy(from, to) if nb > 0 => {
            manager.copy_attribute_value(from % nb, to % nb).unwrap();
        }
        _ => {}
    }
}

proptest! {
    #[test]
    fn dense_and_sparse_agree(ops in prop::collection::vec(op(), 1..40)) {
        let mut manager = AttributeManager::new();
        manager.find_or_create_attribute("dense", 0i32, AttributeProperties::default()).unwrap();
        manager
            .find_or_create_sparse_attribute("sparse", 0i32, AttributeProperties::default())
            .unwrap();
        for op in &ops {
            apply(&mut manager, "dense", "sparse", op);
            let dense = manager.find_attribute::<i32>("dense").unwrap();
            let sparse = manager.find_attribute::<i32>("sparse").unwrap();
            let (dense, sparse) = (dense.read(), sparse.read());
            prop_assert_eq!(dense.nb_values(), manager.nb_elements());
            prop_assert_eq!(sparse.nb_values(), manager.nb_elements());
            for element in 0..manager.nb_elements() {
                prop_assert_eq!(dense.value(element), sparse.value(element), "after {:?}", op);
            }
        }
    }
}

#[test]
fn sparse_column_forgets_default_values() {
    let mut manager = AttributeManager::new();
    manager.resize(10);
    let sparse = manager
        .find_or_create_sparse_attribute("flag", 0u8, AttributeProperties::default())
        .unwrap();
    sparse.write().set_value(2, 7);
    sparse.write().set_value(3, 9);
    assert_eq!(sparse.read().nb_stored_values(), 2);

    // Element 5 holds the default: copying it erases the stored value.
    manager.copy_attribute_value(5, 2).unwrap();
    assert_eq!(sparse.read().nb_stored_values(), 1);

    manager.resize(3);
    assert_eq!(sparse.read().nb_stored_values(), 0);
    manager.resize(10);
    assert_eq!(*sparse.read().value(3), 0);
}

#[test]
fn fan_out_import_writes_every_output() {
    let mut source = AttributeManager::new();
    source.resize(3);
    let values = source
        .find_or_create_attribute("weight", 0.0f64, AttributeProperties::default())
        .unwrap();
    for (e, v) in [1.5, 2.5, 3.5].into_iter().enumerate() {
        values.write().set_value(e as Index, v);
    }

    let mut mapping = IndexMapping::new();
    mapping.map(2, 5);
    mapping.map(2, 7);
    mapping.map(0, 1);

    let mut target = AttributeManager::new();
    target.resize(8);
    target.import_mapping(&mapping, &source).unwrap();
    let weight = target.find_attribute::<f64>("weight").unwrap();
    let weight = weight.read();
    assert_eq!(*weight.value(5), 3.5);
    assert_eq!(*weight.value(7), 3.5);
    assert_eq!(*weight.value(1), 1.5);
    assert_eq!(*weight.value(0), 0.0);

    let mut small = AttributeManager::new();
    small.resize(7);
    assert_eq!(
        small.import_mapping(&mapping, &source),
        Err(MeshError::MappingOutOfBounds {
            index: 7,
            nb_elements: 7
        })
    );
}

#[test]
fn extraction_keeps_only_transferable_columns() {
    let mut manager = AttributeManager::new();
    manager.resize(4);
    let kept = manager
        .find_or_create_attribute("kept", 0u32, AttributeProperties::default())
        .unwrap();
    manager
        .find_or_create_attribute(
            "internal",
            0u32,
            AttributeProperties::default().with_transferable(false),
        )
        .unwrap();
    for e in 0..4 {
        kept.write().set_value(e, 10 + e);
    }

    let extracted = manager.extract(&[NO_ID, 0, NO_ID, 1], 2).unwrap();
    assert_eq!(extracted.nb_elements(), 2);
    assert_eq!(extracted.attribute_names(), vec!["kept".to_string()]);
    let kept = extracted.find_attribute::<u32>("kept").unwrap();
    assert_eq!(*kept.read().value(0), 11);
    assert_eq!(*kept.read().value(1), 13);
}
