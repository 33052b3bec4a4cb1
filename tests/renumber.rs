use proptest::prelude::*;

use mesh_attrib::algs::renumber::{
    delete_vector_elements, mapping_after_deletion, nb_deleted, old2new_permutation, permute,
    remap_indices, validate_permutation,
};
use mesh_attrib::topology::index::{Index, NO_ID};

fn permutation(max_len: usize) -> impl Strategy<Value = Vec<Index>> {
    (0..max_len)
        .prop_flat_map(|n| Just((0..n as Index).collect::<Vec<_>>()).prop_shuffle())
}

proptest! {
    #[test]
    fn deletion_mapping_is_order_preserving(mask in prop::collection::vec(any::<bool>(), 0..64)) {
        let old2new = mapping_after_deletion(&mask);
        let survivors: Vec<Index> = old2new.iter().copied().filter(|&n| n != NO_ID).collect();
        prop_assert_eq!(survivors.len() + nb_deleted(&mask) as usize, mask.len());
        prop_assert!(survivors.iter().copied().eq(0..survivors.len() as Index));
        for (old, &new) in old2new.iter().enumerate() {
            prop_assert_eq!(new == NO_ID, mask[old]);
        }

        let mut data: Vec<usize> = (0..mask.len()).collect();
        delete_vector_elements(&mask, &mut data);
        for (old, &new) in old2new.iter().enumerate() {
            if new != NO_ID {
                prop_assert_eq!(data[new as usize], old);
            }
        }
    }

    #[test]
    fn permutation_round_trip(perm in permutation(48)) {
        prop_assert!(validate_permutation(&perm, perm.len() as Index).is_ok());
        let old2new = old2new_permutation(&perm);
        for (new, &old) in perm.iter().enumerate() {
            prop_assert_eq!(old2new[old as usize] as usize, new);
        }

        let original: Vec<String> = (0..perm.len()).map(|i| format!("v{i}")).collect();
        let mut data = original.clone();
        permute(&mut data, &perm);
        for (new, &old) in perm.iter().enumerate() {
            prop_assert_eq!(&data[new], &original[old as usize]);
        }

        // Stored indices follow their elements.
        let mut stored: Vec<Index> = (0..perm.len() as Index).collect();
        stored.push(NO_ID);
        remap_indices(&mut stored, &old2new);
        prop_assert_eq!(stored.last().copied(), Some(NO_ID));
        for (old, &new) in stored.iter().take(perm.len()).enumerate() {
            prop_assert_eq!(data[new as usize].clone(), format!("v{old}"));
        }
    }
}

#[test]
fn invalid_permutations_are_rejected() {
    assert!(validate_permutation(&[0, 0, 1], 3).is_err());
    assert!(validate_permutation(&[0, 3, 1], 3).is_err());
    assert!(validate_permutation(&[0, 1], 3).is_err());
    assert!(validate_permutation(&[], 0).is_ok());
}
