//! Renumbering utilities shared by attribute columns and meshes.
//!
//! Two table shapes appear everywhere in the crate:
//! - a **deletion mask** `to_delete[i]`, compacted into an `old2new` table
//!   where deleted entries map to [`NO_ID`];
//! - a **permutation** listing, for each new position, the old index placed
//!   there (`permutation[new] == old`). [`old2new_permutation`] inverts it
//!   when dependent data stores old indices that must be rewritten.

use crate::mesh_error::MeshError;
use crate::topology::index::{Index, NO_ID, to_index};

/// Compacted destination of every element after deleting the masked ones.
///
/// Survivors keep their relative order; deleted elements map to [`NO_ID`].
///
/// ```
/// # use mesh_attrib::algs::renumber::mapping_after_deletion;
/// # use mesh_attrib::topology::index::NO_ID;
/// let map = mapping_after_deletion(&[false, true, false, true, false]);
/// assert_eq!(map, vec![0, NO_ID, 1, NO_ID, 2]);
/// ```
pub fn mapping_after_deletion(to_delete: &[bool]) -> Vec<Index> {
    let mut old2new = Vec::with_capacity(to_delete.len());
    let mut next: Index = 0;
    for &deleted in to_delete {
        if deleted {
            old2new.push(NO_ID);
        } else {
            old2new.push(next);
            next += 1;
        }
    }
    old2new
}

/// Number of elements flagged for deletion.
#[inline]
pub fn nb_deleted(to_delete: &[bool]) -> Index {
    to_index(to_delete.iter().filter(|&&d| d).count())
}

/// Check that a deletion mask covers exactly `nb_elements` elements.
pub fn validate_mask(to_delete: &[bool], nb_elements: Index) -> Result<(), MeshError> {
    if to_delete.len() != nb_elements as usize {
        return Err(MeshError::MaskLengthMismatch {
            expected: nb_elements as usize,
            found: to_delete.len(),
        });
    }
    Ok(())
}

/// Check that `permutation` is a bijection over `0..nb_elements`.
pub fn validate_permutation(permutation: &[Index], nb_elements: Index) -> Result<(), MeshError> {
    if permutation.len() != nb_elements as usize {
        return Err(MeshError::InvalidPermutation(format!(
            "expected {nb_elements} entries, got {}",
            permutation.len()
        )));
    }
    let mut seen = vec![false; permutation.len()];
    for (new, &old) in permutation.iter().enumerate() {
        let slot = seen.get_mut(old as usize).ok_or_else(|| {
            MeshError::InvalidPermutation(format!(
                "entry {new} points to {old}, beyond {nb_elements} elements"
            ))
        })?;
        if *slot {
            return Err(MeshError::InvalidPermutation(format!(
                "index {old} appears twice"
            )));
        }
        *slot = true;
    }
    Ok(())
}

/// Invert a "new position → old index" permutation into "old → new".
pub fn old2new_permutation(permutation: &[Index]) -> Vec<Index> {
    let mut old2new = vec![NO_ID; permutation.len()];
    for (new, &old) in permutation.iter().enumerate() {
        old2new[old as usize] = to_index(new);
    }
    old2new
}

/// Reorder `data` in place so that `data[new] = old_data[permutation[new]]`.
///
/// Follows permutation cycles with swaps, so `T` needs neither `Clone` nor
/// `Default`. The permutation must be valid (see [`validate_permutation`]).
pub fn permute<T>(data: &mut [T], permutation: &[Index]) {
    debug_assert_eq!(data.len(), permutation.len());
    let mut visited = vec![false; permutation.len()];
    for start in 0..permutation.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut current = start;
        let mut source = permutation[start] as usize;
        while source != start {
            data.swap(current, source);
            visited[source] = true;
            current = source;
            source = permutation[source] as usize;
        }
    }
}

/// Remove the masked entries of `data`, keeping survivors in order.
pub fn delete_vector_elements<T>(to_delete: &[bool], data: &mut Vec<T>) {
    debug_assert_eq!(data.len(), to_delete.len());
    let mut flags = to_delete.iter();
    data.retain(|_| !flags.next().copied().unwrap_or(false));
}

/// Rewrite stored indices through an `old2new` table, leaving [`NO_ID`]
/// untouched.
pub fn remap_indices(values: &mut [Index], old2new: &[Index]) {
    for v in values.iter_mut() {
        if *v != NO_ID {
            *v = old2new[*v as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deletion_mapping_example() {
        let map = mapping_after_deletion(&[false, true, false, true, false]);
        assert_eq!(map, vec![0, NO_ID, 1, NO_ID, 2]);
        assert_eq!(nb_deleted(&[false, true, false, true, false]), 2);
    }

    #[test]
    fn deletion_mapping_all_and_none() {
        assert_eq!(mapping_after_deletion(&[true, true]), vec![NO_ID, NO_ID]);
        assert_eq!(mapping_after_deletion(&[false, false]), vec![0, 1]);
        assert!(mapping_after_deletion(&[]).is_empty());
    }

    #[test]
    fn permute_follows_new_to_old_convention() {
        let mut data = vec!['a', 'b', 'c', 'd'];
        permute(&mut data, &[2, 0, 3, 1]);
        assert_eq!(data, vec!['c', 'a', 'd', 'b']);
    }

    #[test]
    fn old2new_inverts_permutation() {
        let perm = [2, 0, 3, 1];
        let old2new = old2new_permutation(&perm);
        assert_eq!(old2new, vec![1, 3, 0, 2]);
        for (new, &old) in perm.iter().enumerate() {
            assert_eq!(old2new[old as usize] as usize, new);
        }
    }

    #[test]
    fn permutation_validation() {
        assert!(validate_permutation(&[1, 0, 2], 3).is_ok());
        assert!(matches!(
            validate_permutation(&[1, 1, 2], 3),
            Err(MeshError::InvalidPermutation(_))
        ));
        assert!(matches!(
            validate_permutation(&[0, 3, 1], 3),
            Err(MeshError::InvalidPermutation(_))
        ));
        assert!(matches!(
            validate_permutation(&[0, 1], 3),
            Err(MeshError::InvalidPermutation(_))
        ));
    }

    #[test]
    fn delete_vector_elements_keeps_order() {
        let mut data = vec![10, 11, 12, 13];
        delete_vector_elements(&[true, false, true, false], &mut data);
        assert_eq!(data, vec![11, 13]);
    }

    #[test]
    fn remap_skips_sentinel() {
        let mut values = vec![0, NO_ID, 2];
        remap_indices(&mut values, &[1, 0, NO_ID]);
        assert_eq!(values, vec![1, NO_ID, NO_ID]);
    }

    #[test]
    fn mask_length_is_checked() {
        assert_eq!(
            validate_mask(&[true], 2),
            Err(MeshError::MaskLengthMismatch {
                expected: 2,
                found: 1
            })
        );
    }
}
