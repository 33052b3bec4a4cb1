//! Element indices and the `NO_ID` sentinel.
//!
//! Vertices, polygons and polyhedra are addressed by their position inside
//! their container. Positions are stable only between structural mutations
//! (deletion, permutation); every such mutation returns or consumes an
//! "old index → new index" table so dependent data can follow.

/// Position of an element inside its container.
pub type Index = u32;

/// Position of a sub-element (corner, edge, facet) inside its element.
pub type LocalIndex = u32;

/// Reserved index meaning "absent" or "unset".
pub const NO_ID: Index = Index::MAX;

/// Reserved local index meaning "absent" or "unset".
pub const NO_LID: LocalIndex = LocalIndex::MAX;

/// Convert a container length into an [`Index`].
///
/// Index space overflow is not guarded: containers are expected to stay far
/// below `NO_ID` elements.
#[inline]
pub(crate) fn to_index(len: usize) -> Index {
    len as Index
}

/// Iterator over `0..n` as [`Index`] values.
#[inline]
pub fn indices(n: Index) -> impl DoubleEndedIterator<Item = Index> + ExactSizeIterator {
    0..n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_max() {
        assert_eq!(NO_ID, u32::MAX);
        assert_eq!(NO_LID, u32::MAX);
    }

    #[test]
    fn indices_is_half_open() {
        let v: Vec<_> = indices(3).collect();
        assert_eq!(v, vec![0, 1, 2]);
        assert_eq!(indices(0).len(), 0);
    }
}
