//! Polyhedron kinds and their local facet tables.
//!
//! Local vertex ordering of the regular kinds:
//! - Tetrahedron: `[v0, v1, v2]` counter-clockwise seen from `v3`.
//! - Hexahedron: bottom `[v0, v1, v2, v3]` counter-clockwise seen from the
//!   top, top `[v4, v5, v6, v7]` with `v4` above `v0`.
//! - Prism: bottom `[v0, v1, v2]`, top `[v3, v4, v5]` with `v3` above `v0`.
//! - Pyramid: base `[v0, v1, v2, v3]`, apex `v4`.
//!
//! Facets are listed with outward orientation. Irregular polyhedra carry
//! their own facet definitions and use [`PolyhedronKind::Polyhedron`].

use serde::{Deserialize, Serialize};

use crate::data::value::AttributeValue;
use crate::topology::index::LocalIndex;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum PolyhedronKind {
    #[default]
    Tetrahedron,
    Hexahedron,
    Prism,
    Pyramid,
    /// Arbitrary polyhedron with explicit facets.
    Polyhedron,
}

const TET_FACE_0: [LocalIndex; 3] = [1, 2, 3];
const TET_FACE_1: [LocalIndex; 3] = [0, 3, 2];
const TET_FACE_2: [LocalIndex; 3] = [0, 1, 3];
const TET_FACE_3: [LocalIndex; 3] = [0, 2, 1];
const HEX_FACE_0: [LocalIndex; 4] = [0, 3, 2, 1];
const HEX_FACE_1: [LocalIndex; 4] = [4, 5, 6, 7];
const HEX_FACE_2: [LocalIndex; 4] = [0, 1, 5, 4];
const HEX_FACE_3: [LocalIndex; 4] = [1, 2, 6, 5];
const HEX_FACE_4: [LocalIndex; 4] = [2, 3, 7, 6];
const HEX_FACE_5: [LocalIndex; 4] = [3, 0, 4, 7];
const PRISM_FACE_0: [LocalIndex; 3] = [0, 2, 1];
const PRISM_FACE_1: [LocalIndex; 3] = [3, 4, 5];
const PRISM_FACE_2: [LocalIndex; 4] = [0, 1, 4, 3];
const PRISM_FACE_3: [LocalIndex; 4] = [1, 2, 5, 4];
const PRISM_FACE_4: [LocalIndex; 4] = [2, 0, 3, 5];
const PYRAMID_FACE_0: [LocalIndex; 4] = [0, 3, 2, 1];
const PYRAMID_FACE_1: [LocalIndex; 3] = [0, 1, 4];
const PYRAMID_FACE_2: [LocalIndex; 3] = [1, 2, 4];
const PYRAMID_FACE_3: [LocalIndex; 3] = [2, 3, 4];
const PYRAMID_FACE_4: [LocalIndex; 3] = [3, 0, 4];

/// Facet `i` is opposite local vertex `i`.
const TET_FACES: [&[LocalIndex]; 4] = [&TET_FACE_0, &TET_FACE_1, &TET_FACE_2, &TET_FACE_3];
const HEX_FACES: [&[LocalIndex]; 6] = [
    &HEX_FACE_0,
    &HEX_FACE_1,
    &HEX_FACE_2,
    &HEX_FACE_3,
    &HEX_FACE_4,
    &HEX_FACE_5,
];
const PRISM_FACES: [&[LocalIndex]; 5] = [
    &PRISM_FACE_0,
    &PRISM_FACE_1,
    &PRISM_FACE_2,
    &PRISM_FACE_3,
    &PRISM_FACE_4,
];
const PYRAMID_FACES: [&[LocalIndex]; 5] = [
    &PYRAMID_FACE_0,
    &PYRAMID_FACE_1,
    &PYRAMID_FACE_2,
    &PYRAMID_FACE_3,
    &PYRAMID_FACE_4,
];

impl PolyhedronKind {
    /// Number of vertices of a regular kind; `None` for `Polyhedron`.
    pub fn nb_vertices(self) -> Option<LocalIndex> {
        match self {
            PolyhedronKind::Tetrahedron => Some(4),
            PolyhedronKind::Hexahedron => Some(8),
            PolyhedronKind::Prism => Some(6),
            PolyhedronKind::Pyramid => Some(5),
            PolyhedronKind::Polyhedron => None,
        }
    }

    /// Fixed facet table of a regular kind; `None` for `Polyhedron`.
    pub fn facets(self) -> Option<&'static [&'static [LocalIndex]]> {
        match self {
            PolyhedronKind::Tetrahedron => Some(&TET_FACES),
            PolyhedronKind::Hexahedron => Some(&HEX_FACES),
            PolyhedronKind::Prism => Some(&PRISM_FACES),
            PolyhedronKind::Pyramid => Some(&PYRAMID_FACES),
            PolyhedronKind::Polyhedron => None,
        }
    }

    pub fn is_regular(self) -> bool {
        self != PolyhedronKind::Polyhedron
    }
}

impl AttributeValue for PolyhedronKind {
    fn type_name() -> &'static str {
        "PolyhedronKind"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_tables_are_consistent() {
        for kind in [
            PolyhedronKind::Tetrahedron,
            PolyhedronKind::Hexahedron,
            PolyhedronKind::Prism,
            PolyhedronKind::Pyramid,
        ] {
            let nb = kind.nb_vertices().unwrap();
            let facets = kind.facets().unwrap();
            let mut used = vec![0usize; nb as usize];
            for facet in facets {
                assert!(facet.len() >= 3);
                for &v in *facet {
                    used[v as usize] += 1;
                }
            }
            // Every vertex of a closed polyhedron lies on at least three facets.
            assert!(used.iter().all(|&c| c >= 3), "{kind:?}");
        }
    }

    #[test]
    fn every_edge_shared_by_two_opposite_facets() {
        for kind in [
            PolyhedronKind::Tetrahedron,
            PolyhedronKind::Hexahedron,
            PolyhedronKind::Prism,
            PolyhedronKind::Pyramid,
        ] {
            let mut edges = Vec::new();
            for facet in kind.facets().unwrap() {
                for i in 0..facet.len() {
                    edges.push((facet[i], facet[(i + 1) % facet.len()]));
                }
            }
            for &(a, b) in &edges {
                assert!(edges.contains(&(b, a)), "{kind:?} edge {a}-{b}");
            }
        }
    }

    #[test]
    fn irregular_kind_has_no_table() {
        assert_eq!(PolyhedronKind::Polyhedron.nb_vertices(), None);
        assert!(PolyhedronKind::Polyhedron.facets().is_none());
        assert!(!PolyhedronKind::Polyhedron.is_regular());
    }
}
