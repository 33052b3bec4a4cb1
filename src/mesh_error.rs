//! MeshError: Unified error type for mesh-attrib public APIs
//!
//! Every fallible operation of the attribute store and of the connectivity
//! layer reports through this enum. Variants carry the offending indices so
//! callers can tell a malformed mapping apart from a bad local address.

use std::fmt;
use thiserror::Error;

use crate::topology::index::Index;

/// Element family an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Generic attribute element (no mesh semantics attached).
    Element,
    Vertex,
    Polygon,
    Polyhedron,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Element => "element",
            ElementKind::Vertex => "vertex",
            ElementKind::Polygon => "polygon",
            ElementKind::Polyhedron => "polyhedron",
        };
        f.write_str(name)
    }
}

/// Unified error type for mesh-attrib operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A global index does not address a live element.
    #[error("{kind} index {index} is out of range (count = {len})")]
    IndexOutOfRange {
        kind: ElementKind,
        index: Index,
        len: Index,
    },
    /// A local vertex/edge/facet index exceeds the size of its element.
    #[error("local index {local} is out of range for {kind} {element} (size = {len})")]
    LocalIndexOutOfRange {
        kind: ElementKind,
        element: Index,
        local: Index,
        len: Index,
    },
    /// A deletion mask does not cover exactly the current elements.
    #[error("deletion mask has {found} entries, expected {expected}")]
    MaskLengthMismatch { expected: usize, found: usize },
    /// A permutation is not a bijection over `0..n`.
    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),
    /// An extract/import mapping targets an index beyond the declared count.
    #[error("mapping targets index {index} beyond the declared {nb_elements} elements")]
    MappingOutOfBounds { index: Index, nb_elements: Index },
    /// A column exists under this name with another value type or storage.
    #[error("attribute `{name}` holds `{found}`, requested `{expected}`")]
    AttributeTypeMismatch {
        name: String,
        expected: String,
        found: String,
    },
    /// A column's length disagrees with its manager's element count.
    #[error("attribute `{name}` holds {found} values, expected {expected}")]
    ColumnLengthMismatch {
        name: String,
        expected: Index,
        found: Index,
    },
    /// No column is registered under this name.
    #[error("attribute `{0}` does not exist")]
    AttributeNotFound(String),
    /// A column cannot be replaced while handles to it are still alive.
    #[error("attribute `{0}` is still referenced and cannot be replaced")]
    ColumnInUse(String),
    /// Import source and destination are the same column.
    #[error("attribute `{0}` cannot be imported into itself")]
    SelfImport(String),
    /// Border walks require an edge/facet without adjacent element.
    #[error("local {local} of {kind} {element} is not on border")]
    NotOnBorder {
        kind: ElementKind,
        element: Index,
        local: Index,
    },
    /// An adjacency entry has no matching entry on the other side.
    #[error("wrong adjacency between {kind} {element} and {adjacent}")]
    InconsistentAdjacency {
        kind: ElementKind,
        element: Index,
        adjacent: Index,
    },
    /// More than two element sides share an edge/facet.
    #[error("non-manifold configuration around vertices {vertices:?}")]
    NonManifold { vertices: Vec<Index> },
    /// Interpolation indices and weights differ in length.
    #[error("interpolation has {indices} indices but {lambdas} weights")]
    InterpolationLengthMismatch { indices: usize, lambdas: usize },
    /// Polygon definition is unusable.
    #[error("invalid polygon: {0}")]
    InvalidPolygon(String),
    /// Polyhedron definition is unusable.
    #[error("invalid polyhedron: {0}")]
    InvalidPolyhedron(String),
    /// Archive names a column type absent from the registry.
    #[error("unknown attribute type tag `{0}`")]
    UnknownAttributeType(String),
    /// Encoding or decoding of an archive payload failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Archive was written by an incompatible layout version.
    #[error("unsupported archive version {found} (supported: {supported})")]
    UnsupportedArchiveVersion { found: u32, supported: u32 },
}

impl From<bincode::Error> for MeshError {
    fn from(err: bincode::Error) -> Self {
        MeshError::Serialization(err.to_string())
    }
}
