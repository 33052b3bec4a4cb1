#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-attrib
//!
//! mesh-attrib is the storage and connectivity foundation of a geometric
//! modeling toolkit: typed per-element attribute columns plus index-based
//! polygon and polyhedron meshes whose topology lives in those columns.
//!
//! ## Features
//! - Dense, sparse and constant attribute columns behind one read/write contract
//! - [`AttributeManager`](crate::data::manager::AttributeManager) broadcasting resize, deletion,
//!   permutation, extraction and import to every column it owns
//! - Versioned, type-tagged archives for managers and meshes (`bincode`, or any `serde` format)
//! - Polygonal surfaces in 2D/3D and polyhedral solids with local-index addressing,
//!   adjacency computation and cascading deletion
//! - Optional `rayon` parallelism for per-element computations
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-attrib = "0.3"
//! # features = ["rayon"]
//! ```
//!
//! ```
//! use mesh_attrib::prelude::*;
//!
//! let mut mesh = SurfaceMesh2D::new();
//! let mut builder = mesh.builder();
//! for p in [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
//!     builder.create_point(p).unwrap();
//! }
//! builder.create_polygons(&[[0u32, 1, 2], [0, 2, 3]]).unwrap();
//! builder.compute_polygon_adjacencies().unwrap();
//! assert_eq!(mesh.polygon_adjacent(PolygonEdge::new(0, 2)).unwrap(), Some(1));
//! ```
//!
//! ## Consistency
//!
//! Structural operations leave every column of a manager at the manager's
//! element count and keep adjacency symmetric. In debug builds, and with the
//! `strict-invariants` or `check-invariants` features, each operation
//! re-validates the structure it touched and panics on violation.

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod geometry;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::mapping::{BijectiveMapping, IndexMapping};
    pub use crate::data::archive::{AttributeTypeRegistry, ManagerArchive};
    pub use crate::data::attribute::{
        AttributeBase, AttributeHandle, AttributeProperties, AttributeReader, ReadOnlyAttribute,
    };
    pub use crate::data::constant::ConstantAttribute;
    pub use crate::data::dense::DenseAttribute;
    pub use crate::data::manager::AttributeManager;
    pub use crate::data::sparse::SparseAttribute;
    pub use crate::data::value::{AttributeLinearInterpolation, AttributeValue};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::{ElementKind, MeshError};
    pub use crate::topology::cell_type::PolyhedronKind;
    pub use crate::topology::index::{Index, LocalIndex, NO_ID, NO_LID};
    pub use crate::topology::local::{
        PolygonEdge, PolygonVertex, PolyhedronFacet, PolyhedronFacetVertex, PolyhedronVertex,
    };
    pub use crate::topology::solid::{SolidArchive, SolidMesh};
    pub use crate::topology::solid_builder::SolidMeshBuilder;
    pub use crate::topology::surface::{SurfaceArchive, SurfaceMesh, SurfaceMesh2D, SurfaceMesh3D};
    pub use crate::topology::surface_builder::SurfaceMeshBuilder;
    pub use crate::topology::validation::{AdjacencyOptions, NonManifoldHandling};
    pub use crate::topology::vertex_set::VertexSet;
}
