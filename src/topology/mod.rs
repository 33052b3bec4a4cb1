//! Index-based mesh connectivity.
//!
//! Containers nest the way the elements do: a [`VertexSet`] under a
//! [`SurfaceMesh`] of polygons or a [`SolidMesh`] of polyhedra. Topology is
//! stored as attribute columns and addressed through the small local-index
//! structs of [`local`]; every mutation goes through the mesh builders.

pub mod cell_type;
pub mod coordinates;
pub mod index;
pub mod local;
pub mod solid;
pub mod solid_builder;
pub mod surface;
pub mod surface_builder;
pub mod validation;
pub mod vertex_set;

pub use cell_type::PolyhedronKind;
pub use index::{Index, LocalIndex, NO_ID, NO_LID};
pub use local::*;
pub use solid::SolidMesh;
pub use solid_builder::SolidMeshBuilder;
pub use surface::{SurfaceMesh, SurfaceMesh2D, SurfaceMesh3D};
pub use surface_builder::SurfaceMeshBuilder;
pub use validation::{AdjacencyOptions, NonManifoldHandling};
pub use vertex_set::VertexSet;
