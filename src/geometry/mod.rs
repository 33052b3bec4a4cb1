//! Geometry utilities for mesh-attrib.
//!
//! Plain functions over point arrays; the meshes use them for barycenters,
//! areas, normals and volumes.

pub mod metrics;
