//! Index bookkeeping and per-element computations shared by the attribute
//! store and the meshes.

pub mod mapping;
pub mod parallel;
pub mod renumber;

pub use mapping::{BijectiveMapping, GenericMapping, IndexMapping};
pub use parallel::{map_elements, try_map_elements};
