//! Data module: typed attribute columns and their manager.
//!
//! A column stores one value per element of some container. Three storage
//! strategies share the [`ReadOnlyAttribute`] contract:
//! - [`DenseAttribute`]: one slot per element
//! - [`SparseAttribute`]: only values differing from the default are stored
//! - [`ConstantAttribute`]: a single value for every element
//!
//! [`AttributeManager`] owns the columns of one container and applies every
//! structural change to all of them at once.

pub mod archive;
pub mod attribute;
pub mod constant;
pub mod dense;
pub mod manager;
pub mod sparse;
pub mod value;

pub use archive::{AttributeTypeRegistry, ColumnArchive, ManagerArchive};
pub use attribute::{
    AttributeBase, AttributeEntry, AttributeHandle, AttributeProperties, AttributeReader,
    AttributeStorage, ReadOnlyAttribute,
};
pub use constant::ConstantAttribute;
pub use dense::DenseAttribute;
pub use manager::AttributeManager;
pub use sparse::SparseAttribute;
pub use value::{AttributeLinearInterpolation, AttributeValue};
