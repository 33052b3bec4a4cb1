//! Column contracts shared by every storage strategy.
//!
//! - [`ReadOnlyAttribute<T>`] is the typed read view any strategy offers.
//! - [`AttributeBase`] is the type-erased capability set the
//!   [`AttributeManager`](crate::data::manager::AttributeManager) drives:
//!   structural hooks, generic scalar access and archive encoding. Dynamic
//!   dispatch stays inside the manager's registry; consumers hold typed
//!   handles.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::algs::mapping::IndexMapping;
use crate::data::constant::ConstantAttribute;
use crate::data::dense::DenseAttribute;
use crate::data::sparse::SparseAttribute;
use crate::data::value::{AttributeLinearInterpolation, AttributeValue};
use crate::mesh_error::{ElementKind, MeshError};
use crate::topology::index::{Index, LocalIndex, NO_ID};

/// Flags the manager consults when computing values of new elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeProperties {
    /// Values may be copied from one element to another on request.
    pub assignable: bool,
    /// Values may be linearly recombined.
    pub interpolable: bool,
    /// Values follow elements when meshes are extracted or merged.
    pub transferable: bool,
}

impl Default for AttributeProperties {
    fn default() -> Self {
        Self {
            assignable: false,
            interpolable: false,
            transferable: true,
        }
    }
}

impl AttributeProperties {
    pub fn new(assignable: bool, interpolable: bool) -> Self {
        Self {
            assignable,
            interpolable,
            ..Self::default()
        }
    }

    pub fn with_transferable(mut self, transferable: bool) -> Self {
        self.transferable = transferable;
        self
    }
}

/// Storage strategy of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeStorage {
    Dense,
    Sparse,
    Constant,
}

impl fmt::Display for AttributeStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeStorage::Dense => "Dense",
            AttributeStorage::Sparse => "Sparse",
            AttributeStorage::Constant => "Constant",
        };
        f.write_str(name)
    }
}

/// Archive tag of a column: `"<Strategy><<value type>>"`.
pub fn type_tag<T: AttributeValue>(storage: AttributeStorage) -> String {
    format!("{storage}<{}>", T::type_name())
}

/// Typed read access, whatever the storage strategy.
pub trait ReadOnlyAttribute<T>: Send + Sync {
    /// Stored value, or the default for an unset slot.
    ///
    /// # Panics
    /// Dense columns panic when `element` is out of range, like slice
    /// indexing. Use [`try_value`](Self::try_value) for a checked read.
    fn value(&self, element: Index) -> &T;

    fn default_value(&self) -> &T;

    fn nb_values(&self) -> Index;

    fn try_value(&self, element: Index) -> Result<&T, MeshError> {
        if element >= self.nb_values() {
            return Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Element,
                index: element,
                len: self.nb_values(),
            });
        }
        Ok(self.value(element))
    }
}

/// Type-erased column capabilities driven by the attribute manager.
///
/// Structural hooks are only meant to be called by the owning manager so
/// that every column keeps the same element count.
pub trait AttributeBase: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn storage(&self) -> AttributeStorage;

    fn name(&self) -> &str;

    fn value_type_name(&self) -> &'static str;

    fn type_tag(&self) -> String;

    fn nb_elements(&self) -> Index;

    fn properties(&self) -> AttributeProperties;

    fn set_properties(&mut self, properties: AttributeProperties);

    fn is_genericable(&self) -> bool;

    fn nb_items(&self) -> LocalIndex;

    /// Value of `element` degraded to a scalar.
    fn generic_value(&self, element: Index) -> f32;

    fn generic_item_value(&self, element: Index, item: LocalIndex) -> f32;

    fn resize(&mut self, nb_elements: Index);

    fn reserve(&mut self, capacity: Index);

    /// Remove masked elements. The mask length is checked by the manager.
    fn delete_elements(&mut self, to_delete: &[bool]);

    /// Reorder elements so that new position `i` holds old `permutation[i]`.
    fn permute_elements(&mut self, permutation: &[Index]);

    /// Deep copy registered under `name`.
    fn clone_entry(&self, name: &str) -> AttributeEntry;

    /// Overwrite this column from a same-typed column of any strategy.
    fn copy_from(&mut self, from: &dyn AttributeBase, nb_elements: Index)
    -> Result<(), MeshError>;

    /// New column of `nb_elements` holding `self[i]` at `old2new[i]`.
    fn extract(&self, old2new: &[Index], nb_elements: Index) -> Result<AttributeEntry, MeshError>;

    /// New column of `nb_elements` holding `self[in]` at every mapped output.
    fn extract_mapping(
        &self,
        mapping: &IndexMapping,
        nb_elements: Index,
    ) -> Result<AttributeEntry, MeshError>;

    /// Write `from[i]` at `old2new[i]` for every mapped `i`.
    fn import(&mut self, old2new: &[Index], from: &dyn AttributeBase) -> Result<(), MeshError>;

    fn import_mapping(
        &mut self,
        mapping: &IndexMapping,
        from: &dyn AttributeBase,
    ) -> Result<(), MeshError>;

    /// Unconditional per-element copy.
    fn copy_value(&mut self, from: Index, to: Index);

    /// Copy honouring the assignable flag.
    fn compute_value(&mut self, from: Index, to: Index) {
        if self.properties().assignable {
            self.copy_value(from, to);
        }
    }

    /// Interpolate into `to`, honouring the interpolable flag.
    fn interpolate_value(&mut self, interpolation: &AttributeLinearInterpolation, to: Index);

    /// Encode the column's own field set.
    fn encode(&self) -> Result<Vec<u8>, MeshError>;
}

/// Shared handle on a concrete column.
pub type AttributeHandle<C> = Arc<RwLock<C>>;

/// Shared read-only handle, irrespective of the storage strategy.
pub type AttributeReader<T> = Arc<RwLock<dyn ReadOnlyAttribute<T>>>;

/// Registry slot: one column seen through its erased, concrete and typed
/// read-only faces. All three share one allocation.
pub struct AttributeEntry {
    column: Arc<RwLock<dyn AttributeBase>>,
    concrete: Box<dyn Any + Send + Sync>,
    reader: Box<dyn Any + Send + Sync>,
}

/// References held by the entry itself.
const ENTRY_REFERENCES: usize = 3;

impl AttributeEntry {
    pub fn new<T, C>(column: C) -> Self
    where
        T: AttributeValue,
        C: AttributeBase + ReadOnlyAttribute<T> + 'static,
    {
        Self::with_handle::<T, C>(column).0
    }

    /// Build the entry and hand back a typed handle on the same column.
    pub fn with_handle<T, C>(column: C) -> (Self, AttributeHandle<C>)
    where
        T: AttributeValue,
        C: AttributeBase + ReadOnlyAttribute<T> + 'static,
    {
        let concrete: AttributeHandle<C> = Arc::new(RwLock::new(column));
        let reader: AttributeReader<T> = concrete.clone();
        let entry = Self {
            column: concrete.clone(),
            concrete: Box::new(concrete.clone()),
            reader: Box::new(reader),
        };
        (entry, concrete)
    }

    pub fn column(&self) -> &Arc<RwLock<dyn AttributeBase>> {
        &self.column
    }

    /// Typed handle when the column is exactly `C`.
    pub fn handle<C: 'static>(&self) -> Option<AttributeHandle<C>> {
        self.concrete.downcast_ref::<AttributeHandle<C>>().cloned()
    }

    pub fn reader<T: 'static>(&self) -> Option<AttributeReader<T>> {
        self.reader.downcast_ref::<AttributeReader<T>>().cloned()
    }

    /// True while handles obtained from the manager are still alive.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.column) > ENTRY_REFERENCES
    }
}

impl fmt::Debug for AttributeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = self.column.read();
        f.debug_struct("AttributeEntry")
            .field("name", &column.name())
            .field("type", &column.type_tag())
            .field("nb_elements", &column.nb_elements())
            .finish()
    }
}

/// Typed read view of `from` when it stores `T`, whatever its strategy.
pub(crate) fn source_reader<T: AttributeValue>(
    from: &dyn AttributeBase,
) -> Option<&dyn ReadOnlyAttribute<T>> {
    let any = from.as_any();
    if let Some(dense) = any.downcast_ref::<DenseAttribute<T>>() {
        return Some(dense);
    }
    if let Some(sparse) = any.downcast_ref::<SparseAttribute<T>>() {
        return Some(sparse);
    }
    if let Some(constant) = any.downcast_ref::<ConstantAttribute<T>>() {
        return Some(constant);
    }
    None
}

/// Like [`source_reader`], reporting a type mismatch against `expected`.
pub(crate) fn typed_source<'a, T: AttributeValue>(
    from: &'a dyn AttributeBase,
    expected: &str,
) -> Result<&'a dyn ReadOnlyAttribute<T>, MeshError> {
    source_reader::<T>(from).ok_or_else(|| MeshError::AttributeTypeMismatch {
        name: from.name().to_string(),
        expected: expected.to_string(),
        found: from.type_tag(),
    })
}

/// Every mapped destination of an `old2new` table is below `nb_elements`,
/// and the table does not reach beyond `nb_sources`.
pub(crate) fn validate_old2new(
    old2new: &[Index],
    nb_sources: Index,
    nb_elements: Index,
) -> Result<(), MeshError> {
    if old2new.len() > nb_sources as usize {
        return Err(MeshError::IndexOutOfRange {
            kind: ElementKind::Element,
            index: nb_sources,
            len: nb_sources,
        });
    }
    for &new in old2new {
        if new != NO_ID && new >= nb_elements {
            return Err(MeshError::MappingOutOfBounds {
                index: new,
                nb_elements,
            });
        }
    }
    Ok(())
}

/// Every input of `mapping` is a valid source and every output a valid
/// destination.
pub(crate) fn validate_mapping(
    mapping: &IndexMapping,
    nb_sources: Index,
    nb_elements: Index,
) -> Result<(), MeshError> {
    for (&input, outputs) in mapping.in2out_map() {
        if input >= nb_sources {
            return Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Element,
                index: input,
                len: nb_sources,
            });
        }
        if let Some(&bad) = outputs.iter().find(|&&out| out >= nb_elements) {
            return Err(MeshError::MappingOutOfBounds {
                index: bad,
                nb_elements,
            });
        }
    }
    Ok(())
}

/// Pairs `(source, destination)` described by an `old2new` table.
pub(crate) fn old2new_pairs(old2new: &[Index]) -> impl Iterator<Item = (Index, Index)> + '_ {
    old2new
        .iter()
        .enumerate()
        .filter(|&(_, &new)| new != NO_ID)
        .map(|(old, &new)| (old as Index, new))
}

/// Pairs `(source, destination)` described by a fan-out mapping.
pub(crate) fn mapping_pairs(mapping: &IndexMapping) -> impl Iterator<Item = (Index, Index)> + '_ {
    mapping
        .in2out_map()
        .iter()
        .flat_map(|(&input, outputs)| outputs.iter().map(move |&out| (input, out)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_properties() {
        let p = AttributeProperties::default();
        assert!(!p.assignable && !p.interpolable && p.transferable);
        let p = AttributeProperties::new(true, false).with_transferable(false);
        assert!(p.assignable && !p.interpolable && !p.transferable);
    }

    #[test]
    fn type_tags() {
        assert_eq!(type_tag::<f64>(AttributeStorage::Dense), "Dense<f64>");
        assert_eq!(
            type_tag::<Vec<Index>>(AttributeStorage::Sparse),
            "Sparse<Vec<u32>>"
        );
    }

    #[test]
    fn old2new_validation() {
        assert!(validate_old2new(&[0, NO_ID, 1], 3, 2).is_ok());
        assert_eq!(
            validate_old2new(&[0, NO_ID, 2], 3, 2),
            Err(MeshError::MappingOutOfBounds {
                index: 2,
                nb_elements: 2
            })
        );
        assert!(validate_old2new(&[0, 1, 2, 3], 3, 5).is_err());
    }

    #[test]
    fn mapping_validation_and_pairs() {
        let mut mapping = IndexMapping::new();
        mapping.map(2, 5);
        mapping.map(2, 7);
        assert!(validate_mapping(&mapping, 3, 8).is_ok());
        assert_eq!(
            validate_mapping(&mapping, 3, 7),
            Err(MeshError::MappingOutOfBounds {
                index: 7,
                nb_elements: 7
            })
        );
        assert!(validate_mapping(&mapping, 2, 8).is_err());
        let mut pairs: Vec<_> = mapping_pairs(&mapping).collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(2, 5), (2, 7)]);
        let pairs: Vec<_> = old2new_pairs(&[NO_ID, 0, 3]).collect();
        assert_eq!(pairs, vec![(1, 0), (2, 3)]);
    }
}
