//! Sparse column: only values differing from the default are stored.
//!
//! An index absent from the map reads as the default value. `set_value` may
//! store a value equal to the default; every structural operation (resize,
//! delete, permute, extract, import) drops such entries, so the map never
//! grows through renumbering. Values must be `PartialEq` for that purpose,
//! which is enforced when the column is constructed.

use std::any::Any;
use std::fmt::{self, Debug};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::algs::mapping::IndexMapping;
use crate::algs::renumber::{mapping_after_deletion, nb_deleted, old2new_permutation};
use crate::data::attribute::{
    AttributeBase, AttributeEntry, AttributeProperties, AttributeStorage, ReadOnlyAttribute,
    mapping_pairs, old2new_pairs, type_tag, typed_source, validate_mapping, validate_old2new,
};
use crate::data::value::{AttributeLinearInterpolation, AttributeValue};
use crate::mesh_error::{ElementKind, MeshError};
use crate::topology::index::{Index, LocalIndex, NO_ID};

/// Hash-keyed column for attributes set on few elements.
#[derive(Clone, Serialize, Deserialize)]
pub struct SparseAttribute<T> {
    name: String,
    default_value: T,
    values: HashMap<Index, T>,
    nb_elements: Index,
    properties: AttributeProperties,
}

impl<T> Debug for SparseAttribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseAttribute")
            .field("name", &self.name)
            .field("nb_elements", &self.nb_elements)
            .field("stored", &self.values.len())
            .finish()
    }
}

impl<T: AttributeValue> SparseAttribute<T> {
    /// Stored value, or the default when `element` was never set.
    #[inline]
    pub fn value(&self, element: Index) -> &T {
        self.values.get(&element).unwrap_or(&self.default_value)
    }

    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    pub fn nb_elements(&self) -> Index {
        self.nb_elements
    }

    /// Number of physically stored entries.
    pub fn nb_stored_values(&self) -> usize {
        self.values.len()
    }

    /// True if `element` has a physical entry.
    pub fn is_stored(&self, element: Index) -> bool {
        self.values.contains_key(&element)
    }

    pub fn properties(&self) -> AttributeProperties {
        self.properties
    }
}

impl<T: AttributeValue + PartialEq> SparseAttribute<T> {
    pub fn new(
        name: impl Into<String>,
        default_value: T,
        properties: AttributeProperties,
        nb_elements: Index,
    ) -> Self {
        Self {
            name: name.into(),
            default_value,
            values: HashMap::new(),
            nb_elements,
            properties,
        }
    }

    /// # Panics
    /// If `element` is out of range.
    pub fn set_value(&mut self, element: Index, value: T) {
        self.assert_in_range(element);
        self.values.insert(element, value);
    }

    pub fn try_set_value(&mut self, element: Index, value: T) -> Result<(), MeshError> {
        if element >= self.nb_elements {
            return Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Element,
                index: element,
                len: self.nb_elements,
            });
        }
        self.values.insert(element, value);
        Ok(())
    }

    /// Read-modify-write of one slot; an unset slot starts from the default.
    ///
    /// # Panics
    /// If `element` is out of range.
    pub fn modify_value(&mut self, element: Index, f: impl FnOnce(&mut T)) {
        self.assert_in_range(element);
        let Self {
            values,
            default_value,
            ..
        } = self;
        f(values
            .entry(element)
            .or_insert_with(|| default_value.clone()));
    }

    fn assert_in_range(&self, element: Index) {
        assert!(
            element < self.nb_elements,
            "element {element} out of range for {} elements",
            self.nb_elements
        );
    }

    /// Drop entries equal to the default and entries beyond the element count.
    pub fn compact(&mut self) {
        let Self {
            values,
            default_value,
            nb_elements,
            ..
        } = self;
        values.retain(|&element, value| element < *nb_elements && value != default_value);
    }

    /// Insert `value`, or erase the slot when it equals the default.
    fn store(&mut self, element: Index, value: T) {
        if value == self.default_value {
            self.values.remove(&element);
        } else {
            self.values.insert(element, value);
        }
    }

    /// Rebuild the map with every key sent through `old2new`.
    fn remap_keys(&mut self, old2new: &[Index]) {
        let default = &self.default_value;
        let remapped: HashMap<Index, T> = self
            .values
            .drain()
            .filter_map(|(old, value)| {
                let new = *old2new.get(old as usize)?;
                (new != NO_ID && value != *default).then_some((new, value))
            })
            .collect();
        self.values = remapped;
    }

    fn empty_like(&self, nb_elements: Index) -> Self {
        Self::new(
            self.name.clone(),
            self.default_value.clone(),
            self.properties,
            nb_elements,
        )
    }
}

impl<T: AttributeValue> ReadOnlyAttribute<T> for SparseAttribute<T> {
    fn value(&self, element: Index) -> &T {
        SparseAttribute::value(self, element)
    }

    fn default_value(&self) -> &T {
        &self.default_value
    }

    fn nb_values(&self) -> Index {
        self.nb_elements
    }
}

impl<T: AttributeValue + PartialEq> AttributeBase for SparseAttribute<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn storage(&self) -> AttributeStorage {
        AttributeStorage::Sparse
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn value_type_name(&self) -> &'static str {
        T::type_name()
    }

    fn type_tag(&self) -> String {
        type_tag::<T>(AttributeStorage::Sparse)
    }

    fn nb_elements(&self) -> Index {
        self.nb_elements
    }

    fn properties(&self) -> AttributeProperties {
        self.properties
    }

    fn set_properties(&mut self, properties: AttributeProperties) {
        self.properties = properties;
    }

    fn is_genericable(&self) -> bool {
        T::is_genericable()
    }

    fn nb_items(&self) -> LocalIndex {
        T::nb_items()
    }

    fn generic_value(&self, element: Index) -> f32 {
        self.value(element).converted_value()
    }

    fn generic_item_value(&self, element: Index, item: LocalIndex) -> f32 {
        self.value(element).converted_item_value(item)
    }

    fn resize(&mut self, nb_elements: Index) {
        self.nb_elements = nb_elements;
        self.compact();
    }

    /// Capacity follows the stored entries, not the element count.
    fn reserve(&mut self, _capacity: Index) {}

    fn delete_elements(&mut self, to_delete: &[bool]) {
        let old2new = mapping_after_deletion(to_delete);
        self.remap_keys(&old2new);
        self.nb_elements -= nb_deleted(to_delete);
    }

    fn permute_elements(&mut self, permutation: &[Index]) {
        let old2new = old2new_permutation(permutation);
        self.remap_keys(&old2new);
    }

    fn clone_entry(&self, name: &str) -> AttributeEntry {
        let mut column = self.clone();
        column.name = name.to_string();
        AttributeEntry::new::<T, _>(column)
    }

    fn copy_from(
        &mut self,
        from: &dyn AttributeBase,
        nb_elements: Index,
    ) -> Result<(), MeshError> {
        let Some(source) = from.as_any().downcast_ref::<Self>() else {
            return Err(MeshError::AttributeTypeMismatch {
                name: self.name.clone(),
                expected: self.type_tag(),
                found: from.type_tag(),
            });
        };
        self.default_value = source.default_value.clone();
        self.properties = source.properties;
        self.values = source.values.clone();
        self.nb_elements = nb_elements;
        self.compact();
        Ok(())
    }

    fn extract(&self, old2new: &[Index], nb_elements: Index) -> Result<AttributeEntry, MeshError> {
        validate_old2new(old2new, self.nb_elements, nb_elements)?;
        let mut column = self.empty_like(nb_elements);
        for (old, new) in old2new_pairs(old2new) {
            if let Some(value) = self.values.get(&old) {
                column.store(new, value.clone());
            }
        }
        Ok(AttributeEntry::new::<T, _>(column))
    }

    fn extract_mapping(
        &self,
        mapping: &IndexMapping,
        nb_elements: Index,
    ) -> Result<AttributeEntry, MeshError> {
        validate_mapping(mapping, self.nb_elements, nb_elements)?;
        let mut column = self.empty_like(nb_elements);
        for (input, output) in mapping_pairs(mapping) {
            if let Some(value) = self.values.get(&input) {
                column.store(output, value.clone());
            }
        }
        Ok(AttributeEntry::new::<T, _>(column))
    }

    fn import(&mut self, old2new: &[Index], from: &dyn AttributeBase) -> Result<(), MeshError> {
        let source = typed_source::<T>(from, &self.type_tag())?;
        validate_old2new(old2new, source.nb_values(), self.nb_elements)?;
        for (old, new) in old2new_pairs(old2new) {
            self.store(new, source.value(old).clone());
        }
        Ok(())
    }

    fn import_mapping(
        &mut self,
        mapping: &IndexMapping,
        from: &dyn AttributeBase,
    ) -> Result<(), MeshError> {
        let source = typed_source::<T>(from, &self.type_tag())?;
        validate_mapping(mapping, source.nb_values(), self.nb_elements)?;
        for (input, output) in mapping_pairs(mapping) {
            self.store(output, source.value(input).clone());
        }
        Ok(())
    }

    fn copy_value(&mut self, from: Index, to: Index) {
        match self.values.get(&from).cloned() {
            Some(value) => {
                self.values.insert(to, value);
            }
            None => {
                self.values.remove(&to);
            }
        }
    }

    fn interpolate_value(&mut self, interpolation: &AttributeLinearInterpolation, to: Index) {
        if !self.properties.interpolable {
            return;
        }
        let value = T::interpolate(interpolation, &|i| self.value(i).clone())
            .unwrap_or_else(|| self.default_value.clone());
        self.store(to, value);
    }

    fn encode(&self) -> Result<Vec<u8>, MeshError> {
        Ok(bincode::serialize(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(nb: Index) -> SparseAttribute<i32> {
        SparseAttribute::new("s", 0, AttributeProperties::default(), nb)
    }

    #[test]
    fn writes_past_the_element_count_are_rejected() {
        let mut c = column(3);
        assert_eq!(
            c.try_set_value(3, 1),
            Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Element,
                index: 3,
                len: 3
            })
        );
        assert_eq!(c.nb_stored_values(), 0);
        c.try_set_value(2, 1).unwrap();
        assert_eq!(*c.value(2), 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn unchecked_write_past_the_element_count_panics() {
        column(3).set_value(5, 1);
    }

    #[test]
    fn unset_reads_default() {
        let mut c = column(4);
        c.set_value(1, 5);
        assert_eq!(*c.value(1), 5);
        assert_eq!(*c.value(2), 0);
        assert_eq!(c.nb_stored_values(), 1);
    }

    #[test]
    fn modify_starts_from_default() {
        let mut c = column(2);
        c.modify_value(0, |v| *v += 3);
        c.modify_value(0, |v| *v += 3);
        assert_eq!(*c.value(0), 6);
    }

    #[test]
    fn default_entries_dropped_by_structural_ops() {
        let mut c = column(5);
        c.set_value(3, 0);
        c.set_value(4, 9);
        assert!(c.is_stored(3));
        c.permute_elements(&[0, 1, 2, 3, 4]);
        assert!(!c.is_stored(3));
        assert!(c.is_stored(4));

        c.set_value(2, 0);
        c.delete_elements(&[true, false, false, false, false]);
        assert_eq!(c.nb_elements(), 4);
        assert_eq!(c.nb_stored_values(), 1);
        assert_eq!(*c.value(3), 9);
    }

    #[test]
    fn shrinking_drops_entries_beyond_count() {
        let mut c = column(5);
        c.set_value(4, 1);
        c.resize(3);
        assert_eq!(c.nb_stored_values(), 0);
        c.resize(5);
        assert_eq!(*c.value(4), 0);
    }

    #[test]
    fn permute_moves_entries() {
        let mut c = column(3);
        c.set_value(0, 7);
        c.permute_elements(&[1, 2, 0]);
        assert_eq!(*c.value(2), 7);
        assert_eq!(c.nb_stored_values(), 1);
    }

    #[test]
    fn import_of_default_erases_slot() {
        let mut dst = column(2);
        dst.set_value(1, 4);
        let src = column(1);
        dst.import(&[1], &src).unwrap();
        assert!(!dst.is_stored(1));
    }

    #[test]
    fn copy_value_of_unset_clears_target() {
        let mut c = column(3);
        c.set_value(2, 8);
        c.copy_value(0, 2);
        assert!(!c.is_stored(2));
        c.set_value(1, 5);
        c.copy_value(1, 0);
        assert_eq!(*c.value(0), 5);
    }
}
