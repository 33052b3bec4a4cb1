//! Dense column: one value slot per element, default-filled on growth.

use std::any::Any;
use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use crate::algs::mapping::IndexMapping;
use crate::algs::renumber::{delete_vector_elements, permute};
use crate::data::attribute::{
    AttributeBase, AttributeEntry, AttributeProperties, AttributeStorage, ReadOnlyAttribute,
    mapping_pairs, old2new_pairs, type_tag, typed_source, validate_mapping, validate_old2new,
};
use crate::data::value::{AttributeLinearInterpolation, AttributeValue};
use crate::mesh_error::{ElementKind, MeshError};
use crate::topology::index::{Index, LocalIndex, to_index};

/// `Vec`-backed column with O(1) access.
#[derive(Clone, Serialize, Deserialize)]
pub struct DenseAttribute<T> {
    name: String,
    default_value: T,
    values: Vec<T>,
    properties: AttributeProperties,
}

impl<T> Debug for DenseAttribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseAttribute")
            .field("name", &self.name)
            .field("len", &self.values.len())
            .field("properties", &self.properties)
            .finish()
    }
}

impl<T: AttributeValue> DenseAttribute<T> {
    pub fn new(
        name: impl Into<String>,
        default_value: T,
        properties: AttributeProperties,
        nb_elements: Index,
    ) -> Self {
        Self {
            name: name.into(),
            values: vec![default_value.clone(); nb_elements as usize],
            default_value,
            properties,
        }
    }

    /// # Panics
    /// If `element` is out of range.
    #[inline]
    pub fn value(&self, element: Index) -> &T {
        &self.values[element as usize]
    }

    /// # Panics
    /// If `element` is out of range.
    #[inline]
    pub fn set_value(&mut self, element: Index, value: T) {
        self.values[element as usize] = value;
    }

    pub fn try_set_value(&mut self, element: Index, value: T) -> Result<(), MeshError> {
        let len = to_index(self.values.len());
        let slot = self
            .values
            .get_mut(element as usize)
            .ok_or(MeshError::IndexOutOfRange {
                kind: ElementKind::Element,
                index: element,
                len,
            })?;
        *slot = value;
        Ok(())
    }

    /// Read-modify-write of one slot.
    ///
    /// # Panics
    /// If `element` is out of range.
    #[inline]
    pub fn modify_value(&mut self, element: Index, f: impl FnOnce(&mut T)) {
        f(&mut self.values[element as usize]);
    }

    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    pub fn nb_elements(&self) -> Index {
        to_index(self.values.len())
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn properties(&self) -> AttributeProperties {
        self.properties
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

impl<T: AttributeValue> ReadOnlyAttribute<T> for DenseAttribute<T> {
    fn value(&self, element: Index) -> &T {
        DenseAttribute::value(self, element)
    }

    fn default_value(&self) -> &T {
        &self.default_value
    }

    fn nb_values(&self) -> Index {
        self.nb_elements()
    }
}

impl<T: AttributeValue> AttributeBase for DenseAttribute<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn storage(&self) -> AttributeStorage {
        AttributeStorage::Dense
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn value_type_name(&self) -> &'static str {
        T::type_name()
    }

    fn type_tag(&self) -> String {
        type_tag::<T>(AttributeStorage::Dense)
    }

    fn nb_elements(&self) -> Index {
        to_index(self.values.len())
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
        self.values
            .get(element as usize)
            .map_or(0.0, T::converted_value)
    }

    fn generic_item_value(&self, element: Index, item: LocalIndex) -> f32 {
        self.values
            .get(element as usize)
            .map_or(0.0, |v| v.converted_item_value(item))
    }

    fn resize(&mut self, nb_elements: Index) {
        self.values
            .resize(nb_elements as usize, self.default_value.clone());
    }

    fn reserve(&mut self, capacity: Index) {
        let additional = (capacity as usize).saturating_sub(self.values.len());
        self.values.reserve(additional);
    }

    fn delete_elements(&mut self, to_delete: &[bool]) {
        delete_vector_elements(to_delete, &mut self.values);
    }

    fn permute_elements(&mut self, permutation: &[Index]) {
        permute(&mut self.values, permutation);
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
        self.values
            .resize(nb_elements as usize, self.default_value.clone());
        Ok(())
    }

    fn extract(&self, old2new: &[Index], nb_elements: Index) -> Result<AttributeEntry, MeshError> {
        validate_old2new(old2new, self.nb_elements(), nb_elements)?;
        let mut column = self.empty_like(nb_elements);
        for (old, new) in old2new_pairs(old2new) {
            column.values[new as usize] = self.values[old as usize].clone();
        }
        Ok(AttributeEntry::new::<T, _>(column))
    }

    fn extract_mapping(
        &self,
        mapping: &IndexMapping,
        nb_elements: Index,
    ) -> Result<AttributeEntry, MeshError> {
        validate_mapping(mapping, self.nb_elements(), nb_elements)?;
        let mut column = self.empty_like(nb_elements);
        for (input, output) in mapping_pairs(mapping) {
            column.values[output as usize] = self.values[input as usize].clone();
        }
        Ok(AttributeEntry::new::<T, _>(column))
    }

    fn import(&mut self, old2new: &[Index], from: &dyn AttributeBase) -> Result<(), MeshError> {
        let source = typed_source::<T>(from, &self.type_tag())?;
        validate_old2new(old2new, source.nb_values(), self.nb_elements())?;
        for (old, new) in old2new_pairs(old2new) {
            self.values[new as usize] = source.value(old).clone();
        }
        Ok(())
    }

    fn import_mapping(
        &mut self,
        mapping: &IndexMapping,
        from: &dyn AttributeBase,
    ) -> Result<(), MeshError> {
        let source = typed_source::<T>(from, &self.type_tag())?;
        validate_mapping(mapping, source.nb_values(), self.nb_elements())?;
        for (input, output) in mapping_pairs(mapping) {
            self.values[output as usize] = source.value(input).clone();
        }
        Ok(())
    }

    fn copy_value(&mut self, from: Index, to: Index) {
        let value = self.values[from as usize].clone();
        self.values[to as usize] = value;
    }

    fn interpolate_value(&mut self, interpolation: &AttributeLinearInterpolation, to: Index) {
        if !self.properties.interpolable {
            return;
        }
        let value = T::interpolate(interpolation, &|i| self.values[i as usize].clone())
            .unwrap_or_else(|| self.default_value.clone());
        self.values[to as usize] = value;
    }

    fn encode(&self) -> Result<Vec<u8>, MeshError> {
        Ok(bincode::serialize(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::index::NO_ID;

    fn column(values: &[i32]) -> DenseAttribute<i32> {
        let mut c = DenseAttribute::new("test", -1, AttributeProperties::default(), 0);
        c.resize(to_index(values.len()));
        for (i, &v) in values.iter().enumerate() {
            c.set_value(i as Index, v);
        }
        c
    }

    #[test]
    fn growth_fills_default() {
        let mut c = column(&[1, 2]);
        c.resize(4);
        assert_eq!(c.values(), &[1, 2, -1, -1]);
        c.resize(1);
        assert_eq!(c.values(), &[1]);
    }

    #[test]
    fn modify_in_place() {
        let mut c = column(&[1, 2]);
        c.modify_value(1, |v| *v *= 10);
        assert_eq!(*c.value(1), 20);
    }

    #[test]
    fn checked_write() {
        let mut c = column(&[1, 2]);
        c.try_set_value(1, 7).unwrap();
        assert_eq!(c.values(), &[1, 7]);
        assert_eq!(
            c.try_set_value(2, 9),
            Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Element,
                index: 2,
                len: 2
            })
        );
    }

    #[test]
    fn checked_read() {
        let c = column(&[1]);
        assert_eq!(ReadOnlyAttribute::try_value(&c, 0), Ok(&1));
        assert!(ReadOnlyAttribute::try_value(&c, 1).is_err());
        assert_eq!(c.generic_value(5), 0.0);
    }

    #[test]
    fn delete_and_permute() {
        let mut c = column(&[10, 11, 12, 13]);
        c.delete_elements(&[false, true, false, false]);
        assert_eq!(c.values(), &[10, 12, 13]);
        c.permute_elements(&[2, 0, 1]);
        assert_eq!(c.values(), &[13, 10, 12]);
    }

    #[test]
    fn extract_rejects_out_of_bounds() {
        let c = column(&[10, 11, 12]);
        let entry = c.extract(&[NO_ID, 0, 1], 2).unwrap();
        let handle = entry.handle::<DenseAttribute<i32>>().unwrap();
        assert_eq!(handle.read().values(), &[11, 12]);
        assert_eq!(
            c.extract(&[0, 1, 2], 2).err(),
            Some(MeshError::MappingOutOfBounds {
                index: 2,
                nb_elements: 2
            })
        );
    }

    #[test]
    fn interpolation_honours_flag() {
        let mut c = DenseAttribute::new("w", 0.0f64, AttributeProperties::default(), 3);
        c.set_value(0, 2.0);
        c.set_value(1, 4.0);
        let interp = AttributeLinearInterpolation::new(vec![0, 1], vec![0.5, 0.5]).unwrap();
        c.interpolate_value(&interp, 2);
        assert_eq!(*c.value(2), 0.0);
        c.set_properties(AttributeProperties::new(false, true));
        c.interpolate_value(&interp, 2);
        assert_eq!(*c.value(2), 3.0);
    }

    #[test]
    fn default_used_without_rule() {
        let mut c = DenseAttribute::new("i", 7i32, AttributeProperties::new(false, true), 3);
        c.set_value(0, 1);
        let interp = AttributeLinearInterpolation::new(vec![0], vec![1.0]).unwrap();
        c.interpolate_value(&interp, 2);
        assert_eq!(*c.value(2), 7);
    }
}
