//! Constant column: one value shared by every element.
//!
//! Structural hooks only track the element count.

use std::any::Any;
use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use crate::algs::mapping::IndexMapping;
use crate::algs::renumber::nb_deleted;
use crate::data::attribute::{
    AttributeBase, AttributeEntry, AttributeProperties, AttributeStorage, ReadOnlyAttribute,
    type_tag, typed_source, validate_mapping, validate_old2new,
};
use crate::data::value::{AttributeLinearInterpolation, AttributeValue};
use crate::mesh_error::MeshError;
use crate::topology::index::{Index, LocalIndex};

#[derive(Clone, Serialize, Deserialize)]
pub struct ConstantAttribute<T> {
    name: String,
    value: T,
    nb_elements: Index,
    properties: AttributeProperties,
}

impl<T> Debug for ConstantAttribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantAttribute")
            .field("name", &self.name)
            .field("nb_elements", &self.nb_elements)
            .finish()
    }
}

impl<T: AttributeValue> ConstantAttribute<T> {
    pub fn new(
        name: impl Into<String>,
        value: T,
        properties: AttributeProperties,
        nb_elements: Index,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            nb_elements,
            properties,
        }
    }

    /// The shared value, whatever `element` is.
    #[inline]
    pub fn value(&self, _element: Index) -> &T {
        &self.value
    }

    pub fn constant_value(&self) -> &T {
        &self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    pub fn modify_value(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
    }

    pub fn nb_elements(&self) -> Index {
        self.nb_elements
    }

    fn with_count(&self, nb_elements: Index) -> Self {
        Self {
            nb_elements,
            ..self.clone()
        }
    }
}

impl<T: AttributeValue> ReadOnlyAttribute<T> for ConstantAttribute<T> {
    fn value(&self, _element: Index) -> &T {
        &self.value
    }

    fn default_value(&self) -> &T {
        &self.value
    }

    fn nb_values(&self) -> Index {
        self.nb_elements
    }
}

impl<T: AttributeValue> AttributeBase for ConstantAttribute<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn storage(&self) -> AttributeStorage {
        AttributeStorage::Constant
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn value_type_name(&self) -> &'static str {
        T::type_name()
    }

    fn type_tag(&self) -> String {
        type_tag::<T>(AttributeStorage::Constant)
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

    fn generic_value(&self, _element: Index) -> f32 {
        self.value.converted_value()
    }

    fn generic_item_value(&self, _element: Index, item: LocalIndex) -> f32 {
        self.value.converted_item_value(item)
    }

    fn resize(&mut self, nb_elements: Index) {
        self.nb_elements = nb_elements;
    }

    fn reserve(&mut self, _capacity: Index) {}

    fn delete_elements(&mut self, to_delete: &[bool]) {
        self.nb_elements -= nb_deleted(to_delete);
    }

    fn permute_elements(&mut self, _permutation: &[Index]) {}

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
        self.value = source.value.clone();
        self.properties = source.properties;
        self.nb_elements = nb_elements;
        Ok(())
    }

    fn extract(&self, old2new: &[Index], nb_elements: Index) -> Result<AttributeEntry, MeshError> {
        validate_old2new(old2new, self.nb_elements, nb_elements)?;
        Ok(AttributeEntry::new::<T, _>(self.with_count(nb_elements)))
    }

    fn extract_mapping(
        &self,
        mapping: &IndexMapping,
        nb_elements: Index,
    ) -> Result<AttributeEntry, MeshError> {
        validate_mapping(mapping, self.nb_elements, nb_elements)?;
        Ok(AttributeEntry::new::<T, _>(self.with_count(nb_elements)))
    }

    /// Imported values cannot differ per element; only the mapping is checked.
    fn import(&mut self, old2new: &[Index], from: &dyn AttributeBase) -> Result<(), MeshError> {
        let source = typed_source::<T>(from, &self.type_tag())?;
        validate_old2new(old2new, source.nb_values(), self.nb_elements)
    }

    fn import_mapping(
        &mut self,
        mapping: &IndexMapping,
        from: &dyn AttributeBase,
    ) -> Result<(), MeshError> {
        let source = typed_source::<T>(from, &self.type_tag())?;
        validate_mapping(mapping, source.nb_values(), self.nb_elements)
    }

    fn copy_value(&mut self, _from: Index, _to: Index) {}

    fn interpolate_value(&mut self, _interpolation: &AttributeLinearInterpolation, _to: Index) {}

    fn encode(&self) -> Result<Vec<u8>, MeshError> {
        Ok(bincode::serialize(self)?)
    }
}
