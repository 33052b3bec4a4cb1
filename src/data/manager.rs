//! Per-container registry of named, typed attribute columns.
//!
//! Every column is indexed against the same element count. Structural
//! operations validate their input once, then broadcast to every column and
//! finally update the count, so a rejected call leaves the manager untouched.
//!
//! Handles returned by the `find*` methods share the column with the
//! manager. Holding a lock guard on a column while calling a structural
//! operation on its manager deadlocks: release guards first.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::algs::mapping::IndexMapping;
use crate::algs::renumber::{
    mapping_after_deletion, nb_deleted, validate_mask, validate_permutation,
};
use crate::data::attribute::{
    AttributeBase, AttributeEntry, AttributeHandle, AttributeProperties, AttributeReader,
    ReadOnlyAttribute, validate_mapping, validate_old2new,
};
use crate::data::constant::ConstantAttribute;
use crate::data::dense::DenseAttribute;
use crate::data::sparse::SparseAttribute;
use crate::data::value::{AttributeLinearInterpolation, AttributeValue};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::{ElementKind, MeshError};
use crate::topology::index::Index;

/// Reported by [`AttributeManager::attribute_type`] for unknown names.
pub const UNDEFINED_ATTRIBUTE_TYPE: &str = "undefined";

#[derive(Default)]
pub struct AttributeManager {
    nb_elements: Index,
    attributes: HashMap<String, AttributeEntry>,
}

impl fmt::Debug for AttributeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeManager")
            .field("nb_elements", &self.nb_elements)
            .field("attributes", &self.attribute_names())
            .finish()
    }
}

impl Clone for AttributeManager {
    /// Deep copy: the clone owns independent columns.
    fn clone(&self) -> Self {
        let attributes = self
            .attributes
            .iter()
            .map(|(name, entry)| (name.clone(), entry.column().read().clone_entry(name)))
            .collect();
        Self {
            nb_elements: self.nb_elements,
            attributes,
        }
    }
}

impl AttributeManager {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn nb_elements(&self) -> Index {
        self.nb_elements
    }

    // ------------------------------------------------------------------
    // Registration and lookup
    // ------------------------------------------------------------------

    /// Dense column `name`, created with `default_value` if absent.
    ///
    /// Idempotent for the same value type and strategy. A column of another
    /// value type is an error; a column of the same value type stored with
    /// another strategy is replaced unless handles to it are still alive.
    pub fn find_or_create_attribute<T: AttributeValue>(
        &mut self,
        name: &str,
        default_value: T,
        properties: AttributeProperties,
    ) -> Result<AttributeHandle<DenseAttribute<T>>, MeshError> {
        self.find_or_create_with::<T, _>(name, |name, nb| {
            DenseAttribute::new(name, default_value, properties, nb)
        })
    }

    /// Sparse column `name`, created with `default_value` if absent.
    pub fn find_or_create_sparse_attribute<T: AttributeValue + PartialEq>(
        &mut self,
        name: &str,
        default_value: T,
        properties: AttributeProperties,
    ) -> Result<AttributeHandle<SparseAttribute<T>>, MeshError> {
        self.find_or_create_with::<T, _>(name, |name, nb| {
            SparseAttribute::new(name, default_value, properties, nb)
        })
    }

    /// Constant column `name`, created with `value` if absent.
    pub fn find_or_create_constant_attribute<T: AttributeValue>(
        &mut self,
        name: &str,
        value: T,
        properties: AttributeProperties,
    ) -> Result<AttributeHandle<ConstantAttribute<T>>, MeshError> {
        self.find_or_create_with::<T, _>(name, |name, nb| {
            ConstantAttribute::new(name, value, properties, nb)
        })
    }

    fn find_or_create_with<T, C>(
        &mut self,
        name: &str,
        make: impl FnOnce(&str, Index) -> C,
    ) -> Result<AttributeHandle<C>, MeshError>
    where
        T: AttributeValue,
        C: AttributeBase + ReadOnlyAttribute<T> + 'static,
    {
        if let Some(entry) = self.attributes.get(name) {
            if let Some(handle) = entry.handle::<C>() {
                return Ok(handle);
            }
            let found = entry.column().read().type_tag();
            if entry.reader::<T>().is_none() {
                return Err(MeshError::AttributeTypeMismatch {
                    name: name.to_string(),
                    expected: T::type_name().to_string(),
                    found,
                });
            }
            if entry.is_shared() {
                return Err(MeshError::ColumnInUse(name.to_string()));
            }
            log::warn!("attribute `{name}` stored as {found} is replaced");
        }
        let (entry, handle) = AttributeEntry::with_handle::<T, C>(make(name, self.nb_elements));
        log::trace!("register attribute `{name}` ({})", entry.column().read().type_tag());
        self.attributes.insert(name.to_string(), entry);
        Ok(handle)
    }

    /// Handle on column `name` of exact type `C`, creating it if absent.
    ///
    /// Used by containers for their own topology columns: whatever else was
    /// stored under `name` is dropped.
    pub(crate) fn attach_column<T, C>(
        &mut self,
        name: &str,
        make: impl FnOnce(&str, Index) -> C,
    ) -> AttributeHandle<C>
    where
        T: AttributeValue,
        C: AttributeBase + ReadOnlyAttribute<T> + 'static,
    {
        if let Some(handle) = self.attributes.get(name).and_then(AttributeEntry::handle::<C>) {
            return handle;
        }
        if let Some(previous) = self.attributes.get(name) {
            log::warn!(
                "attribute `{name}` stored as {} is replaced",
                previous.column().read().type_tag()
            );
        }
        let (entry, handle) = AttributeEntry::with_handle::<T, C>(make(name, self.nb_elements));
        self.attributes.insert(name.to_string(), entry);
        handle
    }

    /// Register an already built column, replacing any unreferenced one.
    pub(crate) fn register_entry(&mut self, name: &str, entry: AttributeEntry) -> Result<(), MeshError> {
        if self.attributes.get(name).is_some_and(AttributeEntry::is_shared) {
            return Err(MeshError::ColumnInUse(name.to_string()));
        }
        entry.column().write().resize(self.nb_elements);
        self.attributes.insert(name.to_string(), entry);
        Ok(())
    }

    /// Typed read-only access, whatever the storage strategy.
    pub fn find_attribute<T: AttributeValue>(
        &self,
        name: &str,
    ) -> Result<AttributeReader<T>, MeshError> {
        let entry = self.entry(name)?;
        entry
            .reader::<T>()
            .ok_or_else(|| MeshError::AttributeTypeMismatch {
                name: name.to_string(),
                expected: T::type_name().to_string(),
                found: entry.column().read().type_tag(),
            })
    }

    /// Handle on the concrete column type `C`.
    pub fn find_attribute_handle<C: 'static>(
        &self,
        name: &str,
    ) -> Result<AttributeHandle<C>, MeshError> {
        let entry = self.entry(name)?;
        entry
            .handle::<C>()
            .ok_or_else(|| MeshError::AttributeTypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<C>().to_string(),
                found: entry.column().read().type_tag(),
            })
    }

    /// Type-erased access for generic consumers (scalar conversion, export).
    pub fn find_generic_attribute(
        &self,
        name: &str,
    ) -> Result<Arc<RwLock<dyn AttributeBase>>, MeshError> {
        Ok(self.entry(name)?.column().clone())
    }

    fn entry(&self, name: &str) -> Result<&AttributeEntry, MeshError> {
        self.attributes
            .get(name)
            .ok_or_else(|| MeshError::AttributeNotFound(name.to_string()))
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&String, &AttributeEntry)> {
        self.attributes.iter()
    }

    /// Sorted attribute names.
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attributes.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn attribute_exists(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Type tag of `name`, or [`UNDEFINED_ATTRIBUTE_TYPE`].
    pub fn attribute_type(&self, name: &str) -> String {
        self.attributes
            .get(name)
            .map_or_else(
                || UNDEFINED_ATTRIBUTE_TYPE.to_string(),
                |entry| entry.column().read().type_tag(),
            )
    }

    pub fn set_attribute_properties(
        &mut self,
        name: &str,
        properties: AttributeProperties,
    ) -> Result<(), MeshError> {
        self.entry(name)?.column().write().set_properties(properties);
        Ok(())
    }

    pub fn has_assignable_attributes(&self) -> bool {
        self.attributes
            .values()
            .any(|entry| entry.column().read().properties().assignable)
    }

    pub fn has_interpolable_attributes(&self) -> bool {
        self.attributes
            .values()
            .any(|entry| entry.column().read().properties().interpolable)
    }

    /// Unregister `name`. Outstanding handles keep the column alive but
    /// detached from this manager.
    pub fn delete_attribute(&mut self, name: &str) {
        if self.attributes.remove(name).is_some() {
            log::trace!("delete attribute `{name}`");
        }
    }

    /// Remove every column and reset the element count.
    pub fn clear(&mut self) {
        self.attributes.clear();
        self.nb_elements = 0;
    }

    /// Keep the columns but empty them.
    pub fn clear_attributes(&mut self) {
        for entry in self.attributes.values() {
            entry.column().write().resize(0);
        }
        self.nb_elements = 0;
    }

    // ------------------------------------------------------------------
    // Structural broadcasts
    // ------------------------------------------------------------------

    pub fn resize(&mut self, nb_elements: Index) {
        if nb_elements == self.nb_elements {
            return;
        }
        log::debug!(
            "resize {} attributes: {} -> {nb_elements}",
            self.attributes.len(),
            self.nb_elements
        );
        for entry in self.attributes.values() {
            entry.column().write().resize(nb_elements);
        }
        self.nb_elements = nb_elements;
        self.debug_assert_invariants();
    }

    pub fn reserve(&mut self, capacity: Index) {
        if capacity <= self.nb_elements {
            return;
        }
        for entry in self.attributes.values() {
            entry.column().write().reserve(capacity);
        }
    }

    /// Remove masked elements from every column; returns the `old2new` table.
    pub fn delete_elements(&mut self, to_delete: &[bool]) -> Result<Vec<Index>, MeshError> {
        validate_mask(to_delete, self.nb_elements)?;
        let old2new = mapping_after_deletion(to_delete);
        let nb_removed = nb_deleted(to_delete);
        if nb_removed == 0 {
            return Ok(old2new);
        }
        log::debug!(
            "delete {nb_removed}/{} elements in {} attributes",
            self.nb_elements,
            self.attributes.len()
        );
        for entry in self.attributes.values() {
            entry.column().write().delete_elements(to_delete);
        }
        self.nb_elements -= nb_removed;
        self.debug_assert_invariants();
        Ok(old2new)
    }

    /// Reorder every column so that new position `i` holds old `permutation[i]`.
    pub fn permute_elements(&mut self, permutation: &[Index]) -> Result<(), MeshError> {
        validate_permutation(permutation, self.nb_elements)?;
        log::debug!(
            "permute {} elements in {} attributes",
            self.nb_elements,
            self.attributes.len()
        );
        for entry in self.attributes.values() {
            entry.column().write().permute_elements(permutation);
        }
        self.debug_assert_invariants();
        Ok(())
    }

    fn check_element(&self, element: Index) -> Result<(), MeshError> {
        if element >= self.nb_elements {
            return Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Element,
                index: element,
                len: self.nb_elements,
            });
        }
        Ok(())
    }

    /// Copy every column's value of `from` into `to`.
    pub fn copy_attribute_value(&mut self, from: Index, to: Index) -> Result<(), MeshError> {
        self.check_element(from)?;
        self.check_element(to)?;
        for entry in self.attributes.values() {
            entry.column().write().copy_value(from, to);
        }
        Ok(())
    }

    /// Like [`copy_attribute_value`](Self::copy_attribute_value), restricted
    /// to assignable columns.
    pub fn assign_attribute_value(&mut self, from: Index, to: Index) -> Result<(), MeshError> {
        self.check_element(from)?;
        self.check_element(to)?;
        for entry in self.attributes.values() {
            entry.column().write().compute_value(from, to);
        }
        Ok(())
    }

    /// Interpolate `to` in every interpolable column.
    pub fn interpolate_attribute_value(
        &mut self,
        interpolation: &AttributeLinearInterpolation,
        to: Index,
    ) -> Result<(), MeshError> {
        self.check_element(to)?;
        for &source in interpolation.indices() {
            self.check_element(source)?;
        }
        for entry in self.attributes.values() {
            entry.column().write().interpolate_value(interpolation, to);
        }
        Ok(())
    }

    /// Overwrite this manager from `from`.
    ///
    /// Columns present on both sides are copied when their types agree and
    /// skipped with a warning otherwise; columns only in `from` are cloned;
    /// columns only here are resized.
    pub fn copy(&mut self, from: &AttributeManager) {
        self.nb_elements = from.nb_elements;
        for (name, source) in &from.attributes {
            if let Some(entry) = self.attributes.get(name) {
                if Arc::ptr_eq(entry.column(), source.column()) {
                    continue;
                }
                let source = source.column().read();
                if let Err(err) = entry.column().write().copy_from(&*source, from.nb_elements) {
                    log::warn!("attribute `{name}` cannot be copied: {err}");
                }
            } else {
                let entry = source.column().read().clone_entry(name);
                self.attributes.insert(name.clone(), entry);
            }
        }
        for entry in self.attributes.values() {
            let mut column = entry.column().write();
            if column.nb_elements() != self.nb_elements {
                column.resize(self.nb_elements);
            }
        }
        self.debug_assert_invariants();
    }

    // ------------------------------------------------------------------
    // Cross-manager transfer
    // ------------------------------------------------------------------

    /// New manager of `nb_elements` holding transferable columns, with value
    /// `i` placed at `old2new[i]`.
    pub fn extract(
        &self,
        old2new: &[Index],
        nb_elements: Index,
    ) -> Result<AttributeManager, MeshError> {
        validate_old2new(old2new, self.nb_elements, nb_elements)?;
        let mut extracted = AttributeManager {
            nb_elements,
            attributes: HashMap::new(),
        };
        for (name, entry) in self.transferable() {
            let column = entry.column().read().extract(old2new, nb_elements)?;
            extracted.attributes.insert(name.clone(), column);
        }
        log::debug!(
            "extract {} attributes: {} -> {nb_elements} elements",
            extracted.attributes.len(),
            self.nb_elements
        );
        Ok(extracted)
    }

    /// Fan-out variant of [`extract`](Self::extract).
    pub fn extract_mapping(
        &self,
        mapping: &IndexMapping,
        nb_elements: Index,
    ) -> Result<AttributeManager, MeshError> {
        validate_mapping(mapping, self.nb_elements, nb_elements)?;
        let mut extracted = AttributeManager {
            nb_elements,
            attributes: HashMap::new(),
        };
        for (name, entry) in self.transferable() {
            let column = entry.column().read().extract_mapping(mapping, nb_elements)?;
            extracted.attributes.insert(name.clone(), column);
        }
        Ok(extracted)
    }

    /// Merge the transferable columns of `from` into this manager, writing
    /// `from[i]` at `old2new[i]`. Missing columns are created.
    pub fn import(&mut self, old2new: &[Index], from: &AttributeManager) -> Result<(), MeshError> {
        validate_old2new(old2new, from.nb_elements, self.nb_elements)?;
        self.check_importable(from)?;
        for (name, source) in from.transferable() {
            let source = source.column().read();
            match self.attributes.get(name) {
                Some(entry) => entry.column().write().import(old2new, &*source)?,
                None => {
                    let entry = source.extract(old2new, self.nb_elements)?;
                    self.attributes.insert(name.clone(), entry);
                }
            }
        }
        log::debug!(
            "import {} attributes from {} elements",
            from.attributes.len(),
            from.nb_elements
        );
        Ok(())
    }

    /// Fan-out variant of [`import`](Self::import): every output of an input
    /// receives the same value.
    pub fn import_mapping(
        &mut self,
        mapping: &IndexMapping,
        from: &AttributeManager,
    ) -> Result<(), MeshError> {
        validate_mapping(mapping, from.nb_elements, self.nb_elements)?;
        self.check_importable(from)?;
        for (name, source) in from.transferable() {
            let source = source.column().read();
            match self.attributes.get(name) {
                Some(entry) => entry.column().write().import_mapping(mapping, &*source)?,
                None => {
                    let entry = source.extract_mapping(mapping, self.nb_elements)?;
                    self.attributes.insert(name.clone(), entry);
                }
            }
        }
        Ok(())
    }

    fn transferable(&self) -> impl Iterator<Item = (&String, &AttributeEntry)> {
        self.attributes
            .iter()
            .filter(|(_, entry)| entry.column().read().properties().transferable)
    }

    /// Reject imports that would fail half-way: shared columns and columns
    /// whose value types differ.
    fn check_importable(&self, from: &AttributeManager) -> Result<(), MeshError> {
        for (name, source) in from.transferable() {
            let Some(entry) = self.attributes.get(name) else {
                continue;
            };
            if Arc::ptr_eq(entry.column(), source.column()) {
                return Err(MeshError::SelfImport(name.clone()));
            }
            let expected = entry.column().read().value_type_name();
            let found = source.column().read().value_type_name();
            if expected != found {
                return Err(MeshError::AttributeTypeMismatch {
                    name: name.clone(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl DebugInvariants for AttributeManager {
    /// Every column is as long as the manager.
    fn validate_invariants(&self) -> Result<(), MeshError> {
        for (name, entry) in &self.attributes {
            let len = entry.column().read().nb_elements();
            if len != self.nb_elements {
                return Err(MeshError::ColumnLengthMismatch {
                    name: name.clone(),
                    expected: self.nb_elements,
                    found: len,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::index::NO_ID;

    #[test]
    fn find_or_create_is_idempotent() {
        let mut manager = AttributeManager::new();
        manager.resize(3);
        let a = manager
            .find_or_create_attribute("w", 1.0f64, AttributeProperties::default())
            .unwrap();
        a.write().set_value(2, 5.0);
        let b = manager
            .find_or_create_attribute("w", 0.0f64, AttributeProperties::default())
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*b.read().value(2), 5.0);
        assert_eq!(*b.read().value(0), 1.0);
    }

    #[test]
    fn other_value_type_is_rejected() {
        let mut manager = AttributeManager::new();
        manager
            .find_or_create_attribute("w", 1.0f64, AttributeProperties::default())
            .unwrap();
        let err = manager
            .find_or_create_attribute("w", 1i32, AttributeProperties::default())
            .unwrap_err();
        assert!(matches!(err, MeshError::AttributeTypeMismatch { .. }));
    }

    #[test]
    fn other_strategy_replaced_only_when_unreferenced() {
        let mut manager = AttributeManager::new();
        let dense = manager
            .find_or_create_attribute("w", 1i32, AttributeProperties::default())
            .unwrap();
        assert_eq!(
            manager
                .find_or_create_sparse_attribute("w", 1i32, AttributeProperties::default())
                .unwrap_err(),
            MeshError::ColumnInUse("w".to_string())
        );
        drop(dense);
        manager
            .find_or_create_sparse_attribute("w", 1i32, AttributeProperties::default())
            .unwrap();
        assert_eq!(manager.attribute_type("w"), "Sparse<i32>");
    }

    #[test]
    fn reader_sees_any_strategy() {
        let mut manager = AttributeManager::new();
        manager.resize(2);
        let sparse = manager
            .find_or_create_sparse_attribute("s", 0u32, AttributeProperties::default())
            .unwrap();
        sparse.write().set_value(1, 9);
        let reader = manager.find_attribute::<u32>("s").unwrap();
        assert_eq!(*reader.read().value(1), 9);
        assert!(manager.find_attribute::<f64>("s").is_err());
        assert_eq!(
            manager.find_attribute::<u32>("nope").err(),
            Some(MeshError::AttributeNotFound("nope".to_string()))
        );
    }

    #[test]
    fn delete_returns_old2new() {
        let mut manager = AttributeManager::new();
        manager.resize(4);
        let a = manager
            .find_or_create_attribute("a", 0i32, AttributeProperties::default())
            .unwrap();
        for i in 0..4 {
            a.write().set_value(i, i as i32);
        }
        let old2new = manager.delete_elements(&[false, true, true, false]).unwrap();
        assert_eq!(old2new, vec![0, NO_ID, NO_ID, 1]);
        assert_eq!(manager.nb_elements(), 2);
        assert_eq!(a.read().values(), &[0, 3]);
    }

    #[test]
    fn rejected_mask_leaves_manager_untouched() {
        let mut manager = AttributeManager::new();
        manager.resize(3);
        assert!(manager.delete_elements(&[true]).is_err());
        assert!(manager.permute_elements(&[0, 0, 1]).is_err());
        assert_eq!(manager.nb_elements(), 3);
    }

    #[test]
    fn assign_respects_flag_copy_does_not() {
        let mut manager = AttributeManager::new();
        manager.resize(2);
        let plain = manager
            .find_or_create_attribute("plain", 0i32, AttributeProperties::default())
            .unwrap();
        let assignable = manager
            .find_or_create_attribute("assignable", 0i32, AttributeProperties::new(true, false))
            .unwrap();
        plain.write().set_value(0, 4);
        assignable.write().set_value(0, 4);
        manager.assign_attribute_value(0, 1).unwrap();
        assert_eq!(*plain.read().value(1), 0);
        assert_eq!(*assignable.read().value(1), 4);
        manager.copy_attribute_value(0, 1).unwrap();
        assert_eq!(*plain.read().value(1), 4);
        assert!(manager.copy_attribute_value(0, 2).is_err());
    }

    #[test]
    fn clone_is_deep() {
        let mut manager = AttributeManager::new();
        manager.resize(1);
        let a = manager
            .find_or_create_attribute("a", 0i32, AttributeProperties::default())
            .unwrap();
        let copy = manager.clone();
        a.write().set_value(0, 3);
        let b = copy.find_attribute::<i32>("a").unwrap();
        assert_eq!(*b.read().value(0), 0);
    }

    #[test]
    fn import_creates_missing_columns() {
        let mut source = AttributeManager::new();
        source.resize(2);
        let a = source
            .find_or_create_attribute("a", 0i32, AttributeProperties::default())
            .unwrap();
        a.write().set_value(1, 8);
        let mut target = AttributeManager::new();
        target.resize(3);
        target.import(&[NO_ID, 2], &source).unwrap();
        let b = target.find_attribute::<i32>("a").unwrap();
        assert_eq!(*b.read().value(2), 8);
        assert_eq!(b.read().nb_values(), 3);
    }

    #[test]
    fn non_transferable_columns_stay_behind() {
        let mut manager = AttributeManager::new();
        manager.resize(2);
        manager
            .find_or_create_attribute(
                "local",
                0i32,
                AttributeProperties::default().with_transferable(false),
            )
            .unwrap();
        let extracted = manager.extract(&[0, 1], 2).unwrap();
        assert!(!extracted.attribute_exists("local"));
    }

    #[test]
    fn copy_skips_mismatched_types() {
        let mut from = AttributeManager::new();
        from.resize(2);
        from.find_or_create_attribute("x", 1i32, AttributeProperties::default())
            .unwrap();
        from.find_or_create_attribute("y", 2u8, AttributeProperties::default())
            .unwrap();
        let mut to = AttributeManager::new();
        to.find_or_create_attribute("x", 0.5f64, AttributeProperties::default())
            .unwrap();
        to.copy(&from);
        assert_eq!(to.nb_elements(), 2);
        assert_eq!(to.attribute_type("x"), "Dense<f64>");
        assert_eq!(to.attribute_type("y"), "Dense<u8>");
        assert_eq!(to.attribute_type("z"), UNDEFINED_ATTRIBUTE_TYPE);
        to.validate_invariants().unwrap();
    }
}
