//! Serialization callbacks for attribute managers.
//!
//! Each column encodes its own field set with `bincode` and is tagged with
//! `"<Strategy><<value type>>"`. Loading dispatches on that tag through an
//! [`AttributeTypeRegistry`]; the default registry covers every value type
//! this crate implements [`AttributeValue`] for.

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::data::attribute::{
    AttributeBase, AttributeEntry, AttributeStorage, ReadOnlyAttribute, type_tag,
};
use crate::data::constant::ConstantAttribute;
use crate::data::dense::DenseAttribute;
use crate::data::manager::AttributeManager;
use crate::data::sparse::SparseAttribute;
use crate::data::value::AttributeValue;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::PolyhedronKind;
use crate::topology::index::Index;
use crate::topology::local::{
    PolygonEdge, PolygonVertex, PolyhedronFacet, PolyhedronFacetVertex, PolyhedronVertex,
};

/// Layout version written by [`AttributeManager::save`].
pub const ATTRIBUTE_ARCHIVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnArchive {
    pub name: String,
    pub type_tag: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerArchive {
    pub version: u32,
    pub nb_elements: Index,
    /// Sorted by name.
    pub columns: Vec<ColumnArchive>,
}

impl ManagerArchive {
    pub fn to_bytes(&self) -> Result<Vec<u8>, MeshError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MeshError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

type Decoder = fn(&[u8]) -> Result<AttributeEntry, MeshError>;

fn decode<T, C>(bytes: &[u8]) -> Result<AttributeEntry, MeshError>
where
    T: AttributeValue,
    C: AttributeBase + ReadOnlyAttribute<T> + DeserializeOwned + 'static,
{
    let column: C = bincode::deserialize(bytes)?;
    Ok(AttributeEntry::new::<T, C>(column))
}

/// Type tag → column decoder table.
#[derive(Default, Clone)]
pub struct AttributeTypeRegistry {
    decoders: HashMap<String, Decoder>,
}

static DEFAULT_REGISTRY: Lazy<AttributeTypeRegistry> = Lazy::new(|| {
    let mut registry = AttributeTypeRegistry::new();
    registry
        .register::<bool>()
        .register::<i8>()
        .register::<u8>()
        .register::<i16>()
        .register::<u16>()
        .register::<i32>()
        .register::<u32>()
        .register::<i64>()
        .register::<u64>()
        .register::<usize>()
        .register::<isize>()
        .register::<f32>()
        .register::<f64>()
        .register::<[f32; 2]>()
        .register::<[f32; 3]>()
        .register::<[f32; 4]>()
        .register::<[f64; 2]>()
        .register::<[f64; 3]>()
        .register::<[f64; 4]>()
        .register::<[Index; 2]>()
        .register::<[Index; 3]>()
        .register::<[Index; 4]>()
        .register::<String>()
        .register::<Vec<Index>>()
        .register::<Vec<f64>>()
        .register::<Vec<Vec<Index>>>()
        .register::<PolyhedronKind>()
        .register::<PolygonVertex>()
        .register::<PolygonEdge>()
        .register::<PolyhedronVertex>()
        .register::<PolyhedronFacet>()
        .register::<PolyhedronFacetVertex>()
        .register::<Vec<PolygonVertex>>()
        .register::<Vec<PolyhedronVertex>>();
    log::trace!("default attribute registry: {} tags", registry.len());
    registry
});

impl AttributeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering the crate's own value types.
    pub fn global() -> &'static AttributeTypeRegistry {
        &DEFAULT_REGISTRY
    }

    /// Register the three strategies for `T`.
    pub fn register<T: AttributeValue + PartialEq>(&mut self) -> &mut Self {
        self.register_dense::<T>();
        self.decoders.insert(
            type_tag::<T>(AttributeStorage::Sparse),
            decode::<T, SparseAttribute<T>>,
        );
        self
    }

    /// Register dense and constant strategies for a type without equality.
    pub fn register_dense<T: AttributeValue>(&mut self) -> &mut Self {
        self.decoders.insert(
            type_tag::<T>(AttributeStorage::Dense),
            decode::<T, DenseAttribute<T>>,
        );
        self.decoders.insert(
            type_tag::<T>(AttributeStorage::Constant),
            decode::<T, ConstantAttribute<T>>,
        );
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub fn decode(&self, tag: &str, bytes: &[u8]) -> Result<AttributeEntry, MeshError> {
        let decoder = self
            .decoders
            .get(tag)
            .ok_or_else(|| MeshError::UnknownAttributeType(tag.to_string()))?;
        decoder(bytes)
    }
}

impl AttributeManager {
    /// Snapshot of the element count and every column.
    pub fn save(&self) -> Result<ManagerArchive, MeshError> {
        let mut columns = self
            .entries()
            .map(|(name, entry)| {
                let column = entry.column().read();
                Ok(ColumnArchive {
                    name: name.clone(),
                    type_tag: column.type_tag(),
                    bytes: column.encode()?,
                })
            })
            .collect::<Result<Vec<_>, MeshError>>()?;
        columns.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        Ok(ManagerArchive {
            version: ATTRIBUTE_ARCHIVE_VERSION,
            nb_elements: self.nb_elements(),
            columns,
        })
    }

    /// Rebuild a manager from `archive`, resolving column types in `registry`.
    pub fn load(
        archive: &ManagerArchive,
        registry: &AttributeTypeRegistry,
    ) -> Result<Self, MeshError> {
        if archive.version != ATTRIBUTE_ARCHIVE_VERSION {
            return Err(MeshError::UnsupportedArchiveVersion {
                found: archive.version,
                supported: ATTRIBUTE_ARCHIVE_VERSION,
            });
        }
        let mut manager = AttributeManager::new();
        manager.resize(archive.nb_elements);
        for column in &archive.columns {
            let entry = registry.decode(&column.type_tag, &column.bytes)?;
            let found = entry.column().read().nb_elements();
            if found != archive.nb_elements {
                return Err(MeshError::ColumnLengthMismatch {
                    name: column.name.clone(),
                    expected: archive.nb_elements,
                    found,
                });
            }
            manager.register_entry(&column.name, entry)?;
        }
        log::debug!(
            "loaded {} attributes over {} elements",
            archive.columns.len(),
            archive.nb_elements
        );
        Ok(manager)
    }
}
