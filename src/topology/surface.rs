//! Polygonal surface meshes.
//!
//! Topology is stored as attribute columns so it shares the lifecycle of
//! every user attribute:
//! - polygon manager: [`POLYGON_VERTICES_ATTRIBUTE`] (ordered vertex list)
//!   and [`POLYGON_ADJACENTS_ATTRIBUTE`] (one entry per edge, `NO_ID` on
//!   border);
//! - vertex manager: [`POLYGON_AROUND_VERTEX_ATTRIBUTE`] (representative
//!   corner of each vertex) and the point column.
//!
//! Edge `k` of a polygon goes from its local vertex `k` to `k + 1`, cyclic.
//! Two polygons are adjacent through an edge when they run along it in
//! opposite directions.
//!
//! All mutation goes through [`SurfaceMeshBuilder`](crate::topology::surface_builder::SurfaceMeshBuilder).

use std::fmt;

use hashbrown::HashSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::algs::parallel::try_map_elements;
use crate::data::archive::{AttributeTypeRegistry, ManagerArchive};
use crate::data::attribute::{AttributeHandle, AttributeProperties};
use crate::data::dense::DenseAttribute;
use crate::data::manager::AttributeManager;
use crate::data::value::AttributeValue;
use crate::geometry::metrics;
use crate::mesh_error::{ElementKind, MeshError};
use crate::topology::coordinates::Coordinates;
use crate::topology::index::{Index, LocalIndex, NO_ID, to_index};
use crate::topology::local::{PolygonEdge, PolygonVertex};
use crate::topology::vertex_set::VertexSet;

pub const POLYGON_VERTICES_ATTRIBUTE: &str = "polygon_vertices";
pub const POLYGON_ADJACENTS_ATTRIBUTE: &str = "polygon_adjacents";
pub const POLYGON_AROUND_VERTEX_ATTRIBUTE: &str = "polygon_around_vertex";

/// Layout version written by [`SurfaceMesh::save`].
pub const SURFACE_ARCHIVE_VERSION: u32 = 1;

pub(crate) type IndexListColumn = DenseAttribute<Vec<Index>>;

pub(crate) fn topology_properties() -> AttributeProperties {
    AttributeProperties::default().with_transferable(false)
}

pub(crate) fn attach_index_lists(
    manager: &mut AttributeManager,
    name: &str,
) -> AttributeHandle<IndexListColumn> {
    manager.attach_column::<Vec<Index>, _>(name, |name, nb| {
        DenseAttribute::new(name, Vec::new(), topology_properties(), nb)
    })
}

pub struct SurfaceMesh<const D: usize> {
    pub(crate) vertices: VertexSet,
    pub(crate) polygon_attributes: AttributeManager,
    pub(crate) coordinates: Coordinates<D>,
    pub(crate) polygon_vertices: AttributeHandle<IndexListColumn>,
    pub(crate) polygon_adjacents: AttributeHandle<IndexListColumn>,
    pub(crate) polygon_around_vertex: AttributeHandle<DenseAttribute<PolygonVertex>>,
}

pub type SurfaceMesh2D = SurfaceMesh<2>;
pub type SurfaceMesh3D = SurfaceMesh<3>;

impl<const D: usize> fmt::Debug for SurfaceMesh<D>
where
    [f64; D]: AttributeValue,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceMesh")
            .field("dimension", &D)
            .field("nb_vertices", &self.nb_vertices())
            .field("nb_polygons", &self.nb_polygons())
            .finish()
    }
}

impl<const D: usize> Default for SurfaceMesh<D>
where
    [f64; D]: AttributeValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> Clone for SurfaceMesh<D>
where
    [f64; D]: AttributeValue,
{
    /// Deep copy: the clone owns independent columns.
    fn clone(&self) -> Self {
        Self::from_managers(
            self.vertices.vertex_attribute_manager().clone(),
            self.polygon_attributes.clone(),
        )
    }
}

impl<const D: usize> SurfaceMesh<D>
where
    [f64; D]: AttributeValue,
{
    pub fn new() -> Self {
        Self::from_managers(AttributeManager::new(), AttributeManager::new())
    }

    fn from_managers(mut vertices: AttributeManager, mut polygons: AttributeManager) -> Self {
        let coordinates = Coordinates::attach(&mut vertices);
        let polygon_around_vertex = vertices
            .attach_column::<PolygonVertex, _>(POLYGON_AROUND_VERTEX_ATTRIBUTE, |name, nb| {
                DenseAttribute::new(name, PolygonVertex::default(), topology_properties(), nb)
            });
        let polygon_vertices = attach_index_lists(&mut polygons, POLYGON_VERTICES_ATTRIBUTE);
        let polygon_adjacents = attach_index_lists(&mut polygons, POLYGON_ADJACENTS_ATTRIBUTE);
        Self {
            vertices: VertexSet::from_manager(vertices),
            polygon_attributes: polygons,
            coordinates,
            polygon_vertices,
            polygon_adjacents,
            polygon_around_vertex,
        }
    }

    /// Archive type name, `"SurfaceMesh2D"` or `"SurfaceMesh3D"`.
    pub fn type_name() -> String {
        format!("SurfaceMesh{D}D")
    }

    // ------------------------------------------------------------------
    // Counts and managers
    // ------------------------------------------------------------------

    #[inline]
    pub fn nb_vertices(&self) -> Index {
        self.vertices.nb_vertices()
    }

    #[inline]
    pub fn nb_polygons(&self) -> Index {
        self.polygon_attributes.nb_elements()
    }

    pub fn vertex_attribute_manager(&self) -> &AttributeManager {
        self.vertices.vertex_attribute_manager()
    }

    /// For registering user columns; structural calls belong to the builder.
    pub fn vertex_attribute_manager_mut(&mut self) -> &mut AttributeManager {
        self.vertices.vertex_attribute_manager_mut()
    }

    pub fn polygon_attribute_manager(&self) -> &AttributeManager {
        &self.polygon_attributes
    }

    /// For registering user columns; structural calls belong to the builder.
    pub fn polygon_attribute_manager_mut(&mut self) -> &mut AttributeManager {
        &mut self.polygon_attributes
    }

    pub fn coordinates(&self) -> &Coordinates<D> {
        &self.coordinates
    }

    pub fn point(&self, vertex: Index) -> Result<[f64; D], MeshError> {
        self.coordinates.point(vertex)
    }

    // ------------------------------------------------------------------
    // Polygon queries
    // ------------------------------------------------------------------

    pub(crate) fn check_vertex(&self, vertex: Index) -> Result<(), MeshError> {
        self.vertices.check_vertex(vertex)
    }

    pub(crate) fn check_polygon(&self, polygon: Index) -> Result<(), MeshError> {
        if polygon >= self.nb_polygons() {
            return Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Polygon,
                index: polygon,
                len: self.nb_polygons(),
            });
        }
        Ok(())
    }

    /// Entry `local` of a per-polygon index list.
    fn polygon_slot(
        &self,
        column: &AttributeHandle<IndexListColumn>,
        polygon: Index,
        local: LocalIndex,
    ) -> Result<Index, MeshError> {
        self.check_polygon(polygon)?;
        let column = column.read();
        let list = column.value(polygon);
        list.get(local as usize)
            .copied()
            .ok_or(MeshError::LocalIndexOutOfRange {
                kind: ElementKind::Polygon,
                element: polygon,
                local,
                len: to_index(list.len()),
            })
    }

    pub fn nb_polygon_vertices(&self, polygon: Index) -> Result<LocalIndex, MeshError> {
        self.check_polygon(polygon)?;
        Ok(to_index(self.polygon_vertices.read().value(polygon).len()))
    }

    pub fn nb_polygon_edges(&self, polygon: Index) -> Result<LocalIndex, MeshError> {
        self.nb_polygon_vertices(polygon)
    }

    pub fn polygon_vertex(&self, polygon_vertex: PolygonVertex) -> Result<Index, MeshError> {
        self.polygon_slot(
            &self.polygon_vertices,
            polygon_vertex.polygon_id,
            polygon_vertex.vertex_id,
        )
    }

    pub fn polygon_vertices(&self, polygon: Index) -> Result<Vec<Index>, MeshError> {
        self.check_polygon(polygon)?;
        Ok(self.polygon_vertices.read().value(polygon).clone())
    }

    /// Vertex `vertex` (0 = start, 1 = end) of `edge`.
    pub fn polygon_edge_vertex(
        &self,
        edge: PolygonEdge,
        vertex: LocalIndex,
    ) -> Result<Index, MeshError> {
        let start = PolygonVertex::from(edge);
        match vertex {
            0 => self.polygon_vertex(start),
            1 => self.polygon_vertex(self.next_polygon_vertex(start)?),
            _ => Err(MeshError::LocalIndexOutOfRange {
                kind: ElementKind::Polygon,
                element: edge.polygon_id,
                local: vertex,
                len: 2,
            }),
        }
    }

    pub fn polygon_edge_vertices(&self, edge: PolygonEdge) -> Result<[Index; 2], MeshError> {
        Ok([
            self.polygon_edge_vertex(edge, 0)?,
            self.polygon_edge_vertex(edge, 1)?,
        ])
    }

    fn checked_size(&self, polygon: Index, local: LocalIndex) -> Result<LocalIndex, MeshError> {
        let nb = self.nb_polygon_vertices(polygon)?;
        if local >= nb {
            return Err(MeshError::LocalIndexOutOfRange {
                kind: ElementKind::Polygon,
                element: polygon,
                local,
                len: nb,
            });
        }
        Ok(nb)
    }

    pub fn next_polygon_vertex(
        &self,
        polygon_vertex: PolygonVertex,
    ) -> Result<PolygonVertex, MeshError> {
        let nb = self.checked_size(polygon_vertex.polygon_id, polygon_vertex.vertex_id)?;
        Ok(PolygonVertex::new(
            polygon_vertex.polygon_id,
            (polygon_vertex.vertex_id + 1) % nb,
        ))
    }

    pub fn previous_polygon_vertex(
        &self,
        polygon_vertex: PolygonVertex,
    ) -> Result<PolygonVertex, MeshError> {
        let nb = self.checked_size(polygon_vertex.polygon_id, polygon_vertex.vertex_id)?;
        Ok(PolygonVertex::new(
            polygon_vertex.polygon_id,
            (polygon_vertex.vertex_id + nb - 1) % nb,
        ))
    }

    pub fn next_polygon_edge(&self, edge: PolygonEdge) -> Result<PolygonEdge, MeshError> {
        Ok(self.next_polygon_vertex(edge.into())?.into())
    }

    pub fn previous_polygon_edge(&self, edge: PolygonEdge) -> Result<PolygonEdge, MeshError> {
        Ok(self.previous_polygon_vertex(edge.into())?.into())
    }

    /// Polygon on the other side of `edge`, `None` on border.
    pub fn polygon_adjacent(&self, edge: PolygonEdge) -> Result<Option<Index>, MeshError> {
        let adjacent = self.polygon_slot(&self.polygon_adjacents, edge.polygon_id, edge.edge_id)?;
        Ok((adjacent != NO_ID).then_some(adjacent))
    }

    /// The adjacent polygon's edge running along `edge` in the opposite
    /// direction, `None` on border.
    pub fn polygon_adjacent_edge(
        &self,
        edge: PolygonEdge,
    ) -> Result<Option<PolygonEdge>, MeshError> {
        let Some(adjacent) = self.polygon_adjacent(edge)? else {
            return Ok(None);
        };
        let [v0, v1] = self.polygon_edge_vertices(edge)?;
        let others = self.polygon_vertices(adjacent)?;
        let nb = others.len();
        (0..nb)
            .find(|&e| others[e] == v1 && others[(e + 1) % nb] == v0)
            .map(|e| Some(PolygonEdge::new(adjacent, to_index(e))))
            .ok_or(MeshError::InconsistentAdjacency {
                kind: ElementKind::Polygon,
                element: edge.polygon_id,
                adjacent,
            })
    }

    pub fn is_edge_on_border(&self, edge: PolygonEdge) -> Result<bool, MeshError> {
        Ok(self.polygon_adjacent(edge)?.is_none())
    }

    pub fn polygon_edges_on_border(&self, polygon: Index) -> Result<Vec<PolygonEdge>, MeshError> {
        self.check_polygon(polygon)?;
        let adjacents = self.polygon_adjacents.read();
        Ok(adjacents
            .value(polygon)
            .iter()
            .enumerate()
            .filter(|&(_, &adjacent)| adjacent == NO_ID)
            .map(|(e, _)| PolygonEdge::new(polygon, to_index(e)))
            .collect())
    }

    fn check_on_border(&self, edge: PolygonEdge) -> Result<(), MeshError> {
        if !self.is_edge_on_border(edge)? {
            return Err(MeshError::NotOnBorder {
                kind: ElementKind::Polygon,
                element: edge.polygon_id,
                local: edge.edge_id,
            });
        }
        Ok(())
    }

    /// Border edge starting where the border edge `edge` ends.
    ///
    /// Turns around the end vertex through adjacent polygons until a border
    /// edge is found.
    pub fn next_on_border(&self, edge: PolygonEdge) -> Result<PolygonEdge, MeshError> {
        self.check_on_border(edge)?;
        let mut next = self.next_polygon_edge(edge)?;
        for _ in 0..=self.nb_polygons() {
            match self.polygon_adjacent_edge(next)? {
                None => return Ok(next),
                Some(adjacent) => next = self.next_polygon_edge(adjacent)?,
            }
        }
        Err(MeshError::InconsistentAdjacency {
            kind: ElementKind::Polygon,
            element: edge.polygon_id,
            adjacent: next.polygon_id,
        })
    }

    /// Border edge ending where the border edge `edge` starts.
    pub fn previous_on_border(&self, edge: PolygonEdge) -> Result<PolygonEdge, MeshError> {
        self.check_on_border(edge)?;
        let mut previous = self.previous_polygon_edge(edge)?;
        for _ in 0..=self.nb_polygons() {
            match self.polygon_adjacent_edge(previous)? {
                None => return Ok(previous),
                Some(adjacent) => previous = self.previous_polygon_edge(adjacent)?,
            }
        }
        Err(MeshError::InconsistentAdjacency {
            kind: ElementKind::Polygon,
            element: edge.polygon_id,
            adjacent: previous.polygon_id,
        })
    }

    // ------------------------------------------------------------------
    // Vertex to polygon queries
    // ------------------------------------------------------------------

    /// Representative corner of `vertex`, `None` for an isolated vertex.
    pub fn polygon_around_vertex(&self, vertex: Index) -> Result<Option<PolygonVertex>, MeshError> {
        self.check_vertex(vertex)?;
        let corner = *self.polygon_around_vertex.read().value(vertex);
        Ok(corner.is_defined().then_some(corner))
    }

    /// Every corner reachable from the representative of `vertex` by
    /// crossing adjacent edges.
    ///
    /// The walk turns forward until it closes or hits the border, then
    /// backward from the representative.
    pub fn polygons_around_vertex(&self, vertex: Index) -> Result<Vec<PolygonVertex>, MeshError> {
        let Some(first) = self.polygon_around_vertex(vertex)? else {
            return Ok(Vec::new());
        };
        let mut corners = vec![first];
        let mut visited = HashSet::new();
        visited.insert(first);

        let mut current = first;
        loop {
            let Some(adjacent) = self.polygon_adjacent_edge(current.into())? else {
                break;
            };
            current = self.next_polygon_vertex(adjacent.into())?;
            if current == first {
                return Ok(corners);
            }
            if !visited.insert(current) {
                return Err(self.broken_walk(vertex, current));
            }
            corners.push(current);
        }

        current = first;
        loop {
            let previous = self.previous_polygon_edge(current.into())?;
            let Some(adjacent) = self.polygon_adjacent_edge(previous)? else {
                break;
            };
            current = adjacent.into();
            if !visited.insert(current) {
                return Err(self.broken_walk(vertex, current));
            }
            corners.push(current);
        }
        Ok(corners)
    }

    fn broken_walk(&self, vertex: Index, corner: PolygonVertex) -> MeshError {
        log::warn!("adjacency walk around vertex {vertex} loops at polygon {}", corner.polygon_id);
        MeshError::InconsistentAdjacency {
            kind: ElementKind::Polygon,
            element: corner.polygon_id,
            adjacent: vertex,
        }
    }

    /// Every corner of every polygon, grouped by vertex. One full scan.
    pub fn vertex_polygon_multimap(&self) -> Vec<Vec<PolygonVertex>> {
        let mut map = vec![Vec::new(); self.nb_vertices() as usize];
        let lists = self.polygon_vertices.read();
        for (polygon, list) in lists.values().iter().enumerate() {
            for (local, &vertex) in list.iter().enumerate() {
                if let Some(corners) = map.get_mut(vertex as usize) {
                    corners.push(PolygonVertex::new(to_index(polygon), to_index(local)));
                }
            }
        }
        map
    }

    /// Edge going from `from` to `to`, searched around `from`.
    pub fn polygon_edge_from_vertices(
        &self,
        from: Index,
        to: Index,
    ) -> Result<Option<PolygonEdge>, MeshError> {
        self.check_vertex(to)?;
        for corner in self.polygons_around_vertex(from)? {
            if self.polygon_vertex(self.next_polygon_vertex(corner)?)? == to {
                return Ok(Some(corner.into()));
            }
        }
        Ok(None)
    }

    pub fn isolated_vertex(&self, vertex: Index) -> Result<bool, MeshError> {
        Ok(self.polygon_around_vertex(vertex)?.is_none())
    }

    /// Local index of `vertex` in `polygon`, if it is one of its corners.
    pub fn vertex_in_polygon(
        &self,
        polygon: Index,
        vertex: Index,
    ) -> Result<Option<LocalIndex>, MeshError> {
        self.check_polygon(polygon)?;
        let lists = self.polygon_vertices.read();
        Ok(lists
            .value(polygon)
            .iter()
            .position(|&v| v == vertex)
            .map(to_index))
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    fn polygon_points(&self, polygon: Index) -> Result<Vec<[f64; D]>, MeshError> {
        self.coordinates.gather(&self.polygon_vertices(polygon)?)
    }

    pub fn polygon_barycenter(&self, polygon: Index) -> Result<[f64; D], MeshError> {
        Ok(metrics::barycenter(&self.polygon_points(polygon)?))
    }

    /// Barycenter of every polygon, computed element-parallel.
    pub fn polygon_barycenters(&self) -> Result<Vec<[f64; D]>, MeshError> {
        try_map_elements(self.nb_polygons(), |polygon| self.polygon_barycenter(polygon))
    }

    pub fn edge_length(&self, edge: PolygonEdge) -> Result<f64, MeshError> {
        let [v0, v1] = self.polygon_edge_vertices(edge)?;
        Ok(metrics::distance(&self.point(v0)?, &self.point(v1)?))
    }

    /// Bounding box of all points, `None` without vertices.
    pub fn bounding_box(&self) -> Option<([f64; D], [f64; D])> {
        metrics::bounding_box(&self.coordinates.points())
    }

    // ------------------------------------------------------------------
    // Archives
    // ------------------------------------------------------------------

    pub fn save(&self) -> Result<SurfaceArchive, MeshError> {
        Ok(SurfaceArchive {
            version: SURFACE_ARCHIVE_VERSION,
            type_name: Self::type_name(),
            vertices: self.vertex_attribute_manager().save()?,
            polygons: self.polygon_attributes.save()?,
        })
    }

    /// Rebuild a mesh from `archive`; the result is checked structurally.
    pub fn load(
        archive: &SurfaceArchive,
        registry: &AttributeTypeRegistry,
    ) -> Result<Self, MeshError> {
        if archive.version != SURFACE_ARCHIVE_VERSION {
            return Err(MeshError::UnsupportedArchiveVersion {
                found: archive.version,
                supported: SURFACE_ARCHIVE_VERSION,
            });
        }
        if archive.type_name != Self::type_name() {
            return Err(MeshError::Serialization(format!(
                "archive holds a {}, expected a {}",
                archive.type_name,
                Self::type_name()
            )));
        }
        let vertices = AttributeManager::load(&archive.vertices, registry)?;
        let polygons = AttributeManager::load(&archive.polygons, registry)?;
        let mesh = Self::from_managers(vertices, polygons);
        mesh.validate_structure()?;
        log::debug!(
            "loaded {}: {} vertices, {} polygons",
            archive.type_name,
            mesh.nb_vertices(),
            mesh.nb_polygons()
        );
        Ok(mesh)
    }
}

impl SurfaceMesh<2> {
    /// Signed area, positive for counter-clockwise polygons.
    pub fn polygon_area(&self, polygon: Index) -> Result<f64, MeshError> {
        Ok(metrics::signed_polygon_area_2d(&self.polygon_points(polygon)?))
    }

    pub fn polygon_areas(&self) -> Result<Vec<f64>, MeshError> {
        try_map_elements(self.nb_polygons(), |polygon| self.polygon_area(polygon))
    }
}

impl SurfaceMesh<3> {
    pub fn polygon_area(&self, polygon: Index) -> Result<f64, MeshError> {
        Ok(metrics::polygon_area_3d(&self.polygon_points(polygon)?))
    }

    pub fn polygon_areas(&self) -> Result<Vec<f64>, MeshError> {
        try_map_elements(self.nb_polygons(), |polygon| self.polygon_area(polygon))
    }

    /// Unit normal, `None` for a degenerate polygon.
    pub fn polygon_normal(&self, polygon: Index) -> Result<Option<[f64; 3]>, MeshError> {
        Ok(metrics::polygon_unit_normal(&self.polygon_points(polygon)?))
    }
}

/// Serialized form of a [`SurfaceMesh`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceArchive {
    pub version: u32,
    pub type_name: String,
    pub vertices: ManagerArchive,
    pub polygons: ManagerArchive,
}

impl SurfaceArchive {
    pub fn to_bytes(&self) -> Result<Vec<u8>, MeshError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MeshError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl<const D: usize> Serialize for SurfaceMesh<D>
where
    [f64; D]: AttributeValue,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.save()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, const D: usize> Deserialize<'de> for SurfaceMesh<D>
where
    [f64; D]: AttributeValue,
{
    /// Column types are resolved through the default registry.
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let archive = SurfaceArchive::deserialize(deserializer)?;
        Self::load(&archive, AttributeTypeRegistry::global()).map_err(serde::de::Error::custom)
    }
}

