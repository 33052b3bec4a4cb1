//! Mutation entry points of [`SurfaceMesh`].
//!
//! Every structural operation is one method that sequences the updates of
//! representatives, adjacency lists, vertex lists and attribute managers,
//! after validating its input. Column lock guards are always released before
//! the managers broadcast.

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;

use crate::algs::renumber::{
    mapping_after_deletion, nb_deleted, old2new_permutation, remap_indices, validate_mask,
    validate_permutation,
};
use crate::data::value::AttributeValue;
use crate::mesh_error::MeshError;
use crate::topology::index::{Index, NO_ID, indices, to_index};
use crate::topology::local::{PolygonEdge, PolygonVertex};
use crate::topology::surface::SurfaceMesh;
use crate::topology::validation::{AdjacencyOptions, NonManifoldHandling};

pub struct SurfaceMeshBuilder<'a, const D: usize> {
    mesh: &'a mut SurfaceMesh<D>,
}

impl<'a, const D: usize> SurfaceMeshBuilder<'a, D>
where
    [f64; D]: AttributeValue,
{
    pub fn new(mesh: &'a mut SurfaceMesh<D>) -> Self {
        Self { mesh }
    }

    pub fn mesh(&self) -> &SurfaceMesh<D> {
        &*self.mesh
    }

    // ------------------------------------------------------------------
    // Vertices
    // ------------------------------------------------------------------

    pub fn create_vertex(&mut self) -> Index {
        self.mesh.vertices.create_vertex()
    }

    /// Append `nb` vertices; returns the first new index.
    pub fn create_vertices(&mut self, nb: Index) -> Index {
        self.mesh.vertices.create_vertices(nb)
    }

    pub fn create_point(&mut self, point: [f64; D]) -> Result<Index, MeshError> {
        let vertex = self.create_vertex();
        self.mesh.coordinates.set_point(vertex, point)?;
        Ok(vertex)
    }

    pub fn set_point(&mut self, vertex: Index, point: [f64; D]) -> Result<(), MeshError> {
        self.mesh.coordinates.set_point(vertex, point)
    }

    /// Make `polygon_vertex` the representative corner of `vertex`.
    pub fn associate_polygon_vertex_to_vertex(
        &mut self,
        polygon_vertex: PolygonVertex,
        vertex: Index,
    ) -> Result<(), MeshError> {
        self.mesh.check_vertex(vertex)?;
        if self.mesh.polygon_vertex(polygon_vertex)? != vertex {
            return Err(MeshError::InvalidPolygon(format!(
                "corner {polygon_vertex:?} does not hold vertex {vertex}"
            )));
        }
        self.mesh
            .polygon_around_vertex
            .write()
            .set_value(vertex, polygon_vertex);
        Ok(())
    }

    /// Forget the representative corner of `vertex`.
    pub fn disassociate_polygon_vertex_to_vertex(&mut self, vertex: Index) -> Result<(), MeshError> {
        self.mesh.check_vertex(vertex)?;
        self.mesh
            .polygon_around_vertex
            .write()
            .set_value(vertex, PolygonVertex::default());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Polygons
    // ------------------------------------------------------------------

    fn check_polygon_definition(&self, vertices: &[Index]) -> Result<(), MeshError> {
        if vertices.len() < 3 {
            return Err(MeshError::InvalidPolygon(format!(
                "{} vertices given, at least 3 required",
                vertices.len()
            )));
        }
        vertices
            .iter()
            .try_for_each(|&vertex| self.mesh.check_vertex(vertex))?;
        let mut seen = HashSet::with_capacity(vertices.len());
        if let Some(vertex) = vertices.iter().find(|&&vertex| !seen.insert(vertex)) {
            return Err(MeshError::InvalidPolygon(format!(
                "vertex {vertex} appears twice in {vertices:?}"
            )));
        }
        Ok(())
    }

    fn push_polygon(&mut self, vertices: &[Index]) -> Index {
        let polygon = self.mesh.nb_polygons();
        self.mesh.polygon_attributes.resize(polygon + 1);
        self.mesh
            .polygon_vertices
            .write()
            .set_value(polygon, vertices.to_vec());
        self.mesh
            .polygon_adjacents
            .write()
            .set_value(polygon, vec![NO_ID; vertices.len()]);
        let mut corners = self.mesh.polygon_around_vertex.write();
        for (local, &vertex) in vertices.iter().enumerate() {
            corners.set_value(vertex, PolygonVertex::new(polygon, to_index(local)));
        }
        polygon
    }

    /// New polygon over `vertices`, bordered on every edge.
    pub fn create_polygon(&mut self, vertices: &[Index]) -> Result<Index, MeshError> {
        self.check_polygon_definition(vertices)?;
        Ok(self.push_polygon(vertices))
    }

    /// Batch creation; nothing is created if any polygon is invalid. Returns
    /// the index of the first new polygon.
    pub fn create_polygons<P: AsRef<[Index]>>(&mut self, polygons: &[P]) -> Result<Index, MeshError> {
        for polygon in polygons {
            self.check_polygon_definition(polygon.as_ref())?;
        }
        let first = self.mesh.nb_polygons();
        self.mesh
            .polygon_attributes
            .reserve(first + to_index(polygons.len()));
        for polygon in polygons {
            self.push_polygon(polygon.as_ref());
        }
        log::debug!("created {} polygons", polygons.len());
        Ok(first)
    }

    /// Any corner of `vertex` accepted by `keep`, found by scanning every
    /// polygon.
    fn scan_corner(
        &self,
        vertex: Index,
        keep: impl Fn(PolygonVertex) -> bool,
    ) -> Option<PolygonVertex> {
        let lists = self.mesh.polygon_vertices.read();
        lists
            .values()
            .iter()
            .enumerate()
            .flat_map(move |(polygon, list)| {
                list.iter()
                    .enumerate()
                    .filter(move |&(_, &v)| v == vertex)
                    .map(move |(local, _)| PolygonVertex::new(to_index(polygon), to_index(local)))
            })
            .find(|&corner| keep(corner))
    }

    /// Rebind corner `polygon_vertex` to `vertex`.
    ///
    /// If the corner was the representative of its previous vertex, another
    /// corner of that vertex takes over, or the vertex becomes isolated.
    pub fn set_polygon_vertex(
        &mut self,
        polygon_vertex: PolygonVertex,
        vertex: Index,
    ) -> Result<(), MeshError> {
        self.mesh.check_vertex(vertex)?;
        let previous = self.mesh.polygon_vertex(polygon_vertex)?;
        if previous == vertex {
            return Ok(());
        }
        let rebind = if self.mesh.polygon_around_vertex(previous)? == Some(polygon_vertex) {
            let walked = self
                .mesh
                .polygons_around_vertex(previous)?
                .into_iter()
                .find(|&corner| corner != polygon_vertex);
            Some(
                walked
                    .or_else(|| self.scan_corner(previous, |corner| corner != polygon_vertex))
                    .unwrap_or_default(),
            )
        } else {
            None
        };

        self.mesh
            .polygon_vertices
            .write()
            .modify_value(polygon_vertex.polygon_id, |list| {
                list[polygon_vertex.vertex_id as usize] = vertex;
            });
        let mut corners = self.mesh.polygon_around_vertex.write();
        corners.set_value(vertex, polygon_vertex);
        if let Some(corner) = rebind {
            corners.set_value(previous, corner);
        }
        Ok(())
    }

    /// Substitute `new` for `old` in every polygon. Scans every polygon;
    /// `old` ends up isolated.
    pub fn replace_vertex(&mut self, old: Index, new: Index) -> Result<(), MeshError> {
        self.mesh.check_vertex(old)?;
        self.mesh.check_vertex(new)?;
        if old == new {
            return Ok(());
        }
        let mut first = None;
        {
            let mut lists = self.mesh.polygon_vertices.write();
            for polygon in indices(lists.nb_elements()) {
                lists.modify_value(polygon, |list| {
                    for (local, v) in list.iter_mut().enumerate() {
                        if *v == old {
                            *v = new;
                            first.get_or_insert(PolygonVertex::new(polygon, to_index(local)));
                        }
                    }
                });
            }
        }
        let mut corners = self.mesh.polygon_around_vertex.write();
        if let Some(corner) = first {
            corners.set_value(new, corner);
        }
        corners.set_value(old, PolygonVertex::default());
        Ok(())
    }

    /// One-directional write; pair calls to keep adjacency symmetric.
    pub fn set_polygon_adjacent(
        &mut self,
        edge: PolygonEdge,
        adjacent: Index,
    ) -> Result<(), MeshError> {
        self.mesh.polygon_adjacent(edge)?;
        self.mesh.check_polygon(adjacent)?;
        self.write_adjacent(edge, adjacent);
        Ok(())
    }

    pub fn unset_polygon_adjacent(&mut self, edge: PolygonEdge) -> Result<(), MeshError> {
        self.mesh.polygon_adjacent(edge)?;
        self.write_adjacent(edge, NO_ID);
        Ok(())
    }

    fn write_adjacent(&mut self, edge: PolygonEdge, adjacent: Index) {
        self.mesh
            .polygon_adjacents
            .write()
            .modify_value(edge.polygon_id, |list| list[edge.edge_id as usize] = adjacent);
    }

    // ------------------------------------------------------------------
    // Adjacency computation
    // ------------------------------------------------------------------

    pub fn compute_polygon_adjacencies(&mut self) -> Result<(), MeshError> {
        self.compute_polygon_adjacencies_with(AdjacencyOptions::default())
    }

    pub fn compute_polygon_adjacencies_with(
        &mut self,
        options: AdjacencyOptions,
    ) -> Result<(), MeshError> {
        let all: Vec<Index> = indices(self.mesh.nb_polygons()).collect();
        self.compute_adjacencies_in(&all, options)
    }

    /// Link border edges of `polygons` among themselves only.
    pub fn compute_polygon_subset_adjacencies(
        &mut self,
        polygons: &[Index],
        options: AdjacencyOptions,
    ) -> Result<(), MeshError> {
        for &polygon in polygons {
            self.mesh.check_polygon(polygon)?;
        }
        self.compute_adjacencies_in(polygons, options)
    }

    /// For each border edge `(v0, v1)`, the corners at `v0` whose previous
    /// vertex is `v1` are candidates; the first one still on border is
    /// linked both ways. Results are staged and written at the end, so an
    /// error leaves adjacency untouched.
    fn compute_adjacencies_in(
        &mut self,
        polygons: &[Index],
        options: AdjacencyOptions,
    ) -> Result<(), MeshError> {
        let scope: Vec<Index> = polygons.iter().copied().sorted_unstable().dedup().collect();
        let lists = self.mesh.polygon_vertices.read();

        let mut around: HashMap<Index, Vec<PolygonVertex>> = HashMap::new();
        for &polygon in &scope {
            for (local, &vertex) in lists.value(polygon).iter().enumerate() {
                around
                    .entry(vertex)
                    .or_default()
                    .push(PolygonVertex::new(polygon, to_index(local)));
            }
        }
        let mut staged: HashMap<Index, Vec<Index>> = {
            let adjacents = self.mesh.polygon_adjacents.read();
            scope
                .iter()
                .map(|&polygon| (polygon, adjacents.value(polygon).clone()))
                .collect()
        };

        let mut nb_links = 0usize;
        for &polygon in &scope {
            let edges = lists.value(polygon).iter().copied().circular_tuple_windows();
            for (edge, (v0, v1)) in edges.enumerate() {
                if staged[&polygon][edge] != NO_ID {
                    continue;
                }
                let mut matched = None;
                let mut nb_candidates = 0usize;
                for corner in around.get(&v0).map(Vec::as_slice).unwrap_or_default() {
                    let other = lists.value(corner.polygon_id);
                    let previous = (corner.vertex_id as usize + other.len() - 1) % other.len();
                    if other[previous] != v1 {
                        continue;
                    }
                    nb_candidates += 1;
                    if matched.is_none() && staged[&corner.polygon_id][previous] == NO_ID {
                        matched = Some((corner.polygon_id, previous));
                    }
                }
                if nb_candidates > 1 {
                    match options.non_manifold {
                        NonManifoldHandling::Ignore => {}
                        NonManifoldHandling::Warn => {
                            log::warn!("non-manifold edge ({v0}, {v1}): {nb_candidates} candidates")
                        }
                        NonManifoldHandling::Error => {
                            return Err(MeshError::NonManifold {
                                vertices: vec![v0, v1],
                            });
                        }
                    }
                }
                if let Some((adjacent, adjacent_edge)) = matched {
                    if let Some(list) = staged.get_mut(&polygon) {
                        list[edge] = adjacent;
                    }
                    if let Some(list) = staged.get_mut(&adjacent) {
                        list[adjacent_edge] = polygon;
                    }
                    nb_links += 1;
                }
            }
        }
        drop(lists);

        let mut adjacents = self.mesh.polygon_adjacents.write();
        for (polygon, list) in staged {
            adjacents.set_value(polygon, list);
        }
        drop(adjacents);
        log::debug!(
            "linked {nb_links} polygon edge pairs over {} polygons",
            scope.len()
        );
        crate::debug_invariants!(self.mesh.validate_structure(), "surface adjacency");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deletion and permutation
    // ------------------------------------------------------------------

    /// Representatives after deleting the masked polygons, already
    /// renumbered. Vertices whose representative disappears take another
    /// surviving corner from their adjacency walk, then from one scan of the
    /// surviving polygons; otherwise they become isolated.
    fn rebound_representatives(
        &self,
        to_delete: &[bool],
        old2new: &[Index],
    ) -> Result<Vec<PolygonVertex>, MeshError> {
        let mut corners = self.mesh.polygon_around_vertex.read().values().to_vec();
        let mut unresolved = HashSet::new();
        for vertex in indices(to_index(corners.len())) {
            let corner = corners[vertex as usize];
            if !corner.is_defined() || !to_delete[corner.polygon_id as usize] {
                continue;
            }
            let survivor = self
                .mesh
                .polygons_around_vertex(vertex)?
                .into_iter()
                .find(|c| !to_delete[c.polygon_id as usize]);
            match survivor {
                Some(c) => corners[vertex as usize] = c,
                None => {
                    corners[vertex as usize] = PolygonVertex::default();
                    unresolved.insert(vertex);
                }
            }
        }
        if !unresolved.is_empty() {
            let lists = self.mesh.polygon_vertices.read();
            for (polygon, list) in lists.values().iter().enumerate() {
                if to_delete[polygon] {
                    continue;
                }
                for (local, &vertex) in list.iter().enumerate() {
                    if unresolved.remove(&vertex) {
                        corners[vertex as usize] =
                            PolygonVertex::new(to_index(polygon), to_index(local));
                    }
                }
            }
        }
        for corner in corners.iter_mut().filter(|c| c.is_defined()) {
            corner.polygon_id = old2new[corner.polygon_id as usize];
        }
        Ok(corners)
    }

    /// Remove masked polygons; returns the `old2new` table.
    ///
    /// Adjacency entries pointing at deleted polygons become border.
    pub fn delete_polygons(&mut self, to_delete: &[bool]) -> Result<Vec<Index>, MeshError> {
        validate_mask(to_delete, self.mesh.nb_polygons())?;
        let old2new = mapping_after_deletion(to_delete);
        if nb_deleted(to_delete) == 0 {
            return Ok(old2new);
        }
        let representatives = self.rebound_representatives(to_delete, &old2new)?;

        {
            let mut corners = self.mesh.polygon_around_vertex.write();
            for (vertex, corner) in representatives.into_iter().enumerate() {
                corners.set_value(to_index(vertex), corner);
            }
        }
        {
            let mut adjacents = self.mesh.polygon_adjacents.write();
            for polygon in indices(adjacents.nb_elements()) {
                if !to_delete[polygon as usize] {
                    adjacents.modify_value(polygon, |list| remap_indices(list, &old2new));
                }
            }
        }
        self.mesh.polygon_attributes.delete_elements(to_delete)?;
        log::debug!(
            "deleted {} polygons, {} left",
            nb_deleted(to_delete),
            self.mesh.nb_polygons()
        );
        crate::debug_invariants!(self.mesh.validate_structure(), "surface polygon deletion");
        Ok(old2new)
    }

    /// New polygon `i` is old polygon `permutation[i]`.
    pub fn permute_polygons(&mut self, permutation: &[Index]) -> Result<(), MeshError> {
        validate_permutation(permutation, self.mesh.nb_polygons())?;
        let old2new = old2new_permutation(permutation);
        {
            let mut corners = self.mesh.polygon_around_vertex.write();
            for vertex in indices(corners.nb_elements()) {
                corners.modify_value(vertex, |corner| {
                    if corner.is_defined() {
                        corner.polygon_id = old2new[corner.polygon_id as usize];
                    }
                });
            }
        }
        {
            let mut adjacents = self.mesh.polygon_adjacents.write();
            for polygon in indices(adjacents.nb_elements()) {
                adjacents.modify_value(polygon, |list| remap_indices(list, &old2new));
            }
        }
        self.mesh.polygon_attributes.permute_elements(permutation)?;
        crate::debug_invariants!(self.mesh.validate_structure(), "surface polygon permutation");
        Ok(())
    }

    fn remap_polygon_vertices(&mut self, old2new: &[Index]) {
        let mut lists = self.mesh.polygon_vertices.write();
        for polygon in indices(lists.nb_elements()) {
            lists.modify_value(polygon, |list| remap_indices(list, old2new));
        }
    }

    /// Remove masked vertices, deleting first every polygon that uses one
    /// of them. Returns the vertex `old2new` table.
    pub fn delete_vertices(&mut self, to_delete: &[bool]) -> Result<Vec<Index>, MeshError> {
        validate_mask(to_delete, self.mesh.nb_vertices())?;
        let old2new = mapping_after_deletion(to_delete);
        if nb_deleted(to_delete) == 0 {
            return Ok(old2new);
        }
        let doomed: Vec<bool> = self
            .mesh
            .polygon_vertices
            .read()
            .values()
            .iter()
            .map(|list| list.iter().any(|&v| to_delete[v as usize]))
            .collect();
        if doomed.contains(&true) {
            self.delete_polygons(&doomed)?;
        }
        self.remap_polygon_vertices(&old2new);
        self.mesh.vertices.delete_vertices(to_delete)?;
        log::debug!(
            "deleted {} vertices, {} left",
            nb_deleted(to_delete),
            self.mesh.nb_vertices()
        );
        crate::debug_invariants!(self.mesh.validate_structure(), "surface vertex deletion");
        Ok(old2new)
    }

    /// New vertex `i` is old vertex `permutation[i]`.
    pub fn permute_vertices(&mut self, permutation: &[Index]) -> Result<(), MeshError> {
        validate_permutation(permutation, self.mesh.nb_vertices())?;
        let old2new = old2new_permutation(permutation);
        self.remap_polygon_vertices(&old2new);
        self.mesh.vertices.permute_vertices(permutation)?;
        crate::debug_invariants!(self.mesh.validate_structure(), "surface vertex permutation");
        Ok(())
    }

    /// Remove vertices no polygon uses; returns the vertex `old2new` table.
    pub fn delete_isolated_vertices(&mut self) -> Result<Vec<Index>, MeshError> {
        let mut to_delete = vec![true; self.mesh.nb_vertices() as usize];
        for list in self.mesh.polygon_vertices.read().values() {
            for &vertex in list {
                to_delete[vertex as usize] = false;
            }
        }
        self.delete_vertices(&to_delete)
    }
}

impl<const D: usize> SurfaceMesh<D>
where
    [f64; D]: AttributeValue,
{
    pub fn builder(&mut self) -> SurfaceMeshBuilder<'_, D> {
        SurfaceMeshBuilder::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::surface::SurfaceMesh2D;

    /// Unit square split along its diagonal into (0,1,2) and (0,2,3).
    fn square() -> SurfaceMesh2D {
        let mut mesh = SurfaceMesh2D::new();
        let mut builder = mesh.builder();
        for p in [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
            builder.create_point(p).unwrap();
        }
        builder.create_polygons(&[[0u32, 1, 2], [0, 2, 3]]).unwrap();
        builder.compute_polygon_adjacencies().unwrap();
        mesh
    }

    #[test]
    fn polygon_definition_is_checked() {
        let mut mesh = SurfaceMesh2D::new();
        let mut builder = mesh.builder();
        builder.create_vertices(3);
        assert!(matches!(
            builder.create_polygon(&[0, 1]),
            Err(MeshError::InvalidPolygon(_))
        ));
        assert!(builder.create_polygons(&[vec![0u32, 1, 2], vec![0, 1, 5]]).is_err());
        assert!(matches!(
            builder.create_polygon(&[0, 1, 0]),
            Err(MeshError::InvalidPolygon(_))
        ));
        assert!(builder.create_polygons(&[vec![0u32, 1, 2], vec![2, 1, 2, 0]]).is_err());
        assert_eq!(mesh.nb_polygons(), 0);
    }

    #[test]
    fn diagonal_is_shared() {
        let mesh = square();
        assert_eq!(mesh.polygon_adjacent(PolygonEdge::new(0, 2)).unwrap(), Some(1));
        assert_eq!(mesh.polygon_adjacent(PolygonEdge::new(1, 0)).unwrap(), Some(0));
        assert_eq!(
            mesh.polygon_adjacent_edge(PolygonEdge::new(0, 2)).unwrap(),
            Some(PolygonEdge::new(1, 0))
        );
        assert_eq!(mesh.polygon_edges_on_border(0).unwrap().len(), 2);
    }

    #[test]
    fn border_walk_goes_around_the_square() {
        let mesh = square();
        // Edge 0 of polygon 0 is 0 -> 1.
        let start = PolygonEdge::new(0, 0);
        let next = mesh.next_on_border(start).unwrap();
        assert_eq!(mesh.polygon_edge_vertices(next).unwrap(), [1, 2]);
        let next = mesh.next_on_border(next).unwrap();
        assert_eq!(mesh.polygon_edge_vertices(next).unwrap(), [2, 3]);
        let previous = mesh.previous_on_border(start).unwrap();
        assert_eq!(mesh.polygon_edge_vertices(previous).unwrap(), [3, 0]);
        assert_eq!(
            mesh.next_on_border(PolygonEdge::new(0, 2)).unwrap_err(),
            MeshError::NotOnBorder {
                kind: crate::mesh_error::ElementKind::Polygon,
                element: 0,
                local: 2
            }
        );
    }

    #[test]
    fn around_vertex_and_edge_lookup() {
        let mesh = square();
        let mut around: Vec<_> = mesh
            .polygons_around_vertex(0)
            .unwrap()
            .into_iter()
            .map(|c| c.polygon_id)
            .collect();
        around.sort_unstable();
        assert_eq!(around, vec![0, 1]);
        assert_eq!(
            mesh.polygon_edge_from_vertices(2, 0).unwrap(),
            Some(PolygonEdge::new(0, 2))
        );
        assert_eq!(mesh.polygon_edge_from_vertices(1, 3).unwrap(), None);
        assert_eq!(mesh.vertex_in_polygon(1, 3).unwrap(), Some(2));
        assert_eq!(mesh.vertex_in_polygon(0, 3).unwrap(), None);
    }

    #[test]
    fn deleting_a_polygon_clears_links_to_it() {
        let mut mesh = square();
        let old2new = mesh.builder().delete_polygons(&[true, false]).unwrap();
        assert_eq!(old2new, vec![NO_ID, 0]);
        assert_eq!(mesh.nb_polygons(), 1);
        assert_eq!(mesh.polygon_vertices(0).unwrap(), vec![0, 2, 3]);
        assert_eq!(mesh.polygon_edges_on_border(0).unwrap().len(), 3);
        assert!(mesh.isolated_vertex(1).unwrap());
        assert_eq!(
            mesh.polygon_around_vertex(0).unwrap(),
            Some(PolygonVertex::new(0, 0))
        );
    }

    #[test]
    fn vertex_deletion_cascades_to_polygons() {
        let mut mesh = square();
        let old2new = mesh.builder().delete_vertices(&[false, true, false, false]).unwrap();
        assert_eq!(old2new, vec![0, NO_ID, 1, 2]);
        assert_eq!(mesh.nb_vertices(), 3);
        assert_eq!(mesh.nb_polygons(), 1);
        assert_eq!(mesh.polygon_vertices(0).unwrap(), vec![0, 1, 2]);
        assert_eq!(mesh.point(2).unwrap(), [0.0, 1.0]);
    }

    #[test]
    fn isolated_vertices_are_removed() {
        let mut mesh = square();
        let mut builder = mesh.builder();
        builder.create_point([5.0, 5.0]).unwrap();
        let old2new = builder.delete_isolated_vertices().unwrap();
        assert_eq!(old2new[4], NO_ID);
        assert_eq!(mesh.nb_vertices(), 4);
    }

    #[test]
    fn permutation_keeps_topology() {
        let mut mesh = square();
        mesh.builder().permute_polygons(&[1, 0]).unwrap();
        assert_eq!(mesh.polygon_vertices(0).unwrap(), vec![0, 2, 3]);
        assert_eq!(mesh.polygon_adjacent(PolygonEdge::new(0, 0)).unwrap(), Some(1));
        mesh.builder().permute_vertices(&[3, 2, 1, 0]).unwrap();
        assert_eq!(mesh.polygon_vertices(0).unwrap(), vec![3, 1, 0]);
        assert_eq!(mesh.point(0).unwrap(), [0.0, 1.0]);
        let corner = mesh.polygon_around_vertex(3).unwrap().unwrap();
        assert_eq!(mesh.polygon_vertex(corner).unwrap(), 3);
    }

    #[test]
    fn set_polygon_vertex_rebinds_previous_vertex() {
        let mut mesh = square();
        let mut builder = mesh.builder();
        let extra = builder.create_point([2.0, 0.0]).unwrap();
        // Vertex 1 only belongs to polygon 0.
        builder
            .set_polygon_vertex(PolygonVertex::new(0, 1), extra)
            .unwrap();
        assert!(mesh.isolated_vertex(1).unwrap());
        assert_eq!(
            mesh.polygon_around_vertex(extra).unwrap(),
            Some(PolygonVertex::new(0, 1))
        );
    }

    #[test]
    fn replace_vertex_moves_every_corner() {
        let mut mesh = square();
        let mut builder = mesh.builder();
        let extra = builder.create_vertex();
        builder.replace_vertex(0, extra).unwrap();
        assert!(mesh.isolated_vertex(0).unwrap());
        assert_eq!(mesh.polygon_vertices(0).unwrap(), vec![extra, 1, 2]);
        assert_eq!(mesh.polygon_vertices(1).unwrap(), vec![extra, 2, 3]);
    }

    #[test]
    fn non_manifold_edges_follow_options() {
        let mut mesh = SurfaceMesh2D::new();
        let mut builder = mesh.builder();
        builder.create_vertices(5);
        builder
            .create_polygons(&[[0u32, 1, 2], [1, 0, 3], [1, 0, 4]])
            .unwrap();
        let err = builder
            .compute_polygon_adjacencies_with(AdjacencyOptions {
                non_manifold: NonManifoldHandling::Error,
            })
            .unwrap_err();
        assert_eq!(err, MeshError::NonManifold { vertices: vec![0, 1] });
        assert!(mesh.polygon_edges_on_border(0).unwrap().len() == 3);

        mesh.builder().compute_polygon_adjacencies().unwrap();
        assert_eq!(mesh.polygon_adjacent(PolygonEdge::new(0, 0)).unwrap(), Some(1));
        assert!(mesh.is_edge_on_border(PolygonEdge::new(2, 0)).unwrap());
    }

    #[test]
    fn adjacency_setters_check_indices() {
        let mut mesh = square();
        let mut builder = mesh.builder();
        assert!(builder.set_polygon_adjacent(PolygonEdge::new(0, 0), 7).is_err());
        assert!(builder.set_polygon_adjacent(PolygonEdge::new(0, 3), 1).is_err());
        builder.unset_polygon_adjacent(PolygonEdge::new(0, 2)).unwrap();
        builder.unset_polygon_adjacent(PolygonEdge::new(1, 0)).unwrap();
        assert!(mesh.is_edge_on_border(PolygonEdge::new(0, 2)).unwrap());
    }
}
