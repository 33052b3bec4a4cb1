//! Mutation entry points of [`SolidMesh`].
//!
//! Same sequencing rules as the surface builder: validate, update
//! representatives and adjacency lists, then let the managers broadcast.

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;

use crate::algs::renumber::{
    mapping_after_deletion, nb_deleted, old2new_permutation, remap_indices, validate_mask,
    validate_permutation,
};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::PolyhedronKind;
use crate::topology::index::{Index, LocalIndex, NO_ID, indices, to_index};
use crate::topology::local::{PolyhedronFacet, PolyhedronVertex};
use crate::topology::solid::{FacetList, SolidMesh, facet_key, facets_are_opposite};
use crate::topology::validation::{AdjacencyOptions, NonManifoldHandling};

pub struct SolidMeshBuilder<'a> {
    mesh: &'a mut SolidMesh,
}

impl<'a> SolidMeshBuilder<'a> {
    pub fn new(mesh: &'a mut SolidMesh) -> Self {
        Self { mesh }
    }

    pub fn mesh(&self) -> &SolidMesh {
        &*self.mesh
    }

    // ------------------------------------------------------------------
    // Vertices
    // ------------------------------------------------------------------

    pub fn create_vertex(&mut self) -> Index {
        self.mesh.vertices.create_vertex()
    }

    pub fn create_vertices(&mut self, nb: Index) -> Index {
        self.mesh.vertices.create_vertices(nb)
    }

    pub fn create_point(&mut self, point: [f64; 3]) -> Result<Index, MeshError> {
        let vertex = self.create_vertex();
        self.mesh.coordinates.set_point(vertex, point)?;
        Ok(vertex)
    }

    pub fn set_point(&mut self, vertex: Index, point: [f64; 3]) -> Result<(), MeshError> {
        self.mesh.coordinates.set_point(vertex, point)
    }

    // ------------------------------------------------------------------
    // Polyhedra
    // ------------------------------------------------------------------

    fn check_vertices(&self, vertices: &[Index]) -> Result<(), MeshError> {
        vertices
            .iter()
            .try_for_each(|&vertex| self.mesh.check_vertex(vertex))
    }

    fn check_facets(nb_vertices: usize, facets: &[Vec<LocalIndex>]) -> Result<(), MeshError> {
        if facets.len() < 4 {
            return Err(MeshError::InvalidPolyhedron(format!(
                "{} facets given, at least 4 required",
                facets.len()
            )));
        }
        for facet in facets {
            if facet.len() < 3 {
                return Err(MeshError::InvalidPolyhedron(format!(
                    "facet {facet:?} has fewer than 3 vertices"
                )));
            }
            if let Some(&local) = facet.iter().find(|&&l| l as usize >= nb_vertices) {
                return Err(MeshError::InvalidPolyhedron(format!(
                    "facet {facet:?} uses local vertex {local} of a {nb_vertices}-vertex polyhedron"
                )));
            }
        }
        Ok(())
    }

    fn push_polyhedron(
        &mut self,
        kind: PolyhedronKind,
        vertices: &[Index],
        facets: Option<FacetList>,
    ) -> Index {
        let polyhedron = self.mesh.nb_polyhedra();
        let nb_facets = match &facets {
            Some(facets) => facets.len(),
            None => kind.facets().map_or(0, <[_]>::len),
        };
        self.mesh.polyhedron_attributes.resize(polyhedron + 1);
        self.mesh
            .polyhedron_vertices
            .write()
            .set_value(polyhedron, vertices.to_vec());
        self.mesh
            .polyhedron_adjacents
            .write()
            .set_value(polyhedron, vec![NO_ID; nb_facets]);
        self.mesh.polyhedron_kinds.write().set_value(polyhedron, kind);
        if let Some(facets) = facets {
            self.mesh
                .polyhedron_facets
                .write()
                .set_value(polyhedron, facets);
        }
        let mut corners = self.mesh.polyhedron_around_vertex.write();
        for (local, &vertex) in vertices.iter().enumerate() {
            corners.set_value(vertex, PolyhedronVertex::new(polyhedron, to_index(local)));
        }
        polyhedron
    }

    /// New polyhedron of a regular `kind`, bordered on every facet.
    pub fn create_polyhedron(
        &mut self,
        kind: PolyhedronKind,
        vertices: &[Index],
    ) -> Result<Index, MeshError> {
        let Some(expected) = kind.nb_vertices() else {
            return Err(MeshError::InvalidPolyhedron(
                "irregular polyhedra need explicit facets".to_string(),
            ));
        };
        if vertices.len() != expected as usize {
            return Err(MeshError::InvalidPolyhedron(format!(
                "{kind:?} needs {expected} vertices, {} given",
                vertices.len()
            )));
        }
        self.check_vertices(vertices)?;
        Ok(self.push_polyhedron(kind, vertices, None))
    }

    pub fn create_tetrahedron(&mut self, vertices: [Index; 4]) -> Result<Index, MeshError> {
        self.create_polyhedron(PolyhedronKind::Tetrahedron, &vertices)
    }

    /// New irregular polyhedron; `facets` list outward local vertex indices.
    pub fn create_polyhedron_with_facets(
        &mut self,
        vertices: &[Index],
        facets: FacetList,
    ) -> Result<Index, MeshError> {
        if vertices.len() < 4 {
            return Err(MeshError::InvalidPolyhedron(format!(
                "{} vertices given, at least 4 required",
                vertices.len()
            )));
        }
        Self::check_facets(vertices.len(), &facets)?;
        self.check_vertices(vertices)?;
        Ok(self.push_polyhedron(PolyhedronKind::Polyhedron, vertices, Some(facets)))
    }

    fn scan_corner(
        &self,
        vertex: Index,
        keep: impl Fn(PolyhedronVertex) -> bool,
    ) -> Option<PolyhedronVertex> {
        let lists = self.mesh.polyhedron_vertices.read();
        lists
            .values()
            .iter()
            .enumerate()
            .flat_map(move |(polyhedron, list)| {
                list.iter()
                    .enumerate()
                    .filter(move |&(_, &v)| v == vertex)
                    .map(move |(local, _)| {
                        PolyhedronVertex::new(to_index(polyhedron), to_index(local))
                    })
            })
            .find(|&corner| keep(corner))
    }

    /// Rebind `polyhedron_vertex` to `vertex`; the previous vertex keeps a
    /// representative if any other polyhedron vertex still holds it.
    pub fn set_polyhedron_vertex(
        &mut self,
        polyhedron_vertex: PolyhedronVertex,
        vertex: Index,
    ) -> Result<(), MeshError> {
        self.mesh.check_vertex(vertex)?;
        let previous = self.mesh.polyhedron_vertex(polyhedron_vertex)?;
        if previous == vertex {
            return Ok(());
        }
        let rebind = if self.mesh.polyhedron_around_vertex(previous)? == Some(polyhedron_vertex) {
            let walked = self
                .mesh
                .polyhedra_around_vertex(previous)?
                .into_iter()
                .find(|&corner| corner != polyhedron_vertex);
            Some(
                walked
                    .or_else(|| self.scan_corner(previous, |corner| corner != polyhedron_vertex))
                    .unwrap_or_default(),
            )
        } else {
            None
        };

        self.mesh
            .polyhedron_vertices
            .write()
            .modify_value(polyhedron_vertex.polyhedron_id, |list| {
                list[polyhedron_vertex.vertex_id as usize] = vertex;
            });
        let mut corners = self.mesh.polyhedron_around_vertex.write();
        corners.set_value(vertex, polyhedron_vertex);
        if let Some(corner) = rebind {
            corners.set_value(previous, corner);
        }
        Ok(())
    }

    /// One-directional write; pair calls to keep adjacency symmetric.
    pub fn set_polyhedron_adjacent(
        &mut self,
        facet: PolyhedronFacet,
        adjacent: Index,
    ) -> Result<(), MeshError> {
        self.mesh.polyhedron_adjacent(facet)?;
        self.mesh.check_polyhedron(adjacent)?;
        self.write_adjacent(facet, adjacent);
        Ok(())
    }

    pub fn unset_polyhedron_adjacent(&mut self, facet: PolyhedronFacet) -> Result<(), MeshError> {
        self.mesh.polyhedron_adjacent(facet)?;
        self.write_adjacent(facet, NO_ID);
        Ok(())
    }

    fn write_adjacent(&mut self, facet: PolyhedronFacet, adjacent: Index) {
        self.mesh
            .polyhedron_adjacents
            .write()
            .modify_value(facet.polyhedron_id, |list| {
                list[facet.facet_id as usize] = adjacent;
            });
    }

    // ------------------------------------------------------------------
    // Adjacency computation
    // ------------------------------------------------------------------

    pub fn compute_polyhedron_adjacencies(&mut self) -> Result<(), MeshError> {
        self.compute_polyhedron_adjacencies_with(AdjacencyOptions::default())
    }

    /// Facets over the same vertex set are bucketed together; within a
    /// bucket a facet is linked to the first free candidate listing its
    /// vertices in the opposite orientation. Results are staged, so an
    /// error leaves adjacency untouched.
    pub fn compute_polyhedron_adjacencies_with(
        &mut self,
        options: AdjacencyOptions,
    ) -> Result<(), MeshError> {
        let nb_polyhedra = self.mesh.nb_polyhedra();
        let mut facets: Vec<Vec<Vec<Index>>> = Vec::with_capacity(nb_polyhedra as usize);
        let mut by_key: HashMap<Vec<Index>, Vec<PolyhedronFacet>> = HashMap::new();
        for polyhedron in indices(nb_polyhedra) {
            let nb_facets = self.mesh.nb_polyhedron_facets(polyhedron)?;
            let mut polyhedron_facets = Vec::with_capacity(nb_facets as usize);
            for f in 0..nb_facets {
                let facet = PolyhedronFacet::new(polyhedron, f);
                let vertices = self.mesh.polyhedron_facet_vertices(facet)?;
                by_key.entry(facet_key(vertices.clone())).or_default().push(facet);
                polyhedron_facets.push(vertices);
            }
            facets.push(polyhedron_facets);
        }
        let mut staged: Vec<Vec<Index>> = self.mesh.polyhedron_adjacents.read().values().to_vec();

        let mut nb_links = 0usize;
        for polyhedron in indices(nb_polyhedra) {
            for (f, vertices) in facets[polyhedron as usize].iter().enumerate() {
                if staged[polyhedron as usize][f] != NO_ID {
                    continue;
                }
                let this = PolyhedronFacet::new(polyhedron, to_index(f));
                let key = facet_key(vertices.clone());
                let candidates = by_key[&key].iter().filter(|&&other| other != this);
                let mut matched = None;
                let mut nb_candidates = 0usize;
                for other in candidates {
                    nb_candidates += 1;
                    let (p, o) = (other.polyhedron_id as usize, other.facet_id as usize);
                    let free = staged[p][o] == NO_ID;
                    if matched.is_none()
                        && free
                        && other.polyhedron_id != polyhedron
                        && facets_are_opposite(vertices, &facets[p][o])
                    {
                        matched = Some(*other);
                    }
                }
                if nb_candidates > 1 {
                    match options.non_manifold {
                        NonManifoldHandling::Ignore => {}
                        NonManifoldHandling::Warn => log::warn!(
                            "non-manifold facet {key:?}: {nb_candidates} candidates"
                        ),
                        NonManifoldHandling::Error => {
                            return Err(MeshError::NonManifold {
                                vertices: key,
                            });
                        }
                    }
                }
                if let Some(other) = matched {
                    staged[polyhedron as usize][f] = other.polyhedron_id;
                    staged[other.polyhedron_id as usize][other.facet_id as usize] = polyhedron;
                    nb_links += 1;
                }
            }
        }

        let mut adjacents = self.mesh.polyhedron_adjacents.write();
        for (polyhedron, list) in staged.into_iter().enumerate() {
            adjacents.set_value(to_index(polyhedron), list);
        }
        drop(adjacents);
        log::debug!("linked {nb_links} polyhedron facet pairs over {nb_polyhedra} polyhedra");
        crate::debug_invariants!(self.mesh.validate_structure(), "solid adjacency");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deletion and permutation
    // ------------------------------------------------------------------

    fn rebound_representatives(
        &self,
        to_delete: &[bool],
        old2new: &[Index],
    ) -> Result<Vec<PolyhedronVertex>, MeshError> {
        let mut corners = self.mesh.polyhedron_around_vertex.read().values().to_vec();
        let mut unresolved = HashSet::new();
        for vertex in indices(to_index(corners.len())) {
            let corner = corners[vertex as usize];
            if !corner.is_defined() || !to_delete[corner.polyhedron_id as usize] {
                continue;
            }
            let survivor = self
                .mesh
                .polyhedra_around_vertex(vertex)?
                .into_iter()
                .find(|c| !to_delete[c.polyhedron_id as usize]);
            match survivor {
                Some(c) => corners[vertex as usize] = c,
                None => {
                    corners[vertex as usize] = PolyhedronVertex::default();
                    unresolved.insert(vertex);
                }
            }
        }
        if !unresolved.is_empty() {
            let lists = self.mesh.polyhedron_vertices.read();
            for (polyhedron, list) in lists.values().iter().enumerate() {
                if to_delete[polyhedron] {
                    continue;
                }
                for (local, &vertex) in list.iter().enumerate() {
                    if unresolved.remove(&vertex) {
                        corners[vertex as usize] =
                            PolyhedronVertex::new(to_index(polyhedron), to_index(local));
                    }
                }
            }
        }
        for corner in corners.iter_mut().filter(|c| c.is_defined()) {
            corner.polyhedron_id = old2new[corner.polyhedron_id as usize];
        }
        Ok(corners)
    }

    /// Remove masked polyhedra; returns the `old2new` table. Facets that
    /// pointed at a deleted polyhedron become border.
    pub fn delete_polyhedra(&mut self, to_delete: &[bool]) -> Result<Vec<Index>, MeshError> {
        validate_mask(to_delete, self.mesh.nb_polyhedra())?;
        let old2new = mapping_after_deletion(to_delete);
        if nb_deleted(to_delete) == 0 {
            return Ok(old2new);
        }
        let representatives = self.rebound_representatives(to_delete, &old2new)?;
        {
            let mut corners = self.mesh.polyhedron_around_vertex.write();
            for (vertex, corner) in representatives.into_iter().enumerate() {
                corners.set_value(to_index(vertex), corner);
            }
        }
        {
            let mut adjacents = self.mesh.polyhedron_adjacents.write();
            for polyhedron in indices(adjacents.nb_elements()) {
                if !to_delete[polyhedron as usize] {
                    adjacents.modify_value(polyhedron, |list| remap_indices(list, &old2new));
                }
            }
        }
        self.mesh.polyhedron_attributes.delete_elements(to_delete)?;
        log::debug!(
            "deleted {} polyhedra, {} left",
            nb_deleted(to_delete),
            self.mesh.nb_polyhedra()
        );
        crate::debug_invariants!(self.mesh.validate_structure(), "solid polyhedron deletion");
        Ok(old2new)
    }

    /// New polyhedron `i` is old polyhedron `permutation[i]`.
    pub fn permute_polyhedra(&mut self, permutation: &[Index]) -> Result<(), MeshError> {
        validate_permutation(permutation, self.mesh.nb_polyhedra())?;
        let old2new = old2new_permutation(permutation);
        {
            let mut corners = self.mesh.polyhedron_around_vertex.write();
            for vertex in indices(corners.nb_elements()) {
                corners.modify_value(vertex, |corner| {
                    if corner.is_defined() {
                        corner.polyhedron_id = old2new[corner.polyhedron_id as usize];
                    }
                });
            }
        }
        {
            let mut adjacents = self.mesh.polyhedron_adjacents.write();
            for polyhedron in indices(adjacents.nb_elements()) {
                adjacents.modify_value(polyhedron, |list| remap_indices(list, &old2new));
            }
        }
        self.mesh.polyhedron_attributes.permute_elements(permutation)?;
        crate::debug_invariants!(self.mesh.validate_structure(), "solid polyhedron permutation");
        Ok(())
    }

    fn remap_polyhedron_vertices(&mut self, old2new: &[Index]) {
        let mut lists = self.mesh.polyhedron_vertices.write();
        for polyhedron in indices(lists.nb_elements()) {
            lists.modify_value(polyhedron, |list| remap_indices(list, old2new));
        }
    }

    /// Remove masked vertices after deleting every polyhedron using one of
    /// them. Returns the vertex `old2new` table.
    pub fn delete_vertices(&mut self, to_delete: &[bool]) -> Result<Vec<Index>, MeshError> {
        validate_mask(to_delete, self.mesh.nb_vertices())?;
        let old2new = mapping_after_deletion(to_delete);
        if nb_deleted(to_delete) == 0 {
            return Ok(old2new);
        }
        let doomed: Vec<bool> = self
            .mesh
            .polyhedron_vertices
            .read()
            .values()
            .iter()
            .map(|list| list.iter().any(|&v| to_delete[v as usize]))
            .collect();
        if doomed.contains(&true) {
            self.delete_polyhedra(&doomed)?;
        }
        self.remap_polyhedron_vertices(&old2new);
        self.mesh.vertices.delete_vertices(to_delete)?;
        log::debug!(
            "deleted {} vertices, {} left",
            nb_deleted(to_delete),
            self.mesh.nb_vertices()
        );
        crate::debug_invariants!(self.mesh.validate_structure(), "solid vertex deletion");
        Ok(old2new)
    }

    pub fn permute_vertices(&mut self, permutation: &[Index]) -> Result<(), MeshError> {
        validate_permutation(permutation, self.mesh.nb_vertices())?;
        let old2new = old2new_permutation(permutation);
        self.remap_polyhedron_vertices(&old2new);
        self.mesh.vertices.permute_vertices(permutation)?;
        crate::debug_invariants!(self.mesh.validate_structure(), "solid vertex permutation");
        Ok(())
    }

    pub fn delete_isolated_vertices(&mut self) -> Result<Vec<Index>, MeshError> {
        let used: HashSet<Index> = self
            .mesh
            .polyhedron_vertices
            .read()
            .values()
            .iter()
            .flatten()
            .copied()
            .collect();
        let to_delete = indices(self.mesh.nb_vertices())
            .map(|vertex| !used.contains(&vertex))
            .collect_vec();
        self.delete_vertices(&to_delete)
    }
}

impl SolidMesh {
    pub fn builder(&mut self) -> SolidMeshBuilder<'_> {
        SolidMeshBuilder::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DebugInvariants;

    const UNIT_TET: [[f64; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];

    /// Tetrahedra (0,1,2,3) and (1,2,3,4) glued on facet {1,2,3}.
    fn two_tets() -> SolidMesh {
        let mut mesh = SolidMesh::new();
        let mut builder = mesh.builder();
        for p in UNIT_TET {
            builder.create_point(p).unwrap();
        }
        builder.create_point([1.0, 1.0, 1.0]).unwrap();
        builder.create_tetrahedron([0, 1, 2, 3]).unwrap();
        builder.create_tetrahedron([1, 2, 3, 4]).unwrap();
        builder.compute_polyhedron_adjacencies().unwrap();
        mesh
    }

    #[test]
    fn definitions_are_checked() {
        let mut mesh = SolidMesh::new();
        let mut builder = mesh.builder();
        builder.create_vertices(4);
        assert!(builder.create_polyhedron(PolyhedronKind::Hexahedron, &[0, 1, 2, 3]).is_err());
        assert!(builder.create_polyhedron(PolyhedronKind::Polyhedron, &[0, 1, 2, 3]).is_err());
        assert!(builder.create_tetrahedron([0, 1, 2, 9]).is_err());
        assert!(
            builder
                .create_polyhedron_with_facets(&[0, 1, 2, 3], vec![vec![0, 1, 2]; 3])
                .is_err()
        );
        assert_eq!(mesh.nb_polyhedra(), 0);
    }

    #[test]
    fn shared_facet_is_linked() {
        let mesh = two_tets();
        assert_eq!(mesh.polyhedron_adjacent(PolyhedronFacet::new(0, 0)).unwrap(), Some(1));
        assert_eq!(mesh.polyhedron_adjacent(PolyhedronFacet::new(1, 3)).unwrap(), Some(0));
        assert_eq!(
            mesh.polyhedron_adjacent_facet(PolyhedronFacet::new(0, 0)).unwrap(),
            Some(PolyhedronFacet::new(1, 3))
        );
        assert_eq!(mesh.polyhedron_facets_on_border(0).unwrap().len(), 3);
        assert!(mesh.is_polyhedron_facet_on_border(PolyhedronFacet::new(1, 0)).unwrap());
    }

    #[test]
    fn facets_with_the_same_orientation_stay_apart() {
        let mut mesh = SolidMesh::new();
        let mut builder = mesh.builder();
        builder.create_vertices(5);
        // Both apexes sit on the same side of facet {0, 1, 2}.
        builder.create_tetrahedron([0, 1, 2, 3]).unwrap();
        builder.create_tetrahedron([0, 1, 2, 4]).unwrap();
        builder
            .compute_polyhedron_adjacencies_with(AdjacencyOptions::strict())
            .unwrap();
        for polyhedron in 0..2 {
            let facet = PolyhedronFacet::new(polyhedron, 3);
            assert_eq!(mesh.polyhedron_facet_vertices(facet).unwrap(), vec![0, 2, 1]);
            assert!(mesh.is_polyhedron_facet_on_border(facet).unwrap());
            assert_eq!(mesh.polyhedron_facets_on_border(polyhedron).unwrap().len(), 4);
        }
    }

    #[test]
    fn deleting_the_representative_keeps_the_vertex_reachable() {
        let mut mesh = two_tets();
        let mut builder = mesh.builder();
        let apex = builder.create_vertex();
        // Glued to facet {0, 1, 2} of tetrahedron 0 from below.
        let last = builder.create_tetrahedron([0, 2, 1, apex]).unwrap();
        builder.compute_polyhedron_adjacencies().unwrap();
        assert_eq!(mesh.polyhedra_around_vertex(1).unwrap().len(), 3);
        let representative = mesh.polyhedron_around_vertex(1).unwrap().unwrap();
        assert_eq!(representative.polyhedron_id, last);

        mesh.builder().delete_polyhedra(&[false, false, true]).unwrap();
        let representative = mesh.polyhedron_around_vertex(1).unwrap().unwrap();
        assert_eq!(mesh.polyhedron_vertex(representative).unwrap(), 1);
        let mut around: Vec<Index> = mesh
            .polyhedra_around_vertex(1)
            .unwrap()
            .into_iter()
            .map(|corner| corner.polyhedron_id)
            .collect();
        around.sort_unstable();
        assert_eq!(around, vec![0, 1]);
        assert!(mesh.validate_invariants().is_ok());
    }

    #[test]
    fn polyhedra_around_shared_vertex() {
        let mesh = two_tets();
        assert_eq!(
            mesh.polyhedra_around_vertex(1).unwrap(),
            vec![PolyhedronVertex::new(1, 0), PolyhedronVertex::new(0, 1)]
        );
        assert_eq!(mesh.polyhedra_around_vertex(0).unwrap(), vec![PolyhedronVertex::new(0, 0)]);
        assert_eq!(mesh.vertex_in_polyhedron(1, 4).unwrap(), Some(3));
        assert_eq!(mesh.vertex_in_polyhedron(1, 0).unwrap(), None);
    }

    #[test]
    fn facet_vertices_follow_the_kind_table() {
        let mesh = two_tets();
        let facet = PolyhedronFacet::new(0, 1);
        assert_eq!(mesh.polyhedron_facet_vertices(facet).unwrap(), vec![0, 3, 2]);
        assert_eq!(mesh.nb_polyhedron_facet_vertices(facet).unwrap(), 3);
        assert_eq!(
            mesh.polyhedron_facet_vertex(crate::topology::local::PolyhedronFacetVertex::new(
                facet, 1
            ))
            .unwrap(),
            3
        );
        assert!((mesh.polyhedron_volume(0).unwrap() - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn hexahedron_and_pyramid_share_a_quad() {
        let mut mesh = SolidMesh::new();
        let mut builder = mesh.builder();
        builder.create_vertices(9);
        builder
            .create_polyhedron(PolyhedronKind::Hexahedron, &[0, 1, 2, 3, 4, 5, 6, 7])
            .unwrap();
        builder
            .create_polyhedron(PolyhedronKind::Pyramid, &[4, 5, 6, 7, 8])
            .unwrap();
        builder.compute_polyhedron_adjacencies().unwrap();
        assert_eq!(mesh.polyhedron_adjacent(PolyhedronFacet::new(0, 1)).unwrap(), Some(1));
        assert_eq!(mesh.polyhedron_adjacent(PolyhedronFacet::new(1, 0)).unwrap(), Some(0));
        assert_eq!(mesh.nb_polyhedron_facets(0).unwrap(), 6);
        assert_eq!(mesh.nb_polyhedron_facets(1).unwrap(), 5);
    }

    #[test]
    fn irregular_polyhedron_uses_its_own_facets() {
        let mut mesh = two_tets();
        let mut builder = mesh.builder();
        // Same shape as tetrahedron 0, described explicitly and placed on
        // the other side of facet {0, 1, 2}.
        let apex = builder.create_point([0.0, 0.0, -1.0]).unwrap();
        let facets = vec![vec![0, 1, 2], vec![0, 3, 1], vec![1, 3, 2], vec![2, 3, 0]];
        let p = builder
            .create_polyhedron_with_facets(&[0, 1, 2, apex], facets)
            .unwrap();
        builder.compute_polyhedron_adjacencies().unwrap();
        assert_eq!(mesh.polyhedron_kind(p).unwrap(), PolyhedronKind::Polyhedron);
        assert_eq!(mesh.polyhedron_adjacent(PolyhedronFacet::new(p, 0)).unwrap(), Some(0));
        assert_eq!(mesh.polyhedron_adjacent(PolyhedronFacet::new(0, 3)).unwrap(), Some(p));
    }

    #[test]
    fn non_manifold_facets() {
        let mut mesh = SolidMesh::new();
        let mut builder = mesh.builder();
        builder.create_vertices(6);
        builder.create_tetrahedron([0, 1, 2, 3]).unwrap();
        builder.create_tetrahedron([1, 2, 3, 4]).unwrap();
        builder.create_tetrahedron([1, 2, 3, 5]).unwrap();
        assert_eq!(
            builder.compute_polyhedron_adjacencies_with(AdjacencyOptions::strict()),
            Err(MeshError::NonManifold {
                vertices: vec![1, 2, 3]
            })
        );
        assert!(builder.mesh().polyhedron_facets_on_border(0).unwrap().len() == 4);
        builder.compute_polyhedron_adjacencies().unwrap();
        assert_eq!(mesh.polyhedron_adjacent(PolyhedronFacet::new(0, 0)).unwrap(), Some(1));
        assert_eq!(mesh.polyhedron_facets_on_border(2).unwrap().len(), 4);
    }

    #[test]
    fn deletion_clears_links_and_rebinds() {
        let mut mesh = two_tets();
        let old2new = mesh.builder().delete_polyhedra(&[true, false]).unwrap();
        assert_eq!(old2new, vec![NO_ID, 0]);
        assert_eq!(mesh.nb_polyhedra(), 1);
        assert_eq!(mesh.polyhedron_facets_on_border(0).unwrap().len(), 4);
        assert!(mesh.isolated_vertex(0).unwrap());
        assert_eq!(
            mesh.polyhedron_around_vertex(1).unwrap(),
            Some(PolyhedronVertex::new(0, 0))
        );

        let old2new = mesh.builder().delete_isolated_vertices().unwrap();
        assert_eq!(old2new[0], NO_ID);
        assert_eq!(mesh.nb_vertices(), 4);
        assert_eq!(mesh.polyhedron_vertices(0).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(mesh.point(3).unwrap(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn vertex_deletion_cascades() {
        let mut mesh = two_tets();
        mesh.builder().delete_vertices(&[false, false, false, false, true]).unwrap();
        assert_eq!(mesh.nb_polyhedra(), 1);
        assert_eq!(mesh.nb_vertices(), 4);
        assert!(mesh.polyhedron_adjacent(PolyhedronFacet::new(0, 0)).unwrap().is_none());
    }

    #[test]
    fn permutations_keep_topology() {
        let mut mesh = two_tets();
        let mut builder = mesh.builder();
        builder.permute_polyhedra(&[1, 0]).unwrap();
        builder.permute_vertices(&[4, 3, 2, 1, 0]).unwrap();
        assert_eq!(mesh.polyhedron_vertices(0).unwrap(), vec![3, 2, 1, 0]);
        assert_eq!(mesh.polyhedron_vertices(1).unwrap(), vec![4, 3, 2, 1]);
        assert_eq!(mesh.polyhedron_adjacent(PolyhedronFacet::new(0, 3)).unwrap(), Some(1));
        assert_eq!(mesh.point(0).unwrap(), [1.0, 1.0, 1.0]);
        let around = mesh.polyhedron_around_vertex(3).unwrap().unwrap();
        assert_eq!(mesh.polyhedron_vertex(around).unwrap(), 3);
    }

    #[test]
    fn set_polyhedron_vertex_rebinds_previous_vertex() {
        let mut mesh = two_tets();
        let extra = mesh.builder().create_vertex();
        // Vertex 0 only appears in corner (0, 0).
        mesh.builder()
            .set_polyhedron_vertex(PolyhedronVertex::new(0, 0), extra)
            .unwrap();
        assert!(mesh.isolated_vertex(0).unwrap());
        assert_eq!(
            mesh.polyhedron_around_vertex(extra).unwrap(),
            Some(PolyhedronVertex::new(0, 0))
        );
    }
}
