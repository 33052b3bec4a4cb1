//! Point storage for mesh vertices.
//!
//! Coordinates live in a dense `[f64; D]` column named [`POINTS_ATTRIBUTE`]
//! of the vertex attribute manager, so they follow vertex deletion and
//! permutation like any other vertex attribute and interpolate linearly.

use crate::data::attribute::{AttributeHandle, AttributeProperties, ReadOnlyAttribute};
use crate::data::dense::DenseAttribute;
use crate::data::manager::AttributeManager;
use crate::data::value::AttributeValue;
use crate::mesh_error::{ElementKind, MeshError};
use crate::topology::index::Index;

pub const POINTS_ATTRIBUTE: &str = "points";

/// Handle on the point column of a vertex manager.
#[derive(Debug)]
pub struct Coordinates<const D: usize> {
    points: AttributeHandle<DenseAttribute<[f64; D]>>,
}

impl<const D: usize> Coordinates<D>
where
    [f64; D]: AttributeValue,
{
    /// Bind to the point column of `vertices`, creating it if needed.
    pub(crate) fn attach(vertices: &mut AttributeManager) -> Self {
        let points = vertices.attach_column::<[f64; D], _>(POINTS_ATTRIBUTE, |name, nb| {
            DenseAttribute::new(name, [0.0; D], AttributeProperties::new(true, true), nb)
        });
        Self { points }
    }

    pub fn dimension(&self) -> usize {
        D
    }

    fn check(&self, vertex: Index) -> Result<(), MeshError> {
        let len = self.points.read().nb_elements();
        if vertex >= len {
            return Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Vertex,
                index: vertex,
                len,
            });
        }
        Ok(())
    }

    pub fn point(&self, vertex: Index) -> Result<[f64; D], MeshError> {
        self.check(vertex)?;
        Ok(*self.points.read().value(vertex))
    }

    pub fn set_point(&self, vertex: Index, point: [f64; D]) -> Result<(), MeshError> {
        self.check(vertex)?;
        self.points.write().set_value(vertex, point);
        Ok(())
    }

    /// Points of `vertices`, in order.
    pub fn gather(&self, vertices: &[Index]) -> Result<Vec<[f64; D]>, MeshError> {
        let points = self.points.read();
        vertices
            .iter()
            .map(|&v| {
                points.try_value(v).copied().map_err(|_| MeshError::IndexOutOfRange {
                    kind: ElementKind::Vertex,
                    index: v,
                    len: points.nb_elements(),
                })
            })
            .collect()
    }

    /// Copy of every point.
    pub fn points(&self) -> Vec<[f64; D]> {
        self.points.read().values().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_are_a_vertex_column() {
        let mut manager = AttributeManager::new();
        manager.resize(2);
        let coords = Coordinates::<3>::attach(&mut manager);
        coords.set_point(1, [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(coords.point(1).unwrap(), [1.0, 2.0, 3.0]);
        assert!(coords.point(2).is_err());
        assert_eq!(manager.attribute_type(POINTS_ATTRIBUTE), "Dense<[f64; 3]>");

        // Attaching twice binds to the same column.
        let again = Coordinates::<3>::attach(&mut manager);
        assert_eq!(again.point(1).unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(coords.gather(&[1, 0]).unwrap(), vec![[1.0, 2.0, 3.0], [0.0; 3]]);
    }
}
