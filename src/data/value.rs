//! Value protocol of attribute columns.
//!
//! Every type stored in a column implements [`AttributeValue`], which
//! describes how a value degrades to scalars for generic consumers
//! (colormaps, exporters) and how it is linearly recombined when new
//! elements are created by subdivision. Both behaviours are resolved
//! statically from the value type when the column is created.

use num_traits::{Float, FromPrimitive, ToPrimitive};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::mesh_error::MeshError;
use crate::topology::index::{Index, LocalIndex};
use crate::topology::local::{
    PolygonEdge, PolygonVertex, PolyhedronFacet, PolyhedronFacetVertex, PolyhedronVertex,
};

/// Weighted combination of source elements: `sum(lambdas[i] * value(indices[i]))`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeLinearInterpolation {
    indices: Vec<Index>,
    lambdas: Vec<f64>,
}

impl AttributeLinearInterpolation {
    pub fn new(indices: Vec<Index>, lambdas: Vec<f64>) -> Result<Self, MeshError> {
        if indices.len() != lambdas.len() {
            return Err(MeshError::InterpolationLengthMismatch {
                indices: indices.len(),
                lambdas: lambdas.len(),
            });
        }
        Ok(Self { indices, lambdas })
    }

    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    pub fn lambdas(&self) -> &[f64] {
        &self.lambdas
    }

    /// Sources paired with their weights.
    pub fn terms(&self) -> impl Iterator<Item = (Index, f64)> + '_ {
        self.indices.iter().copied().zip(self.lambdas.iter().copied())
    }
}

/// Contract for any type stored in an attribute column.
///
/// Defaults describe an opaque value: not convertible to scalars, one item,
/// no interpolation rule (interpolated elements get the column default).
pub trait AttributeValue: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Stable name, used as the archive type tag.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether the value can be degraded to scalars.
    fn is_genericable() -> bool {
        false
    }

    /// Number of scalar items in one value.
    fn nb_items() -> LocalIndex {
        1
    }

    fn converted_value(&self) -> f32 {
        0.0
    }

    fn converted_item_value(&self, _item: LocalIndex) -> f32 {
        self.converted_value()
    }

    /// Linear recombination of source values, `None` when the type has no rule.
    fn interpolate(
        _interpolation: &AttributeLinearInterpolation,
        _value_of: &dyn Fn(Index) -> Self,
    ) -> Option<Self> {
        None
    }
}

/// Weighted sum of scalar values; the first value is returned exactly when all
/// sources agree, so interpolating a uniform field does not drift.
fn interpolate_scalar<F: Float + FromPrimitive>(
    interpolation: &AttributeLinearInterpolation,
    value_of: &dyn Fn(Index) -> F,
) -> Option<F> {
    let first = value_of(*interpolation.indices().first()?);
    let mut is_same = true;
    let mut result = F::zero();
    for (index, lambda) in interpolation.terms() {
        let value = value_of(index);
        is_same &= value == first;
        result = result + F::from_f64(lambda)? * value;
    }
    Some(if is_same { first } else { result })
}

fn interpolate_array<F: Float + FromPrimitive, const N: usize>(
    interpolation: &AttributeLinearInterpolation,
    value_of: &dyn Fn(Index) -> [F; N],
) -> Option<[F; N]> {
    let first = value_of(*interpolation.indices().first()?);
    let mut is_same = true;
    let mut result = [F::zero(); N];
    for (index, lambda) in interpolation.terms() {
        let value = value_of(index);
        let lambda = F::from_f64(lambda)?;
        for (r, (&v, &f)) in result.iter_mut().zip(value.iter().zip(first.iter())) {
            is_same &= v == f;
            *r = *r + lambda * v;
        }
    }
    Some(if is_same { first } else { result })
}

macro_rules! impl_scalar_value {
    ($($t:ty),* $(,)?) => {$(
        impl AttributeValue for $t {
            fn type_name() -> &'static str {
                stringify!($t)
            }

            fn is_genericable() -> bool {
                true
            }

            fn converted_value(&self) -> f32 {
                self.to_f32().unwrap_or(0.0)
            }
        }
    )*};
}

impl_scalar_value!(i8, u8, i16, u16, i32, u32, i64, u64, usize, isize);

macro_rules! impl_float_value {
    ($($t:ty),* $(,)?) => {$(
        impl AttributeValue for $t {
            fn type_name() -> &'static str {
                stringify!($t)
            }

            fn is_genericable() -> bool {
                true
            }

            fn converted_value(&self) -> f32 {
                self.to_f32().unwrap_or(0.0)
            }

            fn interpolate(
                interpolation: &AttributeLinearInterpolation,
                value_of: &dyn Fn(Index) -> Self,
            ) -> Option<Self> {
                interpolate_scalar(interpolation, value_of)
            }
        }
    )*};
}

impl_float_value!(f32, f64);

impl AttributeValue for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn is_genericable() -> bool {
        true
    }

    fn converted_value(&self) -> f32 {
        if *self { 1.0 } else { 0.0 }
    }
}

macro_rules! impl_float_array_value {
    ($t:ty; $($n:literal),*) => {$(
        impl AttributeValue for [$t; $n] {
            fn type_name() -> &'static str {
                concat!("[", stringify!($t), "; ", $n, "]")
            }

            fn is_genericable() -> bool {
                true
            }

            fn nb_items() -> LocalIndex {
                $n
            }

            fn converted_value(&self) -> f32 {
                self.converted_item_value(0)
            }

            fn converted_item_value(&self, item: LocalIndex) -> f32 {
                self.get(item as usize)
                    .and_then(|v| v.to_f32())
                    .unwrap_or(0.0)
            }

            fn interpolate(
                interpolation: &AttributeLinearInterpolation,
                value_of: &dyn Fn(Index) -> Self,
            ) -> Option<Self> {
                interpolate_array(interpolation, value_of)
            }
        }
    )*};
}

impl_float_array_value!(f32; 2, 3, 4);
impl_float_array_value!(f64; 2, 3, 4);

macro_rules! impl_index_array_value {
    ($($n:literal),*) => {$(
        impl AttributeValue for [Index; $n] {
            fn type_name() -> &'static str {
                concat!("[u32; ", $n, "]")
            }

            fn is_genericable() -> bool {
                true
            }

            fn nb_items() -> LocalIndex {
                $n
            }

            fn converted_value(&self) -> f32 {
                self.converted_item_value(0)
            }

            fn converted_item_value(&self, item: LocalIndex) -> f32 {
                self.get(item as usize)
                    .and_then(|v| v.to_f32())
                    .unwrap_or(0.0)
            }
        }
    )*};
}

impl_index_array_value!(2, 3, 4);

macro_rules! impl_opaque_value {
    ($($t:ty => $name:literal),* $(,)?) => {$(
        impl AttributeValue for $t {
            fn type_name() -> &'static str {
                $name
            }
        }
    )*};
}

impl_opaque_value!(
    String => "String",
    Vec<Index> => "Vec<u32>",
    Vec<f64> => "Vec<f64>",
    Vec<Vec<Index>> => "Vec<Vec<u32>>",
    PolygonVertex => "PolygonVertex",
    PolygonEdge => "PolygonEdge",
    PolyhedronVertex => "PolyhedronVertex",
    PolyhedronFacet => "PolyhedronFacet",
    PolyhedronFacetVertex => "PolyhedronFacetVertex",
    Vec<PolygonVertex> => "Vec<PolygonVertex>",
    Vec<PolyhedronVertex> => "Vec<PolyhedronVertex>",
);
