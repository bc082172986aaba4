//! Hierarchical array store consumed by the reader.
//!
//! A plot file is a tree of named groups. Each group carries scalar or array
//! attributes and n-dimensional, row-major datasets. [`ArrayStore`] is the only
//! view of the file the reader relies on; [`memory::InMemoryStore`] is the
//! bundled implementation and [`file::StoreHandle`] gives it open/close
//! semantics.

pub mod file;
pub mod memory;

use crate::pvld_error::PvldError;
use num_traits::NumCast;
use serde::{Deserialize, Serialize};

/// Scalar or array attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Attribute {
    Int(i64),
    Float(f64),
    Text(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
}

impl Attribute {
    fn type_name(&self) -> &'static str {
        match self {
            Attribute::Int(_) => "int",
            Attribute::Float(_) => "float",
            Attribute::Text(_) => "text",
            Attribute::IntArray(_) => "int array",
            Attribute::FloatArray(_) => "float array",
        }
    }

    /// Read as an integer scalar; integral floats are accepted.
    pub fn as_int(&self, name: &str) -> Result<i64, PvldError> {
        match self {
            Attribute::Int(v) => Ok(*v),
            Attribute::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            other => Err(mismatch(name, "int", other.type_name())),
        }
    }

    pub fn as_float(&self, name: &str) -> Result<f64, PvldError> {
        match self {
            Attribute::Float(v) => Ok(*v),
            Attribute::Int(v) => Ok(*v as f64),
            other => Err(mismatch(name, "float", other.type_name())),
        }
    }

    pub fn as_text(&self, name: &str) -> Result<&str, PvldError> {
        match self {
            Attribute::Text(s) => Ok(s),
            other => Err(mismatch(name, "text", other.type_name())),
        }
    }

    /// Read as an integer array; a scalar is promoted to a one-element array.
    pub fn as_int_array(&self, name: &str) -> Result<Vec<i64>, PvldError> {
        match self {
            Attribute::IntArray(v) => Ok(v.clone()),
            Attribute::Int(v) => Ok(vec![*v]),
            other => Err(mismatch(name, "int array", other.type_name())),
        }
    }
}

/// Dataset payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum ArrayData {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int(v) => v.len(),
            ArrayData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every element to `T`, failing on the first value `T` cannot hold.
    pub fn into_vec<T: NumCast>(self, name: &str) -> Result<Vec<T>, PvldError> {
        fn cast_all<S: Copy + num_traits::ToPrimitive, T: NumCast>(
            src: Vec<S>,
            name: &str,
            found: &'static str,
        ) -> Result<Vec<T>, PvldError> {
            src.into_iter()
                .map(|v| {
                    T::from(v).ok_or_else(|| {
                        mismatch(name, std::any::type_name::<T>(), found)
                    })
                })
                .collect()
        }
        match self {
            ArrayData::Int(v) => cast_all(v, name, "int"),
            ArrayData::Float(v) => cast_all(v, name, "float"),
        }
    }

    /// Pick elements by flat index, in the given order.
    pub fn gather(&self, indices: impl IntoIterator<Item = usize>) -> ArrayData {
        match self {
            ArrayData::Int(v) => ArrayData::Int(indices.into_iter().map(|i| v[i]).collect()),
            ArrayData::Float(v) => ArrayData::Float(indices.into_iter().map(|i| v[i]).collect()),
        }
    }
}

/// Name and shape of one dataset in a group.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DatasetShape {
    pub name: String,
    pub dims: Vec<usize>,
}

impl DatasetShape {
    /// Number of scalars per leading-dimension row.
    pub fn row_width(&self) -> usize {
        self.dims.iter().skip(1).product()
    }

    pub fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(0)
    }
}

/// Rectangular selection of a dataset: one `(offset, length)` per dimension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Hyperslab {
    pub offsets: Vec<usize>,
    pub lengths: Vec<usize>,
}

impl Hyperslab {
    /// Rows `start..start + count` of a dataset with the given shape, keeping
    /// every trailing dimension whole.
    pub fn rows(start: usize, count: usize, dims: &[usize]) -> Self {
        let mut offsets = vec![0; dims.len().max(1)];
        let mut lengths: Vec<usize> = if dims.is_empty() {
            vec![count]
        } else {
            dims.to_vec()
        };
        offsets[0] = start;
        lengths[0] = count;
        Hyperslab { offsets, lengths }
    }

    pub fn rank(&self) -> usize {
        self.offsets.len()
    }

    pub fn len(&self) -> usize {
        self.lengths.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only access to a hierarchical array store.
///
/// Group handles are opaque values produced by [`ArrayStore::open_group`];
/// [`ArrayStore::root`] is the top of the tree.
pub trait ArrayStore {
    /// Group handle type.
    type Group: Clone;

    fn root(&self) -> Self::Group;

    /// Open a child group; fails with [`PvldError::MissingGroup`] if absent.
    fn open_group(&self, parent: &Self::Group, name: &str) -> Result<Self::Group, PvldError>;

    /// Release a group handle.
    fn close_group(&self, _group: Self::Group) {}

    /// Display path of a group, used in error messages.
    fn group_path(&self, group: &Self::Group) -> String;

    fn attribute_exists(&self, group: &Self::Group, name: &str) -> bool;

    fn read_attribute(&self, group: &Self::Group, name: &str) -> Result<Attribute, PvldError>;

    /// Names and shapes of every dataset directly inside `group`.
    fn datasets(&self, group: &Self::Group) -> Result<Vec<DatasetShape>, PvldError>;

    /// Names of the groups directly inside `group`.
    fn subgroups(&self, group: &Self::Group) -> Result<Vec<String>, PvldError>;

    /// Read a dataset, whole or restricted to a hyperslab, in row-major order.
    fn read_dataset(
        &self,
        group: &Self::Group,
        name: &str,
        selection: Option<&Hyperslab>,
    ) -> Result<ArrayData, PvldError>;

    /// Whether `name` is a child group of `parent`.
    fn has_group(&self, parent: &Self::Group, name: &str) -> bool {
        self.subgroups(parent)
            .map(|names| names.iter().any(|n| n == name))
            .unwrap_or(false)
    }
}

/// Typed convenience reads on top of [`ArrayStore`].
pub trait ArrayStoreExt: ArrayStore {
    fn read_values<T: NumCast>(
        &self,
        group: &Self::Group,
        name: &str,
        selection: Option<&Hyperslab>,
    ) -> Result<Vec<T>, PvldError> {
        self.read_dataset(group, name, selection)?.into_vec(name)
    }

    /// First attribute among `names` that exists, read as an integer.
    fn read_int_attribute_any(
        &self,
        group: &Self::Group,
        names: &[&str],
    ) -> Result<Option<i64>, PvldError> {
        for name in names {
            if self.attribute_exists(group, name) {
                return self.read_attribute(group, name)?.as_int(name).map(Some);
            }
        }
        Ok(None)
    }

    fn read_optional_attribute(
        &self,
        group: &Self::Group,
        name: &str,
    ) -> Result<Option<Attribute>, PvldError> {
        if self.attribute_exists(group, name) {
            self.read_attribute(group, name).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl<S: ArrayStore + ?Sized> ArrayStoreExt for S {}

fn mismatch(name: &str, expected: &'static str, found: &str) -> PvldError {
    PvldError::TypeMismatch {
        name: name.to_string(),
        expected,
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_slab_keeps_trailing_dims() {
        let slab = Hyperslab::rows(4, 2, &[10, 8]);
        assert_eq!(slab.offsets, vec![4, 0]);
        assert_eq!(slab.lengths, vec![2, 8]);
        assert_eq!(slab.len(), 16);
        let flat = Hyperslab::rows(1, 3, &[]);
        assert_eq!(flat.rank(), 1);
    }

    #[test]
    fn array_data_casts_and_rejects() {
        let ints = ArrayData::Float(vec![1.0, 2.0]).into_vec::<i32>("x").unwrap();
        assert_eq!(ints, vec![1, 2]);
        let err = ArrayData::Int(vec![-1]).into_vec::<usize>("idx").unwrap_err();
        assert_eq!(err.kind(), crate::pvld_error::ErrorKind::TypeMismatch);
    }

    #[test]
    fn attribute_promotions() {
        assert_eq!(Attribute::Float(4.0).as_int("n").unwrap(), 4);
        assert!(Attribute::Float(4.5).as_int("n").is_err());
        assert_eq!(Attribute::Int(7).as_int_array("p").unwrap(), vec![7]);
        assert!(Attribute::Text("a".into()).as_float("t").is_err());
    }
}
