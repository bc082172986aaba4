//! In-memory [`ArrayStore`] with JSON persistence.
//!
//! Groups are addressed by their path from the root. The whole tree is serde
//! (de)serializable, which makes it a convenient fixture format.

use super::{ArrayData, ArrayStore, Attribute, DatasetShape, Hyperslab};
use crate::pvld_error::PvldError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// One stored dataset: row-major values plus their shape.
///
/// Deserialized datasets go through [`MemoryDataset::new`], so a fixture whose
/// shape disagrees with its value count is rejected on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct MemoryDataset {
    pub dims: Vec<usize>,
    pub data: ArrayData,
}

#[derive(Deserialize)]
struct RawDataset {
    dims: Vec<usize>,
    data: ArrayData,
}

impl TryFrom<RawDataset> for MemoryDataset {
    type Error = PvldError;

    fn try_from(raw: RawDataset) -> Result<Self, PvldError> {
        MemoryDataset::new(raw.dims, raw.data)
    }
}

impl MemoryDataset {
    pub fn new(dims: Vec<usize>, data: ArrayData) -> Result<Self, PvldError> {
        let expected: usize = dims.iter().product();
        if expected != data.len() {
            return Err(PvldError::InconsistentMetadata(format!(
                "dataset shape {dims:?} holds {expected} values but {} were given",
                data.len()
            )));
        }
        Ok(Self { dims, data })
    }

    fn select(&self, name: &str, slab: &Hyperslab) -> Result<ArrayData, PvldError> {
        if slab.rank() != self.dims.len().max(1) {
            return Err(PvldError::TypeMismatch {
                name: name.to_string(),
                expected: "hyperslab of matching rank",
                found: format!("rank {} for shape {:?}", slab.rank(), self.dims),
            });
        }
        for (d, (&off, &len)) in slab.offsets.iter().zip(&slab.lengths).enumerate() {
            let extent = self.dims.get(d).copied().unwrap_or(self.data.len());
            if off + len > extent {
                return Err(PvldError::InconsistentMetadata(format!(
                    "hyperslab [{off}, {}) exceeds extent {extent} of `{name}` dimension {d}",
                    off + len
                )));
            }
        }
        Ok(self.data.gather(slab_indices(&self.dims, slab)))
    }
}

/// Flat row-major indices covered by `slab`, in row-major order.
fn slab_indices(dims: &[usize], slab: &Hyperslab) -> Vec<usize> {
    let total = slab.len();
    let mut out = Vec::with_capacity(total);
    if total == 0 {
        return out;
    }
    let rank = slab.rank();
    let extents: Vec<usize> = if dims.is_empty() {
        vec![slab.offsets[0] + slab.lengths[0]]
    } else {
        dims.to_vec()
    };
    let mut strides = vec![1usize; rank];
    for d in (0..rank.saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * extents[d + 1];
    }
    let mut counter = vec![0usize; rank];
    loop {
        let flat: usize = (0..rank)
            .map(|d| (slab.offsets[d] + counter[d]) * strides[d])
            .sum();
        out.push(flat);
        // odometer increment, last dimension fastest
        let mut d = rank;
        loop {
            if d == 0 {
                return out;
            }
            d -= 1;
            counter[d] += 1;
            if counter[d] < slab.lengths[d] {
                break;
            }
            counter[d] = 0;
        }
    }
}

/// A group node of the in-memory tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryGroup {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default)]
    pub datasets: BTreeMap<String, MemoryDataset>,
    #[serde(default)]
    pub groups: BTreeMap<String, MemoryGroup>,
}

impl MemoryGroup {
    /// Child group, created on demand.
    pub fn group_mut(&mut self, name: &str) -> &mut MemoryGroup {
        self.groups.entry(name.to_string()).or_default()
    }

    pub fn set_attribute(&mut self, name: &str, value: Attribute) -> &mut Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    /// Insert an integer dataset; fails if `dims` does not match the value count.
    pub fn insert_ints(
        &mut self,
        name: &str,
        dims: Vec<usize>,
        values: Vec<i64>,
    ) -> Result<&mut Self, PvldError> {
        let ds = MemoryDataset::new(dims, ArrayData::Int(values))?;
        self.datasets.insert(name.to_string(), ds);
        Ok(self)
    }

    /// Insert a floating-point dataset; fails if `dims` does not match the value count.
    pub fn insert_floats(
        &mut self,
        name: &str,
        dims: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<&mut Self, PvldError> {
        let ds = MemoryDataset::new(dims, ArrayData::Float(values))?;
        self.datasets.insert(name.to_string(), ds);
        Ok(self)
    }
}

/// In-memory hierarchical array store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryStore {
    pub root: MemoryGroup,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level group, created on demand.
    pub fn group_mut(&mut self, name: &str) -> &mut MemoryGroup {
        self.root.group_mut(name)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, PvldError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_writer<W: Write>(&self, writer: W) -> Result<(), PvldError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    fn resolve(&self, path: &[String]) -> Result<&MemoryGroup, PvldError> {
        let mut node = &self.root;
        for (depth, name) in path.iter().enumerate() {
            node = node
                .groups
                .get(name)
                .ok_or_else(|| PvldError::MissingGroup(path[..=depth].join("/")))?;
        }
        Ok(node)
    }
}

impl ArrayStore for InMemoryStore {
    type Group = Vec<String>;

    fn root(&self) -> Self::Group {
        Vec::new()
    }

    fn open_group(&self, parent: &Self::Group, name: &str) -> Result<Self::Group, PvldError> {
        let mut path = parent.clone();
        path.push(name.to_string());
        self.resolve(&path)?;
        Ok(path)
    }

    fn group_path(&self, group: &Self::Group) -> String {
        if group.is_empty() {
            "/".to_string()
        } else {
            group.join("/")
        }
    }

    fn attribute_exists(&self, group: &Self::Group, name: &str) -> bool {
        self.resolve(group)
            .map(|g| g.attributes.contains_key(name))
            .unwrap_or(false)
    }

    fn read_attribute(&self, group: &Self::Group, name: &str) -> Result<Attribute, PvldError> {
        self.resolve(group)?
            .attributes
            .get(name)
            .cloned()
            .ok_or_else(|| PvldError::missing_attribute(&self.group_path(group), name))
    }

    fn datasets(&self, group: &Self::Group) -> Result<Vec<DatasetShape>, PvldError> {
        Ok(self
            .resolve(group)?
            .datasets
            .iter()
            .map(|(name, ds)| DatasetShape {
                name: name.clone(),
                dims: ds.dims.clone(),
            })
            .collect())
    }

    fn subgroups(&self, group: &Self::Group) -> Result<Vec<String>, PvldError> {
        Ok(self.resolve(group)?.groups.keys().cloned().collect())
    }

    fn read_dataset(
        &self,
        group: &Self::Group,
        name: &str,
        selection: Option<&Hyperslab>,
    ) -> Result<ArrayData, PvldError> {
        let ds = self
            .resolve(group)?
            .datasets
            .get(name)
            .ok_or_else(|| PvldError::missing_dataset(&self.group_path(group), name))?;
        match selection {
            None => Ok(ds.data.clone()),
            Some(slab) => ds.select(name, slab),
        }
    }
}
