//! Process-wide node index and coordinate cache.
//!
//! Raw node ids in a plot file are neither contiguous nor zero-based. The cache
//! holds every node's raw id and coordinates in file order ("reader-local
//! positions") plus a dense lookup table over `raw - min_raw`.

use crate::algs::collective::collective_read;
use crate::algs::communicator::Communicator;
use crate::io::{ArrayStore, ArrayStoreExt};
use num_traits::NumCast;
use crate::pvld_error::PvldError;
use crate::topology::element_class::ElementClass;

pub const NODE_INDEX_DATASET: &str = "Index";
pub const NODE_COORDINATE_DATASET: &str = "Coordinate";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeCache {
    node_idx: Vec<i64>,
    node_crd: Vec<f64>,
    node_map: Vec<Option<usize>>,
    min_raw: i64,
}

impl NodeCache {
    /// Build from raw ids and `3 * ids.len()` coordinates.
    pub fn from_arrays(node_idx: Vec<i64>, node_crd: Vec<f64>) -> Result<Self, PvldError> {
        if node_crd.len() != 3 * node_idx.len() {
            return Err(PvldError::InconsistentMetadata(format!(
                "{} node ids but {} coordinate values",
                node_idx.len(),
                node_crd.len()
            )));
        }
        let (min_raw, max_raw) = match (node_idx.iter().min(), node_idx.iter().max()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => {
                return Ok(Self {
                    node_idx,
                    node_crd,
                    node_map: Vec::new(),
                    min_raw: 0,
                });
            }
        };
        let span = usize::try_from(max_raw - min_raw)
            .map_err(|_| PvldError::InconsistentMetadata("node id span overflows".into()))?
            + 1;
        let mut node_map = vec![None; span];
        for (pos, &raw) in node_idx.iter().enumerate() {
            let slot = &mut node_map[(raw - min_raw) as usize];
            if slot.is_some() {
                return Err(PvldError::InconsistentMetadata(format!(
                    "node id {raw} appears more than once"
                )));
            }
            *slot = Some(pos);
        }
        log::debug!(
            "node cache: {} nodes, raw ids {min_raw}..={max_raw}",
            node_idx.len()
        );
        Ok(Self {
            node_idx,
            node_crd,
            node_map,
            min_raw,
        })
    }

    /// Read `Node/Index` and `Node/Coordinate` on rank 0 and share them.
    pub fn load<S, C>(store: &S, comm: &C) -> Result<Self, PvldError>
    where
        S: ArrayStore,
        C: Communicator + ?Sized,
    {
        let node_idx: Vec<i64> =
            collective_read(comm, || read_node_dataset(store, NODE_INDEX_DATASET))?;
        let node_crd: Vec<f64> =
            collective_read(comm, || read_node_dataset(store, NODE_COORDINATE_DATASET))?;
        Self::from_arrays(node_idx, node_crd)
    }

    /// Reader-local position of raw node id `raw`.
    pub fn position(&self, raw: i64) -> Option<usize> {
        let offset = usize::try_from(raw.checked_sub(self.min_raw)?).ok()?;
        self.node_map.get(offset).copied().flatten()
    }

    pub fn coordinate(&self, pos: usize) -> [f64; 3] {
        let c = &self.node_crd[3 * pos..3 * pos + 3];
        [c[0], c[1], c[2]]
    }

    pub fn raw_id(&self, pos: usize) -> i64 {
        self.node_idx[pos]
    }

    pub fn len(&self) -> usize {
        self.node_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_idx.is_empty()
    }

    pub fn min_raw(&self) -> i64 {
        self.min_raw
    }

    /// Dense lookup over `raw - min_raw`; `None` marks unused ids.
    pub fn node_map(&self) -> &[Option<usize>] {
        &self.node_map
    }
}

/// Whole `Node/<name>` dataset; the group is released on every path.
fn read_node_dataset<S, T>(store: &S, name: &str) -> Result<Vec<T>, PvldError>
where
    S: ArrayStore,
    T: NumCast,
{
    let g = store.open_group(&store.root(), ElementClass::Node.group_name())?;
    let out = match store.datasets(&g) {
        Ok(shapes) if shapes.iter().any(|d| d.name == name) => store.read_values(&g, name, None),
        Ok(_) => Err(PvldError::missing_dataset(&store.group_path(&g), name)),
        Err(e) => Err(e),
    };
    store.close_group(g);
    out
}
