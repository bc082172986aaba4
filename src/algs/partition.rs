//! Block partitioning of a globally ordered entity range.
//!
//! A [`Partition`] is a monotonic offset array: block `b` owns the entities
//! `offsets[b]..offsets[b + 1]`. Offsets are built once, either by splitting
//! the range evenly or from a `partition` attribute stored with the class, and
//! never change afterwards. Zero-sized blocks are collapsed away on
//! construction.

use crate::io::{ArrayStore, ArrayStoreExt};
use crate::pvld_error::PvldError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Block count used when nothing else is configured.
pub const DEFAULT_BLOCK_COUNT: usize = 32;

/// Name of the per-class attribute holding stored offsets.
pub const PARTITION_ATTRIBUTE: &str = "partition";

/// How a class range is divided into blocks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PartitionStrategy {
    /// Split into this many near-equal blocks.
    Equal(usize),
    /// Use the stored `partition` attribute, or a single block without one.
    Stored,
}

impl Default for PartitionStrategy {
    fn default() -> Self {
        PartitionStrategy::Equal(DEFAULT_BLOCK_COUNT)
    }
}

/// Monotonic block offsets over `0..count`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    offsets: Vec<usize>,
}

impl Partition {
    /// Partition of an empty range (no blocks).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Split `count` entities into `nparts` blocks; the first `count % nparts`
    /// blocks receive one extra entity.
    pub fn equal(count: usize, nparts: usize) -> Self {
        if count == 0 {
            return Self::empty();
        }
        let nparts = nparts.max(1);
        let avg = count / nparts;
        let rem = count % nparts;
        let mut offsets = Vec::with_capacity(nparts + 1);
        offsets.push(0);
        let mut acc = 0;
        for b in 0..nparts {
            acc += avg + usize::from(b < rem);
            offsets.push(acc);
        }
        Self::collapsed(offsets)
    }

    /// Validate stored offsets against `count` and collapse empty blocks.
    pub fn from_stored(stored: &[i64], count: usize) -> Result<Self, PvldError> {
        if count == 0 {
            return Ok(Self::empty());
        }
        if stored.len() < 2 {
            return Err(PvldError::InconsistentMetadata(format!(
                "stored partition needs at least two offsets, found {}",
                stored.len()
            )));
        }
        let mut offsets = Vec::with_capacity(stored.len());
        for &o in stored {
            let o = usize::try_from(o).map_err(|_| {
                PvldError::InconsistentMetadata(format!("negative partition offset {o}"))
            })?;
            if offsets.last().is_some_and(|&prev| o < prev) {
                return Err(PvldError::InconsistentMetadata(format!(
                    "partition offsets decrease: {stored:?}"
                )));
            }
            offsets.push(o);
        }
        if offsets[0] != 0 || offsets[offsets.len() - 1] != count {
            return Err(PvldError::InconsistentMetadata(format!(
                "partition offsets must span 0..{count}, found {}..{}",
                offsets[0],
                offsets[offsets.len() - 1]
            )));
        }
        Ok(Self::collapsed(offsets))
    }

    fn collapsed(mut offsets: Vec<usize>) -> Self {
        offsets.dedup();
        if offsets.len() < 2 {
            offsets.clear();
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn block_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Total number of partitioned entities.
    pub fn count(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Entity range of block `b`, `None` when out of range.
    pub fn range(&self, b: usize) -> Option<Range<usize>> {
        if b < self.block_count() {
            Some(self.offsets[b]..self.offsets[b + 1])
        } else {
            None
        }
    }

    pub fn block_len(&self, b: usize) -> usize {
        self.range(b).map_or(0, |r| r.len())
    }

    /// Block owning entity `index`.
    pub fn block_of(&self, index: usize) -> Option<usize> {
        if index >= self.count() {
            return None;
        }
        // last offset <= index
        Some(self.offsets.partition_point(|&o| o <= index) - 1)
    }

    /// Sum the per-entity `weights` block by block, as cumulative offsets.
    pub fn accumulate(&self, weights: &[usize]) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.offsets.len());
        out.push(0);
        let mut acc = 0;
        for b in 0..self.block_count() {
            if let Some(r) = self.range(b) {
                acc += weights[r].iter().sum::<usize>();
            }
            out.push(acc);
        }
        out
    }
}

/// Read a class's entity count and build its partition.
///
/// `count_attributes` are tried in order; a group without any of them is a
/// `MissingAttribute` error naming the first.
pub fn build_partition<S: ArrayStore>(
    store: &S,
    group: &S::Group,
    count_attributes: &[&str],
    strategy: PartitionStrategy,
) -> Result<(usize, Partition), PvldError> {
    let Some(n) = store.read_int_attribute_any(group, count_attributes)? else {
        return Err(PvldError::missing_attribute(
            &store.group_path(group),
            count_attributes.first().copied().unwrap_or_default(),
        ));
    };
    let count = usize::try_from(n).map_err(|_| {
        PvldError::InconsistentMetadata(format!(
            "negative entity count {n} in `{}`",
            store.group_path(group)
        ))
    })?;
    if count == 0 {
        return Ok((0, Partition::empty()));
    }
    let partition = match strategy {
        PartitionStrategy::Equal(n) => Partition::equal(count, n),
        PartitionStrategy::Stored => {
            match store.read_optional_attribute(group, PARTITION_ATTRIBUTE)? {
                Some(attr) => Partition::from_stored(&attr.as_int_array(PARTITION_ATTRIBUTE)?, count)?,
                None => Partition::equal(count, 1),
            }
        }
    };
    log::debug!(
        "{}: {count} entities in {} blocks",
        store.group_path(group),
        partition.block_count()
    );
    Ok((count, partition))
}
