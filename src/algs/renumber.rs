//! Block-local renumbering of node references.
//!
//! Element connectivity stores raw node ids. A block only touches a few of the
//! global nodes, so its mesh is built over a dense, block-local index space:
//! distinct nodes are numbered in order of first occurrence in the
//! connectivity stream. The numbering is deterministic and order-dependent.

use crate::pvld_error::PvldError;
use hashbrown::HashMap;

/// Dense renumbering of one block's connectivity.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BlockRemap {
    /// Block-local index → reader-local node position.
    pub vmap: Vec<usize>,
    /// Connectivity rewritten in block-local indices, same layout as the input.
    pub connectivity: Vec<usize>,
}

/// Renumber a stream of reader-local node positions by first occurrence.
pub fn renumber_first_seen<I>(positions: I) -> BlockRemap
where
    I: IntoIterator<Item = usize>,
{
    let positions = positions.into_iter();
    let mut seen: HashMap<usize, usize> = HashMap::with_capacity(positions.size_hint().0);
    let mut remap = BlockRemap::default();
    for pos in positions {
        let next = remap.vmap.len();
        let local = *seen.entry(pos).or_insert_with(|| next);
        if local == next {
            remap.vmap.push(pos);
        }
        remap.connectivity.push(local);
    }
    remap
}

/// Resolve raw node ids through `lookup`, then renumber by first occurrence.
///
/// Fails on the first raw id `lookup` does not know.
pub fn remap_raw_connectivity<F>(raw: &[i64], lookup: F) -> Result<BlockRemap, PvldError>
where
    F: Fn(i64) -> Option<usize>,
{
    let positions = raw
        .iter()
        .map(|&id| {
            lookup(id).ok_or_else(|| {
                PvldError::InconsistentMetadata(format!(
                    "connectivity references unknown node id {id}"
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(renumber_first_seen(positions))
}
