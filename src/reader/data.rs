//! Block data extraction: element variables, node variables seen through a
//! block's node map, flattened history variables and material ids.

use super::PvldReader;
use crate::algs::collective::collective_read;
use crate::algs::communicator::Communicator;
use crate::algs::history::{
    HISTORY_COUNT_DATASET, HISTORY_VALUE_DATASET, exclusive_prefix, flatten_history,
    history_variable_name, max_history_count, parse_history_name,
};
use crate::algs::missing_parts::append_donor_rows;
use crate::data::block::BlockData;
use crate::data::material::MATERIAL_DATASET;
use crate::data::node_cache::{NODE_COORDINATE_DATASET, NODE_INDEX_DATASET};
use crate::io::file::StoreOpener;
use crate::io::{ArrayStore, ArrayStoreExt, DatasetShape, Hyperslab};
use crate::pvld_error::{PvldError, ResultExt};
use crate::topology::element_class::ElementClass;
use itertools::Itertools;
use std::ops::Range;

/// Name under which the node `Index` dataset is requested from element classes.
pub const NODE_INDEX_ALIAS: &str = "NodeIndex";

impl<O: StoreOpener, C: Communicator> PvldReader<O, C> {
    /// Values of `name` over one block.
    ///
    /// Resolution order: a dataset of `class` itself (one row per element),
    /// then a `Node` dataset gathered through the block's node map (one row
    /// per block-local node), then a history variable `HistoryVariable_<n>`.
    pub fn read_block_data(
        &mut self,
        class: ElementClass,
        block: usize,
        name: &str,
    ) -> Result<BlockData, PvldError> {
        if block >= self.block_count(class) {
            return Ok(BlockData::default());
        }
        self.resolve_block_data(class, block, name)
            .context(|| format!("Failure in read_block_data({class}, {block}, {name})"))
    }

    fn resolve_block_data(
        &mut self,
        class: ElementClass,
        block: usize,
        name: &str,
    ) -> Result<BlockData, PvldError> {
        let direct = self
            .toc
            .class(class)
            .and_then(|t| t.dataset(name))
            .filter(|d| d.name != HISTORY_VALUE_DATASET)
            .cloned();
        if let Some(shape) = direct {
            let range = self.element_range(class, block);
            let mut data = self.read_element_rows(class, &shape, range)?;
            let n_missing = self.missing_for(class, block).len();
            let width = data.row_width();
            append_donor_rows(&mut data.values, width, n_missing);
            data.sync_rows();
            return Ok(data);
        }

        let node_name = if name == NODE_INDEX_ALIAS {
            NODE_INDEX_DATASET
        } else {
            name
        };
        if class.uses_node_connectivity() {
            if let Some(shape) = self.toc.node_dataset(node_name).cloned() {
                return self.read_node_rows(class, block, &shape);
            }
        }

        if let Some(parsed) = parse_history_name(name) {
            let var = parsed.map_err(|_| PvldError::UnknownVariable {
                class,
                variable: name.to_string(),
            })?;
            return self.read_block_history(class, block, var);
        }

        Err(PvldError::UnknownVariable {
            class,
            variable: name.to_string(),
        })
    }

    fn read_element_rows(
        &mut self,
        class: ElementClass,
        shape: &DatasetShape,
        range: Range<usize>,
    ) -> Result<BlockData, PvldError> {
        let mut dims = shape.dims.clone();
        if dims.is_empty() {
            dims.push(0);
        }
        dims[0] = range.len();
        if range.is_empty() {
            return Ok(BlockData {
                dims,
                values: Vec::new(),
            });
        }
        let store = self.file.get()?;
        let g = store.open_group(&store.root(), class.group_name())?;
        let slab = Hyperslab::rows(range.start, range.len(), &shape.dims);
        let values = store.read_values(&g, &shape.name, Some(&slab))?;
        store.close_group(g);
        Ok(BlockData { dims, values })
    }

    /// Node dataset rows for every block-local node, in block-local order.
    fn read_node_rows(
        &mut self,
        class: ElementClass,
        block: usize,
        shape: &DatasetShape,
    ) -> Result<BlockData, PvldError> {
        self.ensure_block_mesh(class, block)?;
        let synthetic = self.synthetic_node_count(class, block)?;
        let vmap = self.meshes[&(class, block)].vmap.clone();
        let width = shape.row_width().max(1);

        let mut values: Vec<f64> = match shape.name.as_str() {
            NODE_INDEX_DATASET => {
                let cache = self.node_cache()?;
                vmap.iter().map(|&p| cache.raw_id(p) as f64).collect()
            }
            NODE_COORDINATE_DATASET => {
                let cache = self.node_cache()?;
                vmap.iter().flat_map(|&p| cache.coordinate(p)).collect()
            }
            _ => {
                let node_count = self.node_cache()?.len();
                let store = self.file.get()?;
                let g = store.open_group(&store.root(), ElementClass::Node.group_name())?;
                let all: Vec<f64> = store.read_values(&g, &shape.name, None)?;
                store.close_group(g);
                // rows follow the node table order, so every cached node needs one
                if all.len() < node_count * width {
                    return Err(PvldError::InconsistentMetadata(format!(
                        "node dataset `{}` holds {} values of width {width} for {node_count} nodes",
                        shape.name,
                        all.len()
                    )));
                }
                vmap.iter()
                    .flat_map(|&p| all[p * width..(p + 1) * width].iter().copied())
                    .collect()
            }
        };
        values.resize(values.len() + synthetic * width, 0.0);

        let mut dims = shape.dims.clone();
        if dims.is_empty() {
            dims.push(0);
        }
        dims[0] = vmap.len() + synthetic;
        Ok(BlockData { dims, values })
    }

    /// History variable `var` (0-based) of every element in one block; zero
    /// where an element has fewer than `var + 1` history variables.
    pub fn read_block_history(
        &mut self,
        class: ElementClass,
        block: usize,
        var: usize,
    ) -> Result<BlockData, PvldError> {
        if block >= self.block_count(class) {
            return Ok(BlockData::default());
        }
        let range = self.element_range(class, block);
        let mut values = if range.is_empty() {
            Vec::new()
        } else {
            self.flatten_block_history(class, block, range, var)
                .context(|| format!("Failure in read_block_history({class}, {block}, {var})"))?
        };
        let n_missing = self.missing_for(class, block).len();
        append_donor_rows(&mut values, 1, n_missing);
        Ok(BlockData {
            dims: vec![values.len()],
            values,
        })
    }

    fn flatten_block_history(
        &mut self,
        class: ElementClass,
        block: usize,
        range: Range<usize>,
        var: usize,
    ) -> Result<Vec<f64>, PvldError> {
        let (slot_start, slot_end) = {
            let hvpart = self.class_history_slots(class)?;
            (hvpart[block], hvpart[block + 1])
        };

        if !self.hvdisp.contains_key(&(class, block)) {
            let counts: Vec<i64> = {
                let store = self.file.get()?;
                let g = store.open_group(&store.root(), class.group_name())?;
                let slab = Hyperslab::rows(range.start, range.len(), &[]);
                let counts = store.read_values(&g, HISTORY_COUNT_DATASET, Some(&slab))?;
                store.close_group(g);
                counts
            };
            let hvsft = exclusive_prefix(&counts)?;
            let total = hvsft.last().copied().unwrap_or(0);
            if total != slot_end - slot_start {
                return Err(PvldError::InconsistentMetadata(format!(
                    "{class} block {block} holds {total} history slots, expected {}",
                    slot_end - slot_start
                )));
            }
            self.hvdisp.insert((class, block), hvsft);
        }

        let flat: Vec<f64> = if slot_end > slot_start {
            let store = self.file.get()?;
            let g = store.open_group(&store.root(), class.group_name())?;
            let slab = Hyperslab::rows(slot_start, slot_end - slot_start, &[]);
            let flat = store.read_values(&g, HISTORY_VALUE_DATASET, Some(&slab))?;
            store.close_group(g);
            flat
        } else {
            Vec::new()
        };
        Ok(flatten_history(&self.hvdisp[&(class, block)], &flat, var))
    }

    /// Cumulative history slot count per block of `class`, read once together
    /// with the class's largest history variable count.
    fn class_history_slots(&mut self, class: ElementClass) -> Result<&[usize], PvldError> {
        if !self.hvpart.contains_key(&class) {
            let table = self.toc.class(class).ok_or_else(|| {
                PvldError::MissingGroup(class.group_name().to_string())
            })?;
            for required in [HISTORY_COUNT_DATASET, HISTORY_VALUE_DATASET] {
                if !table.has_dataset(required) {
                    return Err(PvldError::missing_dataset(class.group_name(), required));
                }
            }
            let partition = table.partition.clone();
            let store = self.file.get()?;
            let counts = collective_read(&self.comm, || {
                let g = store.open_group(&store.root(), class.group_name())?;
                let counts = store.read_values::<i64>(&g, HISTORY_COUNT_DATASET, None)?;
                store.close_group(g);
                Ok(counts)
            })?;
            if counts.len() != partition.count() {
                return Err(PvldError::InconsistentMetadata(format!(
                    "{class} has {} history counts for {} elements",
                    counts.len(),
                    partition.count()
                )));
            }
            let weights = counts
                .iter()
                .map(|&c| {
                    usize::try_from(c).map_err(|_| {
                        PvldError::InconsistentMetadata(format!(
                            "negative history variable count {c}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let hvpart = partition.accumulate(&weights);
            log::debug!("{class}: {} history slots", hvpart.last().copied().unwrap_or(0));
            self.hvpart.insert(class, hvpart);
            self.hvmax.insert(class, max_history_count(&counts));
        }
        Ok(&self.hvpart[&class])
    }

    /// Per-element material ids of one block, with missing parts appended to
    /// block 0.
    pub fn read_block_material(
        &mut self,
        class: ElementClass,
        block: usize,
    ) -> Result<Vec<i64>, PvldError> {
        if block >= self.block_count(class) {
            return Ok(Vec::new());
        }
        let range = self.element_range(class, block);
        let has_dataset = self
            .toc
            .class(class)
            .is_some_and(|t| t.has_dataset(MATERIAL_DATASET));
        let mut ids = if range.is_empty() {
            Vec::new()
        } else if has_dataset {
            let store = self.file.get()?;
            let g = store.open_group(&store.root(), class.group_name())?;
            let slab = Hyperslab::rows(range.start, range.len(), &[]);
            let ids = store
                .read_values::<i64>(&g, MATERIAL_DATASET, Some(&slab))
                .context(|| format!("Failure in read_block_material({class}, {block})"))?;
            store.close_group(g);
            ids
        } else {
            vec![self.materials.unknown_material(); range.len()]
        };
        ids.extend_from_slice(self.missing_for(class, block));
        Ok(ids)
    }

    /// Every variable name [`read_block_data`](Self::read_block_data) accepts
    /// for `class`.
    pub fn variable_names(&mut self, class: ElementClass) -> Result<Vec<String>, PvldError> {
        let Some(table) = self.toc.class(class) else {
            return Ok(Vec::new());
        };
        let mut names: Vec<String> = table
            .datasets
            .iter()
            .filter(|d| d.name != HISTORY_VALUE_DATASET)
            .map(|d| d.name.clone())
            .collect();
        let has_history =
            table.has_dataset(HISTORY_COUNT_DATASET) && table.has_dataset(HISTORY_VALUE_DATASET);

        if class.uses_node_connectivity() {
            names.extend(self.toc.node_datasets.iter().map(|d| {
                if d.name == NODE_INDEX_DATASET {
                    NODE_INDEX_ALIAS.to_string()
                } else {
                    d.name.clone()
                }
            }));
        }

        if has_history {
            self.class_history_slots(class)
                .context(|| format!("Failure in variable_names({class})"))?;
            let max = self.hvmax.get(&class).copied().unwrap_or(0);
            names.extend((0..max).map(history_variable_name));
        }
        Ok(names.into_iter().unique().collect())
    }
}
