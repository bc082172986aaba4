//! Table of contents: general metadata plus one partitioned entry per class.

use crate::algs::partition::{Partition, PartitionStrategy, build_partition};
use crate::io::{ArrayStore, ArrayStoreExt, DatasetShape};
use crate::pvld_error::{PvldError, ResultExt};
use crate::topology::element_class::ElementClass;
use std::collections::BTreeMap;

pub const GENERAL_GROUP: &str = "General";

/// File-wide metadata from the `General` group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneralInfo {
    /// Simulation time of the plot state (`SimuTime`).
    pub sim_time: f64,
    /// Cycle number (`Ncycles`).
    pub cycle: i64,
    /// Number of global materials (`NumMaterials`).
    pub num_materials: usize,
    pub title: Option<String>,
    pub subtitle1: Option<String>,
    pub subtitle2: Option<String>,
}

impl GeneralInfo {
    pub fn read<S: ArrayStore>(store: &S) -> Result<Self, PvldError> {
        let group = store.open_group(&store.root(), GENERAL_GROUP)?;
        let text = |name: &str| -> Result<Option<String>, PvldError> {
            store
                .read_optional_attribute(&group, name)?
                .map(|a| a.as_text(name).map(str::to_string))
                .transpose()
        };
        let sim_time = store.read_attribute(&group, "SimuTime")?.as_float("SimuTime")?;
        let cycle = store.read_attribute(&group, "Ncycles")?.as_int("Ncycles")?;
        let num_materials = store
            .read_attribute(&group, "NumMaterials")?
            .as_int("NumMaterials")?;
        let num_materials = usize::try_from(num_materials).map_err(|_| {
            PvldError::InconsistentMetadata(format!("negative NumMaterials {num_materials}"))
        })?;
        let info = GeneralInfo {
            sim_time,
            cycle,
            num_materials,
            title: text("Title")?,
            subtitle1: text("Subtitle1")?,
            subtitle2: text("Subtitle2")?,
        };
        store.close_group(group);
        Ok(info)
    }
}

/// Count, partition and dataset catalog of one element class.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassTable {
    pub count: usize,
    pub partition: Partition,
    pub datasets: Vec<DatasetShape>,
}

impl ClassTable {
    pub fn dataset(&self, name: &str) -> Option<&DatasetShape> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn has_dataset(&self, name: &str) -> bool {
        self.dataset(name).is_some()
    }
}

/// Everything the reader learns from the file before touching block data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Toc {
    pub general: GeneralInfo,
    pub node_count: usize,
    pub node_datasets: Vec<DatasetShape>,
    classes: BTreeMap<ElementClass, ClassTable>,
}

impl Toc {
    pub fn read<S: ArrayStore>(store: &S, strategy: PartitionStrategy) -> Result<Self, PvldError> {
        let general = GeneralInfo::read(store).context(|| "Failure in reading the General group")?;
        let root = store.root();

        let (node_count, node_datasets) = if store.has_group(&root, ElementClass::Node.group_name()) {
            let g = store.open_group(&root, ElementClass::Node.group_name())?;
            let n = store
                .read_int_attribute_any(&g, ElementClass::Node.count_attributes())?
                .unwrap_or(0)
                .max(0) as usize;
            let ds = store.datasets(&g)?;
            store.close_group(g);
            (n, ds)
        } else {
            (0, Vec::new())
        };

        let mut classes = BTreeMap::new();
        for class in ElementClass::PARTITIONED {
            if !store.has_group(&root, class.group_name()) {
                continue;
            }
            let table = Self::read_class(store, class, strategy)
                .context(|| format!("Failure in reading the {class} table of contents"))?;
            classes.insert(class, table);
        }
        Ok(Toc {
            general,
            node_count,
            node_datasets,
            classes,
        })
    }

    fn read_class<S: ArrayStore>(
        store: &S,
        class: ElementClass,
        strategy: PartitionStrategy,
    ) -> Result<ClassTable, PvldError> {
        let g = store.open_group(&store.root(), class.group_name())?;
        let (count, partition) = build_partition(store, &g, class.count_attributes(), strategy)?;
        let datasets = store.datasets(&g)?;
        store.close_group(g);
        Ok(ClassTable {
            count,
            partition,
            datasets,
        })
    }

    /// Table of a partitioned class, `None` when the file has no such group.
    pub fn class(&self, class: ElementClass) -> Option<&ClassTable> {
        self.classes.get(&class)
    }

    pub fn classes(&self) -> impl Iterator<Item = (ElementClass, &ClassTable)> {
        self.classes.iter().map(|(c, t)| (*c, t))
    }

    pub fn node_dataset(&self, name: &str) -> Option<&DatasetShape> {
        self.node_datasets.iter().find(|d| d.name == name)
    }

    /// Largest block count over all classes.
    pub fn max_block_count(&self) -> usize {
        self.classes
            .values()
            .map(|t| t.partition.block_count())
            .max()
            .unwrap_or(0)
    }
}
