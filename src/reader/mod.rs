//! Block reader for Velodyne plot files.
//!
//! A [`PvldReader`] only exists once the file's table of contents has been read
//! and every material's element type resolved; [`PvldReaderBuilder::open`]
//! performs both phases. After that the reader answers per-block requests:
//!
//! - [`PvldReader::read_block_mesh`]: block-local nodes, coordinates and connectivity
//! - [`PvldReader::read_block_data`]: element, node-indirected or history variables
//! - [`PvldReader::read_block_material`]: per-element material ids
//!
//! Node coordinates, block remaps and history prefix sums are filled lazily,
//! once each, and dropped only by [`PvldReader::free_resources`].
//!
//! Block indices at or beyond [`PvldReader::block_count`] are not errors: every
//! accessor returns an empty value for them.

pub mod config;
mod data;
mod mesh;

pub use config::{PARTITION_ENV, ReaderConfig};

use crate::algs::communicator::{Communicator, NoComm};
use crate::data::block::BlockMesh;
use crate::data::material::MaterialCatalog;
use crate::data::node_cache::NodeCache;
use crate::data::toc::{GeneralInfo, Toc};
use crate::io::file::{StoreHandle, StoreOpener};
use crate::pvld_error::{PvldError, ResultExt};
use crate::topology::element_class::ElementClass;
use hashbrown::HashMap;
use once_cell::unsync::OnceCell;
use std::ops::Range;

type BlockKey = (ElementClass, usize);

/// Phased construction of a [`PvldReader`].
pub struct PvldReaderBuilder<O: StoreOpener, C: Communicator = NoComm> {
    opener: O,
    comm: C,
    config: ReaderConfig,
}

impl<O: StoreOpener> PvldReaderBuilder<O, NoComm> {
    /// Single-process reader with the default configuration.
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            comm: NoComm,
            config: ReaderConfig::default(),
        }
    }
}

impl<O: StoreOpener, C: Communicator> PvldReaderBuilder<O, C> {
    pub fn comm<C2: Communicator>(self, comm: C2) -> PvldReaderBuilder<O, C2> {
        PvldReaderBuilder {
            opener: self.opener,
            comm,
            config: self.config,
        }
    }

    pub fn config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Open the file, read the table of contents and resolve material types.
    pub fn open(self) -> Result<PvldReader<O, C>, PvldError> {
        let PvldReaderBuilder {
            opener,
            comm,
            config,
        } = self;
        let mut file = StoreHandle::new(opener);
        let name = file.describe();
        let store = file.open().context(|| format!("Failure in opening {name}"))?;

        let toc = Toc::read(store, config.partition).context(|| "Failure in read_toc()")?;
        let blocks = toc.max_block_count();
        if comm.size() > 1 && comm.size() > blocks {
            return Err(PvldError::Configuration(format!(
                "{} ranks requested but {name} divides into at most {blocks} blocks",
                comm.size()
            )));
        }
        let materials = MaterialCatalog::load(store, &toc, &comm)
            .context(|| "Failure in read_material_type()")?;

        log::info!(
            "opened {name}: t={} cycle={} nodes={} materials={} classes={:?}",
            toc.general.sim_time,
            toc.general.cycle,
            toc.node_count,
            materials.num_materials(),
            toc.classes()
                .map(|(c, t)| (c, t.count, t.partition.block_count()))
                .collect::<Vec<_>>()
        );

        Ok(PvldReader {
            file,
            comm,
            config,
            toc,
            materials,
            node_cache: OnceCell::new(),
            meshes: HashMap::new(),
            hvpart: HashMap::new(),
            hvmax: HashMap::new(),
            hvdisp: HashMap::new(),
        })
    }
}

/// An opened plot file.
pub struct PvldReader<O: StoreOpener, C: Communicator = NoComm> {
    file: StoreHandle<O>,
    comm: C,
    config: ReaderConfig,
    toc: Toc,
    materials: MaterialCatalog,
    node_cache: OnceCell<NodeCache>,
    meshes: HashMap<BlockKey, BlockMesh>,
    hvpart: HashMap<ElementClass, Vec<usize>>,
    /// Largest per-element history variable count of each class.
    hvmax: HashMap<ElementClass, usize>,
    hvdisp: HashMap<BlockKey, Vec<usize>>,
}

impl<O: StoreOpener> PvldReader<O, NoComm> {
    pub fn builder(opener: O) -> PvldReaderBuilder<O, NoComm> {
        PvldReaderBuilder::new(opener)
    }
}

impl<O: StoreOpener, C: Communicator> PvldReader<O, C> {
    pub fn general(&self) -> &GeneralInfo {
        &self.toc.general
    }

    pub fn toc(&self) -> &Toc {
        &self.toc
    }

    pub fn materials(&self) -> &MaterialCatalog {
        &self.materials
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Number of blocks `class` exposes.
    ///
    /// A class without entities still exposes block 0 when it has missing
    /// parts to carry.
    pub fn block_count(&self, class: ElementClass) -> usize {
        let blocks = self
            .toc
            .class(class)
            .map_or(0, |t| t.partition.block_count());
        if blocks == 0 && self.carries_missing_parts(class) {
            1
        } else {
            blocks
        }
    }

    /// Global element range of a block; empty for synthetic or unknown blocks.
    pub fn element_range(&self, class: ElementClass, block: usize) -> Range<usize> {
        self.toc
            .class(class)
            .and_then(|t| t.partition.range(block))
            .unwrap_or(0..0)
    }

    fn carries_missing_parts(&self, class: ElementClass) -> bool {
        self.config.append_missing_parts && !self.materials.missing(class).is_empty()
    }

    /// Missing parts appended to `block`.
    fn missing_for(&self, class: ElementClass, block: usize) -> &[i64] {
        if block == 0 && self.config.append_missing_parts {
            self.materials.missing(class)
        } else {
            &[]
        }
    }

    /// The node cache, read on first use.
    pub fn node_cache(&mut self) -> Result<&NodeCache, PvldError> {
        self.node_cache
            .get_or_try_init(|| NodeCache::load(self.file.get()?, &self.comm))
            .context(|| "Failure in reading the node cache")
    }

    /// Drop one open of the underlying file; metadata stays cached.
    pub fn close_file(&mut self) {
        self.file.close();
    }

    /// Release the file and every lazily built cache. The table of contents
    /// and the material catalog are kept; later reads reopen the file.
    pub fn free_resources(&mut self) {
        self.node_cache = OnceCell::new();
        self.meshes.clear();
        self.hvpart.clear();
        self.hvmax.clear();
        self.hvdisp.clear();
        self.file.close_all();
        log::debug!("freed reader caches for {}", self.file.describe());
    }

    pub fn is_file_open(&self) -> bool {
        self.file.is_open()
    }
}
