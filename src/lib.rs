//! # pvld-reader
//!
//! pvld-reader reads Velodyne plot files (`.pvld`) block by block. A plot file
//! stores nodes, several element classes (solids, beams, shells, thick shells,
//! SPH particles, contact surfaces and tied node sets), per-element variables,
//! ragged history variables and a material catalog. The reader splits every
//! class into contiguous blocks and serves one block at a time as a compact
//! mesh with block-local node numbering.
//!
//! ## Features
//! - Equal or file-stored partitions of every element class
//! - Block meshes with dense, first-seen node renumbering
//! - Element, node-indirected and flattened history variables per block
//! - Material catalog with unique part titles and inferred element types
//! - Degenerate placeholder elements for parts that own no element of a class
//! - Pluggable communication backends (serial, threads, MPI) for collective
//!   metadata reads
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! pvld-reader = "0.1"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```
//!
//! ```no_run
//! use pvld_reader::prelude::*;
//!
//! # fn main() -> Result<(), PvldError> {
//! let mut reader = PvldReader::builder(JsonFileOpener::new("plot.json"))
//!     .config(ReaderConfig::from_env())
//!     .open()?;
//! for block in 0..reader.block_count(ElementClass::Solid) {
//!     let mesh = reader.read_block_mesh(ElementClass::Solid, block)?;
//!     let stress = reader.read_block_data(ElementClass::Solid, block, "Stress")?;
//!     println!("{} elements, {} stress rows", mesh.element_count(), stress.rows());
//! }
//! # Ok(())
//! # }
//! ```

pub mod algs;
pub mod data;
pub mod io;
pub mod pvld_error;
pub mod reader;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::partition::{Partition, PartitionStrategy};
    pub use crate::data::{BlockData, BlockMesh, GeneralInfo, MaterialCatalog, NodeCache, Toc};
    pub use crate::io::file::{JsonFileOpener, SharedStore, StoreHandle, StoreOpener};
    pub use crate::io::memory::InMemoryStore;
    pub use crate::io::{ArrayStore, ArrayStoreExt};
    pub use crate::pvld_error::{ErrorKind, PvldError, ResultExt};
    pub use crate::reader::{PvldReader, PvldReaderBuilder, ReaderConfig};
    pub use crate::topology::{ElementClass, MaterialType};
}
