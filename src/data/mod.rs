//! File metadata and the caches built from it.

pub mod block;
pub mod material;
pub mod node_cache;
pub mod toc;

pub use block::{BlockData, BlockMesh};
pub use material::MaterialCatalog;
pub use node_cache::NodeCache;
pub use toc::{ClassTable, GeneralInfo, Toc};
