//! Algorithms behind block extraction: partitioning, renumbering, history
//! flattening, missing-part synthesis and the collective read path.

pub mod collective;
pub mod communicator;
pub mod history;
pub mod missing_parts;
pub mod partition;
pub mod renumber;
pub mod wire;

pub use collective::collective_read;
pub use partition::{Partition, PartitionStrategy};
