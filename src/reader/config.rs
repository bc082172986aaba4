//! Reader configuration.

use crate::algs::partition::PartitionStrategy;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the block count.
///
/// A positive value requests that many equal blocks; zero or a negative value
/// selects the partition stored in the file.
pub const PARTITION_ENV: &str = "PVLD_PARTITION";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    pub partition: PartitionStrategy,
    /// Append degenerate elements for missing parts to block 0.
    pub append_missing_parts: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            partition: PartitionStrategy::default(),
            append_missing_parts: true,
        }
    }
}

impl ReaderConfig {
    /// Defaults, with the partition strategy taken from [`PARTITION_ENV`].
    pub fn from_env() -> Self {
        let value = std::env::var(PARTITION_ENV).ok();
        Self {
            partition: strategy_from_env_value(value.as_deref()),
            ..Self::default()
        }
    }

    pub fn with_partition(mut self, partition: PartitionStrategy) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_missing_parts(mut self, append: bool) -> Self {
        self.append_missing_parts = append;
        self
    }
}

/// Interpret a raw [`PARTITION_ENV`] value.
pub fn strategy_from_env_value(value: Option<&str>) -> PartitionStrategy {
    let Some(raw) = value else {
        return PartitionStrategy::default();
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => PartitionStrategy::Equal(n as usize),
        Ok(_) => PartitionStrategy::Stored,
        Err(_) => {
            log::warn!("ignoring unparsable {PARTITION_ENV}={raw:?}; using the default partition");
            PartitionStrategy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::partition::DEFAULT_BLOCK_COUNT;

    #[test]
    fn env_values_map_to_strategies() {
        assert_eq!(
            strategy_from_env_value(None),
            PartitionStrategy::Equal(DEFAULT_BLOCK_COUNT)
        );
        assert_eq!(strategy_from_env_value(Some("8")), PartitionStrategy::Equal(8));
        assert_eq!(strategy_from_env_value(Some(" 0 ")), PartitionStrategy::Stored);
        assert_eq!(strategy_from_env_value(Some("-3")), PartitionStrategy::Stored);
        assert_eq!(
            strategy_from_env_value(Some("many")),
            PartitionStrategy::Equal(DEFAULT_BLOCK_COUNT)
        );
    }

    #[test]
    fn builders_override_fields() {
        let cfg = ReaderConfig::default()
            .with_partition(PartitionStrategy::Stored)
            .with_missing_parts(false);
        assert_eq!(cfg.partition, PartitionStrategy::Stored);
        assert!(!cfg.append_missing_parts);
    }
}
