use crate::cache::{ACTIVE_SET_CACHE_CAPACITY, ATX_CACHE_CAPACITY};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone)]
pub struct AtxDbConfig {
    #[serde(default = "default_atxdb_root")]
    pub atxdb_root: PathBuf,
    #[serde(default = "default_layers_per_epoch")]
    pub layers_per_epoch: u64,
    #[serde(default = "default_atx_cache_capacity")]
    pub atx_cache_capacity: usize,
    #[serde(default = "default_active_set_cache_capacity")]
    pub active_set_cache_capacity: usize,
}

impl Default for AtxDbConfig {
    fn default() -> Self {
        Self {
            atxdb_root: default_atxdb_root(),
            layers_per_epoch: default_layers_per_epoch(),
            atx_cache_capacity: default_atx_cache_capacity(),
            active_set_cache_capacity: default_active_set_cache_capacity(),
        }
    }
}

impl AtxDbConfig {
    /// Test-sized config: tiny epochs, in-memory friendly.
    pub fn with_layers_per_epoch(layers_per_epoch: u64) -> Self {
        Self {
            layers_per_epoch,
            ..Self::default()
        }
    }
}

fn default_atxdb_root() -> PathBuf {
    PathBuf::from(".atx-db")
}

fn default_layers_per_epoch() -> u64 {
    4032
}

fn default_atx_cache_capacity() -> usize {
    ATX_CACHE_CAPACITY
}

fn default_active_set_cache_capacity() -> usize {
    ACTIVE_SET_CACHE_CAPACITY
}

pub fn get_atxdb_config() -> anyhow::Result<AtxDbConfig> {
    Ok(envy::from_env::<AtxDbConfig>()?)
}
