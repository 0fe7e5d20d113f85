//! Activation-transaction database: ingests, validates, indexes, and answers
//! queries about the periodic storage declarations that form each epoch's
//! active identity set.
//!
//! The crate is built around one [`AtxDb`] instance per node. Writers go
//! through [`AtxDb::process_atx`]; consensus reads through the query API.
//! Everything external (the block DAG, the NIPST machinery, the identity
//! registry, the backing stores) enters through traits.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod fifo_cache;
pub mod identity;
pub mod mesh;
pub mod metrics;
pub mod nipst;
pub mod schema;
pub mod store;
pub mod worker;

mod query;
mod validation;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::{ACTIVE_SET_CACHE_CAPACITY, ATX_CACHE_CAPACITY, ActiveSetCache, AtxCache};
pub use config::{AtxDbConfig, get_atxdb_config};
pub use db::AtxDb;
pub use error::{AtxDbError, AtxError, ValidationError};
pub use identity::{IdentityStore, KvIdentityStore};
pub use mesh::{MemMesh, MeshBlock, MeshView};
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
pub use nipst::{ChallengeBoundValidator, InvalidProof, NipstValidator};
pub use store::{FjallStore, KvStore, MemStore, StoreError, Stores, open_stores};
pub use worker::AtxWorker;
