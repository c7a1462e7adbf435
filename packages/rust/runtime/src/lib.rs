//! Run mechanics for OrgScout: budget metering, the layered response
//! cache, retry policy, and checkpoint persistence.
//!
//! Everything here is segment-agnostic. The pipeline crate wires these
//! pieces around the discovery stages; the connector crate consults them
//! before any network call.

pub mod budget;
pub mod cache;
pub mod checkpoint;
pub mod retry;

pub use budget::{Budget, BudgetCeilings, BudgetKind, BudgetSnapshot, CounterSnapshot};
pub use cache::{CacheLayer, CacheStack, CacheStatsSnapshot, DiskCache, MemoryCache, cache_key};
pub use checkpoint::{CheckpointRecord, CheckpointStore};
pub use retry::RetryPolicy;
