//! Cache stores for the interpose pipeline.
//!
//! [`CacheStore`] is the async key to [`CachedEntry`](interpose_core::CachedEntry)
//! interface the caching behaviors talk to. [`MemoryStore`] is the reference
//! implementation; persistent stores live outside this crate and can encode
//! entries through their serde implementation.

mod error;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{CacheStore, DeleteStatus, StoreResult};
