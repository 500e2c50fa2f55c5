pub mod cacher;
pub mod client;
pub mod error;
pub mod roster;

pub use cacher::MetaStoreOperateCacher;
pub use client::{InMemoryMetaStore, MetaStoreClient, StoreEntry};
pub use error::StoreError;
pub use roster::{AbnormalSchedulerSet, NodeRoster};
