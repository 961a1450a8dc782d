pub mod admin_channels;
pub mod config;
pub mod errors;
pub mod filter;
pub mod logger;
pub mod model;
pub mod page;
pub mod query;
pub mod repository;
pub mod store;
pub mod types;

pub use crate::admin_channels::AdminChannelRepository;
pub use crate::config::CatalogConfig;
pub use crate::errors::{CatalogError, StoreError};
pub use crate::filter::FilterSpec;
pub use crate::model::{AdminChannelRecord, ChannelRecord, VideoPatch, VideoRecord};
pub use crate::page::PageResult;
pub use crate::repository::{BulkUpdateReport, VideoRepository};
pub use crate::store::{DocumentStore, MemoryStore};

use std::sync::Arc;

/// The catalog over an embedded store: both repositories sharing one handle.
pub struct Catalog {
    store: Arc<MemoryStore>,
    videos: VideoRepository<MemoryStore>,
    admin_channels: AdminChannelRepository<MemoryStore>,
    default_limit: u64,
}

impl Catalog {
    /// Opens the store named by `config`, or an in-memory one when it names none.
    ///
    /// # Errors
    /// Returns an error if the snapshot file exists but cannot be loaded.
    pub fn open(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let store = match &config.store_path {
            Some(path) => MemoryStore::open(path)
                .map_err(|source| CatalogError::StoreUnavailable { op: "open", source })?,
            None => MemoryStore::new(),
        };
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn with_store(store: Arc<MemoryStore>, config: &CatalogConfig) -> Self {
        Self {
            videos: VideoRepository::with_collections(Arc::clone(&store), &config.collections),
            admin_channels: AdminChannelRepository::with_collections(Arc::clone(&store), &config.collections),
            store,
            default_limit: config.default_limit,
        }
    }

    pub fn videos(&self) -> &VideoRepository<MemoryStore> {
        &self.videos
    }

    pub fn admin_channels(&self) -> &AdminChannelRepository<MemoryStore> {
        &self.admin_channels
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn default_limit(&self) -> u64 {
        self.default_limit
    }

    /// Persists the store to its snapshot file, if it has one.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be written.
    pub fn flush(&self) -> Result<(), CatalogError> {
        self.store.flush().map_err(|source| CatalogError::StoreUnavailable { op: "flush", source })
    }
}
