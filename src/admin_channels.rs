//! Admin channels: curated groupings of per-language, per-platform sub-channels.

use crate::config::CollectionNames;
use crate::errors::{CatalogError, Result};
use crate::logger::AUDIT_TARGET;
use crate::model::{AdminChannelRecord, from_document, to_document};
use crate::page::{PageRequest, PageResult, fetch_page};
use crate::query::{Filter, SortSpec};
use crate::repository::store_failure;
use crate::store::DocumentStore;
use crate::types::IntoObjectId;
use bson::oid::ObjectId;
use std::sync::Arc;

pub struct AdminChannelRepository<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    collection: String,
}

impl<S: DocumentStore + ?Sized> AdminChannelRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_collections(store, &CollectionNames::default())
    }

    pub fn with_collections(store: Arc<S>, names: &CollectionNames) -> Self {
        Self { store, collection: names.admin_channels.clone() }
    }

    pub fn count(&self) -> Result<u64> {
        log::debug!("count {}", self.collection);
        self.store.count(&self.collection, &Filter::True).map_err(store_failure("count", &self.collection))
    }

    /// Alphabetical by display name.
    pub fn list_paged(&self, page: u64, limit: u64) -> Result<PageResult<AdminChannelRecord>> {
        let req = PageRequest::new(page, limit)?;
        log::debug!("admin channels list_paged page={page} limit={limit}");
        let sort = vec![SortSpec::asc("channel_name_presentation")];
        let docs = fetch_page(&*self.store, &self.collection, &Filter::True, sort, req)
            .map_err(store_failure("list_paged", &self.collection))?;
        let items = docs
            .items
            .into_iter()
            .map(|d| from_document("admin channel", d))
            .collect::<Result<Vec<_>>>()?;
        Ok(PageResult {
            items,
            total_items: docs.total_items,
            total_pages: docs.total_pages,
            limit: docs.limit,
            current_page: docs.current_page,
        })
    }

    pub fn get_by_id(&self, id: impl IntoObjectId) -> Result<AdminChannelRecord> {
        let oid = id.into_object_id("_id")?;
        let doc = self
            .store
            .find_one(&self.collection, &Filter::eq("_id", oid))
            .map_err(store_failure("get_by_id", oid))?
            .ok_or_else(|| CatalogError::NotFound { entity: "AdminChannel", id: oid.to_hex() })?;
        from_document("admin channel", doc)
    }

    pub fn create(&self, record: &AdminChannelRecord) -> Result<ObjectId> {
        if record.channel_name_presentation.trim().is_empty() {
            return Err(CatalogError::InvalidArgument("admin channel needs a name".into()));
        }
        let doc = to_document("admin channel", record)?;
        let id = self.store.insert_one(&self.collection, doc).map_err(store_failure("create", record.id))?;
        log::info!(target: AUDIT_TARGET, "create {} {id} ({})", self.collection, record.channel_name_presentation);
        Ok(id)
    }
}
