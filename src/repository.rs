//! Filtered reads and bulk writes over the video collection.

use crate::config::CollectionNames;
use crate::errors::{CatalogError, Result, StoreError};
use crate::filter::{FilterSpec, build_predicate};
use crate::logger::AUDIT_TARGET;
use crate::model::{ChannelRecord, VideoRecord, from_document, to_document};
use crate::page::{PageRequest, PageResult, fetch_page};
use crate::query::{Filter, FindOptions, SortSpec, UpdateDoc, UpdateReport};
use crate::store::{BulkWriteReport, DocumentStore, InsertManyReport, ReturnDocument, WriteModel, WriteOutcome};
use crate::types::IntoObjectId;
use bson::oid::ObjectId;
use bson::Document as BsonDocument;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;

/// Newest first.
pub fn default_video_sort() -> Vec<SortSpec> {
    vec![SortSpec::desc("published_at")]
}

/// Logs a store failure with its context and wraps it for the caller.
pub(crate) fn store_failure(op: &'static str, context: impl Display) -> impl FnOnce(StoreError) -> CatalogError {
    move |source| {
        log::error!("{op} failed ({context}): {source}");
        CatalogError::StoreUnavailable { op, source }
    }
}

/// Outcome of [`VideoRepository::bulk_update`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkUpdateReport {
    pub matched: u64,
    pub modified: u64,
    /// Ids that matched no video. Reported, not fatal.
    pub unmatched: Vec<ObjectId>,
}

pub struct VideoRepository<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    videos: String,
    channels: String,
}

impl<S: DocumentStore + ?Sized> Clone for VideoRepository<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), videos: self.videos.clone(), channels: self.channels.clone() }
    }
}

impl<S: DocumentStore + ?Sized> VideoRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_collections(store, &CollectionNames::default())
    }

    pub fn with_collections(store: Arc<S>, names: &CollectionNames) -> Self {
        Self { store, videos: names.videos.clone(), channels: names.channels.clone() }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Unfiltered size of the video collection.
    pub fn count(&self) -> Result<u64> {
        log::debug!("count {}", self.videos);
        self.store.count(&self.videos, &Filter::True).map_err(store_failure("count", &self.videos))
    }

    /// One page of videos matching `filters`.
    ///
    /// `sort` replaces the default newest-first order entirely. Counting and
    /// fetching share one predicate, so `total_items` always describes the
    /// same set the page was cut from.
    ///
    /// # Errors
    /// `InvalidArgument` for a zero page or limit, `InvalidIdentifier` for
    /// malformed ids, `StoreUnavailable` when the store fails.
    pub fn list_paged(
        &self,
        page: u64,
        limit: u64,
        filters: &FilterSpec,
        sort: Option<Vec<SortSpec>>,
    ) -> Result<PageResult<VideoRecord>> {
        let req = PageRequest::new(page, limit)?;
        let predicate = build_predicate(filters)?;
        log::debug!("list_paged page={page} limit={limit} predicate={predicate:?}");
        let docs = fetch_page(&*self.store, &self.videos, &predicate, sort.unwrap_or_else(default_video_sort), req)
            .map_err(store_failure("list_paged", format!("page {page}")))?;
        let items = decode_all(docs.items)?;
        Ok(PageResult {
            items,
            total_items: docs.total_items,
            total_pages: docs.total_pages,
            limit: docs.limit,
            current_page: docs.current_page,
        })
    }

    /// Every video matching `filters`, unpaged.
    pub fn list_all(&self, filters: &FilterSpec, sort: Option<Vec<SortSpec>>) -> Result<Vec<VideoRecord>> {
        let predicate = build_predicate(filters)?;
        log::debug!("list_all predicate={predicate:?}");
        let opts = FindOptions { sort: Some(sort.unwrap_or_else(default_video_sort)), ..FindOptions::default() };
        let docs = self.store.find(&self.videos, &predicate, &opts).map_err(store_failure("list_all", &self.videos))?;
        decode_all(docs)
    }

    /// # Errors
    /// `InvalidIdentifier` for a malformed id, `NotFound` when no video has it.
    pub fn get_by_id(&self, id: impl IntoObjectId) -> Result<VideoRecord> {
        let oid = id.into_object_id("_id")?;
        log::debug!("get_by_id {oid}");
        let doc = self
            .store
            .find_one(&self.videos, &Filter::eq("_id", oid))
            .map_err(store_failure("get_by_id", oid))?
            .ok_or_else(|| CatalogError::NotFound { entity: "Video", id: oid.to_hex() })?;
        from_document("video", doc)
    }

    pub fn insert_one(&self, record: &VideoRecord) -> Result<ObjectId> {
        let doc = to_document("video", record)?;
        let id = self.store.insert_one(&self.videos, doc).map_err(store_failure("insert_one", record.id))?;
        log::info!(target: AUDIT_TARGET, "insert_one {} {id}", self.videos);
        Ok(id)
    }

    /// Ordered insert: the first failure stops the batch.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty batch; `BulkInsert` carrying how many
    /// records were written before the failure.
    pub fn insert_many(&self, records: &[VideoRecord]) -> Result<InsertManyReport> {
        if records.is_empty() {
            return Err(CatalogError::InvalidArgument("insert_many needs at least one record".into()));
        }
        let docs = records.iter().map(|r| to_document("video", r)).collect::<Result<Vec<_>>>()?;
        log::debug!("insert_many {} records", docs.len());
        let report = self.store.insert_many(&self.videos, docs, true).map_err(|e| bulk_insert_failure("insert_many", e))?;
        log::info!(target: AUDIT_TARGET, "insert_many {} inserted={}", self.videos, report.inserted());
        Ok(report)
    }

    /// Partial update of one video. `record` must carry `_id`; every other
    /// serialized field is written with `$set`.
    ///
    /// An id that matches nothing is not an error; the report says so.
    pub fn update_one<T: Serialize>(&self, record: &T) -> Result<UpdateReport> {
        let (oid, fields) = split_id(to_document("video", record)?)?;
        log::debug!("update_one {oid} fields={:?}", fields.keys().collect::<Vec<_>>());
        let report = self
            .store
            .update_one(&self.videos, &Filter::eq("_id", oid), &UpdateDoc::set_all(fields))
            .map_err(store_failure("update_one", oid))?;
        if report.matched == 0 {
            log::warn!("update_one: no video with _id {oid}");
        }
        log::info!(target: AUDIT_TARGET, "update_one {} {oid} modified={}", self.videos, report.modified);
        Ok(report)
    }

    /// One independent partial update per record, sent as a single unordered batch.
    ///
    /// # Errors
    /// Records are validated before anything is sent; a batch-level failure is `BulkUpdate`.
    pub fn bulk_update<T: Serialize>(&self, records: &[T]) -> Result<BulkUpdateReport> {
        if records.is_empty() {
            return Err(CatalogError::InvalidArgument("bulk_update needs at least one record".into()));
        }
        let mut ids = Vec::with_capacity(records.len());
        let mut ops = Vec::with_capacity(records.len());
        for record in records {
            let (oid, fields) = split_id(to_document("video", record)?)?;
            ids.push(oid);
            ops.push(WriteModel::UpdateOne { filter: Filter::eq("_id", oid), update: UpdateDoc::set_all(fields) });
        }
        log::debug!("bulk_update {} operations", ops.len());
        let written = self.store.bulk_write(&self.videos, ops, false).map_err(|e| {
            log::error!("bulk_update failed: {e}");
            CatalogError::BulkUpdate(e)
        })?;
        let mut report = BulkUpdateReport { matched: written.matched, modified: written.modified, unmatched: Vec::new() };
        for (oid, outcome) in ids.into_iter().zip(&written.outcomes) {
            if matches!(outcome, WriteOutcome::Updated(r) if r.matched == 0) {
                report.unmatched.push(oid);
            }
        }
        if !report.unmatched.is_empty() {
            log::warn!("bulk_update: {} ids matched no video", report.unmatched.len());
        }
        log::info!(
            target: AUDIT_TARGET,
            "bulk_update {} matched={} modified={}",
            self.videos,
            report.matched,
            report.modified
        );
        Ok(report)
    }

    /// One insert operation per record in a single ordered batch.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty batch, `BulkInsert` on failure.
    pub fn bulk_insert(&self, records: &[VideoRecord]) -> Result<BulkWriteReport> {
        if records.is_empty() {
            return Err(CatalogError::InvalidArgument("bulk_insert needs at least one record".into()));
        }
        let ops = records
            .iter()
            .map(|r| to_document("video", r).map(|document| WriteModel::InsertOne { document }))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("bulk_insert {} operations", ops.len());
        let report = self.store.bulk_write(&self.videos, ops, true).map_err(|e| bulk_insert_failure("bulk_insert", e))?;
        log::info!(target: AUDIT_TARGET, "bulk_insert {} inserted={}", self.videos, report.inserted);
        Ok(report)
    }

    /// Channel by its `channelId`.
    pub fn get_channel(&self, channel_id: &str) -> Result<ChannelRecord> {
        log::debug!("get_channel {channel_id}");
        let doc = self
            .store
            .find_one(&self.channels, &Filter::eq("channelId", channel_id))
            .map_err(store_failure("get_channel", channel_id))?
            .ok_or_else(|| CatalogError::ChannelNotFound(channel_id.to_string()))?;
        from_document("channel", doc)
    }

    pub fn set_visibility(&self, id: impl IntoObjectId, visible: bool) -> Result<UpdateReport> {
        let oid = id.into_object_id("_id")?;
        log::debug!("set_visibility {oid} visible={visible}");
        let report = self
            .store
            .update_one(&self.videos, &Filter::eq("_id", oid), &UpdateDoc::set("visible", visible))
            .map_err(store_failure("set_visibility", oid))?;
        log::info!(target: AUDIT_TARGET, "set_visibility {} {oid} visible={visible} matched={}", self.videos, report.matched);
        Ok(report)
    }

    /// Records that `video` was applied to its channel.
    ///
    /// 1. atomically increments the channel's `applied_videos` and reads the result back,
    /// 2. writes that channel state into every video of the channel,
    /// 3. marks `video` as applied.
    ///
    /// Steps are separate store calls. A failure after step 1 is returned
    /// as-is; the increment stays.
    ///
    /// # Errors
    /// `InvalidArgument` when the video has no channel, `ChannelNotFound`
    /// when no channel carries its `channelId`, `NotFound` when `video`
    /// itself is no longer stored (after the increment and fan-out).
    pub fn propagate_channel_application(&self, video: &VideoRecord) -> Result<ChannelRecord> {
        let channel_id = video.channel_id.as_str();
        if channel_id.is_empty() {
            return Err(CatalogError::InvalidArgument(format!("video {} has no channel_id", video.id)));
        }
        log::debug!("propagate_channel_application video={} channel={channel_id}", video.id);

        let fresh = self
            .store
            .find_one_and_update(
                &self.channels,
                &Filter::eq("channelId", channel_id),
                &UpdateDoc::inc("applied_videos", 1),
                ReturnDocument::After,
            )
            .map_err(store_failure("propagate_channel_application", channel_id))?
            .ok_or_else(|| {
                log::warn!("propagate_channel_application: no channel {channel_id}");
                CatalogError::ChannelNotFound(channel_id.to_string())
            })?;
        let channel: ChannelRecord = from_document("channel", fresh.clone())?;
        log::info!(
            target: AUDIT_TARGET,
            "channel {channel_id} applied_videos={} (video {})",
            channel.applied_videos,
            video.id
        );

        let fan_out = self
            .store
            .update_many(&self.videos, &Filter::eq("channel_id", channel_id), &UpdateDoc::set("channel", fresh))
            .map_err(store_failure("propagate_channel_application", channel_id))?;
        log::info!(target: AUDIT_TARGET, "channel {channel_id} snapshot written to {} videos", fan_out.modified);

        let marked = self
            .store
            .update_one(&self.videos, &Filter::eq("_id", video.id), &UpdateDoc::set("applied", true))
            .map_err(store_failure("propagate_channel_application", video.id))?;
        if marked.matched == 0 {
            log::warn!("propagate_channel_application: no video with _id {}", video.id);
            return Err(CatalogError::NotFound { entity: "Video", id: video.id.to_hex() });
        }
        log::info!(target: AUDIT_TARGET, "video {} marked applied", video.id);
        Ok(channel)
    }
}

fn decode_all(docs: Vec<BsonDocument>) -> Result<Vec<VideoRecord>> {
    docs.into_iter().map(|d| from_document("video", d)).collect()
}

/// Separates the identifier from the fields to `$set`.
fn split_id(mut doc: BsonDocument) -> Result<(ObjectId, BsonDocument)> {
    let raw = doc
        .remove("_id")
        .ok_or_else(|| CatalogError::InvalidArgument("update requires _id".into()))?;
    let oid = (&raw).into_object_id("_id")?;
    if doc.is_empty() {
        return Err(CatalogError::InvalidArgument(format!("update for {oid} carries no fields")));
    }
    Ok((oid, doc))
}

fn bulk_insert_failure(op: &str, e: StoreError) -> CatalogError {
    let inserted = match &e {
        StoreError::BatchFailed { applied, .. } => *applied,
        _ => 0,
    };
    log::error!("{op} failed after {inserted} inserted: {e}");
    CatalogError::BulkInsert { inserted, source: e }
}
