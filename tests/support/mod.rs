#![allow(dead_code)]

use bson::Document as BsonDocument;
use bson::oid::ObjectId;
use channel_catalog::errors::StoreError;
use channel_catalog::model::{ChannelRecord, VideoRecord};
use channel_catalog::query::{Filter, FindOptions, UpdateDoc, UpdateReport};
use channel_catalog::store::{
    BulkWriteReport, DocumentStore, InsertManyReport, MemoryStore, ReturnDocument, WriteModel,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps a `MemoryStore`, counting calls and failing the operations named in `fail_on`.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    fail_on: Mutex<HashSet<&'static str>>,
    calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, op: &'static str) {
        self.fail_on.lock().insert(op);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, op: &'static str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.lock().contains(op) {
            return Err(StoreError::Unavailable(format!("{op}: injected failure")));
        }
        Ok(())
    }
}

impl DocumentStore for FaultyStore {
    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.enter("count")?;
        self.inner.count(collection, filter)
    }

    fn find(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Result<Vec<BsonDocument>, StoreError> {
        self.enter("find")?;
        self.inner.find(collection, filter, opts)
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<BsonDocument>, StoreError> {
        self.enter("find_one")?;
        self.inner.find_one(collection, filter)
    }

    fn insert_one(&self, collection: &str, doc: BsonDocument) -> Result<ObjectId, StoreError> {
        self.enter("insert_one")?;
        self.inner.insert_one(collection, doc)
    }

    fn insert_many(&self, collection: &str, docs: Vec<BsonDocument>, ordered: bool) -> Result<InsertManyReport, StoreError> {
        self.enter("insert_many")?;
        self.inner.insert_many(collection, docs, ordered)
    }

    fn update_one(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, StoreError> {
        self.enter("update_one")?;
        self.inner.update_one(collection, filter, update)
    }

    fn update_many(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, StoreError> {
        self.enter("update_many")?;
        self.inner.update_many(collection, filter, update)
    }

    fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateDoc,
        ret: ReturnDocument,
    ) -> Result<Option<BsonDocument>, StoreError> {
        self.enter("find_one_and_update")?;
        self.inner.find_one_and_update(collection, filter, update, ret)
    }

    fn bulk_write(&self, collection: &str, ops: Vec<WriteModel>, ordered: bool) -> Result<BulkWriteReport, StoreError> {
        self.enter("bulk_write")?;
        self.inner.bulk_write(collection, ops, ordered)
    }
}

/// `n` videos of `channel`, published one minute apart, `visible` for the first `visible` of them.
pub fn videos_for(channel: &ChannelRecord, n: usize, visible: usize) -> Vec<VideoRecord> {
    (0..n)
        .map(|i| {
            let mut v = VideoRecord::new(format!("video {i}"), format!("https://videos.example/{i}")).with_channel(channel);
            v.visible = i < visible;
            v.published_at = Some(bson::DateTime::from_millis(1_700_000_000_000 + i as i64 * 60_000));
            v
        })
        .collect()
}
