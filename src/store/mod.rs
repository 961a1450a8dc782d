//! The document-store boundary the repositories are written against, and the
//! embedded implementation shipped with the crate.

mod collection;
mod memory;
mod snapshot;

pub use memory::MemoryStore;

use crate::errors::StoreError;
use crate::query::{Filter, FindOptions, UpdateDoc, UpdateReport};
use bson::Document as BsonDocument;
use bson::oid::ObjectId;
use serde::Serialize;

/// Which image `find_one_and_update` hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDocument {
    Before,
    After,
}

/// One operation inside a `bulk_write` batch.
#[derive(Debug, Clone)]
pub enum WriteModel {
    InsertOne { document: BsonDocument },
    UpdateOne { filter: Filter, update: UpdateDoc },
    UpdateMany { filter: Filter, update: UpdateDoc },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WriteOutcome {
    Inserted(ObjectId),
    Updated(UpdateReport),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct InsertManyReport {
    pub inserted_ids: Vec<ObjectId>,
}

impl InsertManyReport {
    pub fn inserted(&self) -> u64 {
        self.inserted_ids.len() as u64
    }
}

/// Aggregate of a `bulk_write`; `outcomes[i]` belongs to operation `i`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BulkWriteReport {
    pub inserted: u64,
    pub matched: u64,
    pub modified: u64,
    pub outcomes: Vec<WriteOutcome>,
}

impl BulkWriteReport {
    pub(crate) fn record(&mut self, outcome: WriteOutcome) {
        match &outcome {
            WriteOutcome::Inserted(_) => self.inserted += 1,
            WriteOutcome::Updated(r) => {
                self.matched += r.matched;
                self.modified += r.modified;
            }
        }
        self.outcomes.push(outcome);
    }

    pub(crate) fn applied(&self) -> u64 {
        self.outcomes.len() as u64
    }
}

/// Data persistence contract for a document database.
///
/// Every call is a single bounded request. Single-document writes are atomic;
/// batches are not atomic across items.
pub trait DocumentStore: Send + Sync {
    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        opts: &FindOptions,
    ) -> Result<Vec<BsonDocument>, StoreError>;

    fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<BsonDocument>, StoreError>;

    /// Inserts `doc`, assigning an `_id` when absent.
    fn insert_one(&self, collection: &str, doc: BsonDocument) -> Result<ObjectId, StoreError>;

    /// With `ordered`, the first failure stops the batch.
    fn insert_many(
        &self,
        collection: &str,
        docs: Vec<BsonDocument>,
        ordered: bool,
    ) -> Result<InsertManyReport, StoreError>;

    fn update_one(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, StoreError>;

    fn update_many(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, StoreError>;

    /// Atomic read-modify-write of the first matching document.
    fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateDoc,
        ret: ReturnDocument,
    ) -> Result<Option<BsonDocument>, StoreError>;

    fn bulk_write(
        &self,
        collection: &str,
        ops: Vec<WriteModel>,
        ordered: bool,
    ) -> Result<BulkWriteReport, StoreError>;
}
