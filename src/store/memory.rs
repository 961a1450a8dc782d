use crate::errors::StoreError;
use crate::query::{Filter, FindOptions, UpdateDoc, UpdateReport};
use bson::Document as BsonDocument;
use bson::oid::ObjectId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::collection::Collection;
use super::{BulkWriteReport, DocumentStore, InsertManyReport, ReturnDocument, WriteModel, WriteOutcome};

/// Embedded document store. Collections are created by the first write; reads of an
/// unknown collection see it empty.
///
/// When opened from a path the contents can be written back with [`MemoryStore::flush`].
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("collections", &self.collection_names())
            .field("path", &self.path)
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { collections: RwLock::new(HashMap::new()), path: None }
    }

    /// Opens a store backed by a snapshot file, loading it when it exists.
    ///
    /// # Errors
    /// Returns an error if the snapshot exists but cannot be read or decoded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let loaded = if path.exists() { super::snapshot::read_snapshot(&path)? } else { Vec::new() };
        let collections = loaded
            .into_iter()
            .map(|(name, docs)| (name.clone(), Arc::new(Collection::with_documents(name, docs))))
            .collect();
        log::info!("opened store at {}", path.display());
        Ok(Self { collections: RwLock::new(collections), path: Some(path) })
    }

    /// Writes all collections to the backing snapshot. No-op for purely in-memory stores.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be written.
    pub fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let cols: Vec<Arc<Collection>> = self.collections.read().values().cloned().collect();
        super::snapshot::write_snapshot(path, &cols)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Loads newline-delimited extended JSON into `collection`. Returns the number of inserted documents.
    ///
    /// # Errors
    /// Stops at the first unreadable line or rejected document.
    pub fn import_ndjson<R: std::io::Read>(&self, collection: &str, reader: R) -> Result<u64, StoreError> {
        let col = self.collection(collection);
        super::snapshot::import_ndjson(&col, reader)
    }

    fn existing(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    pub(crate) fn collection(&self, name: &str) -> Arc<Collection> {
        if let Some(c) = self.collections.read().get(name) {
            return c.clone();
        }
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name.to_string())))
            .clone()
    }

    fn apply_write(col: &Collection, op: WriteModel) -> Result<WriteOutcome, StoreError> {
        Ok(match op {
            WriteModel::InsertOne { document } => WriteOutcome::Inserted(col.insert_document(document)?),
            WriteModel::UpdateOne { filter, update } => WriteOutcome::Updated(col.update_one(&filter, &update)?),
            WriteModel::UpdateMany { filter, update } => WriteOutcome::Updated(col.update_many(&filter, &update)?),
        })
    }
}

impl DocumentStore for MemoryStore {
    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self.existing(collection).map_or(0, |c| c.count(filter)))
    }

    fn find(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Result<Vec<BsonDocument>, StoreError> {
        Ok(self.existing(collection).map(|c| c.find(filter, opts)).unwrap_or_default())
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<BsonDocument>, StoreError> {
        let opts = FindOptions { limit: Some(1), ..FindOptions::default() };
        Ok(self.existing(collection).and_then(|c| c.find(filter, &opts).into_iter().next()))
    }

    fn insert_one(&self, collection: &str, doc: BsonDocument) -> Result<ObjectId, StoreError> {
        self.collection(collection).insert_document(doc)
    }

    fn insert_many(
        &self,
        collection: &str,
        docs: Vec<BsonDocument>,
        ordered: bool,
    ) -> Result<InsertManyReport, StoreError> {
        let col = self.collection(collection);
        let mut report = InsertManyReport::default();
        let mut first_failure: Option<(usize, StoreError)> = None;
        for (index, doc) in docs.into_iter().enumerate() {
            match col.insert_document(doc) {
                Ok(id) => report.inserted_ids.push(id),
                Err(e) => {
                    log::warn!("{}: insert {index} rejected: {e}", col.name());
                    if first_failure.is_none() {
                        first_failure = Some((index, e));
                    }
                    if ordered {
                        break;
                    }
                }
            }
        }
        match first_failure {
            None => Ok(report),
            Some((index, e)) => {
                Err(StoreError::BatchFailed { index, applied: report.inserted(), reason: Box::new(e) })
            }
        }
    }

    fn update_one(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, StoreError> {
        self.existing(collection).map_or_else(|| Ok(UpdateReport::default()), |c| c.update_one(filter, update))
    }

    fn update_many(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, StoreError> {
        self.existing(collection).map_or_else(|| Ok(UpdateReport::default()), |c| c.update_many(filter, update))
    }

    fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateDoc,
        ret: ReturnDocument,
    ) -> Result<Option<BsonDocument>, StoreError> {
        match self.existing(collection) {
            Some(c) => c.find_one_and_update(filter, update, ret),
            None => Ok(None),
        }
    }

    fn bulk_write(&self, collection: &str, ops: Vec<WriteModel>, ordered: bool) -> Result<BulkWriteReport, StoreError> {
        let col = self.collection(collection);
        let mut report = BulkWriteReport::default();
        let mut first_failure: Option<(usize, StoreError)> = None;
        for (index, op) in ops.into_iter().enumerate() {
            match Self::apply_write(&col, op) {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    log::warn!("{}: bulk operation {index} rejected: {e}", col.name());
                    if first_failure.is_none() {
                        first_failure = Some((index, e));
                    }
                    if ordered {
                        break;
                    }
                }
            }
        }
        match first_failure {
            None => Ok(report),
            Some((index, e)) => {
                Err(StoreError::BatchFailed { index, applied: report.applied(), reason: Box::new(e) })
            }
        }
    }
}
