use crate::errors::StoreError;
use crate::query::{Filter, FindOptions, UpdateDoc, UpdateReport, apply_update, compare_docs, eval_filter};
use bson::oid::ObjectId;
use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;

use super::ReturnDocument;

/// A named set of documents kept in insertion order.
pub(crate) struct Collection {
    name: String,
    docs: RwLock<Vec<BsonDocument>>,
}

impl Collection {
    pub(crate) fn new(name: String) -> Self {
        Self { name, docs: RwLock::new(Vec::new()) }
    }

    pub(crate) fn with_documents(name: String, docs: Vec<BsonDocument>) -> Self {
        Self { name, docs: RwLock::new(docs) }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn snapshot(&self) -> Vec<BsonDocument> {
        self.docs.read().clone()
    }

    pub(crate) fn insert_document(&self, mut doc: BsonDocument) -> Result<ObjectId, StoreError> {
        let id = match doc.get("_id") {
            None => {
                let id = ObjectId::new();
                doc.insert("_id", id);
                id
            }
            Some(Bson::ObjectId(id)) => *id,
            Some(other) => {
                return Err(StoreError::InvalidDocument(format!(
                    "{}: _id must be an ObjectId, got {other}",
                    self.name
                )));
            }
        };
        let mut docs = self.docs.write();
        if docs.iter().any(|d| matches!(d.get("_id"), Some(Bson::ObjectId(x)) if *x == id)) {
            return Err(StoreError::DuplicateKey { collection: self.name.clone(), id: id.to_hex() });
        }
        docs.push(doc);
        Ok(id)
    }

    pub(crate) fn count(&self, filter: &Filter) -> u64 {
        self.docs.read().iter().filter(|d| eval_filter(d, filter)).count() as u64
    }

    pub(crate) fn find(&self, filter: &Filter, opts: &FindOptions) -> Vec<BsonDocument> {
        let mut docs: Vec<BsonDocument> =
            self.docs.read().iter().filter(|d| eval_filter(d, filter)).cloned().collect();
        if let Some(sort) = &opts.sort {
            // stable sort keeps insertion order among equal keys
            docs.sort_by(|a, b| compare_docs(a, b, sort));
        }
        let skip = opts.skip.unwrap_or(0);
        let limit = opts.limit.unwrap_or(usize::MAX);
        docs.into_iter().skip(skip).take(limit).collect()
    }

    pub(crate) fn update_one(&self, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, StoreError> {
        let mut docs = self.docs.write();
        let Some(doc) = docs.iter_mut().find(|d| eval_filter(d, filter)) else {
            return Ok(UpdateReport::default());
        };
        let changed = apply_checked(doc, update)?;
        Ok(UpdateReport { matched: 1, modified: u64::from(changed) })
    }

    pub(crate) fn update_many(&self, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, StoreError> {
        let mut docs = self.docs.write();
        let mut report = UpdateReport::default();
        for doc in docs.iter_mut().filter(|d| eval_filter(d, filter)) {
            report.matched += 1;
            if apply_checked(doc, update)? {
                report.modified += 1;
            }
        }
        Ok(report)
    }

    /// Holds the write lock across match, update and read-back.
    pub(crate) fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &UpdateDoc,
        ret: ReturnDocument,
    ) -> Result<Option<BsonDocument>, StoreError> {
        let mut docs = self.docs.write();
        let Some(doc) = docs.iter_mut().find(|d| eval_filter(d, filter)) else {
            return Ok(None);
        };
        let before = (ret == ReturnDocument::Before).then(|| doc.clone());
        apply_checked(doc, update)?;
        Ok(Some(before.unwrap_or_else(|| doc.clone())))
    }
}

/// Applies `update` to a copy first so a rejected update leaves the document untouched.
fn apply_checked(doc: &mut BsonDocument, update: &UpdateDoc) -> Result<bool, StoreError> {
    let mut next = doc.clone();
    let changed = apply_update(&mut next, update)?;
    if next.get("_id") != doc.get("_id") {
        return Err(StoreError::InvalidDocument("_id is immutable".into()));
    }
    *doc = next;
    Ok(changed)
}
