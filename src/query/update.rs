use bson::{Bson, Document as BsonDocument};

use super::types::UpdateDoc;
use crate::errors::StoreError;

/// Apply `$set`, `$inc` and `$unset` in that order. Returns whether the document changed.
///
/// # Errors
/// `InvalidDocument` when an `$inc` targets a non-numeric value or overflows.
/// `doc` may be partially updated on error; callers apply to a copy.
pub fn apply_update(doc: &mut BsonDocument, upd: &UpdateDoc) -> Result<bool, StoreError> {
    let mut changed = false;
    for (k, v) in &upd.set {
        if set_path(doc, k, v.clone()) {
            changed = true;
        }
    }
    for (k, by) in &upd.inc {
        if inc_path(doc, k, by)? {
            changed = true;
        }
    }
    for k in &upd.unset {
        if unset_path(doc, k) {
            changed = true;
        }
    }
    Ok(changed)
}

fn ensure_subdoc<'a>(root: &'a mut BsonDocument, key: &str) -> &'a mut BsonDocument {
    if !matches!(root.get(key), Some(Bson::Document(_))) {
        root.insert(key.to_string(), Bson::Document(BsonDocument::new()));
    }
    match root.get_mut(key) {
        Some(Bson::Document(d)) => d,
        _ => unreachable!("subdocument inserted above"),
    }
}

fn traverse_to_parent<'a>(root: &'a mut BsonDocument, path: &str) -> (&'a mut BsonDocument, String) {
    let mut cur = root;
    let mut iter = path.split('.').peekable();
    let mut last = String::new();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            last = seg.to_string();
            break;
        }
        cur = ensure_subdoc(cur, seg);
    }
    (cur, last)
}

fn set_path(root: &mut BsonDocument, path: &str, value: Bson) -> bool {
    let (parent, last) = traverse_to_parent(root, path);
    let old = parent.insert(last, value.clone());
    old.as_ref() != Some(&value)
}

/// Never creates intermediate documents.
fn unset_path(root: &mut BsonDocument, path: &str) -> bool {
    let (parents, last) = match path.rsplit_once('.') {
        Some((p, l)) => (Some(p), l),
        None => (None, path),
    };
    let mut cur = root;
    for seg in parents.into_iter().flat_map(|p| p.split('.')) {
        match cur.get_mut(seg) {
            Some(Bson::Document(d)) => cur = d,
            _ => return false,
        }
    }
    cur.remove(last).is_some()
}

fn inc_path(root: &mut BsonDocument, path: &str, by: &Bson) -> Result<bool, StoreError> {
    let cur = super::eval::get_path(root, path).cloned().unwrap_or(Bson::Int32(0));
    let Some(next) = add_numbers(&cur, by) else {
        log::warn!("$inc rejected on {path}: {cur} + {by}");
        return Err(StoreError::InvalidDocument(format!("cannot $inc {path}: {cur} + {by}")));
    };
    Ok(set_path(root, path, next))
}

/// Integer operands stay integral; anything involving a double widens to double.
#[allow(clippy::cast_precision_loss)]
fn add_numbers(a: &Bson, b: &Bson) -> Option<Bson> {
    Some(match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => match x.checked_add(*y) {
            Some(s) => Bson::Int32(s),
            None => Bson::Int64(i64::from(*x) + i64::from(*y)),
        },
        (Bson::Int32(x), Bson::Int64(y)) | (Bson::Int64(y), Bson::Int32(x)) => {
            Bson::Int64(i64::from(*x).checked_add(*y)?)
        }
        (Bson::Int64(x), Bson::Int64(y)) => Bson::Int64(x.checked_add(*y)?),
        (Bson::Double(x), Bson::Double(y)) => Bson::Double(x + y),
        (Bson::Double(x), Bson::Int32(y)) | (Bson::Int32(y), Bson::Double(x)) => {
            Bson::Double(x + f64::from(*y))
        }
        (Bson::Double(x), Bson::Int64(y)) | (Bson::Int64(y), Bson::Double(x)) => {
            Bson::Double(x + *y as f64)
        }
        _ => return None,
    })
}
