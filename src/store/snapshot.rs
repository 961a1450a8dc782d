//! On-disk form of a `MemoryStore`: a sequence of BSON documents, one per
//! collection, shaped `{ "collection": <name>, "documents": [ ... ] }`.

use crate::errors::StoreError;
use bson::{Bson, Document as BsonDocument};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;

use super::collection::Collection;

pub(crate) fn read_snapshot(path: &Path) -> Result<Vec<(String, Vec<BsonDocument>)>, StoreError> {
    let bytes = std::fs::read(path)?;
    let mut cur = &bytes[..];
    let mut out = Vec::new();
    while !cur.is_empty() {
        let section = BsonDocument::from_reader(&mut cur)?;
        let name = section
            .get_str("collection")
            .map_err(|_| StoreError::InvalidDocument("snapshot section without collection name".into()))?
            .to_string();
        let docs = match section.get("documents") {
            Some(Bson::Array(items)) => items
                .iter()
                .map(|b| match b {
                    Bson::Document(d) => Ok(d.clone()),
                    other => Err(StoreError::InvalidDocument(format!("{name}: non-document entry {other}"))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        out.push((name, docs));
    }
    Ok(out)
}

/// Writes to a temp file beside `path` and renames it into place.
pub(crate) fn write_snapshot(path: &Path, collections: &[Arc<Collection>]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    let mut written = 0usize;
    for col in collections {
        let docs: Vec<Bson> = col.snapshot().into_iter().map(Bson::Document).collect();
        written += docs.len();
        let section = bson::doc! { "collection": col.name(), "documents": docs };
        let mut buf = Vec::new();
        section.to_writer(&mut buf)?;
        tmp.write_all(&buf)?;
    }
    tmp.flush()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    log::info!("snapshot written to {} ({written} documents)", path.display());
    Ok(())
}

pub(crate) fn import_ndjson<R: Read>(col: &Collection, reader: R) -> Result<u64, StoreError> {
    let reader = BufReader::new(reader);
    let mut inserted = 0u64;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)?;
        let doc = match Bson::try_from(value) {
            Ok(Bson::Document(d)) => d,
            Ok(other) => {
                return Err(StoreError::InvalidDocument(format!("line {}: expected an object, got {other}", line_no + 1)));
            }
            Err(e) => return Err(StoreError::InvalidDocument(format!("line {}: {e}", line_no + 1))),
        };
        col.insert_document(doc)?;
        inserted += 1;
        if inserted % 1000 == 0 {
            log::info!("imported {inserted} records into {}", col.name());
        }
    }
    log::info!("imported {inserted} records into {}", col.name());
    Ok(inserted)
}
