use crate::errors::{CatalogError, StoreError};
use crate::query::{Filter, FindOptions, SortSpec};
use crate::store::DocumentStore;
use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};

/// One page of a filtered listing.
///
/// `total_items` and `total_pages` describe the whole filtered set, not the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
    pub limit: u64,
    pub current_page: u64,
}

impl<T> PageResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            total_pages: self.total_pages,
            limit: self.limit,
            current_page: self.current_page,
        }
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

/// Validated 1-based page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// # Errors
    /// `InvalidArgument` when `page` or `limit` is zero.
    pub fn new(page: u64, limit: u64) -> Result<Self, CatalogError> {
        if page == 0 {
            return Err(CatalogError::InvalidArgument("page must be at least 1".into()));
        }
        if limit == 0 {
            return Err(CatalogError::InvalidArgument("limit must be greater than 0".into()));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total_items: u64) -> u64 {
        total_items.div_ceil(self.limit)
    }
}

/// Counts and fetches one page of `collection` with the same predicate.
pub(crate) fn fetch_page<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    predicate: &Filter,
    sort: Vec<SortSpec>,
    req: PageRequest,
) -> Result<PageResult<BsonDocument>, StoreError> {
    let total_items = store.count(collection, predicate)?;
    let opts = FindOptions {
        sort: Some(sort),
        skip: Some(usize::try_from(req.offset()).unwrap_or(usize::MAX)),
        limit: Some(usize::try_from(req.limit()).unwrap_or(usize::MAX)),
    };
    let items = store.find(collection, predicate, &opts)?;
    Ok(PageResult {
        items,
        total_items,
        total_pages: req.total_pages(total_items),
        limit: req.limit(),
        current_page: req.page(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use bson::doc;

    #[test]
    fn zero_page_or_limit_is_rejected() {
        assert!(matches!(PageRequest::new(0, 10), Err(CatalogError::InvalidArgument(_))));
        assert!(matches!(PageRequest::new(1, 0), Err(CatalogError::InvalidArgument(_))));
    }

    #[test]
    fn page_arithmetic() {
        let req = PageRequest::new(3, 10).unwrap();
        assert_eq!(req.offset(), 20);
        assert_eq!(req.total_pages(0), 0);
        assert_eq!(req.total_pages(20), 2);
        assert_eq!(req.total_pages(21), 3);
    }

    #[test]
    fn page_beyond_the_end_is_empty_but_counted() {
        let store = MemoryStore::new();
        for i in 0..7 {
            store.insert_one("video", doc! {"i": i}).unwrap();
        }
        let req = PageRequest::new(5, 3).unwrap();
        let page = fetch_page(&store, "video", &Filter::True, vec![SortSpec::asc("i")], req).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 7);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 5);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let page = PageResult { items: vec![1, 2], total_items: 2, total_pages: 1, limit: 10, current_page: 1 };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalItems"], 2);
        assert_eq!(json["currentPage"], 1);
        assert_eq!(json["totalPages"], 1);
    }
}
