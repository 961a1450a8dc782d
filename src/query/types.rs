use bson::Bson;
use serde::{Deserialize, Serialize};

// Guards against pathological inputs
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

/// Options for `DocumentStore::find`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOptions {
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    /// Closed interval; a missing bound is unbounded on that side.
    Range { path: String, gte: Option<Bson>, lte: Option<Bson> },
    /// Pattern match on a string, or on any string element of an array.
    Regex { path: String, regex: regex::Regex },
    /// Matches when at least one element of the array at `path` satisfies `filter`.
    ElemMatch { path: String, filter: Box<Filter> },
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.into(), op: CmpOp::Eq, value: value.into() }
    }

    /// Compiles `pattern` once; evaluation reuses it for every document.
    ///
    /// # Errors
    /// Returns the `regex` error for an invalid or oversized pattern.
    pub fn regex(path: impl Into<String>, pattern: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let regex = regex::RegexBuilder::new(pattern).case_insensitive(case_insensitive).build()?;
        Ok(Self::Regex { path: path.into(), regex })
    }

    /// Combine clauses, collapsing the trivial cases.
    pub fn all(mut clauses: Vec<Filter>) -> Self {
        match clauses.len() {
            0 => Self::True,
            1 => clauses.remove(0),
            _ => Self::And(clauses),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct UpdateDoc {
    pub set: Vec<(String, Bson)>,
    pub inc: Vec<(String, Bson)>,
    pub unset: Vec<String>,
}

impl UpdateDoc {
    pub fn set(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self { set: vec![(path.into(), value.into())], ..Self::default() }
    }

    pub fn inc(path: impl Into<String>, by: impl Into<Bson>) -> Self {
        Self { inc: vec![(path.into(), by.into())], ..Self::default() }
    }

    /// `$set` every top-level field of `doc`.
    pub fn set_all(doc: bson::Document) -> Self {
        Self { set: doc.into_iter().collect(), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty() && self.unset.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}
