use thiserror::Error;

/// Failures raised by a `DocumentStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("BSON encode: {0}")]
    BsonEncode(#[from] bson::ser::Error),

    #[error("BSON decode: {0}")]
    BsonDecode(#[from] bson::de::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate key in {collection}: _id {id}")]
    DuplicateKey { collection: String, id: String },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Operation `index` of a batch failed; `applied` operations were committed.
    #[error("batch operation {index} failed after {applied} applied: {reason}")]
    BatchFailed { index: usize, applied: u64, reason: Box<StoreError> },
}

/// Failures surfaced by the repositories.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid identifier for {field}: {value:?}")]
    InvalidIdentifier { field: String, value: String },

    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("no channel with channelId {0}")]
    ChannelNotFound(String),

    #[error("bulk update failed: {0}")]
    BulkUpdate(#[source] StoreError),

    #[error("bulk insert failed after {inserted} inserted: {source}")]
    BulkInsert {
        inserted: u64,
        #[source]
        source: StoreError,
    },

    #[error("{op} failed: {source}")]
    StoreUnavailable {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("cannot map {entity} document: {message}")]
    Decode { entity: &'static str, message: String },
}

impl CatalogError {
    pub(crate) fn invalid_id(field: &str, value: impl Into<String>) -> Self {
        Self::InvalidIdentifier { field: field.to_string(), value: value.into() }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
