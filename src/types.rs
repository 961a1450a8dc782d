use crate::errors::CatalogError;
use bson::Bson;
use bson::oid::ObjectId;

/// Values accepted wherever an identifier is expected: native ObjectIds or their hex form.
pub trait IntoObjectId {
    /// Coerce to the store's canonical id type. `field` names the input for error reporting.
    fn into_object_id(self, field: &str) -> Result<ObjectId, CatalogError>;
}

impl IntoObjectId for ObjectId {
    fn into_object_id(self, _field: &str) -> Result<ObjectId, CatalogError> {
        Ok(self)
    }
}

impl IntoObjectId for &ObjectId {
    fn into_object_id(self, _field: &str) -> Result<ObjectId, CatalogError> {
        Ok(*self)
    }
}

impl IntoObjectId for &str {
    fn into_object_id(self, field: &str) -> Result<ObjectId, CatalogError> {
        ObjectId::parse_str(self.trim()).map_err(|_| CatalogError::invalid_id(field, self))
    }
}

impl IntoObjectId for String {
    fn into_object_id(self, field: &str) -> Result<ObjectId, CatalogError> {
        self.as_str().into_object_id(field)
    }
}

impl IntoObjectId for &String {
    fn into_object_id(self, field: &str) -> Result<ObjectId, CatalogError> {
        self.as_str().into_object_id(field)
    }
}

impl IntoObjectId for &Bson {
    fn into_object_id(self, field: &str) -> Result<ObjectId, CatalogError> {
        match self {
            Bson::ObjectId(oid) => Ok(*oid),
            Bson::String(s) => s.as_str().into_object_id(field),
            other => Err(CatalogError::invalid_id(field, other.to_string())),
        }
    }
}

/// Either form of identifier, as received from callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum IdInput {
    Native(ObjectId),
    Text(String),
}

impl IntoObjectId for &IdInput {
    fn into_object_id(self, field: &str) -> Result<ObjectId, CatalogError> {
        match self {
            IdInput::Native(oid) => Ok(*oid),
            IdInput::Text(s) => s.as_str().into_object_id(field),
        }
    }
}

impl From<ObjectId> for IdInput {
    fn from(oid: ObjectId) -> Self {
        Self::Native(oid)
    }
}

impl From<&str> for IdInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for IdInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_string_coerces() {
        let oid = ObjectId::new();
        let hex = oid.to_hex();
        assert_eq!(hex.as_str().into_object_id("_id").unwrap(), oid);
        assert_eq!((&IdInput::from(hex)).into_object_id("_id").unwrap(), oid);
    }

    #[test]
    fn malformed_string_is_rejected_with_field_name() {
        let err = "not-an-id".into_object_id("channels_ids").unwrap_err();
        match err {
            CatalogError::InvalidIdentifier { field, value } => {
                assert_eq!(field, "channels_ids");
                assert_eq!(value, "not-an-id");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_string_bson_is_rejected() {
        assert!((&Bson::Int32(7)).into_object_id("_id").is_err());
    }
}
