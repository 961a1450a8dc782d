//! Sparse video filters and their translation into store predicates.
//!
//! Each filterable field owns one clause builder in [`FILTER_FIELDS`]. A builder
//! returns `None` when its field is absent, so an unset field never constrains
//! the result. The predicate is the AND of every clause produced.

use crate::errors::CatalogError;
use crate::query::Filter;
use crate::types::{IdInput, IntoObjectId};
use bson::Bson;
use serde::{Deserialize, Deserializer, Serialize};

/// Caller-supplied filter set. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<IdInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels_ids: Option<Vec<IdInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_after: Option<DateInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_before: Option<DateInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_in_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_in_title_presentation: Option<String>,
    #[serde(deserialize_with = "deserialize_flag", skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(deserialize_with = "deserialize_flag", skip_serializing_if = "Option::is_none")]
    pub applied: Option<bool>,
    #[serde(deserialize_with = "deserialize_flag", skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
    #[serde(rename = "targetLanguage", skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_platforms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adm_channel_id: Option<IdInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name_presentation: Option<String>,
}

/// A publication bound: epoch milliseconds, an RFC 3339 timestamp or a `YYYY-MM-DD` date (UTC midnight).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Millis(i64),
    Text(String),
}

impl DateInput {
    fn to_bson(&self, field: &str) -> Result<Bson, CatalogError> {
        let millis = match self {
            DateInput::Millis(ms) => *ms,
            DateInput::Text(s) => parse_date_millis(s.trim()).ok_or_else(|| {
                CatalogError::InvalidArgument(format!("{field}: unrecognised date {s:?}"))
            })?,
        };
        Ok(Bson::DateTime(bson::DateTime::from_millis(millis)))
    }
}

impl From<i64> for DateInput {
    fn from(millis: i64) -> Self {
        Self::Millis(millis)
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DateInput {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self::Millis(dt.timestamp_millis())
    }
}

fn parse_date_millis(s: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    let day = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

/// Accepts `true`/`false` or their string forms; an empty string means unset.
fn deserialize_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlagRepr {
        Bool(bool),
        Text(String),
    }
    match Option::<FlagRepr>::deserialize(d)? {
        None => Ok(None),
        Some(FlagRepr::Bool(b)) => Ok(Some(b)),
        Some(FlagRepr::Text(s)) => match s.trim() {
            "" => Ok(None),
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("expected \"true\" or \"false\", got {other:?}"))),
        },
    }
}

pub type ClauseBuilder = fn(&FilterSpec) -> Result<Option<Filter>, CatalogError>;

/// Field name → clause builder, applied in order.
pub const FILTER_FIELDS: &[(&str, ClauseBuilder)] = &[
    ("_id", id_clause),
    ("channel_id", channel_id_clause),
    ("channels_ids", channels_ids_clause),
    ("videos_urls", videos_urls_clause),
    ("published_at", published_clause),
    ("keywords_in_title", title_clause),
    ("keywords_in_title_presentation", title_presentation_clause),
    ("visible", visible_clause),
    ("applied", applied_clause),
    ("favorite", favorite_clause),
    ("targets", targets_clause),
    ("targetLanguage", target_language_clause),
    ("type_platforms", type_platforms_clause),
    ("adm_channel_id", adm_channel_clause),
    ("channel_name", channel_name_clause),
    ("channel_name_presentation", channel_name_presentation_clause),
];

/// Build the store predicate for `spec`. Validation failures surface here,
/// before any store call.
///
/// # Errors
/// `InvalidIdentifier` for malformed ids, `InvalidArgument` for unreadable dates.
pub fn build_predicate(spec: &FilterSpec) -> Result<Filter, CatalogError> {
    let mut clauses = Vec::new();
    for (name, build) in FILTER_FIELDS {
        if let Some(clause) = build(spec)? {
            log::trace!("filter clause {name}: {clause:?}");
            clauses.push(clause);
        }
    }
    Ok(Filter::all(clauses))
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|v| !v.trim().is_empty())
}

/// Case-insensitive substring match; the input is matched literally.
fn contains_clause(path: &str, value: &Option<String>) -> Result<Option<Filter>, CatalogError> {
    let Some(v) = non_empty(value) else {
        return Ok(None);
    };
    Filter::regex(path, &regex::escape(v), true)
        .map(Some)
        .map_err(|e| CatalogError::InvalidArgument(format!("{path}: {e}")))
}

fn flag_clause(path: &str, value: Option<bool>) -> Option<Filter> {
    value.map(|b| Filter::eq(path, b))
}

fn strings_in_clause(path: &str, values: &Option<Vec<String>>) -> Option<Filter> {
    values.as_ref().map(|vs| Filter::In {
        path: path.to_string(),
        values: vs.iter().map(|v| Bson::String(v.clone())).collect(),
    })
}

fn id_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    let Some(id) = &spec.id else {
        return Ok(None);
    };
    Ok(Some(Filter::eq("_id", id.into_object_id("_id")?)))
}

fn channel_id_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    Ok(non_empty(&spec.channel_id).map(|c| Filter::eq("channel_id", c)))
}

fn channels_ids_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    let Some(ids) = &spec.channels_ids else {
        return Ok(None);
    };
    let values = ids
        .iter()
        .map(|id| id.into_object_id("channels_ids").map(Bson::ObjectId))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Filter::In { path: "channel._id".into(), values }))
}

fn videos_urls_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    Ok(strings_in_clause("url", &spec.videos_urls))
}

/// Both bounds land in one range clause.
fn published_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    let gte = spec.published_after.as_ref().map(|d| d.to_bson("published_after")).transpose()?;
    let lte = spec.published_before.as_ref().map(|d| d.to_bson("published_before")).transpose()?;
    if gte.is_none() && lte.is_none() {
        return Ok(None);
    }
    Ok(Some(Filter::Range { path: "published_at".into(), gte, lte }))
}

fn title_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    contains_clause("title", &spec.keywords_in_title)
}

fn title_presentation_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    contains_clause("title_presentation", &spec.keywords_in_title_presentation)
}

fn visible_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    Ok(flag_clause("visible", spec.visible))
}

fn applied_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    Ok(flag_clause("applied", spec.applied))
}

fn favorite_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    Ok(flag_clause("favorite", spec.favorite))
}

fn targets_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    Ok(strings_in_clause("channel.targets", &spec.targets))
}

fn target_language_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    Ok(non_empty(&spec.target_language).map(|l| Filter::eq("channel.targetLanguage", l)))
}

fn type_platforms_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    Ok(strings_in_clause("channel.type_platforms", &spec.type_platforms))
}

/// Admin channel references may hold the id natively or as its hex string.
fn adm_channel_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    let Some(id) = &spec.adm_channel_id else {
        return Ok(None);
    };
    let oid = id.into_object_id("adm_channel_id")?;
    let matches_ref = Filter::Or(vec![Filter::eq("_id", oid), Filter::eq("_id", oid.to_hex())]);
    Ok(Some(Filter::ElemMatch { path: "channel.adm_channels".into(), filter: Box::new(matches_ref) }))
}

fn channel_name_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    contains_clause("channel.channel_name", &spec.channel_name)
}

fn channel_name_presentation_clause(spec: &FilterSpec) -> Result<Option<Filter>, CatalogError> {
    contains_clause("channel.channel_name_presentation", &spec.channel_name_presentation)
}
