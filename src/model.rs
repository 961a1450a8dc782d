//! Catalog records as stored in the `video`, `channel` and admin-channel collections.
//!
//! Field names follow the stored documents, which is why a few of them are camelCase.

use crate::errors::CatalogError;
use crate::types::IdInput;
use bson::Document as BsonDocument;
use bson::oid::ObjectId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_presentation: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<bson::DateTime>,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub favorite: bool,
    /// `channelId` of the owning channel.
    #[serde(default)]
    pub channel_id: String,
    /// Denormalized copy of the owning channel, repaired on channel changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<ViewCount>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

impl VideoRecord {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: ObjectId::new(),
            title_presentation: title.clone(),
            title,
            url: url.into(),
            published_at: None,
            visible: false,
            applied: false,
            favorite: false,
            channel_id: String::new(),
            channel: None,
            views: None,
            thumbnails: Vec::new(),
        }
    }

    /// Attach the video to `channel`, embedding its current state.
    #[must_use]
    pub fn with_channel(mut self, channel: &ChannelRecord) -> Self {
        self.channel_id = channel.channel_id.clone();
        self.channel = Some(channel.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCount {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub pretty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "channelId", default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub channel_name_presentation: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(rename = "targetLanguage", default)]
    pub target_language: String,
    #[serde(default)]
    pub type_platforms: Vec<String>,
    #[serde(default)]
    pub adm_channels: Vec<AdminChannelRef>,
    #[serde(default)]
    pub applied_videos: i64,
}

impl ChannelRecord {
    pub fn new(channel_id: impl Into<String>, channel_name: impl Into<String>) -> Self {
        let channel_name = channel_name.into();
        Self {
            id: ObjectId::new(),
            channel_id: channel_id.into(),
            channel_name_presentation: channel_name.clone(),
            channel_name,
            targets: Vec::new(),
            target_language: String::new(),
            type_platforms: Vec::new(),
            adm_channels: Vec::new(),
            applied_videos: 0,
        }
    }
}

/// Reference from a channel to an admin channel. Older documents store the id as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminChannelRef {
    #[serde(rename = "_id")]
    pub id: IdInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name_presentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminChannelRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub channel_name_presentation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub channels: Vec<SubChannel>,
}

impl AdminChannelRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            channel_name_presentation: name.into(),
            description: String::new(),
            targets: Vec::new(),
            channels: Vec::new(),
        }
    }
}

/// One language variant of an admin channel and its per-platform links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubChannel {
    pub language: String,
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformLink>,
}

impl SubChannel {
    /// Platforms with `enable` set, in name order.
    pub fn enabled_platforms(&self) -> impl Iterator<Item = (&str, &PlatformLink)> {
        self.platforms.iter().filter(|(_, p)| p.enable).map(|(name, p)| (name.as_str(), p))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLink {
    #[serde(default)]
    pub enable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Partial video update: only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoPatch {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<IdInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_presentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

impl VideoPatch {
    pub fn for_id(id: impl Into<IdInput>) -> Self {
        Self { id: Some(id.into()), ..Self::default() }
    }
}

pub(crate) fn to_document<T: Serialize>(entity: &'static str, value: &T) -> Result<BsonDocument, CatalogError> {
    bson::to_document(value).map_err(|e| CatalogError::Decode { entity, message: e.to_string() })
}

pub(crate) fn from_document<T: DeserializeOwned>(entity: &'static str, doc: BsonDocument) -> Result<T, CatalogError> {
    bson::from_document(doc).map_err(|e| CatalogError::Decode { entity, message: e.to_string() })
}
