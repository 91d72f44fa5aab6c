//! Database models

use serde::{Deserialize, Serialize};

/// One stored track and its two media references
///
/// `file_url` locates the audio asset, `thumbnail_url` the cover image.
/// Either may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub guid: String,
    pub title: String,
    pub artist: Option<String>,
    pub file_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// API token metadata (the token itself is never stored)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub is_admin: bool,
}

/// The two reference columns of a [`MediaRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaField {
    /// Audio asset (`file_url`)
    FileUrl,
    /// Thumbnail image (`thumbnail_url`)
    ThumbnailUrl,
}

impl MediaField {
    pub const ALL: [MediaField; 2] = [MediaField::FileUrl, MediaField::ThumbnailUrl];

    /// Column name in the `music` table
    pub fn column(&self) -> &'static str {
        match self {
            MediaField::FileUrl => "file_url",
            MediaField::ThumbnailUrl => "thumbnail_url",
        }
    }

    /// Current value of this field on a record
    pub fn value<'a>(&self, record: &'a MediaRecord) -> Option<&'a str> {
        match self {
            MediaField::FileUrl => record.file_url.as_deref(),
            MediaField::ThumbnailUrl => record.thumbnail_url.as_deref(),
        }
    }
}

impl std::fmt::Display for MediaField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Partial update of a record's references; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceUpdate {
    pub file_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl ReferenceUpdate {
    pub fn set(&mut self, field: MediaField, value: String) {
        match field {
            MediaField::FileUrl => self.file_url = Some(value),
            MediaField::ThumbnailUrl => self.thumbnail_url = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_url.is_none() && self.thumbnail_url.is_none()
    }
}
