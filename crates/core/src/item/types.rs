//! Item types and data structures.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lectern_shared::types::ItemId;
use serde::{Deserialize, Serialize};

use super::error::ItemError;
use crate::storage::{FileId, UploadFile};

/// The two file references an item can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileSlot {
    /// Cover image.
    Thumbnail,
    /// Audio recording.
    AudioFile,
}

impl FileSlot {
    /// Both slots, in upload order.
    pub const ALL: [Self; 2] = [Self::Thumbnail, Self::AudioFile];

    /// Form field and JSON key for this slot.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::AudioFile => "audioFile",
        }
    }

    /// Parse a form field name.
    #[must_use]
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.field_name() == name)
    }
}

/// Item domain model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,
    /// Display label.
    pub name: Option<String>,
    /// When the sermon was given.
    pub date: DateTime<Utc>,
    /// Speaker name.
    pub speaker: Option<String>,
    /// Series the item belongs to.
    pub series: Option<String>,
    /// Remote file identifier of the thumbnail image.
    pub thumbnail: Option<FileId>,
    /// Remote file identifier of the audio recording.
    pub audio_file: Option<FileId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// The file reference held in a slot.
    #[must_use]
    pub fn file(&self, slot: FileSlot) -> Option<&str> {
        match slot {
            FileSlot::Thumbnail => self.thumbnail.as_deref(),
            FileSlot::AudioFile => self.audio_file.as_deref(),
        }
    }
}

/// Input for creating an item record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    /// Display label.
    pub name: Option<String>,
    /// Item date.
    pub date: DateTime<Utc>,
    /// Speaker name.
    pub speaker: Option<String>,
    /// Series name.
    pub series: Option<String>,
    /// Thumbnail file identifier.
    pub thumbnail: Option<FileId>,
    /// Audio file identifier.
    pub audio_file: Option<FileId>,
}

/// Sparse update: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    /// New display label.
    pub name: Option<String>,
    /// New date.
    pub date: Option<DateTime<Utc>>,
    /// New speaker.
    pub speaker: Option<String>,
    /// New series.
    pub series: Option<String>,
    /// New thumbnail file identifier.
    pub thumbnail: Option<FileId>,
    /// New audio file identifier.
    pub audio_file: Option<FileId>,
}

impl ItemPatch {
    /// Stage a new file identifier for a slot.
    pub fn set_file(&mut self, slot: FileSlot, file_id: FileId) {
        match slot {
            FileSlot::Thumbnail => self.thumbnail = Some(file_id),
            FileSlot::AudioFile => self.audio_file = Some(file_id),
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Text fields of a create or edit request.
///
/// Blank values count as omitted: a request cannot clear a field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemFields {
    /// Display label.
    pub name: Option<String>,
    /// Date as sent by the client.
    pub date: Option<String>,
    /// Speaker name.
    pub speaker: Option<String>,
    /// Series name.
    pub series: Option<String>,
}

impl ItemFields {
    /// Set a text field by its form name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        match name {
            "name" => self.name = Some(value),
            "date" => self.date = Some(value),
            "speaker" => self.speaker = Some(value),
            "series" => self.series = Some(value),
            _ => {}
        }
    }

    /// Parse into a sparse patch.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::Validation` for an unparseable date.
    pub fn into_patch(self) -> Result<ItemPatch, ItemError> {
        Ok(ItemPatch {
            date: non_blank(self.date)
                .map(|d| parse_item_date(&d))
                .transpose()?,
            name: non_blank(self.name),
            speaker: non_blank(self.speaker),
            series: non_blank(self.series),
            thumbnail: None,
            audio_file: None,
        })
    }

    /// Parse into a new record, dating it `now` when no date was sent.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::Validation` for an unparseable date.
    pub fn into_new_item(self, now: DateTime<Utc>) -> Result<NewItem, ItemError> {
        let patch = self.into_patch()?;
        Ok(NewItem {
            name: patch.name,
            date: patch.date.unwrap_or(now),
            speaker: patch.speaker,
            series: patch.series,
            thumbnail: None,
            audio_file: None,
        })
    }
}

/// Files attached to a create or edit request.
#[derive(Debug, Clone, Default)]
pub struct ItemFiles {
    /// New thumbnail image.
    pub thumbnail: Option<UploadFile>,
    /// New audio recording.
    pub audio_file: Option<UploadFile>,
}

impl ItemFiles {
    /// Attach a file to a slot, replacing any earlier one.
    pub fn set(&mut self, slot: FileSlot, file: UploadFile) {
        match slot {
            FileSlot::Thumbnail => self.thumbnail = Some(file),
            FileSlot::AudioFile => self.audio_file = Some(file),
        }
    }

    /// The file attached to a slot.
    #[must_use]
    pub fn get(&self, slot: FileSlot) -> Option<&UploadFile> {
        match slot {
            FileSlot::Thumbnail => self.thumbnail.as_ref(),
            FileSlot::AudioFile => self.audio_file.as_ref(),
        }
    }

    /// Attached files in upload order.
    pub fn iter(&self) -> impl Iterator<Item = (FileSlot, &UploadFile)> {
        FileSlot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|file| (slot, file)))
    }

    /// Whether no file is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thumbnail.is_none() && self.audio_file.is_none()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a client supplied date.
///
/// Accepts RFC 3339 timestamps, plain `YYYY-MM-DD` dates (midnight UTC) and
/// `YYYY-MM-DDTHH:MM[:SS]` local times, which are read as UTC.
///
/// # Errors
///
/// Returns `ItemError::Validation` if no format matches.
pub fn parse_item_date(value: &str) -> Result<DateTime<Utc>, ItemError> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts.and_utc());
        }
    }

    Err(ItemError::validation(format!("invalid date '{value}'")))
}
