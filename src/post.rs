use crate::cms::RawDocument;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A raw document that cannot be projected into a view model. Formatting is
/// all-or-nothing: no partial record is ever constructed.
#[derive(Debug, Error)]
pub enum MalformedRecord {
    #[error("document {id} has no data object")]
    MissingData { id: String },
    #[error("document {id} is missing field {field:?}")]
    MissingField { id: String, field: &'static str },
    #[error("document {id} field {field:?} has an unexpected shape")]
    InvalidField {
        id: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// View-ready summary of one post, as shown in the listing. Immutable once
/// formatted; the publication date stays in ISO form here and is localized
/// by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Pure projection of a raw record. Null `uid` or publication date is a
    /// legitimate state (unpublished draft, preview-only document) and must
    /// not fail; a missing `data` object or named field fails loudly.
    pub fn from_raw(raw: &RawDocument) -> Result<PostSummary, MalformedRecord> {
        let data = data_object(raw)?;
        Ok(PostSummary {
            uid: raw.uid.clone(),
            first_publication_date: raw.first_publication_date.clone(),
            title: string_field(&raw.id, data, "title")?,
            subtitle: string_field(&raw.id, data, "subtitle")?,
            author: string_field(&raw.id, data, "author")?,
        })
    }
}

/// One paragraph of body text within a content section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BodyBlock {
    pub text: String,
}

/// One content section: a heading followed by its body paragraphs, in
/// document order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<BodyBlock>,
}

/// Read-only projection of one full post document.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub content: Vec<ContentBlock>,
}

impl PostDetail {
    pub fn from_raw(raw: &RawDocument) -> Result<PostDetail, MalformedRecord> {
        let data = data_object(raw)?;

        let banner = data
            .get("banner")
            .ok_or(MalformedRecord::MissingField {
                id: raw.id.clone(),
                field: "banner",
            })?;
        let banner_url = banner
            .get("url")
            .and_then(Value::as_str)
            .ok_or(MalformedRecord::MissingField {
                id: raw.id.clone(),
                field: "banner.url",
            })?
            .to_string();

        let content_value = data.get("content").ok_or(MalformedRecord::MissingField {
            id: raw.id.clone(),
            field: "content",
        })?;
        let content: Vec<ContentBlock> = serde_json::from_value(content_value.clone())
            .map_err(|source| MalformedRecord::InvalidField {
                id: raw.id.clone(),
                field: "content",
                source,
            })?;

        Ok(PostDetail {
            first_publication_date: raw.first_publication_date.clone(),
            last_publication_date: raw.last_publication_date.clone(),
            title: string_field(&raw.id, data, "title")?,
            banner_url,
            author: string_field(&raw.id, data, "author")?,
            content,
        })
    }

    /// The post was edited after publication when the two dates differ.
    pub fn was_edited(&self) -> bool {
        match (&self.first_publication_date, &self.last_publication_date) {
            (Some(first), Some(last)) => first != last,
            _ => false,
        }
    }
}

/// Just the title of a raw record, used for navigation links.
pub fn title_of(raw: &RawDocument) -> Result<String, MalformedRecord> {
    string_field(&raw.id, data_object(raw)?, "title")
}

fn data_object<'a>(
    raw: &'a RawDocument,
) -> Result<&'a serde_json::Map<String, Value>, MalformedRecord> {
    raw.data.as_object().ok_or(MalformedRecord::MissingData {
        id: raw.id.clone(),
    })
}

fn string_field(
    id: &str,
    data: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<String, MalformedRecord> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(MalformedRecord::MissingField {
            id: id.to_string(),
            field,
        })
}
