//! Versioned documents
//!
//! A [`Document`] is the unit of state owned by one service instance:
//! identity (`link`), schema tag (`kind`), `version`, `update_time`, and
//! the user payload (`fields`).
//!
//! ## Content equality
//!
//! Two documents are content-equal when their user fields are equal
//! (see [`FieldValue`] for the temporal rules). Metadata is not part of
//! content: re-posting the same fields is a no-op regardless of link,
//! version, or time.
//!
//! ## Wire form
//!
//! [`Document::to_json`] / [`Document::from_json`] are the transmit
//! boundary. Every field variant is tagged on the wire, so an instant, an
//! offset time and a zoned time come back as the same variant they left as.

use crate::contract::{Timestamp, Version};
use crate::error::Result;
use crate::field::{FieldValue, Fields};
use crate::link::{DocumentKind, DocumentLink};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Reserved property: the document's link
pub const PROPERTY_SELF_LINK: &str = "documentSelfLink";
/// Reserved property: the document's kind
pub const PROPERTY_KIND: &str = "documentKind";
/// Reserved property: the document's version
pub const PROPERTY_VERSION: &str = "documentVersion";

/// Versioned, identified unit of state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity
    #[serde(rename = "documentSelfLink")]
    pub link: DocumentLink,
    /// Schema tag
    #[serde(rename = "documentKind")]
    pub kind: DocumentKind,
    /// Mutation counter
    #[serde(rename = "documentVersion")]
    pub version: Version,
    /// Commit time of this version
    #[serde(rename = "documentUpdateTimeMicros")]
    pub update_time: Timestamp,
    /// User payload
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    /// Create a document at the initial version
    pub fn new(link: DocumentLink, kind: DocumentKind, fields: Fields) -> Self {
        Self::at_version(link, kind, Version::INITIAL, fields)
    }

    /// Create a document at an explicit version, stamped now
    pub fn at_version(link: DocumentLink, kind: DocumentKind, version: Version, fields: Fields) -> Self {
        Document {
            link,
            kind,
            version,
            update_time: Timestamp::now(),
            fields,
        }
    }

    /// Successor document carrying `fields`
    ///
    /// The version is incremented once and the update time moves forward.
    pub fn successor(&self, fields: Fields) -> Document {
        Document {
            link: self.link.clone(),
            kind: self.kind.clone(),
            version: self.version.increment(),
            update_time: Timestamp::now_after(self.update_time),
            fields,
        }
    }

    /// Content equality: user fields only
    pub fn content_equal(&self, other: &Document) -> bool {
        self.fields == other.fields
    }

    /// Check whether `fields` would leave this document unchanged
    pub fn has_content(&self, fields: &Fields) -> bool {
        &self.fields == fields
    }

    /// Get a user field
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Resolve a property by name
    ///
    /// Reserved metadata names resolve against the document's metadata;
    /// anything else is a (possibly dotted) path into the user fields.
    pub fn property(&self, name: &str) -> Option<Cow<'_, FieldValue>> {
        match name {
            PROPERTY_SELF_LINK => Some(Cow::Owned(FieldValue::Text(self.link.to_string()))),
            PROPERTY_KIND => Some(Cow::Owned(FieldValue::Text(self.kind.to_string()))),
            PROPERTY_VERSION => {
                let v = i64::try_from(self.version.as_u64()).unwrap_or(i64::MAX);
                Some(Cow::Owned(FieldValue::Int(v)))
            }
            _ => self.fields.get_path(name).map(Cow::Borrowed),
        }
    }

    /// Encode for transmission
    ///
    /// Fails with a validation error rather than emit a document that
    /// would not decode.
    pub fn to_json(&self) -> Result<String> {
        self.fields.ensure_storable()?;
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a transmitted document
    pub fn from_json(json: &str) -> Result<Document> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Body of a create or update request
///
/// `self_link` is optional on create: without it the factory assigns one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentBody {
    /// Requested link, either a bare name or a full path
    #[serde(rename = "documentSelfLink", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// User payload
    #[serde(default)]
    pub fields: Fields,
}

impl DocumentBody {
    /// Body with no requested link
    pub fn new(fields: Fields) -> Self {
        DocumentBody {
            self_link: None,
            fields,
        }
    }

    /// Request a specific link
    pub fn with_self_link(mut self, link: impl Into<String>) -> Self {
        self.self_link = Some(link.into());
        self
    }
}

impl From<Fields> for DocumentBody {
    fn from(fields: Fields) -> Self {
        DocumentBody::new(fields)
    }
}
