//! Core types for dochost
//!
//! This crate defines the document model shared by every other crate:
//! - DocumentLink / DocumentKind: identity and schema tag
//! - FieldValue / Fields: typed, type-preserving document payload
//! - Document / DocumentBody: versioned state and request bodies
//! - Query / QueryTerm: structural term matching
//! - DocumentSchema / TypedDocument: validation seams for factories
//! - Error: error taxonomy and outcome classes
//! - Contract types: Version, Timestamp

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod document;
pub mod error;
pub mod field;
pub mod link;
pub mod query;
pub mod schema;

pub use contract::{Timestamp, Version};
pub use document::{Document, DocumentBody, PROPERTY_KIND, PROPERTY_SELF_LINK, PROPERTY_VERSION};
pub use error::{Error, OutcomeClass, Result};
pub use field::{FieldPatch, FieldValue, Fields, UriRef, ZonedTime};
pub use link::{DocumentKind, DocumentLink};
pub use query::{matches, Occurance, Query, QueryTerm};
pub use schema::{DocumentSchema, OpenSchema, TypedDocument, TypedSchema};
