//! Document schemas
//!
//! A factory validates every body against its [`DocumentSchema`] before a
//! service instance is touched. [`OpenSchema`] accepts any field bag;
//! [`TypedSchema`] adapts a Rust struct implementing [`TypedDocument`].

use crate::document::Document;
use crate::error::Result;
use crate::field::Fields;
use crate::link::DocumentKind;
use std::marker::PhantomData;

/// Schema a factory enforces on its documents
pub trait DocumentSchema: Send + Sync {
    /// Kind tag stamped on every document
    fn kind(&self) -> &DocumentKind;

    /// Check a candidate body
    ///
    /// Errors are reported to the caller as-is, so they should be
    /// `Error::Validation` with a human-readable reason.
    fn validate(&self, fields: &Fields) -> Result<()>;
}

/// Schema that accepts any fields
#[derive(Debug, Clone)]
pub struct OpenSchema {
    kind: DocumentKind,
}

impl OpenSchema {
    /// Create an open schema for `kind`
    pub fn new(kind: impl Into<String>) -> Self {
        OpenSchema {
            kind: DocumentKind::new(kind),
        }
    }
}

impl DocumentSchema for OpenSchema {
    fn kind(&self) -> &DocumentKind {
        &self.kind
    }

    fn validate(&self, _fields: &Fields) -> Result<()> {
        Ok(())
    }
}

/// A document state with a Rust representation
pub trait TypedDocument: Sized {
    /// Kind tag for this state
    const KIND: &'static str;

    /// Flatten into fields; unset options must stay absent
    fn to_fields(&self) -> Fields;

    /// Rebuild from fields
    fn from_fields(fields: &Fields) -> Result<Self>;

    /// Schema-level invariants
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Rebuild from a stored document
    fn from_document(document: &Document) -> Result<Self> {
        Self::from_fields(&document.fields)
    }
}

/// [`DocumentSchema`] backed by a [`TypedDocument`]
pub struct TypedSchema<T> {
    kind: DocumentKind,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TypedDocument> TypedSchema<T> {
    /// Create the schema for `T`
    pub fn new() -> Self {
        TypedSchema {
            kind: DocumentKind::new(T::KIND),
            _marker: PhantomData,
        }
    }
}

impl<T: TypedDocument> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TypedDocument> DocumentSchema for TypedSchema<T> {
    fn kind(&self) -> &DocumentKind {
        &self.kind
    }

    fn validate(&self, fields: &Fields) -> Result<()> {
        T::from_fields(fields)?.validate()
    }
}
