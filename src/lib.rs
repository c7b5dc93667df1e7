//! dochost - versioned document services with idempotent factories
//!
//! Every document lives at a link and is owned by a single-writer service
//! instance. Factories create instances on POST, and a POST that carries an
//! existing link with identical content leaves the version untouched.
//!
//! # Quick Start
//!
//! ```ignore
//! use dochost::{DocumentBody, DocumentLink, Fields, HostConfig, OpenSchema, ServiceHost};
//! use std::sync::Arc;
//!
//! let host = ServiceHost::new(HostConfig::default())?;
//! host.start_factory(DocumentLink::new("/things"), Arc::new(OpenSchema::new("thing")))?;
//!
//! let body = DocumentBody::new(Fields::new().with("name", "a")).with_self_link("a");
//! let first = host.create(&DocumentLink::new("/things"), body.clone())?;
//! let again = host.create(&DocumentLink::new("/things"), body)?;
//! assert_eq!(first.document.version, again.document.version);
//! ```
//!
//! # Layout
//!
//! - document model, queries and errors come from `dochost-core`
//! - instances, factories and the host come from `dochost-engine`
//! - user groups come from `dochost-services`

pub use dochost_core::*;
pub use dochost_engine::*;
pub use dochost_services::*;
