//! Service host: routes operations to factories and instances
//!
//! The host is the boundary the transport layer talks to. It offers a
//! direct API (`create`, `read`, `update`, `patch`, `delete`) and an
//! operation-based one (`handle`, `send`, `send_with`) for callers that
//! deliver an operation and wait for a completion.
//!
//! ## Completion
//!
//! `send` and `send_with` run the operation on tokio's blocking pool, so
//! many operations can be in flight at once. Completions may arrive on any
//! worker. Operations on one link stay strictly ordered by that link's
//! instance; nothing is promised across links.

use crate::config::HostConfig;
use crate::factory::{CreateOutcome, Factory};
use crate::instance::InstanceLimits;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dochost_core::{
    Document, DocumentBody, DocumentLink, DocumentSchema, Error, FieldPatch, Fields, OpenSchema,
    QueryTerm, Result,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// An operation delivered by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Idempotent create at a factory
    Post {
        /// Factory link
        factory: DocumentLink,
        /// Request body
        body: DocumentBody,
    },
    /// Read a document
    Get {
        /// Document link
        link: DocumentLink,
    },
    /// Replace a document's fields
    Put {
        /// Document link
        link: DocumentLink,
        /// New fields
        fields: Fields,
    },
    /// Merge into a document's fields
    Patch {
        /// Document link
        link: DocumentLink,
        /// Fields to set or clear
        patch: FieldPatch,
    },
    /// Delete a document
    Delete {
        /// Document link
        link: DocumentLink,
    },
}

impl Operation {
    /// Post `body` to `factory`
    pub fn post(factory: impl Into<DocumentLink>, body: impl Into<DocumentBody>) -> Self {
        Operation::Post {
            factory: factory.into(),
            body: body.into(),
        }
    }

    /// Get `link`
    pub fn get(link: impl Into<DocumentLink>) -> Self {
        Operation::Get { link: link.into() }
    }

    /// Put `fields` at `link`
    pub fn put(link: impl Into<DocumentLink>, fields: Fields) -> Self {
        Operation::Put {
            link: link.into(),
            fields,
        }
    }

    /// Patch `link`
    pub fn patch(link: impl Into<DocumentLink>, patch: FieldPatch) -> Self {
        Operation::Patch {
            link: link.into(),
            patch,
        }
    }

    /// Delete `link`
    pub fn delete(link: impl Into<DocumentLink>) -> Self {
        Operation::Delete { link: link.into() }
    }

    /// Link the operation is addressed to
    pub fn target(&self) -> &DocumentLink {
        match self {
            Operation::Post { factory, .. } => factory,
            Operation::Get { link }
            | Operation::Put { link, .. }
            | Operation::Patch { link, .. }
            | Operation::Delete { link } => link,
        }
    }
}

/// Successful completion of an operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    /// A post, with the path it took
    Posted(CreateOutcome),
    /// A get, put or patch
    Document(Document),
    /// A delete; carries the final document
    Deleted(Document),
}

impl OperationResult {
    /// The document the operation produced or observed
    pub fn document(&self) -> &Document {
        match self {
            OperationResult::Posted(outcome) => &outcome.document,
            OperationResult::Document(doc) | OperationResult::Deleted(doc) => doc,
        }
    }

    /// Consume into the document
    pub fn into_document(self) -> Document {
        match self {
            OperationResult::Posted(outcome) => outcome.document,
            OperationResult::Document(doc) | OperationResult::Deleted(doc) => doc,
        }
    }
}

/// Hosts factories and dispatches operations to them
pub struct ServiceHost {
    config: HostConfig,
    factories: DashMap<DocumentLink, Arc<Factory>>,
}

impl ServiceHost {
    /// Create a host and start the factories listed in `config`
    pub fn new(config: HostConfig) -> Result<Self> {
        config.validate()?;
        let host = ServiceHost {
            config,
            factories: DashMap::new(),
        };
        for factory in host.config.factories.clone() {
            host.start_factory(
                DocumentLink::new(&factory.link),
                Arc::new(OpenSchema::new(factory.kind)),
            )?;
        }
        info!(
            target: "dochost::host",
            factories = host.factories.len(),
            read_timeout_ms = host.config.read_timeout_ms,
            "Service host started"
        );
        Ok(host)
    }

    /// Host configuration
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Limits applied to new instances
    pub fn instance_limits(&self) -> InstanceLimits {
        self.config.instance_limits()
    }

    /// Start a factory at `link`
    ///
    /// Fails if a factory is already running there.
    pub fn start_factory(
        &self,
        link: DocumentLink,
        schema: Arc<dyn DocumentSchema>,
    ) -> Result<Arc<Factory>> {
        if link.as_str() == "/" {
            return Err(Error::validation("factory link must not be the root"));
        }
        match self.factories.entry(link.clone()) {
            Entry::Occupied(_) => Err(Error::validation(format!(
                "factory already started at {}",
                link
            ))),
            Entry::Vacant(entry) => {
                let factory = Arc::new(Factory::new(link.clone(), schema, self.instance_limits()));
                entry.insert(Arc::clone(&factory));
                info!(
                    target: "dochost::host",
                    factory = %link,
                    kind = %factory.kind(),
                    "Factory started"
                );
                Ok(factory)
            }
        }
    }

    /// Factory at exactly `link`
    pub fn factory(&self, link: &DocumentLink) -> Result<Arc<Factory>> {
        self.factories
            .get(link)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound(link.clone()))
    }

    /// Links of all started factories, sorted
    pub fn factory_links(&self) -> Vec<DocumentLink> {
        let mut links: Vec<DocumentLink> =
            self.factories.iter().map(|e| e.key().clone()).collect();
        links.sort();
        links
    }

    /// Factory owning the document at `link`: its nearest ancestor factory
    pub fn owner_of(&self, link: &DocumentLink) -> Result<Arc<Factory>> {
        let mut current = link.parent();
        while let Some(candidate) = current {
            if let Some(entry) = self.factories.get(&candidate) {
                return Ok(Arc::clone(entry.value()));
            }
            current = candidate.parent();
        }
        Err(Error::NotFound(link.clone()))
    }

    /// Idempotent create at `factory`
    ///
    /// A requested self link that falls under a nested factory is rejected:
    /// reads route to the nearest owning factory, so the document would be
    /// unreachable.
    pub fn create(&self, factory: &DocumentLink, body: DocumentBody) -> Result<CreateOutcome> {
        let factory = self.factory(factory)?;
        if let Some(requested) = body.self_link.as_deref() {
            let link = factory.resolve_link(Some(requested))?;
            let owner = self.owner_of(&link)?;
            if !Arc::ptr_eq(&owner, &factory) {
                return Err(Error::validation(format!(
                    "documentSelfLink {} belongs to factory {}",
                    link,
                    owner.link()
                )));
            }
        }
        factory.create(body)
    }

    /// Current document at `link`
    pub fn read(&self, link: &DocumentLink) -> Result<Document> {
        self.owner_of(link)?.read(link)
    }

    /// Replace the fields at `link`
    pub fn update(&self, link: &DocumentLink, fields: Fields) -> Result<Document> {
        self.owner_of(link)?.update(link, fields)
    }

    /// Merge a patch into `link`
    pub fn patch(&self, link: &DocumentLink, patch: FieldPatch) -> Result<Document> {
        self.owner_of(link)?.patch(link, patch).map(|(doc, _)| doc)
    }

    /// Delete `link`, returning its final document
    pub fn delete(&self, link: &DocumentLink) -> Result<Document> {
        self.owner_of(link)?.delete(link)
    }

    /// Current and retained prior versions of `link`, newest first
    pub fn history(&self, link: &DocumentLink) -> Result<Vec<Document>> {
        self.owner_of(link)?.history(link)
    }

    /// Current documents of every instance below `factory`
    pub fn documents_of(&self, factory: &DocumentLink) -> Result<Vec<Document>> {
        Ok(self.factory(factory)?.documents())
    }

    /// Does `term` select `document`?
    pub fn query_match(&self, term: &QueryTerm, document: &Document) -> bool {
        dochost_core::matches(term, document)
    }

    /// Run an operation to completion on the calling thread
    pub fn handle(&self, op: Operation) -> Result<OperationResult> {
        debug!(target: "dochost::host", target_link = %op.target(), "Handling operation");
        match op {
            Operation::Post { factory, body } => {
                self.create(&factory, body).map(OperationResult::Posted)
            }
            Operation::Get { link } => self.read(&link).map(OperationResult::Document),
            Operation::Put { link, fields } => {
                self.update(&link, fields).map(OperationResult::Document)
            }
            Operation::Patch { link, patch } => {
                self.patch(&link, patch).map(OperationResult::Document)
            }
            Operation::Delete { link } => self.delete(&link).map(OperationResult::Deleted),
        }
    }

    /// Dispatch an operation and await its completion
    ///
    /// Must be called from within a tokio runtime.
    pub async fn send(self: &Arc<Self>, op: Operation) -> Result<OperationResult> {
        let host = Arc::clone(self);
        tokio::task::spawn_blocking(move || host.handle(op))
            .await
            .map_err(|e| Error::internal("operation dispatch", e.to_string()))?
    }

    /// Dispatch an operation and invoke `completion` with body-or-error
    ///
    /// Must be called from within a tokio runtime.
    pub fn send_with<F>(self: &Arc<Self>, op: Operation, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<OperationResult>) + Send + 'static,
    {
        let host = Arc::clone(self);
        tokio::task::spawn_blocking(move || completion(host.handle(op)))
    }
}

impl std::fmt::Debug for ServiceHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHost")
            .field("config", &self.config)
            .field("factories", &self.factory_links())
            .finish()
    }
}
