//! Factories: link -> service instance mapping and idempotent creation
//!
//! ## Create algorithm
//!
//! ```text
//! 1. validate body against the schema      (failure: no instance touched)
//! 2. derive link: explicit self link, else factory/<uuid>
//! 3. entry(link) on the instance map
//!      vacant   -> insert a new instance at the initial version  => Created
//!      occupied -> instance.post(fields)
//!                    content-equal                               => Unchanged
//!                    otherwise, version + 1                      => Updated
//! ```
//!
//! The map's entry API makes insert-if-absent atomic: exactly one of many
//! concurrent creators of a link materializes the instance, the rest are
//! handed the winner and go through the instance's serialized post path.
//!
//! ## Delete and re-create
//!
//! Deleting records the final version as a tombstone while the instance's
//! write lock is held, then drops the instance from the map. A later create
//! of the same link continues from tombstone + 1, so versions are never
//! reused for a link.
//!
//! Tombstones are kept for the life of the factory: one entry per deleted
//! link that has not been re-created. Dropping one would let a re-created
//! link restart at the initial version.

use crate::instance::{Disposition, InstanceLimits, ServiceInstance};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dochost_core::{
    Document, DocumentBody, DocumentKind, DocumentLink, DocumentSchema, Error, FieldPatch, Fields,
    Result, Version,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a create request
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    /// Authoritative document after the request
    pub document: Document,
    /// Which path the request took
    pub disposition: Disposition,
}

/// Creates and owns the service instances below one link
pub struct Factory {
    link: DocumentLink,
    schema: Arc<dyn DocumentSchema>,
    limits: InstanceLimits,
    instances: DashMap<DocumentLink, Arc<ServiceInstance>>,
    tombstones: Arc<DashMap<DocumentLink, Version>>,
}

impl Factory {
    /// Create a factory at `link` enforcing `schema`
    pub fn new(link: DocumentLink, schema: Arc<dyn DocumentSchema>, limits: InstanceLimits) -> Self {
        Factory {
            link,
            schema,
            limits,
            instances: DashMap::new(),
            tombstones: Arc::new(DashMap::new()),
        }
    }

    /// Factory link
    pub fn link(&self) -> &DocumentLink {
        &self.link
    }

    /// Kind of the documents this factory creates
    pub fn kind(&self) -> &DocumentKind {
        self.schema.kind()
    }

    /// Idempotent create
    pub fn create(&self, body: DocumentBody) -> Result<CreateOutcome> {
        if let Err(e) = self.validate(&body.fields) {
            warn!(
                target: "dochost::factory",
                factory = %self.link,
                reason = %e,
                "Rejected create"
            );
            return Err(e);
        }
        let link = self.resolve_link(body.self_link.as_deref())?;
        let fields = body.fields;

        loop {
            let instance = match self.instances.entry(link.clone()) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    let version = self
                        .tombstones
                        .remove(&link)
                        .map(|(_, last)| last.increment())
                        .unwrap_or(Version::INITIAL);
                    let document = Document::at_version(
                        link.clone(),
                        self.kind().clone(),
                        version,
                        fields.clone(),
                    );
                    entry.insert(Arc::new(ServiceInstance::new(document.clone(), self.limits)));
                    return Ok(CreateOutcome {
                        document,
                        disposition: Disposition::Created,
                    });
                }
            };

            match instance.post(fields.clone()) {
                Ok((document, disposition)) => {
                    return Ok(CreateOutcome {
                        document,
                        disposition,
                    })
                }
                Err(Error::NotFound(_)) => {
                    // Lost a race with delete; drop the retired instance and retry
                    self.instances
                        .remove_if(&link, |_, current| Arc::ptr_eq(current, &instance));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Current document at `link`
    pub fn read(&self, link: &DocumentLink) -> Result<Document> {
        self.instance(link)?.get()
    }

    /// Replace the fields at `link`
    pub fn update(&self, link: &DocumentLink, fields: Fields) -> Result<Document> {
        let instance = self.instance(link)?;
        self.validate(&fields)?;
        instance.put(fields)
    }

    /// Merge a patch into the fields at `link`
    ///
    /// Returns the document and whether a new version was committed.
    pub fn patch(&self, link: &DocumentLink, patch: FieldPatch) -> Result<(Document, bool)> {
        self.instance(link)?
            .patch(patch, |merged| self.validate(merged))
    }

    /// Delete the instance at `link`
    pub fn delete(&self, link: &DocumentLink) -> Result<Document> {
        let instance = self.instance(link)?;
        let tombstones = Arc::clone(&self.tombstones);
        let last = instance.delete(|last| {
            tombstones.insert(last.link.clone(), last.version);
        })?;
        self.instances
            .remove_if(link, |_, current| Arc::ptr_eq(current, &instance));
        info!(
            target: "dochost::factory",
            link = %link,
            version = %last.version,
            "Document deleted"
        );
        Ok(last)
    }

    /// Current document and retained prior versions, newest first
    pub fn history(&self, link: &DocumentLink) -> Result<Vec<Document>> {
        self.instance(link)?.history()
    }

    /// Live instance at `link`
    pub fn instance(&self, link: &DocumentLink) -> Result<Arc<ServiceInstance>> {
        self.instances
            .get(link)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound(link.clone()))
    }

    /// Check whether `link` has an instance
    pub fn contains(&self, link: &DocumentLink) -> bool {
        self.instances.contains_key(link)
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Check whether the factory has no instances
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Number of deleted links still holding a tombstone
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Links of all instances, sorted
    pub fn list(&self) -> Vec<DocumentLink> {
        let mut links: Vec<DocumentLink> =
            self.instances.iter().map(|e| e.key().clone()).collect();
        links.sort();
        links
    }

    /// Current documents of all live instances, sorted by link
    pub fn documents(&self) -> Vec<Document> {
        let instances: Vec<Arc<ServiceInstance>> = self
            .instances
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        let mut documents: Vec<Document> = instances
            .iter()
            .filter_map(|instance| match instance.get() {
                Ok(doc) => Some(doc),
                Err(e) => {
                    debug!(
                        target: "dochost::factory",
                        link = %instance.link(),
                        error = %e,
                        "Skipping instance while listing"
                    );
                    None
                }
            })
            .collect();
        documents.sort_by(|a, b| a.link.cmp(&b.link));
        documents
    }

    fn validate(&self, fields: &Fields) -> Result<()> {
        fields.ensure_storable()?;
        self.schema.validate(fields)
    }

    /// Link a create with this requested self link would address
    ///
    /// A bare name or a path outside the factory is joined under it; a
    /// path already under the factory is used as-is; none gets a fresh
    /// `factory/<uuid>` link.
    pub fn resolve_link(&self, self_link: Option<&str>) -> Result<DocumentLink> {
        match self_link {
            None => Ok(self.link.join(Uuid::new_v4().simple().to_string())),
            Some(requested) if requested.trim_matches('/').trim().is_empty() => Err(
                Error::validation("documentSelfLink must name a document"),
            ),
            Some(requested) => {
                let candidate = DocumentLink::new(requested);
                if candidate.is_child_of(&self.link) {
                    Ok(candidate)
                } else {
                    Ok(self.link.join(requested))
                }
            }
        }
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("link", &self.link)
            .field("kind", self.kind())
            .field("instances", &self.instances.len())
            .finish()
    }
}
