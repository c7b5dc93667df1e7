//! Service instances: single-writer authority for one document
//!
//! ## Ordering
//!
//! Every mutation of a link goes through the instance's write lock. The
//! successor document (version + 1, new update time, new fields) is built
//! and swapped in while the lock is held, so the version increment and
//! the field replacement commit together and the next mutation only ever
//! sees a committed predecessor. Different links never share a lock.
//!
//! ## Reads
//!
//! `get`, `history` and `stage` wait at most `InstanceLimits::read_timeout`
//! for the lock and then fail with `Error::Timeout` instead of blocking
//! behind writers.
//!
//! ## History
//!
//! Superseded documents are kept newest-first in a bounded chain, trimmed
//! from the oldest end.

use dochost_core::{Document, DocumentLink, Error, FieldPatch, Fields, Result};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-instance resource limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceLimits {
    /// Bounded wait for reads
    pub read_timeout: Duration,
    /// Superseded versions kept for history
    pub max_retained_versions: usize,
}

impl Default for InstanceLimits {
    fn default() -> Self {
        InstanceLimits {
            read_timeout: Duration::from_secs(5),
            max_retained_versions: 10,
        }
    }
}

/// Lifecycle stage of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStage {
    /// Serving reads and writes
    Available,
    /// Deleted; every operation reports not found
    Deleted,
}

/// What a creation request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A new instance was materialized at this request
    Created,
    /// Body was content-equal to the current document; nothing recorded
    Unchanged,
    /// Body differed; a new version was committed
    Updated,
}

struct InstanceState {
    stage: InstanceStage,
    current: Document,
    /// Superseded versions, newest first
    previous: VecDeque<Document>,
}

/// Single-writer authority for one link
pub struct ServiceInstance {
    link: DocumentLink,
    limits: InstanceLimits,
    state: RwLock<InstanceState>,
}

impl ServiceInstance {
    /// Create an instance owning `document`
    pub fn new(document: Document, limits: InstanceLimits) -> Self {
        debug!(
            target: "dochost::instance",
            link = %document.link,
            version = %document.version,
            "Service instance created"
        );
        ServiceInstance {
            link: document.link.clone(),
            limits,
            state: RwLock::new(InstanceState {
                stage: InstanceStage::Available,
                current: document,
                previous: VecDeque::new(),
            }),
        }
    }

    /// Link this instance owns
    pub fn link(&self) -> &DocumentLink {
        &self.link
    }

    /// Current lifecycle stage
    ///
    /// Waits at most the configured read timeout.
    pub fn stage(&self) -> Result<InstanceStage> {
        Ok(self.read_state()?.stage)
    }

    /// Current document
    ///
    /// Waits at most the configured read timeout.
    pub fn get(&self) -> Result<Document> {
        let state = self.read_state()?;
        self.ensure_available(&state)?;
        Ok(state.current.clone())
    }

    /// Current document followed by retained prior versions, newest first
    ///
    /// Waits at most the configured read timeout.
    pub fn history(&self) -> Result<Vec<Document>> {
        let state = self.read_state()?;
        self.ensure_available(&state)?;
        Ok(std::iter::once(&state.current)
            .chain(state.previous.iter())
            .cloned()
            .collect())
    }

    /// Idempotent creation path for an existing link
    ///
    /// Content-equal bodies leave the document untouched; anything else
    /// commits a new version.
    pub fn post(&self, fields: Fields) -> Result<(Document, Disposition)> {
        let mut state = self.state.write();
        self.ensure_available(&state)?;
        if state.current.has_content(&fields) {
            debug!(
                target: "dochost::instance",
                link = %self.link,
                version = %state.current.version,
                "Idempotent post, content unchanged"
            );
            return Ok((state.current.clone(), Disposition::Unchanged));
        }
        let next = self.commit(&mut state, fields);
        Ok((next, Disposition::Updated))
    }

    /// Replace the fields, always committing a new version
    pub fn put(&self, fields: Fields) -> Result<Document> {
        let mut state = self.state.write();
        self.ensure_available(&state)?;
        Ok(self.commit(&mut state, fields))
    }

    /// Merge a patch into the fields
    ///
    /// `validate` sees the merged fields before anything is committed. A
    /// patch that changes nothing returns the current document and `false`.
    pub fn patch<V>(&self, patch: FieldPatch, validate: V) -> Result<(Document, bool)>
    where
        V: FnOnce(&Fields) -> Result<()>,
    {
        let mut state = self.state.write();
        self.ensure_available(&state)?;
        let mut merged = state.current.fields.clone();
        if !merged.merge(patch) {
            return Ok((state.current.clone(), false));
        }
        validate(&merged)?;
        Ok((self.commit(&mut state, merged), true))
    }

    /// Retire the instance
    ///
    /// `on_retired` runs with the final document while the write lock is
    /// still held, before any waiting writer can observe the deletion.
    pub fn delete<F>(&self, on_retired: F) -> Result<Document>
    where
        F: FnOnce(&Document),
    {
        let mut state = self.state.write();
        self.ensure_available(&state)?;
        state.stage = InstanceStage::Deleted;
        state.previous.clear();
        on_retired(&state.current);
        debug!(
            target: "dochost::instance",
            link = %self.link,
            version = %state.current.version,
            "Service instance deleted"
        );
        Ok(state.current.clone())
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, InstanceState>> {
        self.state.try_read_for(self.limits.read_timeout).ok_or_else(|| {
            warn!(target: "dochost::instance", link = %self.link, "Read timed out");
            Error::Timeout {
                link: self.link.clone(),
                waited_ms: self.limits.read_timeout.as_millis() as u64,
            }
        })
    }

    fn ensure_available(&self, state: &InstanceState) -> Result<()> {
        match state.stage {
            InstanceStage::Available => Ok(()),
            InstanceStage::Deleted => Err(Error::NotFound(self.link.clone())),
        }
    }

    fn commit(&self, state: &mut InstanceState, fields: Fields) -> Document {
        let next = state.current.successor(fields);
        let superseded = std::mem::replace(&mut state.current, next.clone());
        if self.limits.max_retained_versions > 0 {
            state.previous.push_front(superseded);
            state.previous.truncate(self.limits.max_retained_versions);
        }
        debug!(
            target: "dochost::instance",
            link = %self.link,
            version = %next.version,
            "Committed new version"
        );
        next
    }
}

impl std::fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("link", &self.link)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
