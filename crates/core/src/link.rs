//! Document identity and kind
//!
//! A [`DocumentLink`] is the stable path address of one document, e.g.
//! `/core/authz/user-groups/admins`. Links are assigned at creation and
//! never change. A [`DocumentKind`] tags the schema a document follows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path separator used in links
pub const LINK_SEPARATOR: char = '/';

/// Stable path address of a document
///
/// Links are normalized on construction: a leading `/` is added if
/// missing, a trailing `/` and repeated separators are removed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct DocumentLink(String);

impl DocumentLink {
    /// Create a normalized link from a path
    pub fn new(path: impl AsRef<str>) -> Self {
        let segments: Vec<&str> = path
            .as_ref()
            .split(LINK_SEPARATOR)
            .filter(|s| !s.is_empty())
            .collect();
        DocumentLink(format!("{}{}", LINK_SEPARATOR, segments.join("/")))
    }

    /// Append a child segment (or sub-path)
    pub fn join(&self, child: impl AsRef<str>) -> Self {
        DocumentLink::new(format!("{}/{}", self.0, child.as_ref()))
    }

    /// Borrow the path
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parent link, or `None` for the root
    pub fn parent(&self) -> Option<DocumentLink> {
        let idx = self.0.rfind(LINK_SEPARATOR)?;
        if self.0.len() == 1 {
            return None;
        }
        Some(DocumentLink::new(&self.0[..idx]))
    }

    /// Last path segment
    pub fn last_segment(&self) -> &str {
        self.0.rsplit(LINK_SEPARATOR).next().unwrap_or("")
    }

    /// Check whether this link sits strictly below `ancestor`
    pub fn is_child_of(&self, ancestor: &DocumentLink) -> bool {
        if ancestor.0 == "/" {
            return self.0.len() > 1;
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(ancestor.as_str())
            && self.0[ancestor.0.len()..].starts_with(LINK_SEPARATOR)
    }
}

impl fmt::Display for DocumentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentLink {
    fn from(s: &str) -> Self {
        DocumentLink::new(s)
    }
}

impl From<String> for DocumentLink {
    fn from(s: String) -> Self {
        DocumentLink::new(s)
    }
}

impl From<DocumentLink> for String {
    fn from(link: DocumentLink) -> Self {
        link.0
    }
}

impl AsRef<str> for DocumentLink {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Schema tag of a document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKind(String);

impl DocumentKind {
    /// Create a kind tag
    pub fn new(kind: impl Into<String>) -> Self {
        DocumentKind(kind.into())
    }

    /// Borrow the tag
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentKind {
    fn from(s: &str) -> Self {
        DocumentKind::new(s)
    }
}
