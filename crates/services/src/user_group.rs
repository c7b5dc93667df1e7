//! User groups: documents whose body is a query
//!
//! A group is an ordinary document created through the factory's
//! idempotent path. Its `query` field selects the member documents; the
//! resolver evaluates it with the term matcher. A group without a query
//! has no membership criterion, so the schema rejects it before any
//! service instance is created.

use crate::paths::CORE_AUTHZ_USER_GROUPS;
use dochost_core::{
    Document, DocumentBody, DocumentLink, Error, Fields, Query, Result, TypedDocument,
    TypedSchema,
};
use dochost_engine::{Factory, ServiceHost};
use std::sync::Arc;
use tracing::debug;

const FIELD_QUERY: &str = "query";

/// Body of a user group document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserGroupState {
    /// Requested link; a bare name is placed under the group factory
    pub self_link: Option<String>,
    /// Membership criterion
    pub query: Option<Query>,
}

impl UserGroupState {
    /// Start building a group body
    pub fn builder() -> UserGroupStateBuilder {
        UserGroupStateBuilder::default()
    }

    /// Does `document` belong to this group?
    pub fn contains(&self, document: &Document) -> bool {
        self.query
            .as_ref()
            .map_or(false, |query| query.evaluate(document))
    }

    /// Request body for the group factory
    pub fn to_body(&self) -> DocumentBody {
        DocumentBody {
            self_link: self.self_link.clone(),
            fields: self.to_fields(),
        }
    }
}

impl TypedDocument for UserGroupState {
    const KIND: &'static str = "user-group";

    fn to_fields(&self) -> Fields {
        Fields::new().with_opt(FIELD_QUERY, self.query.as_ref().map(Query::to_field_value))
    }

    fn from_fields(fields: &Fields) -> Result<Self> {
        Ok(UserGroupState {
            self_link: None,
            query: fields
                .get(FIELD_QUERY)
                .map(Query::from_field_value)
                .transpose()?,
        })
    }

    fn validate(&self) -> Result<()> {
        match &self.query {
            None => Err(Error::validation("query is required")),
            Some(query) => query.validate(),
        }
    }

    fn from_document(document: &Document) -> Result<Self> {
        let mut state = Self::from_fields(&document.fields)?;
        state.self_link = Some(document.link.to_string());
        Ok(state)
    }
}

/// Builder for [`UserGroupState`]
#[derive(Debug, Default)]
pub struct UserGroupStateBuilder {
    state: UserGroupState,
}

impl UserGroupStateBuilder {
    /// Request a link
    pub fn with_self_link(mut self, link: impl Into<String>) -> Self {
        self.state.self_link = Some(link.into());
        self
    }

    /// Set (or clear) the membership query
    pub fn with_query(mut self, query: impl Into<Option<Query>>) -> Self {
        self.state.query = query.into();
        self
    }

    /// Finish
    pub fn build(self) -> UserGroupState {
        self.state
    }
}

/// Start the user group factory on `host`
pub fn start_user_group_factory(host: &ServiceHost) -> Result<Arc<Factory>> {
    host.start_factory(
        DocumentLink::new(CORE_AUTHZ_USER_GROUPS),
        Arc::new(TypedSchema::<UserGroupState>::new()),
    )
}

/// Answers membership questions for user groups on a host
#[derive(Debug, Clone)]
pub struct GroupResolver {
    host: Arc<ServiceHost>,
    groups: DocumentLink,
}

impl GroupResolver {
    /// Resolver over the standard user group factory
    pub fn new(host: Arc<ServiceHost>) -> Self {
        Self::with_factory(host, DocumentLink::new(CORE_AUTHZ_USER_GROUPS))
    }

    /// Resolver over groups stored at another factory
    pub fn with_factory(host: Arc<ServiceHost>, groups: DocumentLink) -> Self {
        GroupResolver { host, groups }
    }

    /// Current state of the group at `group`
    pub fn group(&self, group: &DocumentLink) -> Result<UserGroupState> {
        let document = self.host.read(group)?;
        UserGroupState::from_document(&document).map_err(|e| {
            Error::internal(format!("group {} field={}", group, FIELD_QUERY), e.to_string())
        })
    }

    /// Is `document` a member of `group`?
    pub fn is_member(&self, group: &DocumentLink, document: &Document) -> Result<bool> {
        Ok(self.group(group)?.contains(document))
    }

    /// Members of `group` among `candidates`
    pub fn members<'a>(
        &self,
        group: &DocumentLink,
        candidates: &'a [Document],
    ) -> Result<Vec<&'a Document>> {
        let state = self.group(group)?;
        Ok(candidates.iter().filter(|doc| state.contains(doc)).collect())
    }

    /// Members of `group` among every document below `factory`
    pub fn members_in(&self, group: &DocumentLink, factory: &DocumentLink) -> Result<Vec<Document>> {
        let state = self.group(group)?;
        let members: Vec<Document> = self
            .host
            .documents_of(factory)?
            .into_iter()
            .filter(|doc| state.contains(doc))
            .collect();
        debug!(
            target: "dochost::groups",
            group = %group,
            factory = %factory,
            members = members.len(),
            "Resolved group membership"
        );
        Ok(members)
    }

    /// Links of every group that `document` belongs to, sorted
    pub fn groups_of(&self, document: &Document) -> Result<Vec<DocumentLink>> {
        let groups = self.host.documents_of(&self.groups)?;
        let mut links = Vec::new();
        for group in groups {
            if UserGroupState::from_document(&group)?.contains(document) {
                links.push(group.link);
            }
        }
        Ok(links)
    }
}
