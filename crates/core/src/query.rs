//! Structural query terms
//!
//! A [`QueryTerm`] is a `(property_name, match_value)` equality predicate.
//! It matches a document when the named property's canonical string
//! (the same form [`FieldValue::canonical_string`] uses for field
//! comparison) is exactly `match_value`. Case-sensitive, no partial match,
//! unknown property never matches.
//!
//! A [`Query`] is a tree: an optional term plus boolean clauses, each
//! tagged with an [`Occurance`].

use crate::document::Document;
use crate::error::{Error, Result};
use crate::field::{FieldValue, Fields};
use serde::{Deserialize, Serialize};

const KEY_TERM: &str = "term";
const KEY_PROPERTY_NAME: &str = "propertyName";
const KEY_MATCH_VALUE: &str = "matchValue";
const KEY_OCCURANCE: &str = "occurance";
const KEY_BOOLEAN_CLAUSES: &str = "booleanClauses";

/// Property/value equality predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTerm {
    /// Property to resolve on the document
    pub property_name: String,
    /// Exact canonical string to compare against
    pub match_value: String,
}

impl QueryTerm {
    /// Create a term
    pub fn new(property_name: impl Into<String>, match_value: impl Into<String>) -> Self {
        QueryTerm {
            property_name: property_name.into(),
            match_value: match_value.into(),
        }
    }
}

/// Does `term` select `document`?
pub fn matches(term: &QueryTerm, document: &Document) -> bool {
    document
        .property(&term.property_name)
        .map_or(false, |value| value.canonical_string() == term.match_value)
}

/// How a clause contributes to its parent query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Occurance {
    /// Clause must match
    #[default]
    MustOccur,
    /// Clause must not match
    MustNotOccur,
    /// At least one SHOULD clause must match when there is nothing else
    ShouldOccur,
}

impl Occurance {
    fn as_str(&self) -> &'static str {
        match self {
            Occurance::MustOccur => "MUST_OCCUR",
            Occurance::MustNotOccur => "MUST_NOT_OCCUR",
            Occurance::ShouldOccur => "SHOULD_OCCUR",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "MUST_OCCUR" => Ok(Occurance::MustOccur),
            "MUST_NOT_OCCUR" => Ok(Occurance::MustNotOccur),
            "SHOULD_OCCUR" => Ok(Occurance::ShouldOccur),
            other => Err(Error::validation(format!("unknown occurance '{}'", other))),
        }
    }
}

/// Tree of terms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Term evaluated at this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<QueryTerm>,
    /// Contribution to the parent query
    #[serde(default)]
    pub occurance: Occurance,
    /// Nested clauses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boolean_clauses: Vec<Query>,
}

impl Query {
    /// Empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-term query
    pub fn term(property_name: impl Into<String>, match_value: impl Into<String>) -> Self {
        Query {
            term: Some(QueryTerm::new(property_name, match_value)),
            ..Self::default()
        }
    }

    /// Set the term's property name, creating the term if needed
    pub fn set_term_property_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.term
            .get_or_insert_with(|| QueryTerm::new("", ""))
            .property_name = name.into();
        self
    }

    /// Set the term's match value, creating the term if needed
    pub fn set_term_match_value(&mut self, value: impl Into<String>) -> &mut Self {
        self.term
            .get_or_insert_with(|| QueryTerm::new("", ""))
            .match_value = value.into();
        self
    }

    /// Builder-style occurance
    pub fn with_occurance(mut self, occurance: Occurance) -> Self {
        self.occurance = occurance;
        self
    }

    /// Builder-style clause
    pub fn add_clause(mut self, clause: Query) -> Self {
        self.boolean_clauses.push(clause);
        self
    }

    /// Check structural requirements
    ///
    /// Every node needs a term or clauses, and every term needs a property
    /// name.
    pub fn validate(&self) -> Result<()> {
        match &self.term {
            Some(term) if term.property_name.is_empty() => {
                return Err(Error::validation("query.term.propertyName is required"))
            }
            None if self.boolean_clauses.is_empty() => {
                return Err(Error::validation("query.term is required"))
            }
            _ => {}
        }
        self.boolean_clauses.iter().try_for_each(Query::validate)
    }

    /// Evaluate against a document
    ///
    /// The node's own term and every MUST clause must match, no MUST_NOT
    /// clause may match, and when the node has neither a term nor MUST
    /// clauses at least one SHOULD clause must match.
    pub fn evaluate(&self, document: &Document) -> bool {
        if let Some(term) = &self.term {
            if !matches(term, document) {
                return false;
            }
        }

        let mut has_must = false;
        let mut has_should = false;
        let mut any_should = false;
        for clause in &self.boolean_clauses {
            match clause.occurance {
                Occurance::MustOccur => {
                    has_must = true;
                    if !clause.evaluate(document) {
                        return false;
                    }
                }
                Occurance::MustNotOccur => {
                    if clause.evaluate(document) {
                        return false;
                    }
                }
                Occurance::ShouldOccur => {
                    has_should = true;
                    any_should |= clause.evaluate(document);
                }
            }
        }

        if self.term.is_some() || has_must {
            return true;
        }
        if has_should {
            return any_should;
        }
        // Only MUST_NOT clauses: matches everything they do not exclude
        !self.boolean_clauses.is_empty()
    }

    /// Store as a nested field value
    pub fn to_field_value(&self) -> FieldValue {
        let mut fields = Fields::new().with(KEY_OCCURANCE, self.occurance.as_str());
        if let Some(term) = &self.term {
            fields.set(
                KEY_TERM,
                Fields::new()
                    .with(KEY_PROPERTY_NAME, term.property_name.as_str())
                    .with(KEY_MATCH_VALUE, term.match_value.as_str()),
            );
        }
        if !self.boolean_clauses.is_empty() {
            let clauses = self.boolean_clauses.iter().map(Query::to_field_value).collect();
            fields.set(KEY_BOOLEAN_CLAUSES, FieldValue::List(clauses));
        }
        FieldValue::Map(fields)
    }

    /// Read back from a nested field value
    pub fn from_field_value(value: &FieldValue) -> Result<Query> {
        let fields = value
            .as_map()
            .ok_or_else(|| Error::validation("query must be a map"))?;

        let term = match fields.get(KEY_TERM) {
            None => None,
            Some(t) => {
                let t = t
                    .as_map()
                    .ok_or_else(|| Error::validation("query.term must be a map"))?;
                Some(QueryTerm::new(
                    text_field(t, KEY_PROPERTY_NAME)?,
                    text_field(t, KEY_MATCH_VALUE)?,
                ))
            }
        };

        let occurance = match fields.get(KEY_OCCURANCE) {
            None => Occurance::default(),
            Some(o) => Occurance::parse(
                o.as_text()
                    .ok_or_else(|| Error::validation("query.occurance must be text"))?,
            )?,
        };

        let boolean_clauses = match fields.get(KEY_BOOLEAN_CLAUSES) {
            None => Vec::new(),
            Some(c) => c
                .as_list()
                .ok_or_else(|| Error::validation("query.booleanClauses must be a list"))?
                .iter()
                .map(Query::from_field_value)
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(Query {
            term,
            occurance,
            boolean_clauses,
        })
    }
}

fn text_field(fields: &Fields, name: &str) -> Result<String> {
    match fields.get(name) {
        Some(FieldValue::Text(s)) => Ok(s.clone()),
        Some(other) => Err(Error::validation(format!(
            "query.term.{} must be text, found {}",
            name,
            other.type_name()
        ))),
        None => Err(Error::validation(format!("query.term.{} is required", name))),
    }
}
