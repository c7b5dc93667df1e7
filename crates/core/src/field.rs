//! Typed document fields
//!
//! A document's payload is an open, ordered bag of named [`FieldValue`]s.
//!
//! ## Temporal variants
//!
//! Three temporal variants are kept distinct all the way through
//! serialization:
//!
//! - `Instant`: an absolute point on the UTC time line
//! - `OffsetTime`: a local date-time carrying a numeric offset (`+08:00`)
//! - `ZonedTime`: a local date-time carrying a named region
//!   (`America/New_York`) and the offset in effect at that instant
//!
//! Equality of temporal values compares the absolute instant AND the zone
//! representation. Two `OffsetTime`s for the same instant with different
//! offsets are different values. Different variants are never equal.
//!
//! ## Absent fields
//!
//! There is no null variant. A field without a value is simply not in the
//! bag, so "unset" survives every round trip as "unset".

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Separator for nested property paths (`query.term.matchValue`)
pub const PROPERTY_PATH_SEPARATOR: char = '.';

// =============================================================================
// ZonedTime
// =============================================================================

/// Date-time in a named time-zone region
///
/// The region is an IANA identifier (`America/New_York`). The offset is
/// always the one the region observes at the stored instant, so two zoned
/// times for the same instant and region are always equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ZonedTimeParts")]
pub struct ZonedTime {
    date_time: DateTime<FixedOffset>,
    zone: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZonedTimeParts {
    date_time: DateTime<FixedOffset>,
    zone: String,
}

impl TryFrom<ZonedTimeParts> for ZonedTime {
    type Error = Error;

    fn try_from(parts: ZonedTimeParts) -> Result<Self> {
        ZonedTime::new(parts.date_time, parts.zone)
    }
}

impl ZonedTime {
    /// Create a zoned time from a date-time with offset and a region name
    ///
    /// # Errors
    ///
    /// Returns a validation error if `zone` is not a known region, or if
    /// the offset of `date_time` is not the one `zone` observes at that
    /// instant.
    pub fn new(date_time: DateTime<FixedOffset>, zone: impl Into<String>) -> Result<Self> {
        let zone = zone.into();
        let expected = region_offset(&zone, &date_time.with_timezone(&Utc))?;
        if *date_time.offset() != expected {
            return Err(Error::validation(format!(
                "offset {} does not match {} at {} (expected {})",
                date_time.offset(),
                zone,
                date_time.to_rfc3339_opts(SecondsFormat::AutoSi, false),
                expected
            )));
        }
        Ok(ZonedTime { date_time, zone })
    }

    /// Place an instant in a region
    pub fn from_instant(instant: DateTime<Utc>, zone: impl Into<String>) -> Result<Self> {
        let zone = zone.into();
        let offset = region_offset(&zone, &instant)?;
        Ok(ZonedTime {
            date_time: instant.with_timezone(&offset),
            zone,
        })
    }

    /// Parse the canonical `2024-03-01T09:00:00-05:00[America/New_York]` form
    pub fn parse(s: &str) -> Result<Self> {
        let open = s
            .find('[')
            .ok_or_else(|| Error::validation(format!("zoned time '{}' has no region", s)))?;
        let zone = s[open..]
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| Error::validation(format!("zoned time '{}' is malformed", s)))?;
        let date_time = DateTime::parse_from_rfc3339(&s[..open])
            .map_err(|e| Error::validation(format!("zoned time '{}': {}", s, e)))?;
        Self::new(date_time, zone)
    }

    /// Local date-time with the offset in effect
    pub fn date_time(&self) -> &DateTime<FixedOffset> {
        &self.date_time
    }

    /// Region name
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Absolute instant
    pub fn instant(&self) -> DateTime<Utc> {
        self.date_time.with_timezone(&Utc)
    }
}

impl PartialEq for ZonedTime {
    fn eq(&self, other: &Self) -> bool {
        same_offset_time(&self.date_time, &other.date_time) && self.zone == other.zone
    }
}

impl fmt::Display for ZonedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]",
            self.date_time.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            self.zone
        )
    }
}

/// Offset `zone` observes at `instant`
fn region_offset(zone: &str, instant: &DateTime<Utc>) -> Result<FixedOffset> {
    let region: Tz = zone
        .parse()
        .map_err(|_| Error::validation(format!("unknown zone region '{}'", zone)))?;
    Ok(region.offset_from_utc_datetime(&instant.naive_utc()).fix())
}

/// chrono's `DateTime` equality ignores the offset; ours does not.
fn same_offset_time(a: &DateTime<FixedOffset>, b: &DateTime<FixedOffset>) -> bool {
    a == b && a.offset() == b.offset()
}

// =============================================================================
// UriRef
// =============================================================================

/// URI reference, absolute (`http://host/x`) or relative (`/test/unit`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UriRef(String);

impl UriRef {
    /// Parse a URI reference
    ///
    /// Only structural checks are made: non-empty, no whitespace or
    /// control characters.
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::validation(format!("invalid uri '{}'", s)));
        }
        Ok(UriRef(s))
    }

    /// Borrow the reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UriRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// FieldValue
// =============================================================================

/// Value of a single document field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float (IEEE-754 equality)
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Absolute instant
    Instant(DateTime<Utc>),
    /// Date-time with numeric offset
    OffsetTime(DateTime<FixedOffset>),
    /// Date-time in a named region
    ZonedTime(ZonedTime),
    /// UUID
    Uuid(Uuid),
    /// URI reference
    Uri(UriRef),
    /// Ordered list
    List(Vec<FieldValue>),
    /// Nested field bag
    Map(Fields),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Instant(a), FieldValue::Instant(b)) => a == b,
            (FieldValue::OffsetTime(a), FieldValue::OffsetTime(b)) => same_offset_time(a, b),
            (FieldValue::ZonedTime(a), FieldValue::ZonedTime(b)) => a == b,
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => a == b,
            (FieldValue::Uri(a), FieldValue::Uri(b)) => a == b,
            (FieldValue::List(a), FieldValue::List(b)) => a == b,
            (FieldValue::Map(a), FieldValue::Map(b)) => a == b,
            // Different variants are never equal, even for the same instant or text
            _ => false,
        }
    }
}

impl FieldValue {
    /// Get the variant name
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "Bool",
            FieldValue::Int(_) => "Int",
            FieldValue::Float(_) => "Float",
            FieldValue::Text(_) => "Text",
            FieldValue::Instant(_) => "Instant",
            FieldValue::OffsetTime(_) => "OffsetTime",
            FieldValue::ZonedTime(_) => "ZonedTime",
            FieldValue::Uuid(_) => "Uuid",
            FieldValue::Uri(_) => "Uri",
            FieldValue::List(_) => "List",
            FieldValue::Map(_) => "Map",
        }
    }

    /// Canonical string form
    ///
    /// Query terms match against this form. Within one variant, two values
    /// have the same canonical string exactly when they are equal (floats
    /// aside: NaN renders as `NaN` but is never equal to itself).
    pub fn canonical_string(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Instant(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            FieldValue::OffsetTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            FieldValue::ZonedTime(zt) => zt.to_string(),
            FieldValue::Uuid(u) => u.hyphenated().to_string(),
            FieldValue::Uri(u) => u.as_str().to_string(),
            FieldValue::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.canonical_string()).collect();
                format!("[{}]", inner.join(","))
            }
            FieldValue::Map(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v.canonical_string()))
                    .collect();
                format!("{{{}}}", inner.join(","))
            }
        }
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a Text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the instant if this is an Instant value
    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Instant(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Get the date-time if this is an OffsetTime value
    pub fn as_offset_time(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            FieldValue::OffsetTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Get the zoned time if this is a ZonedTime value
    pub fn as_zoned_time(&self) -> Option<&ZonedTime> {
        match self {
            FieldValue::ZonedTime(zt) => Some(zt),
            _ => None,
        }
    }

    /// Get the UUID if this is a Uuid value
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Get the URI if this is a Uri value
    pub fn as_uri(&self) -> Option<&UriRef> {
        match self {
            FieldValue::Uri(u) => Some(u),
            _ => None,
        }
    }

    /// Get the items if this is a List value
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the nested fields if this is a Map value
    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            FieldValue::Map(fields) => Some(fields),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(dt: DateTime<Utc>) -> Self {
        FieldValue::Instant(dt)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        FieldValue::OffsetTime(dt)
    }
}

impl From<ZonedTime> for FieldValue {
    fn from(zt: ZonedTime) -> Self {
        FieldValue::ZonedTime(zt)
    }
}

impl From<Uuid> for FieldValue {
    fn from(u: Uuid) -> Self {
        FieldValue::Uuid(u)
    }
}

impl From<UriRef> for FieldValue {
    fn from(u: UriRef) -> Self {
        FieldValue::Uri(u)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        FieldValue::List(items)
    }
}

impl From<Fields> for FieldValue {
    fn from(fields: Fields) -> Self {
        FieldValue::Map(fields)
    }
}

// =============================================================================
// Fields
// =============================================================================

/// Ordered bag of named field values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, FieldValue>);

impl Fields {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style set
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder-style set of an optional value; `None` leaves the field unset
    pub fn with_opt<V: Into<FieldValue>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.set_opt(name, value);
        self
    }

    /// Set a field, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Set or clear a field
    ///
    /// `None` removes the field so it stays absent rather than defaulted.
    pub fn set_opt<V: Into<FieldValue>>(
        &mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Option<FieldValue> {
        let name = name.into();
        match value {
            Some(v) => self.0.insert(name, v.into()),
            None => self.0.remove(&name),
        }
    }

    /// Get a top-level field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Resolve a dotted path through nested `Map` fields
    pub fn get_path(&self, path: &str) -> Option<&FieldValue> {
        let mut segments = path.split(PROPERTY_PATH_SEPARATOR);
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Remove a field
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.remove(name)
    }

    /// Check whether a field is set
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of set fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether no field is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Check that every value survives the wire codec
    ///
    /// JSON has no representation for NaN or infinities, and NaN is not
    /// equal to itself, so non-finite floats are rejected at any depth.
    pub fn ensure_storable(&self) -> Result<()> {
        self.0
            .iter()
            .try_for_each(|(name, value)| ensure_storable_value(name, value))
    }

    /// Apply a merge patch
    ///
    /// `Some` entries overwrite, `None` entries remove. Returns whether
    /// anything changed.
    pub fn merge(&mut self, patch: FieldPatch) -> bool {
        let mut changed = false;
        for (name, value) in patch {
            match value {
                Some(v) => {
                    if self.0.get(&name) != Some(&v) {
                        self.0.insert(name, v);
                        changed = true;
                    }
                }
                None => changed |= self.0.remove(&name).is_some(),
            }
        }
        changed
    }
}

fn ensure_storable_value(path: &str, value: &FieldValue) -> Result<()> {
    match value {
        FieldValue::Float(f) if !f.is_finite() => Err(Error::validation(format!(
            "field {} holds non-finite float {}",
            path, f
        ))),
        FieldValue::List(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| ensure_storable_value(&format!("{}[{}]", path, i), item)),
        FieldValue::Map(fields) => fields.iter().try_for_each(|(name, nested)| {
            ensure_storable_value(
                &format!("{}{}{}", path, PROPERTY_PATH_SEPARATOR, name),
                nested,
            )
        }),
        _ => Ok(()),
    }
}

impl FromIterator<(String, FieldValue)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Fields(iter.into_iter().collect())
    }
}

impl IntoIterator for Fields {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Partial update: field name to new value, `None` clears the field
pub type FieldPatch = BTreeMap<String, Option<FieldValue>>;
