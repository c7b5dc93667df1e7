//! Shared test utilities for the integration suite.
//!
//! Import via `mod common;` from the suite's main.rs.

#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, Utc};
use dochost::{
    DocumentLink, Error, FieldValue, Fields, HostConfig, OpenSchema, Result, ServiceHost,
    TypedDocument, TypedSchema, UriRef, ZonedTime,
};
use std::sync::{Arc, Once};
use uuid::Uuid;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test harness when RUST_LOG is set.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        if std::env::var_os("RUST_LOG").is_some() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        }
    });
}

/// Factory holding plain records
pub const RECORDS: &str = "/test/records";

/// Factory holding [`DocumentWithTimes`]
pub const TIMES: &str = "/test/times";

/// Host with an open `/test/records` factory and a typed `/test/times` factory.
pub fn test_host() -> Arc<ServiceHost> {
    test_host_with(HostConfig::default())
}

/// Same as [`test_host`] with explicit settings.
pub fn test_host_with(config: HostConfig) -> Arc<ServiceHost> {
    init_tracing();
    let host = ServiceHost::new(config).unwrap();
    host.start_factory(DocumentLink::new(RECORDS), Arc::new(OpenSchema::new("record")))
        .unwrap();
    host.start_factory(
        DocumentLink::new(TIMES),
        Arc::new(TypedSchema::<DocumentWithTimes>::new()),
    )
    .unwrap();
    Arc::new(host)
}

pub fn records() -> DocumentLink {
    DocumentLink::new(RECORDS)
}

pub fn times() -> DocumentLink {
    DocumentLink::new(TIMES)
}

// ============================================================================
// DocumentWithTimes - one optional field per non-trivial variant
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWithTimes {
    pub instant: Option<DateTime<Utc>>,
    pub offset_date_time: Option<DateTime<FixedOffset>>,
    pub zoned_date_time: Option<ZonedTime>,
    pub id: Option<Uuid>,
    pub uri: Option<UriRef>,
}

impl DocumentWithTimes {
    /// Every field set to a value that only survives a type-preserving codec
    pub fn populated() -> Self {
        let instant = Utc::now();
        let plus_eight = FixedOffset::east_opt(8 * 3600).unwrap();
        DocumentWithTimes {
            instant: Some(instant),
            offset_date_time: Some(instant.with_timezone(&plus_eight)),
            zoned_date_time: Some(
                ZonedTime::from_instant(instant, "America/New_York").unwrap(),
            ),
            id: Some(Uuid::new_v4()),
            uri: Some(UriRef::parse("/test/unit").unwrap()),
        }
    }
}

fn expect<T>(
    fields: &Fields,
    name: &str,
    pick: impl Fn(&FieldValue) -> Option<T>,
) -> Result<Option<T>> {
    match fields.get(name) {
        None => Ok(None),
        Some(value) => pick(value).map(Some).ok_or_else(|| {
            Error::validation(format!("{} has type {}", name, value.type_name()))
        }),
    }
}

impl TypedDocument for DocumentWithTimes {
    const KIND: &'static str = "document-with-times";

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with_opt("instant", self.instant)
            .with_opt("offsetDateTime", self.offset_date_time)
            .with_opt("zonedDateTime", self.zoned_date_time.clone())
            .with_opt("id", self.id)
            .with_opt("uri", self.uri.clone())
    }

    fn from_fields(fields: &Fields) -> Result<Self> {
        Ok(DocumentWithTimes {
            instant: expect(fields, "instant", FieldValue::as_instant)?,
            offset_date_time: expect(fields, "offsetDateTime", FieldValue::as_offset_time)?,
            zoned_date_time: expect(fields, "zonedDateTime", |v| v.as_zoned_time().cloned())?,
            id: expect(fields, "id", FieldValue::as_uuid)?,
            uri: expect(fields, "uri", |v| v.as_uri().cloned())?,
        })
    }
}
