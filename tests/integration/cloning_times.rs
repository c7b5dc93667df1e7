//! Type-preserving round trips
//!
//! Every temporal variant must come back as the same variant, with the
//! same instant and the same zone representation, whether it is read from
//! the host, dispatched through `send`, or re-decoded from JSON. Unset
//! fields stay unset.

use crate::common::*;
use chrono::{FixedOffset, TimeZone, Utc};
use dochost::{
    Disposition, Document, DocumentBody, FieldValue, Operation, TypedDocument, ZonedTime,
};

fn post(state: &DocumentWithTimes) -> (std::sync::Arc<dochost::ServiceHost>, Document) {
    let host = test_host();
    let outcome = host
        .create(&times(), DocumentBody::new(state.to_fields()))
        .unwrap();
    assert_eq!(outcome.disposition, Disposition::Created);
    (host, outcome.document)
}

#[test]
fn test_non_null_values() {
    let state = DocumentWithTimes::populated();
    let (host, created) = post(&state);

    let read = host.read(&created.link).unwrap();
    let out = DocumentWithTimes::from_document(&read).unwrap();
    assert_eq!(out, state);

    let offset = out.offset_date_time.unwrap();
    assert_eq!(offset.offset(), &FixedOffset::east_opt(8 * 3600).unwrap());
    let zoned = out.zoned_date_time.unwrap();
    assert_eq!(zoned.zone(), "America/New_York");
    assert_eq!(zoned.instant(), state.instant.unwrap());
    assert_eq!(out.uri.unwrap().as_str(), "/test/unit");
}

#[test]
fn test_non_null_values_through_json() {
    let state = DocumentWithTimes::populated();
    let (_, created) = post(&state);

    let json = created.to_json().unwrap();
    let decoded = Document::from_json(&json).unwrap();
    assert_eq!(decoded, created);
    assert_eq!(DocumentWithTimes::from_document(&decoded).unwrap(), state);
}

#[test]
fn test_wire_form_keeps_each_variant() {
    let host = test_host();
    let instant = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
    let state = DocumentWithTimes {
        instant: Some(instant),
        offset_date_time: Some(instant.with_timezone(&FixedOffset::east_opt(8 * 3600).unwrap())),
        zoned_date_time: Some(ZonedTime::from_instant(instant, "America/New_York").unwrap()),
        ..DocumentWithTimes::default()
    };
    let created = host
        .create(&times(), DocumentBody::new(state.to_fields()))
        .unwrap()
        .document;

    let json: serde_json::Value = serde_json::from_str(&created.to_json().unwrap()).unwrap();
    let fields = &json["fields"];
    assert_eq!(fields["instant"]["type"], "instant");
    assert_eq!(fields["instant"]["value"], "2024-07-01T12:00:00Z");
    assert_eq!(fields["offsetDateTime"]["type"], "offset_time");
    assert_eq!(fields["offsetDateTime"]["value"], "2024-07-01T20:00:00+08:00");
    assert_eq!(fields["zonedDateTime"]["type"], "zoned_time");
    assert_eq!(
        fields["zonedDateTime"]["value"]["dateTime"],
        "2024-07-01T08:00:00-04:00"
    );
    assert_eq!(fields["zonedDateTime"]["value"]["zone"], "America/New_York");
    assert!(fields.get("id").is_none());
}

#[test]
fn test_decoding_rejects_inconsistent_zone() {
    let (_, created) = post(&DocumentWithTimes::populated());
    let mut json: serde_json::Value = serde_json::from_str(&created.to_json().unwrap()).unwrap();
    json["fields"]["zonedDateTime"]["value"]["zone"] = "Nowhere/Land".into();
    assert!(Document::from_json(&json.to_string()).is_err());
}

#[tokio::test]
async fn test_non_null_values_through_send() {
    let state = DocumentWithTimes::populated();
    let (host, created) = post(&state);

    let result = host.send(Operation::get(created.link.clone())).await.unwrap();
    let out = DocumentWithTimes::from_document(result.document()).unwrap();
    assert_eq!(out, state);
}

#[test]
fn test_null_values() {
    let state = DocumentWithTimes::default();
    let (host, created) = post(&state);
    assert!(created.fields.is_empty());

    let read = host.read(&created.link).unwrap();
    let out = DocumentWithTimes::from_document(&read).unwrap();
    assert!(out.instant.is_none());
    assert!(out.offset_date_time.is_none());
    assert!(out.zoned_date_time.is_none());
    assert!(out.id.is_none());
    assert!(out.uri.is_none());

    let json = read.to_json().unwrap();
    assert!(!json.contains("offsetDateTime"));
    let decoded = Document::from_json(&json).unwrap();
    assert!(decoded.fields.is_empty());
}

#[test]
fn test_wrong_variant_is_rejected() {
    let host = test_host();
    let body = DocumentBody::new(
        dochost::Fields::new().with("instant", "2024-03-01T09:00:00Z"),
    );
    let err = host.create(&times(), body).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.to_string(), "instant has type Text");
    assert!(host.factory(&times()).unwrap().is_empty());
}

#[test]
fn test_offset_change_is_a_content_change() {
    let host = test_host();
    let instant = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let at = |hours: i32| {
        let offset = FixedOffset::east_opt(hours * 3600).unwrap();
        DocumentBody::new(
            dochost::Fields::new().with("offsetDateTime", instant.with_timezone(&offset)),
        )
        .with_self_link("meeting")
    };

    let first = host.create(&times(), at(8)).unwrap();
    let same = host.create(&times(), at(8)).unwrap();
    assert_eq!(same.disposition, Disposition::Unchanged);
    assert_eq!(same.document.version, first.document.version);

    // Same instant, different offset
    let moved = host.create(&times(), at(-5)).unwrap();
    assert_eq!(moved.disposition, Disposition::Updated);
    assert_eq!(moved.document.version, first.document.version.increment());
}

#[test]
fn test_instant_and_offset_time_are_distinct() {
    let instant = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let as_offset = instant.with_timezone(&FixedOffset::east_opt(0).unwrap());
    assert_ne!(FieldValue::Instant(instant), FieldValue::OffsetTime(as_offset));
}
