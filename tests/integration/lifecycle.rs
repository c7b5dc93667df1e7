//! Delete, re-create, replace, patch and history

use crate::common::*;
use dochost::{Disposition, DocumentBody, FieldPatch, FieldValue, Fields, HostConfig, Version};

fn create(host: &dochost::ServiceHost, name: &str, value: i64) -> dochost::Document {
    host.create(
        &records(),
        DocumentBody::new(Fields::new().with("value", value)).with_self_link(name),
    )
    .unwrap()
    .document
}

#[test]
fn delete_then_read_is_not_found() {
    let host = test_host();
    let doc = create(&host, "gone", 1);

    let last = host.delete(&doc.link).unwrap();
    assert_eq!(last.version, doc.version);
    assert!(host.read(&doc.link).unwrap_err().is_not_found());
    assert!(host.delete(&doc.link).unwrap_err().is_not_found());
    assert!(!host.factory(&records()).unwrap().contains(&doc.link));
}

#[test]
fn recreate_continues_after_tombstone() {
    let host = test_host();
    let doc = create(&host, "phoenix", 1);
    host.update(&doc.link, Fields::new().with("value", 2i64)).unwrap();
    host.delete(&doc.link).unwrap();

    let outcome = host
        .create(
            &records(),
            DocumentBody::new(Fields::new().with("value", 2i64)).with_self_link("phoenix"),
        )
        .unwrap();
    assert_eq!(outcome.disposition, Disposition::Created);
    assert_eq!(outcome.document.version, Version::new(2));
}

#[test]
fn put_always_commits() {
    let host = test_host();
    let doc = create(&host, "p", 1);
    let same = host.update(&doc.link, doc.fields.clone()).unwrap();
    assert_eq!(same.version, doc.version.increment());
    assert!(same.content_equal(&doc));
}

#[test]
fn update_of_missing_document_is_not_found() {
    let host = test_host();
    let err = host
        .update(&records().join("absent"), Fields::new())
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn patch_merges_and_clears() {
    let host = test_host();
    let doc = host
        .create(
            &records(),
            DocumentBody::new(Fields::new().with("a", 1i64).with("b", "keep"))
                .with_self_link("patched"),
        )
        .unwrap()
        .document;

    let mut patch = FieldPatch::new();
    patch.insert("a".to_string(), None);
    patch.insert("c".to_string(), Some(FieldValue::Bool(true)));
    let patched = host.patch(&doc.link, patch).unwrap();

    assert_eq!(patched.version, doc.version.increment());
    assert!(!patched.fields.contains("a"));
    assert_eq!(patched.field("b"), Some(&FieldValue::Text("keep".into())));
    assert_eq!(patched.field("c"), Some(&FieldValue::Bool(true)));

    // Nothing to change: no new version
    let mut noop = FieldPatch::new();
    noop.insert("b".to_string(), Some(FieldValue::Text("keep".into())));
    noop.insert("a".to_string(), None);
    let unchanged = host.patch(&doc.link, noop).unwrap();
    assert_eq!(unchanged.version, patched.version);
}

#[test]
fn history_is_newest_first_and_bounded() {
    let host = test_host_with(HostConfig {
        max_retained_versions: 2,
        ..HostConfig::default()
    });
    let doc = create(&host, "h", 0);
    for value in 1..=4i64 {
        host.update(&doc.link, Fields::new().with("value", value)).unwrap();
    }

    let history = host.history(&doc.link).unwrap();
    let versions: Vec<u64> = history.iter().map(|d| d.version.as_u64()).collect();
    assert_eq!(versions, vec![4, 3, 2]);
    assert_eq!(history[0], host.read(&doc.link).unwrap());
}

#[test]
fn history_disabled_keeps_only_current() {
    let host = test_host_with(HostConfig {
        max_retained_versions: 0,
        ..HostConfig::default()
    });
    let doc = create(&host, "h", 0);
    host.update(&doc.link, Fields::new().with("value", 1i64)).unwrap();
    assert_eq!(host.history(&doc.link).unwrap().len(), 1);
}
