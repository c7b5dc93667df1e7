//! Operation dispatch, completion delivery and queries over stored documents

use crate::common::*;
use dochost::{
    Disposition, DocumentBody, DocumentLink, FieldPatch, FieldValue, Fields, OpenSchema,
    Operation, OperationResult, OutcomeClass, Query, QueryTerm, Version,
};
use std::sync::Arc;

#[test]
fn handle_covers_every_operation() {
    let host = test_host();
    let body = DocumentBody::new(Fields::new().with("v", 1i64)).with_self_link("op");

    let posted = host.handle(Operation::post(RECORDS, body)).unwrap();
    let link = posted.document().link.clone();
    match &posted {
        OperationResult::Posted(outcome) => assert_eq!(outcome.disposition, Disposition::Created),
        other => panic!("unexpected result {:?}", other),
    }

    let got = host.handle(Operation::get(link.clone())).unwrap();
    assert_eq!(got, OperationResult::Document(posted.document().clone()));

    let put = host
        .handle(Operation::put(link.clone(), Fields::new().with("v", 2i64)))
        .unwrap();
    assert_eq!(put.document().version, Version::new(1));

    let mut patch = FieldPatch::new();
    patch.insert("w".to_string(), Some(FieldValue::Int(3)));
    let patched = host.handle(Operation::patch(link.clone(), patch)).unwrap();
    assert_eq!(patched.document().version, Version::new(2));

    let deleted = host.handle(Operation::delete(link.clone())).unwrap();
    assert!(matches!(deleted, OperationResult::Deleted(_)));
    let err = host.handle(Operation::get(link)).unwrap_err();
    assert_eq!(err.outcome(), OutcomeClass::ClientError);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn send_runs_operations_concurrently() {
    let host = test_host();
    let mut handles = Vec::new();
    for i in 0..32i64 {
        let host = Arc::clone(&host);
        handles.push(tokio::spawn(async move {
            let body = DocumentBody::new(Fields::new().with("i", i)).with_self_link(format!("s{}", i));
            host.send(Operation::post(RECORDS, body)).await
        }));
    }
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.document().version, Version::INITIAL);
    }
    assert_eq!(host.documents_of(&records()).unwrap().len(), 32);
}

#[tokio::test]
async fn send_with_delivers_errors_to_completion() {
    let host = test_host();
    let (tx, rx) = tokio::sync::oneshot::channel();
    let handle = host.send_with(Operation::get("/test/records/absent"), move |result| {
        let _ = tx.send(result);
    });
    handle.await.unwrap();
    let err = rx.await.unwrap().unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn reserved_and_dotted_properties_match() {
    let host = test_host();
    let doc = host
        .create(
            &records(),
            DocumentBody::new(
                Fields::new()
                    .with("name", "alice")
                    .with("address", Fields::new().with("city", "Lyon")),
            )
            .with_self_link("alice"),
        )
        .unwrap()
        .document;

    assert!(host.query_match(&QueryTerm::new("documentSelfLink", "/test/records/alice"), &doc));
    assert!(host.query_match(&QueryTerm::new("documentKind", "record"), &doc));
    assert!(host.query_match(&QueryTerm::new("documentVersion", "0"), &doc));
    assert!(host.query_match(&QueryTerm::new("address.city", "Lyon"), &doc));
    assert!(!host.query_match(&QueryTerm::new("address.zip", "69000"), &doc));
    assert!(!host.query_match(&QueryTerm::new("name", "Alice"), &doc));
}

#[test]
fn boolean_clauses_filter_documents() {
    let host = test_host();
    for (name, team, active) in [("a", "core", true), ("b", "core", false), ("c", "web", true)] {
        host.create(
            &records(),
            DocumentBody::new(Fields::new().with("team", team).with("active", active))
                .with_self_link(name),
        )
        .unwrap();
    }
    let query = Query::term("team", "core")
        .add_clause(Query::term("active", "false").with_occurance(dochost::Occurance::MustNotOccur));
    let selected: Vec<String> = host
        .documents_of(&records())
        .unwrap()
        .iter()
        .filter(|doc| query.evaluate(doc))
        .map(|doc| doc.link.last_segment().to_string())
        .collect();
    assert_eq!(selected, vec!["a"]);
}

#[test]
fn nested_factories_route_to_nearest_owner() {
    let host = test_host();
    let nested = records().join("archive");
    host.start_factory(nested.clone(), Arc::new(OpenSchema::new("archived")))
        .unwrap();
    let doc = host
        .create(&nested, DocumentBody::new(Fields::new()).with_self_link("old"))
        .unwrap()
        .document;

    assert_eq!(doc.link, DocumentLink::new("/test/records/archive/old"));
    assert_eq!(doc.kind.as_str(), "archived");
    assert_eq!(host.owner_of(&doc.link).unwrap().link(), &nested);
    assert_eq!(host.read(&doc.link).unwrap(), doc);
}

#[test]
fn self_link_under_nested_factory_is_rejected() {
    let host = test_host();
    let nested = records().join("archive");
    host.start_factory(nested.clone(), Arc::new(OpenSchema::new("archived")))
        .unwrap();

    let err = host
        .create(
            &records(),
            DocumentBody::new(Fields::new().with("v", 1i64)).with_self_link("archive/x"),
        )
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(
        err.to_string(),
        "documentSelfLink /test/records/archive/x belongs to factory /test/records/archive"
    );
    assert!(host.factory(&records()).unwrap().is_empty());

    // Created through the owning factory it reads back
    let doc = host
        .create(&nested, DocumentBody::new(Fields::new()).with_self_link("x"))
        .unwrap()
        .document;
    assert_eq!(host.read(&doc.link).unwrap(), doc);
}

#[test]
fn created_documents_read_back_by_link() {
    let host = test_host();
    host.start_factory(records().join("archive"), Arc::new(OpenSchema::new("archived")))
        .unwrap();
    for requested in ["plain", "deep/path/doc", "/test/records/full", "/elsewhere/d"] {
        let doc = host
            .create(&records(), DocumentBody::new(Fields::new()).with_self_link(requested))
            .unwrap()
            .document;
        assert_eq!(host.read(&doc.link).unwrap(), doc, "{}", requested);
    }
}

#[test]
fn factory_start_rules() {
    let host = test_host();
    let err = host
        .start_factory(records(), Arc::new(OpenSchema::new("record")))
        .unwrap_err();
    assert!(err.is_validation());
    let err = host
        .start_factory(DocumentLink::new("/"), Arc::new(OpenSchema::new("x")))
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(host.factory_links(), vec![records(), times()]);
}
