use std::sync::Arc;

use caseline::{
    identity::derive_identity,
    lookup::error::{LookupErrorKind, internal_error, not_found, service_unavailable},
};

use crate::support::{Call, MockLookup, owned_case, resolver_over};

#[tokio::test]
async fn given_case_id_when_read_model_has_it_then_record_is_returned_unfiltered() {
    let lookup = Arc::new(MockLookup::new());
    // Direct id lookup is trusted even when the applicant email differs.
    lookup.push_by_id(Ok(owned_case("case-7", "someone-else@example.com")));
    let resolver = resolver_over(&lookup);

    let resolved = resolver
        .resolve_case(Some("case-7"), Some("a@b.com"))
        .await
        .expect("resolution should succeed");

    assert_eq!(resolved.expect("record expected").case_id, "case-7");
    assert_eq!(lookup.calls(), vec![Call::ById("case-7".to_string())]);
}

#[tokio::test]
async fn given_id_miss_when_email_search_matches_then_search_result_is_returned() {
    let lookup = Arc::new(MockLookup::new());
    lookup.push_by_id(Err(not_found("projection lag")));
    lookup.push_search(Ok(vec![owned_case("case-9", "a@b.com")]));
    let resolver = resolver_over(&lookup);

    let resolved = resolver
        .resolve_case(Some("case-9"), Some("a@b.com"))
        .await
        .expect("resolution should succeed");

    assert_eq!(resolved.expect("record expected").case_id, "case-9");
    let calls = lookup.calls();
    assert!(matches!(calls[0], Call::ById(_)));
    assert!(matches!(calls[1], Call::Search { .. }));
}

#[tokio::test]
async fn given_empty_search_when_case_store_matches_then_fallback_record_is_returned() {
    let lookup = Arc::new(MockLookup::new());
    lookup.push_search(Ok(Vec::new()));
    lookup.push_recent(Ok(vec![
        owned_case("case-other", "other@b.com"),
        owned_case("case-mine", "a@b.com"),
    ]));
    let resolver = resolver_over(&lookup);

    let resolved = resolver
        .resolve_case(None, Some("a@b.com"))
        .await
        .expect("resolution should succeed");

    assert_eq!(resolved.expect("record expected").case_id, "case-mine");
}

#[tokio::test]
async fn given_read_model_unavailable_when_resolving_then_case_store_is_still_tried() {
    let lookup = Arc::new(MockLookup::new());
    lookup.push_search(Err(service_unavailable("read model down")));
    lookup.push_recent(Ok(vec![owned_case("case-mine", "a@b.com")]));
    let resolver = resolver_over(&lookup);

    let resolved = resolver
        .resolve_case(None, Some("a@b.com"))
        .await
        .expect("infrastructure lag must not abort resolution");

    assert_eq!(resolved.expect("record expected").case_id, "case-mine");
    assert!(lookup.calls().contains(&Call::Recent));
}

#[tokio::test]
async fn given_every_path_empty_when_resolving_then_none_is_returned() {
    let lookup = Arc::new(MockLookup::new());
    let resolver = resolver_over(&lookup);

    let resolved = resolver
        .resolve_case(None, Some("a@b.com"))
        .await
        .expect("empty paths are not an error");

    assert!(resolved.is_none());
}

#[tokio::test]
async fn given_matching_partner_token_when_searching_then_record_is_owned() {
    let lookup = Arc::new(MockLookup::new());
    let mut record = owned_case("case-1", "a@b.com");
    record.partner_id = Some(derive_identity("a@b.com"));
    lookup.push_search(Ok(vec![record]));
    let resolver = resolver_over(&lookup);

    // Caller email differs only in case; the derived tokens agree.
    let resolved = resolver
        .resolve_case(None, Some("A@B.com"))
        .await
        .expect("resolution should succeed");

    assert_eq!(resolved.expect("record expected").case_id, "case-1");
}

#[tokio::test]
async fn given_foreign_partner_id_when_searching_then_record_is_not_owned() {
    let lookup = Arc::new(MockLookup::new());
    let mut record = owned_case("case-1", "a@b.com");
    record.partner_id = Some("another-partner".to_string());
    lookup.push_search(Ok(vec![record]));
    let resolver = resolver_over(&lookup);

    let resolved = resolver
        .resolve_case(None, Some("a@b.com"))
        .await
        .expect("resolution should succeed");

    assert!(resolved.is_none(), "foreign partner record must be filtered");
}

#[tokio::test]
async fn given_no_email_and_no_id_when_resolving_then_no_backend_is_called() {
    let lookup = Arc::new(MockLookup::new());
    let resolver = resolver_over(&lookup);

    let resolved = resolver
        .resolve_case(None, None)
        .await
        .expect("nothing to resolve is not an error");

    assert!(resolved.is_none());
    assert!(lookup.calls().is_empty());
}

#[tokio::test]
async fn given_unexpected_error_when_resolving_then_it_propagates() {
    let lookup = Arc::new(MockLookup::new());
    lookup.push_search(Err(internal_error("backend exploded")));
    let resolver = resolver_over(&lookup);

    let err = resolver
        .resolve_case(None, Some("a@b.com"))
        .await
        .expect_err("unexpected errors must not be absorbed");

    assert_eq!(err.kind, LookupErrorKind::Internal);
}

#[tokio::test]
async fn given_search_result_order_when_filtering_then_first_owned_record_wins() {
    let lookup = Arc::new(MockLookup::new());
    lookup.push_search(Ok(vec![
        owned_case("case-first", "a@b.com"),
        owned_case("case-second", "a@b.com"),
    ]));
    let resolver = resolver_over(&lookup);

    let resolved = resolver
        .resolve_case(None, Some("a@b.com"))
        .await
        .expect("resolution should succeed");

    assert_eq!(resolved.expect("record expected").case_id, "case-first");
}
