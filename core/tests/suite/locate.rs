use core_test_support::MockOracle;
use core_test_support::STORE_PAGE;
use core_test_support::store_document;
use pretty_assertions::assert_eq;
use selfheal_core::HtmlDocument;
use selfheal_core::LocateError;
use selfheal_core::OracleError;
use selfheal_core::Resolver;
use std::sync::Arc;
use tracing_test::traced_test;

#[tokio::test]
async fn direct_hit_never_consults_cache_or_oracle() {
    let oracle = Arc::new(MockOracle::new());
    let resolver = Resolver::new(oracle.clone());

    let element = resolver
        .locate(&store_document(), "tshirt-size-new")
        .await
        .unwrap();

    assert_eq!("tshirt-size-new", element.id);
    assert_eq!("select", element.tag);
    assert_eq!(0, oracle.call_count());
    assert!(resolver.cache().is_empty());
}

#[tokio::test]
async fn stale_id_is_resolved_through_the_oracle() {
    let oracle = Arc::new(MockOracle::new().answer("tshirt-color-old", "tshirt-color-xyz"));
    let resolver = Resolver::new(oracle.clone());

    let element = resolver
        .locate(&store_document(), "tshirt-color-old")
        .await
        .unwrap();

    assert_eq!("tshirt-color-xyz", element.id);
    assert_eq!(
        Some("tshirt-color-xyz".to_string()),
        resolver.cache().get("tshirt-color-old")
    );
    let calls = oracle.calls();
    assert_eq!(1, calls.len());
    assert_eq!("tshirt-color-old", calls[0].stale_id);
    assert_eq!(STORE_PAGE, calls[0].snapshot);
}

#[tokio::test]
async fn cache_hit_skips_the_oracle() {
    let oracle = Arc::new(MockOracle::new().answer("tshirt-color-old", "tshirt-color-xyz"));
    let resolver = Resolver::new(oracle.clone());
    let doc = store_document();

    resolver.locate(&doc, "tshirt-color-old").await.unwrap();
    let again = resolver.locate(&doc, "tshirt-color-old").await.unwrap();

    assert_eq!("tshirt-color-xyz", again.id);
    assert_eq!(1, oracle.call_count());
}

#[tokio::test]
async fn stale_cache_entry_fails_without_re_resolving() {
    let oracle = Arc::new(MockOracle::new().answer("jeans-style", "jeans-fit"));
    let resolver = Resolver::new(oracle.clone());

    resolver
        .locate(&store_document(), "jeans-style")
        .await
        .unwrap();

    let redesigned = HtmlDocument::new(STORE_PAGE.replace("jeans-fit", "jeans-cut"));
    let err = resolver.locate(&redesigned, "jeans-style").await.unwrap_err();

    match err {
        LocateError::ElementNotFound {
            requested,
            resolved,
        } => {
            assert_eq!("jeans-style", requested);
            assert_eq!("jeans-fit", resolved);
        }
        other => panic!("expected ElementNotFound, got {other:?}"),
    }
    assert_eq!(1, oracle.call_count());
}

#[tokio::test]
async fn wrong_answer_surfaces_as_element_not_found() {
    let oracle = Arc::new(MockOracle::new().answer("jeans-size", "jeans-size-imaginary"));
    let resolver = Resolver::new(oracle.clone());

    let err = resolver
        .locate(&store_document(), "jeans-size")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LocateError::ElementNotFound { ref resolved, .. } if resolved == "jeans-size-imaginary"
    ));
    // The answer is still trusted and cached for the rest of the run.
    assert_eq!(
        Some("jeans-size-imaginary".to_string()),
        resolver.cache().get("jeans-size")
    );
}

#[tokio::test]
async fn oracle_failure_propagates_verbatim() {
    let oracle = Arc::new(MockOracle::new());
    let resolver = Resolver::new(oracle.clone());

    let err = resolver
        .locate(&store_document(), "checkout-button")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LocateError::Oracle(OracleError::CallFailed(_))
    ));
    assert!(resolver.cache().is_empty());
    assert_eq!(0, resolver.in_flight());
}

#[tokio::test]
async fn every_miss_sends_a_fresh_snapshot() {
    let oracle = Arc::new(
        MockOracle::new()
            .answer("tshirt-size", "tshirt-size-new")
            .answer("jeans-size", "jeans-size-v2"),
    );
    let resolver = Resolver::new(oracle.clone());
    let before = store_document();
    let after = HtmlDocument::new(STORE_PAGE.replace("Add to Cart", "Buy"));

    resolver.locate(&before, "tshirt-size").await.unwrap();
    resolver.locate(&after, "jeans-size").await.unwrap();

    let snapshots: Vec<String> = oracle.calls().into_iter().map(|call| call.snapshot).collect();
    assert_eq!(vec![before.html().to_string(), after.html().to_string()], snapshots);
}

#[tokio::test]
async fn clones_share_the_cache() {
    let oracle = Arc::new(MockOracle::new().answer("jeans-size", "jeans-size-v2"));
    let resolver = Resolver::new(oracle.clone());
    let sibling = resolver.clone();

    resolver
        .locate(&store_document(), "jeans-size")
        .await
        .unwrap();
    let element = sibling
        .locate(&store_document(), "jeans-size")
        .await
        .unwrap();

    assert_eq!("jeans-size-v2", element.id);
    assert_eq!(1, oracle.call_count());
}

#[tokio::test]
#[traced_test]
async fn new_mappings_are_logged() {
    let oracle = Arc::new(MockOracle::new().answer("tshirt-color-old", "tshirt-color-xyz"));
    let resolver = Resolver::new(oracle);

    resolver
        .locate(&store_document(), "tshirt-color-old")
        .await
        .unwrap();

    assert!(logs_contain("resolved stale identifier"));
    assert!(logs_contain("tshirt-color-xyz"));
}
