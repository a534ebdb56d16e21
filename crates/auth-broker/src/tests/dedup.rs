//! Session request deduplication through the public surface.

use super::{ext, make_broker, pid, register, scopes, silent};

#[tokio::test]
async fn repeated_ask_yields_single_request() {
    let (broker, _prompts) = make_broker();
    let (_provider, _handle) = register(&broker, "acme", "Acme");
    let ext1 = ext("ext1", "Ext 1");

    broker
        .get_session(&ext1, &pid("acme"), &scopes(&["read"]), Default::default())
        .await
        .unwrap();
    broker
        .get_session(&ext1, &pid("acme"), &scopes(&["read"]), Default::default())
        .await
        .unwrap();

    assert_eq!(broker.get_session_requests().len(), 1);
}

#[tokio::test]
async fn scope_order_does_not_defeat_dedup() {
    let (broker, _prompts) = make_broker();
    let (_provider, _handle) = register(&broker, "acme", "Acme");
    let ext1 = ext("ext1", "Ext 1");

    broker
        .get_session(
            &ext1,
            &pid("acme"),
            &scopes(&["write", "read"]),
            Default::default(),
        )
        .await
        .unwrap();
    broker
        .get_session(
            &ext1,
            &pid("acme"),
            &scopes(&["read", "write"]),
            Default::default(),
        )
        .await
        .unwrap();

    let requests = broker.get_session_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].scopes, vec!["read", "write"]);
}

#[tokio::test]
async fn distinct_extensions_yield_distinct_requests() {
    let (broker, _prompts) = make_broker();
    let (_provider, _handle) = register(&broker, "acme", "Acme");

    broker
        .get_session(
            &ext("ext1", "Ext 1"),
            &pid("acme"),
            &scopes(&["read"]),
            Default::default(),
        )
        .await
        .unwrap();
    broker
        .get_session(
            &ext("ext2", "Ext 2"),
            &pid("acme"),
            &scopes(&["read"]),
            Default::default(),
        )
        .await
        .unwrap();

    let requests = broker.get_session_requests();
    assert_eq!(requests.len(), 2);
    assert_ne!(requests[0].request_id, requests[1].request_id);
}

#[tokio::test]
async fn distinct_scope_sets_yield_distinct_requests() {
    let (broker, _prompts) = make_broker();
    let (_provider, _handle) = register(&broker, "acme", "Acme");
    let ext1 = ext("ext1", "Ext 1");

    broker
        .get_session(&ext1, &pid("acme"), &scopes(&["read"]), Default::default())
        .await
        .unwrap();
    broker
        .get_session(&ext1, &pid("acme"), &scopes(&["write"]), Default::default())
        .await
        .unwrap();

    assert_eq!(broker.get_session_requests().len(), 2);
}

#[tokio::test]
async fn silent_miss_writes_nothing() {
    let (broker, prompts) = make_broker();
    let (_provider, _handle) = register(&broker, "acme", "Acme");
    let updates_after_registration = broker.sink().len();

    let result = broker
        .get_session(&ext("ext1", "Ext 1"), &pid("acme"), &scopes(&["read"]), silent())
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(broker.get_session_requests().is_empty());
    assert_eq!(prompts.prompt_count(), 0);
    assert_eq!(broker.sink().len(), updates_after_registration);
}

#[tokio::test]
async fn queued_miss_notifies_even_when_duplicate() {
    let (broker, _prompts) = make_broker();
    let (_provider, _handle) = register(&broker, "acme", "Acme");
    let ext1 = ext("ext1", "Ext 1");
    let baseline = broker.sink().len();

    broker
        .get_session(&ext1, &pid("acme"), &scopes(&["read"]), Default::default())
        .await
        .unwrap();
    assert_eq!(broker.sink().len(), baseline + 1);

    // The ledger is untouched by the re-ask, but the UI is re-notified.
    broker
        .get_session(&ext1, &pid("acme"), &scopes(&["read"]), Default::default())
        .await
        .unwrap();
    assert_eq!(broker.sink().len(), baseline + 2);
    assert_eq!(broker.get_session_requests().len(), 1);
}

#[tokio::test]
async fn unregistered_provider_miss_still_queues() {
    let (broker, _prompts) = make_broker();

    let result = broker
        .get_session(
            &ext("ext1", "Ext 1"),
            &pid("not-installed"),
            &scopes(&["read"]),
            Default::default(),
        )
        .await
        .unwrap();

    assert!(result.is_none());
    let requests = broker.get_session_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].provider_id, "not-installed");
}

#[tokio::test]
async fn request_ids_follow_provider_extension_ordinal() {
    let (broker, _prompts) = make_broker();
    let (_provider, _handle) = register(&broker, "acme", "Acme");

    broker
        .get_session(
            &ext("ext1", "Ext 1"),
            &pid("acme"),
            &scopes(&["read"]),
            Default::default(),
        )
        .await
        .unwrap();
    broker
        .get_session(
            &ext("ext2", "Ext 2"),
            &pid("acme"),
            &scopes(&["read"]),
            Default::default(),
        )
        .await
        .unwrap();

    let ids: Vec<String> = broker
        .get_session_requests()
        .into_iter()
        .map(|r| r.request_id)
        .collect();
    assert!(ids.contains(&"acme-ext1-0".to_string()));
    assert!(ids.contains(&"acme-ext2-1".to_string()));
}
