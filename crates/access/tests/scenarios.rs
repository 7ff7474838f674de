mod common;

use common::{Harness, ROOT, email};
use gatekeeper_core::BidStatus;
use gatekeeper_core::DomainError;
use gatekeeper_core::error::msg;
use gatekeeper_infra::store::GroupRegistry;

#[tokio::test]
async fn billing_access_follows_the_finance_group() {
    let h = Harness::new().await;
    h.user("alice").await;
    h.user("bob").await;

    h.services.agents.create_agent(ROOT, "billing").await.unwrap();
    h.services
        .bids
        .make_request_to_create_group(ROOT, "finance")
        .await
        .unwrap();
    h.services
        .privileges
        .add_agent_to_group("billing", "finance", ROOT)
        .await
        .unwrap();
    h.services
        .groups
        .add_user_to_group(&email("alice"), ROOT, "finance")
        .await
        .unwrap();

    assert!(h.can("alice", "billing").await);
    assert!(!h.can("bob", "billing").await);

    h.services
        .privileges
        .delete_agent_from_group("billing", "finance", ROOT)
        .await
        .unwrap();
    assert!(!h.can("alice", "billing").await);
}

#[tokio::test]
async fn eng_bid_is_rejected_then_approved() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let bids = &h.services.bids;

    let first = bids
        .make_request_to_create_group(&email("alice"), "eng")
        .await
        .unwrap();
    assert_eq!(first.status, BidStatus::InProgress);
    bids.update_request_status(&email("alice"), "eng", ROOT, "rejected")
        .await
        .unwrap();

    let second = bids
        .make_request_to_create_group(&email("alice"), "eng")
        .await
        .unwrap();
    assert_eq!(second.status, BidStatus::InProgress);
    assert_ne!(first.id, second.id);

    bids.update_request_status(&email("alice"), "eng", ROOT, "approved")
        .await
        .unwrap();
    let eng = h.store.get_group("eng").await.unwrap().unwrap();
    assert!(eng.is_owned_by(alice.id));
}

#[tokio::test]
async fn effective_agents_merge_direct_and_group_grants() {
    let h = Harness::new().await;
    h.user("alice").await;
    h.user("bob").await;
    h.group("alice", "billing").await;
    for agent in ["invoices", "exports"] {
        h.agent(agent).await;
    }
    h.services
        .privileges
        .add_agent_to_group("invoices", "billing", ROOT)
        .await
        .unwrap();
    h.services
        .privileges
        .add_agent_to_user("invoices", &email("alice"), ROOT)
        .await
        .unwrap();
    h.services
        .privileges
        .add_agent_to_user("exports", &email("alice"), ROOT)
        .await
        .unwrap();

    let resolver = &h.services.resolver;
    for asker in [email("alice"), ROOT.to_string()] {
        let names: Vec<String> = resolver
            .get_user_agents(&email("alice"), &asker)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, ["exports", "invoices", "privelege"]);
    }

    let err = resolver
        .get_user_agents(&email("alice"), &email("bob"))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::forbidden(msg::USER_AGENTS_FORBIDDEN));
}

#[tokio::test]
async fn root_needs_explicit_grants_too() {
    let h = Harness::new().await;
    h.agent("vault").await;
    assert!(
        !h.services
            .resolver
            .can_execute(ROOT, "vault")
            .await
            .unwrap()
    );
    assert!(h.services.resolver.can_execute(ROOT, "privelege").await.unwrap());
}

#[tokio::test]
async fn resolver_requires_known_user_and_agent() {
    let h = Harness::new().await;
    h.user("alice").await;

    let err = h
        .services
        .resolver
        .can_execute(&email("ghost"), "privelege")
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::not_found(msg::USER_NOT_EXIST));

    let err = h
        .services
        .resolver
        .can_execute(&email("alice"), "ghost")
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::not_found(msg::AGENT_NOT_EXIST));
}
