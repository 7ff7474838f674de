mod common;

use common::{Harness, ROOT, email, is_conflict, is_forbidden, is_not_found};
use gatekeeper_core::DomainError;
use gatekeeper_core::error::msg;
use gatekeeper_infra::DEFAULT_AGENT;

#[tokio::test]
async fn agents_are_managed_by_root_only() {
    let h = Harness::new().await;
    h.user("alice").await;
    let agents = &h.services.agents;

    let err = agents.create_agent(&email("alice"), "reports").await.unwrap_err();
    assert!(is_forbidden(&err));

    agents.create_agent(ROOT, "reports").await.unwrap();
    let err = agents.create_agent(ROOT, "reports").await.unwrap_err();
    assert_eq!(err, DomainError::conflict(msg::AGENT_EXIST));

    let names: Vec<String> = agents
        .list_agents(ROOT)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, [DEFAULT_AGENT, "reports"]);
    assert!(is_forbidden(&agents.list_agents(&email("alice")).await.unwrap_err()));

    agents.delete_agent(ROOT, "reports").await.unwrap();
    let err = agents.delete_agent(ROOT, "reports").await.unwrap_err();
    assert_eq!(err, DomainError::not_found(msg::AGENT_NOT_EXIST));
}

#[tokio::test]
async fn granting_twice_conflicts() {
    let h = Harness::new().await;
    h.user("alice").await;
    h.group("alice", "billing").await;
    h.agent("invoices").await;
    let privileges = &h.services.privileges;

    privileges
        .add_agent_to_group("invoices", "billing", ROOT)
        .await
        .unwrap();
    let err = privileges
        .add_agent_to_group("invoices", "billing", ROOT)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::conflict(msg::AGENT_ALREADY_IN_GROUP));

    privileges
        .add_agent_to_user("invoices", &email("alice"), ROOT)
        .await
        .unwrap();
    let err = privileges
        .add_agent_to_user("invoices", &email("alice"), ROOT)
        .await
        .unwrap_err();
    assert!(is_conflict(&err));
}

#[tokio::test]
async fn revoking_absent_grants_is_not_found() {
    let h = Harness::new().await;
    h.user("alice").await;
    h.group("alice", "billing").await;
    h.agent("invoices").await;
    let privileges = &h.services.privileges;

    let err = privileges
        .delete_agent_from_group("invoices", "billing", ROOT)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::not_found(msg::AGENT_NOT_IN_GROUP));

    let err = privileges
        .delete_agent_from_user("invoices", &email("alice"), ROOT)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::not_found(msg::AGENT_NOT_IN_USER));
}

#[tokio::test]
async fn grants_need_root_and_existing_targets() {
    let h = Harness::new().await;
    h.user("alice").await;
    h.group("alice", "billing").await;
    h.agent("invoices").await;
    let privileges = &h.services.privileges;

    let err = privileges
        .add_agent_to_group("invoices", "billing", &email("alice"))
        .await
        .unwrap_err();
    assert!(is_forbidden(&err));

    let err = privileges
        .add_agent_to_group("ghost", "billing", ROOT)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::not_found(msg::AGENT_NOT_EXIST));

    let err = privileges
        .add_agent_to_group("invoices", "ghosts", ROOT)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::not_found(msg::GROUP_NOT_EXIST));

    let err = privileges
        .add_agent_to_user("invoices", &email("ghost"), ROOT)
        .await
        .unwrap_err();
    assert!(is_not_found(&err));
}

#[tokio::test]
async fn group_agents_are_visible_to_owner_and_root() {
    let h = Harness::new().await;
    h.user("alice").await;
    h.user("bob").await;
    h.group("alice", "billing").await;
    h.agent("invoices").await;
    h.agent("exports").await;
    for agent in ["invoices", "exports"] {
        h.services
            .privileges
            .add_agent_to_group(agent, "billing", ROOT)
            .await
            .unwrap();
    }

    for asker in [email("alice"), ROOT.to_string()] {
        let names: Vec<String> = h
            .services
            .privileges
            .get_group_agents("billing", &asker)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, ["exports", "invoices"]);
    }

    let err = h
        .services
        .privileges
        .get_group_agents("billing", &email("bob"))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::forbidden(msg::NOT_OWNER));
}

#[tokio::test]
async fn deleting_an_agent_revokes_access() {
    let h = Harness::new().await;
    h.user("alice").await;
    h.agent("invoices").await;
    h.services
        .privileges
        .add_agent_to_user("invoices", &email("alice"), ROOT)
        .await
        .unwrap();
    assert!(h.can("alice", "invoices").await);

    h.services.agents.delete_agent(ROOT, "invoices").await.unwrap();
    let err = h
        .services
        .resolver
        .can_execute(&email("alice"), "invoices")
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::not_found(msg::AGENT_NOT_EXIST));
}
