mod common;

use common::{Harness, ROOT, email, is_conflict};
use gatekeeper_auth::Identity;
use gatekeeper_core::error::msg;
use gatekeeper_core::{DEFAULT_GROUP, DomainError};

#[tokio::test]
async fn sign_up_enrols_in_default_group() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    assert_eq!(alice.email, email("alice"));
    assert_eq!(h.group_names("alice").await, [DEFAULT_GROUP]);
    assert!(h.can("alice", "privelege").await);
}

#[tokio::test]
async fn sign_up_rejects_duplicates_and_bad_input() {
    let h = Harness::new().await;
    h.user("alice").await;
    let users = &h.services.users;

    let err = users.sign_up("ALICE@example.com", "other").await.unwrap_err();
    assert_eq!(err, DomainError::conflict(msg::USER_EMAIL_EXIST));

    let err = users.sign_up(&email("other"), "alice").await.unwrap_err();
    assert_eq!(err, DomainError::conflict(msg::USERNAME_EXIST));

    for (mail, name) in [("not-an-email", "carol"), ("carol@example.com", "c")] {
        assert!(matches!(
            users.sign_up(mail, name).await,
            Err(DomainError::Validation(_))
        ));
    }
}

#[tokio::test]
async fn users_are_read_by_normalized_email() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let read = h
        .services
        .users
        .read_user(" Alice@Example.com ")
        .await
        .unwrap();
    assert_eq!(read, alice);

    let err = h.services.users.read_user(&email("ghost")).await.unwrap_err();
    assert_eq!(err, DomainError::not_found(msg::USER_NOT_EXIST));
}

#[tokio::test]
async fn root_is_never_deleted() {
    let h = Harness::new().await;
    let err = h.services.users.delete_user(ROOT, ROOT).await.unwrap_err();
    assert_eq!(err, DomainError::forbidden(msg::DELETE_ROOT));
}

#[tokio::test]
async fn owners_must_hand_over_groups_before_deletion() {
    let h = Harness::new().await;
    h.user("alice").await;
    h.user("bob").await;
    h.group("alice", "billing").await;
    let users = &h.services.users;

    let err = users
        .delete_user(&email("alice"), &email("alice"))
        .await
        .unwrap_err();
    assert!(is_conflict(&err));

    h.services
        .groups
        .change_owner(&email("bob"), "billing", ROOT)
        .await
        .unwrap();
    users.delete_user(&email("alice"), &email("alice")).await.unwrap();
    assert!(users.read_user(&email("alice")).await.is_err());
}

#[tokio::test]
async fn only_self_or_root_may_delete() {
    let h = Harness::new().await;
    h.user("alice").await;
    h.user("bob").await;
    let users = &h.services.users;

    let err = users
        .delete_user(&email("alice"), &email("bob"))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::forbidden(msg::DELETE_OTHER_USER));

    users.delete_user(&email("alice"), ROOT).await.unwrap();
}

#[tokio::test]
async fn acting_user_must_match_identity() {
    let h = Harness::new().await;
    h.user("alice").await;
    let users = &h.services.users;

    users.ensure_acting(None, &email("alice")).await.unwrap();
    users
        .ensure_acting(Some(&Identity::new("alice")), &email("alice"))
        .await
        .unwrap();

    let err = users
        .ensure_acting(Some(&Identity::new("mallory")), &email("alice"))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::forbidden(msg::IDENTITY_MISMATCH));
}

#[tokio::test]
async fn cyrillic_usernames_can_sign_up() {
    let h = Harness::new().await;
    let ivan = h
        .services
        .users
        .sign_up("ivan@example.com", "Иван_2")
        .await
        .unwrap();
    assert_eq!(ivan.username, "Иван_2");
    let read = h.services.users.read_user("ivan@example.com").await.unwrap();
    assert_eq!(read, ivan);
}
