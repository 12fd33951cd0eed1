//! Likes are document presence under `likes/{uid}/countries`.

use domains::collections;
use integration_tests::{signed_in, TestBackend};

#[tokio::test]
async fn toggling_twice_restores_the_original_state() {
    let test = TestBackend::new();
    let holders = test.holders();
    let user = signed_in(&holders, "ana@example.com").await;
    let path = collections::likes(&user);

    holders.likes.load_likes().await;
    assert!(!holders.likes.is_liked("Japan"));

    assert_eq!(holders.likes.toggle_like("Japan").await, Some(true));
    assert!(holders.likes.is_liked("Japan"));
    assert_eq!(test.documents.count(&path), 1);
    assert_eq!(holders.likes.liked_countries(), vec!["Japan".to_string()]);

    assert_eq!(holders.likes.toggle_like("Japan").await, Some(false));
    assert!(!holders.likes.is_liked("Japan"));
    assert_eq!(test.documents.count(&path), 0);
}

#[tokio::test]
async fn likes_belong_to_the_signed_in_user() {
    let test = TestBackend::new();
    let holders = test.holders();

    signed_in(&holders, "ana@example.com").await;
    holders.likes.toggle_like("Peru").await.unwrap();
    assert!(holders.likes.is_liked("Peru"));

    holders.session.sign_out().await;
    signed_in(&holders, "ben@example.com").await;
    holders.likes.load_likes().await;
    assert!(!holders.likes.is_liked("Peru"));
    assert!(holders.likes.liked_countries().is_empty());
}

#[tokio::test]
async fn toggle_without_session_changes_nothing() {
    let test = TestBackend::new();
    let holders = test.holders();

    assert_eq!(holders.likes.toggle_like("Japan").await, None);
    assert_eq!(
        holders.likes.state().error_message.get().as_deref(),
        Some("Please sign in to continue.")
    );
}

#[tokio::test]
async fn offline_toggle_reports_network_failure() {
    let test = TestBackend::new();
    let holders = test.holders();
    signed_in(&holders, "ana@example.com").await;

    test.documents.set_offline(true);
    assert_eq!(holders.likes.toggle_like("Japan").await, None);
    assert_eq!(
        holders.likes.state().error_message.get().as_deref(),
        Some("Could not reach the server. Please try again.")
    );
    assert!(!holders.likes.is_liked("Japan"));
}
