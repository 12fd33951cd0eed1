//! Review screens end to end: session, remote store, refetch and display
//! pipeline.

use integration_tests::{signed_in, TestBackend};
use services::{FetchOutcome, ReviewFilter};

#[tokio::test]
async fn submitted_review_is_the_only_one_for_its_country() {
    let test = TestBackend::new();
    let holders = test.holders();
    let user = signed_in(&holders, "ana@example.com").await;

    holders.reviews.submit_review("Japan", 5, "Sushi!").await.unwrap();
    let review = holders
        .reviews
        .submit_review("Australia", 4, "Amazing trip!")
        .await
        .unwrap();
    assert!(!review.id.is_empty());

    let outcome = holders.reviews.load_for_country("Australia").await;
    assert_eq!(outcome, Some(FetchOutcome::Applied(1)));

    let reviews = holders.reviews.state().data.get();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].id, review.id);
    assert_eq!(reviews[0].rating.value(), 4);
    assert_eq!(reviews[0].comment, "Amazing trip!");
    assert_eq!(reviews[0].country_name, "Australia");
    assert_eq!(reviews[0].user_id, user);
    assert!(holders.reviews.has_reviewed(&user, "Australia"));
    assert!(holders.reviews.state().error_message.get().is_none());
}

#[tokio::test]
async fn review_without_session_is_rejected_before_any_write() {
    let test = TestBackend::new();
    let holders = test.holders();

    assert!(holders.reviews.submit_review("Peru", 5, "Great").await.is_none());
    assert_eq!(
        holders.reviews.state().error_message.get().as_deref(),
        Some("Please sign in to continue.")
    );
    assert_eq!(test.documents.count("reviews"), 0);
}

#[tokio::test]
async fn invalid_review_input_shows_validation_message() {
    let test = TestBackend::new();
    let holders = test.holders();
    signed_in(&holders, "ana@example.com").await;

    assert!(holders.reviews.submit_review("Peru", 4, "   ").await.is_none());
    assert_eq!(
        holders.reviews.state().error_message.get().as_deref(),
        Some("Review text cannot be empty")
    );

    assert!(holders.reviews.submit_review("Peru", 6, "Too good").await.is_none());
    assert!(holders
        .reviews
        .state()
        .error_message
        .get()
        .is_some_and(|m| m.contains("rating")));
    assert_eq!(test.documents.count("reviews"), 0);
}

#[tokio::test]
async fn display_filters_by_rating_then_orders_by_date() {
    let test = TestBackend::new();
    let holders = test.holders();
    signed_in(&holders, "ana@example.com").await;

    holders.reviews.load_for_country("Peru").await;
    for (rating, comment) in [(5, "first"), (2, "second"), (4, "third")] {
        holders.reviews.submit_review("Peru", rating, comment).await.unwrap();
        // Distinct timestamps for the ordering assertions.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let newest = holders.reviews.displayed(ReviewFilter {
        min_rating: Some(4),
        newest_first: true,
    });
    let comments: Vec<&str> = newest.iter().map(|r| r.comment.as_str()).collect();
    assert_eq!(comments, vec!["third", "first"]);

    let oldest = holders.reviews.displayed(ReviewFilter {
        min_rating: None,
        newest_first: false,
    });
    let comments: Vec<&str> = oldest.iter().map(|r| r.comment.as_str()).collect();
    assert_eq!(comments, vec!["first", "second", "third"]);

    let avg = holders.reviews.average_rating().unwrap();
    assert!((avg - 11.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn edit_then_double_delete() {
    let test = TestBackend::new();
    let holders = test.holders();
    signed_in(&holders, "ana@example.com").await;
    holders.reviews.load_for_country("Peru").await;
    let review = holders.reviews.submit_review("Peru", 3, "ok").await.unwrap();

    assert!(holders.reviews.edit_review(&review.id, 5, "better than I said").await);
    let edited = holders.reviews.state().data.get();
    assert_eq!(edited[0].rating.value(), 5);
    assert_eq!(edited[0].comment, "better than I said");
    assert_eq!(edited[0].created_at, review.created_at);

    assert!(holders.reviews.delete_review(&review.id).await);
    assert!(holders.reviews.state().data.get().is_empty());

    assert!(!holders.reviews.delete_review(&review.id).await);
    assert_eq!(
        holders.reviews.state().error_message.get().as_deref(),
        Some("The requested item no longer exists.")
    );
    assert!(holders.reviews.state().data.get().is_empty());
}
