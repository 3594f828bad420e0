//! Following and unfollowing authors through the profile routes.

mod support;

use axum::http::StatusCode;
use blogroll::{application::repos::FollowsRepo, domain::entities::FollowPair};
use support::{app, body_text, card_count, location};

#[tokio::test]
async fn follow_is_idempotent_and_redirects_to_profile() {
    let app = app();
    let (reader, cookie) = app.sign_up("reader").await;
    let (writer, _) = app.sign_up("writer").await;

    for _ in 0..2 {
        let response = app.get("/profile/writer/follow/", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/profile/writer/");
    }

    assert_eq!(app.repos.count_followers(writer.id).await.unwrap(), 1);
    assert!(
        app.repos
            .is_following(FollowPair::new(reader.id, writer.id))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn self_follow_changes_nothing() {
    let app = app();
    let (reader, cookie) = app.sign_up("reader").await;

    let response = app.get("/profile/reader/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/profile/reader/");
    assert_eq!(app.repos.count_following(reader.id).await.unwrap(), 0);
}

#[tokio::test]
async fn unfollow_removes_the_relation() {
    let app = app();
    let (reader, cookie) = app.sign_up("reader").await;
    let (writer, _) = app.sign_up("writer").await;
    app.get("/profile/writer/follow/", Some(&cookie)).await;

    let response = app.get("/profile/writer/unfollow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/profile/writer/");
    assert!(
        !app.repos
            .is_following(FollowPair::new(reader.id, writer.id))
            .await
            .unwrap()
    );

    let again = app.get("/profile/writer/unfollow/", Some(&cookie)).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn following_unknown_author_is_not_found() {
    let app = app();
    let (_, cookie) = app.sign_up("reader").await;

    let response = app.get("/profile/ghost/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn followed_feed_shows_only_followed_authors() {
    let app = app();
    let (_, reader_cookie) = app.sign_up("reader").await;
    let (_, other_cookie) = app.sign_up("other").await;
    let (writer, _) = app.sign_up("writer").await;
    app.get("/profile/writer/follow/", Some(&reader_cookie)).await;

    app.post(&writer, "news from the writer", None).await;

    let reader_feed = body_text(app.get("/follow/", Some(&reader_cookie)).await).await;
    assert!(reader_feed.contains("news from the writer"));
    assert_eq!(card_count(&reader_feed), 1);

    let other_feed = body_text(app.get("/follow/", Some(&other_cookie)).await).await;
    assert!(!other_feed.contains("news from the writer"));
    assert_eq!(card_count(&other_feed), 0);
}

#[tokio::test]
async fn posts_after_unfollow_stay_out_of_followed_feed() {
    let app = app();
    let (_, cookie) = app.sign_up("reader").await;
    let (writer, _) = app.sign_up("writer").await;
    app.get("/profile/writer/follow/", Some(&cookie)).await;
    app.post(&writer, "written while followed", None).await;

    let feed = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert!(feed.contains("written while followed"));

    let response = app.get("/profile/writer/unfollow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    app.post(&writer, "written after unfollow", None).await;

    let feed = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert!(!feed.contains("written after unfollow"));
    assert!(!feed.contains("written while followed"));
    assert_eq!(card_count(&feed), 0);
}

#[tokio::test]
async fn profile_offers_follow_or_unfollow() {
    let app = app();
    let (_, cookie) = app.sign_up("reader").await;
    app.sign_up("writer").await;

    let html = body_text(app.get("/profile/writer/", Some(&cookie)).await).await;
    assert!(html.contains("/profile/writer/follow/"));

    app.get("/profile/writer/follow/", Some(&cookie)).await;
    let html = body_text(app.get("/profile/writer/", Some(&cookie)).await).await;
    assert!(html.contains("/profile/writer/unfollow/"));

    let own = body_text(app.get("/profile/reader/", Some(&cookie)).await).await;
    assert!(!own.contains("/profile/reader/follow/"));
}
