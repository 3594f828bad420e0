//! Feed scopes and pagination over HTTP.

mod support;

use axum::http::StatusCode;
use support::{app, app_with, body_text, card_count};

#[tokio::test]
async fn thirteen_posts_split_ten_and_three() {
    let app = app();
    let (leo, _) = app.sign_up("leo").await;
    let cats = app.group("cats", "Cats").await;
    app.posts(&leo, 13, Some(&cats)).await;

    for base in ["/?", "/group/cats/?", "/profile/leo/?"] {
        let first = body_text(app.get(&format!("{base}page=1"), None).await).await;
        assert_eq!(card_count(&first), 10, "{base} page 1");

        let second = body_text(app.get(&format!("{base}page=2"), None).await).await;
        assert_eq!(card_count(&second), 3, "{base} page 2");
    }
}

#[tokio::test]
async fn out_of_range_pages_are_clamped() {
    let app = app();
    let (leo, _) = app.sign_up("leo").await;
    app.posts(&leo, 13, None).await;

    let past_end = body_text(app.get("/profile/leo/?page=99", None).await).await;
    assert_eq!(card_count(&past_end), 3);

    let garbage = app.get("/profile/leo/?page=abc", None).await;
    assert_eq!(garbage.status(), StatusCode::OK);
    assert_eq!(card_count(&body_text(garbage).await), 10);

    let negative = body_text(app.get("/profile/leo/?page=-3", None).await).await;
    assert_eq!(card_count(&negative), 10);
}

#[tokio::test]
async fn repeated_page_key_uses_the_last_value() {
    let app = app_with(10, false);
    let (leo, _) = app.sign_up("leo").await;
    app.posts(&leo, 13, None).await;

    for uri in ["/profile/leo/?page=1&page=2", "/?page=1&page=2"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(card_count(&body_text(response).await), 3, "{uri}");
    }

    let response = app.get("/profile/leo/?page=2&page=x", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(card_count(&body_text(response).await), 10);
}

#[tokio::test]
async fn group_feed_only_lists_its_posts() {
    let app = app();
    let (leo, _) = app.sign_up("leo").await;
    let cats = app.group("cats", "Cats").await;
    let dogs = app.group("dogs", "Dogs").await;
    app.post(&leo, "meow in the cats group", Some(&cats)).await;
    app.post(&leo, "woof in the dogs group", Some(&dogs)).await;

    let html = body_text(app.get("/group/dogs/", None).await).await;
    assert!(html.contains("woof in the dogs group"));
    assert!(!html.contains("meow in the cats group"));
    assert!(html.contains("All about Dogs"));
}

#[tokio::test]
async fn feeds_are_newest_first() {
    let app = app_with(10, false);
    let (leo, _) = app.sign_up("leo").await;
    app.post(&leo, "the older post", None).await;
    app.post(&leo, "the newer post", None).await;

    let html = body_text(app.get("/", None).await).await;
    let newer = html.find("the newer post").expect("newer listed");
    let older = html.find("the older post").expect("older listed");
    assert!(newer < older);
}

#[tokio::test]
async fn new_post_appears_in_every_relevant_feed() {
    let app = app_with(10, false);
    let (leo, _) = app.sign_up("leo").await;
    let (_, reader_cookie) = app.sign_up("reader").await;
    let cats = app.group("cats", "Cats").await;
    app.group("dogs", "Dogs").await;

    let follow = app.get("/profile/leo/follow/", Some(&reader_cookie)).await;
    assert_eq!(follow.status(), StatusCode::FOUND);

    app.post(&leo, "a fresh cat post", Some(&cats)).await;

    for uri in ["/", "/group/cats/", "/profile/leo/"] {
        let html = body_text(app.get(uri, None).await).await;
        assert!(html.contains("a fresh cat post"), "missing from {uri}");
    }
    let followed = body_text(app.get("/follow/", Some(&reader_cookie)).await).await;
    assert!(followed.contains("a fresh cat post"));

    let other = body_text(app.get("/group/dogs/", None).await).await;
    assert!(!other.contains("a fresh cat post"));
}

#[tokio::test]
async fn empty_feed_still_renders() {
    let app = app();
    let response = app.get("/?page=5", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert_eq!(card_count(&html), 0);
    assert!(html.contains("No posts yet."));
}
