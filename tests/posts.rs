//! Post authoring, editing and comments.

mod support;

use axum::http::StatusCode;
use blogroll::application::repos::{CommentsRepo, PostFilter, PostsRepo};
use support::{Multipart, SMALL_GIF, app, body_text, location};

#[tokio::test]
async fn create_post_redirects_to_profile() {
    let app = app();
    let (leo, cookie) = app.sign_up("leo").await;
    let cats = app.group("cats", "Cats").await;

    let form = Multipart::new()
        .text("text", "My first post")
        .text("group", &cats.id.to_string());
    let response = app.post_multipart("/create/", form, &cookie).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/profile/leo/");

    let posts = app.repos.list_posts(PostFilter::All, None).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "My first post");
    assert_eq!(posts[0].author_id, leo.id);
    assert_eq!(posts[0].group.as_ref().map(|g| g.id), Some(cats.id));
}

#[tokio::test]
async fn post_with_image_is_served_from_media() {
    let app = app();
    let (_, cookie) = app.sign_up("leo").await;

    let form = Multipart::new()
        .text("text", "Look at this")
        .text("group", "")
        .file("image", "small.gif", "image/gif", SMALL_GIF);
    let response = app.post_multipart("/create/", form, &cookie).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let posts = app.repos.list_posts(PostFilter::All, None).await.unwrap();
    let image = posts[0].image.clone().expect("image stored");
    assert!(image.starts_with("posts/"));
    assert!(image.ends_with("small.gif"));

    let detail = body_text(app.get(&format!("/posts/{}/", posts[0].id), None).await).await;
    assert!(detail.contains(&format!("/media/{image}")));

    let media = app.get(&format!("/media/{image}"), None).await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(media.headers()["content-type"], "image/gif");
}

#[tokio::test]
async fn invalid_post_form_rerenders_without_saving() {
    let app = app();
    let (_, cookie) = app.sign_up("leo").await;

    let form = Multipart::new()
        .text("text", "   ")
        .text("group", "4242")
        .file("image", "notes.txt", "text/plain", b"plain text");
    let response = app.post_multipart("/create/", form, &cookie).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("field-error"));
    assert!(html.contains("Select a valid choice."));
    assert_eq!(app.repos.count_posts(PostFilter::All).await.unwrap(), 0);
}

#[tokio::test]
async fn owner_can_edit_and_keeps_author_and_date() {
    let app = app();
    let (leo, cookie) = app.sign_up("leo").await;
    let post = app.post(&leo, "Original text", None).await;

    let edit_uri = format!("/posts/{}/edit/", post.id);
    let form_page = app.get(&edit_uri, Some(&cookie)).await;
    assert_eq!(form_page.status(), StatusCode::OK);
    assert!(body_text(form_page).await.contains("Original text"));

    let form = Multipart::new()
        .text("text", "Edited text")
        .text("group", "");
    let response = app.post_multipart(&edit_uri, form, &cookie).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let stored = app.repos.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Edited text");
    assert_eq!(stored.author_id, leo.id);
    assert_eq!(stored.created_at, post.created_at);
    assert_eq!(app.repos.count_posts(PostFilter::All).await.unwrap(), 1);
}

#[tokio::test]
async fn non_owner_is_sent_to_the_detail_page() {
    let app = app();
    let (leo, _) = app.sign_up("leo").await;
    let (_, intruder) = app.sign_up("intruder").await;
    let post = app.post(&leo, "Not yours", None).await;

    let edit_uri = format!("/posts/{}/edit/", post.id);
    let response = app.get(&edit_uri, Some(&intruder)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let form = Multipart::new().text("text", "Hijacked").text("group", "");
    let response = app.post_multipart(&edit_uri, form, &intruder).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let stored = app.repos.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Not yours");
}

#[tokio::test]
async fn signed_in_comment_is_listed_on_detail() {
    let app = app();
    let (leo, _) = app.sign_up("leo").await;
    let (_, reader) = app.sign_up("reader").await;
    let post = app.post(&leo, "Discuss", None).await;

    let uri = format!("/posts/{}/comment/", post.id);
    let response = app.post_form(&uri, "text=Great+post", Some(&reader)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let html = body_text(app.get(&format!("/posts/{}/", post.id), None).await).await;
    assert!(html.contains("Great post"));
    assert_eq!(app.repos.list_for_post(post.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn blank_comment_is_rejected() {
    let app = app();
    let (leo, cookie) = app.sign_up("leo").await;
    let post = app.post(&leo, "Discuss", None).await;

    let uri = format!("/posts/{}/comment/", post.id);
    let response = app.post_form(&uri, "text=++", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("field-error"));
    assert!(app.repos.list_for_post(post.id).await.unwrap().is_empty());

    let get = app.get(&uri, Some(&cookie)).await;
    assert_eq!(get.status(), StatusCode::FOUND);
    assert_eq!(location(&get), format!("/posts/{}/", post.id));
}

#[tokio::test]
async fn comment_form_only_for_signed_in_viewers() {
    let app = app();
    let (leo, cookie) = app.sign_up("leo").await;
    let post = app.post(&leo, "Discuss", None).await;
    let uri = format!("/posts/{}/", post.id);

    let anonymous = body_text(app.get(&uri, None).await).await;
    assert!(!anonymous.contains("comment-form"));

    let signed_in = body_text(app.get(&uri, Some(&cookie)).await).await;
    assert!(signed_in.contains("comment-form"));
    assert!(signed_in.contains("Edit post"));
}

#[tokio::test]
async fn detail_shows_author_post_count() {
    let app = app();
    let (leo, _) = app.sign_up("leo").await;
    app.posts(&leo, 2, None).await;
    let post = app.post(&leo, "Third", None).await;

    let html = body_text(app.get(&format!("/posts/{}/", post.id), None).await).await;
    assert!(html.contains("<span class=\"author-post-count\">3</span>"));
}
