//! Comment Tests
//!
//! Covers top-level comments, replies, collapsed/expanded threads, and
//! owner-only deletion.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Creation
// ===========================================================================

#[tokio::test]
async fn create_top_level_comment() {
    let app = app().await;
    let author = app.create_user("cmt_author").await;
    let commenter = app.create_user("cmt_commenter").await;
    let post_id = app.create_post_for_user(author.id, "comment on me").await;

    let resp = app
        .post_json(
            &format!("/v1/posts/{}/comments", post_id),
            json!({ "content": "first!" }),
            Some(&commenter.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["post_id"].as_str().unwrap(), post_id.to_string());
    assert!(body["parent_comment_id"].is_null());
    assert_eq!(body["user_id"].as_str().unwrap(), commenter.id.to_string());
    assert_eq!(body["content"], "first!");
    assert_eq!(body["reply_count"], 0);
    assert_eq!(body["can_delete"], true);
}

#[tokio::test]
async fn create_reply_has_only_parent_comment() {
    let app = app().await;
    let user = app.create_user("cmt_reply").await;
    let post_id = app.create_post_for_user(user.id, "thread root").await;
    let comment_id = app.create_comment_for_post(user.id, post_id, "parent").await;

    let resp = app
        .post_json(
            &format!("/v1/comments/{}/replies", comment_id),
            json!({ "content": "a reply" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert!(body["post_id"].is_null());
    assert_eq!(
        body["parent_comment_id"].as_str().unwrap(),
        comment_id.to_string()
    );
}

#[tokio::test]
async fn comment_on_missing_post_not_found() {
    let app = app().await;
    let user = app.create_user("cmt_missing").await;

    let resp = app
        .post_json(
            &format!("/v1/posts/{}/comments", Uuid::new_v4()),
            json!({ "content": "into the void" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "post not found");
}

#[tokio::test]
async fn reply_to_missing_comment_not_found() {
    let app = app().await;
    let user = app.create_user("cmt_reply_missing").await;

    let resp = app
        .post_json(
            &format!("/v1/comments/{}/replies", Uuid::new_v4()),
            json!({ "content": "hello?" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "comment not found");
}

#[tokio::test]
async fn empty_comment_rejected() {
    let app = app().await;
    let user = app.create_user("cmt_empty").await;
    let post_id = app.create_post_for_user(user.id, "quiet post").await;

    let resp = app
        .post_json(
            &format!("/v1/posts/{}/comments", post_id),
            json!({ "content": "    " }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "comment cannot be empty");
}

#[tokio::test]
async fn comment_requires_auth() {
    let app = app().await;
    let user = app.create_user("cmt_anon").await;
    let post_id = app.create_post_for_user(user.id, "sign in first").await;

    let resp = app
        .post_json(
            &format!("/v1/posts/{}/comments", post_id),
            json!({ "content": "drive-by" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

// ===========================================================================
// Threads
// ===========================================================================

#[tokio::test]
async fn thread_collapses_replies_by_default() {
    let app = app().await;
    let user = app.create_user("cmt_collapsed").await;
    let post_id = app.create_post_for_user(user.id, "threaded").await;
    let comment_id = app.create_comment_for_post(user.id, post_id, "top").await;
    app.create_reply_for_comment(user.id, comment_id, "hidden reply").await;

    let resp = app
        .get(&format!("/v1/posts/{}/comments", post_id), None)
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let items = resp.json()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"].as_str().unwrap(), comment_id.to_string());
    assert_eq!(items[0]["reply_count"], 1);
    assert_eq!(items[0]["replies"]["state"], "collapsed");
    assert!(items[0]["replies"].get("items").is_none());
}

#[tokio::test]
async fn thread_expands_requested_comments() {
    let app = app().await;
    let user = app.create_user("cmt_expanded").await;
    let post_id = app.create_post_for_user(user.id, "threaded").await;
    let open = app.create_comment_for_post(user.id, post_id, "open me").await;
    let shut = app.create_comment_for_post(user.id, post_id, "leave me").await;
    let reply_id = app.create_reply_for_comment(user.id, open, "visible reply").await;
    app.create_reply_for_comment(user.id, shut, "still hidden").await;

    let resp = app
        .get(&format!("/v1/posts/{}/comments?expand={}", post_id, open), None)
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let items = resp.json()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 2);

    assert_eq!(items[0]["id"].as_str().unwrap(), open.to_string());
    assert_eq!(items[0]["replies"]["state"], "expanded");
    let replies = items[0]["replies"]["items"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"].as_str().unwrap(), reply_id.to_string());

    assert_eq!(items[1]["id"].as_str().unwrap(), shut.to_string());
    assert_eq!(items[1]["replies"]["state"], "collapsed");
}

#[tokio::test]
async fn thread_rejects_malformed_expand() {
    let app = app().await;
    let user = app.create_user("cmt_bad_expand").await;
    let post_id = app.create_post_for_user(user.id, "threaded").await;

    let resp = app
        .get(&format!("/v1/posts/{}/comments?expand=nope", post_id), None)
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn thread_of_missing_post_not_found() {
    let app = app().await;

    let resp = app
        .get(&format!("/v1/posts/{}/comments", Uuid::new_v4()), None)
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn replies_listed_oldest_first() {
    let app = app().await;
    let user = app.create_user("cmt_reply_order").await;
    let post_id = app.create_post_for_user(user.id, "threaded").await;
    let comment_id = app.create_comment_for_post(user.id, post_id, "top").await;
    app.create_reply_for_comment(user.id, comment_id, "one").await;
    app.create_reply_for_comment(user.id, comment_id, "two").await;

    let resp = app
        .get(&format!("/v1/comments/{}/replies", comment_id), None)
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let items = resp.json()["items"].as_array().unwrap().clone();
    let contents: Vec<&str> = items.iter().map(|c| c["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["one", "two"]);
}

#[tokio::test]
async fn get_comment_reports_reply_count() {
    let app = app().await;
    let user = app.create_user("cmt_get").await;
    let post_id = app.create_post_for_user(user.id, "threaded").await;
    let comment_id = app.create_comment_for_post(user.id, post_id, "counted").await;
    app.create_reply_for_comment(user.id, comment_id, "r1").await;
    app.create_reply_for_comment(user.id, comment_id, "r2").await;

    let resp = app
        .get(&format!("/v1/comments/{}", comment_id), Some(&user.access_token))
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["reply_count"], 2);
    assert_eq!(body["can_delete"], true);
}

// ===========================================================================
// Deletion
// ===========================================================================

#[tokio::test]
async fn delete_own_comment_removes_replies() {
    let app = app().await;
    let user = app.create_user("cmt_del").await;
    let post_id = app.create_post_for_user(user.id, "threaded").await;
    let comment_id = app.create_comment_for_post(user.id, post_id, "doomed").await;
    let reply_id = app.create_reply_for_comment(user.id, comment_id, "also doomed").await;

    let resp = app
        .delete(&format!("/v1/comments/{}", comment_id), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get(&format!("/v1/comments/{}", reply_id), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_other_users_comment_forbidden() {
    let app = app().await;
    let owner = app.create_user("cmt_del_owner").await;
    let other = app.create_user("cmt_del_other").await;
    let post_id = app.create_post_for_user(other.id, "other's post").await;
    let comment_id = app.create_comment_for_post(owner.id, post_id, "mine").await;

    // Owning the post does not grant deleting other people's comments on it.
    let resp = app
        .delete(&format!("/v1/comments/{}", comment_id), Some(&other.access_token))
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "you can only delete your own comments");
}
