use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/session", get(handlers::session))
}

pub fn profiles() -> Router<AppState> {
    Router::new()
        .route("/profiles/:id", get(handlers::get_profile))
        .route("/users/:id/posts", get(handlers::list_user_posts))
}

pub fn feed() -> Router<AppState> {
    Router::new()
        .route("/feed", get(handlers::feed_page))
        .route("/samples", get(handlers::list_samples))
        .route("/samples/vote", post(handlers::vote_sample))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/posts/:id",
            get(handlers::get_post).delete(handlers::delete_post),
        )
        .route(
            "/posts/:id/comments",
            get(handlers::list_post_comments).post(handlers::create_comment),
        )
        .route(
            "/posts/:id/reactions",
            get(handlers::list_post_reactions).post(handlers::react_to_post),
        )
}

pub fn comments() -> Router<AppState> {
    Router::new()
        .route(
            "/comments/:id",
            get(handlers::get_comment).delete(handlers::delete_comment),
        )
        .route(
            "/comments/:id/replies",
            get(handlers::list_replies).post(handlers::create_reply),
        )
        .route(
            "/comments/:id/reactions",
            get(handlers::list_comment_reactions).post(handlers::react_to_comment),
        )
}

pub fn live() -> Router<AppState> {
    Router::new()
        .route("/live/posts", get(handlers::live_posts))
        .route("/live/posts/:id/comments", get(handlers::live_post_comments))
        .route("/live/comments/:id/replies", get(handlers::live_replies))
        .route("/live/users/:id/posts", get(handlers::live_user_posts))
}
