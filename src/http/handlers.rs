use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::{AuthService, SignupError, TokenPair};
use crate::app::comments::CommentService;
use crate::app::live::watch;
use crate::app::posts::PostService;
use crate::app::profiles::ProfileService;
use crate::app::reactions::ReactionService;
use crate::domain::change::ChangeFilter;
use crate::domain::comment::{parse_expanded, CommentNode, CommentParent, CommentView};
use crate::domain::ownership::DeleteOutcome;
use crate::domain::post::PostView;
use crate::domain::profile::Profile;
use crate::domain::reaction::{Reaction, ReactionKind, ReactionTarget, ToggleOutcome};
use crate::domain::sample::{preview_vote, SamplePost, Vote, VotePreview, SAMPLE_POSTS};
use crate::http::extract::{Json, Path, Query};
use crate::http::{AppError, AuthUser};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 30;
const MAX_PASSWORD_LEN: usize = 128;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_USERNAME_LEN: usize = 32;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn page_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    Ok(limit)
}

/// Posts are fetched with `limit + 1` rows; the extra row only signals that
/// another page exists.
fn paginate_posts(mut posts: Vec<PostView>, limit: i64) -> ListResponse<PostView> {
    let next_cursor = if posts.len() > limit as usize {
        posts.truncate(limit as usize);
        posts.last().map(|last| (last.post.created_at, last.post.id))
    } else {
        None
    };

    ListResponse {
        items: posts,
        next_cursor: encode_cursor(next_cursor),
    }
}

fn validate_content(raw: &str, max_chars: usize, what: &str) -> Result<String, AppError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::bad_request(format!("{} cannot be empty", what)));
    }
    if content.chars().count() > max_chars {
        return Err(AppError::bad_request(format!(
            "{} must be at most {} characters",
            what, max_chars
        )));
    }
    Ok(content.to_string())
}

fn delete_response(outcome: DeleteOutcome, what: &str) -> Result<StatusCode, AppError> {
    match outcome {
        DeleteOutcome::Deleted => Ok(StatusCode::NO_CONTENT),
        DeleteOutcome::NotFound => Err(AppError::not_found(format!("{} not found", what))),
        DeleteOutcome::NotOwner => Err(AppError::forbidden(format!(
            "you can only delete your own {}s",
            what
        ))),
    }
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

impl From<TokenPair> for AuthTokenResponse {
    fn from(tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        }
    }
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub profile: Profile,
    #[serde(flatten)]
    pub tokens: AuthTokenResponse,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("a valid email is required"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at least 6 characters"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let username = match payload.username.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) if name.chars().count() > MAX_USERNAME_LEN => {
            return Err(AppError::bad_request("username must be at most 32 characters"));
        }
        Some(name) => Some(name.to_string()),
    };

    let (profile, tokens) = AuthService::from_state(&state)
        .signup(&email, &payload.password, username)
        .await
        .map_err(|err| match err {
            SignupError::EmailTaken => AppError::conflict("email is already registered"),
            SignupError::UsernameTaken => AppError::conflict("username is already taken"),
            SignupError::Other(err) => AppError::backend(err, "sign up"),
        })?;

    tracing::info!(user_id = %profile.id, "account created");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            profile,
            tokens: tokens.into(),
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.email.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let email = payload.email.trim().to_lowercase();
    let tokens = AuthService::from_state(&state)
        .login(&email, &payload.password)
        .await
        .map_err(|err| AppError::backend(err, "sign in"))?;

    match tokens {
        Some(tokens) => Ok(Json(tokens.into())),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let tokens = AuthService::from_state(&state)
        .refresh(&payload.refresh_token)
        .await
        .map_err(|err| AppError::backend(err, "refresh token"))?;

    match tokens {
        Some(tokens) => Ok(Json(tokens.into())),
        None => Err(AppError::unauthorized("invalid refresh token")),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<StatusCode, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let revoked = AuthService::from_state(&state)
        .revoke_refresh_token(&payload.refresh_token)
        .await
        .map_err(|err| AppError::backend(err, "sign out"))?;

    tracing::debug!(revoked, "signed out");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub profile: Option<Profile>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: Option<SessionUser>,
}

pub async fn session(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let Some(auth) = auth else {
        return Ok(Json(SessionResponse { user: None }));
    };

    let profile = ProfileService::new(state.db.clone())
        .get_profile(auth.user_id)
        .await
        .map_err(|err| AppError::backend(err, "load session"))?;

    Ok(Json(SessionResponse {
        user: Some(SessionUser {
            id: auth.user_id,
            profile,
        }),
    }))
}

// ---------------------------------------------------------------------------
// Profiles and the feed page
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProfilePageResponse {
    /// `None` when the user never created a profile; their posts still list.
    pub profile: Option<Profile>,
    pub posts: ListResponse<PostView>,
}

pub async fn get_profile(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> Result<Json<ProfilePageResponse>, AppError> {
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;
    let viewer_id = auth.map(|auth| auth.user_id);

    let profile = ProfileService::new(state.db.clone())
        .get_profile(id)
        .await
        .map_err(|err| AppError::backend(err, "fetch profile"))?;

    let posts = PostService::new(state.db.clone())
        .list_by_user(id, viewer_id, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list profile posts");
            AppError::internal("failed to list profile posts")
        })?;

    Ok(Json(ProfilePageResponse {
        profile,
        posts: paginate_posts(posts, limit),
    }))
}

pub async fn list_user_posts(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<PostView>>, AppError> {
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;
    let viewer_id = auth.map(|auth| auth.user_id);

    let posts = PostService::new(state.db.clone())
        .list_by_user(id, viewer_id, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list user posts");
            AppError::internal("failed to list user posts")
        })?;

    Ok(Json(paginate_posts(posts, limit)))
}

#[derive(Serialize)]
pub struct FeedPageResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<ListResponse<PostView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<SamplePost>>,
}

/// Signed-in visitors get the real feed; everyone else gets the samples.
pub async fn feed_page(
    auth: Option<AuthUser>,
    Query(query): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> Result<Json<FeedPageResponse>, AppError> {
    let Some(auth) = auth else {
        return Ok(Json(FeedPageResponse {
            authenticated: false,
            posts: None,
            samples: Some(SAMPLE_POSTS.to_vec()),
        }));
    };

    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;
    let posts = PostService::new(state.db.clone())
        .list_feed(Some(auth.user_id), cursor, limit + 1)
        .await
        .map_err(|err| AppError::backend(err, "load feed"))?;

    Ok(Json(FeedPageResponse {
        authenticated: true,
        posts: Some(paginate_posts(posts, limit)),
        samples: None,
    }))
}

pub async fn list_samples() -> Json<ListResponse<SamplePost>> {
    Json(ListResponse {
        items: SAMPLE_POSTS.to_vec(),
        next_cursor: None,
    })
}

#[derive(Deserialize)]
pub struct SampleVoteRequest {
    pub index: usize,
    pub current: Option<Vote>,
    pub pressed: Vote,
}

pub async fn vote_sample(
    Json(payload): Json<SampleVoteRequest>,
) -> Result<Json<VotePreview>, AppError> {
    let sample = SAMPLE_POSTS
        .get(payload.index)
        .ok_or_else(|| AppError::not_found("sample post not found"))?;

    Ok(Json(preview_vote(
        sample.votes,
        payload.current,
        payload.pressed,
    )))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>), AppError> {
    let content = validate_content(&payload.content, state.max_post_chars, "post")?;

    let post = PostService::new(state.db.clone())
        .create_post(auth.user_id, content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    tracing::info!(post_id = %post.post.id, user_id = %auth.user_id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_posts(
    auth: Option<AuthUser>,
    Query(query): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<PostView>>, AppError> {
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;
    let viewer_id = auth.map(|auth| auth.user_id);

    let posts = PostService::new(state.db.clone())
        .list_feed(viewer_id, cursor, limit + 1)
        .await
        .map_err(|err| AppError::backend(err, "list posts"))?;

    Ok(Json(paginate_posts(posts, limit)))
}

pub async fn get_post(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PostView>, AppError> {
    let viewer_id = auth.map(|auth| auth.user_id);
    let post = PostService::new(state.db.clone())
        .get_post(id, viewer_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to fetch post");
            AppError::internal("failed to fetch post")
        })?;

    post.map(Json)
        .ok_or_else(|| AppError::not_found("post not found"))
}

pub async fn delete_post(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let outcome = PostService::new(state.db.clone())
        .delete_post(id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to delete post");
            AppError::internal("failed to delete post")
        })?;

    if outcome == DeleteOutcome::Deleted {
        tracing::info!(post_id = %id, user_id = %auth.user_id, "post deleted");
    }
    delete_response(outcome, "post")
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CommentThreadQuery {
    pub expand: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

pub async fn list_post_comments(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<CommentThreadQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<CommentNode>>, AppError> {
    let expanded = parse_expanded(query.expand.as_deref())
        .map_err(|_| AppError::bad_request("expand must be a comma-separated list of comment ids"))?;
    let viewer_id = auth.map(|auth| auth.user_id);

    let exists = PostService::new(state.db.clone())
        .exists(id)
        .await
        .map_err(|err| AppError::backend(err, "list comments"))?;
    if !exists {
        return Err(AppError::not_found("post not found"));
    }

    let thread = CommentService::new(state.db.clone())
        .thread(id, viewer_id, &expanded)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to list comments");
            AppError::internal("failed to list comments")
        })?;

    Ok(Json(ListResponse {
        items: thread,
        next_cursor: None,
    }))
}

pub async fn create_comment(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    add_comment(&state, auth, CommentParent::Post(id), &payload.content).await
}

pub async fn create_reply(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    add_comment(&state, auth, CommentParent::Comment(id), &payload.content).await
}

async fn add_comment(
    state: &AppState,
    auth: AuthUser,
    parent: CommentParent,
    raw: &str,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let what = if parent.is_top_level() { "comment" } else { "reply" };
    let content = validate_content(raw, state.max_comment_chars, what)?;

    let comment = CommentService::new(state.db.clone())
        .create_comment(auth.user_id, parent, content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, parent = ?parent, "failed to create comment");
            AppError::internal(format!("failed to create {}", what))
        })?;

    let comment = comment.ok_or_else(|| match parent {
        CommentParent::Post(_) => AppError::not_found("post not found"),
        CommentParent::Comment(_) => AppError::not_found("comment not found"),
    })?;

    tracing::info!(comment_id = %comment.comment.id, user_id = %auth.user_id, "comment created");
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<CommentView>, AppError> {
    let viewer_id = auth.map(|auth| auth.user_id);
    let comment = CommentService::new(state.db.clone())
        .get_comment(id, viewer_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, comment_id = %id, "failed to fetch comment");
            AppError::internal("failed to fetch comment")
        })?;

    comment
        .map(Json)
        .ok_or_else(|| AppError::not_found("comment not found"))
}

pub async fn list_replies(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<CommentView>>, AppError> {
    let viewer_id = auth.map(|auth| auth.user_id);
    let service = CommentService::new(state.db.clone());

    let exists = service
        .exists(id)
        .await
        .map_err(|err| AppError::backend(err, "list replies"))?;
    if !exists {
        return Err(AppError::not_found("comment not found"));
    }

    let replies = service.list_replies(id, viewer_id).await.map_err(|err| {
        tracing::error!(error = ?err, comment_id = %id, "failed to list replies");
        AppError::internal("failed to list replies")
    })?;

    Ok(Json(ListResponse {
        items: replies,
        next_cursor: None,
    }))
}

pub async fn delete_comment(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let outcome = CommentService::new(state.db.clone())
        .delete_comment(id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, comment_id = %id, "failed to delete comment");
            AppError::internal("failed to delete comment")
        })?;

    if outcome == DeleteOutcome::Deleted {
        tracing::info!(comment_id = %id, user_id = %auth.user_id, "comment deleted");
    }
    delete_response(outcome, "comment")
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ReactionRequest {
    #[serde(rename = "type")]
    pub kind: ReactionKind,
}

pub async fn react_to_post(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    payload: Result<Json<ReactionRequest>, AppError>,
) -> Result<Json<ToggleOutcome>, AppError> {
    toggle_reaction(&state, auth, ReactionTarget::Post(id), payload).await
}

pub async fn react_to_comment(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    payload: Result<Json<ReactionRequest>, AppError>,
) -> Result<Json<ToggleOutcome>, AppError> {
    toggle_reaction(&state, auth, ReactionTarget::Comment(id), payload).await
}

async fn toggle_reaction(
    state: &AppState,
    auth: Option<AuthUser>,
    target: ReactionTarget,
    payload: Result<Json<ReactionRequest>, AppError>,
) -> Result<Json<ToggleOutcome>, AppError> {
    // Anonymous presses are turned away before the body is even looked at.
    let auth = auth.ok_or_else(|| AppError::unauthorized("please sign in to react"))?;
    let Json(ReactionRequest { kind: pressed }) = payload?;

    let outcome = ReactionService::new(state.db.clone())
        .toggle(auth.user_id, target, pressed)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, target = ?target, "failed to toggle reaction");
            AppError::internal("failed to toggle reaction")
        })?;

    outcome.map(Json).ok_or_else(|| match target {
        ReactionTarget::Post(_) => AppError::not_found("post not found"),
        ReactionTarget::Comment(_) => AppError::not_found("comment not found"),
    })
}

pub async fn list_post_reactions(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Reaction>>, AppError> {
    own_reactions(&state, auth, ReactionTarget::Post(id)).await
}

pub async fn list_comment_reactions(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Reaction>>, AppError> {
    own_reactions(&state, auth, ReactionTarget::Comment(id)).await
}

async fn own_reactions(
    state: &AppState,
    auth: AuthUser,
    target: ReactionTarget,
) -> Result<Json<ListResponse<Reaction>>, AppError> {
    let service = ReactionService::new(state.db.clone());

    let exists = service
        .target_exists(target)
        .await
        .map_err(|err| AppError::backend(err, "list reactions"))?;
    if !exists {
        return Err(match target {
            ReactionTarget::Post(_) => AppError::not_found("post not found"),
            ReactionTarget::Comment(_) => AppError::not_found("comment not found"),
        });
    }

    let reactions = service
        .list_for_user(auth.user_id, target)
        .await
        .map_err(|err| AppError::backend(err, "list reactions"))?;

    Ok(Json(ListResponse {
        items: reactions,
        next_cursor: None,
    }))
}

// ---------------------------------------------------------------------------
// Live views (server-sent events)
// ---------------------------------------------------------------------------

fn snapshot_events<S, T>(snapshots: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = anyhow::Result<Vec<T>>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let events = snapshots.map(|snapshot| {
        let event = match snapshot {
            Ok(items) => Event::default()
                .event("snapshot")
                .json_data(ListResponse {
                    items,
                    next_cursor: None,
                })
                .unwrap_or_else(|err| {
                    tracing::error!(error = ?err, "failed to encode live snapshot");
                    Event::default().event("error").data("failed to encode snapshot")
                }),
            Err(err) => {
                tracing::error!(error = ?err, "failed to load live snapshot");
                Event::default().event("error").data("failed to load snapshot")
            }
        };
        Ok(event)
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

pub async fn live_posts(
    auth: Option<AuthUser>,
    Query(query): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let limit = page_limit(query.limit)?;
    let viewer_id = auth.map(|auth| auth.user_id);
    let service = PostService::new(state.db.clone());

    let snapshots = watch(state.changes.subscribe(), ChangeFilter::AllPosts, move || {
        let service = service.clone();
        async move { service.list_feed(viewer_id, None, limit).await }
    });

    Ok(snapshot_events(snapshots))
}

pub async fn live_user_posts(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let limit = page_limit(query.limit)?;
    let viewer_id = auth.map(|auth| auth.user_id);
    let service = PostService::new(state.db.clone());

    let snapshots = watch(state.changes.subscribe(), ChangeFilter::UserPosts(id), move || {
        let service = service.clone();
        async move { service.list_by_user(id, viewer_id, None, limit).await }
    });

    Ok(snapshot_events(snapshots))
}

pub async fn live_post_comments(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<CommentThreadQuery>,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let expanded = parse_expanded(query.expand.as_deref())
        .map_err(|_| AppError::bad_request("expand must be a comma-separated list of comment ids"))?;
    let viewer_id = auth.map(|auth| auth.user_id);

    let exists = PostService::new(state.db.clone())
        .exists(id)
        .await
        .map_err(|err| AppError::backend(err, "watch comments"))?;
    if !exists {
        return Err(AppError::not_found("post not found"));
    }

    let service = CommentService::new(state.db.clone());
    let snapshots = watch(state.changes.subscribe(), ChangeFilter::PostComments(id), move || {
        let service = service.clone();
        let expanded = expanded.clone();
        async move { service.thread(id, viewer_id, &expanded).await }
    });

    Ok(snapshot_events(snapshots))
}

pub async fn live_replies(
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let viewer_id = auth.map(|auth| auth.user_id);
    let service = CommentService::new(state.db.clone());

    let exists = service
        .exists(id)
        .await
        .map_err(|err| AppError::backend(err, "watch replies"))?;
    if !exists {
        return Err(AppError::not_found("comment not found"));
    }

    let snapshots = watch(state.changes.subscribe(), ChangeFilter::Replies(id), move || {
        let service = service.clone();
        async move { service.list_replies(id, viewer_id).await }
    });

    Ok(snapshot_events(snapshots))
}
