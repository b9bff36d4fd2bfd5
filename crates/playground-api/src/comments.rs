use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use playground_db::NewComment;
use playground_types::api::{AddCommentForm, ModifyCommentRequest};

use crate::error::{ApiError, parse_id};
use crate::middleware::CurrentUser;
use crate::response::ApiJson;
use crate::state::AppState;

fn ids(raw: &(String, String)) -> Result<(i64, i64), ApiError> {
    Ok((parse_id(&raw.0)?, parse_id(&raw.1)?))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let comments = state.blocking(move |store| store.comments(id)).await?;
    Ok(ApiJson::ok(comments))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(raw): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (id, comment_id) = ids(&raw)?;
    let comment = state.blocking(move |store| store.comment(id, comment_id)).await?;
    Ok(ApiJson::ok(comment))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    Form(form): Form<AddCommentForm>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let new = NewComment {
        content: form.comment,
        author: user.0.username,
        time_of_submission: Utc::now(),
    };
    let comment = state.blocking(move |store| store.add_comment(id, new)).await?;
    Ok(ApiJson::accepted(comment))
}

pub async fn modify_comment(
    State(state): State<AppState>,
    Path(raw): Path<(String, String)>,
    user: CurrentUser,
    Json(req): Json<ModifyCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (id, comment_id) = ids(&raw)?;
    let requester = user.0.username;
    let comment = state
        .blocking(move |store| store.modify_comment(id, comment_id, &requester, &req.content))
        .await?;
    Ok(ApiJson::accepted(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(raw): Path<(String, String)>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let (id, comment_id) = ids(&raw)?;
    let requester = user.0.username;
    state
        .blocking(move |store| store.delete_comment(id, comment_id, &requester))
        .await?;
    Ok(StatusCode::ACCEPTED)
}
