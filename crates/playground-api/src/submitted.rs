use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use playground_db::NewPlayground;
use playground_types::api::SubmitPlaygroundForm;

use crate::error::{ApiError, parse_id};
use crate::middleware::CurrentUser;
use crate::response::ApiJson;
use crate::state::AppState;

pub async fn list_submitted(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let drafts = state.blocking(|store| store.all_submitted_playgrounds()).await?;
    Ok(ApiJson::ok(drafts))
}

pub async fn get_submitted(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let draft = state.blocking(move |store| store.submitted_playground(id)).await?;
    Ok(ApiJson::ok(draft))
}

/// Stores a proposal as a draft authored by the caller.
pub async fn submit_playground(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<SubmitPlaygroundForm>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewPlayground {
        name: form.name,
        address: form.address,
        postal_code: form.postal_code,
        city: form.city,
        department: form.department,
        author: user.0.username,
        time_of_submission: Utc::now(),
    };
    let draft = state.blocking(move |store| store.submit_playground(new)).await?;
    Ok(ApiJson::accepted(draft))
}

/// Withdraws a draft. Only its author may.
pub async fn delete_submitted(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let requester = user.0.username;
    state
        .blocking(move |store| store.delete_submitted_playground(id, &requester))
        .await?;
    Ok(StatusCode::ACCEPTED)
}
