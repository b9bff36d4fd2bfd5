use axum::{
    Form,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use playground_db::{FieldErrors, Promotion};
use playground_geo::{Geocoder, nearest};
use playground_types::api::PromotePlaygroundForm;

use crate::error::{ApiError, parse_id};
use crate::middleware::CurrentUser;
use crate::response::ApiJson;
use crate::state::AppState;

/// How many playgrounds the nearest query returns.
pub const NEAREST_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub address: Option<String>,
}

pub async fn list_playgrounds(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let playgrounds = state.blocking(|store| store.all_playgrounds()).await?;
    Ok(ApiJson::ok(playgrounds))
}

pub async fn get_playground(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let playground = state.blocking(move |store| store.playground(id)).await?;
    Ok(ApiJson::ok(playground))
}

/// Published, geocoded playgrounds closest to a free-text address.
pub async fn nearest_playgrounds(
    State(state): State<AppState>,
    Query(query): Query<NearestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let address = query.address.unwrap_or_default();
    let address = address.trim();
    if address.is_empty() {
        return Err(ApiError::BadRequest("address is required".into()));
    }

    let reference = state.geocoder.resolve(address).await?;
    let playgrounds = state.blocking(|store| store.all_playgrounds()).await?;

    // Records still at (0,0) were never geocoded
    let located: Vec<_> = playgrounds.into_iter().filter(|p| p.is_geocoded()).collect();
    Ok(ApiJson::ok(nearest(located, reference, NEAREST_LIMIT)))
}

/// Moderation: publishes a draft with its final location data.
pub async fn promote_playground(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<PromotePlaygroundForm>,
) -> Result<impl IntoResponse, ApiError> {
    let (id, promotion) = promotion_from_form(form)?;
    let published = state
        .blocking(move |store| store.promote_playground(id, promotion))
        .await?;

    info!("{} promoted playground {}", user.username(), published.id);
    Ok(ApiJson::accepted(published))
}

fn promotion_from_form(form: PromotePlaygroundForm) -> Result<(i64, Promotion), ApiError> {
    let mut errors = FieldErrors::new();
    let id = form.id.trim().parse::<i64>().unwrap_or_else(|_| {
        errors.add("ID", "must be a playground id");
        0
    });
    let long = form.longitude.trim().parse::<f64>().unwrap_or_else(|_| {
        errors.add("longitude", "must be a number");
        f64::NAN
    });
    let lat = form.latitude.trim().parse::<f64>().unwrap_or_else(|_| {
        errors.add("latitude", "must be a number");
        f64::NAN
    });
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let promotion = Promotion {
        address: form.address,
        postal_code: form.postal_code,
        city: form.city,
        department: form.department,
        long,
        lat,
        coating: form.coating,
        kind: form.kind,
        open: parse_open(form.open.as_deref()),
    };
    Ok((id, promotion))
}

/// A missing checkbox means open.
fn parse_open(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(value) => !matches!(value.trim().to_ascii_lowercase().as_str(), "false" | "off" | "0"),
    }
}
