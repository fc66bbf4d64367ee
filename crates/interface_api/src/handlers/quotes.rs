//! Quote handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use validator::Validate;

use core_kernel::QuoteId;
use domain_quote::QuoteSnapshot;

use crate::auth::{authorize, permissions, Claims};
use crate::dto::quote::*;
use crate::{error::ApiError, AppState};

fn parse_id(id: &str) -> Result<QuoteId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid quote id: {}", id)))
}

/// Lists quotes, newest first
pub async fn list_quotes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuotesQuery>,
) -> Result<Json<QuoteListResponse>, ApiError> {
    authorize(&claims, permissions::QUOTE_READ)?;
    let quotes = state.service.list_quotes(query.into_filter()?).await?;
    Ok(Json(quotes.into()))
}

/// Creates a draft quote
pub async fn create_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<QuoteSnapshot>), ApiError> {
    authorize(&claims, permissions::QUOTE_WRITE)?;
    request.validate()?;

    let snapshot = state
        .service
        .create_quote(request.into_domain()?, claims.user_id())
        .await?;

    info!(quote_id = %snapshot.id, user = %claims.sub, "Quote created via API");
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Gets a quote with its covers and modifiers
pub async fn get_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QuoteSnapshot>, ApiError> {
    authorize(&claims, permissions::QUOTE_READ)?;
    Ok(Json(state.service.get_quote(parse_id(&id)?).await?))
}

/// Edits a draft quote
pub async fn update_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(request): Json<UpdateQuoteRequest>,
) -> Result<Json<QuoteSnapshot>, ApiError> {
    authorize(&claims, permissions::QUOTE_WRITE)?;
    request.validate()?;
    let snapshot = state
        .service
        .update_quote(parse_id(&id)?, request.into_domain()?)
        .await?;
    Ok(Json(snapshot))
}

/// Recalculates the quote premium
pub async fn calculate_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QuoteSnapshot>, ApiError> {
    authorize(&claims, permissions::QUOTE_WRITE)?;
    Ok(Json(state.service.calculate(parse_id(&id)?).await?))
}

/// Submits a draft quote
pub async fn submit_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QuoteSnapshot>, ApiError> {
    authorize(&claims, permissions::QUOTE_WRITE)?;
    Ok(Json(state.service.submit(parse_id(&id)?).await?))
}

/// Sends a submitted quote back to draft
pub async fn revise_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QuoteSnapshot>, ApiError> {
    authorize(&claims, permissions::QUOTE_WRITE)?;
    Ok(Json(state.service.revise(parse_id(&id)?).await?))
}

/// Binds a submitted quote
pub async fn bind_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QuoteSnapshot>, ApiError> {
    authorize(&claims, permissions::QUOTE_BIND)?;
    Ok(Json(state.service.bind(parse_id(&id)?).await?))
}

/// Reopens a bound quote as a draft
pub async fn revise_binding(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QuoteSnapshot>, ApiError> {
    authorize(&claims, permissions::QUOTE_BIND)?;
    Ok(Json(state.service.revise_binding(parse_id(&id)?).await?))
}
