use axum::{extract::State, routing::get, Json, Router};
use tracing::{error, info, instrument};

use crate::{
    auth::jwt::AuthUser,
    cards::{
        dto::{QrCodeResponse, UpsertCardRequest},
        repo::BusinessCard,
    },
    error::ApiError,
    state::AppState,
    users::dto::MessageResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/business-cards",
            get(get_card).post(upsert_card).delete(delete_card),
        )
        .route("/business-cards/qr-code", get(get_qr_code))
}

#[instrument(skip(state))]
pub async fn get_card(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<BusinessCard>, ApiError> {
    let card = state
        .cards
        .find_by_user(user_id)
        .await?
        .ok_or(ApiError::NotFound("Business card"))?;
    Ok(Json(card))
}

/// Create-or-update, then unconditionally re-derive and persist the QR
/// artifact from the resulting record.
#[instrument(skip(state, payload))]
pub async fn upsert_card(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpsertCardRequest>,
) -> Result<Json<BusinessCard>, ApiError> {
    let card = if state.cards.find_by_user(user_id).await?.is_some() {
        state
            .cards
            .update(user_id, payload.into_patch())
            .await?
            .ok_or(ApiError::NotFound("Business card"))?
    } else {
        state.cards.create(user_id, payload.into_new()).await?
    };

    let artifact = state.qr.render(card.id).map_err(|e| {
        error!(error = %e, card_id = card.id, "qr render failed");
        ApiError::Dependency("QR renderer")
    })?;
    let card = state
        .cards
        .update_qr_code(user_id, &artifact)
        .await?
        .ok_or(ApiError::NotFound("Business card"))?;

    info!(user_id, card_id = card.id, "business card upserted");
    Ok(Json(card))
}

/// Regenerates a fresh artifact from the stored card; equivalent content to
/// the persisted one since both encode the same card page.
#[instrument(skip(state))]
pub async fn get_qr_code(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<QrCodeResponse>, ApiError> {
    let card = state
        .cards
        .find_by_user(user_id)
        .await?
        .ok_or(ApiError::NotFound("Business card"))?;

    let qr_code = state.qr.render(card.id).map_err(|e| {
        error!(error = %e, card_id = card.id, "qr render failed");
        ApiError::Dependency("QR renderer")
    })?;
    Ok(Json(QrCodeResponse { qr_code }))
}

#[instrument(skip(state))]
pub async fn delete_card(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.cards.delete(user_id).await? {
        return Err(ApiError::NotFound("Business card"));
    }
    info!(user_id, "business card deleted");
    Ok(Json(MessageResponse {
        message: "Business card deleted successfully".into(),
    }))
}
