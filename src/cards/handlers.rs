use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{error::ApiError, state::AppState};

use super::dto::{CardList, CardMessage, StoreCardRequest, UpdateCardRequest};
use super::repo;

pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/storecardData", post(store_card_data))
        .route("/getcardData", get(get_card_data))
        .route("/deleteCardData/:title", delete(delete_card_data))
        .route("/updateCardData/:title", put(update_card_data))
}

#[instrument(skip(state, payload))]
pub async fn store_card_data(
    State(state): State<AppState>,
    Json(payload): Json<StoreCardRequest>,
) -> Result<(StatusCode, Json<CardMessage>), ApiError> {
    let Some(card) = payload.into_new_card() else {
        warn!("card payload missing required fields");
        return Err(ApiError::validation("Missing required fields"));
    };

    let card = match repo::insert(&state.db, &card).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "card insert failed");
            return Err(ApiError::internal("Database error"));
        }
    };

    info!(card_id = %card.id, title = %card.title, "card stored");
    Ok((
        StatusCode::CREATED,
        Json(CardMessage {
            message: "Data inserted successfully",
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_card_data(State(state): State<AppState>) -> Result<Json<CardList>, ApiError> {
    let cards = match repo::list_all(&state.db).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "card listing failed");
            return Err(ApiError::internal("Database error"));
        }
    };

    if cards.is_empty() {
        return Err(ApiError::not_found("No card data found"));
    }

    Ok(Json(CardList {
        message: "Data retrieved successfully",
        data: cards,
    }))
}

#[instrument(skip(state))]
pub async fn delete_card_data(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<CardMessage>, ApiError> {
    let deleted = match repo::delete_by_title(&state.db, &title).await {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, title = %title, "card delete failed");
            return Err(ApiError::internal("Database error"));
        }
    };

    if deleted == 0 {
        warn!(title = %title, "no card to delete");
        return Err(ApiError::not_found("Card not found"));
    }

    info!(title = %title, deleted, "card deleted");
    Ok(Json(CardMessage {
        message: "Card deleted successfully",
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_card_data(
    State(state): State<AppState>,
    Path(title): Path<String>,
    Json(payload): Json<UpdateCardRequest>,
) -> Result<Json<CardMessage>, ApiError> {
    let updated = match repo::update_by_title(
        &state.db,
        &title,
        payload.end_point.as_deref(),
        payload.lat,
        payload.lon,
    )
    .await
    {
        Ok(row) => row,
        Err(e) => {
            error!(error = %e, title = %title, "card update failed");
            return Err(ApiError::internal("Database error"));
        }
    };

    let Some(card) = updated else {
        warn!(title = %title, "no card to update");
        return Err(ApiError::not_found("Card not found"));
    };

    info!(card_id = %card.id, title = %card.title, "card updated");
    Ok(Json(CardMessage {
        message: "Card updated successfully",
    }))
}
