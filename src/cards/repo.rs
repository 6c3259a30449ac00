use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cards::dto::NewCard;

/// Location card tied to a user. `user_id` is a plain reference; the card
/// routes are public and unscoped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub end_point: String,
    pub lat: f64,
    pub lon: f64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub async fn insert(db: &PgPool, card: &NewCard) -> sqlx::Result<Card> {
    sqlx::query_as::<_, Card>(
        r#"
        INSERT INTO user_cards (user_id, title, end_point, lat, lon)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, title, end_point, lat, lon, created_at, updated_at
        "#,
    )
    .bind(card.user_id)
    .bind(&card.title)
    .bind(&card.end_point)
    .bind(card.lat)
    .bind(card.lon)
    .fetch_one(db)
    .await
}

pub async fn list_all(db: &PgPool) -> sqlx::Result<Vec<Card>> {
    sqlx::query_as::<_, Card>(
        r#"
        SELECT id, user_id, title, end_point, lat, lon, created_at, updated_at
        FROM user_cards
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(db)
    .await
}

/// Deletes every card with the given title, returning how many went away.
pub async fn delete_by_title(db: &PgPool, title: &str) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM user_cards WHERE title = $1")
        .bind(title)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// Partial update keyed by title. Returns `None` when no card matched.
pub async fn update_by_title(
    db: &PgPool,
    title: &str,
    end_point: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> sqlx::Result<Option<Card>> {
    sqlx::query_as::<_, Card>(
        r#"
        UPDATE user_cards
        SET end_point = COALESCE($2, end_point),
            lat = COALESCE($3, lat),
            lon = COALESCE($4, lon),
            updated_at = NOW()
        WHERE title = $1
        RETURNING id, user_id, title, end_point, lat, lon, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(end_point)
    .bind(lat)
    .bind(lon)
    .fetch_optional(db)
    .await
}
