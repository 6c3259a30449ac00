use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cards::repo::Card;

/// Body for card creation. Every field is optional at the serde level so an
/// absent one maps to the contract's 400 instead of a framework rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCardRequest {
    pub user_id: Option<Uuid>,
    pub title: Option<String>,
    pub end_point: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// The five business fields a card needs, all present.
#[derive(Debug)]
pub struct NewCard {
    pub user_id: Uuid,
    pub title: String,
    pub end_point: String,
    pub lat: f64,
    pub lon: f64,
}

impl StoreCardRequest {
    pub fn into_new_card(self) -> Option<NewCard> {
        Some(NewCard {
            user_id: self.user_id?,
            title: self.title?,
            end_point: self.end_point?,
            lat: self.lat?,
            lon: self.lon?,
        })
    }
}

/// Partial update keyed by title; absent fields keep their current value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    pub end_point: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CardMessage {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CardList {
    pub message: &'static str,
    pub data: Vec<Card>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_body_yields_a_new_card() {
        let req: StoreCardRequest = serde_json::from_str(
            r#"{"userId":"00000000-0000-0000-0000-000000000001",
                "title":"Depot","endPoint":"/depot","lat":52.52,"lon":13.405}"#,
        )
        .unwrap();
        let card = req.into_new_card().expect("all fields present");
        assert_eq!(card.title, "Depot");
        assert_eq!(card.end_point, "/depot");
        assert_eq!(card.lat, 52.52);
    }

    #[test]
    fn any_missing_field_is_rejected() {
        let req: StoreCardRequest = serde_json::from_str(
            r#"{"userId":"00000000-0000-0000-0000-000000000001",
                "title":"Depot","endPoint":"/depot","lat":52.52}"#,
        )
        .unwrap();
        assert!(req.into_new_card().is_none());
    }

    #[test]
    fn update_body_accepts_any_subset() {
        let req: UpdateCardRequest = serde_json::from_str(r#"{"lat":48.86}"#).unwrap();
        assert_eq!(req.lat, Some(48.86));
        assert!(req.end_point.is_none());
        assert!(req.lon.is_none());
    }
}
