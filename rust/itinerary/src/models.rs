//! Wire model for trips, items and users.
//!
//! Field names follow the backend's JSON (snake_case). Optional request
//! fields are omitted from the body when absent so that `PUT` bodies stay
//! partial updates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type ItemId = i64;
pub type TripId = i64;
pub type UserId = i64;

// ============================================================================
// Coordinates
// ============================================================================

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has usable coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

// ============================================================================
// Items
// ============================================================================

/// One scheduled stop within a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
    /// Itinerary day, starting at 1
    pub day: u32,
    /// 1-based rank within the day
    pub order_sequence: u32,
    pub place_name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Item {
    /// Create an item without address, memo or coordinates.
    pub fn new(id: ItemId, day: u32, order_sequence: u32, place_name: impl Into<String>) -> Self {
        Self {
            id,
            trip_id: None,
            day,
            order_sequence,
            place_name: place_name.into(),
            address: None,
            memo: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_position(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Coordinates of the place, only when both halves are known.
    pub fn position(&self) -> Option<LatLng> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        }
    }

    /// Text shown under the place name: the memo, falling back to the address.
    pub fn subtitle(&self) -> Option<&str> {
        self.memo
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(self.address.as_deref())
    }
}

// ============================================================================
// Trips and users
// ============================================================================

/// A named date range owning a set of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub title: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    /// Empty when the payload comes from a trip listing
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Trip {
    pub fn new(id: TripId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            start_date: None,
            end_date: None,
            owner_id: None,
            items: Vec::new(),
        }
    }

    pub fn item(&self, item_id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

/// The signed-in user together with the trips they own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub trips: Vec<Trip>,
}

/// Response of the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// ============================================================================
// Request payloads
// ============================================================================

/// Body of `POST /api/trips`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDraft {
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TripDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }
}

/// Body of `PUT /api/trips/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Body of `POST /api/trips/{id}/items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub day: u32,
    pub place_name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub memo: Option<String>,
    pub order_sequence: u32,
}

/// Body of `PUT /api/items/{id}`: memo and/or day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl ItemPatch {
    pub fn memo(memo: impl Into<String>) -> Self {
        Self {
            memo: Some(memo.into()),
            day: None,
        }
    }

    pub fn day(day: u32) -> Self {
        Self {
            memo: None,
            day: Some(day),
        }
    }
}

/// One element of the batch body of `POST /api/items/reorder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReorderEntry {
    pub id: ItemId,
    pub order_sequence: u32,
}
