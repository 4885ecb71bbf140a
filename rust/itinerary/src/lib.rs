//! # Itinerary
//!
//! Framework-free core of the trip planner: everything needed to keep the
//! ordered list of places for a day, the map overlay and the remote order in
//! agreement, without doing any I/O.
//!
//! This library provides:
//! - The trip/item wire model shared with the HTTP client
//! - Day partitioning (which items show for the selected day, in which order)
//! - Drag-and-drop reorder planning with full renumbering payloads
//! - Per-day submission sequencing for optimistic reorders
//! - Map projection (markers and connecting path) over the current order
//!
//! ## Quick Start
//!
//! ```rust
//! use itinerary::{DragGesture, Item, MapProjection, items_for_day, plan_reorder};
//!
//! let items = vec![
//!     Item::new(1, 1, 1, "Gyeongbokgung").with_position(37.5796, 126.9770),
//!     Item::new(2, 1, 2, "Bukchon"),
//!     Item::new(3, 1, 3, "N Seoul Tower").with_position(37.5512, 126.9882),
//! ];
//!
//! let day = items_for_day(&items, 1);
//! let plan = plan_reorder(&day, DragGesture::new(2, Some(0)))
//!     .unwrap()
//!     .expect("moving an item is not a no-op");
//!
//! assert_eq!(plan.payload[0].id, 3);
//! assert_eq!(plan.payload[0].order_sequence, 1);
//!
//! let map = MapProjection::from_items(&plan.order);
//! assert_eq!(map.markers.len(), 2);
//! ```

// Unified error handling
pub mod error;
pub use error::{ItineraryError, Result};

// Wire model: trips, items, users and request payloads
pub mod models;
pub use models::{
    AccessToken, Item, ItemId, ItemPatch, LatLng, NewItem, ReorderEntry, Trip, TripDraft,
    TripId, TripPatch, User, UserId,
};

// Items of one day, in display order
pub mod partition;
pub use partition::{items_for_day, next_order_sequence, trip_days};

// Drag-and-drop reorder planning and submission sequencing
pub mod reorder;
pub use reorder::{
    DragGesture, ReorderPlan, ReorderState, SubmissionQueue, apply_renumbering, plan_reorder,
    renumber, reorder,
};

// Markers and path for the map overlay
pub mod projection;
pub use projection::{
    DEFAULT_MAP_CENTER, MapBounds, MapProjection, Marker, ProjectionMemo, last_position,
};
