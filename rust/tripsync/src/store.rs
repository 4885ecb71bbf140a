//! The remote trip store seam.
//!
//! Controllers talk to the backend only through [`TripStore`]. The HTTP
//! implementation lives in [`crate::http`]; tests plug in an in-memory one.

use std::future::Future;

use itinerary::{
    AccessToken, Item, ItemId, ItemPatch, NewItem, ReorderEntry, Trip, TripDraft, TripId,
    TripPatch, User,
};

use crate::error::Result;

/// Remote source of truth for users, trips and items.
pub trait TripStore: Send + Sync {
    /// Exchange credentials for a bearer token.
    fn login(&self, email: &str, password: &str) -> impl Future<Output = Result<AccessToken>> + Send;

    /// The signed-in user with the trips they own.
    fn current_user(&self) -> impl Future<Output = Result<User>> + Send;

    fn list_trips(&self) -> impl Future<Output = Result<Vec<Trip>>> + Send;

    fn create_trip(&self, draft: &TripDraft) -> impl Future<Output = Result<Trip>> + Send;

    fn update_trip(
        &self,
        trip_id: TripId,
        patch: &TripPatch,
    ) -> impl Future<Output = Result<Trip>> + Send;

    /// Deleting a trip deletes its items.
    fn delete_trip(&self, trip_id: TripId) -> impl Future<Output = Result<()>> + Send;

    /// A trip together with all of its items.
    fn get_trip(&self, trip_id: TripId) -> impl Future<Output = Result<Trip>> + Send;

    fn add_item(
        &self,
        trip_id: TripId,
        item: &NewItem,
    ) -> impl Future<Output = Result<Item>> + Send;

    fn update_item(
        &self,
        item_id: ItemId,
        patch: &ItemPatch,
    ) -> impl Future<Output = Result<Item>> + Send;

    fn delete_item(&self, item_id: ItemId) -> impl Future<Output = Result<()>> + Send;

    /// Batch renumbering; `entries` covers every item of one day.
    fn reorder_items(&self, entries: &[ReorderEntry]) -> impl Future<Output = Result<()>> + Send;
}
