//! # Trip board
//!
//! State behind the trip list page: the signed-in user's trips plus the
//! create / rename / delete actions. Every remote failure ends up as a
//! message in [`TripBoard::last_error`]; nothing is retried.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use itinerary::{Trip, TripDraft, TripId, TripPatch};
use log::{info, warn};

use crate::error::{ClientError, Result};
use crate::session::Session;
use crate::store::TripStore;

#[derive(Debug, Default)]
struct BoardState {
    trips: Vec<Trip>,
    error: Option<String>,
}

pub struct TripBoard<S> {
    store: Arc<S>,
    session: Arc<Session>,
    state: Mutex<BoardState>,
}

impl<S: TripStore> TripBoard<S> {
    pub fn new(store: Arc<S>, session: Arc<Session>) -> Self {
        Self {
            store,
            session,
            state: Mutex::new(BoardState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn trips(&self) -> Vec<Trip> {
        self.state().trips.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn clear_error(&self) {
        self.state().error = None;
    }

    fn fail<T>(&self, message: &str, error: ClientError) -> Result<T> {
        warn!("[TripBoard] {}: {}", message, error);
        self.state().error = Some(message.to_string());
        Err(error)
    }

    /// Load the profile and the trips it carries. A failure here usually
    /// means the token is stale, so the session is ended; a 401 has already
    /// left it expired.
    pub async fn load_profile(&self) -> Result<()> {
        self.clear_error();
        match self.store.current_user().await {
            Ok(user) => {
                info!(
                    "[TripBoard] Profile loaded for {} ({} trips)",
                    user.username,
                    user.trips.len()
                );
                self.state().trips = user.trips.clone();
                self.session.set_user(user);
                Ok(())
            }
            Err(e) => {
                if !matches!(e, ClientError::Unauthorized) {
                    self.session.sign_out();
                }
                self.fail("Failed to load your profile (session expired?)", e)
            }
        }
    }

    pub async fn refresh_trips(&self) -> Result<()> {
        match self.store.list_trips().await {
            Ok(trips) => {
                if let Some(mut user) = self.session.user() {
                    user.trips = trips.clone();
                    self.session.set_user(user);
                }
                self.state().trips = trips;
                Ok(())
            }
            Err(e) => self.fail("Failed to load trips", e),
        }
    }

    pub async fn create_trip(&self, draft: TripDraft) -> Result<Trip> {
        let draft = TripDraft {
            title: draft.title.trim().to_string(),
            ..draft
        };
        if let Err(e) = validate_trip(&draft) {
            return self.fail(&e.to_string(), e);
        }
        self.clear_error();

        match self.store.create_trip(&draft).await {
            Ok(trip) => {
                info!("[TripBoard] Created trip {} '{}'", trip.id, trip.title);
                // A failed refresh keeps its own message; the trip exists either way
                let _ = self.refresh_trips().await;
                Ok(trip)
            }
            Err(e) => self.fail("Failed to create trip", e),
        }
    }

    pub async fn rename_trip(&self, trip_id: TripId, title: &str) -> Result<Trip> {
        let title = title.trim();
        if title.is_empty() {
            let e = ClientError::validation("Enter a trip title");
            return self.fail(&e.to_string(), e);
        }
        self.clear_error();

        let patch = TripPatch {
            title: Some(title.to_string()),
            ..TripPatch::default()
        };
        match self.store.update_trip(trip_id, &patch).await {
            Ok(trip) => {
                let _ = self.refresh_trips().await;
                Ok(trip)
            }
            Err(e) => self.fail("Failed to rename trip", e),
        }
    }

    pub async fn delete_trip(&self, trip_id: TripId) -> Result<()> {
        self.clear_error();
        match self.store.delete_trip(trip_id).await {
            Ok(()) => {
                info!("[TripBoard] Deleted trip {}", trip_id);
                let _ = self.refresh_trips().await;
                Ok(())
            }
            Err(e @ ClientError::Unauthorized) => {
                self.fail("Session expired, please sign in again", e)
            }
            Err(e) => self.fail("Failed to delete trip", e),
        }
    }
}

/// Client-side checks before a trip is sent.
fn validate_trip(draft: &TripDraft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(ClientError::validation("Enter a trip title"));
    }
    if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
        if end < start {
            return Err(ClientError::validation(
                "The end date cannot be before the start date",
            ));
        }
    }
    Ok(())
}
