//! # Tripsync
//!
//! Client side of the trip planner: the session, the remote trip store and
//! the two page controllers built on the [`itinerary`] core.
//!
//! - [`Session`]: bearer token and signed-in user, shared as `Arc<Session>`
//! - [`TripStore`]: async seam to the backend, with [`HttpTripStore`] over reqwest
//! - [`TripBoard`]: the trip list (create, rename, delete)
//! - [`TripPlanner`]: one trip's days, places, map overlay and optimistic reorders
//!
//! ## Wiring
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tripsync::{ClientConfig, HttpTripStore, Session, TripPlanner};
//! use itinerary::DragGesture;
//!
//! # async fn run() -> tripsync::Result<()> {
//! let session = Arc::new(Session::new());
//! let store = Arc::new(HttpTripStore::new(&ClientConfig::from_env(), session.clone())?);
//!
//! session.sign_in(store.as_ref(), "me@example.com", "secret").await?;
//!
//! let planner = TripPlanner::new(store, 7);
//! planner.load().await?;
//! planner.reorder(DragGesture::new(2, Some(0))).await;
//! println!("{} markers on day 1", planner.projection().markers.len());
//! # Ok(())
//! # }
//! ```

// Configuration
pub mod config;
pub use config::ClientConfig;

// Unified error handling
pub mod error;
pub use error::{ClientError, Result};

// Authentication context
pub mod session;
pub use session::{Session, SessionStatus};

// Remote store seam and its HTTP implementation
pub mod store;
pub use store::TripStore;

pub mod http;
pub use http::HttpTripStore;

// Page controllers
pub mod board;
pub use board::TripBoard;

pub mod planner;
pub use planner::{PlaceSelection, ReorderOutcome, TripPlanner};
