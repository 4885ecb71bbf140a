//! Unified error handling for the itinerary core.
//!
//! Every fallible operation in this crate reports through [`ItineraryError`];
//! callers that must never corrupt state (the reorder engine) log the error
//! and leave their state untouched.

use thiserror::Error;

/// Error type for itinerary operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItineraryError {
    /// A drag source or destination outside the current list
    #[error("index {index} is out of range for a list of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    /// Days are 1-based
    #[error("day {0} is not a valid itinerary day (days start at 1)")]
    InvalidDay(u32),
}

/// Result type alias for itinerary operations.
pub type Result<T> = std::result::Result<T, ItineraryError>;
