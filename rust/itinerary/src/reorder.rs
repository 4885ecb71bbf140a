//! # Optimistic Reorder Engine
//!
//! Turns a drag-and-drop gesture into a new local order plus the full
//! renumbering payload for the remote store, and sequences the resulting
//! submissions per day.
//!
//! ## Lifecycle of a gesture
//!
//! 1. [`plan_reorder`] validates the gesture and computes the new order.
//! 2. The caller shows `plan.order` immediately and hands the plan to the
//!    [`SubmissionQueue`]. If nothing is in flight for that day the payload is
//!    sent right away, otherwise it waits (replacing any older waiting payload).
//! 3. On confirmation the queue releases the next waiting payload, if any.
//! 4. On failure the queue drops the waiting payload and returns the ranks of
//!    the last confirmed order so the caller can roll back before refetching.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::{ItineraryError, Result};
use crate::models::{Item, ItemId, ReorderEntry};

/// A finished drag: where it started and where it was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragGesture {
    pub source: usize,
    /// `None` when the item was dropped outside the list
    pub destination: Option<usize>,
}

impl DragGesture {
    pub fn new(source: usize, destination: Option<usize>) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Move the element at `source` to `destination`.
///
/// Both indices must address an existing element. `source == destination`
/// yields an unchanged copy.
pub fn reorder(current: &[Item], source: usize, destination: usize) -> Result<Vec<Item>> {
    let len = current.len();
    for index in [source, destination] {
        if index >= len {
            return Err(ItineraryError::IndexOutOfRange { index, len });
        }
    }

    let mut order = current.to_vec();
    if source != destination {
        let moved = order.remove(source);
        order.insert(destination, moved);
    }
    Ok(order)
}

/// Full 1-based renumbering of `order`.
pub fn renumber(order: &[Item]) -> Vec<ReorderEntry> {
    order
        .iter()
        .enumerate()
        .map(|(index, item)| ReorderEntry {
            id: item.id,
            order_sequence: (index + 1) as u32,
        })
        .collect()
}

/// Write ranks from `entries` into the matching items. Returns how many
/// items were updated.
pub fn apply_renumbering(items: &mut [Item], entries: &[ReorderEntry]) -> usize {
    let ranks: HashMap<ItemId, u32> = entries
        .iter()
        .map(|entry| (entry.id, entry.order_sequence))
        .collect();

    let mut updated = 0;
    for item in items.iter_mut() {
        if let Some(&rank) = ranks.get(&item.id) {
            item.order_sequence = rank;
            updated += 1;
        }
    }
    updated
}

/// Everything needed to apply one gesture optimistically and submit it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderPlan {
    pub day: u32,
    /// The day's items in their new order
    pub order: Vec<Item>,
    /// Renumbering of every item of the day, in new order
    pub payload: Vec<ReorderEntry>,
    /// Ranks the day had before the move
    pub snapshot: Vec<ReorderEntry>,
}

/// Plan a gesture against the current order of one day.
///
/// Returns `Ok(None)` for gestures that change nothing (dropped outside the
/// list, or dropped where it started) and an error for indices that do not
/// address the list.
pub fn plan_reorder(current: &[Item], gesture: DragGesture) -> Result<Option<ReorderPlan>> {
    let Some(destination) = gesture.destination else {
        return Ok(None);
    };

    let order = reorder(current, gesture.source, destination)?;
    if gesture.source == destination {
        return Ok(None);
    }

    Ok(Some(ReorderPlan {
        day: current[gesture.source].day,
        payload: renumber(&order),
        snapshot: current
            .iter()
            .map(|item| ReorderEntry {
                id: item.id,
                order_sequence: item.order_sequence,
            })
            .collect(),
        order,
    }))
}

// ============================================================================
// Reorder state machine
// ============================================================================

/// Two-phase state of an optimistic reorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderState {
    /// Shown locally, not yet confirmed by the remote store
    Pending { guess: Vec<ItemId> },
    /// The remote store accepted the order
    Confirmed,
    /// The remote store rejected it; the refetched order replaced the guess
    RolledBack { authoritative: Vec<ItemId> },
}

impl ReorderState {
    pub fn pending(order: &[Item]) -> Self {
        ReorderState::Pending {
            guess: order.iter().map(|item| item.id).collect(),
        }
    }

    /// `Pending -> Confirmed`. Settled states are left as they are.
    pub fn confirm(self) -> Self {
        match self {
            ReorderState::Pending { .. } => ReorderState::Confirmed,
            settled => settled,
        }
    }

    /// `Pending -> RolledBack`. Settled states are left as they are.
    pub fn roll_back(self, authoritative: &[Item]) -> Self {
        match self {
            ReorderState::Pending { .. } => ReorderState::RolledBack {
                authoritative: authoritative.iter().map(|item| item.id).collect(),
            },
            settled => settled,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ReorderState::Pending { .. })
    }
}

// ============================================================================
// Submission sequencing
// ============================================================================

#[derive(Debug)]
struct DaySubmissions {
    in_flight: Vec<ReorderEntry>,
    waiting: Option<Vec<ReorderEntry>>,
    /// Ranks last accepted by the remote store
    confirmed: Vec<ReorderEntry>,
}

/// At most one reorder submission in flight per day; later gestures wait and
/// only the most recent waiting payload is ever sent.
#[derive(Debug, Default)]
pub struct SubmissionQueue {
    days: HashMap<u32, DaySubmissions>,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a planned gesture. Returns the payload to send now, or `None`
    /// when a submission for the same day is already in flight.
    pub fn enqueue(&mut self, plan: &ReorderPlan) -> Option<Vec<ReorderEntry>> {
        match self.days.entry(plan.day) {
            Entry::Occupied(mut entry) => {
                let waiting = &mut entry.get_mut().waiting;
                if waiting.is_some() {
                    log::debug!(
                        "[SubmissionQueue] Day {}: superseding a waiting payload",
                        plan.day
                    );
                }
                *waiting = Some(plan.payload.clone());
                None
            }
            Entry::Vacant(entry) => {
                entry.insert(DaySubmissions {
                    in_flight: plan.payload.clone(),
                    waiting: None,
                    confirmed: plan.snapshot.clone(),
                });
                Some(plan.payload.clone())
            }
        }
    }

    /// The in-flight submission for `day` was accepted. Returns the next
    /// payload to send, if one is waiting.
    pub fn confirm(&mut self, day: u32) -> Option<Vec<ReorderEntry>> {
        let entry = self.days.get_mut(&day)?;
        entry.confirmed = std::mem::take(&mut entry.in_flight);

        match entry.waiting.take() {
            Some(next) => {
                entry.in_flight = next.clone();
                Some(next)
            }
            None => {
                self.days.remove(&day);
                None
            }
        }
    }

    /// The in-flight submission for `day` was rejected. Drops anything
    /// waiting and returns the ranks of the last confirmed order.
    pub fn fail(&mut self, day: u32) -> Option<Vec<ReorderEntry>> {
        self.days.remove(&day).map(|entry| entry.confirmed)
    }

    /// Latest payload not yet confirmed for every busy day: the waiting one
    /// if there is one, otherwise the one in flight.
    pub fn pending_payloads(&self) -> impl Iterator<Item = &[ReorderEntry]> + '_ {
        self.days
            .values()
            .map(|entry| entry.waiting.as_deref().unwrap_or(&entry.in_flight))
    }

    pub fn is_in_flight(&self, day: u32) -> bool {
        self.days.contains_key(&day)
    }

    pub fn is_idle(&self) -> bool {
        self.days.is_empty()
    }

    /// Forget all bookkeeping, e.g. after the authoritative state was refetched.
    pub fn clear(&mut self) {
        self.days.clear();
    }
}
