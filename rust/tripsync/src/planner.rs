//! # Trip planner
//!
//! Page-scoped state for one trip: the cached trip with its items, the
//! selected day, the map center, and the optimistic reorder machinery that
//! keeps the day list, the map overlay and the remote order in agreement.
//!
//! ## Consistency model
//!
//! - The list and the map are derived from the cached items on demand; the
//!   map projection is memoized on the cache revision.
//! - A drag is applied to the cache at once, then submitted. Submissions are
//!   sequenced per day through a [`SubmissionQueue`]: one in flight, and only
//!   the latest waiting payload is sent after it.
//! - A rejected submission restores the last confirmed order and refetches
//!   the trip; the fetched trip replaces the cache wholesale.
//! - After [`TripPlanner::detach`] late responses are dropped silently.
//!
//! The state lives behind a `std::sync::Mutex` that is never held across an
//! await, so a planner can be shared through an `Arc` between tasks.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use itinerary::{
    DEFAULT_MAP_CENTER, DragGesture, Item, ItemId, ItemPatch, ItineraryError, LatLng,
    MapProjection, NewItem, ProjectionMemo, ReorderEntry, ReorderPlan, ReorderState,
    SubmissionQueue, Trip, TripId, apply_renumbering, items_for_day, last_position,
    next_order_sequence, plan_reorder, trip_days,
};
use log::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::store::TripStore;

/// What became of a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Dropped outside the list or where it started; nothing sent
    Unchanged,
    /// Indices did not address the list; state untouched
    Ignored,
    /// Applied locally; will be sent after the submission in flight
    Queued,
    /// Applied locally and accepted by the remote store
    Confirmed,
    /// Rejected by the remote store; the trip was refetched
    RolledBack,
    /// The page went away before the answer arrived
    Detached,
}

/// A place picked from the search box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceSelection {
    pub name: Option<String>,
    pub address: Option<String>,
    pub position: Option<LatLng>,
}

impl PlaceSelection {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: Some(name.into()),
            address: None,
            position: Some(LatLng::new(latitude, longitude)),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

const UNNAMED_PLACE: &str = "Unnamed place";

fn trip_items(trip: &Option<Trip>) -> &[Item] {
    match trip {
        Some(trip) => &trip.items,
        None => &[],
    }
}

/// Next step after a reorder submission settles.
enum SubmissionStep {
    Send(Vec<ReorderEntry>),
    Done(ReorderOutcome),
    /// Refetch; carries the gesture to mark rolled back, if it is still the latest
    Reload(Option<u64>),
}

/// The most recent drag, numbered so a late settlement cannot touch a newer one.
#[derive(Debug)]
struct LastReorder {
    day: u32,
    generation: u64,
    state: ReorderState,
}

#[derive(Debug)]
struct PlannerState {
    trip: Option<Trip>,
    selected_day: u32,
    /// Bumped whenever the cached items or the selected day change
    revision: u64,
    projection: ProjectionMemo,
    map_center: LatLng,
    submissions: SubmissionQueue,
    gestures: u64,
    last_reorder: Option<LastReorder>,
    loading: bool,
    error: Option<String>,
    attached: bool,
}

impl PlannerState {
    fn new() -> Self {
        Self {
            trip: None,
            selected_day: 1,
            revision: 0,
            projection: ProjectionMemo::new(),
            map_center: DEFAULT_MAP_CENTER,
            submissions: SubmissionQueue::new(),
            gestures: 0,
            last_reorder: None,
            loading: false,
            error: None,
            attached: true,
        }
    }

    fn items(&self) -> &[Item] {
        trip_items(&self.trip)
    }

    fn day_items(&self) -> Vec<Item> {
        items_for_day(self.items(), self.selected_day)
    }

    fn items_mut(&mut self) -> &mut [Item] {
        match self.trip.as_mut() {
            Some(trip) => &mut trip.items,
            None => &mut [],
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Install a fetched trip. Reorders that are still unconfirmed for other
    /// days are laid over it so the user keeps seeing what they dragged.
    fn replace_trip(&mut self, mut trip: Trip) {
        for payload in self.submissions.pending_payloads() {
            apply_renumbering(&mut trip.items, payload);
        }
        if let Some(center) = last_position(&trip.items) {
            self.map_center = center;
        }
        self.trip = Some(trip);
        self.touch();
    }

    fn apply_plan(&mut self, plan: &ReorderPlan) {
        apply_renumbering(self.items_mut(), &plan.payload);
        self.gestures += 1;
        self.last_reorder = Some(LastReorder {
            day: plan.day,
            generation: self.gestures,
            state: ReorderState::pending(&plan.order),
        });
        self.touch();
    }

    /// Move the latest drag on, provided it is the one `is_target` names.
    fn settle_last_reorder(
        &mut self,
        is_target: impl FnOnce(&LastReorder) -> bool,
        settle: impl FnOnce(ReorderState) -> ReorderState,
    ) {
        if let Some(mut last) = self.last_reorder.take() {
            if is_target(&last) {
                last.state = settle(last.state);
            }
            self.last_reorder = Some(last);
        }
    }

    fn settle_submission(&mut self, day: u32, result: Result<()>) -> SubmissionStep {
        if !self.attached {
            debug!("[TripPlanner] Reorder answer for day {} after detach, ignoring", day);
            return SubmissionStep::Done(ReorderOutcome::Detached);
        }

        match result {
            Ok(()) => match self.submissions.confirm(day) {
                Some(next) => {
                    debug!("[TripPlanner] Day {}: sending the latest queued order", day);
                    SubmissionStep::Send(next)
                }
                None => {
                    // Nothing waits behind it: the latest drag on this day is what landed
                    self.settle_last_reorder(|last| last.day == day, ReorderState::confirm);
                    SubmissionStep::Done(ReorderOutcome::Confirmed)
                }
            },
            Err(e) => {
                warn!("[TripPlanner] Reorder of day {} rejected: {}", day, e);
                if let Some(confirmed) = self.submissions.fail(day) {
                    apply_renumbering(self.items_mut(), &confirmed);
                    self.touch();
                }
                self.error = Some("Failed to reorder items; reloading the trip".to_string());
                let rejected = self
                    .last_reorder
                    .as_ref()
                    .filter(|last| last.day == day)
                    .map(|last| last.generation);
                SubmissionStep::Reload(rejected)
            }
        }
    }
}

/// Controller behind the trip detail page.
pub struct TripPlanner<S> {
    store: Arc<S>,
    trip_id: TripId,
    state: Mutex<PlannerState>,
}

impl<S: TripStore> TripPlanner<S> {
    /// A planner for `trip_id`; call [`load`](Self::load) to fill it.
    pub fn new(store: Arc<S>, trip_id: TripId) -> Self {
        Self {
            store,
            trip_id,
            state: Mutex::new(PlannerState::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, PlannerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Read side
    // ========================================================================

    pub fn trip_id(&self) -> TripId {
        self.trip_id
    }

    pub fn trip(&self) -> Option<Trip> {
        self.state().trip.clone()
    }

    pub fn selected_day(&self) -> u32 {
        self.state().selected_day
    }

    /// Days offered in the day picker.
    pub fn days(&self) -> Vec<u32> {
        let state = self.state();
        trip_days(state.items(), state.selected_day)
    }

    /// Items of the selected day, in display order.
    pub fn day_items(&self) -> Vec<Item> {
        self.state().day_items()
    }

    /// Markers and path for the selected day.
    pub fn projection(&self) -> MapProjection {
        let mut guard = self.state();
        let state = &mut *guard;
        let (trip, day) = (&state.trip, state.selected_day);
        state
            .projection
            .project_with(state.revision, || items_for_day(trip_items(trip), day))
            .clone()
    }

    pub fn map_center(&self) -> LatLng {
        self.state().map_center
    }

    pub fn revision(&self) -> u64 {
        self.state().revision
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn clear_error(&self) {
        self.state().error = None;
    }

    /// State of the most recent drag.
    pub fn reorder_state(&self) -> Option<ReorderState> {
        self.state().last_reorder.as_ref().map(|last| last.state.clone())
    }

    /// Whether any reorder submission is still unsettled.
    pub fn has_pending_reorders(&self) -> bool {
        !self.state().submissions.is_idle()
    }

    // ========================================================================
    // View actions
    // ========================================================================

    pub fn select_day(&self, day: u32) -> Result<()> {
        if day == 0 {
            warn!("[TripPlanner] Ignoring selection of day 0");
            return Err(ItineraryError::InvalidDay(day).into());
        }
        let mut state = self.state();
        if state.selected_day != day {
            state.selected_day = day;
            state.touch();
        }
        Ok(())
    }

    /// Center the map on an item; items without coordinates leave it alone.
    pub fn focus_item(&self, item_id: ItemId) -> Option<LatLng> {
        let mut state = self.state();
        let position = state
            .items()
            .iter()
            .find(|item| item.id == item_id)
            .and_then(Item::position)?;
        state.map_center = position;
        Some(position)
    }

    /// The page is gone: answers that arrive from now on are ignored.
    pub fn detach(&self) {
        self.state().attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.state().attached
    }

    // ========================================================================
    // Remote actions
    // ========================================================================

    /// Fetch the trip and replace the cache with it.
    pub async fn load(&self) -> Result<()> {
        self.fetch().await.map(|_| ())
    }

    /// Like [`load`](Self::load), also handing back the trip exactly as the
    /// store sent it. `None` once detached.
    async fn fetch(&self) -> Result<Option<Trip>> {
        {
            let mut state = self.state();
            if !state.attached {
                return Ok(None);
            }
            state.loading = true;
        }

        let result = self.store.get_trip(self.trip_id).await;

        let mut state = self.state();
        state.loading = false;
        if !state.attached {
            debug!("[TripPlanner] Trip {} arrived after detach, ignoring", self.trip_id);
            return Ok(None);
        }

        match result {
            Ok(trip) => {
                debug!(
                    "[TripPlanner] Loaded trip {} with {} items",
                    trip.id,
                    trip.items.len()
                );
                state.replace_trip(trip.clone());
                Ok(Some(trip))
            }
            Err(e) => {
                warn!("[TripPlanner] Loading trip {} failed: {}", self.trip_id, e);
                state.error = Some("Failed to load the trip".to_string());
                Err(e)
            }
        }
    }

    /// Apply a drag gesture to the selected day and reconcile it with the
    /// remote store.
    ///
    /// The new order is visible before this future first yields. The future
    /// completes once the submission it started (and any later gestures
    /// queued behind it) has settled.
    pub async fn reorder(&self, gesture: DragGesture) -> ReorderOutcome {
        let (day, mut payload) = {
            let mut state = self.state();
            if !state.attached {
                return ReorderOutcome::Detached;
            }

            let plan = match plan_reorder(&state.day_items(), gesture) {
                Ok(Some(plan)) => plan,
                Ok(None) => return ReorderOutcome::Unchanged,
                Err(e) => {
                    warn!("[TripPlanner] Ignoring drag {:?}: {}", gesture, e);
                    return ReorderOutcome::Ignored;
                }
            };

            state.apply_plan(&plan);
            match state.submissions.enqueue(&plan) {
                Some(payload) => (plan.day, payload),
                None => {
                    debug!(
                        "[TripPlanner] Day {} has a reorder in flight, queued",
                        plan.day
                    );
                    return ReorderOutcome::Queued;
                }
            }
        };

        loop {
            let result = self.store.reorder_items(&payload).await;
            let step = self.state().settle_submission(day, result);

            match step {
                SubmissionStep::Send(next) => payload = next,
                SubmissionStep::Done(outcome) => return outcome,
                SubmissionStep::Reload(rejected) => {
                    // A failed reload keeps its own message; the confirmed
                    // order restored above stays on screen meanwhile
                    let fetched = self.fetch().await;

                    let mut state = self.state();
                    if !state.attached {
                        return ReorderOutcome::Detached;
                    }
                    if let Some(generation) = rejected {
                        let authoritative = match &fetched {
                            Ok(Some(trip)) => items_for_day(&trip.items, day),
                            _ => items_for_day(state.items(), day),
                        };
                        state.settle_last_reorder(
                            |last| last.generation == generation,
                            |s| s.roll_back(&authoritative),
                        );
                    }
                    return ReorderOutcome::RolledBack;
                }
            }
        }
    }

    /// Add a searched place to `day`, appended after the day's last item.
    pub async fn add_place(&self, place: PlaceSelection, day: u32, memo: &str) -> Result<Item> {
        let new_item = {
            let mut state = self.state();
            let built = build_new_item(state.items(), place, day, memo);
            match built {
                Ok(item) => item,
                Err(e) => {
                    state.error = Some(e.to_string());
                    return Err(e);
                }
            }
        };
        self.clear_error();

        info!(
            "[TripPlanner] Adding '{}' to day {} of trip {}",
            new_item.place_name, day, self.trip_id
        );
        self.mutate(
            self.store.add_item(self.trip_id, &new_item),
            "Failed to add the place",
        )
        .await
    }

    /// Replace an item's memo; an empty memo clears it.
    pub async fn update_memo(&self, item_id: ItemId, memo: &str) -> Result<Item> {
        self.clear_error();
        let patch = ItemPatch::memo(memo.trim());
        self.mutate(
            self.store.update_item(item_id, &patch),
            "Failed to update the memo",
        )
        .await
    }

    /// Move an item to another day.
    pub async fn move_to_day(&self, item_id: ItemId, day: u32) -> Result<Item> {
        if day == 0 {
            let e = ClientError::validation("Days start at 1");
            self.state().error = Some(e.to_string());
            return Err(e);
        }
        self.clear_error();
        let patch = ItemPatch::day(day);
        self.mutate(
            self.store.update_item(item_id, &patch),
            "Failed to move the place",
        )
        .await
    }

    pub async fn delete_item(&self, item_id: ItemId) -> Result<()> {
        self.clear_error();
        self.mutate(self.store.delete_item(item_id), "Failed to delete the place")
            .await
    }

    /// Run a write, then refetch so the cache matches the remote store.
    async fn mutate<T>(&self, call: impl Future<Output = Result<T>>, failure: &str) -> Result<T> {
        match call.await {
            Ok(value) => {
                let _ = self.load().await;
                Ok(value)
            }
            Err(e) => {
                warn!("[TripPlanner] {}: {}", failure, e);
                let mut state = self.state();
                if state.attached {
                    state.error = Some(failure.to_string());
                }
                Err(e)
            }
        }
    }
}

/// Validate a search result and turn it into the add-item body.
fn build_new_item(items: &[Item], place: PlaceSelection, day: u32, memo: &str) -> Result<NewItem> {
    let position = place
        .position
        .filter(LatLng::is_valid)
        .ok_or_else(|| ClientError::validation("Select a place from the search results"))?;
    if day == 0 {
        return Err(ClientError::validation("Days start at 1"));
    }

    let place_name = place
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNNAMED_PLACE.to_string());
    let memo = memo.trim();

    Ok(NewItem {
        day,
        place_name,
        address: place.address,
        latitude: Some(position.latitude),
        longitude: Some(position.longitude),
        memo: (!memo.is_empty()).then(|| memo.to_string()),
        order_sequence: next_order_sequence(items, day),
    })
}
