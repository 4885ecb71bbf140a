//! In-memory backend shared by the integration tests.
//!
//! Behaves like the real API for the parts the controllers rely on: ids are
//! assigned on insert, deleting a trip drops its items, reorder batches are
//! written through. Failures can be injected per operation, and reorder
//! responses can be held back to exercise overlapping submissions.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use itinerary::{
    AccessToken, Item, ItemId, ItemPatch, NewItem, ReorderEntry, Trip, TripDraft, TripId,
    TripPatch, User, items_for_day,
};
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tripsync::{ClientError, Result, Session, TripStore};

pub const EMAIL: &str = "traveler@example.com";
pub const PASSWORD: &str = "hunter2";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Items of one day by name, in display order.
pub fn names(items: &[Item]) -> Vec<String> {
    items.iter().map(|item| item.place_name.clone()).collect()
}

#[derive(Debug)]
struct Backend {
    user: User,
    trips: Vec<Trip>,
    next_id: i64,
}

impl Backend {
    fn trip_mut(&mut self, trip_id: TripId) -> Result<&mut Trip> {
        self.trips
            .iter_mut()
            .find(|trip| trip.id == trip_id)
            .ok_or_else(|| not_found("Trip not found"))
    }

    fn item_mut(&mut self, item_id: ItemId) -> Result<&mut Item> {
        self.trips
            .iter_mut()
            .flat_map(|trip| trip.items.iter_mut())
            .find(|item| item.id == item_id)
            .ok_or_else(|| not_found("Item not found"))
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn listed(&self) -> Vec<Trip> {
        self.trips
            .iter()
            .map(|trip| Trip {
                items: Vec::new(),
                ..trip.clone()
            })
            .collect()
    }
}

fn not_found(detail: &str) -> ClientError {
    ClientError::Status {
        status: StatusCode::NOT_FOUND,
        detail: Some(detail.to_string()),
    }
}

fn injected() -> ClientError {
    ClientError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        detail: Some("injected failure".to_string()),
    }
}

/// Decrement `counter` if it is positive; true when a failure was due.
fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

pub struct MemoryStore {
    backend: Mutex<Backend>,
    session: Option<Arc<Session>>,

    fail_reorders: AtomicUsize,
    fail_gets: AtomicUsize,
    fail_writes: AtomicUsize,
    fail_profile: AtomicUsize,
    unauthorized: AtomicBool,

    held: AtomicBool,
    gate: Semaphore,
    gets_held: AtomicBool,
    get_gate: Semaphore,

    get_trip_calls: AtomicUsize,
    write_calls: AtomicUsize,
    reorders: Mutex<Vec<Vec<ReorderEntry>>>,
}

impl MemoryStore {
    /// A backend with one user and no trips.
    pub fn new() -> Self {
        Self {
            backend: Mutex::new(Backend {
                user: User {
                    id: 1,
                    email: EMAIL.to_string(),
                    username: "traveler".to_string(),
                    trips: Vec::new(),
                },
                trips: Vec::new(),
                next_id: 100,
            }),
            session: None,
            fail_reorders: AtomicUsize::new(0),
            fail_gets: AtomicUsize::new(0),
            fail_writes: AtomicUsize::new(0),
            fail_profile: AtomicUsize::new(0),
            unauthorized: AtomicBool::new(false),
            held: AtomicBool::new(false),
            gate: Semaphore::new(0),
            gets_held: AtomicBool::new(false),
            get_gate: Semaphore::new(0),
            get_trip_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            reorders: Mutex::new(Vec::new()),
        }
    }

    /// Expire this session on 401, the way the HTTP store does.
    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// One trip (id 1) with day 1 `[P1, P2, P3]` and day 2 `[Q1]`.
    pub fn seeded() -> Self {
        let store = Self::new();
        store.insert_trip(
            Trip::new(1, "Seoul weekend"),
            vec![
                Item::new(1, 1, 1, "P1").with_position(37.5796, 126.9770),
                Item::new(2, 1, 2, "P2").with_position(37.5826, 126.9830),
                Item::new(3, 1, 3, "P3").with_position(37.5512, 126.9882),
                Item::new(4, 2, 1, "Q1").with_position(35.1587, 129.1604),
            ],
        );
        store
    }

    pub fn insert_trip(&self, mut trip: Trip, items: Vec<Item>) {
        trip.owner_id = Some(1);
        trip.items = items
            .into_iter()
            .map(|item| Item {
                trip_id: Some(trip.id),
                ..item
            })
            .collect();
        self.backend().trips.push(trip);
    }

    fn backend(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }

    // ------------------------------------------------------------------
    // Failure injection
    // ------------------------------------------------------------------

    pub fn fail_reorders(&self, n: usize) {
        self.fail_reorders.store(n, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, n: usize) {
        self.fail_gets.store(n, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, n: usize) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    pub fn fail_profile(&self, n: usize) {
        self.fail_profile.store(n, Ordering::SeqCst);
    }

    /// Answer every authenticated call with 401.
    pub fn reject_token(&self) {
        self.unauthorized.store(true, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // Holding reorder responses
    // ------------------------------------------------------------------

    /// Reorder calls are recorded but not answered until released.
    pub fn hold_reorders(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release_reorders(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub async fn wait_for_reorders(&self, n: usize) {
        while self.reorder_calls() < n {
            tokio::task::yield_now().await;
        }
    }

    /// Trip fetches are counted but not answered until released.
    pub fn hold_gets(&self) {
        self.gets_held.store(true, Ordering::SeqCst);
    }

    pub fn release_gets(&self, n: usize) {
        self.get_gate.add_permits(n);
    }

    pub async fn wait_for_get_calls(&self, n: usize) {
        while self.get_trip_calls() < n {
            tokio::task::yield_now().await;
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn get_trip_calls(&self) -> usize {
        self.get_trip_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn reorder_calls(&self) -> usize {
        self.reorders.lock().unwrap().len()
    }

    pub fn reorder_payloads(&self) -> Vec<Vec<ReorderEntry>> {
        self.reorders.lock().unwrap().clone()
    }

    /// Names of one day as the backend has them.
    pub fn remote_day(&self, trip_id: TripId, day: u32) -> Vec<String> {
        let backend = self.backend();
        let trip = backend.trips.iter().find(|trip| trip.id == trip_id);
        trip.map(|trip| names(&items_for_day(&trip.items, day)))
            .unwrap_or_default()
    }

    pub fn trip_count(&self) -> usize {
        self.backend().trips.len()
    }

    fn authorize(&self) -> Result<()> {
        if let Some(session) = &self.session {
            if session.bearer().is_none() {
                return Err(ClientError::NotSignedIn);
            }
        }
        if self.unauthorized.load(Ordering::SeqCst) {
            if let Some(session) = &self.session {
                session.expire();
            }
            return Err(ClientError::Unauthorized);
        }
        Ok(())
    }

    fn write(&self) -> Result<()> {
        self.authorize()?;
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if take(&self.fail_writes) {
            return Err(injected());
        }
        Ok(())
    }
}

impl TripStore for MemoryStore {
    async fn login(&self, email: &str, password: &str) -> Result<AccessToken> {
        let backend = self.backend();
        if email != backend.user.email || password != PASSWORD {
            return Err(ClientError::InvalidCredentials(
                "Incorrect email or password".to_string(),
            ));
        }
        Ok(AccessToken {
            access_token: format!("token-{}", backend.user.id),
            token_type: "bearer".to_string(),
        })
    }

    async fn current_user(&self) -> Result<User> {
        self.authorize()?;
        if take(&self.fail_profile) {
            return Err(injected());
        }
        let backend = self.backend();
        Ok(User {
            trips: backend.listed(),
            ..backend.user.clone()
        })
    }

    async fn list_trips(&self) -> Result<Vec<Trip>> {
        self.authorize()?;
        if take(&self.fail_gets) {
            return Err(injected());
        }
        Ok(self.backend().listed())
    }

    async fn create_trip(&self, draft: &TripDraft) -> Result<Trip> {
        self.write()?;
        let mut backend = self.backend();
        let trip = Trip {
            id: backend.allocate_id(),
            title: draft.title.clone(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            owner_id: Some(backend.user.id),
            items: Vec::new(),
        };
        backend.trips.push(trip.clone());
        Ok(trip)
    }

    async fn update_trip(&self, trip_id: TripId, patch: &TripPatch) -> Result<Trip> {
        self.write()?;
        let mut backend = self.backend();
        let trip = backend.trip_mut(trip_id)?;
        if let Some(title) = &patch.title {
            trip.title = title.clone();
        }
        if patch.start_date.is_some() {
            trip.start_date = patch.start_date;
        }
        if patch.end_date.is_some() {
            trip.end_date = patch.end_date;
        }
        Ok(trip.clone())
    }

    async fn delete_trip(&self, trip_id: TripId) -> Result<()> {
        self.write()?;
        let mut backend = self.backend();
        let before = backend.trips.len();
        backend.trips.retain(|trip| trip.id != trip_id);
        if backend.trips.len() == before {
            return Err(not_found("Trip not found"));
        }
        Ok(())
    }

    async fn get_trip(&self, trip_id: TripId) -> Result<Trip> {
        self.authorize()?;
        self.get_trip_calls.fetch_add(1, Ordering::SeqCst);
        if self.gets_held.load(Ordering::SeqCst) {
            if let Ok(permit) = self.get_gate.acquire().await {
                permit.forget();
            }
        }
        if take(&self.fail_gets) {
            return Err(injected());
        }
        let mut backend = self.backend();
        backend.trip_mut(trip_id).map(|trip| trip.clone())
    }

    async fn add_item(&self, trip_id: TripId, item: &NewItem) -> Result<Item> {
        self.write()?;
        let mut backend = self.backend();
        let id = backend.allocate_id();
        let trip = backend.trip_mut(trip_id)?;
        let created = Item {
            id,
            trip_id: Some(trip_id),
            day: item.day,
            order_sequence: item.order_sequence,
            place_name: item.place_name.clone(),
            address: item.address.clone(),
            memo: item.memo.clone(),
            latitude: item.latitude,
            longitude: item.longitude,
        };
        trip.items.push(created.clone());
        Ok(created)
    }

    async fn update_item(&self, item_id: ItemId, patch: &ItemPatch) -> Result<Item> {
        self.write()?;
        let mut backend = self.backend();
        let item = backend.item_mut(item_id)?;
        if let Some(memo) = &patch.memo {
            item.memo = Some(memo.clone());
        }
        if let Some(day) = patch.day {
            item.day = day;
        }
        Ok(item.clone())
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<()> {
        self.write()?;
        let mut backend = self.backend();
        for trip in &mut backend.trips {
            if let Some(index) = trip.items.iter().position(|item| item.id == item_id) {
                trip.items.remove(index);
                return Ok(());
            }
        }
        Err(not_found("Item not found"))
    }

    async fn reorder_items(&self, entries: &[ReorderEntry]) -> Result<()> {
        self.authorize()?;
        self.reorders.lock().unwrap().push(entries.to_vec());

        if self.held.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        if take(&self.fail_reorders) {
            return Err(injected());
        }
        let mut backend = self.backend();
        for entry in entries {
            backend.item_mut(entry.id)?.order_sequence = entry.order_sequence;
        }
        Ok(())
    }
}
