//! HTTP client for the trip planner backend.
//!
//! This module provides the [`TripStore`] implementation used in production:
//! - Connection pooling with keepalive for the many small JSON calls a page makes
//! - Bearer authentication read from the shared [`Session`] on every request
//! - Session expiry on any 401 from an authenticated endpoint
//! - FastAPI-style `{"detail": ...}` bodies surfaced in errors
//!
//! There is no retry: a failed call is reported once and the caller decides.

use std::sync::Arc;
use std::time::Instant;

use itinerary::{
    AccessToken, Item, ItemId, ItemPatch, NewItem, ReorderEntry, Trip, TripDraft, TripId,
    TripPatch, User,
};
use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::Session;
use crate::store::TripStore;

/// Helper to calculate elapsed milliseconds from an Instant
#[inline]
fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Remote trip store over the backend's JSON API.
pub struct HttpTripStore {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl HttpTripStore {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout)
            .tcp_keepalive(config.pool_idle_timeout / 2)
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request with the bearer token attached; fails without sending when
    /// nobody is signed in.
    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.session.bearer().ok_or(ClientError::NotSignedIn)?;
        Ok(self.client.request(method, self.url(path)).bearer_auth(token))
    }

    /// Send an authenticated request and check its status.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!("[HttpTripStore] {} failed to send: {}", what, e);
            ClientError::Transport(e)
        })?;

        let status = response.status();
        debug!(
            "[HttpTripStore] {} -> {} ({} ms)",
            what,
            status,
            elapsed_ms(start)
        );

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = status_error(status, &body);
        if matches!(error, ClientError::Unauthorized) {
            self.session.expire();
        }
        warn!("[HttpTripStore] {} rejected: {}", what, error);
        Err(error)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(request, what).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("[HttpTripStore] {} returned malformed JSON: {}", what, e);
            ClientError::Decode(e.to_string())
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authorized(Method::GET, path)?;
        self.json(request, &format!("GET {path}")).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let what = format!("{method} {path}");
        let request = self.authorized(method, path)?.json(body);
        self.json(request, &what).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let request = self.authorized(Method::DELETE, path)?;
        self.send(request, &format!("DELETE {path}")).await?;
        Ok(())
    }
}

impl TripStore for HttpTripStore {
    async fn login(&self, email: &str, password: &str) -> Result<AccessToken> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("[HttpTripStore] Login rejected with {}", status);
            return Err(login_error(status, &body));
        }

        let bytes = response.bytes().await?;
        let token: AccessToken =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))?;
        debug!("[HttpTripStore] Login ok ({} ms)", elapsed_ms(start));
        Ok(token)
    }

    async fn current_user(&self) -> Result<User> {
        self.get("/api/users/me").await
    }

    async fn list_trips(&self) -> Result<Vec<Trip>> {
        self.get("/api/trips").await
    }

    async fn create_trip(&self, draft: &TripDraft) -> Result<Trip> {
        self.send_json(Method::POST, "/api/trips", draft).await
    }

    async fn update_trip(&self, trip_id: TripId, patch: &TripPatch) -> Result<Trip> {
        self.send_json(Method::PUT, &format!("/api/trips/{trip_id}"), patch)
            .await
    }

    async fn delete_trip(&self, trip_id: TripId) -> Result<()> {
        self.delete(&format!("/api/trips/{trip_id}")).await
    }

    async fn get_trip(&self, trip_id: TripId) -> Result<Trip> {
        self.get(&format!("/api/trips/{trip_id}")).await
    }

    async fn add_item(&self, trip_id: TripId, item: &NewItem) -> Result<Item> {
        self.send_json(Method::POST, &format!("/api/trips/{trip_id}/items"), item)
            .await
    }

    async fn update_item(&self, item_id: ItemId, patch: &ItemPatch) -> Result<Item> {
        self.send_json(Method::PUT, &format!("/api/items/{item_id}"), patch)
            .await
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<()> {
        self.delete(&format!("/api/items/{item_id}")).await
    }

    async fn reorder_items(&self, entries: &[ReorderEntry]) -> Result<()> {
        let path = "/api/items/reorder";
        let request = self.authorized(Method::POST, path)?.json(entries);
        self.send(request, &format!("POST {path} ({} items)", entries.len()))
            .await?;
        Ok(())
    }
}

/// The `detail` field of an error body, when there is one.
///
/// FastAPI uses a string for handled errors and a list of objects for
/// request validation errors; the latter is passed through as JSON text.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Error for a non-success status on an authenticated endpoint.
fn status_error(status: StatusCode, body: &str) -> ClientError {
    if status == StatusCode::UNAUTHORIZED {
        return ClientError::Unauthorized;
    }
    ClientError::Status {
        status,
        detail: error_detail(body),
    }
}

/// Error for a non-success status on the login endpoint, where 401 means the
/// credentials were wrong rather than that a session expired.
fn login_error(status: StatusCode, body: &str) -> ClientError {
    let detail = error_detail(body);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
        return ClientError::InvalidCredentials(
            detail.unwrap_or_else(|| "Incorrect email or password".to_string()),
        );
    }
    ClientError::Status { status, detail }
}
