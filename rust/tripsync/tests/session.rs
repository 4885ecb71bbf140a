mod common;

use std::sync::Arc;

use tripsync::{ClientError, Session, SessionStatus, TripPlanner, TripStore};

use common::{EMAIL, MemoryStore, PASSWORD, init_logging};

#[tokio::test]
async fn test_sign_in_loads_profile() {
    init_logging();
    let store = MemoryStore::seeded();
    let session = Session::new();

    let user = session.sign_in(&store, EMAIL, PASSWORD).await.unwrap();

    assert_eq!(user.email, EMAIL);
    assert_eq!(user.trips.len(), 1);
    assert_eq!(session.status(), SessionStatus::SignedIn);
    assert_eq!(session.bearer().as_deref(), Some("token-1"));
    assert_eq!(session.user(), Some(user));
}

#[tokio::test]
async fn test_sign_in_rejects_blank_and_wrong_credentials() {
    let store = MemoryStore::seeded();
    let session = Session::new();

    assert!(matches!(
        session.sign_in(&store, "  ", PASSWORD).await,
        Err(ClientError::Validation(_))
    ));
    assert!(matches!(
        session.sign_in(&store, EMAIL, "").await,
        Err(ClientError::Validation(_))
    ));
    assert!(matches!(
        session.sign_in(&store, EMAIL, "wrong").await,
        Err(ClientError::InvalidCredentials(_))
    ));
    assert_eq!(session.status(), SessionStatus::SignedOut);
}

#[tokio::test]
async fn test_failed_profile_after_login_signs_out() {
    let store = MemoryStore::seeded();
    store.fail_profile(1);
    let session = Session::new();

    assert!(session.sign_in(&store, EMAIL, PASSWORD).await.is_err());

    assert_eq!(session.status(), SessionStatus::SignedOut);
    assert_eq!(session.bearer(), None);
    assert_eq!(session.user(), None);
}

#[tokio::test]
async fn test_rejected_profile_after_login_leaves_session_expired() {
    let session = Arc::new(Session::new());
    let store = MemoryStore::seeded().with_session(session.clone());
    store.reject_token();

    let err = session.sign_in(&store, EMAIL, PASSWORD).await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized));
    assert_eq!(session.status(), SessionStatus::Expired);
    assert_eq!(session.bearer(), None);
    assert_eq!(session.user(), None);
}

#[tokio::test]
async fn test_rejected_token_expires_session_once() {
    init_logging();
    let session = Arc::new(Session::new());
    let store = Arc::new(MemoryStore::seeded().with_session(session.clone()));
    session.sign_in(store.as_ref(), EMAIL, PASSWORD).await.unwrap();

    let mut status = session.subscribe();
    assert_eq!(*status.borrow_and_update(), SessionStatus::SignedIn);

    store.reject_token();
    let planner = TripPlanner::new(store.clone(), 1);
    assert!(planner.load().await.unwrap_err().is_unauthorized());
    assert!(store.list_trips().await.is_err());

    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), SessionStatus::Expired);
    assert!(!session.is_signed_in());
    assert_eq!(planner.last_error().as_deref(), Some("Failed to load the trip"));
}

#[tokio::test]
async fn test_sign_in_after_expiry() {
    let session = Arc::new(Session::new());
    let store = MemoryStore::seeded().with_session(session.clone());
    session.sign_in(&store, EMAIL, PASSWORD).await.unwrap();

    session.expire();
    assert_eq!(session.status(), SessionStatus::Expired);

    session.sign_in(&store, EMAIL, PASSWORD).await.unwrap();
    assert_eq!(session.status(), SessionStatus::SignedIn);
}
