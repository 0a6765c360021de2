/*
[INPUT]:  Mock venue and session configurations
[OUTPUT]: Test results for the session lifecycle
[POS]:    Integration tests - session manager
[UPDATE]: When lifecycle transitions or cleanup guarantees change
*/

mod common;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::MockVenue;
use futures_util::FutureExt;
use tokio_test::{assert_err, assert_ok};
use xapi_adapter::{
    ClientConfig, Credentials, ReconnectPolicy, SessionConfig, SessionManager, SessionState,
    XapiError,
};

#[tokio::test]
async fn test_login_and_close() {
    let venue = MockVenue::standard().await;
    let manager = SessionManager::new(venue.session_config());

    let handle = assert_ok!(manager.connect().await);
    assert_eq!(manager.state(), SessionState::Ready);
    assert_eq!(handle.session().stream_session_id(), "sid-1");
    assert_eq!(handle.session().account_id(), common::ACCOUNT_ID);
    assert_ok!(handle.ensure_ready());

    let login = venue.wait_for("login", 1).await;
    assert_eq!(login.path, "/demo");
    assert!(login.command.get("streamSessionId").is_none());

    handle.close().await;
    handle.close().await;
    assert_eq!(manager.state(), SessionState::Disconnected);
    assert_eq!(venue.seen_named("logout").len(), 1);
    assert!(handle.socket().connection().is_closed());
    assert!(handle.stream().connection().is_closed());
    assert!(matches!(handle.ensure_ready(), Err(XapiError::NotConnected)));
}

#[tokio::test]
async fn test_rejected_login_fails_session() {
    let venue = MockVenue::standard().await;
    let config = SessionConfig::new(Credentials::new(common::ACCOUNT_ID, "wrong"))
        .with_endpoint(venue.endpoint());
    let manager = SessionManager::new(config);

    let err = assert_err!(manager.connect().await);
    assert!(err.is_auth_error());
    assert!(!err.is_retryable());
    let XapiError::LoginFailed { code, .. } = err else {
        panic!("expected login failure");
    };
    assert_eq!(code.as_deref(), Some("BE005"));
    assert_eq!(manager.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_retry_does_not_retry_rejected_login() {
    let venue = MockVenue::standard().await;
    let config = SessionConfig::new(Credentials::new(common::ACCOUNT_ID, "wrong"))
        .with_endpoint(venue.endpoint());
    let manager = SessionManager::new(config);

    let err = assert_err!(
        manager
            .connect_with_retry(&ReconnectPolicy::default(), &Default::default())
            .await
    );
    assert!(err.is_auth_error());
    assert_eq!(venue.seen_named("login").len(), 1);
}

#[tokio::test]
async fn test_scoped_cleans_up_on_error() {
    let venue = MockVenue::standard().await;
    let manager = SessionManager::new(venue.session_config());

    let result: Result<(), XapiError> = manager
        .scoped(|handle| async move {
            handle.socket().ping().await?;
            Err(XapiError::Protocol("scope failed".to_string()))
        })
        .await;

    assert!(assert_err!(result).is_protocol_error());
    assert_eq!(venue.seen_named("logout").len(), 1);
    assert_eq!(manager.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_scoped_cleans_up_on_panic() {
    let venue = MockVenue::standard().await;
    let manager = SessionManager::new(venue.session_config());

    let outcome = AssertUnwindSafe(manager.scoped(|_handle| async move {
        if true {
            panic!("strategy bug");
        }
        Ok::<(), XapiError>(())
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
    assert_eq!(venue.seen_named("logout").len(), 1);
    assert_eq!(manager.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_scope_closes_retried_handle() {
    let venue = MockVenue::standard().await;
    let manager = SessionManager::new(venue.session_config());
    let handle = assert_ok!(
        manager
            .connect_with_retry(&ReconnectPolicy::default(), &Default::default())
            .await
    );

    let stream_session_id = SessionManager::scope(handle, |handle| async move {
        handle.socket().ping().await?;
        Ok::<_, XapiError>(handle.session().stream_session_id().to_string())
    })
    .await;

    assert_eq!(assert_ok!(stream_session_id), "sid-1");
    assert_eq!(venue.seen_named("logout").len(), 1);
    assert_eq!(manager.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_unexpected_close_disconnects() {
    let venue = MockVenue::standard().await;
    let manager = SessionManager::new(venue.session_config());
    let handle = assert_ok!(manager.connect().await);
    let mut states = manager.subscribe_state();

    venue.drop_connections();
    let reached = tokio::time::timeout(
        Duration::from_secs(2),
        states.wait_for(|state| *state == SessionState::Disconnected),
    )
    .await
    .is_ok_and(|changed| changed.is_ok());
    assert!(reached);
    assert_eq!(handle.state(), SessionState::Disconnected);

    let err = assert_err!(handle.socket().ping().await);
    assert!(matches!(err, XapiError::ConnectionClosed));
    assert!(matches!(handle.ensure_ready(), Err(XapiError::NotConnected)));
    handle.close().await;
}

#[tokio::test]
async fn test_reconnect_negotiates_new_stream_session() {
    let venue = MockVenue::standard().await;
    let manager = SessionManager::new(venue.session_config());

    let first = assert_ok!(manager.connect().await);
    let first_id = first.session().stream_session_id().to_string();
    venue.drop_connections();
    first.close().await;

    let policy = ReconnectPolicy {
        max_retries: Some(3),
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    };
    let second = assert_ok!(manager.connect_with_retry(&policy, &Default::default()).await);
    assert_ne!(second.session().stream_session_id(), first_id);
    assert_eq!(second.session().stream_session_id(), "sid-2");
    second.close().await;
}

#[tokio::test]
async fn test_close_unblocks_pending_call() {
    let venue = MockVenue::standard().await;
    let config = venue.session_config().with_client(ClientConfig {
        connect_timeout: Duration::from_secs(2),
        call_timeout: None,
    });
    let manager = SessionManager::new(config);
    let handle = Arc::new(assert_ok!(manager.connect().await));

    let pending = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.socket().raw_command("hang", None).await })
    };
    venue.wait_for("hang", 1).await;

    let started = Instant::now();
    let (outcome, ()) = tokio::join!(
        tokio::time::timeout(Duration::from_secs(1), pending),
        handle.close()
    );

    assert!(matches!(outcome.unwrap().unwrap(), Err(XapiError::ConnectionClosed)));
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(venue.seen_named("logout").is_empty());
    assert_eq!(manager.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_older_handle_leaves_newer_session_alone() {
    let venue = MockVenue::standard().await;
    let manager = SessionManager::new(venue.session_config());

    let first = assert_ok!(manager.connect().await);
    let second = assert_ok!(manager.connect().await);
    assert_eq!(second.session().stream_session_id(), "sid-2");

    drop(first);
    assert_eq!(manager.state(), SessionState::Ready);
    assert_ok!(second.ensure_ready());

    let third = assert_ok!(manager.connect().await);
    second.close().await;
    assert_eq!(second.state(), SessionState::Disconnected);
    assert_eq!(manager.state(), SessionState::Ready);
    assert_ok!(third.ensure_ready());
    assert!(!third.socket().connection().is_closed());

    third.close().await;
    assert_eq!(manager.state(), SessionState::Disconnected);
}
