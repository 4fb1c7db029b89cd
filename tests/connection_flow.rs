//! Connection lifecycle: cold start, credential checks, refresh throttling

use chrono::{Duration, TimeZone, Utc};
use policy_switcher::core::clock::{Clock, ManualClock};
use policy_switcher::core::config::{AppConfig, LatencyConfig};
use policy_switcher::model::{CredentialField, Credentials};
use policy_switcher::store::{
    CredentialStore, FakeRouterStore, FileCredentialStore, InMemoryCredentialStore,
};
use policy_switcher::ui::{ConnectionStatus, PolicySwitcher, UiEvent};
use std::sync::Arc;

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
}

fn router() -> Arc<FakeRouterStore> {
    Arc::new(FakeRouterStore::new(LatencyConfig::zero()))
}

fn saved() -> Credentials {
    Credentials::new("my.keenetic.net", "admin", "secret").with_default_policy("office")
}

#[tokio::test]
async fn test_cold_start_without_credentials_waits() {
    let switcher = PolicySwitcher::new(
        router(),
        Arc::new(InMemoryCredentialStore::new()),
        AppConfig::default(),
    );
    switcher.start().await;

    let state = switcher.state();
    assert_eq!(state.connection_status, ConnectionStatus::NotSet);
    assert!(state.creds_panel_expanded);
    assert!(state.policies.is_empty());
    assert!(state.clients.is_empty());
}

#[tokio::test]
async fn test_cold_start_with_saved_credentials_connects() {
    let clock = clock();
    let credentials = Arc::new(InMemoryCredentialStore::with_credentials(
        saved(),
        Some("https://my.keenetic.net".into()),
    ));
    let switcher = PolicySwitcher::new(router(), credentials, AppConfig::default())
        .with_clock(Arc::new(clock.clone()));
    switcher.start().await;

    let state = switcher.state();
    assert_eq!(state.connection_status, ConnectionStatus::Ready(clock.now()));
    assert!(!state.creds_panel_expanded);
    assert_eq!(state.credentials, saved());
    assert_eq!(state.last_successful_url.as_deref(), Some("https://my.keenetic.net"));
    assert_eq!(state.policies.len(), 5);
    assert_eq!(state.clients.len(), 5);
    assert_eq!(state.last_synced, Some(clock.now()));
    assert!(!state.is_refreshing);
}

#[tokio::test]
async fn test_invalid_form_never_reaches_router() {
    let store = router();
    let switcher = PolicySwitcher::new(
        store.clone(),
        Arc::new(InMemoryCredentialStore::new()),
        AppConfig::default(),
    );

    switcher.update_domain("bad host");
    switcher.update_username("");
    switcher.update_password("pw");
    // would fail verification if the router were asked
    store.fail_next("router was called");

    assert!(!switcher.verify_connection().await);

    let state = switcher.state();
    assert_eq!(
        state.connection_status,
        ConnectionStatus::Error("Проверьте введённые данные".into())
    );
    assert!(state.credential_errors.contains_key(&CredentialField::Domain));
    assert!(state.credential_errors.contains_key(&CredentialField::Username));
    assert!(!state.credential_errors.contains_key(&CredentialField::Password));
}

#[tokio::test]
async fn test_successful_verify_persists_and_loads() {
    let clock = clock();
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let switcher = PolicySwitcher::new(router(), credentials.clone(), AppConfig::default())
        .with_clock(Arc::new(clock.clone()));

    switcher.update_domain("my.keenetic.net");
    switcher.update_username("admin");
    switcher.update_password("secret");
    switcher.update_default_policy("office");

    assert!(switcher.verify_connection().await);

    let state = switcher.state();
    assert_eq!(state.connection_status, ConnectionStatus::Ready(clock.now()));
    assert!(state.credential_errors.is_empty());
    assert!(!state.creds_panel_expanded);
    assert_eq!(state.last_successful_url.as_deref(), Some("https://my.keenetic.net"));
    assert_eq!(state.clients.len(), 5);

    assert_eq!(credentials.load().await.unwrap(), Some(saved()));
    assert_eq!(
        credentials.load_last_successful_url().await.unwrap().as_deref(),
        Some("https://my.keenetic.net")
    );
}

#[tokio::test]
async fn test_router_rejection_sets_error_status() {
    let store = router();
    let switcher = PolicySwitcher::new(
        store.clone(),
        Arc::new(InMemoryCredentialStore::new()),
        AppConfig::default(),
    );
    switcher.update_domain("192.168.1.1");
    switcher.update_username("admin");
    switcher.update_password("wrong");

    store.fail_next("Неверный логин или пароль");
    assert!(!switcher.verify_connection().await);

    let state = switcher.state();
    assert_eq!(
        state.connection_status,
        ConnectionStatus::Error("Неверный логин или пароль".into())
    );
    assert!(state.creds_panel_expanded);
    assert!(state.clients.is_empty());
}

#[tokio::test]
async fn test_validating_is_published_while_router_answers() {
    let latency = LatencyConfig {
        verify_ms: 50,
        ..LatencyConfig::zero()
    };
    let switcher = PolicySwitcher::new(
        Arc::new(FakeRouterStore::new(latency)),
        Arc::new(InMemoryCredentialStore::new()),
        AppConfig::default(),
    );
    switcher.update_domain("192.168.1.1");
    switcher.update_username("admin");
    switcher.update_password("secret");
    let mut rx = switcher.subscribe();

    let task = tokio::spawn({
        let switcher = switcher.clone();
        async move { switcher.verify_connection().await }
    });

    rx.wait_for(|s| s.connection_status == ConnectionStatus::Validating)
        .await
        .unwrap();
    assert!(task.await.unwrap());
    assert!(switcher.state().connection_status.is_ready());
}

#[tokio::test]
async fn test_refresh_respects_cooldown() {
    let clock = clock();
    let credentials = Arc::new(InMemoryCredentialStore::with_credentials(saved(), None));
    let switcher = PolicySwitcher::new(router(), credentials, AppConfig::default())
        .with_clock(Arc::new(clock.clone()));
    switcher.start().await;
    let first_sync = switcher.state().last_synced;

    assert!(!switcher.refresh(false).await);

    clock.advance(Duration::seconds(29));
    assert!(!switcher.refresh(false).await);
    assert_eq!(switcher.state().last_synced, first_sync);

    clock.advance(Duration::seconds(2));
    assert!(switcher.refresh(false).await);
    assert_eq!(switcher.state().last_synced, Some(clock.now()));

    // forced refresh ignores the window
    assert!(switcher.refresh(true).await);
}

#[tokio::test]
async fn test_background_refresh_needs_connection() {
    let switcher = PolicySwitcher::new(
        router(),
        Arc::new(InMemoryCredentialStore::new()),
        AppConfig::default(),
    );
    assert!(!switcher.refresh(false).await);
    assert!(switcher.state().clients.is_empty());
}

#[tokio::test]
async fn test_failed_refresh_keeps_data_and_toasts() {
    let store = router();
    let credentials = Arc::new(InMemoryCredentialStore::with_credentials(saved(), None));
    let switcher = PolicySwitcher::new(store.clone(), credentials, AppConfig::default());
    switcher.start().await;
    let before = switcher.state().clients;
    let mut events = switcher.events();

    store.fail_next("Нет связи с роутером");
    assert!(!switcher.refresh(true).await);

    let state = switcher.state();
    assert_eq!(state.clients, before);
    assert!(!state.is_refreshing);
    assert_eq!(
        events.try_recv().unwrap(),
        UiEvent::error_toast("Нет связи с роутером")
    );
}

#[tokio::test]
async fn test_credentials_file_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    let first = PolicySwitcher::new(
        router(),
        Arc::new(FileCredentialStore::new(&path)),
        AppConfig::default(),
    );
    first.update_domain("192.168.1.1");
    first.update_username("admin");
    first.update_password("secret");
    assert!(first.verify_connection().await);

    let second = PolicySwitcher::new(
        router(),
        Arc::new(FileCredentialStore::new(&path)),
        AppConfig::default(),
    );
    second.start().await;

    let state = second.state();
    assert!(state.connection_status.is_ready());
    assert_eq!(state.credentials.username, "admin");
    assert_eq!(state.last_successful_url.as_deref(), Some("https://192.168.1.1"));
}
