use super::*;
use chrono::Duration;
use tempfile::TempDir;

fn transition_change(
    key: &str,
    from: ServiceStatus,
    to: ServiceStatus,
    at: DateTime<Utc>,
) -> StatusChange {
    StatusChange {
        service_key: key.to_string(),
        status: to,
        updated_at: at,
        transition: Some(
            StateTransition::new(key, from, to, at).with_message(Some(format!("{} is {}", key, to))),
        ),
    }
}

#[tokio::test]
async fn test_service_round_trip() {
    let store = SqliteStore::in_memory().await.unwrap();
    let now = Utc::now();
    let mut service = Service::new("daily-cleanup", now)
        .with_expected_period(86_400)
        .with_dead_after(172_800)
        .with_alerts_enabled(false);
    service.service_type = Some(ServiceType::LocalJob);
    service.display_name = Some("Daily cleanup".to_string());
    service
        .metadata
        .insert("owner".to_string(), serde_json::json!("ops"));

    assert!(store.insert_service(service.clone()).await.unwrap());
    let loaded = store.get_service("daily-cleanup").await.unwrap().unwrap();

    assert_eq!(loaded.service_type, Some(ServiceType::LocalJob));
    assert_eq!(loaded.expected_period, Some(86_400));
    assert_eq!(loaded.dead_after, Some(172_800));
    assert!(!loaded.alerts_enabled);
    assert_eq!(loaded.status, ServiceStatus::Alive);
    assert_eq!(loaded.service_group, "default");
    assert_eq!(loaded.metadata.get("owner"), Some(&serde_json::json!("ops")));
    assert_eq!(
        loaded.updated_at.map(|t| t.timestamp_micros()),
        Some(now.timestamp_micros())
    );
}

#[tokio::test]
async fn test_insert_existing_key_is_ignored() {
    let store = SqliteStore::in_memory().await.unwrap();
    let now = Utc::now();
    assert!(store.insert_service(Service::new("api", now)).await.unwrap());
    assert!(!store
        .insert_service(Service::new("api", now).with_status(ServiceStatus::Dead))
        .await
        .unwrap());
    let loaded = store.get_service("api").await.unwrap().unwrap();
    assert_eq!(loaded.status, ServiceStatus::Alive);
}

#[tokio::test]
async fn test_get_missing_service() {
    let store = SqliteStore::in_memory().await.unwrap();
    assert!(store.get_service("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_services_ordered() {
    let store = SqliteStore::in_memory().await.unwrap();
    let now = Utc::now();
    for key in ["worker", "api", "cron"] {
        store.insert_service(Service::new(key, now)).await.unwrap();
    }
    let keys: Vec<String> = store
        .list_services()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.service_key)
        .collect();
    assert_eq!(keys, vec!["api", "cron", "worker"]);
}

#[tokio::test]
async fn test_patch_leaves_status_alone() {
    let store = SqliteStore::in_memory().await.unwrap();
    let created = Utc::now() - Duration::hours(2);
    store
        .insert_service(Service::new("api", created).with_status(ServiceStatus::Down))
        .await
        .unwrap();

    let patch = ServicePatch {
        expected_period: Some(300),
        alerts_enabled: Some(false),
        ..Default::default()
    };
    assert!(store.patch_service("api", &patch).await.unwrap());
    assert!(!store.patch_service("ghost", &patch).await.unwrap());

    let loaded = store.get_service("api").await.unwrap().unwrap();
    assert_eq!(loaded.expected_period, Some(300));
    assert!(!loaded.alerts_enabled);
    assert_eq!(loaded.dead_after, None);
    assert_eq!(loaded.status, ServiceStatus::Down);
    assert_eq!(
        loaded.updated_at.map(|t| t.timestamp_micros()),
        Some(created.timestamp_micros())
    );
}

#[tokio::test]
async fn test_touch_only_moves_forward() {
    let store = SqliteStore::in_memory().await.unwrap();
    let now = Utc::now();
    store.insert_service(Service::new("api", now)).await.unwrap();

    store.touch_service("api", now).await.unwrap();
    store
        .touch_service("api", now - Duration::minutes(10))
        .await
        .unwrap();

    let loaded = store.get_service("api").await.unwrap().unwrap();
    assert_eq!(
        loaded.last_seen.map(|t| t.timestamp_micros()),
        Some(now.timestamp_micros())
    );
}

#[tokio::test]
async fn test_heartbeat_queries() {
    let store = SqliteStore::in_memory().await.unwrap();
    let now = Utc::now();
    for minutes in [50, 40, 30, 20, 10] {
        store
            .append_heartbeat(Heartbeat::new("api", now - Duration::minutes(minutes)))
            .await
            .unwrap();
    }
    store
        .append_heartbeat(Heartbeat::new("old", now - Duration::days(9)))
        .await
        .unwrap();

    let recent = store.recent_heartbeats("api", 3).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert!(recent[0].timestamp > recent[1].timestamp);
    assert!(recent[1].timestamp > recent[2].timestamp);

    let week = store
        .heartbeats_since(now - Duration::days(7))
        .await
        .unwrap();
    assert_eq!(week.len(), 5);
    assert!(week.iter().all(|hb| hb.service_key == "api"));
}

#[tokio::test]
async fn test_commit_status_writes_transition_atomically() {
    let store = SqliteStore::in_memory().await.unwrap();
    let now = Utc::now();
    store.insert_service(Service::new("api", now)).await.unwrap();

    let later = now + Duration::minutes(15);
    let matched = store
        .commit_status(transition_change(
            "api",
            ServiceStatus::Alive,
            ServiceStatus::Down,
            later,
        ))
        .await
        .unwrap();
    assert!(matched);

    let loaded = store.get_service("api").await.unwrap().unwrap();
    assert_eq!(loaded.status, ServiceStatus::Down);

    let transitions = store
        .query_transitions(&TransitionFilter::for_service("api"))
        .await
        .unwrap();
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].from_state, ServiceStatus::Alive);
    assert_eq!(transitions[0].to_state, ServiceStatus::Down);
    assert!(!transitions[0].alerted);
    assert_eq!(transitions[0].alert_message.as_deref(), Some("api is down"));
}

#[tokio::test]
async fn test_commit_status_missing_service_writes_nothing() {
    let store = SqliteStore::in_memory().await.unwrap();
    let matched = store
        .commit_status(transition_change(
            "ghost",
            ServiceStatus::Alive,
            ServiceStatus::Dead,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert!(!matched);
    assert!(store
        .query_transitions(&TransitionFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_query_filters_and_mark_alerted() {
    let store = SqliteStore::in_memory().await.unwrap();
    let now = Utc::now();
    for key in ["a", "b"] {
        store.insert_service(Service::new(key, now)).await.unwrap();
    }
    store
        .commit_status(transition_change("a", ServiceStatus::Alive, ServiceStatus::Down, now))
        .await
        .unwrap();
    store
        .commit_status(transition_change(
            "b",
            ServiceStatus::Alive,
            ServiceStatus::Dead,
            now + Duration::seconds(1),
        ))
        .await
        .unwrap();
    store
        .commit_status(transition_change(
            "a",
            ServiceStatus::Down,
            ServiceStatus::Alive,
            now + Duration::seconds(2),
        ))
        .await
        .unwrap();

    let all = store
        .query_transitions(&TransitionFilter::default())
        .await
        .unwrap();
    let order: Vec<(&str, ServiceStatus)> = all
        .iter()
        .map(|t| (t.service_key.as_str(), t.to_state))
        .collect();
    assert_eq!(
        order,
        vec![
            ("a", ServiceStatus::Alive),
            ("b", ServiceStatus::Dead),
            ("a", ServiceStatus::Down),
        ]
    );

    assert_eq!(store.mark_alerted("a").await.unwrap(), 2);
    assert_eq!(store.mark_alerted("a").await.unwrap(), 0);

    let pending = store
        .query_transitions(&TransitionFilter::not_alerted())
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].service_key, "b");

    let limited = store
        .query_transitions(&TransitionFilter::default().with_limit(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_file_store_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("svcwatch.db");
    let now = Utc::now();

    {
        let store = SqliteStore::open(&path).await.unwrap();
        store.insert_service(Service::new("api", now)).await.unwrap();
        store
            .append_heartbeat(Heartbeat::new("api", now))
            .await
            .unwrap();
    }

    let reopened = SqliteStore::open(&path).await.unwrap();
    assert!(reopened.get_service("api").await.unwrap().is_some());
    assert_eq!(reopened.recent_heartbeats("api", 10).await.unwrap().len(), 1);
}
