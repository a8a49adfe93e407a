    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::Utc;
    use svcwatch_protocols::{
        Service, ServiceStatus, ServiceStore, StateTransition, StatusChange, Store,
    };
    use svcwatch_store::MemoryStore;
    use tower::ServiceExt;

    fn create_test_router() -> (Router, Arc<dyn Store>) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::from_store(store.clone()));
        (create_router(state), store)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_string(&json).unwrap())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn seed_transition(store: &Arc<dyn Store>, key: &str, to: ServiceStatus) {
        let now = Utc::now();
        store.insert_service(Service::new(key, now)).await.unwrap();
        let transition = StateTransition::new(key, ServiceStatus::Alive, to, now)
            .with_message(Some(format!("{} is {}. Last seen: never", key, to)));
        store
            .commit_status(StatusChange {
                service_key: key.to_string(),
                status: to,
                updated_at: now,
                transition: Some(transition),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_heartbeat_registers_service() {
        let (app, _) = create_test_router();
        let (status, body) = send(
            &app,
            "POST",
            "/heartbeat",
            Some(serde_json::json!({"service_key": "api", "metadata": {"host": "web-1"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(&app, "GET", "/services/api", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service_key"], "api");
        assert_eq!(body["status"], "alive");
        assert_eq!(body["alerts_enabled"], true);
        assert!(body["last_seen"].is_string());
    }

    #[tokio::test]
    async fn test_heartbeat_rejects_empty_key() {
        let (app, _) = create_test_router();
        let (status, body) = send(
            &app,
            "POST",
            "/heartbeat",
            Some(serde_json::json!({"service_key": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_heartbeat_rejects_malformed_body() {
        let (app, _) = create_test_router();
        let (status, body) = send(
            &app,
            "POST",
            "/heartbeat",
            Some(serde_json::json!({"metadata": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_status_counts_heartbeats() {
        let (app, _) = create_test_router();
        for _ in 0..3 {
            send(
                &app,
                "POST",
                "/heartbeat",
                Some(serde_json::json!({"service_key": "worker"})),
            )
            .await;
        }
        send(
            &app,
            "POST",
            "/heartbeat",
            Some(serde_json::json!({"service_key": "api"})),
        )
        .await;

        let (status, body) = send(&app, "GET", "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        let services = body["services"].as_object().unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services["worker"]["heartbeat_count"], 3);
        assert_eq!(services["worker"]["service"], "worker");
        assert_eq!(services["worker"]["status"], "alive");
        assert!(services["worker"]["median_interval"].is_number());
        assert_eq!(services["api"]["heartbeat_count"], 1);
        assert!(services["api"]["median_interval"].is_null());
        assert!(services["api"]["time_since_last_heartbeat_readable"]
            .as_str()
            .unwrap()
            .ends_with('s'));
    }

    #[tokio::test]
    async fn test_status_empty() {
        let (app, _) = create_test_router();
        let (status, body) = send(&app, "GET", "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["services"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_service() {
        let (app, _) = create_test_router();
        let (status, body) = send(&app, "GET", "/services/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_configure_creates_and_updates() {
        let (app, _) = create_test_router();
        let (status, body) = send(
            &app,
            "POST",
            "/configure-service",
            Some(serde_json::json!({
                "service_key": "nightly-backup",
                "service_type": "local_job",
                "expected_period": 86400
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service_key"], "nightly-backup");
        assert_eq!(body["service_type"], "local_job");
        assert_eq!(body["expected_period"], 86400);
        assert_eq!(body["status"], "alive");

        let (status, body) = send(
            &app,
            "POST",
            "/configure-service",
            Some(serde_json::json!({
                "service_key": "nightly-backup",
                "alerts_enabled": false
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alerts_enabled"], false);
        assert_eq!(body["expected_period"], 86400);
    }

    #[tokio::test]
    async fn test_configure_rejects_zero_period() {
        let (app, _) = create_test_router();
        let (status, _) = send(
            &app,
            "POST",
            "/configure-service",
            Some(serde_json::json!({"service_key": "api", "expected_period": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", "/services/api", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_state_transitions_query_and_body() {
        let (app, store) = create_test_router();
        seed_transition(&store, "api", ServiceStatus::Down).await;
        seed_transition(&store, "worker", ServiceStatus::Dead).await;

        let (status, body) = send(&app, "GET", "/state-transitions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_object().unwrap().len(), 2);
        assert_eq!(body["api"]["to_state"], "down");
        assert_eq!(body["worker"]["from_state"], "alive");

        let (status, body) = send(
            &app,
            "GET",
            "/state-transitions?service_key=worker&only_not_alerted=true",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_object().unwrap().len(), 1);
        assert_eq!(body["worker"]["to_state"], "dead");

        let (status, body) = send(
            &app,
            "POST",
            "/state-transitions",
            Some(serde_json::json!({"service_key": "api"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_object().unwrap().len(), 1);
        assert_eq!(body["api"]["alerted"], false);
    }

    #[tokio::test]
    async fn test_state_transitions_bad_query() {
        let (app, _) = create_test_router();
        let (status, body) = send(&app, "GET", "/state-transitions?limit=many", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_mark_alerted_hides_transitions() {
        let (app, store) = create_test_router();
        seed_transition(&store, "api", ServiceStatus::Down).await;

        let (status, body) = send(
            &app,
            "POST",
            "/mark-alerted",
            Some(serde_json::json!({"service_key": "api"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["transitions_marked"], 1);

        let (_, body) = send(
            &app,
            "GET",
            "/state-transitions?only_not_alerted=true",
            None,
        )
        .await;
        assert!(body.as_object().unwrap().is_empty());

        let (_, body) = send(&app, "GET", "/state-transitions", None).await;
        assert_eq!(body["api"]["alerted"], true);
    }

    #[tokio::test]
    async fn test_mark_alerted_unknown_service() {
        let (app, _) = create_test_router();
        let (status, _) = send(
            &app,
            "POST",
            "/mark-alerted",
            Some(serde_json::json!({"service_key": "ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_probes() {
        let (app, _) = create_test_router();
        let (status, body) = send(&app, "GET", "/livez", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "alive");

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (app, _) = create_test_router();
        let (status, _) = send(&app, "GET", "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
