use axum::{
    routing::{get, post},
    Router,
};
use ridehub_bookings::BookingService;
use ridehub_core::config::RidehubConfig;
use ridehub_scheduler::{SchedulerEngine, SchedulerHandle};
use std::sync::Arc;

use crate::http::{admin, health, reservations};

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: RidehubConfig,
    pub bookings: BookingService,
    pub engine: Arc<SchedulerEngine>,
    /// Timer handle for the periodic tick; `None` when the scheduler is
    /// disabled in config.
    pub scheduler: Option<SchedulerHandle>,
}

impl AppState {
    pub fn new(
        config: RidehubConfig,
        bookings: BookingService,
        engine: Arc<SchedulerEngine>,
        scheduler: Option<SchedulerHandle>,
    ) -> Self {
        Self {
            config,
            bookings,
            engine,
            scheduler,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/reservations", post(reservations::create_handler))
        .route("/reservations/{id}", get(reservations::get_handler))
        .route(
            "/reservations/{id}/status",
            post(reservations::transition_handler),
        )
        .route("/reservations/{id}/assign", post(reservations::assign_handler))
        .route(
            "/reservations/{id}/unassign",
            post(reservations::unassign_handler),
        )
        .route("/reservations/{id}/cancel", post(reservations::cancel_handler))
        .route(
            "/reservations/{id}/complete",
            post(reservations::complete_handler),
        )
        .route("/admin/scheduler/stats", get(admin::stats_handler))
        .route("/admin/scheduler/tick", post(admin::tick_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use ridehub_bookings::{ReservationStore, SqliteReservationStore};
    use ridehub_scheduler::SchedulePolicy;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router(admin_token: Option<&str>) -> Router {
        let store: Arc<dyn ReservationStore> =
            Arc::new(SqliteReservationStore::open_in_memory().unwrap());
        let mut config = RidehubConfig::default();
        config.gateway.admin_token = admin_token.map(str::to_string);
        let engine = Arc::new(SchedulerEngine::new(
            Arc::clone(&store),
            SchedulePolicy::default(),
        ));
        let state = AppState::new(config, BookingService::new(store), engine, None);
        build_router(Arc::new(state))
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(router: &Router, offset: Duration) -> String {
        let at = (Utc::now() + offset).to_rfc3339();
        let request = json!({ "scheduled_at": at });
        let (status, body) = send(router, "POST", "/reservations", Some(request)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "PENDING");
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let router = test_router(None);
        let (status, body) = send(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["scheduler_active"], false);
    }

    #[tokio::test]
    async fn create_then_get_includes_display_fields() {
        let router = test_router(None);
        let id = create(&router, Duration::hours(5)).await;

        let (status, body) = send(&router, "GET", &format!("/reservations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());
        assert!(body["scheduled_date"].as_str().unwrap().len() == 10);
        assert!(body["scheduled_time"].as_str().unwrap().len() == 5);
    }

    #[tokio::test]
    async fn unknown_reservation_is_404() {
        let router = test_router(None);
        let (status, body) = send(&router, "GET", "/reservations/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn illegal_transition_is_409() {
        let router = test_router(None);
        let id = create(&router, Duration::hours(5)).await;

        let (status, body) = send(
            &router,
            "POST",
            &format!("/reservations/{id}/status"),
            Some(json!({ "status": "COMPLETED" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
        assert_eq!(
            body["error"]["message"],
            "invalid transition: PENDING -> COMPLETED"
        );

        let (_, body) = send(&router, "GET", &format!("/reservations/{id}"), None).await;
        assert_eq!(body["status"], "PENDING");
    }

    #[tokio::test]
    async fn assign_start_complete_flow() {
        let router = test_router(None);
        let id = create(&router, Duration::hours(5)).await;

        let (status, body) = send(
            &router,
            "POST",
            &format!("/reservations/{id}/assign"),
            Some(json!({ "driver_id": "drv-7", "vehicle_id": "car-3" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ASSIGNED");
        assert_eq!(body["driver_id"], "drv-7");
        assert_eq!(body["vehicle_id"], "car-3");

        let (status, body) = send(
            &router,
            "POST",
            &format!("/reservations/{id}/status"),
            Some(json!({ "status": "IN_PROGRESS" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "IN_PROGRESS");

        let (status, body) =
            send(&router, "POST", &format!("/reservations/{id}/unassign"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CANNOT_UNASSIGN_IN_PROGRESS");

        let (status, body) =
            send(&router, "POST", &format!("/reservations/{id}/complete"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "COMPLETED");
    }

    #[tokio::test]
    async fn cancel_records_reason() {
        let router = test_router(None);
        let id = create(&router, Duration::hours(5)).await;

        let (status, body) = send(
            &router,
            "POST",
            &format!("/reservations/{id}/cancel"),
            Some(json!({ "reason": "customer called" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "CANCELLED");
        assert_eq!(body["cancellation_reason"], "customer called");
    }

    #[tokio::test]
    async fn five_digit_year_is_rejected_and_tick_keeps_working() {
        let router = test_router(None);
        let due = create(&router, Duration::minutes(30)).await;

        let (status, body) = send(
            &router,
            "POST",
            "/reservations",
            Some(json!({ "scheduled_at": "+10000-01-01T00:00:00Z" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "SCHEDULE_OUT_OF_RANGE");

        let (status, report) = send(&router, "POST", "/admin/scheduler/tick", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["errors"], json!([]));
        assert_eq!(report["updated"], 1);

        let (_, body) = send(&router, "GET", &format!("/reservations/{due}"), None).await;
        assert_eq!(body["status"], "CONFIRMED");
    }

    #[tokio::test]
    async fn manual_tick_confirms_due_booking() {
        let router = test_router(None);
        let id = create(&router, Duration::minutes(30)).await;

        let (status, report) = send(&router, "POST", "/admin/scheduler/tick", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["updated"], 1);
        assert_eq!(report["errors"], json!([]));

        let (_, body) = send(&router, "GET", &format!("/reservations/{id}"), None).await;
        assert_eq!(body["status"], "CONFIRMED");

        let (status, stats) = send(&router, "GET", "/admin/scheduler/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["pending_count"], 0);
        assert_eq!(stats["upcoming_24h_count"], 1);
        assert_eq!(stats["active"], false);
        assert_eq!(stats["ticks_run"], 1);
    }

    #[tokio::test]
    async fn admin_routes_require_token_when_configured() {
        let router = test_router(Some("s3cret"));

        let (status, body) = send(&router, "GET", "/admin/scheduler/stats", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let request = Request::builder()
            .method("GET")
            .uri("/admin/scheduler/stats")
            .header("authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
