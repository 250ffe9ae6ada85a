use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{assignments, auth, courses, discussions, enrollment, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(courses::router())
                .merge(enrollment::router())
                .merge(assignments::router())
                .merge(discussions::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{
        auth::{jwt::JwtKeys, role::Role},
        courses::repo_types::Privacy,
        enrollment::memory::MemoryEnrollmentStore,
    };

    fn token(state: &AppState, user_id: Uuid) -> String {
        let keys = JwtKeys::from_config(&state.config.jwt);
        keys.sign_access(user_id, Role::User).unwrap()
    }

    async fn call(app: &Router, method: Method, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = bearer {
            req = req.header(AUTHORIZATION, format!("Bearer {t}"));
        }
        let res = app
            .clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let (status, _) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/api/v1/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");

        let (status, _) = call(&app, Method::GET, "/api/v1/assignments", Some("garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn enrollment_request_flow_over_http() {
        let store = Arc::new(MemoryEnrollmentStore::new());
        let state = AppState::fake_with(store.clone());
        let creator = Uuid::new_v4();
        let student = Uuid::new_v4();
        let creator_token = token(&state, creator);
        let student_token = token(&state, student);
        let course = store.add_course(creator, Privacy::Private);
        let app = build_app(state);

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/courses/{course}/request-enrollment"),
            Some(&student_token),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["kind"], "request_created");
        assert_eq!(body["request"]["status"], "PENDING");
        let request_id = body["request"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/enrollment-requests/{request_id}/approve"),
            Some(&student_token),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
        assert!(store.enrolled_users(course).is_empty());

        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/api/v1/courses/{course}/enrollment-requests"),
            Some(&creator_token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requests"].as_array().unwrap().len(), 1);

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/enrollment-requests/{request_id}/approve"),
            Some(&creator_token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["request"]["status"], "APPROVED");
        assert!(store.enrolled_users(course).contains(&student));

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/enrollment-requests/{request_id}/reject"),
            Some(&creator_token),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn unknown_decision_action_is_a_validation_error() {
        let state = AppState::fake();
        let t = token(&state, Uuid::new_v4());
        let app = build_app(state);
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/enrollment-requests/{}/maybe", Uuid::new_v4()),
            Some(&t),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn public_course_enroll_and_unenroll_over_http() {
        let store = Arc::new(MemoryEnrollmentStore::new());
        let state = AppState::fake_with(store.clone());
        let student = Uuid::new_v4();
        let t = token(&state, student);
        let course = store.add_course(Uuid::new_v4(), Privacy::Public);
        let app = build_app(state);

        let (status, body) =
            call(&app, Method::POST, &format!("/api/v1/courses/{course}/enroll"), Some(&t)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "enrolled");
        assert_eq!(store.request_count(), 0);

        let (_, body) =
            call(&app, Method::POST, &format!("/api/v1/courses/{course}/unenroll"), Some(&t)).await;
        assert_eq!(body["kind"], "unenrolled");
        let (_, body) =
            call(&app, Method::POST, &format!("/api/v1/courses/{course}/unenroll"), Some(&t)).await;
        assert_eq!(body["kind"], "not_enrolled");
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let state = AppState::fake();
        let t = token(&state, Uuid::new_v4());
        let app = build_app(state);
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/courses/{}/enroll", Uuid::new_v4()),
            Some(&t),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
