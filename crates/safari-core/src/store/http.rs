//! reqwest-backed [`RemoteStore`].

use super::{Method, RemoteStore, Route};
use crate::error::{Failure, Result};
use async_trait::async_trait;
use safari_config::{AppConfig, Session};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the booking backend
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HttpStore {
    /// Build a store from configuration. Every request is bounded by
    /// `api.timeout_secs`.
    pub fn new(config: &AppConfig, session: Session) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .user_agent(config.api.user_agent.clone())
            .build()
            .map_err(|e| Failure::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, route: &Route) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, route.path);
        match route.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        }
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn execute(&self, route: &Route, body: Option<Value>) -> Result<Value> {
        let Some(token) = self.session.bearer_token() else {
            return Err(Failure::precondition(
                "Not logged in: no session token available",
            ));
        };

        debug!(entity = %route.entity, operation = route.operation.as_str(), "{}", route);

        let mut request = self.request(route).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(entity = %route.entity, "{} failed: {}", route, e);
            Failure::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            // The status decides the failure; an unreadable body only loses detail
            let text = response.text().await.unwrap_or_else(|e| {
                debug!(entity = %route.entity, "error body unreadable: {}", e);
                String::new()
            });
            let failure = Failure::from_status(status.as_u16(), &text);
            warn!(
                entity = %route.entity,
                status = status.as_u16(),
                "{} rejected: {}",
                route,
                failure.message
            );
            return Err(failure);
        }

        let text = response.text().await.map_err(Failure::from)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        // Some endpoints answer 2xx with a plain-text message
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(_) if route.method != Method::Get => Ok(Value::String(text)),
            Err(e) => Err(Failure::decode(format!("{}: {}", route, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::store::{Endpoints, Operation};
    use crate::types::EntityType;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::{delete, get, put},
        Json, Router,
    };
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{}", addr)
    }

    fn store(base_url: String, session: Session) -> HttpStore {
        store_with_timeout(base_url, session, 5)
    }

    fn store_with_timeout(base_url: String, session: Session, timeout_secs: u64) -> HttpStore {
        let mut config = AppConfig::default();
        config.api.base_url = base_url;
        config.api.timeout_secs = timeout_secs;
        HttpStore::new(&config, session).expect("store")
    }

    fn bearer(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn list_sends_bearer_and_decodes_records() {
        let router = Router::new().route(
            "/api/admin/users",
            get(|headers: HeaderMap| async move {
                if bearer(&headers).as_deref() != Some("Bearer tok-1") {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(json!([
                    {"userId": 1, "firstName": "Jo"},
                    {"userId": 2, "firstName": "Al"}
                ])))
            }),
        );
        let store = store(serve(router).await, Session::with_token("tok-1"));

        let users = store.list(EntityType::Users).await.expect("list");
        assert_eq!(users.iter().map(|u| u.id()).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn structured_4xx_becomes_validation_failure() {
        let router = Router::new().route(
            "/api/admin/users/:id/role",
            put(|Path(_id): Path<i64>| async move {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "Invalid role"})),
                )
            }),
        );
        let store = store(serve(router).await, Session::with_token("t"));

        let err = store
            .invoke(
                EntityType::Users,
                Operation::ChangeRole,
                Some(5),
                Some(json!({"role": "PIRATE"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Validation);
        assert_eq!(err.message, "Invalid role");
        assert_eq!(err.status, Some(400));
    }

    #[tokio::test]
    async fn server_error_and_unauthorized_are_classified() {
        let router = Router::new()
            .route(
                "/api/trips",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route("/api/bookings", get(|| async { StatusCode::UNAUTHORIZED }));
        let store = store(serve(router).await, Session::with_token("t"));

        let err = store.list(EntityType::Trips).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Server);

        let err = store.list(EntityType::Bookings).await.unwrap_err();
        assert!(err.requires_login());
    }

    #[tokio::test]
    async fn empty_delete_response_is_ok() {
        let router = Router::new().route(
            "/api/admin/boats/:id",
            delete(|Path(_id): Path<i64>| async { StatusCode::NO_CONTENT }),
        );
        let store = store(serve(router).await, Session::with_token("t"));

        store.delete(EntityType::Boats, 8).await.expect("delete");
    }

    #[tokio::test]
    async fn missing_token_never_reaches_the_network() {
        // Port 9 (discard) is never contacted: the precondition fires first.
        let store = store("http://127.0.0.1:9".into(), Session::anonymous());
        let route = Endpoints::route(EntityType::Guides, Operation::List, None).unwrap();
        let err = store.execute(&route, None).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Precondition);
    }

    #[tokio::test]
    async fn refused_connection_is_network_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let store = store(format!("http://{}", addr), Session::with_token("t"));
        let err = store.list(EntityType::Boats).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Network);
    }

    #[tokio::test]
    async fn get_returns_the_record_or_not_found() {
        let router = Router::new().route(
            "/api/bookings/:id",
            get(|Path(id): Path<i64>| async move {
                match id {
                    4 => Json(json!({"bookingId": 4, "status": "CONFIRMED"})).into_response(),
                    5 => StatusCode::OK.into_response(),
                    _ => StatusCode::NOT_FOUND.into_response(),
                }
            }),
        );
        let store = store(serve(router).await, Session::with_token("t"));

        let booking = store.get(EntityType::Bookings, 4).await.expect("get");
        assert_eq!(booking.id(), 4);
        assert_eq!(booking.status().as_deref(), Some("CONFIRMED"));

        let err = store.get(EntityType::Bookings, 5).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);

        let err = store.get(EntityType::Bookings, 6).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);
        assert_eq!(err.status, Some(404));
    }

    #[tokio::test]
    async fn slow_backend_times_out_as_network_failure() {
        let router = Router::new().route(
            "/api/guides",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                Json(json!([]))
            }),
        );
        let store = store_with_timeout(serve(router).await, Session::with_token("t"), 1);

        let err = store.list(EntityType::Guides).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Network);
        assert!(err.status.is_none());
    }

    #[tokio::test]
    async fn available_boats_come_from_the_public_list() {
        let router = Router::new()
            .route(
                "/api/boats",
                get(|| async {
                    Json(json!([
                        {"boatId": 1, "boatName": "Orca", "status": "AVAILABLE"},
                        {"boatId": 2, "boatName": "Dawn", "status": "ASSIGNED"}
                    ]))
                }),
            )
            .route("/api/admin/boats", get(|| async { StatusCode::FORBIDDEN }));
        let store = store(serve(router).await, Session::with_token("staff-token"));

        let boats = store.list_available(EntityType::Boats).await.expect("boats");
        assert_eq!(boats.iter().map(|b| b.id()).collect::<Vec<_>>(), vec![1, 2]);

        let err = store.list(EntityType::Boats).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Unauthorized);
    }

    #[tokio::test]
    async fn error_status_wins_over_body() {
        let router = Router::new().route(
            "/api/staff/all",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "<html>down</html>") }),
        );
        let store = store(serve(router).await, Session::with_token("t"));

        let err = store.list(EntityType::Staff).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Server);
        assert_eq!(err.status, Some(503));
    }

    #[tokio::test]
    async fn truncated_error_body_keeps_the_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            // Promise 64 body bytes, send 8, then hang up
            let _ = socket
                .write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 64\r\n\r\n{\"error\"")
                .await;
        });

        let store = store(format!("http://{}", addr), Session::with_token("t"));
        let err = store.list(EntityType::Trips).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Server);
        assert_eq!(err.status, Some(502));
    }
}
