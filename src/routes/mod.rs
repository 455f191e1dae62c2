/// Application routes configuration
use crate::handlers::{health, not_found, proxy, AppState};
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router: health, one GET route per table entry, JSON 404 otherwise
pub fn build_router(state: AppState, allowed_origin: Option<HeaderValue>) -> Router {
    let mut router = Router::new().route("/api/health", get(health));
    for route in state.routes.iter() {
        router = router.route(route.path, get(proxy));
    }

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));
    if let Some(origin) = allowed_origin {
        cors = cors.allow_origin(origin);
    }

    router
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::UpstreamClient;
    use crate::config::{Credential, UpstreamBases};
    use crate::domain::RouteTable;
    use crate::services::GatewayService;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use std::sync::Arc;
    use tokio::time::Instant;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_with(upstream: &str, credential: Credential, timeout: Duration) -> Router {
        let bases = UpstreamBases::parse(upstream, upstream).unwrap();
        let client = UpstreamClient::new(timeout).unwrap();
        let state = AppState {
            gateway: Arc::new(GatewayService::new(client, bases, credential)),
            routes: Arc::new(RouteTable::standard()),
        };
        build_router(state, HeaderValue::from_str("http://localhost:5173").ok())
    }

    fn app(upstream: &str) -> Router {
        app_with(upstream, Credential::new("test-key"), Duration::from_secs(2))
    }

    async fn send_get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_ok_without_credential() {
        let app = app_with("http://127.0.0.1:9", Credential::demo(), Duration::from_secs(1));
        let response = send_get(app, "/api/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let response = send_get(app("http://127.0.0.1:9"), "/api/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, r#"{"error":"route not found"}"#);
    }

    #[tokio::test]
    async fn test_missing_required_params_never_reach_upstream() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        for uri in [
            "/api/mars-photos?earth_date=2015-06-03",
            "/api/mars-photos?rover=curiosity",
            "/api/epic",
            "/api/neo",
            "/api/neo?end_date=2024-06-01",
            "/api/library",
            "/api/library?q=",
        ] {
            let response = send_get(app(&mock_server.uri()), uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body: serde_json::Value =
                serde_json::from_str(&body_string(response).await).unwrap();
            assert!(body.get("error").and_then(|e| e.as_str()).is_some(), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_neo_forwards_end_date_from_start_date() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/neo/rest/v1/feed"))
            .and(query_param("start_date", "2024-06-01"))
            .and(query_param("end_date", "2024-06-01"))
            .and(query_param("api_key", "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"near_earth_objects":{}}"#, "application/json"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = send_get(app(&mock_server.uri()), "/api/neo?start_date=2024-06-01").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_success_body_is_byte_for_byte() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/planetary/apod"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"x":1}"#, "application/json"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = send_get(app(&mock_server.uri()), "/api/apod").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn test_upstream_500_is_502() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/EPIC/api/natural/date/2024-06-01"))
            .respond_with(ResponseTemplate::new(500).set_body_string("api_key=test-key invalid"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = send_get(app(&mock_server.uri()), "/api/epic?date=2024-06-01").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_string(response).await,
            r#"{"error":"upstream request failed"}"#
        );
    }

    #[tokio::test]
    async fn test_upstream_timeout_is_504() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let app = app_with(
            &mock_server.uri(),
            Credential::new("test-key"),
            Duration::from_millis(50),
        );
        let response = send_get(app, "/api/library?q=moon").await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            body_string(response).await,
            r#"{"error":"upstream request timed out"}"#
        );
    }

    #[tokio::test]
    async fn test_caller_cannot_override_credential() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mars-photos/api/v1/rovers/curiosity/photos"))
            .and(query_param("earth_date", "2015-06-03"))
            .and(query_param("page", "1"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"photos":[]}"#, "application/json"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = send_get(
            app(&mock_server.uri()),
            "/api/mars-photos?rover=curiosity&earth_date=2015-06-03&page=1&api_key=stolen",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"photos":[]}"#);
    }

    #[tokio::test]
    async fn test_library_sends_media_type_without_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "apollo 11"))
            .and(query_param("media_type", "image,video"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"collection":{}}"#, "application/json"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = send_get(app(&mock_server.uri()), "/api/library?q=apollo%2011").await;
        assert_eq!(response.status(), StatusCode::OK);

        let requests = mock_server.received_requests().await.unwrap();
        assert!(requests
            .iter()
            .all(|r| !r.url.query_pairs().any(|(k, _)| k == "api_key")));
    }

    #[tokio::test]
    async fn test_slow_route_does_not_block_others() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/planetary/apod"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&mock_server)
            .await;

        let app = app(&mock_server.uri());
        let slow = tokio::spawn(send_get(app.clone(), "/api/apod"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        let fast = send_get(app, "/api/library?q=mars").await;
        assert_eq!(fast.status(), StatusCode::OK);
        assert!(started.elapsed() < Duration::from_millis(600));

        assert_eq!(slow.await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_get_on_known_path_is_rejected() {
        let response = app("http://127.0.0.1:9")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/apod")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
