use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{
    response::{ApiError, ApiResult, Envelope},
    ApiState,
};
use crate::{
    domain::{OptimizationResult, PackSize, Reload, MAX_ITEMS_ORDERED},
    util::{assets, version::version_label},
};

#[derive(Debug, Deserialize)]
pub struct AddSizeRequest {
    pub size: i64,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub items_ordered: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub version: String,
    /// Sizes the optimizer is currently answering with, descending.
    pub sizes: Vec<PackSize>,
}

/// Run blocking optimizer work off the async executor.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::internal(format!("worker failed: {err}")))
}

fn positive(value: i64, field: &str) -> ApiResult<PackSize> {
    if value <= 0 {
        return Err(ApiError::bad_request(format!("{field} must be greater than 0")));
    }
    Ok(value as PackSize)
}

const STALE_WARNING: &str = "pack sizes stored but not reloaded; orders use the previous sizes";

fn stale_header() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::WARNING,
        HeaderValue::from_static("199 - \"pack sizes stored but not reloaded\""),
    );
    headers
}

pub async fn index(State(state): State<ApiState>) -> Html<String> {
    Html(assets::index_html(&state.backend_url))
}

pub async fn health(State(state): State<ApiState>) -> Json<Envelope<HealthData>> {
    Json(Envelope::data(HealthData {
        version: version_label(),
        sizes: state.optimizer.snapshot(),
    }))
}

/// `GET /v1/packs`
pub async fn list_packs(State(state): State<ApiState>) -> ApiResult<Json<Envelope<Vec<PackSize>>>> {
    let optimizer = state.optimizer.clone();
    let sizes = blocking(move || optimizer.sizes()).await??;
    if sizes.is_empty() {
        return Err(ApiError::not_found("no sizes found"));
    }
    Ok(Json(Envelope::data(sizes)))
}

/// `POST /v1/packs`
pub async fn add_pack(
    State(state): State<ApiState>,
    payload: Result<Json<AddSizeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<()>>)> {
    let Json(request) =
        payload.map_err(|_| ApiError::bad_request("invalid or missing pack size"))?;
    let size = positive(request.size, "size")?;

    let optimizer = state.optimizer.clone();
    let message = match blocking(move || optimizer.add_size(size)).await?? {
        Reload::Fresh => "size added successfully".to_string(),
        Reload::Stale(err) => {
            format!("size added successfully; warning: {STALE_WARNING} ({err})")
        }
    };

    Ok((StatusCode::CREATED, Json(Envelope::message(message))))
}

/// `DELETE /v1/packs/:size`
pub async fn delete_pack(
    State(state): State<ApiState>,
    size: Result<Path<i64>, PathRejection>,
) -> ApiResult<(StatusCode, HeaderMap)> {
    let Path(size) = size.map_err(|_| ApiError::bad_request("invalid pack size"))?;
    let size = positive(size, "size")?;

    let optimizer = state.optimizer.clone();
    let headers = match blocking(move || optimizer.remove_size(size)).await?? {
        Reload::Fresh => HeaderMap::new(),
        Reload::Stale(_) => stale_header(),
    };

    Ok((StatusCode::NO_CONTENT, headers))
}

/// `POST /v1/order`
pub async fn calculate_order(
    State(state): State<ApiState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<Json<OptimizationResult>> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("invalid request body"))?;
    positive(request.items_ordered, "items_ordered")?;
    if request.items_ordered > MAX_ITEMS_ORDERED {
        return Err(ApiError::bad_request(format!(
            "items_ordered must not exceed {MAX_ITEMS_ORDERED}"
        )));
    }

    let optimizer = state.optimizer.clone();
    let result = blocking(move || optimizer.calculate(request.items_ordered)).await?;
    Ok(Json(result))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("route not found")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        api::router,
        domain::{PackOptimizer, SizeRegistry},
        infra::{store::testing::FlakyStore, KeyValueStore, MemoryStore},
    };

    fn router_over(store: Arc<dyn KeyValueStore>) -> Router {
        let registry = SizeRegistry::open(store).unwrap();
        router(ApiState {
            optimizer: Arc::new(PackOptimizer::new(registry)),
            backend_url: Arc::from("http://localhost:8080/v1"),
        })
    }

    /// Router over {250, 500, 1000}.
    fn test_router() -> Router {
        let store = Arc::new(MemoryStore::new());
        let registry = SizeRegistry::open(store.clone()).unwrap();
        registry.remove(2000).unwrap();
        registry.remove(5000).unwrap();
        router_over(store)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&body).into_owned())
            })
        };
        (status, value)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_version_and_snapshot() {
        let router = test_router();
        let (status, body) = send(&router, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["version"], version_label());
        assert_eq!(body["data"]["sizes"], json!([1000, 500, 250]));
    }

    #[tokio::test]
    async fn list_packs_returns_sizes() {
        let router = test_router();
        let (status, body) = send(&router, get("/v1/packs")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "success", "data": [250, 500, 1000]}));
    }

    #[tokio::test]
    async fn list_packs_empty_is_not_found() {
        let router = test_router();
        for size in [250, 500, 1000] {
            let (status, _) = send(&router, delete(&format!("/v1/packs/{size}"))).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (status, body) = send(&router, get("/v1/packs")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"status": "error", "message": "no sizes found"}));

        let (status, body) = send(&router, post_json("/v1/order", json!({"items_ordered": 10}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"packs": [], "total_items": 0, "total_packs": 0}));
    }

    #[tokio::test]
    async fn add_pack_created_and_idempotent() {
        let router = test_router();
        for _ in 0..2 {
            let (status, body) = send(&router, post_json("/v1/packs", json!({"size": 1500}))).await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["status"], "success");
            assert_eq!(body["message"], "size added successfully");
        }

        let (_, body) = send(&router, get("/v1/packs")).await;
        assert_eq!(body["data"], json!([250, 500, 1000, 1500]));
    }

    #[tokio::test]
    async fn add_pack_validation() {
        let router = test_router();
        for payload in [json!({"size": 0}), json!({"size": -5}), json!({"size": "big"}), json!({})] {
            let (status, body) = send(&router, post_json("/v1/packs", payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["status"], "error");
        }

        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/packs")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_pack_paths() {
        let router = test_router();

        let (status, body) = send(&router, delete("/v1/packs/500")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = send(&router, delete("/v1/packs/500")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "pack size 500 not found");

        let (status, _) = send(&router, delete("/v1/packs/a")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, delete("/v1/packs/-5")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn order_is_optimized() {
        let router = test_router();
        let (status, body) = send(&router, post_json("/v1/order", json!({"items_ordered": 501}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"packs": [500, 250], "total_items": 750, "total_packs": 2}));
    }

    #[tokio::test]
    async fn order_follows_size_changes() {
        let router = test_router();
        let (_, body) = send(&router, post_json("/v1/order", json!({"items_ordered": 251}))).await;
        assert_eq!(body["packs"], json!([500]));

        send(&router, post_json("/v1/packs", json!({"size": 300}))).await;
        let (_, body) = send(&router, post_json("/v1/order", json!({"items_ordered": 251}))).await;
        assert_eq!(body["packs"], json!([300]));

        send(&router, delete("/v1/packs/300")).await;
        let (_, body) = send(&router, post_json("/v1/order", json!({"items_ordered": 251}))).await;
        assert_eq!(body["packs"], json!([500]));
    }

    #[tokio::test]
    async fn order_validation() {
        let router = test_router();
        for payload in [json!({"items_ordered": 0}), json!({"items_ordered": -100}), json!({"items": 5})] {
            let (status, _) = send(&router, post_json("/v1/order", payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/order")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_order_is_rejected() {
        let router = test_router();
        for items in [MAX_ITEMS_ORDERED + 1, i64::MAX] {
            let (status, body) =
                send(&router, post_json("/v1/order", json!({"items_ordered": items}))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body["message"],
                format!("items_ordered must not exceed {MAX_ITEMS_ORDERED}")
            );
        }

        let (status, body) =
            send(&router, post_json("/v1/order", json!({"items_ordered": MAX_ITEMS_ORDERED}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_items"], json!(MAX_ITEMS_ORDERED));
    }

    #[tokio::test]
    async fn stale_reload_is_reported() {
        let store = Arc::new(FlakyStore::default());
        let router = router_over(store.clone());
        store.set_reads_down(true);

        let (status, body) = send(&router, post_json("/v1/packs", json!({"size": 300}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "success");
        assert!(body["message"].as_str().unwrap().contains("warning"));

        let response = router.clone().oneshot(delete("/v1/packs/250")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(header::WARNING));

        store.set_reads_down(false);
        let (status, body) = send(&router, post_json("/v1/packs", json!({"size": 400}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "size added successfully");

        let response = router.clone().oneshot(delete("/v1/packs/400")).await.unwrap();
        assert!(!response.headers().contains_key(header::WARNING));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let router = test_router();
        let (status, body) = send(&router, get("/nonexistent")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"status": "error", "message": "route not found"}));
    }

    #[tokio::test]
    async fn index_points_at_backend() {
        let router = test_router();
        let (status, body) = send(&router, get("/")).await;

        assert_eq!(status, StatusCode::OK);
        let html = body.as_str().unwrap();
        assert!(html.contains("http://localhost:8080/v1"));
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let router = test_router();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/v1/order")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
