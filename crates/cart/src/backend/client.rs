//! HTTP client for the backend product, inventory and order services.
//!
//! Uses `reqwest` for HTTP. Products fetched by id are cached using `moka`
//! with the TTL from [`BackendConfig`]; listings, inventory and orders are
//! never cached.

use std::sync::Arc;

use async_trait::async_trait;
use cartwheel_core::{
    CreateOrderRequest, InventoryItem, Order, OrderId, Product, ProductFilters, ProductId,
    ProductPage,
};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use super::{BackendError, InventorySource, OrderService, ProductSource};
use crate::config::BackendConfig;

const PRODUCT_CACHE_CAPACITY: u64 = 1000;

/// Client for the backend services.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
    products: Cache<ProductId, Product>,
}

/// Error payload returned by the backend.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl BackendClient {
    /// Create a new backend client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let products = Cache::builder()
            .max_capacity(PRODUCT_CACHE_CAPACITY)
            .time_to_live(config.product_cache_ttl)
            .build();

        Self {
            inner: Arc::new(BackendClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                api_token: config.api_token.clone(),
                products,
            }),
        }
    }

    /// Build `{base_url}/{segments...}`, escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode a JSON response.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<T, BackendError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(resource.to_string()));
        }

        if !status.is_success() {
            let message = error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.message.or(parsed.error).filter(|m| !m.is_empty())
}

#[async_trait]
impl ProductSource for BackendClient {
    #[instrument(skip(self), fields(id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        if let Some(product) = self.inner.products.get(id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let url = self.endpoint(&["products", id.as_str()])?;
        let product: Product = self
            .send(
                self.inner.client.get(url),
                &format!("Product not found: {id}"),
            )
            .await?;

        self.inner
            .products
            .insert(id.clone(), product.clone())
            .await;

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list_products(&self, filters: &ProductFilters) -> Result<ProductPage, BackendError> {
        let mut url = self.endpoint(&["products"])?;
        if !filters.is_empty() {
            url.query_pairs_mut().extend_pairs(filters.query_pairs());
        }
        let page: ProductPage = self
            .send(self.inner.client.get(url), "Products endpoint")
            .await?;
        debug!(count = page.products.len(), "Listed products");
        Ok(page)
    }
}

#[async_trait]
impl InventorySource for BackendClient {
    /// Unknown SKUs come back as an out-of-stock record rather than an
    /// error.
    #[instrument(skip(self))]
    async fn get_inventory(&self, sku: &str) -> Result<InventoryItem, BackendError> {
        let url = self.endpoint(&["inventory", sku])?;
        match self
            .send(
                self.inner.client.get(url),
                &format!("Inventory not found: {sku}"),
            )
            .await
        {
            Err(BackendError::NotFound(_)) => {
                info!("Unknown SKU, reporting out of stock");
                Ok(InventoryItem::out_of_stock(sku))
            }
            result => result,
        }
    }
}

#[async_trait]
impl OrderService for BackendClient {
    #[instrument(skip(self, request), fields(lines = request.order_line_items_dto_list.len()))]
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, BackendError> {
        let url = self.endpoint(&["orders"])?;
        let order: Order = self
            .send(self.inner.client.post(url).json(request), "Order endpoint")
            .await?;
        debug!(order_id = %order.id, "Order created");
        Ok(order)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_order(&self, id: &OrderId) -> Result<Order, BackendError> {
        let url = self.endpoint(&["orders", id.as_str()])?;
        self.send(
            self.inner.client.get(url),
            &format!("Order not found: {id}"),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_orders(&self) -> Result<Vec<Order>, BackendError> {
        let url = self.endpoint(&["orders"])?;
        self.send(self.inner.client.get(url), "Orders endpoint")
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use cartwheel_core::{OrderLineItem, StockStatus};
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    fn config(base: &str, token: Option<&str>) -> BackendConfig {
        BackendConfig {
            base_url: Url::parse(base).unwrap(),
            api_token: token.map(SecretString::from),
            product_cache_ttl: Duration::from_secs(300),
        }
    }

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&config(base, None))
    }

    /// Serve `app` on an ephemeral port and return its `/api` base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/api")
    }

    fn mug(id: &str) -> Value {
        json!({"id": id, "name": "Mug", "price": "4.50", "sku": "MUG"})
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let client = client("http://localhost:8080/api/");
        let url = client.endpoint(&["products", "42"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/products/42");
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let client = client("http://localhost:8080/api");
        let url = client.endpoint(&["inventory", "SKU-1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/inventory/SKU-1");
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let client = client("http://localhost:8080");
        let url = client.endpoint(&["products", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/products/a%2Fb%20c");
    }

    #[test]
    fn test_error_message_prefers_message() {
        assert_eq!(
            error_message(r#"{"message":"out of stock","error":"Conflict"}"#).as_deref(),
            Some("out of stock")
        );
        assert_eq!(
            error_message(r#"{"error":"Bad Request"}"#).as_deref(),
            Some("Bad Request")
        );
        assert_eq!(error_message("<html>oops</html>"), None);
        assert_eq!(error_message(r#"{"message":""}"#), None);
    }

    #[tokio::test]
    async fn test_product_is_cached_after_first_fetch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/api/products/{id}",
            get(move |Path(id): Path<String>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(mug(&id))
                }
            }),
        );
        let client = client(&serve(app).await);

        let first = client.get_product(&ProductId::new("7")).await.unwrap();
        let second = client.get_product(&ProductId::new("7")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.price, Decimal::new(450, 2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let app = Router::new().route(
            "/api/products/{id}",
            get(|| async { StatusCode::NOT_FOUND }),
        );
        let client = client(&serve(app).await);
        assert!(matches!(
            client.get_product(&ProductId::new("404")).await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failure_status_carries_body_message() {
        let app = Router::new().route(
            "/api/orders",
            get(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"message": "maintenance"})),
                )
            }),
        );
        let client = client(&serve(app).await);
        match client.list_orders().await {
            Err(BackendError::Status { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_body_is_parse_error() {
        let app = Router::new().route("/api/orders/{id}", get(|| async { "not json" }));
        let client = client(&serve(app).await);
        assert!(matches!(
            client.get_order(&OrderId::new("1")).await,
            Err(BackendError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let app = Router::new().route(
            "/api/orders",
            get(|headers: HeaderMap| async move {
                let token = headers.get("authorization").and_then(|v| v.to_str().ok());
                if token == Some("Bearer s3cret") {
                    Json(json!([{"id": 1, "status": "delivered"}])).into_response()
                } else {
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }),
        );
        let base = serve(app).await;

        let authorized = BackendClient::new(&config(&base, Some("s3cret")));
        let orders = authorized.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id.as_str(), "1");

        assert!(matches!(
            client(&base).list_orders().await,
            Err(BackendError::Status { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_sku_is_out_of_stock() {
        let app = Router::new().route(
            "/api/inventory/{sku}",
            get(|Path(sku): Path<String>| async move {
                if sku == "MUG" {
                    Json(json!({"sku": "MUG", "quantity": 40, "reservedQuantity": 5}))
                        .into_response()
                } else {
                    StatusCode::NOT_FOUND.into_response()
                }
            }),
        );
        let client = client(&serve(app).await);

        let known = client.stock_status("MUG", None).await.unwrap();
        assert_eq!(known.quantity, 35);
        assert_eq!(known.status, StockStatus::InStock);

        let unknown = client
            .stock_status("GONE", Some(ProductId::new("9")))
            .await
            .unwrap();
        assert_eq!(unknown.quantity, 0);
        assert_eq!(unknown.status, StockStatus::OutOfStock);
        assert_eq!(unknown.product_id.as_str(), "9");
    }

    #[tokio::test]
    async fn test_list_products_sends_filters() {
        let app = Router::new().route(
            "/api/products",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let category = params.get("category").cloned().unwrap_or_default();
                let search = params.get("search").cloned().unwrap_or_default();
                let name = format!("{category}:{search}");
                Json(json!([{"id": 1, "name": name, "price": 1}]))
            }),
        );
        let client = client(&serve(app).await);

        let filters = ProductFilters {
            category: Some("Kitchen".to_string()),
            search: Some("blue mug".to_string()),
            ..ProductFilters::default()
        };
        let page = client.list_products(&filters).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.products[0].name, "Kitchen:blue mug");
    }

    #[tokio::test]
    async fn test_create_order_posts_line_items() {
        let app = Router::new().route(
            "/api/orders",
            axum::routing::post(|Json(body): Json<Value>| async move {
                let lines = body["orderLineItemsDtoList"].as_array().map_or(0, Vec::len);
                Json(json!({"id": 77, "status": "pending", "total": lines}))
            }),
        );
        let client = client(&serve(app).await);

        let request = CreateOrderRequest {
            order_line_items_dto_list: vec![OrderLineItem {
                sku: "MUG".to_string(),
                price: Decimal::from(4),
                quantity: 2,
                product_id: ProductId::new("1"),
            }],
            shipping_address: None,
        };
        let order = client.create_order(&request).await.unwrap();
        assert_eq!(order.id.as_str(), "77");
        assert_eq!(order.total, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_orders_are_listed_and_fetched_by_id() {
        let app = Router::new()
            .route(
                "/api/orders",
                get(|| async { Json(json!([{"id": 1, "total": "9"}, {"id": 2, "total": "4"}])) }),
            )
            .route(
                "/api/orders/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "1" {
                        Json(json!({"id": 1, "total": "9", "status": "shipped"})).into_response()
                    } else {
                        StatusCode::NOT_FOUND.into_response()
                    }
                }),
            );
        let client = client(&serve(app).await);

        let orders = client.list_orders().await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].total, Decimal::from(4));

        let order = client.get_order(&OrderId::new("1")).await.unwrap();
        assert_eq!(order.total, Decimal::from(9));

        let missing = client.get_order(&OrderId::new("5")).await;
        assert!(matches!(missing, Err(BackendError::NotFound(_))));
    }
}
