//! HTTP client for the remote Rose Shop API.
//!
//! Uses `reqwest` with JSON envelopes. Catalog responses are cached with
//! `moka` (5-minute TTL); cart, session, and order calls always go to the
//! network.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use uuid::Uuid;

use rose_shop_core::{CartItemId, FlowerId};

use crate::config::StorefrontConfig;

use super::cache::CacheValue;
use super::types::{
    Address, AddressUpsert, AuthSession, CartState, Category, Flower, FlowerPage, FlowerQuery,
    Identity, OrderRequest, OrderResult, ProfileUpdate, RegisterRequest, Voucher,
};
use super::wire::{
    AddLineRequest, AuthDto, CartDto, Envelope, FlowerDto, FlowerPageDto, LoginRequest,
    UpdateLineRequest, convert_cart, convert_flower, convert_flower_page,
};
use super::{AddressGateway, ApiError, AuthGateway, CartGateway, OrderGateway, VoucherGateway};

/// Correlation-id header attached to every outgoing request.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Client for the remote Rose Shop API.
///
/// Cheaply cloneable via `Arc`; one instance backs every gateway contract.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    /// Base URL without a trailing slash.
    base_url: String,
    /// Bearer credential installed by the session layer.
    credential: RwLock<Option<SecretString>>,
    cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let base_url = config.api_base_url.as_str().trim_end_matches('/').to_owned();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url,
                credential: RwLock::new(None),
                cache,
            }),
        })
    }

    fn bearer(&self) -> Option<SecretString> {
        self.inner
            .credential
            .read()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }

    /// Execute a request and unwrap the response envelope's payload.
    #[instrument(skip(self, query, body), fields(path = %path))]
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let (status, text) = self.execute(method, path, query, body).await?;

        let envelope: Envelope<T> = serde_json::from_str(&text)?;
        envelope.data.ok_or_else(|| ApiError::Api {
            status: status.as_u16(),
            message: envelope
                .message
                .unwrap_or_else(|| "no data in response".to_owned()),
        })
    }

    /// Execute a request where the envelope payload does not matter.
    #[instrument(skip(self, body), fields(path = %path))]
    async fn send_unit(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), ApiError> {
        self.execute(method, path, None, body).await.map(|_| ())
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<serde_json::Value>,
    ) -> Result<(StatusCode, String), ApiError> {
        let request_id = Uuid::new_v4();
        let url = format!("{}/{path}", self.inner.base_url);

        let mut builder = self
            .inner
            .http
            .request(method, &url)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if let Some(pairs) = query {
            builder = builder.query(pairs);
        }
        if let Some(token) = self.bearer() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(value) = body {
            builder = builder.json(&value);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_owned()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        if !status.is_success() {
            // Surface the envelope's message when the body carries one
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| text.chars().take(200).collect());
            debug!(%request_id, %status, "remote API rejected request");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok((status, text))
    }

    fn to_body<B: serde::Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
        Ok(serde_json::to_value(body)?)
    }

    // =========================================================================
    // Catalog Methods (cached - read-only data)
    // =========================================================================

    /// Get a flower by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the flower is not found or the request fails.
    #[instrument(skip(self), fields(flower_id = %flower_id))]
    pub async fn get_flower(&self, flower_id: FlowerId) -> Result<Flower, ApiError> {
        let cache_key = format!("flower:{flower_id}");

        if let Some(CacheValue::Flower(flower)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for flower");
            return Ok(*flower);
        }

        let dto: FlowerDto = self
            .send(Method::GET, &format!("flowers/{flower_id}"), None, None)
            .await?;
        let flower = convert_flower(dto);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Flower(Box::new(flower.clone())))
            .await;

        Ok(flower)
    }

    /// Get a page of the flower listing.
    ///
    /// Pages without a search term are cached; search results are not.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_flowers(&self, query: &FlowerQuery) -> Result<FlowerPage, ApiError> {
        let cache_key = format!(
            "flowers:{}:{}",
            query.page,
            query.category.map_or_else(String::new, |c| c.to_string())
        );

        if query.search.is_none()
            && let Some(CacheValue::Flowers(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("cache hit for flower listing");
            return Ok(page);
        }

        let mut pairs: Vec<(&str, String)> = vec![("page", query.page.to_string())];
        if let Some(category) = query.category {
            pairs.push(("category", category.to_string()));
        }
        if let Some(search) = &query.search {
            pairs.push(("search", search.clone()));
        }

        let dto: FlowerPageDto = self
            .send(Method::GET, "flowers", Some(&pairs), None)
            .await?;
        let page = convert_flower_page(dto);

        if query.search.is_none() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Flowers(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// List catalog categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let cache_key = "categories".to_owned();

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self.send(Method::GET, "categories", None, None).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

// =============================================================================
// Gateway implementations (not cached - mutable state)
// =============================================================================

impl AuthGateway for ApiClient {
    fn install_credential(&self, credential: Option<SecretString>) {
        if let Ok(mut guard) = self.inner.credential.write() {
            *guard = credential;
        }
    }

    async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<AuthSession, ApiError> {
        let body = Self::to_body(&LoginRequest {
            username_or_email,
            password,
        })?;
        let dto: AuthDto = self
            .send(Method::POST, "auth/login", None, Some(body))
            .await?;
        Ok(AuthSession {
            identity: dto.user,
            token: SecretString::from(dto.token),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, ApiError> {
        let body = Self::to_body(request)?;
        let dto: AuthDto = self
            .send(Method::POST, "auth/register", None, Some(body))
            .await?;
        Ok(AuthSession {
            identity: dto.user,
            token: SecretString::from(dto.token),
        })
    }

    async fn current_identity(&self) -> Result<Identity, ApiError> {
        self.send(Method::GET, "auth/me", None, None).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, ApiError> {
        let body = Self::to_body(update)?;
        self.send(Method::PUT, "users/me", None, Some(body)).await
    }
}

impl CartGateway for ApiClient {
    async fn fetch_cart(&self) -> Result<CartState, ApiError> {
        let dto: CartDto = self.send(Method::GET, "cart", None, None).await?;
        Ok(convert_cart(dto))
    }

    async fn add_line(&self, flower_id: FlowerId, quantity: u32) -> Result<(), ApiError> {
        let body = Self::to_body(&AddLineRequest {
            flower_id,
            quantity,
        })?;
        self.send_unit(Method::POST, "cart/items", Some(body)).await
    }

    async fn update_line(&self, line_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
        let body = Self::to_body(&UpdateLineRequest { quantity })?;
        self.send_unit(Method::PUT, &format!("cart/items/{line_id}"), Some(body))
            .await
    }

    async fn remove_line(&self, line_id: CartItemId) -> Result<(), ApiError> {
        self.send_unit(Method::DELETE, &format!("cart/items/{line_id}"), None)
            .await
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.send_unit(Method::DELETE, "cart", None).await
    }
}

impl VoucherGateway for ApiClient {
    async fn validate_voucher(&self, code: &str) -> Result<Voucher, ApiError> {
        let body = serde_json::json!({ "code": code });
        self.send(Method::POST, "vouchers/validate", None, Some(body))
            .await
    }

    async fn list_vouchers(&self) -> Result<Vec<Voucher>, ApiError> {
        self.send(Method::GET, "vouchers/mine", None, None).await
    }
}

impl AddressGateway for ApiClient {
    async fn list_addresses(&self) -> Result<Vec<Address>, ApiError> {
        self.send(Method::GET, "addresses", None, None).await
    }

    async fn upsert_address(&self, upsert: &AddressUpsert) -> Result<Address, ApiError> {
        let body = Self::to_body(upsert)?;
        self.send(Method::POST, "addresses", None, Some(body)).await
    }
}

impl OrderGateway for ApiClient {
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderResult, ApiError> {
        let body = Self::to_body(request)?;
        self.send(Method::POST, "orders", None, Some(body)).await
    }
}
