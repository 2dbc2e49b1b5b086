//! HTTP implementation of the Cart Service against the bookstore backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};

use bookstore_cart::{CartLines, Quantity};
use bookstore_core::{BookId, CartItemId, UserId};

use super::dto::{CartEnvelope, CartPayload};
use super::{CartService, RemoteError};
use crate::config::ClientConfig;
use crate::session::Identity;

/// Cart Service client speaking JSON over HTTP.
///
/// Routes (relative to the configured API URL):
/// - `GET    /api/cart/user/{userId}`
/// - `POST   /api/cart/user/{userId}`
/// - `POST   /api/cart/user/{userId}/items?bookId=&quantity=`
/// - `PUT    /api/cart/user/{userId}/items/{cartItemId}?quantity=`
/// - `DELETE /api/cart/user/{userId}/items/{cartItemId}`
/// - `DELETE /api/cart/user/{userId}`
#[derive(Debug, Clone)]
pub struct HttpCartService {
    client: reqwest::Client,
    api_url: String,
    request_timeout: Duration,
}

impl HttpCartService {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self::with_client(
            client,
            config.api_url.clone(),
            config.request_timeout,
        ))
    }

    /// Use an existing `reqwest` client (shared connection pool, custom TLS...).
    ///
    /// `request_timeout` should match the timeout the client was built with;
    /// it is only used to report timeouts.
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn cart_url(&self, user_id: UserId) -> String {
        format!("{}/api/cart/user/{}", self.api_url, user_id)
    }

    fn item_url(&self, user_id: UserId, item_id: CartItemId) -> Result<String, RemoteError> {
        let server_id = item_id
            .server_id()
            .ok_or(RemoteError::LocalItemId(item_id))?;
        Ok(format!("{}/items/{}", self.cart_url(user_id), server_id))
    }

    fn request(&self, method: Method, url: &str, identity: &Identity) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(identity.auth_token.expose())
    }

    fn transport_error(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.request_timeout)
        } else {
            RemoteError::Network(err.to_string())
        }
    }

    /// Send and decode the response envelope.
    async fn send(&self, req: RequestBuilder) -> Result<CartEnvelope, RemoteError> {
        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Api {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<CartEnvelope>()
            .await
            .map_err(|e| RemoteError::Parse(format!("failed to decode cart response: {e}")))
    }
}

#[async_trait]
impl CartService for HttpCartService {
    async fn fetch_cart(&self, identity: &Identity) -> Result<Option<CartLines>, RemoteError> {
        let url = self.cart_url(identity.user_id);
        tracing::debug!(user_id = %identity.user_id, "fetching cart");

        let envelope = match self.send(self.request(Method::GET, &url, identity)).await {
            Ok(envelope) => envelope,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        match envelope.into_payload()? {
            CartPayload::Missing => Ok(None),
            CartPayload::WithoutItemList { cart_id } => {
                tracing::debug!(?cart_id, "cart has no item list; treating as empty");
                Ok(Some(CartLines::new()))
            }
            CartPayload::Lines { lines, .. } => Ok(Some(lines)),
        }
    }

    async fn create_cart(&self, identity: &Identity) -> Result<CartLines, RemoteError> {
        let url = self.cart_url(identity.user_id);
        tracing::debug!(user_id = %identity.user_id, "creating cart");
        self.send(self.request(Method::POST, &url, identity))
            .await?
            .into_lines()
    }

    async fn add_item(
        &self,
        identity: &Identity,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<CartLines, RemoteError> {
        let url = format!("{}/items", self.cart_url(identity.user_id));
        tracing::debug!(user_id = %identity.user_id, %book_id, %quantity, "adding cart item");
        let req = self
            .request(Method::POST, &url, identity)
            .query(&[("bookId", book_id.get()), ("quantity", i64::from(quantity.get()))]);
        self.send(req).await?.into_lines()
    }

    async fn update_item_quantity(
        &self,
        identity: &Identity,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartLines, RemoteError> {
        let url = self.item_url(identity.user_id, item_id)?;
        tracing::debug!(user_id = %identity.user_id, %item_id, %quantity, "updating cart item quantity");
        let req = self
            .request(Method::PUT, &url, identity)
            .query(&[("quantity", quantity.get())]);
        self.send(req).await?.into_lines()
    }

    async fn remove_item(
        &self,
        identity: &Identity,
        item_id: CartItemId,
    ) -> Result<CartLines, RemoteError> {
        let url = self.item_url(identity.user_id, item_id)?;
        tracing::debug!(user_id = %identity.user_id, %item_id, "removing cart item");
        self.send(self.request(Method::DELETE, &url, identity))
            .await?
            .into_lines()
    }

    async fn clear_cart(&self, identity: &Identity) -> Result<CartLines, RemoteError> {
        let url = self.cart_url(identity.user_id);
        tracing::debug!(user_id = %identity.user_id, "clearing cart");
        self.send(self.request(Method::DELETE, &url, identity))
            .await?
            .into_lines()
    }
}
