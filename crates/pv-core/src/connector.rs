//! Authenticated HTTP handle bound to one administrative endpoint.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Lookup, ProvisionError, ProvisionResult, TokenSource};

/// Authenticated client for one remote endpoint.
///
/// Authentication is lazy: the token source is first consulted when the
/// first request is issued.
#[derive(Clone)]
pub struct Connector {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl Connector {
    /// Creates a connector for `base_url` using the transport's default timeouts.
    pub fn new(base_url: &str, tokens: Arc<dyn TokenSource>) -> ProvisionResult<Self> {
        Self::with_client(base_url, tokens, reqwest::Client::new())
    }

    /// Creates a connector with a caller-supplied HTTP client.
    pub fn with_client(
        base_url: &str,
        tokens: Arc<dyn TokenSource>,
        http: reqwest::Client,
    ) -> ProvisionResult<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| ProvisionError::Config(format!("invalid endpoint '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProvisionError::Config(format!(
                "unsupported endpoint scheme '{}' in '{base_url}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a path against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn request(&self, method: Method, path: &str) -> ProvisionResult<RequestBuilder> {
        tracing::debug!(%method, path, "admin request");
        let token = self.tokens.token().await?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    /// Makes a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ProvisionResult<T> {
        let response = self.request(Method::GET, path).await?.send().await?;
        handle_response(response).await
    }

    /// Makes a GET request, mapping 404 to [`Lookup::NotFound`].
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> ProvisionResult<Lookup<T>> {
        let response = self.request(Method::GET, path).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        handle_response(response).await.map(Lookup::Found)
    }

    /// Makes a POST request without response body.
    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ProvisionResult<()> {
        let response = self.request(Method::POST, path).await?.json(body).send().await?;
        handle_empty_response(response).await
    }

    /// Makes a POST request and returns the last segment of the `Location` header.
    pub async fn post_json_for_location<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ProvisionResult<Option<String>> {
        let response = self.request(Method::POST, path).await?.json(body).send().await?;
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim_end_matches('/').rsplit('/').next())
            .map(str::to_string);
        handle_empty_response(response).await?;
        Ok(location)
    }

    /// Makes a PUT request, discarding any response body.
    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ProvisionResult<()> {
        let response = self.request(Method::PUT, path).await?.json(body).send().await?;
        handle_empty_response(response).await
    }

    /// Makes a DELETE request.
    pub async fn delete(&self, path: &str) -> ProvisionResult<()> {
        let response = self.request(Method::DELETE, path).await?.send().await?;
        handle_empty_response(response).await
    }

    /// Makes a DELETE request, mapping 404 to [`Lookup::NotFound`].
    pub async fn delete_optional(&self, path: &str) -> ProvisionResult<Lookup<()>> {
        let response = self.request(Method::DELETE, path).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        handle_empty_response(response).await.map(Lookup::Found)
    }
}

/// Handles a response with a body.
async fn handle_response<T: DeserializeOwned>(response: Response) -> ProvisionResult<T> {
    let status = response.status();

    if status.is_success() {
        Ok(response.json().await?)
    } else {
        Err(api_error(status, response).await)
    }
}

/// Handles a response without a body.
async fn handle_empty_response(response: Response) -> ProvisionResult<()> {
    let status = response.status();

    if status.is_success() {
        Ok(())
    } else {
        Err(api_error(status, response).await)
    }
}

async fn api_error(status: StatusCode, response: Response) -> ProvisionError {
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    ProvisionError::Api {
        status: status.as_u16(),
        message,
    }
}
