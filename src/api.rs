//! Typed client for the Campus Connect REST API.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::{
    AuthRequest, AuthResponse, Category, CategoryRequest, CheckoutReceipt, Event, EventRequest,
    RegistrationOrder, SignupRequest, UploadResponse, User,
};

/// Errors surfaced by API calls.
///
/// Server-provided `message` text is trusted display text and carried
/// through verbatim; everything else gets a generic description.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The token was missing, expired, or rejected.
    #[error("not authenticated")]
    Unauthorized,
    /// Any non-401 error status, with the server's message when present.
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// HTTP client bound to one API base URL and, optionally, one session.
pub struct Api {
    base: Url,
    http: reqwest::Client,
    token: Option<String>,
    verbose: bool,
}

impl Api {
    /// Build a client. `token` is attached as a bearer credential to
    /// every request when present; `timeout` bounds each request,
    /// including payment verification.
    pub fn new(
        base: &str,
        token: Option<String>,
        timeout: Duration,
        verbose: bool,
    ) -> Result<Self, ApiError> {
        let base = base.parse::<Url>()?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base,
            http,
            token,
            verbose,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and map the response status onto [`ApiError`].
    async fn send(&self, method: &str, path: &str, builder: RequestBuilder) -> Result<Response, ApiError> {
        let resp = self.authorize(builder).send().await?;
        let status = resp.status();
        if self.verbose {
            println!("[api] {} {} -> {}", method, path, status.as_u16());
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let resp = self.send("GET", path, self.http.get(url)).await?;
        Ok(resp.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let resp = self
            .send("POST", path, self.http.post(url).json(body))
            .await?;
        Ok(resp.json().await?)
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let resp = self.send("POST", path, self.http.post(url)).await?;
        Ok(resp.json().await?)
    }

    async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let resp = self
            .send("PUT", path, self.http.put(url).json(body))
            .await?;
        Ok(resp.json().await?)
    }

    async fn delete(&self, path: &str) -> Result<String, ApiError> {
        let url = self.url(path)?;
        let resp = self.send("DELETE", path, self.http.delete(url)).await?;
        Ok(resp.text().await.unwrap_or_default())
    }

    // --- auth ---

    pub async fn login(&self, request: &AuthRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("/api/auth/login", request).await
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("/api/auth/register", request).await
    }

    // --- public catalog ---

    pub async fn events(&self) -> Result<Vec<Event>, ApiError> {
        self.get_json("/api/public/events").await
    }

    pub async fn upcoming_events(&self) -> Result<Vec<Event>, ApiError> {
        self.get_json("/api/public/events/upcoming").await
    }

    pub async fn event(&self, id: u64) -> Result<Event, ApiError> {
        self.get_json(&format!("/api/public/events/{id}")).await
    }

    pub async fn events_by_category(&self, category_id: u64) -> Result<Vec<Event>, ApiError> {
        self.get_json(&format!("/api/public/events/category/{category_id}"))
            .await
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_json("/api/public/categories").await
    }

    /// Fetch events and categories concurrently; neither read orders
    /// before the other.
    pub async fn catalog(&self) -> Result<(Vec<Event>, Vec<Category>), ApiError> {
        tokio::try_join!(self.events(), self.categories())
    }

    // --- user ---

    pub async fn register(&self, event_id: u64) -> Result<RegistrationOrder, ApiError> {
        self.post_empty(&format!("/api/user/events/{event_id}/register"))
            .await
    }

    pub async fn unregister(&self, event_id: u64) -> Result<String, ApiError> {
        self.delete(&format!("/api/user/events/{event_id}/unregister"))
            .await
    }

    pub async fn my_events(&self) -> Result<Vec<Event>, ApiError> {
        self.get_json("/api/user/my-events").await
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        self.get_json("/api/user/profile").await
    }

    // --- payment ---

    /// Forward a checkout receipt to server-side verification. The three
    /// gateway fields are sent exactly as received.
    pub async fn verify_payment(&self, receipt: &CheckoutReceipt) -> Result<(), ApiError> {
        let _: serde_json::Value = self.post_json("/api/payment/verify", receipt).await?;
        Ok(())
    }

    // --- admin ---

    pub async fn create_event(&self, request: &EventRequest) -> Result<Event, ApiError> {
        self.post_json("/api/admin/events", request).await
    }

    pub async fn update_event(&self, id: u64, request: &EventRequest) -> Result<Event, ApiError> {
        self.put_json(&format!("/api/admin/events/{id}"), request)
            .await
    }

    pub async fn delete_event(&self, id: u64) -> Result<(), ApiError> {
        self.delete(&format!("/api/admin/events/{id}")).await?;
        Ok(())
    }

    pub async fn attendees(&self, event_id: u64) -> Result<Vec<User>, ApiError> {
        self.get_json(&format!("/api/admin/events/{event_id}/attendees"))
            .await
    }

    pub async fn create_category(&self, request: &CategoryRequest) -> Result<Category, ApiError> {
        self.post_json("/api/admin/categories", request).await
    }

    pub async fn update_category(
        &self,
        id: u64,
        request: &CategoryRequest,
    ) -> Result<Category, ApiError> {
        self.put_json(&format!("/api/admin/categories/{id}"), request)
            .await
    }

    pub async fn delete_category(&self, id: u64) -> Result<(), ApiError> {
        self.delete(&format!("/api/admin/categories/{id}")).await?;
        Ok(())
    }

    /// Upload a poster image as multipart form data.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResponse, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let url = self.url("/api/admin/upload")?;
        let resp = self
            .send("POST", "/api/admin/upload", self.http.post(url).multipart(form))
            .await?;
        Ok(resp.json().await?)
    }
}
