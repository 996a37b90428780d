//! Typed client for the cloud REST API, plus entry points into the event
//! stream.
//!
//! REST requests authenticate with an `Authorization: Bearer` header; only
//! the streaming endpoints use the `access_token` query parameter, because
//! streaming GETs cannot rely on custom headers everywhere.

pub mod auth;

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::client::auth::{AuthProvider, StaticToken};
use crate::error::{Error, Result};
use crate::shared::http::error_from_response;
use crate::shared::stream::{EventStream, StreamBuilder};
use crate::types::{Device, Library, Product, PublishRequest, PublishResponse};
use crate::DEFAULT_BASE_URL;

/// Client for the VoltCloud REST API.
///
/// # Examples
///
/// ```rust,no_run
/// use voltstream::CloudClient;
///
/// # async fn example() -> Result<(), voltstream::Error> {
/// let client = CloudClient::new("my-access-token")?;
/// for device in client.list_devices().await? {
///     println!("{} online={}", device.id, device.online);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    auth: Arc<dyn AuthProvider>,
}

impl CloudClient {
    /// Client against the production API with a fixed bearer token.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    /// Client against a specific API host with a fixed bearer token.
    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self> {
        Self::with_auth_provider(base_url, Arc::new(StaticToken::new(token)))
    }

    /// Client with a custom credential source.
    pub fn with_auth_provider(base_url: &str, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: parse_base(base_url)?,
            auth,
        })
    }

    /// List all devices on the account.
    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        self.request(Method::GET, "v1/devices", None).await
    }

    /// Fetch one device.
    pub async fn get_device(&self, device_id: &str) -> Result<Device> {
        self.request(Method::GET, &format!("v1/devices/{device_id}"), None)
            .await
    }

    /// Rename a device.
    pub async fn rename_device(&self, device_id: &str, name: &str) -> Result<Device> {
        let body = serde_json::json!({ "name": name });
        self.request(Method::PUT, &format!("v1/devices/{device_id}"), Some(&body))
            .await
    }

    /// Release a device from the account.
    pub async fn remove_device(&self, device_id: &str) -> Result<()> {
        self.execute(Method::DELETE, &format!("v1/devices/{device_id}"), None)
            .await?;
        Ok(())
    }

    /// List the account's products.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.request(Method::GET, "v1/products", None).await
    }

    /// List published firmware libraries.
    pub async fn list_libraries(&self) -> Result<Vec<Library>> {
        self.request(Method::GET, "v1/libraries", None).await
    }

    /// Publish an event into the account's event bus.
    ///
    /// Subscribers of a live [`EventStream`] on the same account receive it
    /// under `name`.
    pub async fn publish_event(
        &self,
        name: &str,
        data: serde_json::Value,
        private: bool,
    ) -> Result<PublishResponse> {
        let body = serde_json::to_value(PublishRequest {
            name: name.to_string(),
            data,
            private,
        })?;
        self.request(Method::POST, "v1/devices/events", Some(&body))
            .await
    }

    /// Stream every event visible to the account, optionally narrowed to
    /// names starting with `prefix`.
    ///
    /// Returns a preconfigured [`StreamBuilder`] sharing this client's
    /// credentials; call `.connect()` to open the session.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use voltstream::CloudClient;
    ///
    /// # async fn example() -> Result<(), voltstream::Error> {
    /// let client = CloudClient::new("token")?;
    /// let stream = client.event_stream(Some("sensor")).connect().await?;
    /// let mut events = stream.events();
    /// # Ok(())
    /// # }
    /// ```
    pub fn event_stream(&self, prefix: Option<&str>) -> StreamBuilder {
        self.stream_builder(&stream_path(None, prefix))
    }

    /// Stream events from a single device, optionally narrowed by name
    /// prefix.
    pub fn device_event_stream(&self, device_id: &str, prefix: Option<&str>) -> StreamBuilder {
        self.stream_builder(&stream_path(Some(device_id), prefix))
    }

    fn stream_builder(&self, path: &str) -> StreamBuilder {
        EventStream::builder(format!("{}{path}", self.base_url))
            .auth_provider(Arc::clone(&self.auth))
    }

    /// Send a request and decode the JSON response body.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let response = self.execute(method, path, body).await?;
        let text = response
            .text()
            .await
            .map_err(|err| Error::network(self.base_url.as_str(), err))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Send a request and return the status-checked response.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(path)?;
        let token = self.auth.access_token().await?;
        debug!(method = %method, url = %url, "cloud api request");

        let mut request = self.http.request(method, url.clone()).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| Error::network(url.as_str(), err))?;

        if !response.status().is_success() {
            return Err(error_from_response(url.as_str(), response).await);
        }
        Ok(response)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

// Base URLs must end in '/' so relative joins keep their path prefix.
fn parse_base(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

fn stream_path(device_id: Option<&str>, prefix: Option<&str>) -> String {
    let mut path = match device_id {
        Some(id) => format!("v1/devices/{id}/events"),
        None => "v1/events".to_string(),
    };
    if let Some(prefix) = prefix {
        path.push('/');
        path.push_str(prefix);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = parse_base("https://api.volt.io").unwrap();
        assert_eq!(url.as_str(), "https://api.volt.io/");
        let url = parse_base("https://staging.volt.io/api").unwrap();
        assert_eq!(url.as_str(), "https://staging.volt.io/api/");
    }

    #[test]
    fn endpoint_joins_keep_base_path() {
        let client = CloudClient::with_base_url("https://staging.volt.io/api", "t").unwrap();
        assert_eq!(
            client.endpoint("v1/devices").unwrap().as_str(),
            "https://staging.volt.io/api/v1/devices"
        );
        // A leading slash must not escape the base path.
        assert_eq!(
            client.endpoint("/v1/devices").unwrap().as_str(),
            "https://staging.volt.io/api/v1/devices"
        );
    }

    #[test]
    fn stream_paths_cover_all_shapes() {
        assert_eq!(stream_path(None, None), "v1/events");
        assert_eq!(stream_path(None, Some("sensor")), "v1/events/sensor");
        assert_eq!(
            stream_path(Some("d1"), None),
            "v1/devices/d1/events"
        );
        assert_eq!(
            stream_path(Some("d1"), Some("temp")),
            "v1/devices/d1/events/temp"
        );
    }
}
