use super::error::{ApiError, ApiResult};
use crate::config::ApiSettings;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// JSON-over-HTTP client for the BI backend.
///
/// Every endpoint module (`schema`, `saved`, `semantic`, ...) goes through
/// this type; it owns auth headers and status-code handling.
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> ApiResult<Self> {
        let invalid = || ApiError::InvalidUrl(settings.base_url.clone());
        let base_url = Url::parse(settings.base_url.trim()).map_err(|_| invalid())?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(invalid());
        }

        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            token: settings.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Client with default settings against `base_url`.
    pub fn with_base_url(base_url: &str) -> ApiResult<Self> {
        Self::new(&ApiSettings {
            base_url: base_url.to_string(),
            ..ApiSettings::default()
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends `segments` to the base path, percent-encoding each one, so an
    /// id like `a/b` stays a single segment.
    pub fn url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        self.get_with_query(segments, &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let url = self.url(segments)?;
        debug!(path = url.path(), "GET");
        let req = self.http_client.get(url).query(query);
        let resp = self.authorize(req).send().await?;
        decode(resp).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> ApiResult<T> {
        let url = self.url(segments)?;
        debug!(path = url.path(), "POST");
        let req = self
            .http_client
            .post(url)
            .header("content-type", "application/json")
            .json(body);
        let resp = self.authorize(req).send().await?;
        decode(resp).await
    }

    /// DELETE, ignoring any response body.
    pub async fn delete(&self, segments: &[&str]) -> ApiResult<()> {
        let url = self.url(segments)?;
        debug!(path = url.path(), "DELETE");
        let req = self.http_client.delete(url);
        let resp = self.authorize(req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> ApiResult<T> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(ApiError::Status { status, body: text });
    }

    Ok(serde_json::from_str(&text)?)
}
