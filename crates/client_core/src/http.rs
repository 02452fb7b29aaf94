//! `reqwest` implementation of the tracker service traits.

use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::{AuthOutcome, ReleaseId, ReleasePage},
    error::ApiError,
    protocol::{
        AuthRequest, AuthResponse, ListenToggleResponse, ReleaseListQuery, ReleaseListResponse,
    },
};
use tracing::debug;
use url::{ParseError, Url};

use crate::{
    settings::ClientSettings, ArtworkService, AuthService, ClientError, ReleaseQuery,
    ReleaseService,
};

#[derive(Clone)]
pub struct HttpTrackerClient {
    http: Client,
    base: Url,
}

impl HttpTrackerClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Self::with_client(http, &settings.api_url)
    }

    pub fn with_client(http: Client, api_url: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(api_url)?;
        // Url::join replaces the last segment unless the path ends with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    async fn post_auth(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, ClientError> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .post(url.clone())
            .json(&AuthRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        match check_status(response, &url).await {
            Ok(response) => {
                let body: AuthResponse = response.json().await?;
                Ok(body.into())
            }
            Err(ClientError::Api(err)) => Ok(AuthOutcome::Failure(err.message)),
            Err(err) => Err(err),
        }
    }
}

/// Passes 2xx responses through. Anything else becomes `ClientError::Api`
/// when the body decodes as an `ApiError`, else `ClientError::Status`.
async fn check_status(response: Response, url: &Url) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_slice::<ApiError>(&body) {
        return Err(ClientError::Api(api_error));
    }
    Err(ClientError::Status {
        status: status.as_u16(),
        endpoint: url.path().to_string(),
    })
}

#[async_trait]
impl ReleaseService for HttpTrackerClient {
    async fn fetch_releases(&self, query: &ReleaseQuery) -> Result<ReleasePage, ClientError> {
        let url = self.endpoint("releases")?;
        debug!(
            view = query.filter.scope.wire_index(),
            slide = query.filter.slide.wire_index(),
            page = query.page,
            offset = query.offset,
            "http: fetching releases"
        );
        let response = self
            .http
            .get(url.clone())
            .query(&ReleaseListQuery::new(
                query.filter,
                query.page,
                query.page_size,
                query.offset,
            ))
            .send()
            .await?;
        let body: ReleaseListResponse = check_status(response, &url).await?.json().await?;
        Ok(body.into())
    }

    async fn toggle_listen_status(&self, release_id: &ReleaseId) -> Result<bool, ClientError> {
        let mut url = self.endpoint("releases")?;
        url.path_segments_mut()
            .map_err(|_| ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(release_id.as_str())
            .push("listen");
        let response = self.http.post(url.clone()).send().await?;
        let body: ListenToggleResponse = check_status(response, &url).await?.json().await?;
        Ok(body.success)
    }
}

#[async_trait]
impl AuthService for HttpTrackerClient {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, ClientError> {
        self.post_auth("auth/login", username, password).await
    }

    async fn register(&self, username: &str, password: &str) -> Result<AuthOutcome, ClientError> {
        self.post_auth("auth/register", username, password).await
    }
}

#[async_trait]
impl ArtworkService for HttpTrackerClient {
    async fn fetch_art_urls(&self) -> Result<Vec<String>, ClientError> {
        let url = self.endpoint("art")?;
        let response = self.http.get(url.clone()).send().await?;
        Ok(check_status(response, &url).await?.json().await?)
    }

    /// `url` may be absolute or relative to the api base.
    async fn fetch_artwork(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint(url)?;
        let response = self.http.get(url.clone()).send().await?;
        let bytes = check_status(response, &url).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
