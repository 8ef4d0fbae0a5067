//! HTTP client implementation for the Moves storyline API.
//!
//! This module provides a reqwest-based implementation of the [`MovesClient`](crate::MovesClient) trait.

use crate::config::Credentials;
use crate::{Day, FetchOptions, MovesClient, MovesError, Profile};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Client for the Moves API using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestMovesClient {
    base_url: String,
    access_token: SecretString,
    client: reqwest::Client,
}

impl ReqwestMovesClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API (e.g., "https://api.moves-app.com")
    /// * `access_token` - The OAuth bearer token
    pub fn new(base_url: &str, access_token: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ellie/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            client,
        }
    }

    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(&credentials.base_url, credentials.access_token.clone())
    }

    /// Build an authenticated GET request.
    fn get_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
    }

    /// Execute a request and expect a JSON response.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, MovesError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| MovesError::Decode(e.to_string()))
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> MovesError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();
        MovesError::from_status(status, body_snippet)
    }
}

#[async_trait]
impl MovesClient for ReqwestMovesClient {
    async fn get_profile(&self) -> Result<Profile, MovesError> {
        let url = format!("{}/api/v1/user/profile", self.base_url);

        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ProfilePayload {
            user_id: u64,
            profile: Option<ProfileDetails>,
        }
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ProfileDetails {
            first_date: Option<String>,
            current_time_zone: Option<TimeZone>,
        }
        #[derive(serde::Deserialize)]
        struct TimeZone {
            id: Option<String>,
        }

        let payload: ProfilePayload = self.execute_json(self.get_request(&url)).await?;
        let details = payload
            .profile
            .ok_or_else(|| MovesError::Decode("missing profile data".into()))?;
        Ok(Profile {
            user_id: payload.user_id,
            first_date: details.first_date.unwrap_or_default(),
            time_zone: details.current_time_zone.and_then(|tz| tz.id),
        })
    }

    async fn fetch_day(&self, date: &str, options: FetchOptions) -> Result<Day, MovesError> {
        let url = format!("{}/api/v1/user/storyline/daily/{}", self.base_url, date);
        let qp = [("trackPoints", options.track_points.to_string())];
        tracing::debug!(%date, track_points = options.track_points, "fetching storyline");

        let days: Vec<serde_json::Value> =
            self.execute_json(self.get_request(&url).query(&qp)).await?;
        let payload = days
            .into_iter()
            .next()
            .ok_or_else(|| MovesError::NotFound(format!("no storyline for {date}")))?;
        Day::from_payload(payload).map_err(|e| MovesError::Decode(e.to_string()))
    }
}
