use std::future::Future;

use reqwest::{Client, Url};

use crate::{
    config::ProviderConfig,
    error::AuthError,
    types::{ProfileResponse, UserProfile},
};

/// Remote lookup of the profile that owns an access token.
///
/// The session manager only needs this one capability from the music API, which
/// keeps it independent of any particular HTTP client.
pub trait ProfileSource: Send + Sync + 'static {
    fn fetch_profile(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<UserProfile, AuthError>> + Send;
}

/// `GET {api_url}/me` with bearer authentication.
pub struct SpotifyProfileClient {
    client: Client,
    api_url: Url,
}

impl SpotifyProfileClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    fn me_url(&self) -> String {
        format!("{}/me", self.api_url.as_str().trim_end_matches('/'))
    }
}

impl ProfileSource for SpotifyProfileClient {
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let res = self
            .client
            .get(self.me_url())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(AuthError::ProfileFetchFailed { status, body });
        }

        let profile: ProfileResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        Ok(profile.into())
    }
}
