use std::collections::HashSet;

use reqwest::{Client, StatusCode, Url, header::AUTHORIZATION};

use crate::{
    config::ProviderConfig,
    error::AuthError,
    types::{CallbackParams, Credential, TokenResponse},
    utils,
};

/// An authorization redirect together with the `state` token embedded in it.
///
/// The `state` must be kept by the caller and handed back to
/// [`AuthorizationFlow::validate_callback`] when the provider redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
}

/// Builds the provider authorization URL with a freshly generated `state`.
///
/// Scopes are deduplicated (first occurrence wins) and space-joined. Every call
/// produces a new `state`, so two calls with identical arguments yield different
/// URLs.
pub fn build_authorization_url(
    auth_url: &Url,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
) -> AuthorizationRequest {
    let mut seen = HashSet::new();
    let scope = scopes
        .iter()
        .filter(|s| seen.insert(s.as_str()))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    let state = utils::generate_state();

    let mut url = auth_url.clone();
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("scope", &scope)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", &state);

    AuthorizationRequest { url, state }
}

/// OAuth 2.0 authorization code flow against the provider's token endpoint.
///
/// The client secret is sent as HTTP Basic credentials. Every request is bounded by
/// the configured timeout; expiry surfaces as [`AuthError::Network`]. Nothing is
/// retried here.
pub struct AuthorizationFlow {
    config: ProviderConfig,
    client: Client,
}

impl AuthorizationFlow {
    pub fn new(config: ProviderConfig) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn build_authorization_url(&self) -> AuthorizationRequest {
        build_authorization_url(
            &self.config.auth_url,
            &self.config.client_id,
            &self.config.redirect_uri,
            &self.config.scopes,
        )
    }

    /// Checks a callback against the `state` we issued and extracts the code.
    ///
    /// The `state` check runs first: an absent or mismatched value rejects the
    /// callback as [`AuthError::StateMismatch`] regardless of what else it carries.
    /// A provider `error` then becomes [`AuthError::UserDenied`].
    pub fn validate_callback(
        params: &CallbackParams,
        expected_state: Option<&str>,
    ) -> Result<String, AuthError> {
        match (params.state.as_deref(), expected_state) {
            (Some(received), Some(expected)) if utils::constant_time_eq(received, expected) => {}
            _ => return Err(AuthError::StateMismatch),
        }

        if let Some(error) = &params.error {
            return Err(AuthError::UserDenied(error.clone()));
        }

        match &params.code {
            Some(code) if !code.is_empty() => Ok(code.clone()),
            _ => Err(AuthError::MissingCode),
        }
    }

    /// Exchanges an authorization code for a credential.
    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<Credential, AuthError> {
        let (status, body) = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.config.redirect_uri),
            ])
            .await?;

        if !status.is_success() {
            return Err(AuthError::TokenExchangeFailed { status, body });
        }

        let res = parse_token_response(&body)?;
        let refresh_token = res.refresh_token.clone().ok_or_else(|| {
            AuthError::MalformedResponse("token response is missing refresh_token".to_string())
        })?;

        Ok(credential_from_response(res, refresh_token, utils::now_ms()))
    }

    /// Refreshes a credential.
    ///
    /// When the provider does not rotate the refresh token, the one passed in is
    /// carried over into the new credential.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<Credential, AuthError> {
        let (status, body) = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        if !status.is_success() {
            return Err(AuthError::RefreshFailed { status, body });
        }

        let res = parse_token_response(&body)?;
        let rotated = res
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| refresh_token.to_string());

        Ok(credential_from_response(res, rotated, utils::now_ms()))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<(StatusCode, String), AuthError> {
        let res = self
            .client
            .post(self.config.token_url.clone())
            .header(
                AUTHORIZATION,
                utils::basic_auth_header(&self.config.client_id, &self.config.client_secret),
            )
            .form(form)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        Ok((status, body))
    }
}

fn parse_token_response(body: &str) -> Result<TokenResponse, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::MalformedResponse(e.to_string()))
}

fn credential_from_response(res: TokenResponse, refresh_token: String, now_ms: i64) -> Credential {
    Credential::issued_at(
        now_ms,
        res.access_token,
        refresh_token,
        res.expires_in,
        res.token_type.unwrap_or_else(|| "Bearer".to_string()),
    )
}
