use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::domain::authentication::errors::OAuthError;
use crate::domain::authentication::models::OAuthIdentity;
use crate::domain::authentication::ports::OAuthProvider;
use crate::domain::user::models::OAuthProviderKind;

const SCOPES: &str = "openid email profile";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

/// Authorization-code flow against Google's OpenID Connect endpoints.
pub struct GoogleOAuthClient {
    config: GoogleOAuthConfig,
    client: Client,
}

impl GoogleOAuthClient {
    /// # Errors
    /// * `Misconfigured` - An endpoint is not a valid URL or the HTTP client cannot be built
    pub fn new(config: GoogleOAuthConfig) -> Result<Self, OAuthError> {
        for endpoint in [&config.authorize_url, &config.token_url, &config.userinfo_url] {
            Url::parse(endpoint)
                .map_err(|e| OAuthError::Misconfigured(format!("{}: {}", endpoint, e)))?;
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OAuthError::Misconfigured(e.to_string()))?;

        Ok(Self { config, client })
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, OAuthError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::ExchangeFailed(format!("token request: {}", e)))?;

        if !response.status().is_success() {
            return Err(OAuthError::ExchangeFailed(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| OAuthError::ExchangeFailed(format!("token response: {}", e)))?;

        Ok(token.access_token)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::ExchangeFailed(format!("userinfo request: {}", e)))?;

        if !response.status().is_success() {
            return Err(OAuthError::ExchangeFailed(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<UserInfo>()
            .await
            .map_err(|e| OAuthError::ExchangeFailed(format!("userinfo response: {}", e)))
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuthClient {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| OAuthError::Misconfigured(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("state", state)
            .append_pair("prompt", "select_account");

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthIdentity, OAuthError> {
        let access_token = self.fetch_access_token(code).await?;
        let info = self.fetch_user_info(&access_token).await?;

        if info.email_verified == Some(false) {
            return Err(OAuthError::ExchangeFailed("email not verified".to_string()));
        }
        let email = info
            .email
            .ok_or_else(|| OAuthError::ExchangeFailed("profile has no email".to_string()))?;

        tracing::debug!(provider_id = %info.sub, "Google code exchanged");

        Ok(OAuthIdentity {
            provider: OAuthProviderKind::Google,
            provider_id: info.sub,
            email,
            display_name: info.name,
        })
    }
}
