use auth::RefreshSecret;
use axum::http::header::InvalidHeaderValue;
use axum::http::HeaderValue;
use axum_extra::extract::CookieJar;

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";
pub const ACCESS_HANDOFF_COOKIE_NAME: &str = "access_token";

/// The hand-off cookie only has to survive the redirect to the frontend.
const ACCESS_HANDOFF_MAX_AGE_SECONDS: i64 = 60;

/// Attributes of the cookies this service sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub secure: bool,
    pub refresh_path: String,
    pub refresh_max_age_seconds: i64,
}

impl CookieSettings {
    /// HttpOnly cookie carrying the refresh secret, scoped to the auth routes.
    pub fn refresh_cookie(&self, secret: &RefreshSecret) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(
            REFRESH_COOKIE_NAME,
            secret.expose(),
            &self.refresh_path,
            true,
            self.refresh_max_age_seconds,
        )
    }

    pub fn clear_refresh_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(REFRESH_COOKIE_NAME, "", &self.refresh_path, true, 0)
    }

    /// Script-readable cookie the frontend picks the access token up from
    /// after an OAuth redirect.
    pub fn access_handoff_cookie(&self, access_token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(
            ACCESS_HANDOFF_COOKIE_NAME,
            access_token,
            "/",
            false,
            ACCESS_HANDOFF_MAX_AGE_SECONDS,
        )
    }

    fn build(
        &self,
        name: &str,
        value: &str,
        path: &str,
        http_only: bool,
        max_age_seconds: i64,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{}={}; Path={}; SameSite=Strict; Max-Age={}",
            name, value, path, max_age_seconds
        );
        if http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Refresh secret presented in the request cookies, if any.
pub fn presented_refresh_secret(jar: &CookieJar) -> Option<RefreshSecret> {
    jar.get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .map(RefreshSecret::from_presented)
}
