use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::cookies::CookieSettings;
use super::handlers::get_current_user::get_current_user;
use super::handlers::health::health;
use super::handlers::oauth_authorize::oauth_authorize;
use super::handlers::oauth_callback::oauth_callback;
use super::handlers::refresh::refresh;
use super::handlers::sign_in::sign_in;
use super::handlers::sign_out::sign_out;
use super::handlers::sign_up::sign_up;
use super::middleware::authenticate as auth_middleware;
use crate::domain::authentication::ports::AuthServicePort;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
    pub cookies: CookieSettings,
    pub frontend_url: String,
}

/// Transport settings that do not belong to the domain.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub cookies: CookieSettings,
    pub frontend_url: String,
    pub allowed_origins: Vec<String>,
}

pub fn create_router(auth_service: Arc<dyn AuthServicePort>, settings: HttpSettings) -> Router {
    let cors_layer = cors_layer(&settings.allowed_origins);

    let state = AppState {
        auth_service,
        cookies: settings.cookies,
        frontend_url: settings.frontend_url,
    };

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/v1/auth/signup", post(sign_up))
        .route("/api/v1/auth/signin", post(sign_in))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/signout", post(sign_out))
        .route("/api/v1/auth/google/authorize", get(oauth_authorize))
        .route("/api/v1/auth/google/callback", get(oauth_callback));

    let protected_routes = Router::new()
        .route("/api/v1/users/me", get(get_current_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Headers stay out of the span: they carry bearer tokens and cookies.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(cors_layer)
        .with_state(state)
}

/// Credentialed CORS for the configured frontend origins.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use auth::AccessToken;
    use auth::RefreshSecret;
    use axum::http::header::COOKIE;
    use axum::http::header::LOCATION;
    use axum::http::header::SET_COOKIE;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use mockall::mock;
    use serde_json::json;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::authentication::errors::AuthError;
    use crate::domain::authentication::errors::OAuthError;
    use crate::domain::authentication::errors::RepositoryError;
    use crate::domain::authentication::errors::TokenFailure;
    use crate::domain::authentication::models::AuthSession;
    use crate::domain::authentication::models::ClientContext;
    use crate::domain::authentication::models::OAuthCallback;
    use crate::domain::authentication::models::OAuthLogin;
    use crate::domain::authentication::models::RefreshedSession;
    use crate::domain::authentication::models::SignInCommand;
    use crate::domain::authentication::models::SignUpCommand;
    use crate::user::models::EmailAddress;
    use crate::user::models::User;

    mock! {
        pub TestAuthService {}

        #[async_trait]
        impl AuthServicePort for TestAuthService {
            async fn sign_up(&self, command: SignUpCommand, client: ClientContext) -> Result<AuthSession, AuthError>;
            async fn sign_in(&self, command: SignInCommand, client: ClientContext) -> Result<AuthSession, AuthError>;
            async fn refresh(&self, secret: RefreshSecret, client: ClientContext) -> Result<RefreshedSession, AuthError>;
            async fn sign_out(&self, secret: RefreshSecret) -> Result<(), AuthError>;
            async fn oauth_authorize(&self) -> Result<String, AuthError>;
            async fn oauth_callback(&self, callback: OAuthCallback, client: ClientContext) -> Result<OAuthLogin, AuthError>;
            async fn current_user(&self, access_token: &str) -> Result<User, AuthError>;
        }
    }

    fn router(service: MockTestAuthService) -> Router {
        create_router(
            Arc::new(service),
            HttpSettings {
                cookies: CookieSettings {
                    secure: false,
                    refresh_path: "/api/v1/auth".to_string(),
                    refresh_max_age_seconds: 604_800,
                },
                frontend_url: "http://localhost:5173".to_string(),
                allowed_origins: vec!["http://localhost:5173".to_string()],
            },
        )
    }

    fn user() -> User {
        User::with_password(
            EmailAddress::new("ana@example.com".to_string()).unwrap(),
            None,
            "hash".to_string(),
        )
    }

    fn session() -> AuthSession {
        AuthSession {
            user: user(),
            access_token: AccessToken {
                token: "access.jwt".to_string(),
                expires_in: 900,
            },
            refresh_secret: RefreshSecret::from_presented("refresh-secret"),
        }
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookies(response: &Response<Body>) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(MockTestAuthService::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sign_up_returns_created_with_cookie() {
        let mut service = MockTestAuthService::new();
        service
            .expect_sign_up()
            .withf(|command, client| {
                command.email == "ana@example.com"
                    && command.display_name.is_none()
                    && client.ip_address == "203.0.113.7"
            })
            .times(1)
            .returning(|_, _| Ok(session()));

        let mut request = json_request(
            Method::POST,
            "/api/v1/auth/signup",
            json!({
                "email": "ana@example.com",
                "password": "Secret123",
                "password_confirm": "Secret123"
            }),
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));

        let response = router(service).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("refresh_token=refresh-secret;"));
        assert!(cookies[0].contains("HttpOnly"));

        let body = body_json(response).await;
        assert_eq!(body["data"]["access_token"], "access.jwt");
        assert_eq!(body["data"]["token_type"], "bearer");
        assert_eq!(body["data"]["expires_in"], 900);
        assert_eq!(body["data"]["user"]["email"], "ana@example.com");
        assert_eq!(body["data"]["user"]["auth_provider"], "password");
    }

    #[tokio::test]
    async fn test_sign_in_locked_account() {
        let mut service = MockTestAuthService::new();
        service
            .expect_sign_in()
            .returning(|_, _| Err(AuthError::AccountLocked));

        let response = router(service)
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/signin",
                json!({"email": "ana@example.com", "password": "Secret123"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(set_cookies(&response).is_empty());
        let body = body_json(response).await;
        assert_eq!(body["data"]["code"], "ACCOUNT_LOCKED");
    }

    #[tokio::test]
    async fn test_refresh_without_cookie_is_unauthorized() {
        let mut service = MockTestAuthService::new();
        service.expect_refresh().times(0);

        let response = router(service)
            .oneshot(
                Request::post("/api/v1/auth/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_rotates_cookie() {
        let mut service = MockTestAuthService::new();
        service
            .expect_refresh()
            .withf(|secret, _| secret.expose() == "old-secret")
            .times(1)
            .returning(|_, _| {
                Ok(RefreshedSession {
                    access_token: AccessToken {
                        token: "new.jwt".to_string(),
                        expires_in: 900,
                    },
                    refresh_secret: RefreshSecret::from_presented("new-secret"),
                })
            });

        let response = router(service)
            .oneshot(
                Request::post("/api/v1/auth/refresh")
                    .header(COOKIE, "refresh_token=old-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response)[0].starts_with("refresh_token=new-secret;"));
        let body = body_json(response).await;
        assert_eq!(body["data"]["access_token"], "new.jwt");
        assert!(body["data"].get("user").is_none());
    }

    #[tokio::test]
    async fn test_refresh_with_revoked_token() {
        let mut service = MockTestAuthService::new();
        service
            .expect_refresh()
            .returning(|_, _| Err(AuthError::token(TokenFailure::RevokedRefreshToken)));

        let response = router(service)
            .oneshot(
                Request::post("/api/v1/auth/refresh")
                    .header(COOKIE, "refresh_token=reused")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["data"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_sign_out_clears_cookie() {
        let mut service = MockTestAuthService::new();
        service
            .expect_sign_out()
            .withf(|secret| secret.expose() == "live-secret")
            .times(1)
            .returning(|_| Ok(()));

        let response = router(service)
            .oneshot(
                Request::post("/api/v1/auth/signout")
                    .header(COOKIE, "refresh_token=live-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(set_cookies(&response)[0].contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_sign_out_without_cookie_skips_revocation() {
        let mut service = MockTestAuthService::new();
        service.expect_sign_out().times(0);

        let response = router(service)
            .oneshot(
                Request::post("/api/v1/auth/signout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(set_cookies(&response)[0].contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_sign_out_database_failure_is_internal_error() {
        let mut service = MockTestAuthService::new();
        service.expect_sign_out().times(1).returning(|_| {
            Err(AuthError::Repository(RepositoryError::Database(
                "connection refused".to_string(),
            )))
        });

        let response = router(service)
            .oneshot(
                Request::post("/api/v1/auth/signout")
                    .header(COOKIE, "refresh_token=live-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookies(&response).is_empty());
        let body = body_json(response).await;
        assert!(!body.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_oauth_authorize_redirects_to_provider() {
        let mut service = MockTestAuthService::new();
        service
            .expect_oauth_authorize()
            .returning(|| Ok("https://accounts.example.com/auth?state=abc".to_string()));

        let response = router(service)
            .oneshot(
                Request::get("/api/v1/auth/google/authorize")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "https://accounts.example.com/auth?state=abc"
        );
    }

    #[tokio::test]
    async fn test_oauth_callback_success_sets_both_cookies() {
        let mut service = MockTestAuthService::new();
        service
            .expect_oauth_callback()
            .withf(|callback, _| callback.state == "s1" && callback.code.as_deref() == Some("c1"))
            .returning(|_, _| {
                Ok(OAuthLogin {
                    session: session(),
                    created: true,
                })
            });

        let response = router(service)
            .oneshot(
                Request::get("/api/v1/auth/google/callback?state=s1&code=c1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "http://localhost:5173/auth/callback?success=true"
        );
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().any(|c| c.starts_with("refresh_token=refresh-secret;")));
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("access_token=access.jwt;") && c.contains("Max-Age=60")));
    }

    #[tokio::test]
    async fn test_oauth_callback_invalid_state_redirects_with_code() {
        let mut service = MockTestAuthService::new();
        service
            .expect_oauth_callback()
            .withf(|callback, _| callback.state.is_empty())
            .returning(|_, _| Err(AuthError::OAuth(OAuthError::InvalidState)));

        let response = router(service)
            .oneshot(
                Request::get("/api/v1/auth/google/callback?code=c1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "http://localhost:5173/auth/callback?error=INVALID_STATE"
        );
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_current_user_requires_bearer() {
        let mut service = MockTestAuthService::new();
        service.expect_current_user().times(0);

        let response = router(service)
            .oneshot(Request::get("/api/v1/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_current_user_with_valid_token() {
        let mut service = MockTestAuthService::new();
        service
            .expect_current_user()
            .withf(|token| token == "access.jwt")
            .returning(|_| Ok(user()));

        let response = router(service)
            .oneshot(
                Request::get("/api/v1/users/me")
                    .header(AUTHORIZATION, "Bearer access.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["email"], "ana@example.com");
    }
}
