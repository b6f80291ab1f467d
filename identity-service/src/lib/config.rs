use std::env;

use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::authentication::models::LockoutPolicy;
use crate::domain::authentication::models::SessionPolicy;
use crate::outbound::oauth::GoogleOAuthConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub password: PasswordConfig,
    pub lockout: LockoutConfig,
    pub oauth: OAuthConfig,
    pub cookie: CookieConfig,
    pub frontend: FrontendConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiration_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub refresh_token_expiration_days: i64,
    pub revoke_all_on_reuse: bool,
}

/// Argon2id work factor
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LockoutConfig {
    pub max_failed_attempts: i64,
    pub window_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OAuthConfig {
    pub state_ttl_minutes: i64,
    pub state_sweep_interval_seconds: u64,
    pub google: GoogleOAuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CookieConfig {
    pub secure: bool,
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrontendConfig {
    pub url: String,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MaintenanceConfig {
    pub interval_seconds: u64,
    pub expired_token_retention_days: i64,
    pub login_attempt_retention_days: i64,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: OAUTH__GOOGLE__CLIENT_ID=... overrides oauth.google.client_id
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values the background tasks cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth.state_sweep_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "oauth.state_sweep_interval_seconds must be at least 1".to_string(),
            ));
        }
        if self.maintenance.interval_seconds == 0 {
            return Err(ConfigError::Message(
                "maintenance.interval_seconds must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_failed_attempts: self.lockout.max_failed_attempts,
            window: Duration::minutes(self.lockout.window_minutes),
        }
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            refresh_token_ttl: Duration::days(self.session.refresh_token_expiration_days),
            revoke_all_on_reuse: self.session.revoke_all_on_reuse,
        }
    }
}
