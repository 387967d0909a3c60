use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use hrdesk_application::{AuditSettings, LatencyJitter};
use hrdesk_core::AppError;
use hrdesk_infrastructure::MIN_TOKEN_SECRET_LEN;
use tracing_subscriber::EnvFilter;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl FromStr for AppEnvironment {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(AppError::Validation(format!(
                "APP_ENV must be one of 'development', 'test' or 'production', got '{other}'"
            ))),
        }
    }
}

/// Backend holding cookie sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreConfig {
    Postgres,
    Redis { redis_url: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub app_env: AppEnvironment,
    pub api_host: String,
    pub api_port: u16,
    pub token_secret: String,
    pub token_issuer: Option<String>,
    pub cookie_secure: bool,
    pub session_store: SessionStoreConfig,
    pub audit_settings: AuditSettings,
    pub latency_jitter: Option<LatencyJitter>,
    pub dev_seed: bool,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = optional("DATABASE_URL")
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;
        let frontend_url =
            optional("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());
        let app_env = optional("APP_ENV")
            .map(|value| value.parse::<AppEnvironment>())
            .transpose()?
            .unwrap_or(AppEnvironment::Development);

        let api_host = optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = optional("API_PORT")
            .map(|value| {
                value
                    .parse::<u16>()
                    .map_err(|error| AppError::Validation(format!("invalid API_PORT: {error}")))
            })
            .transpose()?
            .unwrap_or(3001);

        // The migrate subcommand only needs the database.
        let token_secret = if migrate_only {
            optional("AUTH_TOKEN_SECRET").unwrap_or_default()
        } else {
            let secret = optional("AUTH_TOKEN_SECRET")
                .ok_or_else(|| AppError::Validation("AUTH_TOKEN_SECRET is required".to_owned()))?;
            if secret.len() < MIN_TOKEN_SECRET_LEN {
                return Err(AppError::Validation(format!(
                    "AUTH_TOKEN_SECRET must be at least {MIN_TOKEN_SECRET_LEN} characters"
                )));
            }
            secret
        };
        let token_issuer = optional("AUTH_TOKEN_ISSUER");

        let cookie_secure = optional("SESSION_COOKIE_SECURE")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        let session_store = match optional("SESSION_STORE")
            .unwrap_or_else(|| "postgres".to_owned())
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => SessionStoreConfig::Postgres,
            "redis" => SessionStoreConfig::Redis {
                redis_url: optional("REDIS_URL").ok_or_else(|| {
                    AppError::Validation(
                        "REDIS_URL is required when SESSION_STORE=redis".to_owned(),
                    )
                })?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "SESSION_STORE must be either 'postgres' or 'redis', got '{other}'"
                )));
            }
        };

        let defaults = AuditSettings::default();
        let audit_settings = AuditSettings {
            write_timeout: optional("AUDIT_WRITE_TIMEOUT_MS")
                .map(|value| parse_positive("AUDIT_WRITE_TIMEOUT_MS", value.as_str()))
                .transpose()?
                .map(Duration::from_millis)
                .unwrap_or(defaults.write_timeout),
            max_chars: optional("AUDIT_TRUNCATE_CHARS")
                .map(|value| parse_positive("AUDIT_TRUNCATE_CHARS", value.as_str()))
                .transpose()?
                .map(|value| usize::try_from(value).unwrap_or(usize::MAX))
                .unwrap_or(defaults.max_chars),
        };

        let latency_jitter = optional("DEV_LATENCY_JITTER_MS")
            .map(|value| value.parse::<LatencyJitter>())
            .transpose()?
            .filter(|_| app_env != AppEnvironment::Production);

        let dev_seed = optional("DEV_SEED").is_some_and(|value| value.eq_ignore_ascii_case("true"));

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            app_env,
            api_host,
            api_port,
            token_secret,
            token_issuer,
            cookie_secure,
            session_store,
            audit_settings,
            latency_jitter,
            dev_seed,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_positive(name: &str, value: &str) -> Result<u64, AppError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(AppError::Validation(format!("{name} must be greater than zero"))),
        Ok(parsed) => Ok(parsed),
        Err(error) => Err(AppError::Validation(format!("invalid {name}: {error}"))),
    }
}
