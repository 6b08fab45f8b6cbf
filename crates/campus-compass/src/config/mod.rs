use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::marketplace::accounts::passwords::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

const DEVELOPMENT_JWT_SECRET: &str = "campus-compass-development-secret";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub moderation: ModerationConfig,
    pub otp: OtpConfig,
    pub bootstrap_admin: Option<AdminSeed>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment.is_production() => return Err(ConfigError::MissingJwtSecret),
            _ => DEVELOPMENT_JWT_SECRET.to_string(),
        };
        let auth = AuthConfig {
            jwt_secret,
            token_ttl_hours: numeric_var("JWT_TTL_HOURS", 24)?,
            bcrypt_cost: numeric_var("BCRYPT_COST", 10)?,
        };
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&auth.bcrypt_cost) {
            return Err(ConfigError::BcryptCostOutOfRange {
                cost: auth.bcrypt_cost,
            });
        }

        let storage = StorageConfig {
            uploads_dir: env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
        };

        let moderation = ModerationConfig {
            allow_resubmission: env::var("MODERATION_ALLOW_RESUBMISSION")
                .map(|value| flag_enabled(&value))
                .unwrap_or(false),
        };

        let defaults = OtpConfig::default();
        let otp = OtpConfig {
            phone_limit: numeric_var("OTP_PHONE_LIMIT", defaults.phone_limit)?,
            ip_limit: numeric_var("OTP_IP_LIMIT", defaults.ip_limit)?,
            attempt_limit: numeric_var("OTP_ATTEMPT_LIMIT", defaults.attempt_limit)?,
            monthly_warn: numeric_var("OTP_MONTHLY_WARN", defaults.monthly_warn)?,
            monthly_cap: numeric_var("OTP_MONTHLY_CAP", defaults.monthly_cap)?,
        };

        let trusted_proxies = match env::var("TRUSTED_PROXIES") {
            Ok(raw) => parse_proxy_list(&raw)?,
            Err(_) => Vec::new(),
        };

        let bootstrap_admin = match (env::var("ADMIN_EMAIL").ok(), env::var("ADMIN_PASSWORD").ok())
        {
            (Some(email), Some(password)) => Some(AdminSeed {
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
                email,
                password,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteAdminSeed),
        };

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                trusted_proxies,
            },
            telemetry: TelemetryConfig { log_level },
            auth,
            storage,
            moderation,
            otp,
            bootstrap_admin,
        })
    }
}

fn numeric_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
        Err(_) => Ok(default),
    }
}

fn parse_proxy_list(raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<IpAddr>().map_err(|_| ConfigError::InvalidTrustedProxy {
                value: entry.to_string(),
            })
        })
        .collect()
}

fn flag_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Peers whose `X-Forwarded-For` header is believed.
    pub trusted_proxies: Vec<IpAddr>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Token signing and password hashing parameters.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModerationConfig {
    pub allow_resubmission: bool,
}

/// Thresholds applied by the OTP request guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpConfig {
    pub phone_limit: u32,
    pub ip_limit: u32,
    pub attempt_limit: u32,
    pub monthly_warn: u32,
    pub monthly_cap: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            phone_limit: 5,
            ip_limit: 10,
            attempt_limit: 10,
            monthly_warn: 9000,
            monthly_cap: 9500,
        }
    }
}

/// Administrator account created at startup when absent.
#[derive(Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str },
    MissingJwtSecret,
    IncompleteAdminSeed,
    BcryptCostOutOfRange { cost: u32 },
    InvalidTrustedProxy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name } => write!(f, "{name} must be a valid number"),
            ConfigError::MissingJwtSecret => {
                write!(f, "JWT_SECRET must be set when APP_ENV is production")
            }
            ConfigError::IncompleteAdminSeed => {
                write!(f, "ADMIN_EMAIL and ADMIN_PASSWORD must be set together")
            }
            ConfigError::BcryptCostOutOfRange { cost } => write!(
                f,
                "BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}, got {cost}"
            ),
            ConfigError::InvalidTrustedProxy { value } => {
                write!(f, "TRUSTED_PROXIES entry {value} is not an IP address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::MissingJwtSecret
            | ConfigError::IncompleteAdminSeed
            | ConfigError::BcryptCostOutOfRange { .. }
            | ConfigError::InvalidTrustedProxy { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "JWT_SECRET",
            "JWT_TTL_HOURS",
            "BCRYPT_COST",
            "UPLOADS_DIR",
            "MODERATION_ALLOW_RESUBMISSION",
            "OTP_PHONE_LIMIT",
            "OTP_IP_LIMIT",
            "OTP_ATTEMPT_LIMIT",
            "OTP_MONTHLY_WARN",
            "OTP_MONTHLY_CAP",
            "ADMIN_EMAIL",
            "ADMIN_PASSWORD",
            "ADMIN_NAME",
            "TRUSTED_PROXIES",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(config.storage.uploads_dir, PathBuf::from("uploads"));
        assert!(!config.moderation.allow_resubmission);
        assert_eq!(config.otp, OtpConfig::default());
        assert!(config.bootstrap_admin.is_none());
        assert!(config.server.trusted_proxies.is_empty());
    }

    #[test]
    fn trusted_proxies_are_parsed_as_addresses() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TRUSTED_PROXIES", "10.0.0.1, ::1");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.server.trusted_proxies,
            vec![IpAddr::from([10, 0, 0, 1]), "::1".parse::<IpAddr>().expect("ipv6")]
        );

        env::set_var("TRUSTED_PROXIES", "10.0.0.1,load-balancer");
        match AppConfig::load() {
            Err(ConfigError::InvalidTrustedProxy { value }) => assert_eq!(value, "load-balancer"),
            other => panic!("expected invalid proxy, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 5001));
    }

    #[test]
    fn production_requires_jwt_secret() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingJwtSecret)
        ));

        env::set_var("JWT_SECRET", "s3cret");
        let config = AppConfig::load().expect("config loads with secret");
        assert!(config.environment.is_production());
        assert_eq!(config.auth.jwt_secret, "s3cret");
        reset_env();
    }

    #[test]
    fn rejects_malformed_numbers_and_half_admin_seed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("OTP_IP_LIMIT", "ten");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { name }) => assert_eq!(name, "OTP_IP_LIMIT"),
            other => panic!("expected invalid number, got {other:?}"),
        }

        reset_env();
        env::set_var("ADMIN_EMAIL", "admin@campuscompass.com");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::IncompleteAdminSeed)
        ));
        reset_env();
    }

    #[test]
    fn bcrypt_cost_must_be_in_range() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BCRYPT_COST", "3");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::BcryptCostOutOfRange { cost: 3 })
        ));

        env::set_var("BCRYPT_COST", "4");
        let config = AppConfig::load().expect("lowest cost accepted");
        assert_eq!(config.auth.bcrypt_cost, MIN_BCRYPT_COST);
        reset_env();
    }

    #[test]
    fn reads_resubmission_flag_and_admin_seed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MODERATION_ALLOW_RESUBMISSION", "true");
        env::set_var("ADMIN_EMAIL", "admin@campuscompass.com");
        env::set_var("ADMIN_PASSWORD", "admin123");
        let config = AppConfig::load().expect("config loads");
        assert!(config.moderation.allow_resubmission);
        let seed = config.bootstrap_admin.expect("seed present");
        assert_eq!(seed.name, "Admin");
        assert_eq!(seed.email, "admin@campuscompass.com");
        reset_env();
    }
}
