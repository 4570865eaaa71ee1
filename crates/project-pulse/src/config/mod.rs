use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEVELOPMENT_JWT_SECRET: &str = "project-pulse-development-secret";
/// One year; longer sessions are rejected at load.
const MAX_TOKEN_TTL_HOURS: u32 = 8760;
/// The engine scores at most four check-ins and four feedback entries.
const MAX_RECENT_WINDOW: usize = 4;

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
        self == Self::Production
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub auth: AuthConfig,
    pub tracking: TrackingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment.is_production() => return Err(ConfigError::MissingJwtSecret),
            _ => DEVELOPMENT_JWT_SECRET.to_string(),
        };
        let token_ttl_hours = parse_var("JWT_TTL_HOURS", 168, ConfigError::InvalidTokenTtl)?;
        if token_ttl_hours == 0 || token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ConfigError::InvalidTokenTtl);
        }

        let drift_tolerance =
            parse_var("HEALTH_DRIFT_TOLERANCE", 5, ConfigError::InvalidDriftTolerance)?;
        if drift_tolerance > 100 {
            return Err(ConfigError::InvalidDriftTolerance);
        }
        let recent_window = parse_var("HEALTH_RECENT_WINDOW", 4, ConfigError::InvalidRecentWindow)?;
        if recent_window == 0 || recent_window > MAX_RECENT_WINDOW {
            return Err(ConfigError::InvalidRecentWindow);
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours,
                secure_cookies: environment.is_production(),
            },
            tracking: TrackingConfig {
                drift_tolerance,
                recent_window,
                ..TrackingConfig::default()
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    key: &str,
    default: T,
    error: ConfigError,
) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| error),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Token signing settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: u32,
    pub secure_cookies: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// Windows and thresholds used when keeping stored health scores fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Maximum difference between a stored and a fresh score before a read rewrites it.
    pub drift_tolerance: u8,
    /// Number of newest check-ins and feedback entries fed to the engine.
    pub recent_window: usize,
    pub activity_limit: usize,
    /// Days without a check-in before a project is listed as missing one.
    pub check_in_grace_days: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            drift_tolerance: 5,
            recent_window: 4,
            activity_limit: 50,
            check_in_grace_days: 7,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingJwtSecret,
    InvalidTokenTtl,
    InvalidDriftTolerance,
    InvalidRecentWindow,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingJwtSecret => {
                write!(f, "JWT_SECRET must be set when APP_ENV is production")
            }
            ConfigError::InvalidTokenTtl => {
                write!(
                    f,
                    "JWT_TTL_HOURS must be a whole number between 1 and {MAX_TOKEN_TTL_HOURS}"
                )
            }
            ConfigError::InvalidDriftTolerance => {
                write!(f, "HEALTH_DRIFT_TOLERANCE must be between 0 and 100")
            }
            ConfigError::InvalidRecentWindow => {
                write!(
                    f,
                    "HEALTH_RECENT_WINDOW must be between 1 and {MAX_RECENT_WINDOW}"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
