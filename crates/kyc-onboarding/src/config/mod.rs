use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;

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
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
    pub gateway: GatewayConfig,
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
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidValue {
                variable: "APP_LOG_FORMAT",
                value: raw,
            })?,
            Err(_) => LogFormat::Compact,
        };

        let intake = IntakeConfig {
            uploads_dir: env::var("KYC_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            audit_log: env::var("KYC_AUDIT_LOG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs").join("api.log")),
            simulate_latency: env_flag("KYC_SIMULATE_LATENCY", true)?,
            max_upload_bytes: env_number("KYC_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };

        let base_url = env::var("KYC_API_BASE_URL")
            .or_else(|_| env::var("NEXT_PUBLIC_API_BASE_URL"))
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let gateway = GatewayConfig {
            base_url,
            timeout: Duration::from_secs(env_number(
                "KYC_API_TIMEOUT_SECS",
                DEFAULT_GATEWAY_TIMEOUT_SECS,
            )?),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            intake,
            gateway,
        })
    }
}

fn env_flag(variable: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(variable) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                variable,
                value: raw,
            }),
        },
        Err(_) => Ok(default),
    }
}

fn env_number<T: std::str::FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            variable,
            value: raw,
        }),
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

/// Tracing output controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Where uploads and the audit trail land, and how the handlers pace replies.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub uploads_dir: PathBuf,
    pub audit_log: PathBuf,
    pub simulate_latency: bool,
    pub max_upload_bytes: usize,
}

impl IntakeConfig {
    /// Configuration rooted at `dir` with latency simulation disabled.
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let root = dir.into();
        Self {
            uploads_dir: root.join("uploads"),
            audit_log: root.join("logs").join("api.log"),
            simulate_latency: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Outbound client settings used by the onboarding wizard.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { variable: &'static str, value: String },
    MissingBaseUrl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "{variable} has an unsupported value '{value}'")
            }
            ConfigError::MissingBaseUrl => {
                write!(f, "KYC_API_BASE_URL must be set to reach the intake service")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::MissingBaseUrl => None,
        }
    }
}
