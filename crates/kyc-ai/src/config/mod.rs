use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

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
    pub documents: DocumentConfig,
    pub providers: ProviderConfig,
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
        let ansi = env::var("APP_LOG_ANSI")
            .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let max_upload_bytes = match env::var("APP_MAX_UPLOAD_BYTES") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidUploadLimit { value: raw }),
            },
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };
        let public_base_url = env::var("APP_DOCUMENT_BASE_URL")
            .unwrap_or_else(|_| "memory://kyc-documents".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            documents: DocumentConfig {
                max_upload_bytes,
                public_base_url,
            },
            providers: ProviderConfig::from_env(),
        })
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
    pub ansi: bool,
}

/// Upload limits and the base URL handed back for stored documents.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub max_upload_bytes: usize,
    pub public_base_url: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            public_base_url: "memory://kyc-documents".to_string(),
        }
    }
}

/// Credentials for hosted providers. A missing group switches that
/// integration to its deterministic fallback.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub openai: Option<OpenAiConfig>,
    pub twilio: Option<TwilioConfig>,
    pub resend: Option<ResendConfig>,
}

impl ProviderConfig {
    fn from_env() -> Self {
        let openai = non_empty("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            model: non_empty("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        });

        let twilio = match (
            non_empty("TWILIO_ACCOUNT_SID"),
            non_empty("TWILIO_AUTH_TOKEN"),
            non_empty("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let resend = match (non_empty("RESEND_API_KEY"), non_empty("RESEND_FROM_EMAIL")) {
            (Some(api_key), Some(from_address)) => Some(ResendConfig {
                api_key,
                from_address,
            }),
            _ => None,
        };

        Self {
            openai,
            twilio,
            resend,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    pub from_address: String,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidUploadLimit { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUploadLimit { value } => {
                write!(f, "APP_MAX_UPLOAD_BYTES must be a positive integer (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidUploadLimit { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

/// Serialises tests that mutate process environment variables.
#[cfg(test)]
pub(crate) fn env_guard() -> &'static std::sync::Mutex<()> {
    static GUARD: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| std::sync::Mutex::new(()))
}
