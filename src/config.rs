use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub google: GoogleOAuthSettings,
    #[serde(default)]
    pub service_account: ServiceAccountConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub api: ApiEndpointsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// OAuth web-client settings for the end-user flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleOAuthSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_google_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_google_token_url")]
    pub token_url: String,
    #[serde(default = "default_oauth_scopes")]
    pub scopes: Vec<String>,
}

impl Default for GoogleOAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            auth_url: default_google_auth_url(),
            token_url: default_google_token_url(),
            scopes: default_oauth_scopes(),
        }
    }
}

impl GoogleOAuthSettings {
    /// Whether a client id and secret are present.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Where to find the service-account key, if any.
///
/// `key_json` (inline JSON) wins over `key_path` when both are set.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServiceAccountConfig {
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_json: Option<String>,
    /// User to impersonate through domain-wide delegation.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl ServiceAccountConfig {
    pub fn is_configured(&self) -> bool {
        self.key_path.is_some() || self.key_json.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CookieConfig {
    /// Set the `Secure` attribute. Enable in production (HTTPS).
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_access_max_age")]
    pub access_max_age_secs: i64,
    #[serde(default = "default_refresh_max_age")]
    pub refresh_max_age_secs: i64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: false,
            access_max_age_secs: default_access_max_age(),
            refresh_max_age_secs: default_refresh_max_age(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Base URLs of the Business Profile API families.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiEndpointsConfig {
    #[serde(default = "default_account_management_url")]
    pub account_management_url: String,
    #[serde(default = "default_business_information_url")]
    pub business_information_url: String,
    #[serde(default = "default_my_business_url")]
    pub my_business_url: String,
    #[serde(default = "default_performance_url")]
    pub performance_url: String,
    #[serde(default = "default_notifications_url")]
    pub notifications_url: String,
    #[serde(default = "default_verifications_url")]
    pub verifications_url: String,
}

impl Default for ApiEndpointsConfig {
    fn default() -> Self {
        Self {
            account_management_url: default_account_management_url(),
            business_information_url: default_business_information_url(),
            my_business_url: default_my_business_url(),
            performance_url: default_performance_url(),
            notifications_url: default_notifications_url(),
            verifications_url: default_verifications_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_port() -> u16 {
    8400
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_redirect_uri() -> String {
    "http://localhost:8400/api/auth/google/callback".to_string()
}
fn default_google_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}
fn default_google_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}
fn default_oauth_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/business.manage".to_string(),
        "https://www.googleapis.com/auth/userinfo.profile".to_string(),
        "https://www.googleapis.com/auth/userinfo.email".to_string(),
    ]
}
const fn default_access_max_age() -> i64 {
    600
}
const fn default_refresh_max_age() -> i64 {
    30 * 24 * 60 * 60
}
const fn default_timeout_secs() -> u64 {
    10
}
const fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_account_management_url() -> String {
    "https://mybusinessaccountmanagement.googleapis.com".to_string()
}
fn default_business_information_url() -> String {
    "https://mybusinessbusinessinformation.googleapis.com".to_string()
}
fn default_my_business_url() -> String {
    "https://mybusiness.googleapis.com".to_string()
}
fn default_performance_url() -> String {
    "https://businessprofileperformance.googleapis.com".to_string()
}
fn default_notifications_url() -> String {
    "https://mybusinessnotifications.googleapis.com".to_string()
}
fn default_verifications_url() -> String {
    "https://mybusinessverifications.googleapis.com".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Config loading and env overrides
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. Any setting prefixed with `GBP_` takes precedence over the
    /// file value.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        macro_rules! env_str {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                }
            };
        }
        macro_rules! env_bool {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                }
            };
        }
        macro_rules! env_parse {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    if let Ok(parsed) = val.parse() {
                        $field = parsed;
                    }
                }
            };
        }
        macro_rules! env_opt_str {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = if val.is_empty() { None } else { Some(val) };
                }
            };
        }

        // -- Server --
        env_str!("GBP_SERVER_HOST", self.server.host);
        env_parse!("GBP_SERVER_PORT", self.server.port);
        if let Ok(val) = std::env::var("GBP_SERVER_CORS_ORIGINS") {
            self.server.cors_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // -- Google OAuth client --
        env_str!("GBP_GOOGLE_CLIENT_ID", self.google.client_id);
        env_str!("GBP_GOOGLE_CLIENT_SECRET", self.google.client_secret);
        env_str!("GBP_GOOGLE_REDIRECT_URI", self.google.redirect_uri);

        // -- Service account --
        if let Ok(val) = std::env::var("GBP_SERVICE_ACCOUNT_KEY_PATH") {
            self.service_account.key_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
        env_opt_str!("GBP_SERVICE_ACCOUNT_KEY", self.service_account.key_json);
        env_opt_str!("GBP_SERVICE_ACCOUNT_SUBJECT", self.service_account.subject);

        // -- Cookies --
        env_bool!("GBP_COOKIE_SECURE", self.cookies.secure);
        env_parse!("GBP_COOKIE_ACCESS_MAX_AGE_SECS", self.cookies.access_max_age_secs);
        env_parse!("GBP_COOKIE_REFRESH_MAX_AGE_SECS", self.cookies.refresh_max_age_secs);

        // -- HTTP --
        env_parse!("GBP_HTTP_TIMEOUT_SECS", self.http.timeout_secs);
        env_parse!("GBP_HTTP_CONNECT_TIMEOUT_SECS", self.http.connect_timeout_secs);

        // -- Logging --
        env_str!("GBP_LOG_LEVEL", self.logging.level);
        env_bool!("GBP_LOG_JSON", self.logging.json);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
