use serde::Deserialize;
use std::{error::Error, fs};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct JwtConfig {
    pub secret: String,
    /// Secret for email verification tokens, falls back to `secret`.
    #[serde(default)]
    pub verify_secret: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default = "default_access_ttl")]
    pub access_ttl_seconds: i64,
    #[serde(default = "default_verify_ttl")]
    pub verify_ttl_seconds: i64,
}

fn default_access_ttl() -> i64 {
    24 * 3600
}

fn default_verify_ttl() -> i64 {
    3600
}

impl JwtConfig {
    pub fn verify_secret(&self) -> &str {
        self.verify_secret.as_deref().unwrap_or(&self.secret)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
    pub database_url: String,
    pub jwt: JwtConfig,
    #[serde(default = "default_queue_name")]
    pub events_queue: String,
}

fn default_queue_name() -> String {
    "microshop_events".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    pub server_address: String,
    pub log_level: String,
    pub db_schema: String,
    /// Link target put into verification emails, the token is appended as `?token=`.
    pub verify_url_base: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProductConfig {
    pub server_address: String,
    pub log_level: String,
    pub db_schema: String,
    pub upload_dir: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OrderConfig {
    pub server_address: String,
    pub log_level: String,
    pub db_schema: String,
    pub product_url: String,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaymentConfig {
    pub server_address: String,
    pub log_level: String,
    pub db_schema: String,
    pub order_url: String,
    /// Path on the order service used to flip an order to PAID, `{order_id}` is substituted.
    /// Empty disables the call.
    #[serde(default)]
    pub order_mark_paid_path: String,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

fn default_http_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(default)]
    pub use_auth: bool,
    #[serde(default = "default_smtp_timeout")]
    pub timeout_seconds: u64,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout() -> u64 {
    10
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_email: None,
            use_tls: false,
            use_ssl: false,
            use_auth: false,
            timeout_seconds: default_smtp_timeout(),
        }
    }
}

impl SmtpConfig {
    pub fn sender(&self) -> &str {
        match self.from_email.as_deref() {
            Some(from) if !from.is_empty() => from,
            _ if !self.username.is_empty() => &self.username,
            _ => "noreply@local",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotificationConfig {
    pub log_level: String,
    pub poll_interval_ms: u64,
    pub batch_size: i32,
    pub visibility_timeout_seconds: i32,
    pub max_attempts: i32,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub common: CommonConfig,
    pub auth: AuthConfig,
    pub product: ProductConfig,
    pub order: OrderConfig,
    pub payment: PaymentConfig,
    pub notification: NotificationConfig,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let contents = fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());

        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(serde_yml::from_str(contents)?)
    }

    /// Secrets and the database location are usually injected by the environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.common.database_url = url;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.common.jwt.secret = secret;
        }
        if let Some(secret) = lookup("VERIFY_TOKEN_SECRET") {
            self.common.jwt.verify_secret = Some(secret);
        }
        if let Some(user) = lookup("SMTP_USER") {
            self.notification.smtp.username = user;
        }
        if let Some(pass) = lookup("SMTP_PASS") {
            self.notification.smtp.password = pass;
        }
    }
}
