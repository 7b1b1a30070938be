use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default = "default_client_url")]
    pub client_url: String,
    #[serde(default)]
    pub stripe: Option<StripeConfig>,
    #[serde(default)]
    pub cloudinary: Option<CloudinaryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Marks cookies `Secure`.
    #[serde(default)]
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            worker_threads: Some(4),
            cors_origins: default_cors_origins(),
            production: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub access_token_secret: String,
    #[serde(default)]
    pub refresh_token_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_mins: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_days: i64,
    #[serde(default = "default_code_ttl")]
    pub verification_ttl_mins: i64,
    #[serde(default = "default_code_ttl")]
    pub reset_token_ttl_mins: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: String::new(),
            refresh_token_secret: String::new(),
            access_token_ttl_mins: default_access_ttl(),
            refresh_token_ttl_days: default_refresh_ttl(),
            verification_ttl_mins: default_code_ttl(),
            reset_token_ttl_mins: default_code_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self { url: "redis://127.0.0.1:6379/0".into() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    #[serde(default = "default_stripe_base")]
    pub api_base: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_true() -> bool { true }
fn default_access_ttl() -> i64 { 15 }
fn default_refresh_ttl() -> i64 { 7 }
fn default_code_ttl() -> i64 { 10 }
fn default_smtp_port() -> u16 { 587 }
fn default_from_address() -> String { "noreply@marketplace.local".into() }
fn default_stripe_base() -> String { "https://api.stripe.com".into() }
fn default_currency() -> String { "usd".into() }
fn default_folder() -> String { "services".into() }
fn default_client_url() -> String { "http://localhost:5173".into() }
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".into(), "http://localhost:3000".into()]
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Config file when present, defaults otherwise; env always wins.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig { client_url: default_client_url(), ..Default::default() },
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.auth.validate()?;
        if let Some(url) = env_nonempty("REDIS_URI").or_else(|| env_nonempty("REDIS_URL")) {
            self.redis.url = url;
        }
        if let Some(url) = env_nonempty("CLIENT_URL") {
            self.client_url = url;
        }
        self.client_url = self.client_url.trim_end_matches('/').to_string();
        if self.smtp.is_none() {
            self.smtp = SmtpConfig::from_env();
        }
        if self.stripe.is_none() {
            self.stripe = env_nonempty("STRIPE_SECRET_KEY").map(|secret_key| StripeConfig {
                secret_key,
                api_base: default_stripe_base(),
                currency: default_currency(),
            });
        }
        if self.cloudinary.is_none() {
            self.cloudinary = CloudinaryConfig::from_env();
        }
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if let Some(host) = env_nonempty("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = env_nonempty("SERVER_PORT").or_else(|| env_nonempty("PORT")) {
            self.port = port.parse().map_err(|_| anyhow!("SERVER_PORT must be a valid port"))?;
        }
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        if env_nonempty("APP_ENV").or_else(|| env_nonempty("NODE_ENV")).map(|v| v.eq_ignore_ascii_case("production")).unwrap_or(false) {
            self.production = true;
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if let Some(url) = env_nonempty("DATABASE_URL") {
            self.url = url;
        }
        if self.max_connections == 0 {
            self.max_connections = default_max_connections();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        if let Some(s) = env_nonempty("ACCESS_TOKEN_SECRET") {
            self.access_token_secret = s;
        }
        if let Some(s) = env_nonempty("REFRESH_TOKEN_SECRET") {
            self.refresh_token_secret = s;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_token_secret.trim().is_empty() || self.refresh_token_secret.trim().is_empty() {
            return Err(anyhow!("auth.access_token_secret and auth.refresh_token_secret are required"));
        }
        if self.access_token_secret == self.refresh_token_secret {
            return Err(anyhow!("access and refresh token secrets must differ"));
        }
        if self.access_token_ttl_mins <= 0 || self.refresh_token_ttl_days <= 0 {
            return Err(anyhow!("token lifetimes must be positive"));
        }
        if self.verification_ttl_mins <= 0 || self.reset_token_ttl_mins <= 0 {
            return Err(anyhow!("verification and reset windows must be positive"));
        }
        Ok(())
    }
}

impl SmtpConfig {
    /// `None` unless `SMTP_HOST` is set.
    pub fn from_env() -> Option<Self> {
        let host = env_nonempty("SMTP_HOST")?;
        Some(Self {
            host,
            port: env_nonempty("SMTP_PORT").and_then(|p| p.parse().ok()).unwrap_or(default_smtp_port()),
            username: env_nonempty("SMTP_USER"),
            password: env_nonempty("SMTP_PASSWORD"),
            from_address: env_nonempty("SMTP_FROM").unwrap_or_else(default_from_address),
        })
    }
}

impl CloudinaryConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            cloud_name: env_nonempty("CLOUDINARY_CLOUD_NAME")?,
            api_key: env_nonempty("CLOUDINARY_API_KEY")?,
            api_secret: env_nonempty("CLOUDINARY_API_SECRET")?,
            folder: default_folder(),
        })
    }
}
