use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "supabase" => Ok(StorageBackend::Supabase),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub seed_demo_data: bool,
    pub mail_api_key: String,
    pub mail_api_url: String,
    pub mail_from: String,
    pub app_base_url: String,
    pub notification_timeout_ms: u64,
    pub session_ttl_hours: i64,
    pub port: u16,
}

fn var_or_warn(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        if default.is_empty() {
            warn!("{} not set, using empty value", name);
        } else {
            warn!("{} not set, using default", name);
        }
        default.to_string()
    })
}

fn parsed_or_default<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = var_or_warn("SUPABASE_URL", "");
        let supabase_anon_key = var_or_warn("SUPABASE_ANON_PUBLIC_KEY", "");

        let default_backend = if supabase_url.is_empty() || supabase_anon_key.is_empty() {
            StorageBackend::Memory
        } else {
            StorageBackend::Supabase
        };

        let config = Self {
            supabase_url,
            supabase_anon_key,
            supabase_jwt_secret: var_or_warn("SUPABASE_JWT_SECRET", ""),
            storage_backend: parsed_or_default("STORAGE_BACKEND", default_backend),
            seed_demo_data: parsed_or_default("SEED_DEMO_DATA", false),
            mail_api_key: var_or_warn("MAIL_API_KEY", ""),
            mail_api_url: var_or_warn("MAIL_API_URL", "https://api.resend.com"),
            mail_from: var_or_warn("MAIL_FROM", "Dentbook <bookings@dentbook.app>"),
            app_base_url: var_or_warn("APP_BASE_URL", "http://localhost:5173"),
            notification_timeout_ms: parsed_or_default("NOTIFICATION_TIMEOUT_MS", 5000),
            session_ttl_hours: parsed_or_default("SESSION_TTL_HOURS", 24),
            port: parsed_or_default("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }
        if !config.is_mail_configured() {
            warn!("Mail transport not configured - notifications will be suppressed");
        }

        config
    }

    /// Database-backed deployment with token validation available.
    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_mail_configured(&self) -> bool {
        !self.mail_api_key.is_empty() && !self.mail_api_url.is_empty()
    }
}
