use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    pub webhook_secret: Option<String>,
    pub signature_tolerance_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
    pub billing: BillingConfig,
    pub signed_url_ttl_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: env_required("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "glowcoach"),
            audience: env_or("JWT_AUDIENCE", "glowcoach-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let storage = StorageConfig {
            endpoint: env_required("S3_ENDPOINT")?,
            access_key: env_required("S3_ACCESS_KEY")?,
            secret_key: env_required("S3_SECRET_KEY")?,
            region: env_or("S3_REGION", "us-east-1"),
        };
        let inference = InferenceConfig {
            base_url: env_or("AI_BASE_URL", "https://api.openai.com/v1"),
            api_key: env_required("AI_API_KEY")?,
            model: env_or("AI_MODEL", "gpt-4o"),
            timeout_secs: env_parse("AI_TIMEOUT_SECS", 120),
        };
        let billing = BillingConfig {
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            signature_tolerance_secs: env_parse("STRIPE_SIGNATURE_TOLERANCE_SECS", 300),
        };

        Ok(Self {
            database_url,
            jwt,
            storage,
            inference,
            billing,
            signed_url_ttl_secs: env_parse("SIGNED_URL_TTL_SECS", 600),
        })
    }
}
