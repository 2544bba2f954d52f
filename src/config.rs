use std::path::PathBuf;

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

/// S3/MinIO bucket that receives avatars and cover images.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base used to build the public URL of an uploaded object.
    pub public_url: String,
    /// Where multipart files are staged before upload.
    pub temp_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    /// Sets the `Secure` attribute on auth cookies.
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "vidtube".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "vidtube-users".into()),
            ttl_minutes: ttl_minutes(&get, "JWT_TTL_MINUTES", 15)?,
            refresh_ttl_minutes: ttl_minutes(&get, "JWT_REFRESH_TTL_MINUTES", 60 * 24 * 10)?,
        };

        let endpoint = required("MINIO_ENDPOINT")?;
        let storage = StorageConfig {
            public_url: get("MEDIA_PUBLIC_URL").unwrap_or_else(|| endpoint.clone()),
            endpoint,
            bucket: required("MINIO_BUCKET")?,
            access_key: required("MINIO_ACCESS_KEY")?,
            secret_key: required("MINIO_SECRET_KEY")?,
            region: get("MINIO_REGION").unwrap_or_else(|| "us-east-1".into()),
            temp_dir: get("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./public/temp")),
        };

        let cookie_secure = get("COOKIE_SECURE")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Ok(Self {
            database_url,
            jwt,
            storage,
            cookie_secure,
        })
    }
}

/// Upper bound for token lifetimes: one year.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 366;

fn ttl_minutes<F>(get: &F, key: &str, default: i64) -> anyhow::Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let minutes = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("{key} must be a whole number of minutes"))?;
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("{key} must be between 1 and {MAX_TTL_MINUTES} minutes, got {minutes}");
    }
    Ok(minutes)
}
