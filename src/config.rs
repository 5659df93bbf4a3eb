//! Environment-driven configuration for both services.
//!
//! Each service loads its settings once at startup via `from_env`, with
//! relaxed defaults when `APP_ENV=dev` (or unset) and strict validation
//! otherwise — a missing required variable or an out-of-range value is a
//! startup error, not a runtime surprise.

use std::env;

fn is_dev() -> bool {
    env::var("DEV_MODE")
        .unwrap_or_else(|_| "false".to_string())
        .parse()
        .unwrap_or(false)
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_required_unless_dev(key: &str, default: &str) -> Result<String, String> {
    if is_dev() {
        Ok(env_or(key, default))
    } else {
        env::var(key).map_err(|_| format!("{key} is required in production"))
    }
}

fn parse_range(key: &str, raw: &str, min: i64, max: i64) -> Result<i64, String> {
    let value: i64 = raw
        .parse()
        .map_err(|_| format!("{key} must be an integer, got {raw:?}"))?;
    if value < min || value > max {
        return Err(format!(
            "{key} must be in range [{min}, {max}], got {value}"
        ));
    }
    Ok(value)
}

fn parse_bitrates(raw: &str) -> Result<Vec<i64>, String> {
    let bitrates: Vec<i64> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| format!("invalid bitrate {s:?} in AVAILABLE_BITRATES"))
        })
        .collect::<Result<_, _>>()?;
    if bitrates.is_empty() {
        return Err("AVAILABLE_BITRATES must list at least one bitrate".into());
    }
    Ok(bitrates)
}

/// Streaming Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub app_name: String,
    pub port: u16,
    pub base_url: String,
    pub cdn_base_url: Option<String>,
    pub signing_secret: String,
    pub playlist_ttl_seconds: i64,
    pub segment_ttl_seconds: i64,
    pub available_bitrates: Vec<i64>,
    pub minio_bucket: String,
    pub is_dev: bool,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, String> {
        let is_dev = is_dev();

        let port: u16 = env_or("PORT", "8000")
            .parse()
            .map_err(|_| "PORT must be a valid port number".to_string())?;

        let base_url = env_required_unless_dev("BASE_URL", "http://localhost:8000")?;
        let cdn_base_url = env::var("CDN_BASE_URL").ok().filter(|s| !s.is_empty());

        let signing_secret = env_required_unless_dev("SIGNING_SECRET", "change-me-in-dev-only")?;
        if signing_secret.len() < 8 {
            return Err("SIGNING_SECRET must be at least 8 characters".into());
        }

        let playlist_ttl_seconds = parse_range(
            "PLAYLIST_TTL_SECONDS",
            &env_or("PLAYLIST_TTL_SECONDS", "300"),
            60,
            3600,
        )?;
        let segment_ttl_seconds = parse_range(
            "SEGMENT_TTL_SECONDS",
            &env_or("SEGMENT_TTL_SECONDS", "60"),
            10,
            600,
        )?;

        let available_bitrates = parse_bitrates(&env_or(
            "AVAILABLE_BITRATES",
            "256000,160000,96000",
        ))?;

        let minio_bucket = env_or("MINIO_BUCKET", "tracks");

        Ok(Self {
            app_name: env_or("APP_NAME", "Streaming Gateway"),
            port,
            base_url,
            cdn_base_url,
            signing_secret,
            playlist_ttl_seconds,
            segment_ttl_seconds,
            available_bitrates,
            minio_bucket,
            is_dev,
        })
    }

    /// The base URL used when minting stream-metadata responses:
    /// `cdn_base_url` wins when set, so clients are handed CDN URLs
    /// instead of the origin's own address whenever a CDN is fronting it.
    pub fn public_base_url(&self) -> &str {
        self.cdn_base_url.as_deref().unwrap_or(&self.base_url)
    }

    pub fn ttl_policy(&self) -> crate::playlist::TtlPolicy {
        crate::playlist::TtlPolicy {
            playlist_ttl: self.playlist_ttl_seconds,
            segment_ttl: self.segment_ttl_seconds,
        }
    }
}

/// CDN Edge configuration.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    pub app_name: String,
    pub port: u16,
    pub origin_base_url: String,
    pub origin_api_base_url: String,
    pub cache_playlist_ttl: i64,
    pub cache_segment_ttl: i64,
    pub cache_static_ttl: i64,
    pub cache_max_size: usize,
    pub log_requests: bool,
    pub log_cache_stats: bool,
    pub is_dev: bool,
}

impl EdgeConfig {
    pub fn from_env() -> Result<Self, String> {
        let is_dev = is_dev();

        let port: u16 = env_or("PORT", "8080")
            .parse()
            .map_err(|_| "PORT must be a valid port number".to_string())?;

        let origin_base_url =
            env_required_unless_dev("ORIGIN_BASE_URL", "http://localhost:8000")?;
        let origin_api_base_url = env::var("ORIGIN_API_BASE_URL")
            .unwrap_or_else(|_| origin_base_url.clone());

        let cache_playlist_ttl = parse_range(
            "EDGE_CACHE_PLAYLIST_TTL",
            &env_or("EDGE_CACHE_PLAYLIST_TTL", "60"),
            1,
            i64::MAX,
        )?;
        let cache_segment_ttl = parse_range(
            "EDGE_CACHE_SEGMENT_TTL",
            &env_or("EDGE_CACHE_SEGMENT_TTL", "3600"),
            1,
            i64::MAX,
        )?;
        let cache_static_ttl = parse_range(
            "EDGE_CACHE_STATIC_TTL",
            &env_or("EDGE_CACHE_STATIC_TTL", "86400"),
            1,
            i64::MAX,
        )?;

        let cache_max_size: usize = env_or("EDGE_CACHE_MAX_SIZE", "1000")
            .parse()
            .map_err(|_| "EDGE_CACHE_MAX_SIZE must be an integer".to_string())?;
        if cache_max_size < 100 {
            return Err("EDGE_CACHE_MAX_SIZE must be >= 100".into());
        }

        let log_requests: bool = env_or("LOG_REQUESTS", "true").parse().unwrap_or(true);
        let log_cache_stats: bool = env_or("LOG_CACHE_STATS", "true").parse().unwrap_or(true);

        Ok(Self {
            app_name: env_or("APP_NAME", "CDN Service"),
            port,
            origin_base_url,
            origin_api_base_url,
            cache_playlist_ttl,
            cache_segment_ttl,
            cache_static_ttl,
            cache_max_size,
            log_requests,
            log_cache_stats,
            is_dev,
        })
    }

    pub fn ttl_policy(&self) -> crate::cache::EdgeTtlPolicy {
        crate::cache::EdgeTtlPolicy {
            playlist_ttl: self.cache_playlist_ttl,
            segment_ttl: self.cache_segment_ttl,
            static_ttl: self.cache_static_ttl,
        }
    }
}
