//! Configuration loader: .env file, then config.toml, then env vars.

use common::config::{AppConfig, CacheMode};
use common::Error;
use std::path::Path;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn parse_cache_mode(raw: &str) -> Result<CacheMode, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "single_slot" | "single" => Ok(CacheMode::SingleSlot),
        "quantized" => Ok(CacheMode::Quantized),
        _ => Err(Error::Config(
            "CAREBELL_CACHE_MODE must be one of: single_slot, quantized".into(),
        )),
    }
}

fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.resolver.top_k == 0 {
        issues.push("resolver.top_k must be > 0".into());
    }
    if config.resolver.cache_ttl_secs == 0 {
        issues.push("resolver.cache_ttl_secs must be > 0".into());
    }
    if config.resolver.quantize_decimals > 6 {
        issues.push("resolver.quantize_decimals must be <= 6".into());
    }
    if config.resolver.search_keyword.trim().is_empty() {
        issues.push("resolver.search_keyword must not be empty".into());
    }
    if config.resolver.search_radius_m == 0 {
        issues.push("resolver.search_radius_m must be > 0".into());
    }

    if config.providers.primary_timeout_ms == 0 {
        issues.push("providers.primary_timeout_ms must be > 0".into());
    }
    if config.providers.secondary_timeout_ms == 0 {
        issues.push("providers.secondary_timeout_ms must be > 0".into());
    }
    if config.providers.reverse_geocode_timeout_ms == 0 {
        issues.push("providers.reverse_geocode_timeout_ms must be > 0".into());
    }
    if config.providers.nominatim_enabled && config.providers.user_agent.trim().is_empty() {
        issues.push("providers.user_agent is required when Nominatim is enabled".into());
    }

    if let Err(e) = config.default_location.coordinate().validate() {
        issues.push(format!("default_location: {e}"));
    }

    if config.preferences_path.trim().is_empty() {
        issues.push("preferences_path must not be empty".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load configuration from environment and optional config file.
pub fn load_config() -> Result<AppConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = AppConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(key) = std::env::var("TENCENT_MAP_KEY") {
        config.tencent_map_key = key.trim().to_string();
    }
    if let Ok(key) = std::env::var("AMAP_KEY") {
        config.amap_key = key.trim().to_string();
    }
    if let Ok(raw) = std::env::var("CAREBELL_TOP_K") {
        config.resolver.top_k = parse_positive_u64(&raw, "CAREBELL_TOP_K")? as usize;
    }
    if let Ok(raw) = std::env::var("CAREBELL_CACHE_TTL_SECS") {
        config.resolver.cache_ttl_secs = parse_positive_u64(&raw, "CAREBELL_CACHE_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("CAREBELL_CACHE_MODE") {
        config.resolver.cache_mode = parse_cache_mode(&raw)?;
    }
    if let Ok(raw) = std::env::var("CAREBELL_PRIMARY_TIMEOUT_MS") {
        config.providers.primary_timeout_ms =
            parse_positive_u64(&raw, "CAREBELL_PRIMARY_TIMEOUT_MS")?;
    }
    if let Ok(raw) = std::env::var("CAREBELL_SECONDARY_TIMEOUT_MS") {
        config.providers.secondary_timeout_ms =
            parse_positive_u64(&raw, "CAREBELL_SECONDARY_TIMEOUT_MS")?;
    }
    if let Ok(raw) = std::env::var("CAREBELL_NOMINATIM") {
        config.providers.nominatim_enabled = parse_bool(&raw);
    }
    if let Ok(path) = std::env::var("CAREBELL_PREFERENCES_PATH") {
        config.preferences_path = path;
    }
    if let Ok(raw) = std::env::var("CAREBELL_INSTALLED_APPS") {
        config.handoff.installed_apps = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    validate_config(&config)?;

    Ok(config)
}
