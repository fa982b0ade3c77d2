//! Application configuration types.

use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tencent location service (WebService API) key.
    #[serde(default)]
    pub tencent_map_key: String,

    /// AMap web service key, used for reverse geocoding.
    #[serde(default)]
    pub amap_key: String,

    /// Where to search when the device cannot produce a fix.
    #[serde(default)]
    pub default_location: LocationConfig,

    /// Nearby-facility resolver parameters.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Remote provider parameters.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Path of the JSON preference file.
    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,

    /// Outbound app handoff simulation.
    #[serde(default)]
    pub handoff: HandoffConfig,
}

/// A named fallback position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl LocationConfig {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// How resolved results are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// One entry, reused only for the exact same coordinate.
    SingleSlot,
    /// One entry per coordinate rounded to `quantize_decimals` places.
    ///
    /// A hit serves the list ranked for the origin that filled the cell, so
    /// `distance_km` can be off by up to the cell size (about 100 m at 3
    /// decimals) relative to the queried origin.
    Quantized,
}

/// Resolver thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How many facilities to return.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Cache lifetime in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_mode")]
    pub cache_mode: CacheMode,

    /// Decimal places kept when `cache_mode = "quantized"`.
    #[serde(default = "default_quantize_decimals")]
    pub quantize_decimals: u32,

    /// Keyword sent to search providers.
    #[serde(default = "default_keyword")]
    pub search_keyword: String,

    /// Search radius in meters.
    #[serde(default = "default_radius")]
    pub search_radius_m: u32,
}

/// Remote provider settings (all timeouts in milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_primary_timeout")]
    pub primary_timeout_ms: u64,

    #[serde(default = "default_secondary_timeout")]
    pub secondary_timeout_ms: u64,

    #[serde(default = "default_regeo_timeout")]
    pub reverse_geocode_timeout_ms: u64,

    /// Query the OpenStreetMap Nominatim service as second provider.
    #[serde(default = "default_true")]
    pub nominatim_enabled: bool,

    /// Nominatim requires an identifying User-Agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Which external apps the dry-run launcher pretends are installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffConfig {
    #[serde(default)]
    pub installed_apps: Vec<String>,

    #[serde(default = "default_true")]
    pub map_available: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_top_k() -> usize {
    3
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_cache_mode() -> CacheMode {
    CacheMode::SingleSlot
}
fn default_quantize_decimals() -> u32 {
    3
}
fn default_keyword() -> String {
    "医院".into()
}
fn default_radius() -> u32 {
    5000
}

fn default_primary_timeout() -> u64 {
    5000
}
fn default_secondary_timeout() -> u64 {
    3000
}
fn default_regeo_timeout() -> u64 {
    3000
}
fn default_user_agent() -> String {
    "carebell/0.1 (elder-care assistant; contact@example.com)".into()
}

fn default_preferences_path() -> String {
    "carebell-prefs.json".into()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: "Fuzhou Gulou".into(),
            lat: 26.0845,
            lon: 119.3005,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            cache_ttl_secs: default_cache_ttl(),
            cache_mode: default_cache_mode(),
            quantize_decimals: default_quantize_decimals(),
            search_keyword: default_keyword(),
            search_radius_m: default_radius(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary_timeout_ms: default_primary_timeout(),
            secondary_timeout_ms: default_secondary_timeout(),
            reverse_geocode_timeout_ms: default_regeo_timeout(),
            nominatim_enabled: true,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            installed_apps: Vec::new(),
            map_available: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tencent_map_key: String::new(),
            amap_key: String::new(),
            default_location: LocationConfig::default(),
            resolver: ResolverConfig::default(),
            providers: ProvidersConfig::default(),
            preferences_path: default_preferences_path(),
            handoff: HandoffConfig::default(),
        }
    }
}
