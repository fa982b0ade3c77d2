//! Display and voice settings shared by every view.
//!
//! A [`SettingsContext`] owns the current [`Settings`], persists each change
//! under [`SETTINGS_KEY`], and broadcasts it over a `watch` channel so views
//! re-render without polling.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use common::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::store::PreferenceStore;

pub const SETTINGS_KEY: &str = "appSetting";

pub const DEFAULT_VOLUME: u8 = 80;
pub const MAX_VOLUME: u8 = 100;

/// Base font size in rpx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FontSize {
    #[default]
    Standard,
    Large,
    ExtraLarge,
}

impl FontSize {
    pub const ALL: [FontSize; 3] = [FontSize::Standard, FontSize::Large, FontSize::ExtraLarge];

    pub const fn base_px(self) -> u32 {
        match self {
            FontSize::Standard => 28,
            FontSize::Large => 32,
            FontSize::ExtraLarge => 36,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FontSize::Standard => "标准",
            FontSize::Large => "大号",
            FontSize::ExtraLarge => "超大号",
        }
    }

    /// Pixel size for a text role at this base size.
    pub fn font_px(self, role: FontRole) -> f64 {
        f64::from(self.base_px()) * role.ratio()
    }
}

impl TryFrom<u32> for FontSize {
    type Error = String;

    fn try_from(px: u32) -> Result<Self, Self::Error> {
        FontSize::ALL
            .into_iter()
            .find(|s| s.base_px() == px)
            .ok_or_else(|| format!("unsupported base font size {px}"))
    }
}

impl From<FontSize> for u32 {
    fn from(size: FontSize) -> u32 {
        size.base_px()
    }
}

impl FromStr for FontSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "标准" | "28" => Ok(FontSize::Standard),
            "large" | "大号" | "32" => Ok(FontSize::Large),
            "extra-large" | "extra_large" | "xl" | "超大号" | "36" => Ok(FontSize::ExtraLarge),
            other => Err(Error::InvalidInput(format!("unknown font size '{other}'"))),
        }
    }
}

/// Text roles scaled from the base font size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    Title,
    Content,
    Button,
    Time,
}

impl FontRole {
    pub const fn ratio(self) -> f64 {
        match self {
            FontRole::Title => 1.4,
            FontRole::Content => 1.0,
            FontRole::Button => 1.1,
            FontRole::Time => 0.8,
        }
    }
}

/// Coarse volume band shown next to the slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLevel {
    Mute,
    Low,
    Medium,
    Max,
}

impl VolumeLevel {
    pub const fn from_volume(volume: u8) -> Self {
        match volume {
            0 => VolumeLevel::Mute,
            1..=30 => VolumeLevel::Low,
            31..=70 => VolumeLevel::Medium,
            _ => VolumeLevel::Max,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            VolumeLevel::Mute => "静音",
            VolumeLevel::Low => "小音量",
            VolumeLevel::Medium => "中音量",
            VolumeLevel::Max => "最大音量",
        }
    }
}

/// Speech dialect. Stored by its Chinese label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    #[serde(rename = "普通话")]
    Mandarin,
    #[serde(rename = "四川话")]
    Sichuanese,
    #[serde(rename = "粤语")]
    Cantonese,
    #[serde(rename = "英语")]
    English,
    #[serde(rename = "上海话")]
    Shanghainese,
    #[serde(rename = "东北话")]
    Northeastern,
    #[serde(rename = "陕西话")]
    Shaanxi,
    #[serde(rename = "河南话")]
    Henan,
    #[serde(rename = "杭州话")]
    Hangzhou,
    #[serde(rename = "闽南话")]
    Hokkien,
    #[serde(rename = "客家话")]
    Hakka,
}

impl Dialect {
    pub const ALL: [Dialect; 11] = [
        Dialect::Mandarin,
        Dialect::Sichuanese,
        Dialect::Cantonese,
        Dialect::English,
        Dialect::Shanghainese,
        Dialect::Northeastern,
        Dialect::Shaanxi,
        Dialect::Henan,
        Dialect::Hangzhou,
        Dialect::Hokkien,
        Dialect::Hakka,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Dialect::Mandarin => "普通话",
            Dialect::Sichuanese => "四川话",
            Dialect::Cantonese => "粤语",
            Dialect::English => "英语",
            Dialect::Shanghainese => "上海话",
            Dialect::Northeastern => "东北话",
            Dialect::Shaanxi => "陕西话",
            Dialect::Henan => "河南话",
            Dialect::Hangzhou => "杭州话",
            Dialect::Hokkien => "闽南话",
            Dialect::Hakka => "客家话",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    /// Accepts the Chinese label or the English variant name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Dialect::ALL
            .into_iter()
            .find(|d| d.label() == s || format!("{d:?}").eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown dialect '{s}'")))
    }
}

/// Family-member voice used for read-aloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FamilyVoice {
    #[serde(rename = "孙子")]
    Grandson,
    #[serde(rename = "女儿")]
    Daughter,
}

impl FromStr for FamilyVoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grandson" | "孙子" => Ok(FamilyVoice::Grandson),
            "daughter" | "女儿" => Ok(FamilyVoice::Daughter),
            other => Err(Error::InvalidInput(format!("unknown voice '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub font_size: FontSize,
    pub volume: u8,
    pub dialect: Dialect,
    pub voices: Vec<FamilyVoice>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_size: FontSize::default(),
            volume: DEFAULT_VOLUME,
            dialect: Dialect::default(),
            voices: Vec::new(),
        }
    }
}

impl Settings {
    /// Decode a stored value, keeping every field that parses and defaulting
    /// the rest.
    pub fn from_stored(value: &Value) -> Self {
        let defaults = Settings::default();
        let Some(obj) = value.as_object() else {
            warn!("Stored settings are not an object, using defaults");
            return defaults;
        };

        fn field<T: serde::de::DeserializeOwned>(
            obj: &serde_json::Map<String, Value>,
            key: &str,
            default: T,
        ) -> T {
            match obj.get(key) {
                None | Some(Value::Null) => default,
                Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
                    warn!("Ignoring stored setting {}: {}", key, e);
                    default
                }),
            }
        }

        let volume: u8 = field(obj, "volume", defaults.volume);
        Settings {
            font_size: field(obj, "fontSize", defaults.font_size),
            volume: volume.min(MAX_VOLUME),
            dialect: field(obj, "dialect", defaults.dialect),
            voices: field(obj, "voices", defaults.voices),
        }
    }

    pub fn volume_level(&self) -> VolumeLevel {
        VolumeLevel::from_volume(self.volume)
    }

    pub fn font_px(&self, role: FontRole) -> f64 {
        self.font_size.font_px(role)
    }

    /// Toggle a family voice on or off.
    pub fn toggle_voice(&mut self, voice: FamilyVoice) {
        if let Some(pos) = self.voices.iter().position(|v| *v == voice) {
            self.voices.remove(pos);
        } else {
            self.voices.push(voice);
        }
    }
}

/// Shared settings handle. Cheap to clone; all clones see the same state.
#[derive(Clone)]
pub struct SettingsContext {
    store: Arc<dyn PreferenceStore>,
    tx: Arc<watch::Sender<Settings>>,
}

impl SettingsContext {
    /// Load persisted settings. Unreadable storage yields defaults.
    pub fn load(store: Arc<dyn PreferenceStore>) -> Self {
        let settings = match store.load(SETTINGS_KEY) {
            Ok(Some(value)) => Settings::from_stored(&value),
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Failed to read settings, using defaults: {}", e);
                Settings::default()
            }
        };
        let (tx, _rx) = watch::channel(settings);
        Self {
            store,
            tx: Arc::new(tx),
        }
    }

    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Apply `f`, persist the result, then notify subscribers.
    ///
    /// Nothing is broadcast if persisting fails.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<Settings, Error> {
        let mut next = self.current();
        f(&mut next);
        next.volume = next.volume.min(MAX_VOLUME);
        self.commit(next)
    }

    pub fn reset_defaults(&self) -> Result<Settings, Error> {
        self.commit(Settings::default())
    }

    fn commit(&self, next: Settings) -> Result<Settings, Error> {
        self.store.save(SETTINGS_KEY, serde_json::to_value(&next)?)?;
        info!(
            "Settings saved: font={} volume={} dialect={}",
            next.font_size.base_px(),
            next.volume,
            next.dialect
        );
        self.tx.send_replace(next.clone());
        Ok(next)
    }
}

impl fmt::Debug for SettingsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsContext")
            .field("current", &*self.tx.borrow())
            .finish()
    }
}
