//! User preferences: key-value persistence, display/voice settings with
//! change subscriptions, and the reserved-hospital list.

pub mod reservations;
pub mod settings;
pub mod store;

pub use reservations::ReservationBook;
pub use settings::{Dialect, FamilyVoice, FontRole, FontSize, Settings, SettingsContext, VolumeLevel};
pub use store::{JsonFileStore, MemoryStore, PreferenceStore};
