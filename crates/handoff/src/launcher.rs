//! Platform hooks for leaving the app.

use std::sync::Mutex;

use async_trait::async_trait;
use common::Error;
use serde::Serialize;
use tracing::{debug, info};

/// A third-party mini-program we can jump into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExternalApp {
    /// Short name used in config (`installed_apps`).
    pub name: &'static str,
    pub display_name: &'static str,
    pub app_id: &'static str,
    pub path: &'static str,
}

impl ExternalApp {
    pub const DIDI: ExternalApp = ExternalApp {
        name: "didi",
        display_name: "滴滴出行",
        app_id: "wxaf35009675aa0b2a",
        path: "pages/index/index",
    };

    pub const GAODE: ExternalApp = ExternalApp {
        name: "gaode",
        display_name: "高德打车",
        app_id: "wxd86ff8fa0e018134",
        path: "pages/index/index",
    };
}

/// Host capabilities used by the hand-off flows. Every call may fail; the
/// caller decides what to try next.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    async fn open_external_app(
        &self,
        app: &ExternalApp,
        params: &[(&str, String)],
    ) -> Result<(), Error>;

    async fn open_map(&self, name: &str, address: &str) -> Result<(), Error>;

    async fn set_clipboard(&self, text: &str) -> Result<(), Error>;
}

/// Launcher for hosts without real app switching. Only apps named in
/// `installed` open; everything else fails like a missing app would.
#[derive(Debug, Default)]
pub struct DryRunLauncher {
    installed: Vec<String>,
    map_available: bool,
    clipboard: Mutex<Option<String>>,
}

impl DryRunLauncher {
    pub fn new(installed: Vec<String>, map_available: bool) -> Self {
        Self {
            installed,
            map_available,
            clipboard: Mutex::new(None),
        }
    }

    pub fn clipboard(&self) -> Option<String> {
        self.clipboard
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn is_installed(&self, app: &ExternalApp) -> bool {
        self.installed
            .iter()
            .any(|i| i.eq_ignore_ascii_case(app.name) || i == app.app_id)
    }
}

#[async_trait]
impl AppLauncher for DryRunLauncher {
    async fn open_external_app(
        &self,
        app: &ExternalApp,
        params: &[(&str, String)],
    ) -> Result<(), Error> {
        if !self.is_installed(app) {
            return Err(Error::Handoff(format!("{} is not installed", app.display_name)));
        }
        debug!(
            "Opening {} ({}) at {} with {} params",
            app.display_name,
            app.app_id,
            app.path,
            params.len()
        );
        info!("Would launch {}", app.display_name);
        Ok(())
    }

    async fn open_map(&self, name: &str, _address: &str) -> Result<(), Error> {
        if !self.map_available {
            return Err(Error::Handoff("map view unavailable".into()));
        }
        info!("Would open map at {}", name);
        Ok(())
    }

    async fn set_clipboard(&self, text: &str) -> Result<(), Error> {
        *self.clipboard.lock().unwrap_or_else(|e| e.into_inner()) = Some(text.to_string());
        Ok(())
    }
}
