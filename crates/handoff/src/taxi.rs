//! Taxi hand-off: Didi, then Gaode, then the map, then written instructions.

use std::sync::Arc;

use common::Error;
use serde::Serialize;
use tracing::{info, warn};

use crate::launcher::{AppLauncher, ExternalApp};

/// Where the user ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum HandoffOutcome {
    App { app: ExternalApp, clipboard_copied: bool },
    Map { clipboard_copied: bool },
    ManualGuide { message: String },
}

impl HandoffOutcome {
    /// Text to show or read aloud after the hand-off.
    pub fn message(&self, destination: &str) -> String {
        match self {
            HandoffOutcome::App { app, clipboard_copied: true } => format!(
                "目的地\"{destination}\"已复制到剪贴板\n\n如果{}未自动填写，请在目的地输入框长按粘贴即可",
                app.display_name
            ),
            HandoffOutcome::App { app, clipboard_copied: false } => {
                format!("已打开{}，请输入目的地：{destination}", app.display_name)
            }
            HandoffOutcome::Map { clipboard_copied: true } => {
                "目的地已复制，可在打车应用中粘贴".to_string()
            }
            HandoffOutcome::Map { clipboard_copied: false } => {
                format!("已在地图中打开：{destination}")
            }
            HandoffOutcome::ManualGuide { message } => message.clone(),
        }
    }
}

pub struct TaxiHandoff {
    launcher: Arc<dyn AppLauncher>,
}

impl TaxiHandoff {
    pub fn new(launcher: Arc<dyn AppLauncher>) -> Self {
        Self { launcher }
    }

    /// Try each route in order and report the first that worked.
    pub async fn hail(&self, destination: &str) -> Result<HandoffOutcome, Error> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(Error::InvalidInput("destination is empty".into()));
        }

        let clipboard_copied = match self.launcher.set_clipboard(destination).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not copy destination to clipboard: {}", e);
                false
            }
        };

        // Didi's field name for the destination is undocumented, so send all the likely ones.
        let didi_params: Vec<(&str, String)> = [
            "end_address",
            "end_name",
            "endAddress",
            "endName",
            "destination",
            "to",
        ]
        .into_iter()
        .map(|k| (k, destination.to_string()))
        .collect();

        match self
            .launcher
            .open_external_app(&ExternalApp::DIDI, &didi_params)
            .await
        {
            Ok(()) => return Ok(self.launched(ExternalApp::DIDI, clipboard_copied)),
            Err(e) => warn!("Didi hand-off failed: {}", e),
        }

        let gaode_params = [("destination", destination.to_string())];
        match self
            .launcher
            .open_external_app(&ExternalApp::GAODE, &gaode_params)
            .await
        {
            Ok(()) => return Ok(self.launched(ExternalApp::GAODE, clipboard_copied)),
            Err(e) => warn!("Gaode hand-off failed: {}", e),
        }

        match self.launcher.open_map(destination, destination).await {
            Ok(()) => {
                info!("Taxi hand-off fell back to the map view");
                return Ok(HandoffOutcome::Map { clipboard_copied });
            }
            Err(e) => warn!("Map hand-off failed: {}", e),
        }

        info!("No taxi app available, showing manual guide");
        Ok(HandoffOutcome::ManualGuide {
            message: manual_guide(destination, clipboard_copied),
        })
    }

    fn launched(&self, app: ExternalApp, clipboard_copied: bool) -> HandoffOutcome {
        info!("Taxi hand-off to {}", app.display_name);
        HandoffOutcome::App {
            app,
            clipboard_copied,
        }
    }
}

fn manual_guide(destination: &str, clipboard_copied: bool) -> String {
    if clipboard_copied {
        format!(
            "目的地\"{destination}\"已复制到剪贴板\n\n请手动打开滴滴、高德等打车应用，在目的地输入框中长按粘贴"
        )
    } else {
        format!("请手动打开滴滴、高德等打车应用，并输入目的地：{destination}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::DryRunLauncher;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call; fails all of them.
    #[derive(Default)]
    struct NothingWorks {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AppLauncher for NothingWorks {
        async fn open_external_app(
            &self,
            app: &ExternalApp,
            params: &[(&str, String)],
        ) -> Result<(), Error> {
            let keys: Vec<&str> = params.iter().map(|(k, _)| *k).collect();
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", app.name, keys.join(",")));
            Err(Error::Handoff("nope".into()))
        }

        async fn open_map(&self, _name: &str, _address: &str) -> Result<(), Error> {
            self.calls.lock().unwrap().push("map".into());
            Err(Error::Handoff("nope".into()))
        }

        async fn set_clipboard(&self, _text: &str) -> Result<(), Error> {
            self.calls.lock().unwrap().push("clipboard".into());
            Err(Error::Handoff("nope".into()))
        }
    }

    #[tokio::test]
    async fn test_didi_first() {
        let launcher = Arc::new(DryRunLauncher::new(
            vec!["didi".into(), "gaode".into()],
            true,
        ));
        let handoff = TaxiHandoff::new(launcher.clone());

        let outcome = handoff.hail("  福建省立医院 ").await.unwrap();

        assert_eq!(
            outcome,
            HandoffOutcome::App {
                app: ExternalApp::DIDI,
                clipboard_copied: true
            }
        );
        assert_eq!(launcher.clipboard().as_deref(), Some("福建省立医院"));
    }

    #[tokio::test]
    async fn test_gaode_when_didi_missing() {
        let launcher = Arc::new(DryRunLauncher::new(vec!["wxd86ff8fa0e018134".into()], true));
        let outcome = TaxiHandoff::new(launcher).hail("火车站").await.unwrap();

        assert!(matches!(
            outcome,
            HandoffOutcome::App { app, .. } if app == ExternalApp::GAODE
        ));
    }

    #[tokio::test]
    async fn test_map_when_no_apps() {
        let launcher = Arc::new(DryRunLauncher::new(Vec::new(), true));
        let outcome = TaxiHandoff::new(launcher).hail("火车站").await.unwrap();

        assert_eq!(outcome, HandoffOutcome::Map { clipboard_copied: true });
    }

    #[tokio::test]
    async fn test_manual_guide_tries_every_route_in_order() {
        let launcher = Arc::new(NothingWorks::default());
        let outcome = TaxiHandoff::new(launcher.clone())
            .hail("西湖公园")
            .await
            .unwrap();

        let HandoffOutcome::ManualGuide { message } = &outcome else {
            panic!("expected manual guide, got {outcome:?}");
        };
        assert!(message.contains("西湖公园"));
        assert!(!message.contains("剪贴板"));

        let calls = launcher.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "clipboard".to_string(),
                "didi:end_address,end_name,endAddress,endName,destination,to".to_string(),
                "gaode:destination".to_string(),
                "map".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_destination_rejected() {
        let launcher = Arc::new(DryRunLauncher::default());
        let err = TaxiHandoff::new(launcher).hail("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_outcome_messages_mention_destination() {
        let app = HandoffOutcome::App {
            app: ExternalApp::DIDI,
            clipboard_copied: true,
        };
        assert!(app.message("银行").contains("银行"));
        assert!(app.message("银行").contains("滴滴出行"));
    }
}
