//! Reconciler signals and the event-plane messages they become

use serde::{Deserialize, Serialize};

/// Outcome of one reconciler tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "package", rename_all = "snake_case")]
pub enum Signal {
    /// A locked app came to the foreground
    Show(String),
    /// The foreground left the lock set
    Hide,
    /// No boundary crossing this tick
    None,
}

impl Signal {
    pub fn is_none(&self) -> bool {
        matches!(self, Signal::None)
    }

    /// Event-plane message for this signal, if it carries one
    pub fn to_message(&self) -> Option<OverlayMessage> {
        match self {
            Signal::Show(package) => Some(OverlayMessage::show(package.clone())),
            Signal::Hide => Some(OverlayMessage::HideOverlay),
            Signal::None => None,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Show(package) => write!(f, "SHOW({})", package),
            Signal::Hide => write!(f, "HIDE"),
            Signal::None => write!(f, "NONE"),
        }
    }
}

/// Message pushed to the UI layer. No response is expected.
///
/// Wire form: `{"method":"showOverlay","arguments":{"packageName":"..."}}`
/// from the monitor, `{"method":"showOverlay","arguments":null}` for a manual
/// show, and `{"method":"hideOverlay"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "arguments")]
pub enum OverlayMessage {
    #[serde(rename = "showOverlay")]
    ShowOverlay(Option<ShowArguments>),
    #[serde(rename = "hideOverlay")]
    HideOverlay,
}

/// Arguments of a monitor-driven show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowArguments {
    #[serde(rename = "packageName")]
    pub package_name: String,
}

impl OverlayMessage {
    /// Show for a detected foreground app
    pub fn show(package: impl Into<String>) -> Self {
        OverlayMessage::ShowOverlay(Some(ShowArguments {
            package_name: package.into(),
        }))
    }

    /// Package that triggered a show, `None` for manual shows and hides
    pub fn package(&self) -> Option<&str> {
        match self {
            OverlayMessage::ShowOverlay(Some(args)) => Some(&args.package_name),
            _ => None,
        }
    }
}
