//! Overlay and foreground state definitions

use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};

/// The two states of the overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverlayState {
    /// Nothing locked is in the foreground
    #[default]
    Hidden,
    /// A locked app is in the foreground, overlay is blocking it
    Shown,
}

impl OverlayState {
    pub fn is_shown(&self) -> bool {
        matches!(self, OverlayState::Shown)
    }

    /// Paint a label in this state's terminal color
    pub fn paint(&self, text: &str) -> ColoredString {
        match self {
            OverlayState::Hidden => text.green(),
            OverlayState::Shown => text.red().bold(),
        }
    }

    /// Get emoji for state
    pub fn emoji(&self) -> &'static str {
        match self {
            OverlayState::Hidden => "🔓",
            OverlayState::Shown => "🔒",
        }
    }
}

impl std::fmt::Display for OverlayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OverlayState::Hidden => "HIDDEN",
            OverlayState::Shown => "SHOWN",
        };
        write!(f, "{}", name)
    }
}

/// The reconciler's only state carried across ticks.
///
/// After every running tick: `overlay == Shown` ⇔ `current_foreground_app ∈ LockSet`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundState {
    /// Latest foreground-app hypothesis, `None` until the first resume is seen
    pub current_foreground_app: Option<String>,
    pub overlay: OverlayState,
}

impl ForegroundState {
    pub fn overlay_visible(&self) -> bool {
        self.overlay.is_shown()
    }
}
