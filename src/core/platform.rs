//! Device platform seam: permissions and the home-screen action

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;
use crate::types::PlatformError;

/// Permission checks and the force-home policy action
pub trait Platform: Send + Sync {
    /// May the overlay be drawn over other apps
    fn can_draw_overlays(&self) -> bool;

    /// Open the overlay permission prompt if needed; returns the state after the prompt
    fn request_overlay_permission(&self) -> bool;

    /// Is usage-log access granted
    fn has_usage_access(&self) -> bool;

    /// Open the usage-access settings. The grant arrives asynchronously, so
    /// this always returns true.
    fn request_usage_access(&self) -> bool;

    /// Send the user back to the home screen
    fn go_home(&self) -> Result<(), PlatformError>;
}

/// Host-side platform with settable grants
#[derive(Debug)]
pub struct SimulatedPlatform {
    overlay_granted: AtomicBool,
    usage_granted: AtomicBool,
    overlay_prompts: AtomicU64,
    usage_prompts: AtomicU64,
    home_presses: AtomicU64,
}

impl SimulatedPlatform {
    pub fn new(overlay_granted: bool, usage_granted: bool) -> Self {
        Self {
            overlay_granted: AtomicBool::new(overlay_granted),
            usage_granted: AtomicBool::new(usage_granted),
            overlay_prompts: AtomicU64::new(0),
            usage_prompts: AtomicU64::new(0),
            home_presses: AtomicU64::new(0),
        }
    }

    /// Everything granted
    pub fn granted() -> Self {
        Self::new(true, true)
    }

    pub fn set_overlay_granted(&self, granted: bool) {
        self.overlay_granted.store(granted, Ordering::SeqCst);
    }

    pub fn set_usage_granted(&self, granted: bool) {
        self.usage_granted.store(granted, Ordering::SeqCst);
    }

    pub fn overlay_prompts(&self) -> u64 {
        self.overlay_prompts.load(Ordering::SeqCst)
    }

    pub fn usage_prompts(&self) -> u64 {
        self.usage_prompts.load(Ordering::SeqCst)
    }

    pub fn home_presses(&self) -> u64 {
        self.home_presses.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::granted()
    }
}

impl Platform for SimulatedPlatform {
    fn can_draw_overlays(&self) -> bool {
        self.overlay_granted.load(Ordering::SeqCst)
    }

    fn request_overlay_permission(&self) -> bool {
        if !self.can_draw_overlays() {
            self.overlay_prompts.fetch_add(1, Ordering::SeqCst);
            debug!("overlay permission prompt opened");
        }
        self.can_draw_overlays()
    }

    fn has_usage_access(&self) -> bool {
        self.usage_granted.load(Ordering::SeqCst)
    }

    fn request_usage_access(&self) -> bool {
        self.usage_prompts.fetch_add(1, Ordering::SeqCst);
        debug!("usage access settings opened");
        true
    }

    fn go_home(&self) -> Result<(), PlatformError> {
        self.home_presses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_prompt_only_when_missing() {
        let platform = SimulatedPlatform::new(false, false);
        assert!(!platform.request_overlay_permission());
        assert_eq!(platform.overlay_prompts(), 1);

        platform.set_overlay_granted(true);
        assert!(platform.request_overlay_permission());
        assert_eq!(platform.overlay_prompts(), 1);
    }

    #[test]
    fn test_usage_request_always_true() {
        let platform = SimulatedPlatform::new(true, false);
        assert!(platform.request_usage_access());
        assert!(!platform.has_usage_access());
    }
}
