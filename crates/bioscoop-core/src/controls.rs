//! On-screen controls visibility
//!
//! Pointer activity shows the controls and re-arms a hide timer. The timer
//! itself lives in the player's scheduler; this type only decides what its
//! firing means.

use tracing::trace;

/// Player conditions consulted when the hide timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HideContext {
    pub is_playing: bool,
    pub quality_menu_open: bool,
    pub download_menu_open: bool,
}

impl HideContext {
    fn allows_hide(&self) -> bool {
        self.is_playing && !self.quality_menu_open && !self.download_menu_open
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlsVisibility {
    visible: bool,
}

impl ControlsVisibility {
    pub fn new() -> Self {
        Self { visible: true }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Pointer move or touch start. The caller re-arms the hide timer.
    pub fn on_activity(&mut self) {
        self.visible = true;
    }

    /// Hide timer fired; returns true if the controls were hidden
    pub fn on_hide_timer(&mut self, ctx: HideContext) -> bool {
        if ctx.allows_hide() {
            trace!("Hiding controls after inactivity");
            self.visible = false;
            true
        } else {
            false
        }
    }

    /// Pointer left the player surface
    pub fn on_pointer_leave(&mut self, is_playing: bool) {
        if is_playing {
            self.visible = false;
        }
    }

    /// Force the controls visible (pause, end of playback)
    pub fn show(&mut self) {
        self.visible = true;
    }
}

impl Default for ControlsVisibility {
    fn default() -> Self {
        Self::new()
    }
}
