//! Resume / continue-watching tracking
//!
//! One saved position per content item. The tracker decides once, when
//! the duration first becomes known, whether to jump to it, and gates
//! which positions are worth persisting.

use crate::{config::PlayerConfig, store::ContentStore, Result};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeTracker {
    content_id: Option<String>,
    saved_position: Option<f64>,
    resolved: bool,
    min_position: f64,
    tail_margin: f64,
    min_persist_position: f64,
}

impl ResumeTracker {
    pub fn new(content_id: Option<String>, config: &PlayerConfig) -> Self {
        Self {
            content_id,
            saved_position: None,
            resolved: false,
            min_position: config.resume_min_position,
            tail_margin: config.resume_tail_margin,
            min_persist_position: config.min_persist_position,
        }
    }

    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// Read the saved position of this content from the store
    pub async fn load(&mut self, store: &dyn ContentStore) -> Result<()> {
        let Some(content_id) = self.content_id.as_deref() else {
            return Ok(());
        };
        let position = store.get_watch_position(content_id).await?;
        self.set_saved_position(position);
        Ok(())
    }

    /// Position read from the store at mount
    pub fn set_saved_position(&mut self, position: Option<f64>) {
        debug!(?position, "Saved position loaded");
        self.saved_position = position;
    }

    pub fn saved_position(&self) -> Option<f64> {
        self.saved_position
    }

    /// Whether the resume decision has been taken
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Position to seek to, at most once per source.
    ///
    /// Seeks only when `min < saved < duration - tail`. Calls before the
    /// duration is known do not consume the decision.
    pub fn resume_target(&mut self, duration: f64) -> Option<f64> {
        if self.resolved || duration <= 0.0 || !duration.is_finite() {
            return None;
        }
        self.resolved = true;

        let saved = self.saved_position?;
        if saved > self.min_position && saved < duration - self.tail_margin {
            info!(position = saved, duration, "Resuming from saved position");
            Some(saved)
        } else {
            debug!(position = saved, duration, "Saved position outside resume window");
            None
        }
    }

    /// Negligible positions (accidental opens) are not persisted
    pub fn should_persist(&self, current_time: f64) -> bool {
        self.content_id.is_some() && current_time > self.min_persist_position
    }

    /// Forget the decision for a new source
    pub fn reset(&mut self) {
        self.saved_position = None;
        self.resolved = false;
    }
}
