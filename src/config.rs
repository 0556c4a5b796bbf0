//! Engine configuration.

use std::time::Duration;

use crate::routing::ReentryPolicy;
use crate::validate::ValidationMode;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// What to do with validation errors at load time.
    pub validation: ValidationMode,
    /// Where the cursor lands when a route re-enters a path.
    /// [`ReentryPolicy::Restart`] always enters at cursor 0, which loops on `c1/code`.
    pub reentry: ReentryPolicy,
    /// Multiplier on authored delays. 0.0 skips waiting entirely.
    pub delay_scale: f64,
    /// Pause before the player's own reply bubble appears.
    pub reply_delay_ms: u64,
    /// Buffer size of the outbound event channel.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validation: ValidationMode::WarnOnly,
            reentry: ReentryPolicy::ResumeAfterChoice,
            delay_scale: 1.0,
            reply_delay_ms: 0,
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    pub fn with_reentry(mut self, policy: ReentryPolicy) -> Self {
        self.reentry = policy;
        self
    }

    /// Negative and non-finite scales are treated as 0.
    pub fn with_delay_scale(mut self, scale: f64) -> Self {
        self.delay_scale = if scale.is_finite() { scale.max(0.0) } else { 0.0 };
        self
    }

    pub fn with_reply_delay_ms(mut self, ms: u64) -> Self {
        self.reply_delay_ms = ms;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Wall-clock wait for an authored delay.
    pub fn scaled(&self, delay_ms: u64) -> Duration {
        if !self.delay_scale.is_finite() || self.delay_scale <= 0.0 {
            return Duration::ZERO;
        }
        let base = Duration::from_millis(delay_ms);
        Duration::try_from_secs_f64(base.as_secs_f64() * self.delay_scale).unwrap_or(Duration::MAX)
    }
}
