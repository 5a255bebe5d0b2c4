//! Validation policy: configurable limits with documented defaults
//!
//! A policy is immutable per validation call. Callers start from
//! `ValidationPolicy::default()` and merge partial overrides over it;
//! there is no mutable global configuration.

use weft_common::config::ValidationOverrides;

/// Output gain ceiling. Not configurable; clipping protection.
pub const MAX_GAIN: f64 = 2.0;

/// Speed-multiplier ceiling for `.fast()` / `.hurry()`. Not
/// configurable; values beyond this glitch the audio engine.
pub const MAX_SPEED_FACTOR: f64 = 50.0;

/// Minimum meaningful line count. A real composition needs at least a
/// tempo call and one voice. Not configurable.
pub const MIN_MEANINGFUL_LINES: usize = 2;

/// Limits applied when validating a generated artifact
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPolicy {
    /// Maximum number of voice declarations (`$:`)
    pub max_voices: usize,
    /// Maximum number of non-blank, non-comment lines
    pub max_lines: usize,
    /// Maximum total stochastic operations (rand/perlin/probability transforms)
    pub max_random_usage: usize,
    /// Maximum effect calls on any single voice line
    pub max_effects_per_voice: usize,
    /// Whether a `setcpm()` tempo call is required
    pub require_setcpm: bool,
    /// Whether remote (http/https, including localhost) sample sources
    /// are rejected
    pub reject_localhost: bool,
    /// Ceiling for `.delayfeedback()` amounts
    pub max_delay_feedback: f64,
    /// Ceiling for `.room()` sizes
    pub max_room_size: f64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_voices: 8,
            max_lines: 250,
            max_random_usage: 15,
            max_effects_per_voice: 8,
            require_setcpm: true,
            reject_localhost: true,
            max_delay_feedback: 0.7,
            max_room_size: 0.95,
        }
    }
}

impl ValidationPolicy {
    /// Merge partial overrides over this policy, returning the result
    pub fn with_overrides(&self, overrides: &ValidationOverrides) -> Self {
        Self {
            max_voices: overrides.max_voices.unwrap_or(self.max_voices),
            max_lines: overrides.max_lines.unwrap_or(self.max_lines),
            max_random_usage: overrides.max_random_usage.unwrap_or(self.max_random_usage),
            max_effects_per_voice: overrides
                .max_effects_per_voice
                .unwrap_or(self.max_effects_per_voice),
            require_setcpm: overrides.require_setcpm.unwrap_or(self.require_setcpm),
            reject_localhost: overrides.reject_localhost.unwrap_or(self.reject_localhost),
            max_delay_feedback: overrides
                .max_delay_feedback
                .unwrap_or(self.max_delay_feedback),
            max_room_size: overrides.max_room_size.unwrap_or(self.max_room_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let policy = ValidationPolicy::default();
        assert_eq!(policy.max_voices, 8);
        assert_eq!(policy.max_lines, 250);
        assert_eq!(policy.max_random_usage, 15);
        assert_eq!(policy.max_effects_per_voice, 8);
        assert!(policy.require_setcpm);
        assert!(policy.reject_localhost);
        assert_eq!(policy.max_delay_feedback, 0.7);
        assert_eq!(policy.max_room_size, 0.95);
    }

    #[test]
    fn overrides_merge_independently() {
        let overrides = ValidationOverrides {
            max_voices: Some(4),
            require_setcpm: Some(false),
            ..Default::default()
        };
        let policy = ValidationPolicy::default().with_overrides(&overrides);
        assert_eq!(policy.max_voices, 4);
        assert!(!policy.require_setcpm);
        // Unset fields keep defaults
        assert_eq!(policy.max_lines, 250);
        assert_eq!(policy.max_room_size, 0.95);
    }
}
