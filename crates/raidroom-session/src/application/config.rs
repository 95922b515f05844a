//! Room timing and fallback tuning.

use std::time::Duration;

/// Timing and fallback parameters of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Length of the action-collection window, in ticks.
    pub turn_seconds: u32,
    /// Countdown tick period.
    pub tick: Duration,
    /// Pause after a settled turn before the next phase begins.
    pub phase_pause: Duration,
    /// Cooldown after victory or defeat before the room resets.
    pub reset_delay: Duration,
    /// Deadline for a single oracle call.
    pub oracle_timeout: Duration,
    /// Smallest fallback strike.
    pub fallback_damage_min: u32,
    /// Largest fallback strike.
    pub fallback_damage_max: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            turn_seconds: 60,
            tick: Duration::from_secs(1),
            phase_pause: Duration::from_secs(3),
            reset_delay: Duration::from_secs(10),
            oracle_timeout: Duration::from_secs(30),
            fallback_damage_min: 20,
            fallback_damage_max: 44,
        }
    }
}
