//! Configuration types for the playout pipeline.

use std::time::Duration;

/// Configuration for the flow controller.
///
/// Use [`PlayerConfig::default()`] for the tuning the adaptive engine was
/// designed around, or customize as needed.
///
/// # Example
///
/// ```
/// use stream_playout::PlayerConfig;
///
/// let config = PlayerConfig {
///     max_chunk_bytes: 64 * 1024,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Absolute ceiling on a single chunk, in bytes.
    ///
    /// Chunks above this are dropped (never retried) and the enqueue call
    /// returns the chunk length as a drop sentinel.
    /// Default: 256 KiB
    pub max_chunk_bytes: u32,

    /// How much the queue capacity ceiling grows on each underrun, in bytes.
    ///
    /// Default: 8192
    pub max_size_growth: u32,

    /// Observation window for deciding whether the auto-resume threshold
    /// should also grow.
    ///
    /// Default: 10 seconds
    pub underrun_window: Duration,

    /// Underruns tolerated inside one window before the auto-resume
    /// threshold is raised.
    ///
    /// Default: 3
    pub underrun_window_limit: i32,

    /// Maximum number of recycled buffers kept idle; excess is freed.
    ///
    /// Default: 8
    pub idle_slot_cap: usize,

    /// Target rate the resampler converts to when the requested rate is
    /// not natively supported.
    ///
    /// Default: 48000 Hz
    pub resample_target_hz: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: 256 * 1024,
            max_size_growth: 8192,
            underrun_window: Duration::from_secs(10),
            underrun_window_limit: 3,
            idle_slot_cap: 8,
            resample_target_hz: 48_000,
        }
    }
}

/// Configuration for the chain router.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the router command channel.
    ///
    /// Audio and control share one channel so that chunks and chain
    /// mutations stay strictly ordered.
    /// Default: 64
    pub command_channel_capacity: usize,

    /// Cached sample rate reported before any provider announces a format.
    ///
    /// Default: 44100 Hz
    pub default_sample_rate: u32,

    /// Cached channel count reported before any provider announces a format.
    ///
    /// Default: 2
    pub default_channels: u32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_channel_capacity: 64,
            default_sample_rate: 44_100,
            default_channels: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_config_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.max_chunk_bytes, 256 * 1024);
        assert_eq!(config.max_size_growth, 8192);
        assert_eq!(config.underrun_window, Duration::from_secs(10));
        assert_eq!(config.underrun_window_limit, 3);
        assert_eq!(config.idle_slot_cap, 8);
        assert_eq!(config.resample_target_hz, 48_000);
    }

    #[test]
    fn test_hub_config_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.command_channel_capacity, 64);
        assert_eq!(config.default_sample_rate, 44_100);
        assert_eq!(config.default_channels, 2);
    }
}
