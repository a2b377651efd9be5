//! Sink trait: the contract between the chain router and a playback
//! endpoint.
//!
//! The crate's own [`Player`](crate::Player) implements `Sink`, but the
//! router works against the trait so embedders can substitute their own
//! terminal endpoint (a network relay, a capture buffer, a test double).

use crate::FormatError;

/// A playback endpoint that accepts routed audio.
///
/// All methods are synchronous and must be non-blocking or
/// bounded-latency: the router calls them from its event loop, and a
/// slow sink stalls routing for every endpoint.
///
/// # Implementation Notes
///
/// - Methods take `&self` - use interior mutability if needed
/// - `enqueue` never partially accepts: the return value is the full
///   chunk length (accepted, or dropped-as-oversized) or 0 (backpressure)
/// - Counters are free-running between `flush` calls
pub trait Sink: Send + Sync {
    /// Negotiates a new format.
    ///
    /// # Errors
    ///
    /// Fails with a [`FormatError`] for unsupported channel counts or bit
    /// depths; an unsupported sample rate is handled internally (by
    /// resampling) and is not an error.
    fn set_format(&self, sample_rate: u32, bit_depth: u32, channels: u32)
        -> Result<(), FormatError>;

    /// Offers a chunk of audio.
    ///
    /// Returns the chunk length on acceptance, 0 for backpressure (retry
    /// later), or the chunk length as a drop sentinel when the chunk
    /// exceeds the absolute size ceiling (never retried).
    fn enqueue(&self, data: &[u8]) -> u32;

    /// Bytes queued but not yet handed to the device.
    fn buffered_count(&self) -> i32;

    /// Bytes of queue capacity currently available.
    fn free_count(&self) -> i32;

    /// Samples written to the device since the last flush.
    fn total_written_samples(&self) -> i64;

    /// Underruns observed since the last flush.
    fn underflow_count(&self) -> i32;

    /// Stops playback and discards all queued audio; resets counters.
    fn flush(&self);

    /// The sample rate audio is actually played at.
    fn sample_rate(&self) -> i32;

    /// The channel count audio is actually played at.
    fn channels(&self) -> i32;

    /// Sets linear volume in `0.0..=1.0`; mapped to dB via
    /// [`volume_to_db`].
    fn set_volume(&self, volume: f32);

    /// Explicitly pauses or resumes playback, overriding the automatic
    /// buffer-level pause/resume.
    fn set_paused(&self, paused: bool);
}

/// Maps linear volume to attenuation in dB.
///
/// Volumes below 0.01 clamp to the -96 dB silence floor; above that the
/// mapping is the standard `20 * log10(volume)`.
///
/// # Example
///
/// ```
/// use stream_playout::volume_to_db;
///
/// assert_eq!(volume_to_db(1.0), 0.0);
/// assert_eq!(volume_to_db(0.0), -96.0);
/// assert!((volume_to_db(0.5) + 6.0206).abs() < 0.001);
/// ```
pub fn volume_to_db(volume: f32) -> f32 {
    if volume < 0.01 {
        -96.0
    } else {
        20.0 * volume.log10()
    }
}
