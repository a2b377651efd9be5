//! Runtime events for monitoring playout health.
//!
//! Events are non-fatal notifications about pipeline behavior. Playback
//! continues after every event - they exist for logging/metrics, not error
//! handling.

use std::sync::Arc;

/// Runtime events emitted during playout.
///
/// These are informational events, not errors. Register an
/// [`EventCallback`] to log them or update metrics.
///
/// # Example
///
/// ```
/// use stream_playout::StreamEvent;
///
/// fn handle_event(event: StreamEvent) {
///     match event {
///         StreamEvent::Underrun { count } => {
///             eprintln!("playback underrun #{count}");
///         }
///         StreamEvent::ThresholdsGrown { min_playback, max_size } => {
///             eprintln!("thresholds grown: min={min_playback} max={max_size}");
///         }
///         StreamEvent::ChunkDropped { len } => {
///             eprintln!("oversized chunk dropped ({len} bytes)");
///         }
///         StreamEvent::StageWriteFailed { stage, error } => {
///             eprintln!("stage '{stage}' skipped: {error}");
///         }
///         StreamEvent::SinkWriteFailed { error } => {
///             eprintln!("sink write failed: {error}");
///         }
///         StreamEvent::FormatChanged { sample_rate, channels, bit_depth, resampling } => {
///             eprintln!("format: {sample_rate}Hz {channels}ch {bit_depth}bit (resampling: {resampling})");
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The playback queue emptied before new data arrived.
    ///
    /// Underruns drive adaptive threshold growth: each one bumps the queue
    /// capacity ceiling, and repeated underruns within a short window raise
    /// the auto-resume threshold as well.
    Underrun {
        /// Total underruns since the last flush.
        count: i32,
    },

    /// Adaptive thresholds grew in response to underrun pressure.
    ///
    /// Thresholds only ever grow; a flush does not reset them.
    ThresholdsGrown {
        /// Bytes required before playback auto-resumes.
        min_playback: u32,
        /// Capacity ceiling of the pending queue, in bytes.
        max_size: u32,
    },

    /// A chunk larger than the absolute admission ceiling was dropped.
    ///
    /// Dropped chunks are never retried. The enqueue call returns the
    /// chunk length as a drop sentinel.
    ChunkDropped {
        /// Length of the dropped chunk in bytes.
        len: u32,
    },

    /// A DSP stage failed to accept a chunk and was skipped.
    ///
    /// The chunk falls through to the next stage (or the sink). The stage
    /// stays in the chain and gets the next chunk normally.
    StageWriteFailed {
        /// Name of the stage that was skipped.
        stage: String,
        /// Description of the transport failure.
        error: String,
    },

    /// The sink (or the device beneath it) failed to accept a chunk.
    ///
    /// The chunk stays queued; playback pauses and the write is retried on
    /// the next drain cycle.
    SinkWriteFailed {
        /// Description of the failure.
        error: String,
    },

    /// The negotiated audio format changed.
    ///
    /// A format change clears all pooled buffers and recomputes the
    /// adaptive thresholds from scratch.
    FormatChanged {
        /// Negotiated sample rate in Hz.
        sample_rate: u32,
        /// Negotiated channel count.
        channels: u32,
        /// Negotiated bit depth.
        bit_depth: u32,
        /// Whether the resampler was activated for this format.
        resampling: bool,
    },
}

/// Callback type for receiving runtime events.
///
/// Register an event callback via [`HubBuilder::with_event_callback()`]
/// or [`Player::set_event_callback()`] to receive notifications about
/// underruns, dropped chunks, and stage failures.
///
/// [`HubBuilder::with_event_callback()`]: crate::HubBuilder::with_event_callback
/// [`Player::set_event_callback()`]: crate::Player::set_event_callback
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// Convenience for creating event callbacks without manually wrapping in
/// `Arc`.
///
/// # Example
///
/// ```
/// use stream_playout::{event_callback, StreamEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
