//! Error types for stream-playout.
//!
//! Errors are split by where they can occur:
//! - **Format errors** ([`FormatError`]): Rejected format negotiation; the
//!   call fails synchronously and playback state is unchanged
//! - **Channel errors** ([`ChannelError`]): Endpoint transport failures; the
//!   router recovers locally by falling back to the next stage or the sink
//! - **Output errors** ([`OutputError`]): Device submit failures; the player
//!   pauses and retries on the next drain cycle
//! - **Hub errors** ([`HubError`]): The router task is gone; fatal for the
//!   hub handle that observes them
//!
//! Oversized chunks, backpressure, and underruns are not errors. They are
//! encoded in return values and counters (see [`Sink::enqueue`]).
//!
//! [`Sink::enqueue`]: crate::Sink::enqueue

/// Errors raised by format negotiation.
///
/// These are validation failures: the requested format is rejected and the
/// previously negotiated format stays active. Note that an unsupported
/// *sample rate* is not an error - it activates the resampler instead.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The requested channel count is not 1 or 2.
    #[error("unsupported channel count: {channels} (supported: 1, 2)")]
    UnsupportedChannelCount {
        /// The rejected channel count.
        channels: u32,
    },

    /// The requested bit depth is not 8, 16, or 24.
    #[error("unsupported bit depth: {bit_depth} bits (supported: 8, 16, 24)")]
    UnsupportedBitDepth {
        /// The rejected bit depth.
        bit_depth: u32,
    },

    /// The output device refused the negotiated format.
    #[error("output device rejected format: {rate}Hz {channels}ch {bit_depth}bit")]
    DeviceRejected {
        /// Sample rate handed to the device.
        rate: u32,
        /// Channel count handed to the device.
        channels: u32,
        /// Bit depth handed to the device.
        bit_depth: u32,
    },
}

/// Errors that can occur within an [`EndpointChannel`](crate::EndpointChannel)
/// implementation.
///
/// Channel errors are recoverable. When a stage write fails, the router
/// emits a [`StreamEvent::StageWriteFailed`] and forwards the chunk to the
/// next stage (or the sink) instead; the stage stays in the chain.
///
/// [`StreamEvent::StageWriteFailed`]: crate::StreamEvent::StageWriteFailed
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// A write to the remote endpoint failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The transport was closed by the remote side.
    #[error("channel closed")]
    Closed,

    /// The channel was used before `open()` succeeded.
    #[error("channel not open (call open first)")]
    NotOpen,

    /// Custom error for user-implemented channels.
    #[error("{0}")]
    Custom(String),
}

impl ChannelError {
    /// Creates a custom channel error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a write failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }
}

/// Errors raised by an [`OutputDevice`](crate::OutputDevice) submit call.
///
/// A failed submit is non-fatal: the chunk stays queued, the player pauses,
/// and the submit is retried on the next drain callback.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// The device buffer queue cannot accept another submission right now.
    #[error("device queue full")]
    QueueFull,

    /// The device is in a state where it cannot accept audio.
    #[error("device unavailable: {reason}")]
    Unavailable {
        /// Why the device cannot accept audio.
        reason: String,
    },
}

/// Errors raised by the [`Hub`](crate::Hub) control surface.
///
/// These indicate the router task is no longer reachable; routing state
/// is gone and the hub must be rebuilt.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The router task has stopped or panicked; commands cannot be
    /// delivered.
    #[error("router task is not running")]
    Stopped,
}
