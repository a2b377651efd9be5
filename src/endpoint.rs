//! Endpoint channel trait for DSP stages and audio providers.
//!
//! Stages and providers live in other processes; this crate only sees
//! them through the [`EndpointChannel`] capability trait. Outbound calls
//! (audio, acknowledgements, info) go through the trait; inbound events
//! are delivered by the embedding transport glue as [`Hub`](crate::Hub)
//! method calls.

use crate::ChannelError;
use async_trait::async_trait;

/// Which registry an endpoint belongs to.
///
/// An endpoint name exists in at most one registry at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    /// A DSP processing stage; receives audio when its name is in the
    /// active chain.
    Stage,
    /// An upstream audio producer.
    Provider,
}

/// Transport channel to a remote DSP stage or provider.
///
/// # Implementation Notes
///
/// - Methods take `&self` - use interior mutability if needed
/// - All methods are async and run on the router task; they must not
///   block indefinitely (routing is strictly sequential)
/// - `write_audio` failures are recoverable: the router skips the stage
///   for that chunk only
///
/// # Example
///
/// ```
/// use stream_playout::{ChannelError, EndpointChannel};
/// use async_trait::async_trait;
///
/// struct NullChannel;
///
/// #[async_trait]
/// impl EndpointChannel for NullChannel {
///     fn name(&self) -> &str {
///         "null"
///     }
///
///     async fn write_audio(&self, data: &[u8], _last: bool) -> Result<u32, ChannelError> {
///         Ok(data.len() as u32)
///     }
///
///     async fn write_response(&self, _written: u32) -> Result<(), ChannelError> {
///         Ok(())
///     }
///
///     async fn write_buffer_info(&self, _samples: i32, _stutters: i32) -> Result<(), ChannelError> {
///         Ok(())
///     }
///
///     async fn write_format_info(&self, _channels: i32, _rate: i32) -> Result<(), ChannelError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EndpointChannel: Send + Sync {
    /// The registered endpoint name.
    fn name(&self) -> &str;

    /// Called once at registration time.
    ///
    /// Use this to establish the transport. Errors here fail the
    /// registration; the endpoint is not inserted into any registry.
    ///
    /// Default implementation does nothing.
    async fn open(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Writes a block of audio to the remote endpoint.
    ///
    /// `last` marks the final block of a stream. Returns the number of
    /// bytes the endpoint accepted.
    async fn write_audio(&self, data: &[u8], last: bool) -> Result<u32, ChannelError>;

    /// Relays how many bytes the pipeline accepted from this endpoint's
    /// most recent audio write.
    async fn write_response(&self, written: u32) -> Result<(), ChannelError>;

    /// Sends current buffer status (queued samples, underrun count).
    async fn write_buffer_info(&self, samples: i32, stutters: i32) -> Result<(), ChannelError>;

    /// Sends the active output format.
    async fn write_format_info(&self, channels: i32, sample_rate: i32)
        -> Result<(), ChannelError>;
}
