//! # stream-playout
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Adaptive PCM playout with a pluggable DSP chain.
//!
//! `stream-playout` feeds interleaved PCM from external providers through an
//! ordered chain of DSP stages into a buffered playback endpoint. Buffering
//! adapts to the producer: underruns grow the queue thresholds until playback
//! stops stuttering, and unsupported sample rates are converted on the fly.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stream_playout::{EndpointRole, Hub, MockOutput, Player, Sink};
//! use std::sync::Arc;
//!
//! let output = Arc::new(MockOutput::new());
//! let player = Arc::new(Player::new(output.clone()));
//! player.set_format(44100, 16, 2)?;
//!
//! let hub = Hub::builder()
//!     .with_sink(player.clone())
//!     .with_event_callback(stream_playout::event_callback(|e| {
//!         tracing::warn!(?e, "playout event");
//!     }))
//!     .build();
//!
//! hub.create_endpoint(my_provider, EndpointRole::Provider).await?;
//! hub.set_chain(vec!["equalizer".into()]).await?;
//!
//! // Transport glue delivers provider audio as it arrives
//! hub.provider_audio("radio", pcm_bytes).await?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict context boundary:
//!
//! - **Producer Context**: `enqueue` and the hub command surface; resampling
//!   runs here, never on the callback path
//! - **Device Callback Context**: the platform output wants the next buffer;
//!   `on_drained` pops the queue head under the shared flow lock
//! - **Router Task**: one tokio task owns chain, registries, and in-flight
//!   accounting, so stage re-entry is plain sequential event processing
//!
//! This design keeps the device callback cheap and makes every routing
//! decision observable in one place.

// unsafe_code lint is configured in Cargo.toml as "deny"
#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod config;
mod endpoint;
mod error;
mod event;
pub mod format;
mod hub;
mod output;
mod player;
mod sink;

pub use config::{HubConfig, PlayerConfig};
pub use endpoint::{EndpointChannel, EndpointRole};
pub use error::{ChannelError, FormatError, HubError, OutputError};
pub use event::{event_callback, EventCallback, StreamEvent};
pub use format::resample::Resampler;
pub use format::{Format, SUPPORTED_RATES};
pub use hub::{Hub, HubBuilder, InfoKind};
pub use output::{MockOutput, OutputDevice};
pub use player::{PlayState, Player};
pub use sink::{volume_to_db, Sink};
