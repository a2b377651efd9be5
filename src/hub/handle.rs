//! Hub handle and builder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::endpoint::{EndpointChannel, EndpointRole};
use crate::hub::router::{HubCommand, InfoKind, RouterTask};
use crate::sink::Sink;
use crate::{EventCallback, HubConfig, HubError};

/// Handle to a running DSP chain router.
///
/// The routing state lives in a background task; the handle posts
/// commands to it. Every method takes `&self`, so a hub can be shared
/// behind an `Arc`.
///
/// # Lifecycle
///
/// 1. Created by [`HubBuilder::build()`] (inside a tokio runtime)
/// 2. Endpoints register, chain is set, audio routes in the background
/// 3. Call [`shutdown()`](Hub::shutdown) for graceful teardown
/// 4. Dropping the `Hub` also stops the task (but prefer explicit
///    `shutdown()`)
///
/// # Example
///
/// ```no_run
/// use stream_playout::{Hub, MockOutput, Player};
/// use std::sync::Arc;
///
/// # async fn demo() -> Result<(), stream_playout::HubError> {
/// let player = Arc::new(Player::new(Arc::new(MockOutput::new())));
/// let hub = Hub::builder().with_sink(player).build();
///
/// hub.set_chain(vec!["equalizer".into(), "limiter".into()]).await?;
/// hub.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct Hub {
    command_tx: mpsc::Sender<HubCommand>,
    task: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl Hub {
    /// Starts building a hub.
    pub fn builder() -> HubBuilder {
        HubBuilder::new()
    }

    /// Returns `true` until `shutdown` has been called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| HubError::Stopped)
    }

    /// Atomically replaces the ordered stage-name chain.
    ///
    /// Names are not validated against the registry; an entry with no
    /// registered stage is skipped during routing.
    pub async fn set_chain(&self, names: Vec<String>) -> Result<(), HubError> {
        self.send(HubCommand::SetChain { names }).await
    }

    /// Registers an endpoint under the name its channel reports.
    ///
    /// The channel's `open()` runs on the router task. Returns `false`
    /// (without inserting) if opening fails or the name is already taken
    /// in either registry.
    pub async fn create_endpoint(
        &self,
        channel: Arc<dyn EndpointChannel>,
        role: EndpointRole,
    ) -> Result<bool, HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::RegisterEndpoint {
            name: channel.name().to_string(),
            role,
            channel,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| HubError::Stopped)
    }

    /// Removes an endpoint from whichever registry holds it.
    pub async fn release_endpoint(&self, name: impl Into<String>) -> Result<(), HubError> {
        self.send(HubCommand::ReleaseEndpoint { name: name.into() })
            .await
    }

    /// Attaches (or detaches, with `None`) the terminal sink.
    pub async fn set_sink(&self, sink: Option<Arc<dyn Sink>>) -> Result<(), HubError> {
        self.send(HubCommand::SetSink { sink }).await
    }

    /// Ducks the sink to half volume, or restores full volume.
    pub async fn set_ducking(&self, duck: bool) -> Result<(), HubError> {
        self.send(HubCommand::SetDucking { duck }).await
    }

    /// Delivers audio produced by a registered provider.
    ///
    /// An empty payload is the flush signal: the sink is flushed and
    /// in-flight accounting resets.
    pub async fn provider_audio(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), HubError> {
        self.send(HubCommand::ProviderAudio {
            name: name.into(),
            bytes,
        })
        .await
    }

    /// Delivers audio a chain stage finished processing.
    pub async fn stage_audio(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), HubError> {
        self.send(HubCommand::StageAudio {
            name: name.into(),
            bytes,
        })
        .await
    }

    /// Asks the router to answer a buffer or format query on the named
    /// endpoint's channel.
    pub async fn info_request(
        &self,
        name: impl Into<String>,
        kind: InfoKind,
    ) -> Result<(), HubError> {
        self.send(HubCommand::InfoRequest {
            name: name.into(),
            kind,
        })
        .await
    }

    /// Announces a provider's stream format.
    ///
    /// The format is cached, pushed to the sink, and the resulting output
    /// format is broadcast to every stage in the chain.
    pub async fn format_info(
        &self,
        name: impl Into<String>,
        sample_rate: i32,
        channels: i32,
    ) -> Result<(), HubError> {
        self.send(HubCommand::FormatInfo {
            name: name.into(),
            sample_rate,
            channels,
        })
        .await
    }

    /// Gracefully stops the router task.
    ///
    /// Commands posted before this call are processed first. Calling
    /// `shutdown` again after it has completed is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the task already went away
    /// without a shutdown (for example, a panicked runtime).
    pub async fn shutdown(&self) -> Result<(), HubError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            // Already shut down
            return Ok(());
        }

        self.send(HubCommand::Shutdown).await?;

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.await.map_err(|_| HubError::Stopped)?;
        }
        Ok(())
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            // Dropped without explicit shutdown() - best-effort stop
            self.running.store(false, Ordering::SeqCst);
            let _ = self.command_tx.try_send(HubCommand::Shutdown);
        }
    }
}

/// Builder for [`Hub`].
///
/// # Example
///
/// ```no_run
/// use stream_playout::{Hub, HubConfig};
///
/// let hub = Hub::builder()
///     .with_config(HubConfig::default())
///     .build();
/// ```
#[derive(Default)]
pub struct HubBuilder {
    config: HubConfig,
    sink: Option<Arc<dyn Sink>>,
    event_callback: Option<EventCallback>,
}

impl HubBuilder {
    /// Creates a builder with default configuration and no sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom hub configuration.
    pub fn with_config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches the terminal sink up front.
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Registers a callback for routing events.
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.event_callback = Some(callback);
        self
    }

    /// Spawns the router task and returns its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Hub {
        let (command_tx, command_rx) = mpsc::channel(self.config.command_channel_capacity);
        let router = RouterTask::new(&self.config, self.sink, self.event_callback);
        let task = tokio::spawn(router.run(command_rx));

        Hub {
            command_tx,
            task: Mutex::new(Some(task)),
            running: AtomicBool::new(true),
        }
    }
}
