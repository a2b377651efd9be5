//! Router task that walks the DSP chain and feeds the sink.
//!
//! All routing state (chain, registries, in-flight counter, cached
//! format) is owned by a single task; the [`Hub`](crate::Hub) handle
//! posts commands over an mpsc channel. Stage responses re-enter routing
//! as ordinary commands, so what used to need a re-entrant critical
//! section is plain sequential event processing here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::endpoint::{EndpointChannel, EndpointRole};
use crate::sink::Sink;
use crate::{EventCallback, HubConfig, StreamEvent};

/// What an endpoint is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    /// Queued sample count and underrun count.
    Buffer,
    /// Active channel count and sample rate.
    Format,
}

/// Command sent to the router task.
pub(crate) enum HubCommand {
    /// Replace the ordered stage-name chain.
    SetChain { names: Vec<String> },
    /// Register a transport channel under a name and role.
    RegisterEndpoint {
        name: String,
        role: EndpointRole,
        channel: Arc<dyn EndpointChannel>,
        reply: oneshot::Sender<bool>,
    },
    /// Remove an endpoint from whichever registry holds it.
    ReleaseEndpoint { name: String },
    /// Attach or detach the terminal sink.
    SetSink { sink: Option<Arc<dyn Sink>> },
    /// Duck (attenuate) or restore sink volume.
    SetDucking { duck: bool },
    /// Audio produced by a registered provider.
    ProviderAudio { name: String, bytes: Vec<u8> },
    /// Audio returned by a chain stage after processing.
    StageAudio { name: String, bytes: Vec<u8> },
    /// An endpoint asked for buffer or format status.
    InfoRequest { name: String, kind: InfoKind },
    /// A provider announced its stream format.
    FormatInfo {
        name: String,
        sample_rate: i32,
        channels: i32,
    },
    /// Stop the router gracefully.
    Shutdown,
}

/// The event loop behind a [`Hub`](crate::Hub).
pub(crate) struct RouterTask {
    chain: Vec<String>,
    stages: HashMap<String, Arc<dyn EndpointChannel>>,
    providers: HashMap<String, Arc<dyn EndpointChannel>>,
    sink: Option<Arc<dyn Sink>>,
    /// Bytes handed to the chain but not yet accepted by the sink.
    in_flight: u32,
    /// Provider that most recently sent audio; acknowledgements go here.
    last_provider: Option<String>,
    cached_sample_rate: i32,
    cached_channels: i32,
    ducked: bool,
    event_callback: Option<EventCallback>,
}

impl RouterTask {
    pub fn new(
        config: &HubConfig,
        sink: Option<Arc<dyn Sink>>,
        event_callback: Option<EventCallback>,
    ) -> Self {
        Self {
            chain: Vec::new(),
            stages: HashMap::new(),
            providers: HashMap::new(),
            sink,
            in_flight: 0,
            last_provider: None,
            cached_sample_rate: config.default_sample_rate as i32,
            cached_channels: config.default_channels as i32,
            ducked: false,
            event_callback,
        }
    }

    fn emit_event(&self, event: StreamEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }

    /// Runs until `Shutdown` arrives or every hub handle is dropped.
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<HubCommand>) {
        while let Some(command) = command_rx.recv().await {
            if self.handle_command(command).await {
                break;
            }
        }

        tracing::debug!(
            stages = self.stages.len(),
            providers = self.providers.len(),
            "router task stopped"
        );
    }

    /// Processes one command. Returns `true` on shutdown.
    pub async fn handle_command(&mut self, command: HubCommand) -> bool {
        match command {
            HubCommand::SetChain { names } => {
                tracing::debug!(chain = ?names, "chain replaced");
                self.chain = names;
            }
            HubCommand::RegisterEndpoint {
                name,
                role,
                channel,
                reply,
            } => {
                let ok = self.register_endpoint(name, role, channel).await;
                let _ = reply.send(ok);
            }
            HubCommand::ReleaseEndpoint { name } => {
                self.release_endpoint(&name);
            }
            HubCommand::SetSink { sink } => {
                self.sink = sink;
                if let Some(ref sink) = self.sink {
                    sink.set_volume(if self.ducked { 0.5 } else { 1.0 });
                }
            }
            HubCommand::SetDucking { duck } => {
                self.ducked = duck;
                if let Some(ref sink) = self.sink {
                    sink.set_volume(if duck { 0.5 } else { 1.0 });
                }
            }
            HubCommand::ProviderAudio { name, bytes } => {
                self.route_from_provider(&name, &bytes).await;
            }
            HubCommand::StageAudio { name, bytes } => {
                self.route_from_stage(&name, &bytes).await;
            }
            HubCommand::InfoRequest { name, kind } => {
                self.answer_info_request(&name, kind).await;
            }
            HubCommand::FormatInfo {
                name,
                sample_rate,
                channels,
            } => {
                self.apply_format_info(&name, sample_rate, channels).await;
            }
            HubCommand::Shutdown => return true,
        }
        false
    }

    async fn register_endpoint(
        &mut self,
        name: String,
        role: EndpointRole,
        channel: Arc<dyn EndpointChannel>,
    ) -> bool {
        // A name lives in at most one registry
        if self.stages.contains_key(&name) || self.providers.contains_key(&name) {
            tracing::warn!(name = %name, "endpoint name already registered");
            return false;
        }

        if let Err(e) = channel.open().await {
            tracing::warn!(name = %name, error = %e, "endpoint failed to open");
            return false;
        }

        tracing::debug!(name = %name, ?role, "endpoint registered");
        match role {
            EndpointRole::Stage => self.stages.insert(name, channel),
            EndpointRole::Provider => self.providers.insert(name, channel),
        };
        true
    }

    fn release_endpoint(&mut self, name: &str) {
        let removed = self.stages.remove(name).is_some() | self.providers.remove(name).is_some();
        if removed {
            tracing::debug!(name = %name, "endpoint released");
        }
        if self.last_provider.as_deref() == Some(name) {
            self.last_provider = None;
        }
    }

    async fn route_from_provider(&mut self, name: &str, bytes: &[u8]) {
        if !self.providers.contains_key(name) {
            // Audio from names we never registered is dropped outright
            tracing::warn!(name = %name, "dropping audio from unknown provider");
            return;
        }
        self.last_provider = Some(name.to_string());

        // Zero-length payload is the flush signal
        if bytes.is_empty() {
            if let Some(ref sink) = self.sink {
                sink.flush();
            }
            self.in_flight = 0;
            self.acknowledge(name, 0).await;
            return;
        }

        // Capacity gates apply only when there is a sink to fill; the
        // chain itself is walked regardless.
        if let Some(ref sink) = self.sink {
            let len = bytes.len() as u32;
            if i64::from(len) > i64::from(sink.free_count()) - i64::from(self.in_flight) {
                // Backpressure: the provider retries later
                self.acknowledge(name, 0).await;
                return;
            }
        }

        if let Some(written) = self.deliver(bytes, 0).await {
            self.acknowledge(name, written).await;
        }
    }

    async fn route_from_stage(&mut self, name: &str, bytes: &[u8]) {
        if !self.stages.contains_key(name) {
            tracing::warn!(name = %name, "dropping audio from unknown stage");
            return;
        }
        if bytes.is_empty() {
            return;
        }

        self.in_flight = self.in_flight.saturating_sub(bytes.len() as u32);

        // Forward to the stage after this one, or the sink if it was last.
        // No capacity recheck here: the bytes were admitted when the
        // provider sent them.
        let next = self
            .chain
            .iter()
            .position(|entry| entry == name)
            .map_or(self.chain.len(), |pos| pos + 1);

        if let Some(written) = self.deliver(bytes, next).await {
            if let Some(provider) = self.last_provider.clone() {
                self.acknowledge(&provider, written).await;
            }
        }
    }

    /// Walks the chain from `start`, skipping failing stages, and falls
    /// through to the sink when no stage accepts the chunk.
    ///
    /// Returns `Some(accepted bytes)` when the chunk reached the sink
    /// path; `None` when a stage took it, in which case the provider is
    /// not acknowledged until the stage hands the chunk back and it lands
    /// in the sink. The in-flight counter grows only on a successful
    /// stage delivery, so a fully failed walk leaves it at its pre-call
    /// value.
    async fn deliver(&mut self, bytes: &[u8], start: usize) -> Option<u32> {
        let len = bytes.len() as u32;

        for idx in start..self.chain.len() {
            let stage_name = self.chain[idx].clone();
            let Some(stage) = self.stages.get(&stage_name) else {
                // Chain entries are not validated against the registry;
                // an unregistered name is skipped like a failing stage
                continue;
            };

            match stage.write_audio(bytes, false).await {
                Ok(_) => {
                    self.in_flight += len;
                    return None;
                }
                Err(e) => {
                    tracing::warn!(stage = %stage_name, error = %e, "stage refused chunk, skipping");
                    self.emit_event(StreamEvent::StageWriteFailed {
                        stage: stage_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        Some(match self.sink {
            Some(ref sink) => sink.enqueue(bytes),
            None => 0,
        })
    }

    /// Relays a sink acknowledgement upstream to a provider.
    async fn acknowledge(&self, provider: &str, written: u32) {
        let Some(channel) = self.providers.get(provider) else {
            return;
        };
        if let Err(e) = channel.write_response(written).await {
            tracing::warn!(provider = %provider, error = %e, "acknowledgement not delivered");
        }
    }

    async fn answer_info_request(&self, name: &str, kind: InfoKind) {
        let channel = match self
            .stages
            .get(name)
            .or_else(|| self.providers.get(name))
        {
            Some(channel) => channel,
            None => {
                tracing::warn!(name = %name, "info request from unknown endpoint");
                return;
            }
        };

        let result = match kind {
            InfoKind::Buffer => {
                let (samples, stutters) = match self.sink {
                    Some(ref sink) => (sink.buffered_count(), sink.underflow_count()),
                    None => (0, 0),
                };
                channel.write_buffer_info(samples, stutters).await
            }
            InfoKind::Format => {
                let (channels, rate) = self.active_format();
                channel.write_format_info(channels, rate).await
            }
        };

        if let Err(e) = result {
            tracing::warn!(name = %name, error = %e, "info reply not delivered");
        }
    }

    /// The format audio is actually played at: live sink state when
    /// attached, cached provider-announced values otherwise.
    fn active_format(&self) -> (i32, i32) {
        match self.sink {
            Some(ref sink) => (sink.channels(), sink.sample_rate()),
            None => (self.cached_channels, self.cached_sample_rate),
        }
    }

    async fn apply_format_info(&mut self, name: &str, sample_rate: i32, channels: i32) {
        tracing::info!(name = %name, sample_rate, channels, "provider announced format");
        self.cached_sample_rate = sample_rate;
        self.cached_channels = channels;

        if let Some(ref sink) = self.sink {
            // Providers always hand the chain 16-bit samples
            if let Err(e) = sink.set_format(sample_rate as u32, 16, channels as u32) {
                tracing::warn!(error = %e, "sink rejected announced format");
            }
        }

        // Every stage currently in the chain hears the active format
        let (channels, rate) = self.active_format();
        for stage_name in self.chain.clone() {
            let Some(stage) = self.stages.get(&stage_name) else {
                continue;
            };
            if let Err(e) = stage.write_format_info(channels, rate).await {
                tracing::warn!(stage = %stage_name, error = %e, "format notice not delivered");
            }
        }
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }
}
