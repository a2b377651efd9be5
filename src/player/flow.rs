//! Adaptive flow controller between producers and the output device.
//!
//! The player owns the queue of pending audio and two grow-only
//! thresholds: `min_playback` (bytes required before playback
//! auto-resumes) and `max_size` (queue capacity ceiling). Underruns grow
//! `max_size` immediately; repeated underruns inside a ten-second window
//! grow `min_playback` as well. Neither threshold ever shrinks, so the
//! pipeline converges on a buffer depth the producer can actually sustain.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::format::resample::Resampler;
use crate::format::Format;
use crate::player::pool::BufferPool;
use crate::sink::volume_to_db;
use crate::{EventCallback, FormatError, OutputDevice, PlayerConfig, Sink, StreamEvent};

/// Playback state, combining explicit control with buffer-level automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// No playback; entered by `flush`.
    Stopped,
    /// Paused automatically because the queue ran dry.
    PausedAuto,
    /// Paused explicitly by `set_paused(true)`; buffer level is ignored
    /// until `set_paused(false)`.
    PausedExplicit,
    /// Actively playing.
    Playing,
}

/// Everything guarded by the queue lock.
///
/// Both the producer context (`enqueue`) and the device callback context
/// (`on_drained`) mutate this state, so one mutex covers all of it.
struct FlowState {
    pool: BufferPool,
    /// Slot currently held by the device, recycled on the next drain.
    playing_slot: Option<usize>,
    /// Format negotiated with the producer.
    format: Format,
    /// Format the device actually plays (differs when resampling).
    output_format: Format,
    resampler: Option<Resampler>,
    min_playback: u32,
    max_size: u32,
    written_samples: i64,
    underflow_count: i32,
    dropped_chunks: u64,
    window_start: Instant,
    window_base_underflows: i32,
    play_state: PlayState,
}

impl FlowState {
    fn new(config: &PlayerConfig) -> Self {
        let format = Format::default();
        let min_playback = format.sample_rate * format.channels;
        Self {
            pool: BufferPool::new(config.idle_slot_cap),
            playing_slot: None,
            format,
            output_format: format,
            resampler: None,
            min_playback,
            max_size: 5 * min_playback,
            written_samples: 0,
            underflow_count: 0,
            dropped_chunks: 0,
            window_start: Instant::now(),
            window_base_underflows: 0,
            play_state: PlayState::Stopped,
        }
    }

    fn count_written(&mut self, bytes: usize) {
        let sample_bytes = self.output_format.sample_bytes().max(1);
        self.written_samples += (bytes / sample_bytes) as i64;
    }
}

/// The buffer pool and flow controller. Implements [`Sink`].
///
/// `Player` sits between audio producers (or the chain router) and an
/// [`OutputDevice`]. Producers call [`enqueue`](Player::enqueue) from
/// their own context; the device's "buffer consumed" callback calls
/// [`on_drained`](Player::on_drained). One lock covers both paths.
///
/// # Example
///
/// ```
/// use stream_playout::{MockOutput, Player, Sink};
/// use std::sync::Arc;
///
/// let output = Arc::new(MockOutput::new());
/// let player = Player::new(output.clone());
/// player.set_format(44100, 16, 2).unwrap();
///
/// let accepted = player.enqueue(&vec![0u8; 4096]);
/// assert_eq!(accepted, 4096);
/// ```
pub struct Player {
    output: Arc<dyn OutputDevice>,
    config: PlayerConfig,
    state: Mutex<FlowState>,
    event_callback: Mutex<Option<EventCallback>>,
}

impl Player {
    /// Creates a player over the given device with default tuning.
    pub fn new(output: Arc<dyn OutputDevice>) -> Self {
        Self::with_config(output, PlayerConfig::default())
    }

    /// Creates a player with explicit tuning.
    pub fn with_config(output: Arc<dyn OutputDevice>, config: PlayerConfig) -> Self {
        let state = FlowState::new(&config);
        Self {
            output,
            config,
            state: Mutex::new(state),
            event_callback: Mutex::new(None),
        }
    }

    /// Registers a callback for runtime events (underruns, drops,
    /// threshold growth).
    pub fn set_event_callback(&self, callback: EventCallback) {
        *self.event_callback.lock() = Some(callback);
    }

    fn emit_event(&self, event: StreamEvent) {
        // Invoke outside the guard so a callback can call back into the
        // player without deadlocking on the registration lock.
        let callback = self.event_callback.lock().clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    /// Chunks dropped for exceeding the admission ceiling since creation.
    pub fn dropped_chunks(&self) -> u64 {
        self.state.lock().dropped_chunks
    }

    /// `true` if the current format is being resampled to the target rate.
    pub fn is_resampling(&self) -> bool {
        self.state.lock().resampler.is_some()
    }

    /// Current playback state.
    pub fn play_state(&self) -> PlayState {
        self.state.lock().play_state
    }

    /// Current adaptive thresholds as `(min_playback, max_size)` bytes.
    pub fn thresholds(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.min_playback, state.max_size)
    }

    /// Device callback: the output consumed a buffer and wants the next.
    ///
    /// Pops the Active head into the device and recycles the previous
    /// in-flight slot. On an empty queue this is an underrun: playback
    /// auto-pauses and the adaptive thresholds grow.
    pub fn on_drained(&self) {
        let mut state = self.state.lock();

        // The buffer the device just finished can be reused now.
        if let Some(prev) = state.playing_slot.take() {
            state.pool.recycle(prev);
        }

        if let Some(head) = state.pool.front() {
            match self.output.submit(state.pool.data(head)) {
                Ok(()) => {
                    state.pool.pop_front();
                    let len = state.pool.data(head).len();
                    state.playing_slot = Some(head);
                    state.count_written(len);
                }
                Err(e) => {
                    // Chunk stays at the head; retried on the next drain.
                    tracing::warn!(error = %e, "device refused buffer, pausing until next drain");
                    self.pause_from_callback(&mut state);
                    drop(state);
                    self.emit_event(StreamEvent::SinkWriteFailed {
                        error: e.to_string(),
                    });
                }
            }
        } else {
            self.record_underrun(&mut state);
            let count = state.underflow_count;
            let (min_playback, max_size) = (state.min_playback, state.max_size);
            self.pause_from_callback(&mut state);
            drop(state);
            self.emit_event(StreamEvent::Underrun { count });
            self.emit_event(StreamEvent::ThresholdsGrown {
                min_playback,
                max_size,
            });
        }
    }

    /// Discards all queued audio, stops playback, and resets counters.
    ///
    /// Thresholds are deliberately not reset; growth is permanent.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        self.output.set_playing(false);
        self.output.clear();

        if let Some(prev) = state.playing_slot.take() {
            state.pool.recycle(prev);
        }
        state.pool.flush_active_to_idle();
        state.written_samples = 0;
        state.underflow_count = 0;
        state.window_start = Instant::now();
        state.window_base_underflows = 0;
        state.play_state = PlayState::Stopped;

        tracing::debug!("playback flushed");
    }

    fn record_underrun(&self, state: &mut FlowState) {
        state.underflow_count += 1;
        state.max_size += self.config.max_size_growth;

        let now = Instant::now();
        if now.duration_since(state.window_start) > self.config.underrun_window {
            // Stale window: restart observation from here.
            state.window_start = now;
            state.window_base_underflows = state.underflow_count;
        } else if state.underflow_count - state.window_base_underflows
            > self.config.underrun_window_limit
        {
            let raised = state.min_playback + state.min_playback / 4;
            state.min_playback = raised.min(state.max_size);
            state.window_start = now;
            state.window_base_underflows = state.underflow_count;
            tracing::warn!(
                min_playback = state.min_playback,
                max_size = state.max_size,
                "repeated underruns, raising auto-resume threshold"
            );
        }

        tracing::warn!(
            underruns = state.underflow_count,
            max_size = state.max_size,
            "buffer underrun"
        );
    }

    fn pause_from_callback(&self, state: &mut FlowState) {
        if state.play_state != PlayState::PausedExplicit {
            state.play_state = PlayState::PausedAuto;
        }
        self.output.set_playing(false);
    }

    fn maybe_auto_resume(&self, state: &mut FlowState) {
        if state.play_state != PlayState::PausedExplicit
            && state.play_state != PlayState::Playing
            && state.pool.active_bytes() >= state.min_playback
        {
            state.play_state = PlayState::Playing;
            self.output.set_playing(true);
        }
    }
}

impl Sink for Player {
    /// Negotiates a new format.
    ///
    /// Unsupported sample rates activate the resampler targeting
    /// [`PlayerConfig::resample_target_hz`]; the device is then
    /// configured at the target rate with 16-bit samples. Success clears
    /// both buffer sets and recomputes thresholds: one second of audio
    /// (`rate * channels` bytes) to resume, five seconds of capacity.
    fn set_format(
        &self,
        sample_rate: u32,
        bit_depth: u32,
        channels: u32,
    ) -> Result<(), FormatError> {
        let format = Format::new(sample_rate, bit_depth, channels)?;

        let mut state = self.state.lock();

        let (resampler, output_format) = if format.is_native_rate() {
            (None, format)
        } else {
            let target = self.config.resample_target_hz;
            let output_format = Format {
                sample_rate: target,
                bit_depth: 16,
                channels,
            };
            (Some(Resampler::new(sample_rate, target)), output_format)
        };

        if !self.output.configure(
            output_format.sample_rate,
            output_format.bit_depth,
            output_format.channels,
        ) {
            return Err(FormatError::DeviceRejected {
                rate: output_format.sample_rate,
                channels: output_format.channels,
                bit_depth: output_format.bit_depth,
            });
        }

        let resampling = resampler.is_some();
        state.format = format;
        state.output_format = output_format;
        state.resampler = resampler;
        state.pool.clear();
        state.playing_slot = None;
        state.min_playback = sample_rate * channels;
        state.max_size = 5 * state.min_playback;
        state.window_start = Instant::now();
        state.window_base_underflows = state.underflow_count;
        state.play_state = PlayState::Stopped;
        drop(state);

        tracing::info!(
            sample_rate,
            bit_depth,
            channels,
            resampling,
            "audio format negotiated"
        );
        self.emit_event(StreamEvent::FormatChanged {
            sample_rate,
            channels,
            bit_depth,
            resampling,
        });
        Ok(())
    }

    /// Offers a chunk of audio from the producer context.
    ///
    /// Returns `data.len()` on acceptance or oversized drop, 0 for
    /// backpressure. Never a partial accept. If resampling is active the
    /// chunk is transformed first and the transformed size is what counts
    /// against queue capacity.
    fn enqueue(&self, data: &[u8]) -> u32 {
        let len = data.len() as u32;

        if len > self.config.max_chunk_bytes {
            let mut state = self.state.lock();
            state.dropped_chunks += 1;
            drop(state);
            tracing::warn!(
                len,
                max = self.config.max_chunk_bytes,
                "dropping oversized chunk"
            );
            self.emit_event(StreamEvent::ChunkDropped { len });
            return len;
        }

        let mut state = self.state.lock();

        // Resampling runs here, on the producer context, never on the
        // device callback. The work is bounded by max_chunk_bytes.
        let transformed;
        let payload: &[u8] = match state.resampler.take() {
            Some(mut resampler) => {
                let format = state.format;
                transformed = resampler.resample_bytes(data, &format);
                state.resampler = Some(resampler);
                &transformed
            }
            None => data,
        };

        if payload.len() as u32 > state.max_size - state.pool.active_bytes() {
            // Queue full: recoverable, the caller retries later.
            return 0;
        }

        if state.pool.is_empty() && self.output.pending() == 0 {
            // Fast path: nothing queued anywhere, hand it straight over.
            match self.output.submit(payload) {
                Ok(()) => {
                    state.count_written(payload.len());
                    self.maybe_auto_resume(&mut state);
                    return len;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "direct submit failed, queueing chunk");
                    self.pause_from_callback(&mut state);
                    drop(state);
                    self.emit_event(StreamEvent::SinkWriteFailed {
                        error: e.to_string(),
                    });
                    state = self.state.lock();
                    // Another producer may have filled the queue while the
                    // lock was released; admit again before queueing
                    if payload.len() as u32 > state.max_size - state.pool.active_bytes() {
                        return 0;
                    }
                }
            }
        }

        state.pool.push_back(payload);
        self.maybe_auto_resume(&mut state);
        len
    }

    fn buffered_count(&self) -> i32 {
        self.state.lock().pool.active_bytes() as i32
    }

    fn free_count(&self) -> i32 {
        let state = self.state.lock();
        (state.max_size - state.pool.active_bytes()) as i32
    }

    fn total_written_samples(&self) -> i64 {
        self.state.lock().written_samples
    }

    fn underflow_count(&self) -> i32 {
        self.state.lock().underflow_count
    }

    fn flush(&self) {
        Player::flush(self);
    }

    fn sample_rate(&self) -> i32 {
        self.state.lock().output_format.sample_rate as i32
    }

    fn channels(&self) -> i32 {
        self.state.lock().output_format.channels as i32
    }

    fn set_volume(&self, volume: f32) {
        self.output.set_volume_db(volume_to_db(volume));
    }

    /// Explicit pause/resume, overriding buffer-level automation.
    fn set_paused(&self, paused: bool) {
        let mut state = self.state.lock();
        if paused {
            state.play_state = PlayState::PausedExplicit;
            self.output.set_playing(false);
        } else {
            state.play_state = PlayState::Playing;
            self.output.set_playing(true);
        }
    }
}
