//! Output device trait and mock implementation.
//!
//! The hardware-backed output API is an external collaborator: this crate
//! only depends on the [`OutputDevice`] capability trait. [`MockOutput`]
//! is a fully scriptable in-memory device for tests and embedders that
//! want to drive drain cycles by hand.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::OutputError;

/// Capability interface for a hardware-backed playback device.
///
/// Implementations wrap a platform audio API (buffer-queue style: submit a
/// block, get called back when the device wants the next one). All methods
/// must be non-blocking or bounded-latency - the flow controller may call
/// them while holding its queue lock.
///
/// The device does **not** call back into this crate through the trait;
/// the embedder wires the platform's "buffer consumed" callback to
/// [`Player::on_drained`](crate::Player::on_drained).
pub trait OutputDevice: Send + Sync {
    /// Reconfigures the device for a new format. Returns `false` if the
    /// device cannot play this format.
    fn configure(&self, sample_rate: u32, bit_depth: u32, channels: u32) -> bool;

    /// Submits one block of audio to the device queue.
    ///
    /// The device copies the bytes before returning.
    fn submit(&self, bytes: &[u8]) -> Result<(), OutputError>;

    /// Number of blocks submitted but not yet consumed by the device.
    fn pending(&self) -> usize;

    /// Starts or stops consumption of submitted blocks.
    fn set_playing(&self, playing: bool);

    /// Discards all pending blocks.
    fn clear(&self);

    /// Applies an attenuation in dB (0.0 = unity, negative = quieter).
    fn set_volume_db(&self, attenuation_db: f32);
}

#[derive(Debug)]
struct MockOutputState {
    pending: VecDeque<Vec<u8>>,
    playing: bool,
    configured: Option<(u32, u32, u32)>,
    volume_db: f32,
    submitted_bytes: u64,
    consumed_bytes: u64,
    fail_submits: usize,
    reject_format: bool,
}

/// In-memory [`OutputDevice`] with a scriptable buffer queue.
///
/// Tests submit audio through the player, then call [`consume_one`] to
/// simulate the hardware finishing a block, followed by
/// [`Player::on_drained`](crate::Player::on_drained) - the same sequence a
/// real device callback performs.
///
/// # Example
///
/// ```
/// use stream_playout::{MockOutput, OutputDevice};
/// use std::sync::Arc;
///
/// let output = Arc::new(MockOutput::new());
/// assert_eq!(output.pending(), 0);
/// ```
///
/// [`consume_one`]: MockOutput::consume_one
#[derive(Debug)]
pub struct MockOutput {
    state: Mutex<MockOutputState>,
    queue_slots: usize,
}

impl MockOutput {
    /// Creates a mock device with the conventional two-slot buffer queue.
    pub fn new() -> Self {
        Self::with_queue_slots(2)
    }

    /// Creates a mock device with a custom queue depth.
    pub fn with_queue_slots(queue_slots: usize) -> Self {
        Self {
            state: Mutex::new(MockOutputState {
                pending: VecDeque::new(),
                playing: false,
                configured: None,
                volume_db: 0.0,
                submitted_bytes: 0,
                consumed_bytes: 0,
                fail_submits: 0,
                reject_format: false,
            }),
            queue_slots,
        }
    }

    /// Makes the next `n` submit calls fail with `QueueFull`.
    pub fn fail_next_submits(&self, n: usize) {
        self.state.lock().fail_submits = n;
    }

    /// Makes subsequent `configure` calls return `false`.
    pub fn reject_formats(&self, reject: bool) {
        self.state.lock().reject_format = reject;
    }

    /// Simulates the hardware consuming the oldest pending block.
    ///
    /// Returns the consumed bytes, or `None` if nothing was pending.
    /// Callers should follow this with `Player::on_drained()`.
    pub fn consume_one(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        let block = state.pending.pop_front()?;
        state.consumed_bytes += block.len() as u64;
        Some(block)
    }

    /// Returns `true` if the device is currently playing.
    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    /// Last format accepted by `configure`, as `(rate, depth, channels)`.
    pub fn configured_format(&self) -> Option<(u32, u32, u32)> {
        self.state.lock().configured
    }

    /// Total bytes accepted by `submit` so far.
    pub fn submitted_bytes(&self) -> u64 {
        self.state.lock().submitted_bytes
    }

    /// Total bytes consumed via [`consume_one`](MockOutput::consume_one).
    pub fn consumed_bytes(&self) -> u64 {
        self.state.lock().consumed_bytes
    }

    /// Current attenuation in dB.
    pub fn volume_db(&self) -> f32 {
        self.state.lock().volume_db
    }
}

impl Default for MockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDevice for MockOutput {
    fn configure(&self, sample_rate: u32, bit_depth: u32, channels: u32) -> bool {
        let mut state = self.state.lock();
        if state.reject_format {
            return false;
        }
        state.configured = Some((sample_rate, bit_depth, channels));
        state.pending.clear();
        true
    }

    fn submit(&self, bytes: &[u8]) -> Result<(), OutputError> {
        let mut state = self.state.lock();
        if state.fail_submits > 0 {
            state.fail_submits -= 1;
            return Err(OutputError::QueueFull);
        }
        if state.pending.len() >= self.queue_slots {
            return Err(OutputError::QueueFull);
        }
        state.submitted_bytes += bytes.len() as u64;
        state.pending.push_back(bytes.to_vec());
        Ok(())
    }

    fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn set_playing(&self, playing: bool) {
        self.state.lock().playing = playing;
    }

    fn clear(&self) {
        self.state.lock().pending.clear();
    }

    fn set_volume_db(&self, attenuation_db: f32) {
        self.state.lock().volume_db = attenuation_db;
    }
}
