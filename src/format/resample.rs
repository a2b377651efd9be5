//! Fixed-point streaming sample rate conversion.
//!
//! Linear interpolation driven by a fixed-point time cursor with [`NP`]
//! fractional bits. Fast, and adequate for the playback path; the cursor
//! is re-initialized on every call, so each block is converted
//! independently of the previous one.

use crate::format::convert::{
    bytes_to_i16_slice, deinterleave_to_i16, i16_slice_to_bytes, interleave_to_bytes,
};
use crate::format::Format;

/// Fractional bits of the fixed-point time cursor.
pub const NP: u32 = 15;

/// Mask extracting the fractional part of the cursor.
const PMASK: u64 = (1 << NP) - 1;

/// Reserved samples replicated at each end of the input block.
///
/// The interpolator reads one sample ahead of the cursor; the margin keeps
/// that read in bounds without a per-sample check.
pub const MARGIN: usize = 10;

/// Streaming sample rate converter.
///
/// Converts 16-bit sample blocks from a source rate to a target rate using
/// fixed-point linear interpolation. The converter is channel-oblivious:
/// it processes one mono (or already de-interleaved) stream per call.
/// Interpolated values that round outside the 16-bit range are saturated
/// and counted.
///
/// # Example
///
/// ```
/// use stream_playout::Resampler;
///
/// let mut resampler = Resampler::new(22000, 48000);
/// let input = vec![0i16; 2200]; // 100ms at 22kHz
/// let output = resampler.resample_block(&input);
/// // 100ms at 48kHz, within one sample of exact
/// assert!((output.len() as i64 - 4800).abs() <= 1);
/// ```
#[derive(Debug)]
pub struct Resampler {
    ratio: f64,
    overflow_count: u64,
}

impl Resampler {
    /// Creates a converter from `source_rate` to `target_rate`.
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            ratio: f64::from(target_rate) / f64::from(source_rate),
            overflow_count: 0,
        }
    }

    /// Creates a converter with an explicit conversion ratio
    /// (`target / source`).
    pub fn with_ratio(ratio: f64) -> Self {
        Self {
            ratio,
            overflow_count: 0,
        }
    }

    /// The conversion ratio (`target / source`).
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Number of interpolated samples saturated to the 16-bit range so far.
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    /// Converts one block of 16-bit samples, returning the produced samples.
    ///
    /// The block is padded internally with [`MARGIN`] edge-replicated
    /// samples at each end, and the time cursor starts fresh at the block
    /// head: no phase is carried across calls.
    ///
    /// Output length is `floor(input.len() * ratio)` within one sample.
    pub fn resample_block(&mut self, input: &[i16]) -> Vec<i16> {
        if input.is_empty() || self.ratio == 1.0 {
            return input.to_vec();
        }

        // Edge-replicated guard samples let the interpolator read one
        // sample ahead without bounds checks.
        let mut padded = Vec::with_capacity(input.len() + 2 * MARGIN);
        padded.extend(std::iter::repeat(input[0]).take(MARGIN));
        padded.extend_from_slice(input);
        let last = input[input.len() - 1];
        padded.extend(std::iter::repeat(last).take(MARGIN));

        // Fixed-point step: time advance per output sample.
        let dtb = (f64::from(1u32 << NP) / self.ratio + 0.5) as u64;

        let mut time: u64 = (MARGIN as u64) << NP;
        let end_time: u64 = time + ((input.len() as u64) << NP);

        let mut output = Vec::with_capacity((input.len() as f64 * self.ratio).ceil() as usize + 1);

        while time < end_time {
            let idx = (time >> NP) as usize;
            let frac = (time & PMASK) as i32;

            let x1 = i32::from(padded[idx]);
            let x2 = i32::from(padded[idx + 1]);
            let v = x1 * ((1 << NP) - frac) + x2 * frac;

            output.push(self.round_clamp(v));
            time += dtb;
        }

        output
    }

    /// Rounds a scaled interpolation result to nearest and saturates it to
    /// the 16-bit range, counting saturation events.
    fn round_clamp(&mut self, v: i32) -> i16 {
        let rounded = (v + (1 << (NP - 1))) >> NP;
        if rounded > i32::from(i16::MAX) {
            self.overflow_count += 1;
            i16::MAX
        } else if rounded < i32::from(i16::MIN) {
            self.overflow_count += 1;
            i16::MIN
        } else {
            rounded as i16
        }
    }

    /// Converts a byte payload interpreted under `format`, producing
    /// 16-bit little-endian bytes at the target rate.
    ///
    /// Mono 16-bit input is converted directly. Interleaved or wide input
    /// is de-interleaved into per-channel 16-bit buffers (rescaling each
    /// sample to the 16-bit range), converted per channel, and
    /// re-interleaved.
    pub fn resample_bytes(&mut self, bytes: &[u8], format: &Format) -> Vec<u8> {
        if format.channels == 1 && format.bit_depth == 16 {
            let samples = bytes_to_i16_slice(bytes);
            return i16_slice_to_bytes(&self.resample_block(&samples));
        }

        let channels = deinterleave_to_i16(bytes, format);
        let converted: Vec<Vec<i16>> = channels
            .iter()
            .map(|ch| self.resample_block(ch))
            .collect();
        interleave_to_bytes(&converted)
    }
}
