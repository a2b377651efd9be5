//! Audio format negotiation and sample conversion.

pub mod convert;
pub mod resample;

use crate::FormatError;

/// Sample rates the output path supports without resampling.
///
/// Anything else is accepted but routed through the resampler targeting
/// [`PlayerConfig::resample_target_hz`](crate::PlayerConfig).
pub const SUPPORTED_RATES: [u32; 9] = [
    8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000,
];

/// A negotiated PCM format: sample rate, bit depth, and channel count.
///
/// Construction validates channels (1 or 2) and bit depth (8, 16, or 24).
/// The sample rate is never rejected; unsupported rates activate the
/// resampler instead (see [`Player::set_format`](crate::Player::set_format)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample: 8, 16, or 24.
    pub bit_depth: u32,
    /// Channel count: 1 (mono) or 2 (stereo).
    pub channels: u32,
}

impl Format {
    /// Creates a validated format.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the channel count or bit depth is
    /// outside the supported set. The previously negotiated format (if
    /// any) is unaffected by a failed validation.
    pub fn new(sample_rate: u32, bit_depth: u32, channels: u32) -> Result<Self, FormatError> {
        match channels {
            1 | 2 => {}
            _ => return Err(FormatError::UnsupportedChannelCount { channels }),
        }
        match bit_depth {
            8 | 16 | 24 => {}
            _ => return Err(FormatError::UnsupportedBitDepth { bit_depth }),
        }
        Ok(Self {
            sample_rate,
            bit_depth,
            channels,
        })
    }

    /// Returns `true` if the sample rate is natively supported by the
    /// output path.
    pub fn is_native_rate(&self) -> bool {
        SUPPORTED_RATES.contains(&self.sample_rate)
    }

    /// Bytes occupied by one sample.
    pub fn sample_bytes(&self) -> usize {
        (self.bit_depth / 8) as usize
    }

    /// Bytes occupied by one frame (one sample per channel).
    pub fn frame_bytes(&self) -> usize {
        self.sample_bytes() * self.channels as usize
    }
}

impl Default for Format {
    /// 44.1kHz stereo 16-bit, the format assumed before negotiation.
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            bit_depth: 16,
            channels: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_valid() {
        let format = Format::new(44100, 16, 2).unwrap();
        assert_eq!(format.sample_rate, 44100);
        assert_eq!(format.frame_bytes(), 4);
        assert!(format.is_native_rate());
    }

    #[test]
    fn test_format_rejects_channels() {
        assert!(matches!(
            Format::new(44100, 16, 6),
            Err(FormatError::UnsupportedChannelCount { channels: 6 })
        ));
        assert!(matches!(
            Format::new(44100, 16, 0),
            Err(FormatError::UnsupportedChannelCount { .. })
        ));
    }

    #[test]
    fn test_format_rejects_bit_depth() {
        assert!(matches!(
            Format::new(44100, 32, 2),
            Err(FormatError::UnsupportedBitDepth { bit_depth: 32 })
        ));
    }

    #[test]
    fn test_format_unusual_rate_is_not_an_error() {
        // 22000Hz is not in the supported set but still constructs; the
        // player decides to resample based on is_native_rate().
        let format = Format::new(22000, 16, 1).unwrap();
        assert!(!format.is_native_rate());
    }

    #[test]
    fn test_format_default() {
        let format = Format::default();
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bit_depth, 16);
    }

    #[test]
    fn test_frame_bytes_24bit_mono() {
        let format = Format::new(48000, 24, 1).unwrap();
        assert_eq!(format.sample_bytes(), 3);
        assert_eq!(format.frame_bytes(), 3);
    }
}
