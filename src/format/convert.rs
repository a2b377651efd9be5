//! Sample depth and channel layout conversion.
//!
//! The resampler operates on one 16-bit stream at a time, so wider or
//! interleaved sources are first brought into that shape: each sample is
//! linearly rescaled to the 16-bit range and the channels are split into
//! separate buffers.

use crate::format::Format;

/// Decodes one sample starting at `bytes`, rescaled to the i16 range.
///
/// 8-bit PCM is unsigned (centered at 128); 16- and 24-bit are signed
/// little-endian. Wider samples are scaled down, narrower scaled up, so
/// full scale maps to full scale.
#[inline]
fn decode_sample(bytes: &[u8], bit_depth: u32) -> i16 {
    match bit_depth {
        8 => (i16::from(bytes[0]) - 128) << 8,
        16 => i16::from_le_bytes([bytes[0], bytes[1]]),
        24 => {
            let wide =
                (i32::from(bytes[2] as i8) << 16) | (i32::from(bytes[1]) << 8) | i32::from(bytes[0]);
            (wide >> 8) as i16
        }
        _ => 0,
    }
}

/// De-interleaves a byte payload into per-channel 16-bit buffers.
///
/// Incomplete trailing frames are dropped. Returns one buffer per channel,
/// each holding `frame_count` samples.
pub fn deinterleave_to_i16(bytes: &[u8], format: &Format) -> Vec<Vec<i16>> {
    let channels = format.channels as usize;
    let frame_bytes = format.frame_bytes();
    let sample_bytes = format.sample_bytes();

    let frames = if frame_bytes == 0 {
        0
    } else {
        bytes.len() / frame_bytes
    };
    let mut out = vec![Vec::with_capacity(frames); channels];

    for frame in bytes.chunks_exact(frame_bytes) {
        for (ch, buf) in out.iter_mut().enumerate() {
            let start = ch * sample_bytes;
            buf.push(decode_sample(&frame[start..], format.bit_depth));
        }
    }

    out
}

/// Re-interleaves per-channel 16-bit buffers into little-endian bytes.
///
/// All channel buffers must have equal length; output is truncated to the
/// shortest one.
pub fn interleave_to_bytes(channels: &[Vec<i16>]) -> Vec<u8> {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * channels.len() * 2);

    for i in 0..frames {
        for ch in channels {
            out.extend_from_slice(&ch[i].to_le_bytes());
        }
    }

    out
}

/// Converts a 16-bit sample slice to little-endian bytes.
pub fn i16_slice_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Converts little-endian bytes to 16-bit samples.
///
/// A trailing odd byte is ignored.
pub fn bytes_to_i16_slice(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
