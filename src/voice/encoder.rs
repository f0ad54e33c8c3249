//! Real-time PCM encoding for the capture callback
//!
//! Runs inside the audio thread: no I/O, no locking, no allocation beyond
//! the caller-provided output buffer.

/// Encode f32 samples into 16-bit signed little-endian PCM
///
/// Clears `out` and fills it with `2 * samples.len()` bytes. Samples are
/// clamped to [-1.0, 1.0] and scaled asymmetrically: negatives by 32768,
/// non-negatives by 32767, so both rails of the i16 range are reachable.
/// The fractional part is truncated toward zero.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_into(samples: &[f32], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(samples.len() * 2);

    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let scaled = if clamped < 0.0 {
            clamped * 32768.0
        } else {
            clamped * 32767.0
        };
        // `as` truncates toward zero, matching the wire format
        let value = scaled as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Encode f32 samples into a freshly allocated PCM frame
#[must_use]
pub fn encode(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    encode_into(samples, &mut out);
    out
}
