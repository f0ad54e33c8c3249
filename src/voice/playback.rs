//! Audio playback to speakers
//!
//! [`UnitSink`] is the decode-and-play capability the playback sequencer
//! drives; [`AudioPlayback`] implements it with an MP3 decode and a cpal
//! output stream.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, StreamConfig};

use crate::{Error, Result};

/// Default sample rate for playback (matches common TTS output)
pub const DEFAULT_PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Decode-and-play capability for one assembled audio unit
///
/// `play` returns only once the unit has finished playing (or failed to
/// decode); the sequencer relies on that to enforce strict ordering.
#[async_trait]
pub trait UnitSink: Send {
    /// Decode `bytes` and play the result to completion
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not decodable audio or the output
    /// device fails; the caller treats either as a skip.
    async fn play(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Plays audio units to the default output device
pub struct AudioPlayback {
    device: Device,
    config: StreamConfig,
    sample_rate: u32,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.sample_format() == SampleFormat::F32
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.sample_format() == SampleFormat::F32
                        && c.min_sample_rate() <= SampleRate(sample_rate)
                        && c.max_sample_rate() >= SampleRate(sample_rate)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self {
            device,
            config,
            sample_rate,
        })
    }

    /// Play raw mono f32 samples to completion
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built or started
    pub fn play_samples(&self, samples: &[f32]) -> Result<()> {
        self.play_samples_blocking(samples)
    }

    /// Play decoded samples to completion
    fn play_samples_blocking(&self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let config = self.config.clone();
        let channels = usize::from(config.channels);

        let samples = samples.to_vec();
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(Mutex::new(false));
        let finished_cb = Arc::clone(&finished);
        let position_cb = Arc::clone(&position);
        let sample_count = samples.len();

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position_cb.lock().unwrap();

                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < samples.len() {
                            samples[*pos]
                        } else {
                            *finished_cb.lock().unwrap() = true;
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }

                        if *pos < samples.len() {
                            *pos += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Wait for the output callback to run past the final sample
        let duration_ms = (sample_count as u64 * 1000) / u64::from(self.sample_rate);
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(duration_ms + 500);

        while !*finished.lock().unwrap() {
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        // Small delay to let the device drain
        std::thread::sleep(std::time::Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = sample_count, "unit playback complete");

        Ok(())
    }
}

#[async_trait]
impl UnitSink for AudioPlayback {
    #[allow(clippy::unused_async)]
    async fn play(&mut self, bytes: &[u8]) -> Result<()> {
        let samples = decode_mp3(bytes)?;
        self.play_samples_blocking(&samples)
    }
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                // Stereo is averaged down to mono
                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            f32::midpoint(left, right)
                        })
                        .collect()
                } else {
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() {
        return Err(Error::Decode("no decodable frames in unit".to_string()));
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = decode_mp3(&[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn empty_input_fails_to_decode() {
        assert!(matches!(decode_mp3(&[]), Err(Error::Decode(_))));
    }
}
