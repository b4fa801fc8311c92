//! ALSA PCM device wrappers for audio capture and playback.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

use super::backend::{AudioBackend, AudioConfig, AudioSink, AudioSource};
use crate::error::{SessionError, SessionResult};

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Actual number of channels
    pub channels: u32,
    /// Period size in frames (one frame = channels × sample_width)
    pub period_size: usize,
}

/// Open a PCM device for capture (recording).
pub fn open_capture(device: &str, sample_rate: u32, channels: u32) -> Result<(PCM, AlsaParams)> {
    open_pcm(device, Direction::Capture, sample_rate, channels, None, "Capture")
}

/// Open a PCM device for playback.
pub fn open_playback(
    device: &str,
    sample_rate: u32,
    channels: u32,
    period_size: Option<usize>,
) -> Result<(PCM, AlsaParams)> {
    open_pcm(
        device,
        Direction::Playback,
        sample_rate,
        channels,
        period_size,
        "Playback",
    )
}

fn open_pcm(
    device: &str,
    direction: Direction,
    sample_rate: u32,
    channels: u32,
    period_size: Option<usize>,
    dir_name: &str,
) -> Result<(PCM, AlsaParams)> {
    let pcm = PCM::new(device, direction, false)
        .with_context(|| format!("Failed to open PCM device '{}' for {}", device, dir_name))?;

    // Configure hardware parameters
    {
        let hwp =
            HwParams::any(&pcm).with_context(|| "Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels_near(channels)?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)?;
        if let Some(ps) = period_size {
            hwp.set_period_size_near(ps as alsa::pcm::Frames, ValueOr::Nearest)?;
            // Keep the hardware queue short so a cancelled chunk goes quiet quickly
            hwp.set_buffer_size_near((ps * 4) as alsa::pcm::Frames)?;
        }
        pcm.hw_params(&hwp)?;
    }

    // Read back actual negotiated parameters
    let (actual_rate, actual_channels, period_size) = {
        let hwp = pcm.hw_params_current()?;
        let rate = hwp.get_rate()?;
        let ch = hwp.get_channels()?;
        let ps = hwp.get_period_size()? as usize;
        (rate, ch, ps)
    };

    let params = AlsaParams {
        sample_rate: actual_rate,
        channels: actual_channels,
        period_size,
    };

    log::info!(
        "ALSA {}: device={}, rate={}, channels={}, period_size={}",
        dir_name,
        device,
        actual_rate,
        actual_channels,
        period_size,
    );

    Ok((pcm, params))
}

// ======================== Capture ========================

pub struct AlsaSource {
    pcm: PCM,
    params: AlsaParams,
    read_buf: Vec<i16>,
}

impl AudioSource for AlsaSource {
    fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    fn read(&mut self, buf: &mut [i16]) -> Result<usize> {
        let channels = self.params.channels as usize;
        let wanted = buf.len().min(self.params.period_size);
        let needed = wanted * channels;
        if self.read_buf.len() < needed {
            self.read_buf.resize(needed, 0);
        }

        let io = self.pcm.io_i16()?;
        match io.readi(&mut self.read_buf[..needed]) {
            Ok(frames) => {
                // Multi-channel → mono: average all channels
                for (i, out) in buf.iter_mut().take(frames).enumerate() {
                    let frame = &self.read_buf[i * channels..(i + 1) * channels];
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    *out = (sum / channels as i32) as i16;
                }
                Ok(frames)
            }
            Err(e) => {
                log::warn!("ALSA capture error: {}, recovering...", e);
                self.pcm
                    .prepare()
                    .context("Failed to recover PCM capture")?;
                Ok(0)
            }
        }
    }
}

impl Drop for AlsaSource {
    fn drop(&mut self) {
        let _ = self.pcm.drop();
        log::info!("Microphone released");
    }
}

// ======================== Playback ========================

pub struct AlsaSink {
    pcm: PCM,
    params: AlsaParams,
}

impl AudioSink for AlsaSink {
    fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    fn channels(&self) -> u32 {
        self.params.channels
    }

    fn write(&mut self, interleaved: &[i16]) -> Result<()> {
        let io = self.pcm.io_i16()?;
        let channels = self.params.channels as usize;
        // Retry loop handles short writes and XRUN recovery without losing frames.
        let total_frames = interleaved.len() / channels;
        let mut frames_written = 0;
        let mut retry_count = 0u32;

        while frames_written < total_frames {
            let offset = frames_written * channels;
            match io.writei(&interleaved[offset..]) {
                Ok(n) => {
                    frames_written += n;
                    retry_count = 0;
                }
                Err(e) => {
                    log::warn!("ALSA XRUN or error: {}, recovering...", e);
                    retry_count += 1;
                    self.pcm
                        .prepare()
                        .context("Failed to recover PCM playback")?;

                    // The device keeps falling behind: drop the rest of this period
                    if retry_count >= 3 {
                        log::error!(
                            "Max recovery retries ({}) reached. Dropping {} unwritten frames.",
                            retry_count,
                            total_frames - frames_written
                        );
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        self.pcm.drop().context("Failed to drop queued playback")?;
        self.pcm
            .prepare()
            .context("Failed to re-arm PCM playback")?;
        Ok(())
    }
}

impl Drop for AlsaSink {
    fn drop(&mut self) {
        // Discard whatever is still queued in hardware
        let _ = self.pcm.drop();
        log::info!("Playback device closed");
    }
}

// ======================== Backend ========================

pub struct AlsaBackend {
    config: AudioConfig,
}

impl AlsaBackend {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }
}

impl AudioBackend for AlsaBackend {
    fn open_input(&self) -> SessionResult<Box<dyn AudioSource>> {
        let (pcm, params) =
            open_capture(&self.config.capture_device, self.config.capture_sample_rate, 1)
                .map_err(|e| SessionError::PermissionDenied(format!("{:#}", e)))?;
        if params.sample_rate != self.config.capture_sample_rate {
            return Err(SessionError::AudioDevice(format!(
                "capture device runs at {} Hz, need {} Hz",
                params.sample_rate, self.config.capture_sample_rate
            )));
        }
        Ok(Box::new(AlsaSource {
            pcm,
            params,
            read_buf: Vec::new(),
        }))
    }

    fn open_output(&self) -> SessionResult<Box<dyn AudioSink>> {
        let (pcm, params) = open_playback(
            &self.config.playback_device,
            self.config.playback_sample_rate,
            1,
            Some(self.config.playback_period_size),
        )
        .map_err(|e| SessionError::AudioDevice(format!("{:#}", e)))?;
        if params.sample_rate != self.config.playback_sample_rate {
            return Err(SessionError::AudioDevice(format!(
                "playback device runs at {} Hz, need {} Hz",
                params.sample_rate, self.config.playback_sample_rate
            )));
        }
        Ok(Box::new(AlsaSink { pcm, params }))
    }
}
