//! Audio output for the playback clock.
//!
//! [`CpalDevice`] plays a decoded [`PcmAudio`] track through the default output device and
//! implements [`AudioDevice`], so a `Playback` can keep it in step with show time. Pitch is
//! applied by stepping the read head `pitch` source frames per output frame.
//!
//! The device backend is behind the `native` feature; without it [`CpalDevice::open`]
//! reports [`AudioOutError::NotEnabled`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use pulse_core::{PcmAudio, ShowError};
use pulse_runtime::AudioDevice;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioOutError {
    #[error("audio output not enabled (build with feature: pulse-audio-out/native)")]
    NotEnabled,

    #[error("{0}")]
    Backend(String),
}

impl From<AudioOutError> for ShowError {
    fn from(err: AudioOutError) -> Self {
        ShowError::audio(err.to_string())
    }
}

// -------------------------------------------------------------------------------------------------
// Track + playhead (shared with the audio callback)
// -------------------------------------------------------------------------------------------------

/// Decoded samples, interleaved, in [-1, 1].
#[derive(Debug, Clone)]
pub struct Track {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl Track {
    pub fn from_pcm(audio: &PcmAudio) -> Self {
        Self {
            samples: audio.to_f32_samples(),
            channels: usize::from(audio.channels.max(1)),
            sample_rate: audio.sample_rate.max(1),
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    fn sample(&self, frame: usize, channel: usize) -> f32 {
        let ch = channel.min(self.channels - 1);
        self.samples
            .get(frame * self.channels + ch)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Read head state written by the render thread and read by the audio callback.
///
/// Floats travel as bit patterns in atomics.
#[derive(Debug)]
pub struct Playhead {
    /// Source frame position (fractional).
    frame_bits: AtomicU64,
    pitch_bits: AtomicU64,
    playing: AtomicBool,
}

impl Default for Playhead {
    fn default() -> Self {
        Self {
            frame_bits: AtomicU64::new(0f64.to_bits()),
            pitch_bits: AtomicU64::new(1f64.to_bits()),
            playing: AtomicBool::new(false),
        }
    }
}

impl Playhead {
    pub fn frame(&self) -> f64 {
        f64::from_bits(self.frame_bits.load(Ordering::Acquire))
    }

    pub fn set_frame(&self, frame: f64) {
        self.frame_bits.store(frame.to_bits(), Ordering::Release);
    }

    pub fn pitch(&self) -> f64 {
        f64::from_bits(self.pitch_bits.load(Ordering::Acquire))
    }

    pub fn set_pitch(&self, pitch: f64) {
        self.pitch_bits.store(pitch.to_bits(), Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }
}

/// Fill `out` (interleaved, `out_channels` wide, at `out_rate`) from `track`, advancing the
/// playhead. Paused or past-the-end output is silence.
pub fn render_into(
    track: &Track,
    playhead: &Playhead,
    out: &mut [f32],
    out_channels: usize,
    out_rate: u32,
) {
    let out_channels = out_channels.max(1);
    if !playhead.is_playing() {
        out.fill(0.0);
        return;
    }
    let step = playhead.pitch() * f64::from(track.sample_rate) / f64::from(out_rate.max(1));
    let frames = track.frames();
    let mut head = playhead.frame();
    for frame in out.chunks_mut(out_channels) {
        let idx = head.floor();
        if idx < 0.0 || idx as usize >= frames {
            frame.fill(0.0);
        } else {
            let idx = idx as usize;
            for (ch, slot) in frame.iter_mut().enumerate() {
                *slot = track.sample(idx, ch);
            }
        }
        head += step;
    }
    playhead.set_frame(head);
}

// -------------------------------------------------------------------------------------------------
// Device
// -------------------------------------------------------------------------------------------------

pub struct CpalDevice {
    track: Arc<Track>,
    playhead: Arc<Playhead>,
    #[cfg(feature = "native")]
    stream: cpal::Stream,
}

impl std::fmt::Debug for CpalDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalDevice")
            .field("frames", &self.track.frames())
            .field("sample_rate", &self.track.sample_rate)
            .field("playhead", &self.playhead)
            .finish()
    }
}

impl CpalDevice {
    /// Open the default output device for `audio`. The stream starts paused.
    pub fn open(audio: &PcmAudio) -> Result<Self, AudioOutError> {
        #[cfg(not(feature = "native"))]
        {
            let _ = audio;
            return Err(AudioOutError::NotEnabled);
        }

        #[cfg(feature = "native")]
        {
            use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

            let track = Arc::new(Track::from_pcm(audio));
            let playhead = Arc::new(Playhead::default());

            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| AudioOutError::Backend("no default output device".into()))?;
            let supported = device
                .default_output_config()
                .map_err(|e| AudioOutError::Backend(format!("default_output_config: {e}")))?;
            let sample_format = supported.sample_format();
            let config: cpal::StreamConfig = supported.config();
            let out_channels = usize::from(config.channels);
            let out_rate = config.sample_rate;

            tracing::info!(
                channels = out_channels,
                rate = out_rate,
                format = ?sample_format,
                track_secs = track.duration_secs(),
                "audio output opened"
            );

            let cb_track = Arc::clone(&track);
            let cb_playhead = Arc::clone(&playhead);
            let mut scratch: Vec<f32> = Vec::new();
            let stream = device
                .build_output_stream_raw(
                    &config,
                    sample_format,
                    move |data: &mut cpal::Data, _info| {
                        use cpal::Sample;

                        scratch.resize(data.len(), 0.0);
                        render_into(&cb_track, &cb_playhead, &mut scratch, out_channels, out_rate);
                        match data.sample_format() {
                            cpal::SampleFormat::F32 => {
                                if let Some(out) = data.as_slice_mut::<f32>() {
                                    out.copy_from_slice(&scratch);
                                }
                            }
                            cpal::SampleFormat::I16 => {
                                if let Some(out) = data.as_slice_mut::<i16>() {
                                    for (dst, src) in out.iter_mut().zip(&scratch) {
                                        *dst = i16::from_sample(*src);
                                    }
                                }
                            }
                            cpal::SampleFormat::U16 => {
                                if let Some(out) = data.as_slice_mut::<u16>() {
                                    for (dst, src) in out.iter_mut().zip(&scratch) {
                                        *dst = u16::from_sample(*src);
                                    }
                                }
                            }
                            _ => {}
                        }
                    },
                    |err| tracing::error!(%err, "audio stream error"),
                    None,
                )
                .map_err(|e| AudioOutError::Backend(format!("build_output_stream: {e}")))?;
            stream
                .pause()
                .map_err(|e| AudioOutError::Backend(format!("pause: {e}")))?;

            Ok(Self {
                track,
                playhead,
                stream,
            })
        }
    }

    pub fn playhead(&self) -> &Arc<Playhead> {
        &self.playhead
    }
}

impl AudioDevice for CpalDevice {
    fn set_position(&mut self, secs: f64) {
        self.playhead
            .set_frame(secs * f64::from(self.track.sample_rate));
    }

    fn set_pitch(&mut self, pitch: f64) {
        self.playhead.set_pitch(pitch);
    }

    fn start(&mut self) {
        self.playhead.set_playing(true);
        #[cfg(feature = "native")]
        {
            use cpal::traits::StreamTrait;
            if let Err(err) = self.stream.play() {
                tracing::error!(%err, "audio stream play failed");
            }
        }
    }

    fn stop(&mut self) {
        self.playhead.set_playing(false);
        #[cfg(feature = "native")]
        {
            use cpal::traits::StreamTrait;
            if let Err(err) = self.stream.pause() {
                tracing::error!(%err, "audio stream pause failed");
            }
        }
    }

    fn duration(&self) -> f64 {
        self.track.duration_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: u8, channels: u16, rate: u32) -> Track {
        let mut data = Vec::new();
        for f in 0..frames {
            for _ in 0..channels {
                data.push(f);
            }
        }
        Track::from_pcm(&PcmAudio::new(channels, rate, 8, data).unwrap())
    }

    #[test]
    fn paused_playhead_outputs_silence() {
        let track = ramp(16, 1, 8);
        let playhead = Playhead::default();
        let mut out = vec![1.0; 8];
        render_into(&track, &playhead, &mut out, 1, 8);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(playhead.frame(), 0.0);
    }

    #[test]
    fn pitch_steps_the_read_head() {
        let track = ramp(32, 1, 100);
        let playhead = Playhead::default();
        playhead.set_playing(true);
        let mut out = vec![0.0; 4];

        render_into(&track, &playhead, &mut out, 1, 100);
        assert_eq!(playhead.frame(), 4.0);
        assert_eq!(out[1], track.sample(1, 0));

        playhead.set_pitch(2.0);
        render_into(&track, &playhead, &mut out, 1, 100);
        assert_eq!(playhead.frame(), 12.0);
        assert_eq!(out[1], track.sample(6, 0));
    }

    #[test]
    fn mono_fans_out_and_end_is_silent() {
        let track = ramp(2, 1, 10);
        let playhead = Playhead::default();
        playhead.set_playing(true);
        playhead.set_frame(1.0);
        let mut out = vec![9.0; 6];
        render_into(&track, &playhead, &mut out, 2, 10);
        assert_eq!(out[0], out[1]);
        assert_eq!(&out[2..], &[0.0; 4]);
    }

    #[test]
    fn device_duration_and_position() {
        let track = ramp(50, 2, 25);
        assert_eq!(track.frames(), 50);
        assert_eq!(track.duration_secs(), 2.0);
    }

    #[cfg(not(feature = "native"))]
    #[test]
    fn open_without_backend_is_not_enabled() {
        let audio = PcmAudio::new(1, 8000, 16, vec![0; 4]).unwrap();
        let err = CpalDevice::open(&audio).unwrap_err();
        assert!(matches!(err, AudioOutError::NotEnabled));
        let show_err: ShowError = err.into();
        assert!(show_err.to_string().contains("not enabled"));
    }
}
