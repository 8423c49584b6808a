use crate::error::ShowError;

/// Interleaved PCM handed over by the audio-decoding collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    pub channels: u16,
    pub sample_rate: u32,
    /// 8 (unsigned) or 16 (signed little-endian).
    pub bits_per_sample: u16,
    pub data: Vec<u8>,
}

impl PcmAudio {
    pub fn new(
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
        data: Vec<u8>,
    ) -> Result<Self, ShowError> {
        if channels == 0 {
            return Err(ShowError::audio("pcm buffer has zero channels"));
        }
        if sample_rate == 0 {
            return Err(ShowError::audio("pcm buffer has zero sample rate"));
        }
        if bits_per_sample != 8 && bits_per_sample != 16 {
            return Err(ShowError::audio(format!(
                "unsupported pcm bit depth {bits_per_sample} (expected 8 or 16)"
            )));
        }
        let pcm = Self {
            channels,
            sample_rate,
            bits_per_sample,
            data,
        };
        if pcm.data.len() % pcm.frame_bytes() != 0 {
            return Err(ShowError::audio(format!(
                "pcm buffer of {} bytes is not a whole number of {}-byte frames",
                pcm.data.len(),
                pcm.frame_bytes()
            )));
        }
        Ok(pcm)
    }

    fn frame_bytes(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    pub fn frame_count(&self) -> usize {
        self.data.len() / self.frame_bytes().max(1)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / f64::from(self.sample_rate.max(1))
    }

    /// Interleaved samples converted to `f32` in [-1, 1].
    pub fn to_f32_samples(&self) -> Vec<f32> {
        match self.bits_per_sample {
            8 => self
                .data
                .iter()
                .map(|&b| (f32::from(b) - 128.0) / 128.0)
                .collect(),
            _ => self
                .data
                .chunks_exact(2)
                .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])) / 32768.0)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_of_stereo_16bit() {
        // 44100 frames * 2 channels * 2 bytes = one second.
        let pcm = PcmAudio::new(2, 44_100, 16, vec![0; 44_100 * 4]).unwrap();
        assert_eq!(pcm.frame_count(), 44_100);
        assert!((pcm.duration_secs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn converts_samples_to_unit_range() {
        let pcm = PcmAudio::new(1, 8_000, 16, vec![0x00, 0x80, 0xff, 0x7f]).unwrap();
        let s = pcm.to_f32_samples();
        assert_eq!(s[0], -1.0);
        assert!(s[1] > 0.999);

        let pcm8 = PcmAudio::new(1, 8_000, 8, vec![0, 128]).unwrap();
        assert_eq!(pcm8.to_f32_samples(), vec![-1.0, 0.0]);
    }

    #[test]
    fn rejects_partial_frames() {
        assert!(PcmAudio::new(2, 8_000, 16, vec![0; 3]).is_err());
        assert!(PcmAudio::new(1, 8_000, 24, vec![0; 3]).is_err());
    }
}
