//! Alert sound decoding and the silent alarm.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use drowsy_core::Alarm;
use tracing::{debug, info};

/// A decoded WAV file, interleaved samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AlertSound {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AlertSound {
    /// Decodes a WAV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is not a valid WAV,
    /// or holds no samples.
    #[allow(clippy::cast_precision_loss)]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open alert sound: {}", path.display()))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .with_context(|| format!("Corrupt WAV data in {}", path.display()))?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .with_context(|| format!("Corrupt WAV data in {}", path.display()))?
            }
        };

        if samples.is_empty() || spec.channels == 0 {
            bail!("Alert sound has no audio: {}", path.display());
        }

        debug!(
            "Loaded alert sound {} ({} Hz, {} ch, {} samples)",
            path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }

    /// Number of channels.
    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (samples per channel).
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// The sample at `frame` for output `channel`; extra output channels
    /// repeat the source channels.
    #[must_use]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = usize::from(self.channels);
        self.samples
            .get(frame * channels + channel % channels)
            .copied()
            .unwrap_or(0.0)
    }

    /// Playback length in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate.max(1) as f32
    }
}

/// Alarm that only logs. Used when muted or built without audio support.
#[derive(Debug, Default)]
pub struct LogAlarm {
    sounding: Option<PathBuf>,
}

impl LogAlarm {
    /// Creates a silent alarm.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the alarm is currently "sounding".
    #[must_use]
    pub const fn is_sounding(&self) -> bool {
        self.sounding.is_some()
    }
}

impl Alarm for LogAlarm {
    fn start_loop(&mut self, sound: &Path) -> Result<()> {
        info!("Alarm on (muted, would loop {})", sound.display());
        self.sounding = Some(sound.to_path_buf());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.sounding.take().is_some() {
            info!("Alarm off");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_int_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert.wav");
        write_wav(&path, 2, &[0, 16384, -16384, 32767, 0, 0, 0, 0]);

        let sound = AlertSound::load(&path).unwrap();
        assert_eq!(sound.channels(), 2);
        assert_eq!(sound.sample_rate(), 8000);
        assert_eq!(sound.frames(), 4);
        assert!((sound.sample(0, 1) - 0.5).abs() < 1e-4);
        assert!((sound.sample(1, 0) + 0.5).abs() < 1e-4);
        // A third output channel falls back to the left source channel.
        assert!((sound.sample(0, 2) - sound.sample(0, 0)).abs() < f32::EPSILON);
        assert!((sound.duration_secs() - 0.0005).abs() < 1e-6);
    }

    #[test]
    fn test_load_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0.25_f32, -0.75] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let sound = AlertSound::load(&path).unwrap();
        assert_eq!(sound.frames(), 2);
        assert!((sound.sample(1, 0) + 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_rejects_empty_and_invalid() {
        let dir = tempfile::tempdir().unwrap();

        let empty = dir.path().join("empty.wav");
        write_wav(&empty, 1, &[]);
        assert!(AlertSound::load(&empty).is_err());

        let bogus = dir.path().join("bogus.wav");
        std::fs::write(&bogus, b"not a wav file").unwrap();
        assert!(AlertSound::load(&bogus).is_err());

        assert!(AlertSound::load(dir.path().join("missing.wav")).is_err());
    }

    #[test]
    fn test_log_alarm_tracks_state() {
        let mut alarm = LogAlarm::new();
        assert!(!alarm.is_sounding());
        alarm.start_loop(Path::new("alert.wav")).unwrap();
        assert!(alarm.is_sounding());
        alarm.stop().unwrap();
        assert!(!alarm.is_sounding());
        // Stopping twice is harmless.
        alarm.stop().unwrap();
    }
}
