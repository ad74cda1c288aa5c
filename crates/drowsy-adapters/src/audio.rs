//! Looping alert playback through the default output device.
//!
//! cpal streams are not `Send`, so a dedicated thread owns the device and
//! the active stream; [`CpalAlarm`] only sends it commands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use drowsy_core::Alarm;
use tracing::{debug, error, info, warn};

use crate::alarm::AlertSound;

enum Command {
    Play(Arc<AlertSound>),
    Stop,
    Shutdown,
}

/// Alarm that loops a WAV file on the default audio output.
pub struct CpalAlarm {
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    sounds: HashMap<PathBuf, Arc<AlertSound>>,
}

impl CpalAlarm {
    /// Opens the default output device on a background audio thread.
    ///
    /// # Errors
    ///
    /// Returns an error if no output device is available or the thread
    /// cannot be started.
    pub fn new() -> Result<Self> {
        let (commands, rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let worker = std::thread::Builder::new()
            .name("drowsy-audio".into())
            .spawn(move || audio_thread(&rx, &ready_tx))
            .context("Failed to spawn audio thread")?;

        ready_rx
            .recv()
            .context("Audio thread exited during startup")?
            .map_err(|e| anyhow!(e))?;

        Ok(Self {
            commands,
            worker: Some(worker),
            sounds: HashMap::new(),
        })
    }

    /// Decodes a sound ahead of time so the first alarm starts immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the WAV cannot be decoded.
    pub fn preload(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.sound(path.as_ref()).map(|_| ())
    }

    fn sound(&mut self, path: &Path) -> Result<Arc<AlertSound>> {
        if let Some(sound) = self.sounds.get(path) {
            return Ok(Arc::clone(sound));
        }
        let sound = Arc::new(AlertSound::load(path)?);
        self.sounds.insert(path.to_path_buf(), Arc::clone(&sound));
        Ok(sound)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Audio thread has stopped"))
    }
}

impl Alarm for CpalAlarm {
    fn start_loop(&mut self, sound: &Path) -> Result<()> {
        let sound = self.sound(sound)?;
        self.send(Command::Play(sound))
    }

    fn stop(&mut self) -> Result<()> {
        self.send(Command::Stop)
    }
}

impl Drop for CpalAlarm {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Audio thread panicked");
            }
        }
    }
}

fn audio_thread(commands: &Receiver<Command>, ready: &Sender<Result<(), String>>) {
    let host = cpal::default_host();
    let Some(device) = host.default_output_device() else {
        let _ = ready.send(Err("No audio output device available".into()));
        return;
    };
    let supported = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready.send(Err(format!("No usable output config: {e}")));
            return;
        }
    };
    let format = supported.sample_format();
    let config: StreamConfig = supported.into();

    info!(
        "Audio output: {} ({} Hz, {} ch, {format:?})",
        device.name().unwrap_or_else(|_| "unknown".into()),
        config.sample_rate.0,
        config.channels
    );
    let _ = ready.send(Ok(()));

    let mut active: Option<Stream> = None;
    while let Ok(command) = commands.recv() {
        match command {
            Command::Play(sound) => {
                // Replace any stream already playing.
                active = None;
                match open_stream(&device, &config, format, sound) {
                    Ok(stream) => active = Some(stream),
                    Err(e) => error!("Failed to start alert playback: {e:#}"),
                }
            }
            Command::Stop => {
                if active.take().is_some() {
                    debug!("Alert playback stopped");
                }
            }
            Command::Shutdown => break,
        }
    }
    drop(active);
    debug!("Audio thread exiting");
}

fn open_stream(
    device: &Device,
    config: &StreamConfig,
    format: SampleFormat,
    sound: Arc<AlertSound>,
) -> Result<Stream> {
    let looper = Looper::new(sound, config);
    let stream = match format {
        SampleFormat::F32 => build::<f32>(device, config, looper),
        SampleFormat::I16 => build::<i16>(device, config, looper),
        SampleFormat::U16 => build::<u16>(device, config, looper),
        other => return Err(anyhow!("Unsupported output sample format: {other:?}")),
    }?;
    stream.play().context("Failed to start output stream")?;
    Ok(stream)
}

fn build<T>(device: &Device, config: &StreamConfig, mut looper: Looper) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| looper.fill(data),
            |err| error!("Audio stream error: {err}"),
            None,
        )
        .context("Failed to build output stream")
}

/// Endless playback cursor over a sound, resampled by nearest frame.
struct Looper {
    sound: Arc<AlertSound>,
    position: f64,
    step: f64,
    out_channels: usize,
}

impl Looper {
    fn new(sound: Arc<AlertSound>, config: &StreamConfig) -> Self {
        let step = f64::from(sound.sample_rate()) / f64::from(config.sample_rate.0.max(1));
        Self {
            sound,
            position: 0.0,
            step,
            out_channels: usize::from(config.channels.max(1)),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn fill<T: Sample + FromSample<f32>>(&mut self, out: &mut [T]) {
        let frames = self.sound.frames().max(1);
        for chunk in out.chunks_mut(self.out_channels) {
            let frame = self.position as usize % frames;
            for (channel, slot) in chunk.iter_mut().enumerate() {
                *slot = T::from_sample(self.sound.sample(frame, channel));
            }
            self.position = (self.position + self.step) % frames as f64;
        }
    }
}
