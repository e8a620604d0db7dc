use crate::args::{Command, parse_format};
use crate::config::CliConfig;
use anyhow::{Context, anyhow, bail};
use oss_duplex_engine::{
    Backend, DataCallback, DeviceCollection, InputBuffer, OssBackend, OssStream,
    OutputBuffer, SampleFormat, StreamConfig, StreamOps, StreamParams, StreamState, data_callback,
    forward_state,
};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{Receiver, channel};
use tracing::{debug, info, warn};
use wavers::Wav;

/// Phase-accumulating sine oscillator.
#[derive(Debug, Clone)]
pub struct Sine {
    phase: f32,
    step: f32,
}

impl Sine {
    pub fn new(freq: f32, rate: u32) -> Self {
        Self {
            phase: 0.0,
            step: freq * std::f32::consts::TAU / rate.max(1) as f32,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let value = self.phase.sin();
        self.phase = (self.phase + self.step) % std::f32::consts::TAU;
        value
    }
}

fn channels_in(samples: usize, nfr: usize) -> usize {
    (samples / nfr.max(1)).max(1)
}

pub fn tone_callback(freq: f32, rate: u32, total_frames: usize) -> DataCallback {
    let mut sine = Sine::new(freq, rate);
    let mut remaining = total_frames;
    data_callback(move |_, output, nfr| {
        let Some(mut output) = output else {
            return Ok(0);
        };
        let frames = nfr.min(remaining);
        match &mut output {
            OutputBuffer::S16(buf) => {
                let channels = channels_in(buf.len(), nfr);
                for frame in buf.chunks_mut(channels).take(frames) {
                    frame.fill((sine.next_sample() * i16::MAX as f32) as i16);
                }
            }
            OutputBuffer::F32(buf) => {
                let channels = channels_in(buf.len(), nfr);
                for frame in buf.chunks_mut(channels).take(frames) {
                    frame.fill(sine.next_sample());
                }
            }
        }
        remaining -= frames;
        Ok(frames)
    })
}

pub fn playback_callback(samples: Vec<f32>) -> DataCallback {
    let mut cursor = 0;
    data_callback(move |_, output, nfr| {
        let Some(OutputBuffer::F32(out)) = output else {
            return Ok(0);
        };
        let channels = channels_in(out.len(), nfr);
        let n = out.len().min(samples.len() - cursor);
        out[..n].copy_from_slice(&samples[cursor..cursor + n]);
        cursor += n;
        Ok(n / channels)
    })
}

/// Appends captured samples to `sink` until `limit` frames are stored. The
/// first block precedes any device read and is skipped.
pub fn capture_callback(sink: Arc<Mutex<Vec<f32>>>, limit: Option<usize>) -> DataCallback {
    let mut primed = false;
    let mut frames_kept = 0;
    data_callback(move |input, _, nfr| {
        let Some(InputBuffer::F32(samples)) = input else {
            return Ok(0);
        };
        if !primed {
            primed = true;
            return Ok(nfr);
        }
        let channels = channels_in(samples.len(), nfr);
        let frames = limit.map_or(nfr, |limit| nfr.min(limit - frames_kept));
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(&samples[..frames * channels]);
        frames_kept += frames;
        Ok(if limit.is_some_and(|limit| frames_kept >= limit) {
            0
        } else {
            nfr
        })
    })
}

/// Stops `stream` without stalling the runtime; the stop joins the worker
/// thread.
fn stop_stream<S: StreamOps>(stream: &S) -> anyhow::Result<()> {
    tokio::task::block_in_place(|| stream.stop())?;
    Ok(())
}

async fn wait_for_end(stream: &OssStream, rx: &mut Receiver<StreamState>) -> anyhow::Result<StreamState> {
    loop {
        tokio::select! {
            state = rx.recv() => match state {
                Some(StreamState::Started) => debug!("stream started"),
                Some(state) => return Ok(state),
                None => bail!("stream state channel closed"),
            },
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("Interrupted, stopping stream");
                stop_stream(stream)?;
                return Ok(StreamState::Stopped);
            }
        }
    }
}

fn print_devices(collection: &DeviceCollection, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(collection)?);
        return Ok(());
    }
    if collection.is_empty() {
        println!("No devices found");
    }
    for dev in collection {
        println!(
            "{}{:<16} {:<32} {:>2} ch  {}-{} Hz",
            if dev.preferred { "*" } else { " " },
            dev.devid,
            dev.friendly_name,
            dev.max_channels,
            dev.min_rate,
            dev.max_rate
        );
    }
    Ok(())
}

async fn run_stream(
    ctx: &OssBackend,
    config: StreamConfig,
    data: DataCallback,
    volume: Option<f32>,
) -> anyhow::Result<(OssStream, StreamState)> {
    let (tx, mut rx) = channel(8);
    let stream = ctx.stream_init(config, data, forward_state(tx))?;
    if let Some(volume) = volume {
        stream.set_volume(volume)?;
    }
    stream.start()?;
    let state = wait_for_end(&stream, &mut rx).await?;
    match state {
        StreamState::Error => bail!("stream ended with an error"),
        state => info!("stream finished: {:?}", state),
    }
    Ok((stream, state))
}

async fn tone(
    ctx: &OssBackend,
    config: &CliConfig,
    device: Option<String>,
    seconds: Option<f32>,
    freq: Option<f32>,
    volume: Option<f32>,
    format: Option<SampleFormat>,
) -> anyhow::Result<()> {
    let format = match format {
        Some(format) => format,
        None => parse_format(&config.tone.format)
            .ok_or_else(|| anyhow!("Unknown tone format '{}'", config.tone.format))?,
    };
    let rate = ctx.preferred_sample_rate()?;
    let seconds = seconds.unwrap_or(config.tone.seconds);
    let freq = freq.unwrap_or(config.tone.freq);
    let stream_config = StreamConfig {
        name: Some("tone".to_owned()),
        output_device: device,
        output: Some(StreamParams::new(format, rate, 2)),
        ..StreamConfig::default()
    };
    let total = (seconds * rate as f32) as usize;
    run_stream(
        ctx,
        stream_config,
        tone_callback(freq, rate, total),
        Some(volume.unwrap_or(config.tone.volume)),
    )
    .await?;
    Ok(())
}

async fn play(ctx: &OssBackend, file: &Path, device: Option<String>) -> anyhow::Result<()> {
    let mut wav = Wav::<f32>::from_path(file)
        .map_err(|e| anyhow!("Failed to open WAV '{}': {e}", file.display()))?;
    let channels = wav.n_channels().max(1) as u32;
    let rate = wav.sample_rate() as u32;
    let samples: wavers::Samples<f32> = wav
        .read()
        .map_err(|e| anyhow!("WAV read error '{}': {e}", file.display()))?;
    let samples = samples.to_vec();
    info!(
        "Playing {} ({} ch, {} Hz, {} frames)",
        file.display(),
        channels,
        rate,
        samples.len() / channels as usize
    );

    let max_channels = ctx.max_channel_count()?;
    if channels > max_channels {
        warn!("{} has {} channels, backend reports at most {}", file.display(), channels, max_channels);
    }
    let stream_config = StreamConfig {
        name: Some("play".to_owned()),
        output_device: device,
        output: Some(StreamParams::new(SampleFormat::FLOAT32NE, rate, channels)),
        ..StreamConfig::default()
    };
    run_stream(ctx, stream_config, playback_callback(samples), None).await?;
    Ok(())
}

async fn record(
    ctx: &OssBackend,
    file: &Path,
    device: Option<String>,
    seconds: Option<f32>,
) -> anyhow::Result<()> {
    let rate = ctx.preferred_sample_rate()?;
    let stream_config = StreamConfig {
        name: Some("record".to_owned()),
        input_device: device,
        input: Some(StreamParams::new(SampleFormat::FLOAT32NE, rate, 2)),
        ..StreamConfig::default()
    };
    let sink = Arc::new(Mutex::new(Vec::new()));
    let limit = seconds.map(|s| (s * rate as f32) as usize);
    let (stream, _) = run_stream(
        ctx,
        stream_config,
        capture_callback(Arc::clone(&sink), limit),
        None,
    )
    .await?;
    stop_stream(&stream)?;

    let info = stream
        .input_info()
        .ok_or_else(|| anyhow!("stream has no capture direction"))?;
    let samples = std::mem::take(&mut *sink.lock().unwrap_or_else(PoisonError::into_inner));
    wavers::write::<f32, _>(file, &samples, info.sample_rate as i32, info.channels as u16)
        .map_err(|e| anyhow!("Failed to write '{}': {e}", file.display()))?;
    info!(
        "Recorded {} frames to {}",
        samples.len() / info.channels.max(1) as usize,
        file.display()
    );
    Ok(())
}

pub async fn run(command: Command, config: &CliConfig) -> anyhow::Result<()> {
    let ctx = OssBackend::new(config.backend.clone());
    match command {
        Command::Devices { device_type, json } => {
            let collection = ctx
                .enumerate_devices(device_type)
                .with_context(|| format!("Failed to enumerate {device_type:?} devices"))?;
            print_devices(&collection, json)?;
            ctx.device_collection_destroy(collection);
            Ok(())
        }
        Command::Tone {
            device,
            seconds,
            freq,
            volume,
            format,
        } => tone(&ctx, config, device, seconds, freq, volume, format).await,
        Command::Play { file, device } => play(&ctx, &file, device).await,
        Command::Record {
            file,
            device,
            seconds,
        } => record(&ctx, &file, device, seconds).await,
    }
}
