use crate::buffer::DirectionBuffer;
use crate::callback::{DataCallback, StateCallback};
use crate::config::OssOptions;
use crate::error::{Error, Result};
use crate::negotiate::{Negotiated, comfortable_frames, open_direction};
use crate::params::{CurrentDevice, Direction, StreamConfig, StreamInfo, StreamParams};
use crate::traits::{DspDevice, StreamOps};
use crate::worker::{DirectionState, IoCore, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread::JoinHandle;
use tracing::{debug, error};

pub const WORKER_THREAD_NAME: &str = "oss-duplex-worker";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// A capture and/or playback stream on OSS device nodes.
///
/// The stream is built stopped. Dropping it stops the worker, joins it and
/// only then closes the devices.
pub struct Stream<D: DspDevice> {
    shared: Arc<Shared>,
    core: Mutex<Option<IoCore<D>>>,
    worker: Mutex<Option<JoinHandle<Option<IoCore<D>>>>>,
    playback: Option<(Arc<D>, usize)>,
    input_info: Option<StreamInfo>,
    output_info: Option<StreamInfo>,
    devices: CurrentDevice,
    nfr: usize,
}

impl<D: DspDevice> std::fmt::Debug for Stream<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("devices", &self.devices)
            .field("input_info", &self.input_info)
            .field("output_info", &self.output_info)
            .field("nfr", &self.nfr)
            .finish_non_exhaustive()
    }
}

fn open_state<D: DspDevice>(
    options: &OssOptions,
    device: Option<&str>,
    direction: Direction,
    params: &StreamParams,
) -> Result<(DirectionState<D>, bool)> {
    let name = device.unwrap_or(&options.default_device).to_owned();
    let Negotiated {
        dsp,
        info,
        floating,
    } = open_direction::<D>(&name, direction, params).inspect_err(|e| {
        error!("OSS {} stream setup on {} failed: {}", direction.label(), name, e);
    })?;
    let state = DirectionState {
        name,
        dsp: Arc::new(dsp),
        info,
        // Sized for real once nfr is known.
        buffer: DirectionBuffer::new(&info, floating, 0),
    };
    Ok((state, floating))
}

impl<D: DspDevice> Stream<D> {
    /// Opens and negotiates every requested direction. Nothing is left open
    /// when this fails.
    pub fn open(
        options: &OssOptions,
        config: StreamConfig,
        data_cb: DataCallback,
        state_cb: StateCallback,
    ) -> Result<Self> {
        if config.input.is_none() && config.output.is_none() {
            return Err(Error::Backend(
                "stream needs an input or an output direction".to_owned(),
            ));
        }
        debug!(
            "OSS stream {:?} requested, latency hint {} frames",
            config.name.as_deref().unwrap_or(""),
            config.latency_frames
        );

        let mut capture = match &config.input {
            Some(params) => Some(open_state::<D>(
                options,
                config.input_device.as_deref(),
                Direction::Capture,
                params,
            )?),
            None => None,
        };
        let mut playback = match &config.output {
            Some(params) => Some(open_state::<D>(
                options,
                config.output_device.as_deref(),
                Direction::Playback,
                params,
            )?),
            None => None,
        };

        let rec_nfr = capture
            .as_ref()
            .map(|(s, _)| comfortable_frames(s.dsp.as_ref(), s.frame_size()));
        let play_nfr = playback
            .as_ref()
            .map(|(s, _)| comfortable_frames(s.dsp.as_ref(), s.frame_size()));
        let nfr = match (play_nfr, rec_nfr) {
            (Some(p), Some(r)) => p.min(r),
            (Some(p), None) => p,
            (None, Some(r)) => r,
            (None, None) => options.default_nframes,
        };

        for (state, floating) in capture.iter_mut().chain(playback.iter_mut()) {
            state.buffer = DirectionBuffer::new(&state.info, *floating, nfr);
        }
        let capture = capture.map(|(s, _)| s);
        let playback = playback.map(|(s, _)| s);

        debug!("OSS stream block size {} frames", nfr);
        Ok(Self {
            shared: Arc::new(Shared::new()),
            playback: playback
                .as_ref()
                .map(|p| (Arc::clone(&p.dsp), p.frame_size())),
            input_info: capture.as_ref().map(|c| c.info),
            output_info: playback.as_ref().map(|p| p.info),
            devices: CurrentDevice {
                input_name: capture.as_ref().map(|c| c.name.clone()),
                output_name: playback.as_ref().map(|p| p.name.clone()),
            },
            core: Mutex::new(Some(IoCore {
                capture,
                playback,
                nfr,
                data_cb,
                state_cb,
            })),
            worker: Mutex::new(None),
            nfr,
        })
    }

    /// Frames exchanged with the callback per block.
    pub fn block_frames(&self) -> usize {
        self.nfr
    }

    pub fn input_info(&self) -> Option<StreamInfo> {
        self.input_info
    }

    pub fn output_info(&self) -> Option<StreamInfo> {
        self.output_info
    }

    /// Whether the worker thread is alive. A stream that drained or failed
    /// on its own reports `false` while still counting as started.
    pub fn is_active(&self) -> bool {
        lock(&self.worker)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished() && !self.shared.lock().finished)
    }

    fn reclaim(&self, handle: JoinHandle<Option<IoCore<D>>>) -> Result<()> {
        match handle.join() {
            Ok(Some(core)) => {
                *lock(&self.core) = Some(core);
                Ok(())
            }
            Ok(None) => Err(Error::Backend(
                "stream worker exited before receiving its state".to_owned(),
            )),
            Err(_) => {
                error!("OSS stream worker panicked");
                Err(Error::Backend("stream worker panicked".to_owned()))
            }
        }
    }
}

impl<D: DspDevice> StreamOps for Stream<D> {
    fn start(&self) -> Result<()> {
        let mut worker = lock(&self.worker);
        match worker.take() {
            Some(handle) if !handle.is_finished() && !self.shared.lock().finished => {
                *worker = Some(handle);
                return Ok(());
            }
            Some(handle) => self.reclaim(handle)?,
            None => {}
        }

        let Some(core) = lock(&self.core).take() else {
            return Err(Error::Backend("stream state is unavailable".to_owned()));
        };
        {
            let mut control = self.shared.lock();
            control.running = true;
            control.finished = false;
        }

        let (tx, rx) = mpsc::sync_channel::<IoCore<D>>(1);
        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || {
                let mut core = rx.recv().ok()?;
                core.run(&shared);
                Some(core)
            });

        match spawned {
            Ok(handle) => {
                if let Err(mpsc::SendError(core)) = tx.send(core) {
                    *lock(&self.core) = Some(core);
                    self.shared.lock().running = false;
                    let _ = handle.join();
                    return Err(Error::Backend(
                        "stream worker exited before receiving its state".to_owned(),
                    ));
                }
                *worker = Some(handle);
                debug!("OSS stream started");
                Ok(())
            }
            Err(e) => {
                self.shared.lock().running = false;
                *lock(&self.core) = Some(core);
                error!("OSS stream worker spawn failed: {}", e);
                Err(Error::Spawn(e))
            }
        }
    }

    fn stop(&self) -> Result<()> {
        let mut worker = lock(&self.worker);
        let was_running = std::mem::replace(&mut self.shared.lock().running, false);
        if !was_running {
            return Ok(());
        }
        match worker.take() {
            Some(handle) => {
                self.reclaim(handle)?;
                debug!("OSS stream stopped");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn position(&self) -> Result<u64> {
        Ok(self.shared.lock().frames_written)
    }

    fn latency(&self) -> Result<u32> {
        let Some((dsp, frame_size)) = &self.playback else {
            return Err(Error::Backend(
                "latency is only available for playback streams".to_owned(),
            ));
        };
        let delay = dsp
            .output_delay()
            .map_err(|e| Error::ioctl("SNDCTL_DSP_GETODELAY", e))?;
        Ok((delay.max(0) as usize / frame_size) as u32)
    }

    fn volume(&self) -> f32 {
        self.shared.lock().volume
    }

    fn set_volume(&self, volume: f32) -> Result<()> {
        self.shared.lock().volume = clamp_volume(volume);
        Ok(())
    }

    fn current_device(&self) -> Result<CurrentDevice> {
        Ok(self.devices.clone())
    }
}

impl<D: DspDevice> Drop for Stream<D> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("OSS stream teardown: {}", e);
        }
    }
}
