use crate::buffer::DirectionBuffer;
use crate::callback::{DataCallback, StateCallback};
use crate::params::{StreamInfo, StreamState};
use crate::traits::DspDevice;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, warn};

/// State shared by the control thread and the worker. Only the flag check,
/// the volume snapshot and the counter update happen under the lock.
#[derive(Debug)]
pub(crate) struct Control {
    pub(crate) running: bool,
    pub(crate) volume: f32,
    pub(crate) frames_written: u64,
    /// Set by the worker right before it reports its terminal state.
    pub(crate) finished: bool,
}

#[derive(Debug)]
pub(crate) struct Shared {
    control: Mutex<Control>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            control: Mutex::new(Control {
                running: false,
                volume: 1.0,
                frames_written: 0,
                finished: false,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One opened direction of a stream.
pub(crate) struct DirectionState<D> {
    pub(crate) name: String,
    pub(crate) dsp: Arc<D>,
    pub(crate) info: StreamInfo,
    pub(crate) buffer: DirectionBuffer,
}

impl<D> DirectionState<D> {
    pub(crate) fn frame_size(&self) -> usize {
        self.info.frame_size()
    }
}

/// Everything the I/O loop touches besides the shared control block. The
/// worker thread owns it while running and returns it when joined.
pub(crate) struct IoCore<D> {
    pub(crate) capture: Option<DirectionState<D>>,
    pub(crate) playback: Option<DirectionState<D>>,
    pub(crate) nfr: usize,
    pub(crate) data_cb: DataCallback,
    pub(crate) state_cb: StateCallback,
}

enum Block {
    Continue,
    Drain,
}

impl<D: DspDevice> IoCore<D> {
    /// Notifies `Started`, runs blocks until something ends the session and
    /// notifies exactly one terminal state.
    pub(crate) fn run(&mut self, shared: &Shared) {
        (self.state_cb)(StreamState::Started);
        let state = self.run_blocks(shared);
        shared.lock().finished = true;
        debug!("OSS stream worker finished: {:?}", state);
        (self.state_cb)(state);
    }

    fn run_blocks(&mut self, shared: &Shared) -> StreamState {
        loop {
            if !shared.lock().running {
                return StreamState::Stopped;
            }
            if self.capture.is_none() && self.playback.is_none() {
                return StreamState::Stopped;
            }
            match self.process_block(shared) {
                Ok(Block::Continue) => {}
                Ok(Block::Drain) => return StreamState::Drained,
                Err(state) => return state,
            }
        }
    }

    fn process_block(&mut self, shared: &Shared) -> Result<Block, StreamState> {
        let nfr = self.nfr;
        if let Some(capture) = self.capture.as_mut() {
            capture.buffer.decode_capture(nfr);
        }

        let input = self.capture.as_ref().map(|c| c.buffer.input_view());
        let output = self.playback.as_mut().map(|p| p.buffer.output_view());
        let produced = match (self.data_cb)(input, output, nfr) {
            Ok(frames) if frames > nfr => {
                warn!(
                    "OSS data callback returned {} frames for a block of {}",
                    frames, nfr
                );
                nfr
            }
            Ok(frames) => frames,
            Err(e) => {
                error!("OSS data callback error: {}", e);
                return Err(StreamState::Error);
            }
        };

        if let Some(playback) = self.playback.as_mut() {
            let volume = shared.lock().volume;
            playback.buffer.encode_playback(produced, volume);
        }

        let mut block = Block::Continue;
        if produced < nfr {
            if self.playback.is_some() {
                block = Block::Drain;
            } else {
                return Err(StreamState::Stopped);
            }
        }

        if let Err(e) = self.flush(shared, produced) {
            error!("OSS stream I/O error: {}", e);
            return Err(StreamState::Error);
        }
        Ok(block)
    }

    /// Writes `produced` playback frames and reads a full capture block,
    /// alternating between the two until both are done.
    fn flush(&mut self, shared: &Shared, produced: usize) -> std::io::Result<()> {
        let write_end = self
            .playback
            .as_ref()
            .map_or(0, |p| (produced * p.frame_size()).min(p.buffer.wire().len()));
        let read_end = self
            .capture
            .as_ref()
            .map_or(0, |c| (self.nfr * c.frame_size()).min(c.buffer.wire().len()));
        let mut write_ofs = 0;
        let mut read_ofs = 0;
        let mut credited = 0;

        while write_ofs < write_end || read_ofs < read_end {
            if write_ofs < write_end
                && let Some(playback) = self.playback.as_ref()
            {
                let n = playback
                    .dsp
                    .write(&playback.buffer.wire()[write_ofs..write_end])?;
                if n == 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        format!("{} accepted no bytes", playback.name),
                    ));
                }
                write_ofs = (write_ofs + n).min(write_end);
                let whole = write_ofs / playback.frame_size();
                if whole > credited {
                    shared.lock().frames_written += (whole - credited) as u64;
                    credited = whole;
                }
            }
            if read_ofs < read_end
                && let Some(capture) = self.capture.as_mut()
            {
                let n = capture
                    .dsp
                    .read(&mut capture.buffer.wire_mut()[read_ofs..read_end])?;
                if n == 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("{} returned no bytes", capture.name),
                    ));
                }
                read_ofs = (read_ofs + n).min(read_end);
            }
        }
        Ok(())
    }
}
