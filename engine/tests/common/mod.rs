//! Scripted in-memory DSP nodes for driving streams without hardware.
//!
//! Tests register a node under a unique path, then open streams on it with
//! `Stream::<FakeDsp>::open`. Every node records what the engine did to it.
#![allow(dead_code)]

use oss_duplex_engine::{Direction, DspDevice, StreamState};
use oss_duplex_sys::BufferInfo;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, mpsc};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeSpec {
    pub coerce_channels: Option<i32>,
    pub coerce_rate: Option<i32>,
    pub buffer: Option<BufferInfo>,
    pub odelay: i32,
    /// Largest number of bytes accepted or returned by one call.
    pub max_chunk: Option<usize>,
    /// Successful writes before every further write fails.
    pub fail_write_after: Option<usize>,
    /// Successful reads before every further read fails.
    pub fail_read_after: Option<usize>,
    pub capture_byte: u8,
    pub io_delay: Duration,
}

impl Default for FakeSpec {
    fn default() -> Self {
        Self {
            coerce_channels: None,
            coerce_rate: None,
            buffer: None,
            odelay: 0,
            max_chunk: None,
            fail_write_after: None,
            fail_read_after: None,
            capture_byte: 0,
            io_delay: Duration::from_millis(1),
        }
    }
}

/// Buffer geometry that yields `frames` comfortable frames at `frame_size`.
pub fn geometry(frames: usize, frame_size: usize) -> Option<BufferInfo> {
    let bytes = (frames * frame_size) as i32;
    Some(BufferInfo {
        fragments: 4,
        fragstotal: 4,
        fragsize: bytes / 4,
        bytes,
    })
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub spec: FakeSpec,
    pub written: Mutex<Vec<u8>>,
    pub ioctls: Mutex<Vec<&'static str>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub writes: AtomicUsize,
    pub reads: AtomicUsize,
    pub read_bytes: AtomicUsize,
}

impl FakeState {
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn open_handles(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }
}

fn registry() -> &'static Mutex<HashMap<String, Arc<FakeState>>> {
    static DEVICES: OnceLock<Mutex<HashMap<String, Arc<FakeState>>>> = OnceLock::new();
    DEVICES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Routes engine logs through the test harness output capture.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn register(path: &str, spec: FakeSpec) -> Arc<FakeState> {
    init_tracing();
    let state = Arc::new(FakeState {
        spec,
        ..FakeState::default()
    });
    registry()
        .lock()
        .unwrap()
        .insert(path.to_owned(), Arc::clone(&state));
    state
}

#[derive(Debug)]
pub struct FakeDsp {
    state: Arc<FakeState>,
    direction: Direction,
}

impl FakeDsp {
    fn chunk(&self, len: usize) -> usize {
        self.state.spec.max_chunk.map_or(len, |max| len.min(max))
    }
}

impl DspDevice for FakeDsp {
    fn open(path: &str, direction: Direction) -> std::io::Result<Self> {
        let state = registry()
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Self { state, direction })
    }

    fn set_format(&self, _format: &mut u32) -> std::io::Result<()> {
        self.state.ioctls.lock().unwrap().push("SETFMT");
        Ok(())
    }

    fn set_channels(&self, channels: &mut i32) -> std::io::Result<()> {
        self.state.ioctls.lock().unwrap().push("CHANNELS");
        if let Some(c) = self.state.spec.coerce_channels {
            *channels = c;
        }
        Ok(())
    }

    fn set_speed(&self, rate: &mut i32) -> std::io::Result<()> {
        self.state.ioctls.lock().unwrap().push("SPEED");
        if let Some(r) = self.state.spec.coerce_rate {
            *rate = r;
        }
        Ok(())
    }

    fn buffer_space(&self) -> std::io::Result<BufferInfo> {
        self.state
            .spec
            .buffer
            .ok_or_else(|| std::io::Error::from_raw_os_error(25))
    }

    fn output_delay(&self) -> std::io::Result<i32> {
        if self.direction == Direction::Playback {
            Ok(self.state.spec.odelay)
        } else {
            Err(std::io::Error::from_raw_os_error(22))
        }
    }

    fn read(&self, dst: &mut [u8]) -> std::io::Result<usize> {
        std::thread::sleep(self.state.spec.io_delay);
        let done = self.state.reads.fetch_add(1, Ordering::SeqCst);
        if self
            .state
            .spec
            .fail_read_after
            .is_some_and(|limit| done >= limit)
        {
            return Err(std::io::Error::from_raw_os_error(5));
        }
        let n = self.chunk(dst.len());
        dst[..n].fill(self.state.spec.capture_byte);
        self.state.read_bytes.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }

    fn write(&self, src: &[u8]) -> std::io::Result<usize> {
        std::thread::sleep(self.state.spec.io_delay);
        let done = self.state.writes.fetch_add(1, Ordering::SeqCst);
        if self
            .state
            .spec
            .fail_write_after
            .is_some_and(|limit| done >= limit)
        {
            return Err(std::io::Error::from_raw_os_error(5));
        }
        let n = self.chunk(src.len());
        self.state
            .written
            .lock()
            .unwrap()
            .extend_from_slice(&src[..n]);
        Ok(n)
    }
}

impl Drop for FakeDsp {
    fn drop(&mut self) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// State notifications collected through a channel.
pub struct States {
    rx: mpsc::Receiver<StreamState>,
}

impl States {
    pub fn new() -> (Self, oss_duplex_engine::StateCallback) {
        let (tx, rx) = mpsc::channel();
        let cb = oss_duplex_engine::state_callback(move |state| {
            let _ = tx.send(state);
        });
        (Self { rx }, cb)
    }

    pub fn next(&self) -> Option<StreamState> {
        self.rx.recv_timeout(Duration::from_secs(5)).ok()
    }

    pub fn pending(&self) -> Vec<StreamState> {
        self.rx.try_iter().collect()
    }
}
