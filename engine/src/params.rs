use serde::{Deserialize, Serialize};

/// Sample encodings a client can ask for at the callback boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    S16LE,
    S16BE,
    Float32LE,
    Float32BE,
}

impl SampleFormat {
    #[cfg(target_endian = "little")]
    pub const S16NE: SampleFormat = SampleFormat::S16LE;
    #[cfg(target_endian = "big")]
    pub const S16NE: SampleFormat = SampleFormat::S16BE;
    #[cfg(target_endian = "little")]
    pub const FLOAT32NE: SampleFormat = SampleFormat::Float32LE;
    #[cfg(target_endian = "big")]
    pub const FLOAT32NE: SampleFormat = SampleFormat::Float32BE;

    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::Float32LE | SampleFormat::Float32BE)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPrefs(u32);

impl StreamPrefs {
    pub const NONE: StreamPrefs = StreamPrefs(0);
    pub const LOOPBACK: StreamPrefs = StreamPrefs(0x01);

    pub fn contains(self, other: StreamPrefs) -> bool {
        other.0 != 0 && (self.0 & other.0) == other.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamParams {
    pub format: SampleFormat,
    pub rate: u32,
    pub channels: u32,
    #[serde(default)]
    pub prefs: StreamPrefs,
}

impl StreamParams {
    pub fn new(format: SampleFormat, rate: u32, channels: u32) -> Self {
        Self {
            format,
            rate,
            channels,
            prefs: StreamPrefs::NONE,
        }
    }
}

/// Everything needed to build a stream apart from the two callbacks.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    pub name: Option<String>,
    pub input_device: Option<String>,
    pub input: Option<StreamParams>,
    pub output_device: Option<String>,
    pub output: Option<StreamParams>,
    /// Advisory only.
    pub latency_frames: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Capture,
    Playback,
}

impl Direction {
    pub fn is_input(self) -> bool {
        self == Direction::Capture
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Capture => "record",
            Direction::Playback => "play",
        }
    }
}

/// What the device agreed to after SETFMT/CHANNELS/SPEED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub channels: u32,
    pub sample_rate: u32,
    pub format: u32,
    pub precision: u32,
}

impl StreamInfo {
    pub fn frame_size(&self) -> usize {
        self.channels as usize * (self.precision as usize / 8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamState {
    Started,
    Stopped,
    Drained,
    Error,
}

/// Device names bound to a stream; only opened directions are reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrentDevice {
    pub input_name: Option<String>,
    pub output_name: Option<String>,
}
