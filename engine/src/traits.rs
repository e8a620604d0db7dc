use crate::callback::{DataCallback, StateCallback};
use crate::devices::{DeviceCollection, DeviceType};
use crate::error::Result;
use crate::params::{CurrentDevice, Direction, StreamConfig, StreamParams};
use oss_duplex_sys::BufferInfo;

/// A DSP node as the engine uses it: parameter ioctls plus blocking I/O.
///
/// Every method takes `&self` so a playback handle can be queried for its
/// output delay while the worker is blocked writing to it.
pub trait DspDevice: Send + Sync + Sized + 'static {
    /// Opens `path` read-only for capture or write-only for playback.
    fn open(path: &str, direction: Direction) -> std::io::Result<Self>;
    fn set_format(&self, format: &mut u32) -> std::io::Result<()>;
    fn set_channels(&self, channels: &mut i32) -> std::io::Result<()>;
    fn set_speed(&self, rate: &mut i32) -> std::io::Result<()>;
    /// GETISPACE or GETOSPACE depending on how the node was opened.
    fn buffer_space(&self) -> std::io::Result<BufferInfo>;
    /// Bytes queued for playback.
    fn output_delay(&self) -> std::io::Result<i32>;
    fn read(&self, dst: &mut [u8]) -> std::io::Result<usize>;
    fn write(&self, src: &[u8]) -> std::io::Result<usize>;
}

/// Control surface of an open stream.
pub trait StreamOps {
    fn start(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
    /// Frames handed to the playback device since the stream was opened.
    fn position(&self) -> Result<u64>;
    /// Playback latency in frames.
    fn latency(&self) -> Result<u32>;
    fn volume(&self) -> f32;
    fn set_volume(&self, volume: f32) -> Result<()>;
    fn current_device(&self) -> Result<CurrentDevice>;
}

/// Context-level entry points of an audio backend.
pub trait Backend {
    type Stream: StreamOps;

    fn backend_id(&self) -> &'static str;
    fn max_channel_count(&self) -> Result<u32>;
    fn min_latency(&self, params: &StreamParams) -> Result<u32>;
    fn preferred_sample_rate(&self) -> Result<u32>;
    fn enumerate_devices(&self, device_type: DeviceType) -> Result<DeviceCollection>;
    fn device_collection_destroy(&self, collection: DeviceCollection);
    fn stream_init(
        &self,
        config: StreamConfig,
        data_cb: DataCallback,
        state_cb: StateCallback,
    ) -> Result<Self::Stream>;
}
