pub mod backend;
pub mod buffer;
pub mod callback;
pub mod config;
pub mod convert;
pub mod devices;
mod dsp;
pub mod error;
mod negotiate;
pub mod params;
pub mod stream;
pub mod traits;
mod worker;

pub use backend::{BACKEND_ID, OssBackend, OssContext, OssStream};
pub use buffer::{InputBuffer, OutputBuffer};
pub use callback::{DataCallback, StateCallback, data_callback, forward_state, state_callback};
pub use config::OssOptions;
pub use devices::{DeviceCollection, DeviceInfo, DeviceType};
pub use error::{Error, Result};
pub use params::{
    CurrentDevice, Direction, SampleFormat, StreamConfig, StreamInfo, StreamParams, StreamPrefs,
    StreamState,
};
pub use stream::Stream;
pub use traits::{Backend, DspDevice, StreamOps};

/// Backend context for the system's OSS devices, configured from the
/// environment.
pub fn init() -> OssBackend {
    OssContext::new(OssOptions::from_env())
}
