use crate::callback::{DataCallback, StateCallback};
use crate::config::OssOptions;
use crate::devices::{DeviceCatalog, DeviceCollection, DeviceIdInterner, DeviceType, SystemCatalog};
use crate::error::Result;
use crate::params::{StreamConfig, StreamParams};
use crate::stream::Stream;
use crate::traits::{Backend, DspDevice};
use std::marker::PhantomData;
use tracing::debug;

pub const BACKEND_ID: &str = "oss";

/// The OSS backend context: options, the device catalog and the device ids
/// it has handed out.
pub struct OssContext<D: DspDevice, C: DeviceCatalog = SystemCatalog> {
    options: OssOptions,
    catalog: C,
    devids: DeviceIdInterner,
    _device: PhantomData<fn() -> D>,
}

impl<D: DspDevice, C: DeviceCatalog> std::fmt::Debug for OssContext<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssContext")
            .field("options", &self.options)
            .field("devids", &self.devids.len())
            .finish_non_exhaustive()
    }
}

impl<D: DspDevice> OssContext<D, SystemCatalog> {
    pub fn new(options: OssOptions) -> Self {
        let catalog = SystemCatalog::new(&options);
        Self::with_catalog(options, catalog)
    }
}

impl<D: DspDevice, C: DeviceCatalog> OssContext<D, C> {
    pub fn with_catalog(options: OssOptions, catalog: C) -> Self {
        Self {
            options,
            catalog,
            devids: DeviceIdInterner::new(),
            _device: PhantomData,
        }
    }

    pub fn options(&self) -> &OssOptions {
        &self.options
    }
}

impl<D: DspDevice, C: DeviceCatalog> Backend for OssContext<D, C> {
    type Stream = Stream<D>;

    fn backend_id(&self) -> &'static str {
        BACKEND_ID
    }

    fn max_channel_count(&self) -> Result<u32> {
        Ok(self.options.max_channels)
    }

    fn min_latency(&self, params: &StreamParams) -> Result<u32> {
        Ok((u64::from(self.options.latency_ms) * u64::from(params.rate) / 1000) as u32)
    }

    fn preferred_sample_rate(&self) -> Result<u32> {
        Ok(self.options.preferred_rate)
    }

    fn enumerate_devices(&self, device_type: DeviceType) -> Result<DeviceCollection> {
        let devices = self.catalog.enumerate(device_type, &self.devids)?;
        debug!("OSS enumerated {} {:?} devices", devices.len(), device_type);
        Ok(DeviceCollection::from(devices))
    }

    fn device_collection_destroy(&self, collection: DeviceCollection) {
        drop(collection);
    }

    fn stream_init(
        &self,
        config: StreamConfig,
        data_cb: DataCallback,
        state_cb: StateCallback,
    ) -> Result<Self::Stream> {
        Stream::open(&self.options, config, data_cb, state_cb)
    }
}

pub type OssBackend = OssContext<oss_duplex_sys::Dsp>;
pub type OssStream = Stream<oss_duplex_sys::Dsp>;
