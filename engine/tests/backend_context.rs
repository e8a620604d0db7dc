//! Context-level operations of the OSS backend with a canned device catalog.

mod common;

use common::{FakeDsp, FakeSpec, States, register};
use oss_duplex_engine::devices::{DeviceCatalog, DeviceIdInterner, devices_from_sndstat};
use oss_duplex_engine::{
    Backend, DeviceInfo, DeviceType, Direction, OssContext, OssOptions, Result, SampleFormat,
    StreamConfig, StreamOps, StreamParams, StreamState, data_callback,
};
use std::sync::Arc;

struct CannedCatalog;

const SNDSTAT: &str = "\
Installed devices:
pcm0: <Speakers> (play) default
pcm1: <Headset> (play/rec)
";

impl DeviceCatalog for CannedCatalog {
    fn enumerate(
        &self,
        device_type: DeviceType,
        interner: &DeviceIdInterner,
    ) -> Result<Vec<DeviceInfo>> {
        Ok(devices_from_sndstat(
            SNDSTAT,
            Some(0),
            device_type,
            48000,
            interner,
            |_path: &str, _dir: Direction| Some(Default::default()),
        ))
    }
}

fn context() -> OssContext<FakeDsp, CannedCatalog> {
    OssContext::with_catalog(OssOptions::default(), CannedCatalog)
}

#[test]
fn reports_static_capabilities() {
    let ctx = context();
    assert_eq!(ctx.backend_id(), "oss");
    assert_eq!(ctx.preferred_sample_rate().unwrap(), 48000);
    assert_eq!(
        ctx.max_channel_count().unwrap(),
        oss_duplex_engine::config::MAX_CHANNELS
    );
    let params = StreamParams::new(SampleFormat::S16LE, 48000, 2);
    assert_eq!(ctx.min_latency(&params).unwrap(), 1920);
    let params = StreamParams::new(SampleFormat::S16LE, 44100, 2);
    assert_eq!(ctx.min_latency(&params).unwrap(), 1764);
}

#[test]
fn enumeration_keeps_ids_stable() {
    let ctx = context();
    let outputs = ctx.enumerate_devices(DeviceType::Output).unwrap();
    assert_eq!(outputs.len(), 2);
    let first = outputs.iter().next().unwrap();
    assert_eq!(first.friendly_name, "Speakers");
    assert!(first.preferred);

    let inputs = ctx.enumerate_devices(DeviceType::Input).unwrap();
    let headset = inputs.iter().next().unwrap();
    assert_eq!(&*headset.devid, "/dev/dsp1");

    let again = ctx.enumerate_devices(DeviceType::Output).unwrap();
    let headset_out = again.iter().find(|d| d.device_id == "/dev/dsp1").unwrap();
    assert!(Arc::ptr_eq(&headset.devid, &headset_out.devid));

    ctx.device_collection_destroy(outputs);
    ctx.device_collection_destroy(again);
    assert_eq!(&*headset.devid, "/dev/dsp1");
}

#[test]
fn stream_init_uses_default_device() {
    register("/fake/ctx-default", FakeSpec::default());
    let options = OssOptions {
        default_device: "/fake/ctx-default".to_owned(),
        ..OssOptions::default()
    };
    let ctx: OssContext<FakeDsp, CannedCatalog> = OssContext::with_catalog(options, CannedCatalog);
    let (states, state_cb) = States::new();
    let config = StreamConfig {
        name: Some("ctx test".to_owned()),
        output: Some(StreamParams::new(SampleFormat::S16LE, 48000, 2)),
        latency_frames: 512,
        ..StreamConfig::default()
    };
    let stream = ctx
        .stream_init(config, data_callback(|_, _, _| Ok(0)), state_cb)
        .unwrap();
    assert_eq!(
        stream.current_device().unwrap().output_name.as_deref(),
        Some("/fake/ctx-default")
    );
    stream.start().unwrap();
    assert_eq!(states.next(), Some(StreamState::Started));
    assert_eq!(states.next(), Some(StreamState::Drained));
}
