use crate::error::{Error, Result};
use crate::params::{Direction, SampleFormat, StreamInfo, StreamParams, StreamPrefs};
use crate::traits::DspDevice;
use oss_duplex_sys::{AFMT_S16_BE, AFMT_S16_LE, AFMT_S32_NE, DEVNODE_LEN, bits_per_sample};
use tracing::debug;

/// An opened device node with the parameters it agreed to.
#[derive(Debug)]
pub(crate) struct Negotiated<D> {
    pub(crate) dsp: D,
    pub(crate) info: StreamInfo,
    pub(crate) floating: bool,
}

/// AFMT token and container width for a callback encoding.
pub(crate) fn wire_format(format: SampleFormat) -> Result<(u32, u32)> {
    let token = match format {
        SampleFormat::S16LE => AFMT_S16_LE,
        SampleFormat::S16BE => AFMT_S16_BE,
        f if f == SampleFormat::FLOAT32NE => AFMT_S32_NE,
        _ => return Err(Error::InvalidFormat(format)),
    };
    let precision = bits_per_sample(token).ok_or(Error::InvalidFormat(format))?;
    Ok((token, precision))
}

pub(crate) fn open_direction<D: DspDevice>(
    path: &str,
    direction: Direction,
    params: &StreamParams,
) -> Result<Negotiated<D>> {
    if params.prefs.contains(StreamPrefs::LOOPBACK) {
        return Err(Error::NotSupported("loopback capture"));
    }
    let (mut format, precision) = wire_format(params.format)?;

    if path.len() >= DEVNODE_LEN {
        return Err(Error::DeviceUnavailable {
            path: path.to_owned(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("device path longer than {} bytes", DEVNODE_LEN - 1),
            ),
        });
    }
    let dsp = D::open(path, direction).map_err(|source| Error::DeviceUnavailable {
        path: path.to_owned(),
        source,
    })?;

    dsp.set_format(&mut format)
        .map_err(|e| Error::ioctl("SNDCTL_DSP_SETFMT", e))?;
    let mut channels = params.channels as i32;
    dsp.set_channels(&mut channels)
        .map_err(|e| Error::ioctl("SNDCTL_DSP_CHANNELS", e))?;
    let mut rate = params.rate as i32;
    dsp.set_speed(&mut rate)
        .map_err(|e| Error::ioctl("SNDCTL_DSP_SPEED", e))?;

    if channels < 1 {
        return Err(Error::Backend(format!(
            "{path} reported {channels} channels"
        )));
    }
    debug!(
        "OSS {} {}: format {:#x} channels {} rate {}",
        direction.label(),
        path,
        format,
        channels,
        rate
    );

    Ok(Negotiated {
        dsp,
        info: StreamInfo {
            channels: channels as u32,
            sample_rate: rate.max(0) as u32,
            format,
            precision,
        },
        floating: params.format.is_float(),
    })
}

/// Frames the device can buffer in one go, never less than one.
pub(crate) fn comfortable_frames<D: DspDevice>(dsp: &D, frame_size: usize) -> usize {
    if frame_size == 0 {
        return 1;
    }
    match dsp.buffer_space() {
        Ok(info) => {
            let bytes = info.fragstotal.max(0) as usize * info.fragsize.max(0) as usize;
            (bytes / frame_size).max(1)
        }
        Err(e) => {
            debug!("OSS buffer space query failed: {}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oss_duplex_sys::BufferInfo;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Probe {
        calls: Mutex<Vec<&'static str>>,
        fail_on: Option<&'static str>,
        channels: Option<i32>,
        space: Option<BufferInfo>,
    }

    impl Probe {
        fn record(&self, op: &'static str) -> std::io::Result<()> {
            self.calls.lock().unwrap().push(op);
            if self.fail_on == Some(op) {
                Err(std::io::Error::from_raw_os_error(22))
            } else {
                Ok(())
            }
        }
    }

    impl DspDevice for Probe {
        fn open(path: &str, _direction: Direction) -> std::io::Result<Self> {
            match path {
                "/dev/missing" => Err(std::io::ErrorKind::NotFound.into()),
                "/dev/badfmt" => Ok(Probe {
                    fail_on: Some("fmt"),
                    ..Probe::default()
                }),
                "/dev/badspeed" => Ok(Probe {
                    fail_on: Some("speed"),
                    ..Probe::default()
                }),
                "/dev/mono" => Ok(Probe {
                    channels: Some(1),
                    ..Probe::default()
                }),
                _ => Ok(Probe::default()),
            }
        }

        fn set_format(&self, _format: &mut u32) -> std::io::Result<()> {
            self.record("fmt")
        }

        fn set_channels(&self, channels: &mut i32) -> std::io::Result<()> {
            if let Some(c) = self.channels {
                *channels = c;
            }
            self.record("channels")
        }

        fn set_speed(&self, _rate: &mut i32) -> std::io::Result<()> {
            self.record("speed")
        }

        fn buffer_space(&self) -> std::io::Result<BufferInfo> {
            self.space
                .ok_or_else(|| std::io::Error::from_raw_os_error(25))
        }

        fn output_delay(&self) -> std::io::Result<i32> {
            Ok(0)
        }

        fn read(&self, dst: &mut [u8]) -> std::io::Result<usize> {
            Ok(dst.len())
        }

        fn write(&self, src: &[u8]) -> std::io::Result<usize> {
            Ok(src.len())
        }
    }

    fn params(format: SampleFormat) -> StreamParams {
        StreamParams::new(format, 48000, 2)
    }

    #[test]
    fn ioctls_run_in_fixed_order() {
        let n: Negotiated<Probe> =
            open_direction("/dev/dsp", Direction::Playback, &params(SampleFormat::S16LE)).unwrap();
        assert_eq!(*n.dsp.calls.lock().unwrap(), ["fmt", "channels", "speed"]);
        assert_eq!(n.info.format, AFMT_S16_LE);
        assert_eq!(n.info.precision, 16);
        assert_eq!(n.info.frame_size(), 4);
        assert!(!n.floating);
    }

    #[test]
    fn native_float_uses_32_bit_container() {
        let n: Negotiated<Probe> =
            open_direction("/dev/dsp", Direction::Capture, &params(SampleFormat::FLOAT32NE))
                .unwrap();
        assert_eq!(n.info.format, AFMT_S32_NE);
        assert_eq!(n.info.frame_size(), 8);
        assert!(n.floating);
    }

    #[test]
    fn precision_follows_the_wire_token() {
        assert_eq!(wire_format(SampleFormat::S16LE).unwrap(), (AFMT_S16_LE, 16));
        assert_eq!(wire_format(SampleFormat::S16BE).unwrap(), (AFMT_S16_BE, 16));
        assert_eq!(wire_format(SampleFormat::FLOAT32NE).unwrap(), (AFMT_S32_NE, 32));
    }

    #[test]
    fn coerced_channels_are_kept() {
        let n: Negotiated<Probe> =
            open_direction("/dev/mono", Direction::Playback, &params(SampleFormat::S16BE)).unwrap();
        assert_eq!(n.info.channels, 1);
        assert_eq!(n.info.frame_size(), 2);
    }

    #[test]
    fn foreign_float_is_rejected() {
        #[cfg(target_endian = "little")]
        let foreign = SampleFormat::Float32BE;
        #[cfg(target_endian = "big")]
        let foreign = SampleFormat::Float32LE;
        let err = open_direction::<Probe>("/dev/missing", Direction::Playback, &params(foreign))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(f) if f == foreign));
    }

    #[test]
    fn loopback_is_not_supported() {
        let mut p = params(SampleFormat::S16LE);
        p.prefs = StreamPrefs::LOOPBACK;
        let err = open_direction::<Probe>("/dev/dsp", Direction::Capture, &p).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[test]
    fn open_and_ioctl_failures_map_to_their_codes() {
        let p = params(SampleFormat::S16LE);
        let err = open_direction::<Probe>("/dev/missing", Direction::Capture, &p).unwrap_err();
        assert!(matches!(err, Error::DeviceUnavailable { .. }));
        assert!(!err.is_generic());

        let err = open_direction::<Probe>("/dev/badfmt", Direction::Capture, &p).unwrap_err();
        assert!(matches!(err, Error::Ioctl { op: "SNDCTL_DSP_SETFMT", .. }));
        assert!(err.is_generic());

        let err = open_direction::<Probe>("/dev/badspeed", Direction::Capture, &p).unwrap_err();
        assert!(matches!(err, Error::Ioctl { op: "SNDCTL_DSP_SPEED", .. }));
    }

    #[test]
    fn overlong_path_is_unavailable() {
        let path = format!("/dev/{}", "d".repeat(40));
        let err = open_direction::<Probe>(&path, Direction::Playback, &params(SampleFormat::S16LE))
            .unwrap_err();
        assert!(matches!(err, Error::DeviceUnavailable { .. }));
    }

    #[test]
    fn comfortable_frames_from_buffer_space() {
        let dsp = Probe {
            space: Some(BufferInfo {
                fragments: 4,
                fragstotal: 4,
                fragsize: 2048,
                bytes: 8192,
            }),
            ..Probe::default()
        };
        assert_eq!(comfortable_frames(&dsp, 4), 2048);
        assert_eq!(comfortable_frames(&dsp, 16384), 1);
        assert_eq!(comfortable_frames(&Probe::default(), 4), 1);
    }
}
