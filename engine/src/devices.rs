//! Device discovery.
//!
//! FreeBSD does not expose directly usable device nodes through
//! `SNDCTL_AUDIOINFO`, so there the catalog is read from `/dev/sndstat` and
//! every candidate is probe-opened. Other OSS implementations walk the audio
//! engines through the mixer's `SNDCTL_SYSINFO`.

use crate::config::OssOptions;
use crate::error::{Error, Result};
use crate::params::{Direction, SampleFormat};
use oss_duplex_sys::{AudioInfo, DEVNODE_LEN, PCM_CAP_INPUT, PCM_CAP_OUTPUT, cstr_fixed_prefix};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

pub const SNDSTAT_PATH: &str = "/dev/sndstat";
const SNDSTAT_BEGIN: &str = "Installed devices:";
const SNDSTAT_USER_BEGIN: &str = "Installed devices from userspace:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Input,
    Output,
    All,
}

impl DeviceType {
    pub fn includes_input(self) -> bool {
        matches!(self, DeviceType::Input | DeviceType::All)
    }

    pub fn includes_output(self) -> bool {
        matches!(self, DeviceType::Output | DeviceType::All)
    }

    /// Direction a node is opened in to probe it for this type.
    fn probe_direction(self) -> Direction {
        if self == DeviceType::Input {
            Direction::Capture
        } else {
            Direction::Playback
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub devid: Arc<str>,
    pub device_id: String,
    pub friendly_name: String,
    pub group_id: String,
    pub vendor_name: Option<String>,
    pub device_type: DeviceType,
    pub state: DeviceState,
    pub preferred: bool,
    pub format: SampleFormat,
    pub default_format: SampleFormat,
    pub max_channels: u32,
    pub default_rate: u32,
    pub max_rate: u32,
    pub min_rate: u32,
    pub latency_lo: u32,
    pub latency_hi: u32,
}

/// Devices returned by one enumeration, released together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceCollection {
    devices: Vec<DeviceInfo>,
}

impl DeviceCollection {
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceInfo> {
        self.devices.iter()
    }
}

impl From<Vec<DeviceInfo>> for DeviceCollection {
    fn from(devices: Vec<DeviceInfo>) -> Self {
        Self { devices }
    }
}

impl IntoIterator for DeviceCollection {
    type Item = DeviceInfo;
    type IntoIter = std::vec::IntoIter<DeviceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_iter()
    }
}

impl<'a> IntoIterator for &'a DeviceCollection {
    type Item = &'a DeviceInfo;
    type IntoIter = std::slice::Iter<'a, DeviceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}

/// Keeps one shared copy of every device id handed out, so ids stay valid
/// and comparable for the lifetime of the context.
#[derive(Debug, Default)]
pub struct DeviceIdInterner {
    ids: Mutex<HashSet<Arc<str>>>,
}

impl DeviceIdInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, id: &str) -> Arc<str> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = ids.get(id) {
            return Arc::clone(existing);
        }
        let id: Arc<str> = Arc::from(id);
        ids.insert(Arc::clone(&id));
        id
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One usable line of `/dev/sndstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SndstatEntry {
    pub devnode: String,
    pub description: String,
    pub play: bool,
    pub rec: bool,
    pub preferred: bool,
}

fn between(s: &str, open: char, close: char) -> Option<(&str, &str)> {
    let start = s.find(open)? + open.len_utf8();
    let len = s[start..].find(close)?;
    Some((&s[start..start + len], &s[start + len + close.len_utf8()..]))
}

fn kernel_unit(head: &str) -> Option<u32> {
    let digits = head.trim_start().strip_prefix("pcm")?;
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

/// Parses the device sections of FreeBSD's `/dev/sndstat`.
///
/// Kernel devices (`pcmN: <desc> ... (play/rec)`) map to `/dev/dspN` and are
/// preferred when `N` is the default unit. Userspace devices
/// (`name: <desc> ... (play)`) map to `/dev/name`.
pub fn parse_sndstat(text: &str, default_unit: Option<u32>) -> Vec<SndstatEntry> {
    let mut userspace = false;
    let mut entries = Vec::new();
    for line in text.lines() {
        if line.starts_with(SNDSTAT_BEGIN) {
            userspace = false;
            continue;
        }
        if line.starts_with(SNDSTAT_USER_BEGIN) {
            userspace = true;
            continue;
        }
        let Some(colon) = line.find(':') else {
            continue;
        };
        let head = &line[..colon];
        let (devnode, preferred) = if userspace {
            if head.len() >= DEVNODE_LEN - "/dev/".len() {
                continue;
            }
            (format!("/dev/{head}"), false)
        } else {
            let Some(unit) = kernel_unit(head) else {
                continue;
            };
            (format!("/dev/dsp{unit}"), Some(unit) == default_unit)
        };

        let Some((description, rest)) = between(&line[colon + 1..], '<', '>') else {
            continue;
        };
        let Some((playrec, _)) = between(rest, '(', ')') else {
            continue;
        };
        entries.push(SndstatEntry {
            devnode,
            description: description.to_owned(),
            play: playrec.contains("play"),
            rec: playrec.contains("rec"),
            preferred,
        });
    }
    entries
}

/// Single-direction devices are only listed for a request of that
/// direction; duplex devices are listed for any request.
fn capability_matches(play: bool, rec: bool, requested: DeviceType) -> bool {
    match (play, rec) {
        (true, true) => true,
        (false, true) => !requested.includes_output(),
        (true, false) => !requested.includes_input(),
        (false, false) => false,
    }
}

/// Limits reported by an `SNDCTL_AUDIOINFO` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeInfo {
    pub min_rate: u32,
    pub max_rate: u32,
    pub max_channels: u32,
}

impl From<&AudioInfo> for ProbeInfo {
    fn from(ai: &AudioInfo) -> Self {
        Self {
            min_rate: ai.min_rate.max(0) as u32,
            max_rate: ai.max_rate.max(0) as u32,
            max_channels: ai.max_channels.max(0) as u32,
        }
    }
}

/// `devnode` becomes the interned `devid`; `id` is the displayed device id.
struct Descriptor<'a> {
    devnode: &'a str,
    id: &'a str,
    name: &'a str,
    group: &'a str,
    preferred: bool,
    probe: ProbeInfo,
}

fn device_info(
    d: Descriptor<'_>,
    device_type: DeviceType,
    default_rate: u32,
    interner: &DeviceIdInterner,
) -> DeviceInfo {
    DeviceInfo {
        devid: interner.intern(d.devnode),
        device_id: d.id.to_owned(),
        friendly_name: d.name.to_owned(),
        group_id: d.group.to_owned(),
        vendor_name: None,
        device_type,
        state: DeviceState::Enabled,
        preferred: d.preferred,
        format: SampleFormat::S16NE,
        default_format: SampleFormat::S16NE,
        max_channels: d.probe.max_channels,
        default_rate,
        max_rate: d.probe.max_rate,
        min_rate: d.probe.min_rate,
        latency_lo: 0,
        latency_hi: 0,
    }
}

/// Builds descriptors from sndstat text. `probe` opens a node in the given
/// direction and returns its limits, or `None` when it is not usable.
pub fn devices_from_sndstat(
    text: &str,
    default_unit: Option<u32>,
    device_type: DeviceType,
    default_rate: u32,
    interner: &DeviceIdInterner,
    probe: impl Fn(&str, Direction) -> Option<ProbeInfo>,
) -> Vec<DeviceInfo> {
    parse_sndstat(text, default_unit)
        .into_iter()
        .filter(|e| capability_matches(e.play, e.rec, device_type))
        .filter_map(|e| {
            let Some(info) = probe(&e.devnode, device_type.probe_direction()) else {
                debug!("OSS probe of {} failed, skipping", e.devnode);
                return None;
            };
            Some(device_info(
                Descriptor {
                    devnode: &e.devnode,
                    id: &e.devnode,
                    name: &e.description,
                    group: &e.devnode,
                    preferred: e.preferred,
                    probe: info,
                },
                device_type,
                default_rate,
                interner,
            ))
        })
        .collect()
}

/// Builds descriptors from the per-engine `SNDCTL_AUDIOINFO` records of a
/// mixer walk, skipping disabled engines.
pub fn devices_from_engines(
    engines: &[AudioInfo],
    device_type: DeviceType,
    default_rate: u32,
    interner: &DeviceIdInterner,
) -> Vec<DeviceInfo> {
    engines
        .iter()
        .filter(|ai| ai.enabled != 0)
        .filter(|ai| {
            capability_matches(
                ai.caps & PCM_CAP_OUTPUT != 0,
                ai.caps & PCM_CAP_INPUT != 0,
                device_type,
            )
        })
        .map(|ai| {
            let devnode = cstr_fixed_prefix(&ai.devnode);
            let name = cstr_fixed_prefix(&ai.name);
            device_info(
                Descriptor {
                    devnode: &devnode,
                    id: &name,
                    name: &name,
                    group: &name,
                    preferred: false,
                    probe: ProbeInfo::from(ai),
                },
                device_type,
                default_rate,
                interner,
            )
        })
        .collect()
}

/// Source of device descriptors for a context.
pub trait DeviceCatalog: Send + Sync {
    fn enumerate(
        &self,
        device_type: DeviceType,
        interner: &DeviceIdInterner,
    ) -> Result<Vec<DeviceInfo>>;
}

/// Enumerates the devices of the running system.
#[derive(Debug, Clone)]
pub struct SystemCatalog {
    mixer: String,
    default_rate: u32,
}

impl SystemCatalog {
    pub fn new(options: &OssOptions) -> Self {
        Self {
            mixer: options.default_mixer.clone(),
            default_rate: options.preferred_rate,
        }
    }
}

#[cfg(target_os = "freebsd")]
fn probe_dsp(path: &str, direction: Direction) -> Option<ProbeInfo> {
    let dsp = oss_duplex_sys::Dsp::open(path, direction.is_input()).ok()?;
    let ai = dsp.audio_info().ok()?;
    Some(ProbeInfo::from(&ai))
}

impl DeviceCatalog for SystemCatalog {
    #[cfg(target_os = "freebsd")]
    fn enumerate(
        &self,
        device_type: DeviceType,
        interner: &DeviceIdInterner,
    ) -> Result<Vec<DeviceInfo>> {
        let text = std::fs::read_to_string(SNDSTAT_PATH).map_err(|e| {
            error!("Failed to read {}: {}", SNDSTAT_PATH, e);
            Error::Backend(format!("failed to read {SNDSTAT_PATH}: {e}"))
        })?;
        Ok(devices_from_sndstat(
            &text,
            oss_duplex_sys::default_unit(),
            device_type,
            self.default_rate,
            interner,
            probe_dsp,
        ))
    }

    #[cfg(not(target_os = "freebsd"))]
    fn enumerate(
        &self,
        device_type: DeviceType,
        interner: &DeviceIdInterner,
    ) -> Result<Vec<DeviceInfo>> {
        let mixer = oss_duplex_sys::Mixer::open(&self.mixer).map_err(|e| {
            error!("Failed to open mixer {}: {}", self.mixer, e);
            Error::Backend(format!("failed to open mixer {}: {e}", self.mixer))
        })?;
        let sysinfo = mixer.sysinfo().map_err(|e| {
            error!("Failed to run SNDCTL_SYSINFO on mixer {}: {}", self.mixer, e);
            Error::ioctl("SNDCTL_SYSINFO", e)
        })?;
        let engines = (0..sysinfo.numaudios.max(0))
            .map(|dev| mixer.audio_info(dev))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| Error::ioctl("SNDCTL_AUDIOINFO", e))?;
        Ok(devices_from_engines(
            &engines,
            device_type,
            self.default_rate,
            interner,
        ))
    }
}
