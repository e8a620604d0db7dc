use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_DEVICE_ENV: &str = "OSS_DUPLEX_DEFAULT_DEVICE";
pub const DEFAULT_MIXER_ENV: &str = "OSS_DUPLEX_DEFAULT_MIXER";
pub const PREFER_RATE_ENV: &str = "OSS_DUPLEX_PREFER_RATE";

pub const DEFAULT_DEVICE: &str = "/dev/dsp";
pub const DEFAULT_MIXER: &str = "/dev/mixer";
pub const PREFER_RATE: u32 = 48000;
pub const LATENCY_MS: u32 = 40;
pub const DEFAULT_NFRAMES: usize = 32;

#[cfg(target_os = "freebsd")]
pub const MAX_CHANNELS: u32 = 8;
#[cfg(any(target_os = "illumos", target_os = "solaris"))]
pub const MAX_CHANNELS: u32 = 16;
#[cfg(not(any(target_os = "freebsd", target_os = "illumos", target_os = "solaris")))]
pub const MAX_CHANNELS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OssOptions {
    pub default_device: String,
    pub default_mixer: String,
    pub preferred_rate: u32,
    pub latency_ms: u32,
    /// Block size used when no direction reports a buffer geometry.
    pub default_nframes: usize,
    pub max_channels: u32,
}

impl Default for OssOptions {
    fn default() -> Self {
        Self {
            default_device: DEFAULT_DEVICE.to_owned(),
            default_mixer: DEFAULT_MIXER.to_owned(),
            preferred_rate: PREFER_RATE,
            latency_ms: LATENCY_MS,
            default_nframes: DEFAULT_NFRAMES,
            max_channels: MAX_CHANNELS,
        }
    }
}

impl OssOptions {
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies the `OSS_DUPLEX_*` overrides found through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(device) = lookup(DEFAULT_DEVICE_ENV).filter(|v| !v.trim().is_empty()) {
            self.default_device = device.trim().to_owned();
        }
        if let Some(mixer) = lookup(DEFAULT_MIXER_ENV).filter(|v| !v.trim().is_empty()) {
            self.default_mixer = mixer.trim().to_owned();
        }
        if let Some(rate) = lookup(PREFER_RATE_ENV) {
            match rate.trim().parse::<u32>() {
                Ok(rate) if rate > 0 => self.preferred_rate = rate,
                _ => warn!("Ignoring {}={:?}: not a sample rate", PREFER_RATE_ENV, rate),
            }
        }
        self
    }
}
