use crate::params::SampleFormat;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported sample format {0:?}")]
    InvalidFormat(SampleFormat),

    #[error("audio device \"{path}\" could not be opened: {source}")]
    DeviceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not supported by the OSS backend")]
    NotSupported(&'static str),

    #[error("OSS {op} failed: {source}")]
    Ioctl {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn stream worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("data callback failed: {0}")]
    Callback(String),

    #[error("{0}")]
    Backend(String),
}

impl Error {
    /// Whether this error falls in the catch-all class rather than one of the
    /// dedicated format/device/support codes.
    pub fn is_generic(&self) -> bool {
        !matches!(
            self,
            Error::InvalidFormat(_) | Error::DeviceUnavailable { .. } | Error::NotSupported(_)
        )
    }

    pub(crate) fn ioctl(op: &'static str, source: std::io::Error) -> Self {
        Error::Ioctl { op, source }
    }
}
