use nix::libc;
use std::{
    fs::File,
    io::{Read, Write},
    os::{fd::AsRawFd, unix::fs::OpenOptionsExt},
};

mod ioctl;

pub use self::ioctl::{AudioInfo, BufferInfo, OssSysInfo};
use self::ioctl::*;

// Format
pub const AFMT_S16_LE: u32 = 0x00000010;
pub const AFMT_S16_BE: u32 = 0x00000020;
pub const AFMT_S32_LE: u32 = 0x00001000;
pub const AFMT_S32_BE: u32 = 0x00002000;

#[cfg(target_endian = "little")]
pub const AFMT_S16_NE: u32 = AFMT_S16_LE;
#[cfg(target_endian = "big")]
pub const AFMT_S16_NE: u32 = AFMT_S16_BE;
#[cfg(target_endian = "little")]
pub const AFMT_S32_NE: u32 = AFMT_S32_LE;
#[cfg(target_endian = "big")]
pub const AFMT_S32_NE: u32 = AFMT_S32_BE;

// Capabilities
pub const PCM_CAP_INPUT: i32 = 0x00010000;
pub const PCM_CAP_OUTPUT: i32 = 0x00020000;

/// Size of `oss_devnode_t`, including the terminating NUL.
pub const DEVNODE_LEN: usize = 32;

/// Container width of the linear formats the engine negotiates.
pub fn bits_per_sample(format: u32) -> Option<u32> {
    match format {
        AFMT_S16_LE | AFMT_S16_BE => Some(16),
        AFMT_S32_LE | AFMT_S32_BE => Some(32),
        _ => None,
    }
}

pub fn cstr_fixed_prefix<const N: usize>(buf: &[libc::c_char; N]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(N);
    let bytes: Vec<u8> = buf[..len].iter().map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// An open `/dev/dsp*` node in blocking mode.
#[derive(Debug)]
pub struct Dsp {
    file: File,
    input: bool,
}

impl Dsp {
    pub fn open(path: &str, input: bool) -> std::io::Result<Self> {
        let mut binding = File::options();
        if input {
            binding
                .read(true)
                .write(false)
                .custom_flags(libc::O_RDONLY);
        } else {
            binding
                .read(false)
                .write(true)
                .custom_flags(libc::O_WRONLY);
        }
        Ok(Self {
            file: binding.open(path)?,
            input,
        })
    }

    pub fn fd(&self) -> i32 {
        self.file.as_raw_fd()
    }

    pub fn set_format(&self, format: &mut u32) -> std::io::Result<()> {
        unsafe { oss_set_format(self.fd(), format) }
            .map(|_| ())
            .map_err(|_| std::io::Error::last_os_error())
    }

    pub fn set_channels(&self, channels: &mut i32) -> std::io::Result<()> {
        unsafe { oss_set_channels(self.fd(), channels) }
            .map(|_| ())
            .map_err(|_| std::io::Error::last_os_error())
    }

    pub fn set_speed(&self, rate: &mut i32) -> std::io::Result<()> {
        unsafe { oss_set_speed(self.fd(), rate) }
            .map(|_| ())
            .map_err(|_| std::io::Error::last_os_error())
    }

    /// GETISPACE for capture handles, GETOSPACE for playback handles.
    pub fn buffer_info(&self) -> std::io::Result<BufferInfo> {
        let mut info = BufferInfo::default();
        let res = if self.input {
            unsafe { oss_input_buffer_info(self.fd(), &mut info) }
        } else {
            unsafe { oss_output_buffer_info(self.fd(), &mut info) }
        };
        res.map(|_| info)
            .map_err(|_| std::io::Error::last_os_error())
    }

    /// Bytes queued in the playback buffer that the hardware has not played yet.
    pub fn output_delay(&self) -> std::io::Result<i32> {
        let mut delay = 0_i32;
        unsafe { oss_get_odelay(self.fd(), &mut delay) }
            .map(|_| delay)
            .map_err(|_| std::io::Error::last_os_error())
    }

    pub fn audio_info(&self) -> std::io::Result<AudioInfo> {
        let mut info = AudioInfo::for_engine(-1);
        unsafe { oss_get_audio_info(self.fd(), &mut info) }
            .map(|_| info)
            .map_err(|_| std::io::Error::last_os_error())
    }

    pub fn read(&self, dst: &mut [u8]) -> std::io::Result<usize> {
        (&self.file).read(dst)
    }

    pub fn write(&self, src: &[u8]) -> std::io::Result<usize> {
        (&self.file).write(src)
    }
}

/// The mixer node, used to walk audio engines through SYSINFO/AUDIOINFO.
#[derive(Debug)]
pub struct Mixer {
    file: File,
}

impl Mixer {
    pub fn open(path: &str) -> std::io::Result<Self> {
        Ok(Self {
            file: File::options().read(true).write(true).open(path)?,
        })
    }

    pub fn sysinfo(&self) -> std::io::Result<OssSysInfo> {
        let mut info = OssSysInfo::default();
        unsafe { oss_get_sysinfo(self.file.as_raw_fd(), &mut info) }
            .map(|_| info)
            .map_err(|_| std::io::Error::last_os_error())
    }

    pub fn audio_info(&self, dev: i32) -> std::io::Result<AudioInfo> {
        let mut info = AudioInfo::for_engine(dev);
        unsafe { oss_get_audio_info(self.file.as_raw_fd(), &mut info) }
            .map(|_| info)
            .map_err(|_| std::io::Error::last_os_error())
    }
}

/// Value of the `hw.snd.default_unit` sysctl.
#[cfg(target_os = "freebsd")]
pub fn default_unit() -> Option<u32> {
    let mut unit: libc::c_int = -1;
    let mut size = std::mem::size_of::<libc::c_int>();
    let rc = unsafe {
        libc::sysctlbyname(
            c"hw.snd.default_unit".as_ptr(),
            (&mut unit as *mut libc::c_int).cast::<libc::c_void>(),
            &mut size,
            std::ptr::null(),
            0,
        )
    };
    if rc == 0 && unit >= 0 {
        Some(unit as u32)
    } else {
        None
    }
}
