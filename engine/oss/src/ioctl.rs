use nix::libc;

#[repr(C)]
#[derive(Debug, Clone)]
pub struct AudioInfo {
    pub dev: libc::c_int,
    pub name: [libc::c_char; 64],
    pub busy: libc::c_int,
    pub pid: libc::c_int,
    pub caps: libc::c_int,
    pub iformats: libc::c_int,
    pub oformats: libc::c_int,
    pub magic: libc::c_int,
    pub cmd: [libc::c_char; 64],
    pub card_number: libc::c_int,
    pub port_number: libc::c_int,
    pub mixer_dev: libc::c_int,
    pub legacy_device: libc::c_int,
    pub enabled: libc::c_int,
    pub flags: libc::c_int,
    pub min_rate: libc::c_int,
    pub max_rate: libc::c_int,
    pub min_channels: libc::c_int,
    pub max_channels: libc::c_int,
    pub binding: libc::c_int,
    pub rate_source: libc::c_int,
    pub handle: [libc::c_char; 32],
    pub nrates: libc::c_uint,
    pub rates: [libc::c_uint; 20],
    pub song_name: [libc::c_char; 64],
    pub label: [libc::c_char; 16],
    pub latency: libc::c_int,
    pub devnode: [libc::c_char; 32],
    pub next_play_engine: libc::c_int,
    pub next_rec_engine: libc::c_int,
    pub filler: [libc::c_int; 184],
}

impl AudioInfo {
    /// Query slot for engine `dev`; `-1` asks about the engine behind the open fd.
    pub fn for_engine(dev: libc::c_int) -> Self {
        Self {
            dev,
            name: [0; 64],
            busy: 0,
            pid: 0,
            caps: 0,
            iformats: 0,
            oformats: 0,
            magic: 0,
            cmd: [0; 64],
            card_number: 0,
            port_number: 0,
            mixer_dev: 0,
            legacy_device: 0,
            enabled: 0,
            flags: 0,
            min_rate: 0,
            max_rate: 0,
            min_channels: 0,
            max_channels: 0,
            binding: 0,
            rate_source: 0,
            handle: [0; 32],
            nrates: 0,
            rates: [0; 20],
            song_name: [0; 64],
            label: [0; 16],
            latency: 0,
            devnode: [0; 32],
            next_play_engine: 0,
            next_rec_engine: 0,
            filler: [0; 184],
        }
    }
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct BufferInfo {
    pub fragments: libc::c_int,
    pub fragstotal: libc::c_int,
    pub fragsize: libc::c_int,
    pub bytes: libc::c_int,
}

#[repr(C)]
#[derive(Debug, Clone)]
pub struct OssSysInfo {
    pub product: [libc::c_char; 32],
    pub version: [libc::c_char; 32],
    pub versionnum: libc::c_int,
    pub options: [libc::c_char; 128],
    pub numaudios: libc::c_int,
    pub openedaudio: [libc::c_int; 8],
    pub numsynths: libc::c_int,
    pub nummidis: libc::c_int,
    pub numtimers: libc::c_int,
    pub nummixers: libc::c_int,
    pub openedmidi: [libc::c_int; 8],
    pub numcards: libc::c_int,
    pub numaudioengines: libc::c_int,
    pub license: [libc::c_char; 16],
    pub revision_info: [libc::c_char; 256],
    pub filler: [libc::c_int; 172],
}

impl Default for OssSysInfo {
    fn default() -> Self {
        Self {
            product: [0; 32],
            version: [0; 32],
            versionnum: 0,
            options: [0; 128],
            numaudios: 0,
            openedaudio: [0; 8],
            numsynths: 0,
            nummidis: 0,
            numtimers: 0,
            nummixers: 0,
            openedmidi: [0; 8],
            numcards: 0,
            numaudioengines: 0,
            license: [0; 16],
            revision_info: [0; 256],
            filler: [0; 172],
        }
    }
}

const SNDCTL_DSP_MAGIC: u8 = b'P';
const SNDCTL_DSP_SPEED: u8 = 2;
const SNDCTL_DSP_SETFMT: u8 = 5;
const SNDCTL_DSP_CHANNELS: u8 = 6;
const SNDCTL_DSP_GETOSPACE: u8 = 12;
const SNDCTL_DSP_GETISPACE: u8 = 13;
const SNDCTL_DSP_GETODELAY: u8 = 23;

nix::ioctl_readwrite!(oss_set_speed, SNDCTL_DSP_MAGIC, SNDCTL_DSP_SPEED, i32);
nix::ioctl_readwrite!(oss_set_format, SNDCTL_DSP_MAGIC, SNDCTL_DSP_SETFMT, u32);
nix::ioctl_readwrite!(oss_set_channels, SNDCTL_DSP_MAGIC, SNDCTL_DSP_CHANNELS, i32);
nix::ioctl_read!(
    oss_output_buffer_info,
    SNDCTL_DSP_MAGIC,
    SNDCTL_DSP_GETOSPACE,
    BufferInfo
);
nix::ioctl_read!(
    oss_input_buffer_info,
    SNDCTL_DSP_MAGIC,
    SNDCTL_DSP_GETISPACE,
    BufferInfo
);
nix::ioctl_read!(oss_get_odelay, SNDCTL_DSP_MAGIC, SNDCTL_DSP_GETODELAY, i32);

const SNDCTL_INFO_MAGIC: u8 = b'X';
const SNDCTL_SYSINFO: u8 = 1;
const SNDCTL_AUDIOINFO: u8 = 7;

nix::ioctl_read!(oss_get_sysinfo, SNDCTL_INFO_MAGIC, SNDCTL_SYSINFO, OssSysInfo);
nix::ioctl_readwrite!(
    oss_get_audio_info,
    SNDCTL_INFO_MAGIC,
    SNDCTL_AUDIOINFO,
    AudioInfo
);
