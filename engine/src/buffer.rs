//! Typed working buffers for one stream direction.
//!
//! Each direction keeps the raw bytes exchanged with the device next to a
//! typed view handed to the data callback. The two are never aliased: the
//! wire codecs below copy between them through `byteorder`, so 16-bit
//! samples reach the callback in native order whatever the device encoding.

use crate::convert::{float_to_linear32, linear16_set_vol, linear32_to_float};
use crate::params::StreamInfo;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use oss_duplex_sys::{AFMT_S16_BE, AFMT_S16_LE, AFMT_S32_BE, AFMT_S32_LE};

/// Capture samples as seen by the data callback.
#[derive(Debug)]
pub enum InputBuffer<'a> {
    S16(&'a [i16]),
    F32(&'a [f32]),
}

impl InputBuffer<'_> {
    pub fn len(&self) -> usize {
        match self {
            InputBuffer::S16(s) => s.len(),
            InputBuffer::F32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Playback samples the data callback fills in.
#[derive(Debug)]
pub enum OutputBuffer<'a> {
    S16(&'a mut [i16]),
    F32(&'a mut [f32]),
}

impl OutputBuffer<'_> {
    pub fn len(&self) -> usize {
        match self {
            OutputBuffer::S16(s) => s.len(),
            OutputBuffer::F32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn of_format(format: u32) -> Self {
        match format {
            AFMT_S16_LE | AFMT_S32_LE => Endian::Little,
            AFMT_S16_BE | AFMT_S32_BE => Endian::Big,
            _ if cfg!(target_endian = "big") => Endian::Big,
            _ => Endian::Little,
        }
    }
}

#[derive(Debug)]
enum Samples {
    Fixed16(Vec<i16>),
    Float { samples: Vec<f32>, container: Vec<i32> },
}

#[derive(Debug)]
pub(crate) struct DirectionBuffer {
    channels: usize,
    endian: Endian,
    wire: Vec<u8>,
    samples: Samples,
}

impl DirectionBuffer {
    /// Zeroed buffers for `frames` frames of the negotiated layout.
    pub(crate) fn new(info: &StreamInfo, floating: bool, frames: usize) -> Self {
        let channels = info.channels as usize;
        let count = channels * frames;
        let samples = if floating {
            Samples::Float {
                samples: vec![0.0; count],
                container: vec![0; count],
            }
        } else {
            Samples::Fixed16(vec![0; count])
        };
        Self {
            channels,
            endian: Endian::of_format(info.format),
            wire: vec![0; frames * info.frame_size()],
            samples,
        }
    }

    pub(crate) fn wire(&self) -> &[u8] {
        &self.wire
    }

    pub(crate) fn wire_mut(&mut self) -> &mut [u8] {
        &mut self.wire
    }

    pub(crate) fn input_view(&self) -> InputBuffer<'_> {
        match &self.samples {
            Samples::Fixed16(s) => InputBuffer::S16(s),
            Samples::Float { samples, .. } => InputBuffer::F32(samples),
        }
    }

    pub(crate) fn output_view(&mut self) -> OutputBuffer<'_> {
        match &mut self.samples {
            Samples::Fixed16(s) => OutputBuffer::S16(s),
            Samples::Float { samples, .. } => OutputBuffer::F32(samples),
        }
    }

    /// Moves the last block read from the device into the callback view.
    pub(crate) fn decode_capture(&mut self, frames: usize) {
        let n = (frames * self.channels).min(self.sample_capacity());
        match &mut self.samples {
            Samples::Fixed16(samples) => {
                let src = &self.wire[..n * 2];
                match self.endian {
                    Endian::Little => LittleEndian::read_i16_into(src, &mut samples[..n]),
                    Endian::Big => BigEndian::read_i16_into(src, &mut samples[..n]),
                }
            }
            Samples::Float { samples, container } => {
                let src = &self.wire[..n * 4];
                match self.endian {
                    Endian::Little => LittleEndian::read_i32_into(src, &mut container[..n]),
                    Endian::Big => BigEndian::read_i32_into(src, &mut container[..n]),
                }
                linear32_to_float(&container[..n], &mut samples[..n]);
            }
        }
    }

    /// Applies `volume` to the first `frames` frames the callback produced and
    /// encodes them into the wire region.
    pub(crate) fn encode_playback(&mut self, frames: usize, volume: f32) {
        let n = (frames * self.channels).min(self.sample_capacity());
        match &mut self.samples {
            Samples::Fixed16(samples) => {
                linear16_set_vol(&mut samples[..n], volume);
                let dst = &mut self.wire[..n * 2];
                match self.endian {
                    Endian::Little => LittleEndian::write_i16_into(&samples[..n], dst),
                    Endian::Big => BigEndian::write_i16_into(&samples[..n], dst),
                }
            }
            Samples::Float { samples, container } => {
                float_to_linear32(&samples[..n], &mut container[..n], volume);
                let dst = &mut self.wire[..n * 4];
                match self.endian {
                    Endian::Little => LittleEndian::write_i32_into(&container[..n], dst),
                    Endian::Big => BigEndian::write_i32_into(&container[..n], dst),
                }
            }
        }
    }

    fn sample_capacity(&self) -> usize {
        match &self.samples {
            Samples::Fixed16(s) => s.len(),
            Samples::Float { samples, .. } => samples.len(),
        }
    }
}
