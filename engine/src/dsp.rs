use crate::params::Direction;
use crate::traits::DspDevice;
use oss_duplex_sys::{BufferInfo, Dsp};

impl DspDevice for Dsp {
    fn open(path: &str, direction: Direction) -> std::io::Result<Self> {
        Dsp::open(path, direction.is_input())
    }

    fn set_format(&self, format: &mut u32) -> std::io::Result<()> {
        Dsp::set_format(self, format)
    }

    fn set_channels(&self, channels: &mut i32) -> std::io::Result<()> {
        Dsp::set_channels(self, channels)
    }

    fn set_speed(&self, rate: &mut i32) -> std::io::Result<()> {
        Dsp::set_speed(self, rate)
    }

    fn buffer_space(&self) -> std::io::Result<BufferInfo> {
        self.buffer_info()
    }

    fn output_delay(&self) -> std::io::Result<i32> {
        Dsp::output_delay(self)
    }

    fn read(&self, dst: &mut [u8]) -> std::io::Result<usize> {
        Dsp::read(self, dst)
    }

    fn write(&self, src: &[u8]) -> std::io::Result<usize> {
        Dsp::write(self, src)
    }
}
