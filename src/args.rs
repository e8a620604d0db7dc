//! Command-line argument parsing for the `oss-duplex` tool.

use oss_duplex_engine::{DeviceType, SampleFormat};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Devices {
        device_type: DeviceType,
        json: bool,
    },
    Tone {
        device: Option<String>,
        seconds: Option<f32>,
        freq: Option<f32>,
        volume: Option<f32>,
        format: Option<SampleFormat>,
    },
    Play {
        file: PathBuf,
        device: Option<String>,
    },
    Record {
        file: PathBuf,
        device: Option<String>,
        seconds: Option<f32>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub command: Option<Command>,
    pub show_help: bool,
}

pub fn parse_format(value: &str) -> Option<SampleFormat> {
    match value.to_ascii_lowercase().as_str() {
        "s16le" => Some(SampleFormat::S16LE),
        "s16be" => Some(SampleFormat::S16BE),
        "f32" | "float" => Some(SampleFormat::FLOAT32NE),
        _ => None,
    }
}

fn parse_device_type(value: &str) -> Option<DeviceType> {
    match value {
        "input" | "in" => Some(DeviceType::Input),
        "output" | "out" => Some(DeviceType::Output),
        "all" => Some(DeviceType::All),
        _ => None,
    }
}

fn parse_number(flag: &str, value: Option<String>) -> Result<f32, String> {
    let value = value.ok_or_else(|| format!("{flag} requires a value"))?;
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| format!("{flag}: invalid value {value}"))
}

impl CliArgs {
    pub fn parse() -> anyhow::Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    pub fn parse_from(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        Self::try_parse(args).map_err(anyhow::Error::msg)
    }

    fn try_parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut iter = args.into_iter();
        let mut config = None;
        let mut show_help = false;
        let mut positional = Vec::new();
        let mut device = None;
        let mut seconds = None;
        let mut freq = None;
        let mut volume = None;
        let mut format = None;
        let mut json = false;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => show_help = true,
                "--json" => json = true,
                "--config" => {
                    config = Some(PathBuf::from(
                        iter.next().ok_or("--config requires a path")?,
                    ));
                }
                "--device" | "-d" => {
                    device = Some(iter.next().ok_or("--device requires a path")?);
                }
                "--seconds" => seconds = Some(parse_number("--seconds", iter.next())?),
                "--freq" => freq = Some(parse_number("--freq", iter.next())?),
                "--volume" => volume = Some(parse_number("--volume", iter.next())?),
                "--format" => {
                    let value = iter.next().ok_or("--format requires a value")?;
                    format = Some(
                        parse_format(&value).ok_or_else(|| format!("Unknown format: {value}"))?,
                    );
                }
                _ if arg.starts_with('-') => return Err(format!("Unknown flag: {arg}")),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match positional.next().as_deref() {
            None => None,
            Some("devices") => {
                let device_type = match positional.next() {
                    Some(value) => parse_device_type(&value)
                        .ok_or_else(|| format!("Unknown device type: {value}"))?,
                    None => DeviceType::All,
                };
                Some(Command::Devices { device_type, json })
            }
            Some("tone") => Some(Command::Tone {
                device,
                seconds,
                freq,
                volume,
                format,
            }),
            Some("play") => Some(Command::Play {
                file: positional.next().ok_or("play requires a WAV file")?.into(),
                device,
            }),
            Some("record") => Some(Command::Record {
                file: positional.next().ok_or("record requires a WAV file")?.into(),
                device,
                seconds,
            }),
            Some(other) => return Err(format!("Unknown command: {other}")),
        };
        if let Some(extra) = positional.next() {
            return Err(format!("Unexpected argument: {extra}"));
        }

        Ok(Self {
            config,
            show_help: show_help || command.is_none(),
            command,
        })
    }

    pub fn print_help() {
        eprintln!(
            "Usage:\n  oss-duplex [--config <file.toml>] <command> [options]\n\n\
             Commands:\n\
             \x20 devices [input|output|all] [--json]   List OSS devices\n\
             \x20 tone [--device P] [--seconds N] [--freq HZ] [--volume V] [--format s16le|s16be|f32]\n\
             \x20 play <file.wav> [--device P]          Play a WAV file\n\
             \x20 record <file.wav> [--device P] [--seconds N]\n\n\
             Environment:\n\
             \x20 OSS_DUPLEX_LOG              error|warn|info|debug|trace\n\
             \x20 OSS_DUPLEX_DEFAULT_DEVICE   Device used when none is given (default /dev/dsp)\n\
             \x20 OSS_DUPLEX_DEFAULT_MIXER    Mixer used for enumeration (default /dev/mixer)\n\
             \x20 OSS_DUPLEX_PREFER_RATE      Preferred sample rate (default 48000)\n"
        );
    }
}
