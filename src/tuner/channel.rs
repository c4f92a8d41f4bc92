use crate::error::Result;
use crate::tuner::event::ProgramSelector;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Virtual frequency of the first capture file.
pub const FREQ_BASE: u32 = 100;
/// Virtual frequency step between consecutive capture files.
pub const FREQ_STEP: u32 = 100;

/// A capture file offered to the channel scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanChannel {
    pub frequency: u32,
    /// File name relative to the configured stream directory.
    pub filename: String,
}

impl ScanChannel {
    pub fn for_file(frequency: u32, filename: impl Into<String>) -> Self {
        Self {
            frequency,
            filename: filename.into(),
        }
    }
}

/// A tuned channel backed by a capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunerChannel {
    pub filepath: PathBuf,
    pub program_number: u16,
    pub video_pid: u16,
    pub audio_pids: Vec<u16>,
    pub pcr_pid: u16,
}

impl TunerChannel {
    /// PIDs carrying this channel's elementary streams and clock reference.
    pub fn pids(&self) -> impl Iterator<Item = u16> + '_ {
        std::iter::once(self.video_pid)
            .chain(self.audio_pids.iter().copied())
            .chain(std::iter::once(self.pcr_pid))
    }
}

/// What a streamer plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// Scan a capture file for channels; only table PIDs are admitted.
    Scan(ScanChannel),
    /// Play one channel; its elementary stream PIDs are admitted as well.
    Channel(TunerChannel),
}

impl StreamTarget {
    pub(crate) fn program(&self) -> ProgramSelector {
        match self {
            StreamTarget::Scan(_) => ProgramSelector::All,
            StreamTarget::Channel(channel) => ProgramSelector::Program(channel.program_number),
        }
    }
}

/// Lists the capture files in `dir` as scan channels, in file name order,
/// assigning each a virtual frequency. A missing directory yields no channels.
pub fn local_stream_files(dir: impl AsRef<Path>) -> Result<Vec<ScanChannel>> {
    let mut output = Vec::new();
    add_local_stream_files(dir, &mut output)?;
    Ok(output)
}

/// Appends the capture files in `dir` to `output`, see [`local_stream_files`].
pub fn add_local_stream_files(dir: impl AsRef<Path>, output: &mut Vec<ScanChannel>) -> Result<()> {
    let entries = match fs::read_dir(dir.as_ref()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let mut freq = FREQ_BASE;
    for name in names {
        output.push(ScanChannel::for_file(freq, name));
        freq += FREQ_STEP;
    }
    Ok(())
}
