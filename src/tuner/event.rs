use crate::error::Result;
use crate::format::ts::PidFilter;
use std::path::Path;

/// Which programs an [`EventDetector`] should report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramSelector {
    /// Every program found in the stream, used while scanning.
    All,
    /// A single program number, used while watching a channel.
    Program(u16),
}

/// Extracts channel and program metadata from the filtered stream.
///
/// `feed_ts_stream` runs on the producer thread with every filtered chunk in
/// append order. It must return promptly; errors are logged and otherwise
/// ignored. The filter handle lets a detector admit the PMT and elementary
/// stream PIDs it discovers.
pub trait EventDetector: Send {
    /// Called before streaming of `filepath` starts.
    fn start(&mut self, _filepath: &Path, _program: ProgramSelector) {}

    fn feed_ts_stream(&mut self, data: &[u8], filter: &mut PidFilter) -> Result<()>;
}

/// Detector that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventDetector;

impl EventDetector for NoopEventDetector {
    fn feed_ts_stream(&mut self, _data: &[u8], _filter: &mut PidFilter) -> Result<()> {
        Ok(())
    }
}
