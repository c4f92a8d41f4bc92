//! # File-backed tuner
//!
//! Replays an MPEG-2 TS capture file as if it were a live broadcast:
//!
//! - [`StreamProvider`] reads the file in an endless loop and keeps only the
//!   packets whose PID is admitted
//! - [`RingBuffer`] holds the filtered stream for positional readers, with
//!   producer backpressure, stall detection and eviction checks
//! - [`FileTsStreamer`] owns the producer thread and the session lifecycle
//! - [`FileDataSource`] gives each consumer its own read cursor
//!
//! ## Example: Discovering capture files
//!
//! ```rust
//! use tsfile::tuner::local_stream_files;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! for channel in local_stream_files("./Streams")? {
//!     println!("{} MHz -> {}", channel.frequency, channel.filename);
//! }
//! # Ok(())
//! # }
//! ```

/// Scan channels, tuned channels and capture file discovery
pub mod channel;

/// Positional readers over a running stream
pub mod data_source;

/// Channel and program metadata collaborator
pub mod event;

/// Circular buffer shared by the producer and readers
pub mod ring;

/// PID-filtered capture file reader
pub mod source;

/// Stream session and producer thread
pub mod streamer;

pub use channel::{
    add_local_stream_files, local_stream_files, ScanChannel, StreamTarget, TunerChannel, FREQ_BASE,
};
pub use data_source::{FileDataSource, TsDataSource};
pub use event::{EventDetector, NoopEventDetector, ProgramSelector};
pub use ring::{ReaderId, RingBuffer};
pub use source::StreamProvider;
pub use streamer::{FileTsStreamer, SessionState};
