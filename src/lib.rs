#![doc(html_root_url = "https://docs.rs/tsfile/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsfile - file-backed transport stream tuner
//!
//! `tsfile` replays a captured MPEG-2 transport stream file as if it were a
//! live broadcast tuner. A producer thread reads the file in an endless loop,
//! keeps only the packets whose PID is admitted, and publishes them into a
//! fixed-capacity circular buffer that any number of consumers read by
//! absolute byte position.
//!
//! ## Features
//!
//! - PID filtering of 188-byte TS packets with sync byte validation
//! - Endless playback: the file is reopened from the start at EOF
//! - Blocking positional reads with stall timeout and eviction detection
//! - Producer backpressure against the read cursor
//! - Per-consumer readers with an adjustable start offset
//! - Capture file discovery with virtual tuning frequencies
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsfile::config::StreamerConfig;
//! use tsfile::tuner::{FileTsStreamer, NoopEventDetector, ScanChannel, StreamTarget};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StreamerConfig::default().with_stream_dir("/data/Streams");
//! let mut streamer = FileTsStreamer::new(config, NoopEventDetector)?;
//! streamer.start(&StreamTarget::Scan(ScanChannel::for_file(100, "capture.ts")))?;
//!
//! let mut packet = [0u8; 188];
//! streamer.read_at(0, &mut packet)?;
//! assert_eq!(packet[0], 0x47);
//!
//! streamer.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `format`: TS constants, header parsing and the PID filter
//! - `tuner`: the streaming engine (source, ring buffer, session, readers)
//! - `config`: sizing, timeouts and the stream directory
//! - `error`: error kinds surfaced at the read boundary
//!
/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// Media format primitives (TS)
pub mod format;

/// File-backed tuner: stream source, ring buffer and session
pub mod tuner;

pub use error::{Result, TsError};
