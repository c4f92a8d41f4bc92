//! # MPEG Transport Stream (TS) primitives
//!
//! Just enough of the TS format to route packets by PID:
//!
//! - Packet size, sync byte and the well-known table PIDs
//! - PID extraction and a packet builder for test captures
//! - A PID filter deciding which packets are forwarded
//!
//! ## Example Usage
//!
//! ```rust
//! use tsfile::format::ts::{packet_pid, PidFilter, TSHeader, PID_PAT, TS_PACKET_SIZE};
//!
//! let mut filter = PidFilter::new();
//! filter.add(PID_PAT);
//!
//! let packet = TSHeader::with_pid(PID_PAT).to_packet(0xff);
//! assert_eq!(packet.len(), TS_PACKET_SIZE);
//! assert!(filter.admits(&packet));
//! assert_eq!(packet_pid(&packet), Some(PID_PAT));
//! ```

/// PID admission set
pub mod filter;

/// PID extraction from raw packets
pub mod parser;

/// Core TS types and constants
pub mod types;

pub use filter::PidFilter;
pub use parser::packet_pid;
pub use types::{
    TSHeader,
    MAX_PID,
    PID_ATSC_SI_BASE,
    PID_DVB_EIT,
    PID_DVB_SDT,
    PID_NULL,
    PID_PAT,
    TS_HEADER_SIZE,
    TS_PACKET_SIZE,
    TS_SYNC_BYTE,
};
