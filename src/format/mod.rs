//! Container formats understood by the streamer.

pub mod ts;

pub use self::ts::{PidFilter, TSHeader, TS_PACKET_SIZE, TS_SYNC_BYTE};
