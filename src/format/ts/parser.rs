use super::types::*;

/// Returns the PID of a packet, or `None` when it does not start with the
/// sync byte. Only the first three bytes are inspected.
#[inline]
pub fn packet_pid(packet: &[u8]) -> Option<u16> {
    match packet {
        [TS_SYNC_BYTE, b1, b2, ..] => Some((((*b1 & 0x1f) as u16) << 8) | *b2 as u16),
        _ => None,
    }
}
