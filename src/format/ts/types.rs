use bytes::{BufMut, BytesMut};

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_DVB_SDT: u16 = 0x0011;
pub const PID_DVB_EIT: u16 = 0x0012;
pub const PID_ATSC_SI_BASE: u16 = 0x1ffb;
pub const PID_NULL: u16 = 0x1fff;
pub const MAX_PID: u16 = 0x1fff;

// Constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_SYNC_BYTE: u8 = 0x47;

/// The header fields a test capture needs; the remaining flags are written
/// as zero with a payload present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TSHeader {
    pub payload_unit_start: bool,
    pub pid: u16,
    pub continuity_counter: u8,
}

impl TSHeader {
    pub fn with_pid(pid: u16) -> Self {
        Self {
            pid,
            ..Self::default()
        }
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(TS_SYNC_BYTE);

        let mut b1 = ((self.pid >> 8) & 0x1f) as u8;
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        buf.put_u8(b1);
        buf.put_u8((self.pid & 0xff) as u8);
        // Payload only, continuity counter in the low nibble.
        buf.put_u8(0x10 | (self.continuity_counter & 0x0f));
    }

    /// Builds a full packet with this header and a payload of `fill` bytes.
    pub fn to_packet(&self, fill: u8) -> BytesMut {
        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        self.write_to(&mut buf);
        buf.put_bytes(fill, TS_PACKET_SIZE - TS_HEADER_SIZE);
        buf
    }
}
