use super::parser::packet_pid;
use super::types::MAX_PID;
use bitvec::prelude::*;

/// Set of PIDs admitted by a stream source.
///
/// Backed by one bit per possible 13-bit PID, so membership checks on the hot
/// path are a single indexed load. Iteration order carries no meaning.
#[derive(Debug, Clone)]
pub struct PidFilter {
    pids: BitVec<u64, Lsb0>,
}

impl Default for PidFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl PidFilter {
    pub fn new() -> Self {
        Self {
            pids: bitvec![u64, Lsb0; 0; MAX_PID as usize + 1],
        }
    }

    /// Admits `pid`. Bits above the 13-bit PID range are masked off.
    pub fn add(&mut self, pid: u16) {
        self.pids.set((pid & MAX_PID) as usize, true);
    }

    pub fn remove(&mut self, pid: u16) {
        self.pids.set((pid & MAX_PID) as usize, false);
    }

    pub fn clear(&mut self) {
        self.pids.fill(false);
    }

    pub fn is_empty(&self) -> bool {
        self.pids.not_any()
    }

    pub fn len(&self) -> usize {
        self.pids.count_ones()
    }

    pub fn contains(&self, pid: u16) -> bool {
        pid <= MAX_PID && self.pids[pid as usize]
    }

    /// Whether a packet starts with the sync byte and carries an admitted PID.
    pub fn admits(&self, packet: &[u8]) -> bool {
        packet_pid(packet).is_some_and(|pid| self.contains(pid))
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.pids.iter_ones().map(|pid| pid as u16)
    }
}

impl Extend<u16> for PidFilter {
    fn extend<I: IntoIterator<Item = u16>>(&mut self, iter: I) {
        for pid in iter {
            self.add(pid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ts::{TSHeader, PID_ATSC_SI_BASE, PID_PAT};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_contains_clear() {
        let mut filter = PidFilter::new();
        assert!(filter.is_empty());

        filter.add(PID_PAT);
        filter.add(PID_ATSC_SI_BASE);
        filter.add(PID_PAT);
        assert!(!filter.is_empty());
        assert_eq!(filter.len(), 2);
        assert!(filter.contains(PID_PAT));
        assert!(filter.contains(PID_ATSC_SI_BASE));
        assert!(!filter.contains(0x100));
        assert!(!filter.contains(0x2000));

        filter.remove(PID_PAT);
        assert!(!filter.contains(PID_PAT));

        filter.clear();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_admits_by_packet() {
        let mut filter = PidFilter::new();
        filter.extend([0x100, 0x101]);

        assert!(filter.admits(&TSHeader::with_pid(0x100).to_packet(0)));
        assert!(filter.admits(&TSHeader::with_pid(0x101).to_packet(0)));
        assert!(!filter.admits(&TSHeader::with_pid(0x102).to_packet(0)));

        let mut desynced = TSHeader::with_pid(0x100).to_packet(0);
        desynced[0] = 0x00;
        assert!(!filter.admits(&desynced));
    }

    #[test]
    fn test_iter_lists_members() {
        let mut filter = PidFilter::new();
        filter.extend([0x1ffb, 0x0011, 0x0000]);
        let mut pids: Vec<u16> = filter.iter().collect();
        pids.sort_unstable();
        assert_eq!(pids, vec![0x0000, 0x0011, 0x1ffb]);
    }
}
