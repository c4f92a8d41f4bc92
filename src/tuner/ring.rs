use crate::error::{Result, TsError};
use log::{debug, error, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Handle for a reader whose position holds back the producer.
pub type ReaderId = u64;

/// Everything guarded by the buffer monitor.
#[derive(Debug)]
struct RingState {
    /// Backing store, allocated while a stream is running.
    buffer: Vec<u8>,
    /// Total bytes ever appended (write cursor).
    bytes_fetched: u64,
    /// Read cursor: the slowest tracked reader, never moving backwards.
    last_read_position: u64,
    /// Next read position of every registered reader.
    readers: HashMap<ReaderId, u64>,
    next_reader_id: ReaderId,
    streaming: bool,
}

impl RingState {
    /// Moves the read cursor up to the slowest registered reader.
    fn advance_read_cursor(&mut self) {
        if let Some(&slowest) = self.readers.values().min() {
            self.last_read_position = self.last_read_position.max(slowest);
        }
    }
}

/// Fixed-capacity circular byte buffer shared by one producer and any number of
/// positional readers.
///
/// Positions are absolute byte offsets into the stream since the last
/// [`begin`](Self::begin). A position stays readable until the producer has
/// written a full capacity past it. The producer keeps `padding` bytes of
/// headroom ahead of the read cursor, see [`wait_for_headroom`](Self::wait_for_headroom).
///
/// Readers created through [`register_reader`](Self::register_reader) are
/// tracked individually and the read cursor follows the slowest of them, so
/// the producer never overwrites bytes a registered reader has yet to read.
/// Untracked reads through [`read_at`](Self::read_at) only move the cursor
/// while no reader is registered.
#[derive(Debug)]
pub struct RingBuffer {
    capacity: usize,
    padding: usize,
    read_timeout: Duration,
    state: Mutex<RingState>,
    cond: Condvar,
}

impl RingBuffer {
    /// Creates an idle buffer. The backing store is allocated by `begin`.
    pub fn new(capacity: usize, padding: usize, read_timeout: Duration) -> Self {
        Self {
            capacity,
            padding,
            read_timeout,
            state: Mutex::new(RingState {
                buffer: Vec::new(),
                bytes_fetched: 0,
                last_read_position: 0,
                readers: HashMap::new(),
                next_reader_id: 0,
                streaming: false,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Marks the buffer as streaming and resets both cursors to zero.
    /// Registered readers are rewound to the start of the new stream.
    ///
    /// Returns `false` without touching anything if a stream is already
    /// running.
    pub fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if state.streaming {
            return false;
        }
        if state.buffer.len() != self.capacity {
            state.buffer = vec![0; self.capacity];
        }
        state.bytes_fetched = 0;
        state.last_read_position = 0;
        state.readers.values_mut().for_each(|pos| *pos = 0);
        state.streaming = true;
        true
    }

    /// Starts tracking a reader whose next read is at `position`.
    pub fn register_reader(&self, position: u64) -> ReaderId {
        let mut state = self.state.lock();
        let id = state.next_reader_id;
        state.next_reader_id += 1;
        state.readers.insert(id, position);
        state.advance_read_cursor();
        debug!("Registered reader {} at {}", id, position);
        id
    }

    /// Stops tracking `reader` and lets the producer past its position.
    pub fn unregister_reader(&self, reader: ReaderId) {
        let mut state = self.state.lock();
        if state.readers.remove(&reader).is_some() {
            state.advance_read_cursor();
            self.cond.notify_all();
            debug!("Unregistered reader {}", reader);
        }
    }

    /// Moves a registered reader to `position` without reading.
    pub fn seek_reader(&self, reader: ReaderId, position: u64) {
        let mut state = self.state.lock();
        if let Some(pos) = state.readers.get_mut(&reader) {
            *pos = position;
            state.advance_read_cursor();
            self.cond.notify_all();
        }
    }

    pub fn reader_count(&self) -> usize {
        self.state.lock().readers.len()
    }

    /// Marks the stream stopped and wakes the producer and every waiting reader.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.streaming = false;
        self.cond.notify_all();
    }

    /// Frees the backing store of a stopped buffer.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if !state.streaming {
            state.buffer = Vec::new();
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().streaming
    }

    /// Current write cursor: total bytes appended since `begin`.
    pub fn buffered_position(&self) -> u64 {
        self.state.lock().bytes_fetched
    }

    /// Current read cursor.
    pub fn last_read_position(&self) -> u64 {
        self.state.lock().last_read_position
    }

    /// Blocks the producer while appending would eat into the padding ahead of
    /// the read cursor. Returns whether the stream is still running.
    pub fn wait_for_headroom(&self) -> bool {
        let mut state = self.state.lock();
        while self.needs_headroom(&state) && state.streaming {
            self.cond.wait(&mut state);
        }
        state.streaming
    }

    fn needs_headroom(&self, state: &RingState) -> bool {
        let backlog = state.bytes_fetched.saturating_sub(state.last_read_position);
        backlog + self.padding as u64 > self.capacity as u64
    }

    /// Appends `data` at the write cursor, wrapping at the physical end.
    ///
    /// The caller must have waited for headroom first.
    pub fn append(&self, data: &[u8]) -> Result<()> {
        if data.len() > self.capacity {
            return Err(TsError::InvalidRequest(format!(
                "append of {} bytes exceeds capacity {}",
                data.len(),
                self.capacity
            )));
        }

        let mut state = self.state.lock();
        if !state.streaming {
            return Err(TsError::Stopped);
        }
        let pos_in_buffer = (state.bytes_fetched % self.capacity as u64) as usize;
        let first_pass = data.len().min(self.capacity - pos_in_buffer);
        state.buffer[pos_in_buffer..pos_in_buffer + first_pass].copy_from_slice(&data[..first_pass]);
        if first_pass < data.len() {
            state.buffer[..data.len() - first_pass].copy_from_slice(&data[first_pass..]);
        }
        state.bytes_fetched += data.len() as u64;
        self.cond.notify_all();
        Ok(())
    }

    /// Reads `buf.len()` bytes starting at absolute position `pos`.
    ///
    /// Blocks until the write cursor reaches `pos + buf.len()`. Fails with
    /// [`TsError::Evicted`] if `pos` was already overwritten, [`TsError::Stopped`]
    /// once the stream stops, and [`TsError::Stall`] if no byte was written for
    /// the whole read timeout.
    pub fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        self.read_tracked(None, pos, buf)
    }

    /// Like [`read_at`](Self::read_at), then moves `reader` to the end of the
    /// bytes it received.
    pub fn read_at_for(&self, reader: ReaderId, pos: u64, buf: &mut [u8]) -> Result<usize> {
        self.read_tracked(Some(reader), pos, buf)
    }

    fn read_tracked(&self, reader: Option<ReaderId>, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let amount = buf.len();
        if amount == 0 {
            return Ok(0);
        }
        let usable = self.capacity.saturating_sub(self.padding);
        if amount > usable {
            return Err(TsError::InvalidRequest(format!(
                "read of {} bytes can never fit in {} usable bytes",
                amount, usable
            )));
        }
        let end = pos.checked_add(amount as u64).ok_or_else(|| {
            TsError::InvalidRequest(format!("read of {} bytes at {} overflows", amount, pos))
        })?;

        let mut state = self.state.lock();
        if !state.streaming {
            warn!("Stream is already stopped.");
            return Err(TsError::Stopped);
        }
        self.check_evicted(&state, pos)?;

        let mut last_seen = state.bytes_fetched;
        let mut deadline = Instant::now() + self.read_timeout;
        while state.bytes_fetched < end && state.streaming {
            let timed_out = self.cond.wait_until(&mut state, deadline).timed_out();
            if state.bytes_fetched != last_seen {
                last_seen = state.bytes_fetched;
                deadline = Instant::now() + self.read_timeout;
            } else if timed_out {
                // Reported upstream as end of stream so playback can be retried.
                warn!("No data update for {:?}, giving up on read at {}", self.read_timeout, pos);
                return Err(TsError::Stall(self.read_timeout));
            }
        }
        if !state.streaming {
            warn!("Stream is already stopped.");
            return Err(TsError::Stopped);
        }
        self.check_evicted(&state, pos)?;

        self.copy_out(&state, pos, buf);
        let tracked = match reader {
            Some(id) => match state.readers.get_mut(&id) {
                Some(next) => {
                    *next = end;
                    true
                }
                None => false,
            },
            None => false,
        };
        if tracked {
            state.advance_read_cursor();
        } else if state.readers.is_empty() {
            state.last_read_position = state.last_read_position.max(end);
        }
        self.cond.notify_all();
        Ok(amount)
    }

    fn check_evicted(&self, state: &RingState, pos: u64) -> Result<()> {
        let oldest = state.bytes_fetched.saturating_sub(self.capacity as u64);
        if pos < oldest {
            error!("Requested data at {} is already overwritten (oldest is {})", pos, oldest);
            return Err(TsError::Evicted { position: pos, oldest });
        }
        Ok(())
    }

    fn copy_out(&self, state: &RingState, pos: u64, buf: &mut [u8]) {
        let amount = buf.len();
        let pos_in_buffer = (pos % self.capacity as u64) as usize;
        let first_pass = amount.min(self.capacity - pos_in_buffer);
        buf[..first_pass].copy_from_slice(&state.buffer[pos_in_buffer..pos_in_buffer + first_pass]);
        if first_pass < amount {
            buf[first_pass..].copy_from_slice(&state.buffer[..amount - first_pass]);
        }
    }
}
