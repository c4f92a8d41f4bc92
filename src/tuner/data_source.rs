use crate::error::{Result, TsError};
use crate::tuner::ring::{ReaderId, RingBuffer};
use bytes::Bytes;
use std::sync::Arc;

/// Positional byte source consumed by a media player.
pub trait TsDataSource {
    /// Prepares the source for reading. Returns the stream length, or `None`
    /// when the stream is unbounded.
    fn open(&mut self) -> Result<Option<u64>>;

    /// Reads into `buf`, returning the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn close(&mut self);

    /// Bytes available to this source, relative to its start position.
    fn buffered_position(&self) -> u64;

    /// Bytes read through this source so far.
    fn last_read_position(&self) -> u64;

    /// Discards the first `offset` buffered bytes. Only valid before the first
    /// read, and only up to the current buffered position.
    fn shift_start_position(&mut self, offset: u64) -> Result<()>;
}

/// Reader over a [`FileTsStreamer`](crate::tuner::FileTsStreamer) buffer.
///
/// Starts at the stream position current when it was created, so a late
/// consumer only sees data produced after it attached. Intended for use from
/// one thread at a time; create one per consumer.
///
/// While open, the source is registered with the buffer, which keeps the
/// producer from overwriting bytes this source has not read yet.
#[derive(Debug)]
pub struct FileDataSource {
    ring: Arc<RingBuffer>,
    reader: Option<ReaderId>,
    start_buffered_position: u64,
    last_read_position: u64,
}

impl FileDataSource {
    pub(crate) fn new(ring: Arc<RingBuffer>) -> Self {
        let start_buffered_position = ring.buffered_position();
        let reader = Some(ring.register_reader(start_buffered_position));
        Self {
            ring,
            reader,
            start_buffered_position,
            last_read_position: 0,
        }
    }

    fn read_ring(
        ring: &RingBuffer,
        reader: Option<ReaderId>,
        pos: u64,
        buf: &mut [u8],
    ) -> Result<usize> {
        match reader {
            Some(id) => ring.read_at_for(id, pos, buf),
            None => ring.read_at(pos, buf),
        }
    }

    /// Absolute stream position of the next read.
    pub fn position(&self) -> u64 {
        self.start_buffered_position + self.last_read_position
    }

    /// Reads `len` bytes on the tokio blocking pool.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn read_async(&mut self, len: usize) -> Result<Bytes> {
        let ring = Arc::clone(&self.ring);
        let pos = self.position();
        let reader = self.reader;
        let data = tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; len];
            let n = Self::read_ring(&ring, reader, pos, &mut buf)?;
            buf.truncate(n);
            Ok::<_, TsError>(Bytes::from(buf))
        })
        .await
        .map_err(|e| TsError::Io(std::io::Error::other(e)))??;
        self.last_read_position += data.len() as u64;
        Ok(data)
    }
}

impl TsDataSource for FileDataSource {
    fn open(&mut self) -> Result<Option<u64>> {
        self.last_read_position = 0;
        match self.reader {
            Some(id) => self.ring.seek_reader(id, self.start_buffered_position),
            None => self.reader = Some(self.ring.register_reader(self.start_buffered_position)),
        }
        Ok(None)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = Self::read_ring(&self.ring, self.reader, self.position(), buf)?;
        self.last_read_position += n as u64;
        Ok(n)
    }

    fn close(&mut self) {
        if let Some(id) = self.reader.take() {
            self.ring.unregister_reader(id);
        }
    }

    fn buffered_position(&self) -> u64 {
        self.ring
            .buffered_position()
            .saturating_sub(self.start_buffered_position)
    }

    fn last_read_position(&self) -> u64 {
        self.last_read_position
    }

    fn shift_start_position(&mut self, offset: u64) -> Result<()> {
        if self.last_read_position != 0 {
            return Err(TsError::Precondition(format!(
                "cannot shift start after {} bytes were read",
                self.last_read_position
            )));
        }
        let buffered = self.buffered_position();
        if offset > buffered {
            return Err(TsError::Precondition(format!(
                "shift of {} exceeds the {} buffered bytes",
                offset, buffered
            )));
        }
        self.start_buffered_position += offset;
        if let Some(id) = self.reader {
            self.ring.seek_reader(id, self.start_buffered_position);
        }
        Ok(())
    }
}

impl Drop for FileDataSource {
    fn drop(&mut self) {
        self.close();
    }
}
