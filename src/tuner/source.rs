use crate::error::{Result, TsError};
use crate::format::ts::{PidFilter, TS_PACKET_SIZE, TS_SYNC_BYTE};
use log::{debug, error};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Provides an MPEG-2 transport stream from a local capture file, filtered by
/// PID.
///
/// The file plays in an endless loop: reaching the end reopens it from the
/// first byte, so callers see one continuous stream.
#[derive(Debug)]
pub struct StreamProvider {
    filepath: PathBuf,
    pids: PidFilter,
    pre_buffer: Vec<u8>,
    input: Option<BufReader<File>>,
}

impl StreamProvider {
    /// Opens `filepath` for sequential reads of `read_buffer_size` bytes.
    pub fn open(filepath: impl Into<PathBuf>, read_buffer_size: usize) -> Result<Self> {
        let filepath = filepath.into();
        let input = open_input(&filepath).map_err(|source| {
            error!("Error opening input stream {}: {}", filepath.display(), source);
            TsError::Open {
                path: filepath.clone(),
                source,
            }
        })?;
        Ok(Self {
            filepath,
            pids: PidFilter::new(),
            pre_buffer: vec![0; read_buffer_size],
            input: Some(input),
        })
    }

    /// Whether the file is currently open.
    pub fn is_ready(&self) -> bool {
        self.input.is_some()
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn filter(&self) -> &PidFilter {
        &self.pids
    }

    pub fn filter_mut(&mut self) -> &mut PidFilter {
        &mut self.pids
    }

    pub fn add_pid_filter(&mut self, pid: u16) {
        self.pids.add(pid);
    }

    /// Size of the scratch buffer; `read` output must be at least this large.
    pub fn read_buffer_size(&self) -> usize {
        self.pre_buffer.len()
    }

    /// Reads one chunk from the file and copies the admitted packets, packed
    /// back to back, to the start of `output`.
    ///
    /// Returns the number of bytes copied, which may be zero when no packet in
    /// the chunk was admitted. A chunk that does not start with the sync byte
    /// fails with [`TsError::Corrupt`]; desynced packets inside a chunk are
    /// skipped.
    pub fn read(&mut self, output: &mut [u8]) -> Result<usize> {
        if output.len() < self.pre_buffer.len() {
            return Err(TsError::InvalidRequest(format!(
                "output buffer of {} bytes is smaller than the read size {}",
                output.len(),
                self.pre_buffer.len()
            )));
        }

        let mut read_size = self.read_internal();
        if read_size == 0 {
            debug!("Reached the end of {}, restarting", self.filepath.display());
            self.close();
            let input = open_input(&self.filepath).map_err(|e| {
                error!("Error reopening input stream: {}", e);
                TsError::Io(e)
            })?;
            self.input = Some(input);
            read_size = self.read_internal();
            if read_size == 0 {
                return Ok(0);
            }
        }

        if self.pre_buffer[0] != TS_SYNC_BYTE {
            error!("Error reading input stream - no TS sync found");
            return Err(TsError::Corrupt(format!(
                "chunk starts with 0x{:02x} instead of the sync byte",
                self.pre_buffer[0]
            )));
        }

        let mut filtered_size = 0;
        for packet in self.pre_buffer[..read_size].chunks_exact(TS_PACKET_SIZE) {
            if self.pids.admits(packet) {
                output[filtered_size..filtered_size + TS_PACKET_SIZE].copy_from_slice(packet);
                filtered_size += TS_PACKET_SIZE;
            }
        }
        Ok(filtered_size)
    }

    /// Fills the scratch buffer as far as the file allows. Read errors count as
    /// end of stream.
    fn read_internal(&mut self) -> usize {
        let Some(input) = self.input.as_mut() else {
            return 0;
        };
        let mut filled = 0;
        while filled < self.pre_buffer.len() {
            match input.read(&mut self.pre_buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Error reading input stream: {}", e);
                    return 0;
                }
            }
        }
        filled
    }

    /// Closes the file. A later `read` reopens it from the start.
    pub fn close(&mut self) {
        self.input = None;
    }
}

fn open_input(path: &Path) -> std::io::Result<BufReader<File>> {
    File::open(path).map(BufReader::new)
}
