use crate::config::StreamerConfig;
use crate::error::{Result, TsError};
use crate::format::ts::{PID_ATSC_SI_BASE, PID_DVB_EIT, PID_DVB_SDT, PID_PAT};
use crate::tuner::channel::StreamTarget;
use crate::tuner::data_source::FileDataSource;
use crate::tuner::event::EventDetector;
use crate::tuner::ring::RingBuffer;
use crate::tuner::source::StreamProvider;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

type SharedDetector = Arc<Mutex<Box<dyn EventDetector>>>;

/// Lifecycle of a [`FileTsStreamer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Stopped,
}

/// Simulates a live tuner by replaying an MPEG-2 TS capture file.
///
/// A producer thread reads the file in a loop, keeps the packets whose PID is
/// admitted and appends them to a circular buffer. Consumers read that buffer
/// by absolute position through [`read_at`](Self::read_at) or a
/// [`FileDataSource`].
///
/// ```rust,no_run
/// use tsfile::config::StreamerConfig;
/// use tsfile::tuner::{FileTsStreamer, NoopEventDetector, ScanChannel, StreamTarget, TsDataSource};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut streamer = FileTsStreamer::new(StreamerConfig::from_env(), NoopEventDetector)?;
/// streamer.start(&StreamTarget::Scan(ScanChannel::for_file(100, "capture.ts")))?;
///
/// let mut source = streamer.create_data_source();
/// let mut packet = [0u8; 188];
/// source.read(&mut packet)?;
///
/// streamer.stop();
/// # Ok(())
/// # }
/// ```
pub struct FileTsStreamer {
    config: StreamerConfig,
    ring: Arc<RingBuffer>,
    detector: SharedDetector,
    streaming_thread: Option<JoinHandle<()>>,
    state: SessionState,
}

impl FileTsStreamer {
    pub fn new(config: StreamerConfig, detector: impl EventDetector + 'static) -> Result<Self> {
        config.validate()?;
        let detector: Box<dyn EventDetector> = Box::new(detector);
        let ring = Arc::new(RingBuffer::new(
            config.circular_buffer_size,
            config.padding_size,
            config.read_timeout,
        ));
        Ok(Self {
            config,
            ring,
            detector: Arc::new(Mutex::new(detector)),
            streaming_thread: None,
            state: SessionState::Idle,
        })
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.ring.is_streaming()
    }

    /// Opens the capture file for `target` and starts the producer thread.
    ///
    /// Fails without spawning anything if the file cannot be opened. Starting
    /// an already streaming session is a no-op.
    pub fn start(&mut self, target: &StreamTarget) -> Result<()> {
        if self.ring.is_streaming() {
            debug!("Already streaming, ignoring start");
            return Ok(());
        }

        let filepath = match target {
            StreamTarget::Scan(channel) => self.config.stream_file(&channel.filename),
            StreamTarget::Channel(channel) => {
                info!("Tuning to channel file {}", channel.filepath.display());
                channel.filepath.clone()
            }
        };
        let mut source = StreamProvider::open(&filepath, self.config.read_buffer_size)?;

        self.detector.lock().start(&filepath, target.program());
        if let StreamTarget::Channel(channel) = target {
            source.filter_mut().extend(channel.pids());
        }
        source.add_pid_filter(PID_PAT);
        source.add_pid_filter(PID_ATSC_SI_BASE);
        if self.config.enable_dvb {
            source.add_pid_filter(PID_DVB_EIT);
            source.add_pid_filter(PID_DVB_SDT);
        }

        if !self.ring.begin() {
            return Ok(());
        }
        let ring = Arc::clone(&self.ring);
        let detector = Arc::clone(&self.detector);
        let underrun_sleep = self.config.underrun_sleep;
        let handle = thread::Builder::new()
            .name("ts-file-streamer".into())
            .spawn(move || run_producer(ring, source, detector, underrun_sleep))
            .map_err(|e| {
                self.ring.close();
                TsError::Io(e)
            })?;

        self.streaming_thread = Some(handle);
        self.state = SessionState::Streaming;
        info!("Streaming started");
        Ok(())
    }

    /// Stops streaming and waits for the producer thread to exit.
    ///
    /// Blocked readers are woken and fail with [`TsError::Stopped`]. When this
    /// returns the capture file is closed.
    pub fn stop(&mut self) {
        self.ring.close();
        if let Some(handle) = self.streaming_thread.take() {
            if handle.join().is_err() {
                error!("Streaming thread panicked");
            }
            self.ring.release();
            self.state = SessionState::Stopped;
        }
    }

    /// Total bytes produced since streaming started.
    pub fn buffered_position(&self) -> u64 {
        self.ring.buffered_position()
    }

    /// Reads `buf.len()` bytes at absolute position `pos`, blocking until the
    /// producer has written them. See [`RingBuffer::read_at`].
    pub fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        self.ring.read_at(pos, buf)
    }

    pub fn create_data_source(&self) -> FileDataSource {
        FileDataSource::new(Arc::clone(&self.ring))
    }

    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }
}

impl Drop for FileTsStreamer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Producer loop: keeps the ring buffer topped up from the capture file until
/// the stream is closed.
fn run_producer(
    ring: Arc<RingBuffer>,
    mut source: StreamProvider,
    detector: SharedDetector,
    underrun_sleep: Duration,
) {
    let mut data = vec![0u8; source.read_buffer_size()];

    while ring.wait_for_headroom() {
        let bytes_written = match source.read(&mut data) {
            Ok(n) => n,
            Err(e) => {
                debug!("Stream source read failed: {}", e);
                0
            }
        };
        if bytes_written == 0 {
            // Underrun; back off instead of spinning on the file.
            thread::sleep(underrun_sleep);
            continue;
        }

        if let Err(e) = detector
            .lock()
            .feed_ts_stream(&data[..bytes_written], source.filter_mut())
        {
            warn!("Event detector rejected stream data: {}", e);
        }

        if let Err(e) = ring.append(&data[..bytes_written]) {
            debug!("Dropping {} bytes: {}", bytes_written, e);
            break;
        }
    }

    info!("Streaming stopped");
    source.close();
}
