#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use tsfile::config::{StreamerConfig, MIN_READ_UNIT};
    use tsfile::format::ts::{
        packet_pid, PidFilter, TSHeader, PID_ATSC_SI_BASE, PID_DVB_EIT, PID_DVB_SDT, PID_PAT,
        TS_PACKET_SIZE,
    };
    use tsfile::tuner::{
        EventDetector, FileTsStreamer, NoopEventDetector, ProgramSelector, RingBuffer,
        ScanChannel, SessionState, StreamTarget, TsDataSource, TunerChannel,
    };
    use tsfile::{Result, TsError};

    const VIDEO_PID: u16 = 0x31;
    const AUDIO_PID: u16 = 0x34;
    const PCR_PID: u16 = 0x30;
    const OTHER_PID: u16 = 0x200;

    fn write_capture(dir: &Path, name: &str, pids: &[u16]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for (i, &pid) in pids.iter().enumerate() {
            file.write_all(&TSHeader::with_pid(pid).to_packet(i as u8)).unwrap();
        }
        file.flush().unwrap();
        path
    }

    fn small_config(dir: &Path) -> StreamerConfig {
        StreamerConfig::default()
            .with_stream_dir(dir)
            .with_buffer_sizes(4 * MIN_READ_UNIT, MIN_READ_UNIT)
            .with_read_buffer_size(MIN_READ_UNIT)
            .with_read_timeout(Duration::from_secs(5))
            .with_underrun_sleep(Duration::from_millis(1))
    }

    fn scan(name: &str) -> StreamTarget {
        StreamTarget::Scan(ScanChannel::for_file(100, name))
    }

    fn read_pids(streamer: &FileTsStreamer, count: usize) -> Vec<u16> {
        let mut buf = vec![0u8; count * TS_PACKET_SIZE];
        assert_eq!(streamer.read_at(0, &mut buf).unwrap(), buf.len());
        buf.chunks_exact(TS_PACKET_SIZE)
            .map(|packet| packet_pid(packet).unwrap())
            .collect()
    }

    #[derive(Default)]
    struct RecordingDetector {
        started: Arc<Mutex<Vec<(PathBuf, ProgramSelector)>>>,
        fed: Arc<Mutex<Vec<u8>>>,
        admit_on_feed: Option<u16>,
    }

    impl EventDetector for RecordingDetector {
        fn start(&mut self, filepath: &Path, program: ProgramSelector) {
            self.started.lock().push((filepath.to_path_buf(), program));
        }

        fn feed_ts_stream(&mut self, data: &[u8], filter: &mut PidFilter) -> Result<()> {
            self.fed.lock().extend_from_slice(data);
            if let Some(pid) = self.admit_on_feed.take() {
                filter.add(pid);
            }
            Err(TsError::Corrupt("detector errors are not fatal".into()))
        }
    }

    fn setup(pids: &[u16]) -> (TempDir, FileTsStreamer) {
        let dir = tempfile::tempdir().unwrap();
        write_capture(dir.path(), "capture.ts", pids);
        let streamer = FileTsStreamer::new(small_config(dir.path()), NoopEventDetector).unwrap();
        (dir, streamer)
    }

    #[test]
    fn test_missing_file_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut streamer =
            FileTsStreamer::new(small_config(dir.path()), NoopEventDetector).unwrap();

        let err = streamer.start(&scan("missing.ts")).unwrap_err();
        assert!(matches!(err, TsError::Open { .. }));
        assert!(!streamer.is_streaming());
        assert_eq!(streamer.state(), SessionState::Idle);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StreamerConfig::default().with_buffer_sizes(MIN_READ_UNIT, MIN_READ_UNIT);
        assert!(FileTsStreamer::new(config, NoopEventDetector).is_err());
    }

    #[test]
    fn test_scan_admits_table_pids_and_loops() {
        let (_dir, mut streamer) = setup(&[PID_PAT, OTHER_PID, PID_ATSC_SI_BASE, PID_DVB_SDT]);
        streamer.start(&scan("capture.ts")).unwrap();
        assert_eq!(streamer.state(), SessionState::Streaming);

        assert_eq!(
            read_pids(&streamer, 6),
            vec![PID_PAT, PID_ATSC_SI_BASE, PID_PAT, PID_ATSC_SI_BASE, PID_PAT, PID_ATSC_SI_BASE]
        );
        assert!(streamer.buffered_position() >= (6 * TS_PACKET_SIZE) as u64);

        streamer.stop();
        assert_eq!(streamer.state(), SessionState::Stopped);
        assert!(!streamer.is_streaming());
    }

    #[test]
    fn test_dvb_flag_admits_dvb_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_capture(dir.path(), "capture.ts", &[PID_DVB_EIT, OTHER_PID, PID_DVB_SDT]);
        let config = small_config(dir.path()).with_dvb(true);
        let mut streamer = FileTsStreamer::new(config, NoopEventDetector).unwrap();
        streamer.start(&scan("capture.ts")).unwrap();

        assert_eq!(read_pids(&streamer, 2), vec![PID_DVB_EIT, PID_DVB_SDT]);
    }

    #[test]
    fn test_channel_admits_elementary_pids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_capture(
            dir.path(),
            "channel.ts",
            &[VIDEO_PID, OTHER_PID, AUDIO_PID, PCR_PID, 0x35, PID_PAT],
        );
        let mut streamer =
            FileTsStreamer::new(small_config(dir.path()), NoopEventDetector).unwrap();
        let channel = TunerChannel {
            filepath: path,
            program_number: 1,
            video_pid: VIDEO_PID,
            audio_pids: vec![AUDIO_PID],
            pcr_pid: PCR_PID,
        };
        streamer.start(&StreamTarget::Channel(channel)).unwrap();

        assert_eq!(
            read_pids(&streamer, 4),
            vec![VIDEO_PID, AUDIO_PID, PCR_PID, PID_PAT]
        );
    }

    #[test]
    fn test_start_is_idempotent() {
        let (_dir, mut streamer) = setup(&[PID_PAT]);
        streamer.start(&scan("capture.ts")).unwrap();
        streamer.start(&scan("does-not-matter.ts")).unwrap();
        assert_eq!(read_pids(&streamer, 1), vec![PID_PAT]);
    }

    #[test]
    fn test_restart_after_stop() {
        let (_dir, mut streamer) = setup(&[PID_PAT, PID_ATSC_SI_BASE]);
        streamer.start(&scan("capture.ts")).unwrap();
        read_pids(&streamer, 2);
        streamer.stop();

        let mut buf = [0u8; TS_PACKET_SIZE];
        assert!(matches!(streamer.read_at(0, &mut buf), Err(TsError::Stopped)));

        streamer.start(&scan("capture.ts")).unwrap();
        assert_eq!(read_pids(&streamer, 2), vec![PID_PAT, PID_ATSC_SI_BASE]);
    }

    #[test]
    fn test_stop_wakes_blocked_reader() {
        // Nothing in the file is admitted, so the reader waits forever.
        let (_dir, mut streamer) = setup(&[OTHER_PID]);
        streamer.start(&scan("capture.ts")).unwrap();

        let ring = Arc::clone(streamer.ring());
        let reader = thread::spawn(move || {
            let mut buf = [0u8; TS_PACKET_SIZE];
            ring.read_at(0, &mut buf)
        });
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        streamer.stop();
        assert!(matches!(reader.join().unwrap(), Err(TsError::Stopped)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_stalled_stream_times_out() {
        let dir = tempfile::tempdir().unwrap();
        write_capture(dir.path(), "capture.ts", &[OTHER_PID]);
        let config = small_config(dir.path()).with_read_timeout(Duration::from_millis(200));
        let mut streamer = FileTsStreamer::new(config, NoopEventDetector).unwrap();
        streamer.start(&scan("capture.ts")).unwrap();

        let mut buf = [0u8; TS_PACKET_SIZE];
        let started = Instant::now();
        let err = streamer.read_at(0, &mut buf).unwrap_err();
        let elapsed = started.elapsed();
        assert!(matches!(err, TsError::Stall(_)));
        assert!(err.is_retryable());
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_detector_sees_stream_and_extends_filter() {
        let dir = tempfile::tempdir().unwrap();
        write_capture(dir.path(), "capture.ts", &[PID_PAT, VIDEO_PID]);
        let detector = RecordingDetector {
            admit_on_feed: Some(VIDEO_PID),
            ..RecordingDetector::default()
        };
        let started = Arc::clone(&detector.started);
        let fed = Arc::clone(&detector.fed);
        let mut streamer = FileTsStreamer::new(small_config(dir.path()), detector).unwrap();
        streamer.start(&scan("capture.ts")).unwrap();

        // The first chunk holds only the PAT; the detector then admits the video PID.
        assert_eq!(read_pids(&streamer, 3), vec![PID_PAT, PID_PAT, VIDEO_PID]);
        streamer.stop();

        assert_eq!(
            started.lock().clone(),
            vec![(dir.path().join("capture.ts"), ProgramSelector::All)]
        );
        let fed = fed.lock();
        assert_eq!(
            fed[..3 * TS_PACKET_SIZE]
                .chunks_exact(TS_PACKET_SIZE)
                .map(|p| packet_pid(p).unwrap())
                .collect::<Vec<_>>(),
            vec![PID_PAT, PID_PAT, VIDEO_PID]
        );
    }

    #[test]
    fn test_concurrent_readers_make_progress() {
        let dir = tempfile::tempdir().unwrap();
        write_capture(dir.path(), "capture.ts", &[PID_PAT, OTHER_PID, PID_ATSC_SI_BASE]);
        let config = StreamerConfig::default()
            .with_stream_dir(dir.path())
            .with_read_timeout(Duration::from_secs(5));
        let mut streamer = FileTsStreamer::new(config, NoopEventDetector).unwrap();
        streamer.start(&scan("capture.ts")).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let mut source = streamer.create_data_source();
                thread::spawn(move || {
                    source.open().unwrap();
                    let mut packet = [0u8; TS_PACKET_SIZE];
                    for _ in 0..200 {
                        assert_eq!(source.read(&mut packet).unwrap(), TS_PACKET_SIZE);
                        let pid = packet_pid(&packet).unwrap();
                        assert!(pid == PID_PAT || pid == PID_ATSC_SI_BASE);
                    }
                    source.last_read_position()
                })
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), (200 * TS_PACKET_SIZE) as u64);
        }
        streamer.stop();
    }

    #[test]
    fn test_data_source_shift_skips_prefix() {
        let (_dir, mut streamer) = setup(&[PID_PAT, PID_ATSC_SI_BASE]);
        streamer.start(&scan("capture.ts")).unwrap();

        // Wait until the producer has buffered at least one packet.
        let mut probe = [0u8; TS_PACKET_SIZE];
        streamer.read_at(0, &mut probe).unwrap();

        let mut source = streamer.create_data_source();
        let start = streamer.buffered_position();
        assert_eq!(start % TS_PACKET_SIZE as u64, 0);

        let mut packet = [0u8; TS_PACKET_SIZE];
        source.read(&mut packet).unwrap();
        assert_eq!(packet[0], 0x47);
        assert!(matches!(
            source.shift_start_position(0),
            Err(TsError::Precondition(_))
        ));
    }

    #[test]
    fn test_buffered_position_scenario() {
        let ring = Arc::new(RingBuffer::new(
            4 * MIN_READ_UNIT,
            MIN_READ_UNIT,
            Duration::from_secs(5),
        ));
        assert!(ring.begin());

        let packets: Vec<_> = (0..4u8)
            .map(|i| TSHeader::with_pid(PID_PAT).to_packet(i))
            .collect();
        for packet in &packets[..3] {
            assert!(ring.wait_for_headroom());
            ring.append(packet).unwrap();
        }
        assert_eq!(ring.buffered_position(), 564);

        let mut buf = [0u8; TS_PACKET_SIZE];
        assert_eq!(ring.read_at(0, &mut buf).unwrap(), TS_PACKET_SIZE);
        assert_eq!(&buf[..], &packets[0][..]);

        let reader = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let mut buf = [0u8; TS_PACKET_SIZE];
                ring.read_at(564, &mut buf).map(|_| buf.to_vec())
            })
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!reader.is_finished());

        ring.append(&packets[3]).unwrap();
        assert_eq!(reader.join().unwrap().unwrap(), packets[3].to_vec());
    }
}
