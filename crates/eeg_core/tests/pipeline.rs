//! Cenários ponta a ponta do pipeline com colaboradores falsos.

use eeg_core::config::{AppConfig, FeedbackConfig};
use eeg_core::feedback::{Cue, CuePlayer, FeedbackError, Indicator, Rgb};
use eeg_core::protocol::{FRAME_MARKER, FRAME_SIZE_FULL};
use eeg_core::snapshot::latest_slot;
use eeg_core::{
    ByteSource, FeedbackController, FeedbackEvent, Pipeline, PublishError, Publisher, RawFrame, SignalQuality,
    TelemetryRecord, Transport,
};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ──────────────────────────────────────────────
// Falsos
// ──────────────────────────────────────────────

#[derive(Clone, Default)]
struct Cues(Arc<Mutex<Vec<Cue>>>);

impl CuePlayer for Cues {
    fn play(&mut self, cue: Cue) -> Result<(), FeedbackError> {
        self.0.lock().unwrap().push(cue);
        Ok(())
    }
}

struct Led;

impl Indicator for Led {
    fn set(&mut self, _color: Rgb) -> Result<(), FeedbackError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Sink {
    reachable: bool,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Transport for Sink {
    fn describe(&self) -> String {
        "mock://sink".into()
    }

    fn probe(&mut self) -> Result<(), PublishError> {
        if self.reachable {
            Ok(())
        } else {
            Err(PublishError::Unreachable("mock://sink".into()))
        }
    }

    fn send(&mut self, frame: &RawFrame, _record: &TelemetryRecord) -> Result<(), PublishError> {
        self.sent.lock().unwrap().push(frame.as_bytes().to_vec());
        Ok(())
    }
}

struct Chunks(VecDeque<Vec<u8>>);

impl ByteSource for Chunks {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(chunk) = self.0.pop_front() else {
            return Ok(0);
        };
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

// ──────────────────────────────────────────────
// Auxiliares
// ──────────────────────────────────────────────

/// Marcador + 27 bytes de preenchimento + 04 att 05 med + 1 byte.
fn frame(attention: u8, meditation: u8, bands: [u8; 3]) -> Vec<u8> {
    let mut f = FRAME_MARKER.to_vec();
    f.extend_from_slice(&[0x11; 27]);
    f.extend_from_slice(&[0x04, attention, 0x05, meditation, 0x11]);
    f[17] = bands[0];
    f[23] = bands[1];
    f[29] = bands[2];
    assert_eq!(f.len(), FRAME_SIZE_FULL);
    f
}

fn config(silence_secs: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.state.silence_timeout_secs = silence_secs;
    config
}

fn controller(cues: &Cues) -> FeedbackController {
    let quiet = FeedbackConfig {
        blink_period_ms: 0,
        ..Default::default()
    };
    FeedbackController::new(Box::new(cues.clone()), Box::new(Led), &quiet)
}

fn pipeline_with(sink: Option<Sink>, cues: &Cues, t0: Instant) -> Pipeline {
    let publisher = sink.map(|s| Publisher::new(Box::new(s)));
    Pipeline::new(&config(100), publisher, controller(cues), None, t0)
}

// ──────────────────────────────────────────────
// Cenários
// ──────────────────────────────────────────────

#[test]
fn zero_frame_yields_absent_record() {
    let t0 = Instant::now();
    let cues = Cues::default();
    let sink = Sink {
        reachable: true,
        ..Default::default()
    };
    let mut p = pipeline_with(Some(sink.clone()), &cues, t0);
    assert_eq!(p.probe_sink(), FeedbackEvent::SinkReady);

    let events = p.ingest(&frame(0x00, 0x00, [0x10, 0x20, 0x30]), t0);

    assert_eq!(events, vec![FeedbackEvent::FirstSignal(SignalQuality::Absence)]);
    assert_eq!(p.state().snapshot(), TelemetryRecord::ZERO);
    assert_eq!(sink.sent.lock().unwrap().len(), 1);
    assert_eq!(cues.0.lock().unwrap().as_slice(), [Cue::Ready, Cue::SignalAbsent]);
}

#[test]
fn live_frame_yields_clamped_record() {
    let t0 = Instant::now();
    let cues = Cues::default();
    let mut p = pipeline_with(None, &cues, t0);

    let events = p.ingest(&frame(0x32, 0x28, [0x10, 0x20, 0x30]), t0);

    assert_eq!(events, vec![FeedbackEvent::FirstSignal(SignalQuality::Presence)]);
    assert_eq!(
        p.state().snapshot(),
        TelemetryRecord {
            signal_present: true,
            attention: 50,
            meditation: 40,
            alpha: 16,
            beta: 32,
            gamma: 48,
        }
    );
}

#[test]
fn unreachable_sink_does_not_stop_decoding() {
    let t0 = Instant::now();
    let cues = Cues::default();
    let sink = Sink::default();
    let mut p = pipeline_with(Some(sink.clone()), &cues, t0);
    assert_eq!(p.probe_sink(), FeedbackEvent::SinkUnreachable);

    let mut failures = 0;
    for i in 0..3u8 {
        let events = p.ingest(&frame(10 + i, 20, [1, 2, 3]), t0);
        failures += events.iter().filter(|e| **e == FeedbackEvent::PublishFailed).count();
    }

    assert_eq!(failures, 3);
    assert!(sink.sent.lock().unwrap().is_empty());
    assert_eq!(p.state().snapshot().attention, 12);
    let stats = p.stats();
    assert_eq!(stats.frames_accepted, 3);
    assert_eq!(stats.publish_failures, 3);
}

#[test]
fn unreachable_sink_keeps_loop_fast() {
    let t0 = Instant::now();
    let cues = Cues::default();
    let feedback = FeedbackController::new(Box::new(cues.clone()), Box::new(Led), &FeedbackConfig::default());
    let publisher = Publisher::new(Box::new(Sink::default()));
    let mut p = Pipeline::new(&config(100), Some(publisher), feedback, None, t0);
    assert_eq!(p.probe_sink(), FeedbackEvent::SinkUnreachable);

    let mut stream = Vec::new();
    for i in 0..3u8 {
        stream.extend(frame(10 + i, 20, [1, 2, 3]));
    }

    let started = Instant::now();
    let events = p.ingest(&stream, t0);
    let took = started.elapsed();

    assert_eq!(events.iter().filter(|e| **e == FeedbackEvent::PublishFailed).count(), 3);
    assert!(took < Duration::from_millis(200), "3 frames levaram {took:?}");
}

#[test]
fn push_sends_raw_frame_bytes() {
    let t0 = Instant::now();
    let cues = Cues::default();
    let sink = Sink {
        reachable: true,
        ..Default::default()
    };
    let mut p = pipeline_with(Some(sink.clone()), &cues, t0);
    p.probe_sink();

    let f = frame(50, 40, [10, 20, 30]);
    p.ingest(&f, t0);
    assert_eq!(sink.sent.lock().unwrap().as_slice(), [f]);
}

#[test]
fn first_signal_fires_once_over_stream() {
    let t0 = Instant::now();
    let cues = Cues::default();
    let mut p = pipeline_with(None, &cues, t0);

    let mut stream = Vec::new();
    for i in 0..20u8 {
        stream.extend(frame(i, 30, [5, 5, 5]));
    }

    let events = p.ingest(&stream, t0);
    let firsts = events
        .iter()
        .filter(|e| matches!(e, FeedbackEvent::FirstSignal(_)))
        .count();
    assert_eq!(firsts, 1);
    assert_eq!(p.stats().frames_accepted, 20);
}

#[test]
fn noisy_byte_stream_resynchronizes() {
    let t0 = Instant::now();
    let cues = Cues::default();
    let mut p = pipeline_with(None, &cues, t0);

    let mut stream = vec![0xAA, 0x01, 0xAA, 0xAA, 0x20];
    stream.extend(frame(50, 40, [1, 1, 1]));
    // Frame com sentinela corrompido
    let mut bad = frame(60, 40, [1, 1, 1]);
    bad[31] = 0x09;
    stream.extend(bad);
    stream.extend(frame(70, 40, [1, 1, 1]));

    let mut source = Chunks(stream.chunks(7).map(<[u8]>::to_vec).collect());
    let mut scratch = [0u8; 64];
    for _ in 0..64 {
        p.poll(&mut source, &mut scratch, t0);
    }

    let stats = p.stats();
    assert_eq!(stats.frames_accepted, 2);
    assert_eq!(stats.frames_rejected, 1);
    assert_eq!(stats.discarded_bytes, 5);
    assert_eq!(p.state().snapshot().attention, 70);
}

#[test]
fn stale_alert_repeats_once_per_window() {
    let t0 = Instant::now();
    let cues = Cues::default();
    let mut p = pipeline_with(None, &cues, t0);
    p.ingest(&frame(50, 40, [1, 1, 1]), t0);

    let mut source = Chunks(VecDeque::new());
    let mut scratch = [0u8; 64];
    let mut stale_at = Vec::new();
    for s in 0..=350u64 {
        let now = t0 + Duration::from_secs(s);
        if p.poll(&mut source, &mut scratch, now).contains(&FeedbackEvent::StaleSignal) {
            stale_at.push(s);
        }
    }

    assert_eq!(stale_at, vec![101, 201, 301]);
    let played = cues.0.lock().unwrap().clone();
    assert_eq!(played.iter().filter(|c| **c == Cue::SignalAbsent).count(), 3);
}

#[test]
fn pull_snapshot_sees_latest_record() {
    let t0 = Instant::now();
    let cues = Cues::default();
    let (writer, mut reader) = latest_slot(TelemetryRecord::ZERO);
    let mut p = Pipeline::new(&config(100), None, controller(&cues), Some(writer), t0);

    p.ingest(&frame(50, 40, [10, 20, 30]), t0);
    p.ingest(&frame(80, 40, [10, 20, 30]), t0);

    assert_eq!(reader.latest().attention, 80);
}
