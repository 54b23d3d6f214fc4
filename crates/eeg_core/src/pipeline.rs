//! Pipeline de decodificação e publicação.
//!
//! bytes → [`FrameBuffer`] → [`FrameValidator`] → [`extract`] →
//! [`TelemetryState`] → feedback + publisher + snapshot.
//!
//! Um único dono (o loop principal) chama [`Pipeline::poll`] para sempre.
//! Nada aqui é fatal: frame inválido é logado e descartado, falha de envio
//! vira [`FeedbackEvent::PublishFailed`].

use crate::config::AppConfig;
use crate::feedback::{FeedbackController, FeedbackEvent};
use crate::frame_buffer::FrameBuffer;
use crate::protocol::{FrameValidator, extract, extract_detail};
use crate::publisher::Publisher;
use crate::snapshot::SnapshotWriter;
use crate::state::TelemetryState;
use crate::types::{EEG_BANDS, RawFrame, hex_dump};
use std::io;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fonte de bytes (UART). `read_available` nunca bloqueia por muito tempo
/// e pode devolver zero bytes.
pub trait ByteSource: Send {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Contadores acumulados desde a partida.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub bytes_read: u64,
    pub frames_accepted: u64,
    pub frames_rejected: u64,
    pub discarded_bytes: u64,
    pub publish_failures: u64,
}

pub struct Pipeline {
    buffer: FrameBuffer,
    validator: FrameValidator,
    state: TelemetryState,
    publisher: Option<Publisher>,
    feedback: FeedbackController,
    snapshot: Option<SnapshotWriter>,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(
        config: &AppConfig,
        publisher: Option<Publisher>,
        feedback: FeedbackController,
        snapshot: Option<SnapshotWriter>,
        now: Instant,
    ) -> Self {
        Self {
            buffer: FrameBuffer::new(config.frame.size),
            validator: FrameValidator::new(config.frame.size, config.frame.verify_checksum),
            state: TelemetryState::new(config.state.settings(), now),
            publisher,
            feedback,
            snapshot,
            stats: PipelineStats::default(),
        }
    }

    pub fn state(&self) -> &TelemetryState {
        &self.state
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            discarded_bytes: self.buffer.discarded_bytes(),
            ..self.stats
        }
    }

    /// Dispara um evento fora do fluxo de frames (partida, sondagem).
    pub fn notify(&mut self, event: FeedbackEvent) {
        self.feedback.handle(event);
    }

    /// Sondagem única do destino. Sem publisher o destino conta como pronto.
    pub fn probe_sink(&mut self) -> FeedbackEvent {
        let reachable = self.publisher.as_mut().map_or(true, |p| p.probe());
        let event = if reachable {
            FeedbackEvent::SinkReady
        } else {
            FeedbackEvent::SinkUnreachable
        };
        self.feedback.handle(event);
        event
    }

    /// Uma iteração: lê a fonte, processa o que houver e checa silêncio.
    pub fn poll(&mut self, source: &mut dyn ByteSource, scratch: &mut [u8], now: Instant) -> Vec<FeedbackEvent> {
        let mut events = Vec::new();

        match source.read_available(scratch) {
            Ok(0) => {}
            Ok(n) => events.extend(self.ingest(&scratch[..n], now)),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {}
            Err(e) => warn!("Erro ao ler serial: {e}"),
        }

        events.extend(self.tick(now));
        events
    }

    /// Processa bytes recém-lidos e retorna os eventos emitidos, em ordem.
    pub fn ingest(&mut self, bytes: &[u8], now: Instant) -> Vec<FeedbackEvent> {
        self.stats.bytes_read += bytes.len() as u64;
        debug!("Serial: {}", hex_dump(bytes));
        self.buffer.ingest(bytes);

        let mut events = Vec::new();
        while let Some(frame) = self.buffer.try_extract_frame() {
            self.process_frame(&frame, now, &mut events);
        }
        events
    }

    /// Checagem de silêncio.
    pub fn tick(&mut self, now: Instant) -> Option<FeedbackEvent> {
        let event = self.state.check_timeout(now)?;
        self.feedback.handle(event);
        Some(event)
    }

    fn process_frame(&mut self, frame: &RawFrame, now: Instant, events: &mut Vec<FeedbackEvent>) {
        if let Err(e) = self.validator.check(frame.as_bytes()) {
            self.stats.frames_rejected += 1;
            warn!("Frame rejeitado: {e}");
            debug!("Frame rejeitado: {}", frame.hex());
            return;
        }
        self.stats.frames_accepted += 1;

        let record = extract(frame);
        debug!(
            "Frame válido | sinal={} att={} med={} α={} β={} γ={}",
            record.signal_present, record.attention, record.meditation, record.alpha, record.beta, record.gamma
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let detail = extract_detail(frame);
            for (band, power) in EEG_BANDS.iter().zip(detail.band_powers) {
                tracing::trace!("{band}: {power}");
            }
            tracing::trace!("poor_signal: {}", detail.poor_signal);
        }

        if let Some(event) = self.state.on_record(&record, now) {
            self.feedback.handle(event);
            events.push(event);
        }

        if let Some(snapshot) = &self.snapshot {
            snapshot.publish(record);
        }

        if let Some(publisher) = self.publisher.as_mut() {
            if publisher.publish(frame, &record).is_err() {
                self.stats.publish_failures += 1;
                self.feedback.handle(FeedbackEvent::PublishFailed);
                events.push(FeedbackEvent::PublishFailed);
            }
        }
    }

    /// Loga os contadores.
    pub fn log_stats(&self) {
        let s = self.stats();
        info!(
            "Estatísticas | bytes={} válidos={} rejeitados={} descartados={} falhas_envio={}",
            s.bytes_read, s.frames_accepted, s.frames_rejected, s.discarded_bytes, s.publish_failures
        );
    }
}
