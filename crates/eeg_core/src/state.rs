//! Máquina de estados da telemetria.
//!
//! ```text
//! Unseen ──(1º frame válido)──► Tracking{Presence|Absence}
//! ```
//!
//! Sem estado terminal. Avança somente em frames estruturalmente válidos e
//! na checagem periódica de silêncio, feita a cada iteração do loop.

use crate::feedback::FeedbackEvent;
use crate::types::{SignalQuality, TelemetryRecord};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Quando a volta do sinal (Absence → Presence) deve ser anunciada.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Nunca; só o primeiro frame é anunciado.
    Never,
    /// Uma vez por processo, se o primeiro anúncio foi de ausência.
    #[default]
    Once,
    /// A cada transição Absence → Presence.
    EveryTime,
}

/// Fase do rastreamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unseen,
    Tracking(SignalQuality),
}

/// Parâmetros da máquina de estados.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSettings {
    pub silence_timeout: Duration,
    pub recovery_policy: RecoveryPolicy,
    /// Só alerta silêncio depois do primeiro frame válido.
    pub stale_requires_first_frame: bool,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            silence_timeout: Duration::from_secs(100),
            recovery_policy: RecoveryPolicy::default(),
            stale_requires_first_frame: false,
        }
    }
}

/// Estado de escritor único, mantido pelo loop principal.
#[derive(Debug, Clone)]
pub struct TelemetryState {
    settings: StateSettings,
    phase: Phase,
    last_announced_quality: Option<SignalQuality>,
    last_valid: Instant,
    last_reminder: Option<Instant>,
    latest: TelemetryRecord,
}

impl TelemetryState {
    pub fn new(settings: StateSettings, now: Instant) -> Self {
        Self {
            settings,
            phase: Phase::Unseen,
            last_announced_quality: None,
            last_valid: now,
            last_reminder: None,
            latest: TelemetryRecord::ZERO,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn first_signal_seen(&self) -> bool {
        self.phase != Phase::Unseen
    }

    /// Cópia do registro mais recente.
    pub fn snapshot(&self) -> TelemetryRecord {
        self.latest
    }

    /// Aplica um registro aceito.
    pub fn on_record(&mut self, record: &TelemetryRecord, now: Instant) -> Option<FeedbackEvent> {
        self.last_valid = now;
        self.last_reminder = None;
        self.latest = *record;

        let quality = record.quality();
        let previous = self.phase;
        self.phase = Phase::Tracking(quality);

        if previous == Phase::Unseen {
            info!("Primeiro frame válido: {quality:?}");
            self.last_announced_quality = Some(quality);
            return Some(FeedbackEvent::FirstSignal(quality));
        }

        match (self.last_announced_quality, quality) {
            (Some(SignalQuality::Absence), SignalQuality::Presence) => match self.settings.recovery_policy {
                RecoveryPolicy::Never => None,
                RecoveryPolicy::Once | RecoveryPolicy::EveryTime => {
                    info!("Sinal recuperado");
                    self.last_announced_quality = Some(SignalQuality::Presence);
                    Some(FeedbackEvent::SignalRecovered)
                }
            },
            (Some(SignalQuality::Presence), SignalQuality::Absence) => {
                // Queda não é anunciada; com EveryTime apenas rearma o próximo anúncio.
                if self.settings.recovery_policy == RecoveryPolicy::EveryTime {
                    self.last_announced_quality = Some(SignalQuality::Absence);
                }
                None
            }
            _ => None,
        }
    }

    /// Checagem de silêncio por relógio de parede.
    ///
    /// Dispara [`FeedbackEvent::StaleSignal`] no máximo uma vez por janela
    /// de `silence_timeout`.
    pub fn check_timeout(&mut self, now: Instant) -> Option<FeedbackEvent> {
        if self.settings.stale_requires_first_frame && self.phase == Phase::Unseen {
            return None;
        }

        let timeout = self.settings.silence_timeout;
        let silent_for = now.saturating_duration_since(self.last_valid);
        if silent_for <= timeout {
            return None;
        }

        if let Some(reminder) = self.last_reminder {
            if now.saturating_duration_since(reminder) < timeout {
                return None;
            }
        }

        warn!("Sem frames válidos há {:.0}s", silent_for.as_secs_f64());
        self.last_reminder = Some(now);
        Some(FeedbackEvent::StaleSignal)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
