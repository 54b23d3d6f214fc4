//! Eventos de feedback e tabela evento → ação.
//!
//! O controlador não decodifica nada: recebe eventos da máquina de estados
//! e do publisher e aciona dois colaboradores externos, o tocador de sons
//! (bloqueante) e o LED RGB.

use crate::config::FeedbackConfig;
use crate::types::SignalQuality;
use std::time::Duration;
use tracing::{debug, warn};

// ──────────────────────────────────────────────
// Eventos
// ──────────────────────────────────────────────

/// Evento discreto consumido pelo [`FeedbackController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackEvent {
    /// Processo iniciando.
    Startup,
    /// Destino de rede respondeu à sondagem (ou não precisa dela).
    SinkReady,
    /// Sondagem inicial falhou.
    SinkUnreachable,
    /// Primeiro frame válido da vida do processo.
    FirstSignal(SignalQuality),
    /// Sinal voltou depois de um período sem contato.
    SignalRecovered,
    /// Nenhum frame válido dentro do limite de silêncio.
    StaleSignal,
    /// Envio ao destino falhou.
    PublishFailed,
}

/// Sons pré-gravados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Boot,
    Ready,
    SignalPresent,
    SignalAbsent,
}

/// Cor RGB do indicador.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Converte uma string hex "#RRGGBB" para [`Rgb`].
pub fn parse_hex(hex: &str) -> Option<Rgb> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgb::new(r, g, b))
}

/// Ação concreta sobre os colaboradores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackAction {
    PlayCue(Cue),
    SetColor(Rgb),
    /// Liga/desliga `times` vezes e termina apagado.
    Blink { color: Rgb, times: u8 },
}

/// Cores usadas pelo indicador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub idle: Rgb,
    pub alert: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            idle: Rgb::new(0, 0, 255),
            alert: Rgb::new(255, 0, 0),
        }
    }
}

/// Tabela fixa evento → ações, independente de tempo.
pub fn actions_for(event: FeedbackEvent, palette: &Palette, blink_times: u8) -> Vec<FeedbackAction> {
    use FeedbackAction::*;

    match event {
        FeedbackEvent::Startup => vec![SetColor(palette.idle), PlayCue(Cue::Boot)],
        FeedbackEvent::SinkReady => vec![PlayCue(Cue::Ready), SetColor(palette.idle)],
        FeedbackEvent::SinkUnreachable => vec![SetColor(palette.alert)],
        FeedbackEvent::FirstSignal(SignalQuality::Presence) => vec![PlayCue(Cue::SignalPresent)],
        FeedbackEvent::FirstSignal(SignalQuality::Absence) => vec![PlayCue(Cue::SignalAbsent)],
        FeedbackEvent::SignalRecovered => vec![PlayCue(Cue::SignalPresent)],
        FeedbackEvent::StaleSignal => vec![
            PlayCue(Cue::SignalAbsent),
            Blink {
                color: palette.alert,
                times: blink_times,
            },
            SetColor(palette.idle),
        ],
        // Dispara a cada frame com destino fora do ar; não pode bloquear o loop.
        FeedbackEvent::PublishFailed => vec![SetColor(palette.alert)],
    }
}

// ──────────────────────────────────────────────
// Colaboradores
// ──────────────────────────────────────────────

/// Falha de um colaborador (sempre apenas logada).
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("Falha ao tocar som {cue:?}: {reason}")]
    Audio { cue: Cue, reason: String },

    #[error("Falha no indicador: {0}")]
    Indicator(String),
}

/// Tocador de sons; `play` bloqueia até o fim da reprodução.
pub trait CuePlayer: Send {
    fn play(&mut self, cue: Cue) -> Result<(), FeedbackError>;
}

/// LED tricolor.
pub trait Indicator: Send {
    fn set(&mut self, color: Rgb) -> Result<(), FeedbackError>;
}

// ──────────────────────────────────────────────
// Controlador
// ──────────────────────────────────────────────

/// Executa a tabela de ações sobre os colaboradores.
pub struct FeedbackController {
    player: Box<dyn CuePlayer>,
    indicator: Box<dyn Indicator>,
    palette: Palette,
    blink_times: u8,
    blink_period: Duration,
}

impl FeedbackController {
    pub fn new(player: Box<dyn CuePlayer>, indicator: Box<dyn Indicator>, config: &FeedbackConfig) -> Self {
        Self {
            player,
            indicator,
            palette: config.palette(),
            blink_times: config.blink_count,
            blink_period: Duration::from_millis(config.blink_period_ms),
        }
    }

    /// Trata um evento e retorna as ações executadas.
    pub fn handle(&mut self, event: FeedbackEvent) -> Vec<FeedbackAction> {
        debug!("Feedback: {event:?}");
        let actions = actions_for(event, &self.palette, self.blink_times);
        for action in &actions {
            self.perform(*action);
        }
        actions
    }

    fn perform(&mut self, action: FeedbackAction) {
        match action {
            FeedbackAction::PlayCue(cue) => {
                if let Err(e) = self.player.play(cue) {
                    warn!("{e}");
                }
            }
            FeedbackAction::SetColor(color) => self.set_color(color),
            FeedbackAction::Blink { color, times } => {
                for _ in 0..times {
                    self.set_color(color);
                    self.pause();
                    self.set_color(Rgb::OFF);
                    self.pause();
                }
            }
        }
    }

    fn set_color(&mut self, color: Rgb) {
        if let Err(e) = self.indicator.set(color) {
            warn!("{e}");
        }
    }

    fn pause(&self) {
        if !self.blink_period.is_zero() {
            std::thread::sleep(self.blink_period);
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
