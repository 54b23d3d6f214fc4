//! Definição de tipos/structs para telemetria EEG.
//!
//! O sensor TGAM envia frames binários de tamanho fixo; aqui ficam o frame
//! bruto já validado estruturalmente e o registro normalizado derivado dele.

// ──────────────────────────────────────────────
// Frame bruto
// ──────────────────────────────────────────────

/// Janela de bytes de tamanho fixo começando pelo marcador `AA AA 20 02`.
///
/// Possui os próprios bytes: é copiado para fora do acumulador do
/// [`FrameBuffer`](crate::frame_buffer::FrameBuffer) no momento da extração,
/// então nunca observa o buffer sendo modificado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8>,
}

impl RawFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Dump hexadecimal (`AA AA 20 02 ...`) para logs.
    pub fn hex(&self) -> String {
        hex_dump(&self.bytes)
    }
}

/// Formata bytes como `AA BB CC`.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ──────────────────────────────────────────────
// Qualidade do sinal
// ──────────────────────────────────────────────

/// Presença de sinal no registro mais recente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalQuality {
    /// Eletrodo em contato, atenção/meditação não nulas.
    Presence,
    /// "Zero frame": sensor sem contato.
    Absence,
}

impl SignalQuality {
    pub fn from_present(present: bool) -> Self {
        if present {
            SignalQuality::Presence
        } else {
            SignalQuality::Absence
        }
    }
}

// ──────────────────────────────────────────────
// Registro normalizado
// ──────────────────────────────────────────────

/// Registro de telemetria derivado de um frame válido.
///
/// Quando `signal_present` é falso todos os campos numéricos são zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub signal_present: bool,
    /// Atenção (eSense), 0–100 na prática, aceito 0–255
    pub attention: u8,
    /// Meditação (eSense)
    pub meditation: u8,
    /// Banda alfa normalizada (0–100)
    pub alpha: u8,
    /// Banda beta normalizada (0–100)
    pub beta: u8,
    /// Banda gama normalizada (0–100)
    pub gamma: u8,
}

impl TelemetryRecord {
    /// Registro "sem contato".
    pub const ZERO: TelemetryRecord = TelemetryRecord {
        signal_present: false,
        attention: 0,
        meditation: 0,
        alpha: 0,
        beta: 0,
        gamma: 0,
    };

    pub fn quality(&self) -> SignalQuality {
        SignalQuality::from_present(self.signal_present)
    }
}

// ──────────────────────────────────────────────
// Detalhe do frame (debug)
// ──────────────────────────────────────────────

/// Nomes das oito bandas de potência EEG, na ordem do frame.
pub const EEG_BANDS: [&str; 8] = [
    "Delta",
    "Theta",
    "LowAlpha",
    "HighAlpha",
    "LowBeta",
    "HighBeta",
    "LowGamma",
    "MiddleGamma",
];

/// Informação extra de um frame, usada apenas para diagnóstico.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDetail {
    /// Indicador de sinal ruim (0 = ótimo, 200 = sem contato)
    pub poor_signal: u8,
    /// Potências das oito bandas (inteiros de 24 bits)
    pub band_powers: [u32; 8],
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
