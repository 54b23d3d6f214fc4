//! Protocolo do sensor TGAM e payload JSON publicado na rede.
//!
//! Formato do frame (bit-exato):
//!
//! ```text
//! ┌─────────────┬──────┬─────────┬──────────────────┬────┬─────┬────┬─────┬──────┐
//! │ AA AA 20 02 │ sig  │ 83 18   │ 8 × potência(3B) │ 04 │ att │ 05 │ med │ chk? │
//! │   0..4      │  4   │  5..7   │      7..31       │ 31 │ 32  │ 33 │ 34  │  35  │
//! └─────────────┴──────┴─────────┴──────────────────┴────┴─────┴────┴─────┴──────┘
//! ```
//!
//! - Frame "leve" tem 35 bytes; o completo tem 36 (com checksum).
//! - O checksum existe no fio mas por padrão **não** é verificado; apenas
//!   os sentinelas `0x04`/`0x05` são checados.
//! - Payload de rede: objeto JSON
//!   `{"dataReady","Attention","Meditation","Alpha","Beta","Gamma"}`.

use crate::types::{FrameDetail, RawFrame, TelemetryRecord};
use serde::{Deserialize, Serialize};

/// Marcador de início de frame.
pub const FRAME_MARKER: [u8; 4] = [0xAA, 0xAA, 0x20, 0x02];

/// Tamanho do frame sem o byte de checksum.
pub const FRAME_SIZE_LIGHT: usize = 35;

/// Tamanho do frame com checksum.
pub const FRAME_SIZE_FULL: usize = 36;

pub const POOR_SIGNAL_OFFSET: usize = 4;
pub const ATTENTION_SENTINEL_OFFSET: usize = 31;
pub const ATTENTION_SENTINEL: u8 = 0x04;
pub const ATTENTION_OFFSET: usize = 32;
pub const MEDITATION_SENTINEL_OFFSET: usize = 33;
pub const MEDITATION_SENTINEL: u8 = 0x05;
pub const MEDITATION_OFFSET: usize = 34;
pub const CHECKSUM_OFFSET: usize = 35;

/// Bytes de uma banda de potência rastreada (um byte por canal).
pub const ALPHA_OFFSET: usize = 17;
pub const BETA_OFFSET: usize = 23;
pub const GAMMA_OFFSET: usize = 29;

/// Bloco das oito potências EEG (3 bytes big-endian cada).
const BAND_POWER_START: usize = 7;
const BAND_POWER_END: usize = 31;

/// Região somada pelo checksum TGAM.
const CHECKSUM_PAYLOAD_START: usize = 3;

/// Valor máximo de uma banda normalizada.
pub const BAND_MAX: u8 = 100;

/// Motivo de rejeição de um frame candidato.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Frame muito curto ({len} bytes, mínimo {required})")]
    TooShort { len: usize, required: usize },

    #[error("Marcador inválido: {0:02X?}")]
    BadMarker([u8; 4]),

    #[error("Sentinela de atenção ausente: 0x{0:02X} (esperado 0x04)")]
    MissingAttentionSentinel(u8),

    #[error("Sentinela de meditação ausente: 0x{0:02X} (esperado 0x05)")]
    MissingMeditationSentinel(u8),

    #[error("Checksum inválido: esperado 0x{expected:02X}, recebido 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// Erros de serialização do payload de rede.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

// ──────────────────────────────────────────────
// Validação
// ──────────────────────────────────────────────

/// Verifica o contrato estrutural de um frame candidato.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameValidator {
    required_size: usize,
    verify_checksum: bool,
}

impl FrameValidator {
    pub fn new(required_size: usize, verify_checksum: bool) -> Self {
        Self {
            required_size,
            verify_checksum,
        }
    }

    /// `true` se o candidato passa em todas as checagens.
    pub fn validate(&self, candidate: &[u8]) -> bool {
        self.check(candidate).is_ok()
    }

    /// Checa, em ordem: tamanho, marcador, sentinela 0x04, sentinela 0x05
    /// e (opcionalmente) checksum.
    pub fn check(&self, candidate: &[u8]) -> Result<(), FrameError> {
        let required = self.required_size.max(FRAME_SIZE_LIGHT);
        if candidate.len() < required {
            return Err(FrameError::TooShort {
                len: candidate.len(),
                required,
            });
        }

        let marker = [candidate[0], candidate[1], candidate[2], candidate[3]];
        if marker != FRAME_MARKER {
            return Err(FrameError::BadMarker(marker));
        }

        let att = candidate[ATTENTION_SENTINEL_OFFSET];
        if att != ATTENTION_SENTINEL {
            return Err(FrameError::MissingAttentionSentinel(att));
        }

        let med = candidate[MEDITATION_SENTINEL_OFFSET];
        if med != MEDITATION_SENTINEL {
            return Err(FrameError::MissingMeditationSentinel(med));
        }

        if self.verify_checksum && candidate.len() > CHECKSUM_OFFSET {
            let expected = compute_checksum(candidate);
            let actual = candidate[CHECKSUM_OFFSET];
            if expected != actual {
                return Err(FrameError::ChecksumMismatch { expected, actual });
            }
        }

        Ok(())
    }
}

impl Default for FrameValidator {
    fn default() -> Self {
        Self::new(FRAME_SIZE_FULL, false)
    }
}

/// Checksum TGAM: inverso do byte baixo da soma do payload (bytes 3..35).
pub fn compute_checksum(frame: &[u8]) -> u8 {
    let end = CHECKSUM_OFFSET.min(frame.len());
    let start = CHECKSUM_PAYLOAD_START.min(end);
    let sum = frame[start..end]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    !sum
}

// ──────────────────────────────────────────────
// Extração de métricas
// ──────────────────────────────────────────────

/// Mapeia um frame validado para um [`TelemetryRecord`].
///
/// Atenção e meditação ambas zero definem o "zero frame": o registro sai
/// com `signal_present = false` e tudo zerado, mesmo que as bandas tragam
/// bytes não nulos.
pub fn extract(frame: &RawFrame) -> TelemetryRecord {
    extract_bytes(frame.as_bytes())
}

/// Igual a [`extract`], sobre um slice. Bytes fora do slice contam como zero.
pub fn extract_bytes(frame: &[u8]) -> TelemetryRecord {
    let byte = |offset: usize| frame.get(offset).copied().unwrap_or(0);

    let attention = byte(ATTENTION_OFFSET);
    let meditation = byte(MEDITATION_OFFSET);

    if attention == 0 && meditation == 0 {
        return TelemetryRecord::ZERO;
    }

    TelemetryRecord {
        signal_present: true,
        attention,
        meditation,
        alpha: byte(ALPHA_OFFSET).min(BAND_MAX),
        beta: byte(BETA_OFFSET).min(BAND_MAX),
        gamma: byte(GAMMA_OFFSET).min(BAND_MAX),
    }
}

/// Decodifica o indicador de sinal e as oito potências de 24 bits.
pub fn extract_detail(frame: &RawFrame) -> FrameDetail {
    let bytes = frame.as_bytes();
    let mut detail = FrameDetail {
        poor_signal: bytes.get(POOR_SIGNAL_OFFSET).copied().unwrap_or(0),
        ..Default::default()
    };

    if let Some(block) = bytes.get(BAND_POWER_START..BAND_POWER_END) {
        for (slot, chunk) in detail.band_powers.iter_mut().zip(block.chunks_exact(3)) {
            *slot = (u32::from(chunk[0]) << 16) | (u32::from(chunk[1]) << 8) | u32::from(chunk[2]);
        }
    }

    detail
}

// ──────────────────────────────────────────────
// Payload JSON
// ──────────────────────────────────────────────

/// Forma JSON publicada via broadcast e via `GET /eeg_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EegJson {
    #[serde(rename = "dataReady")]
    pub data_ready: u8,
    #[serde(rename = "Attention")]
    pub attention: u8,
    #[serde(rename = "Meditation")]
    pub meditation: u8,
    #[serde(rename = "Alpha")]
    pub alpha: u8,
    #[serde(rename = "Beta")]
    pub beta: u8,
    #[serde(rename = "Gamma")]
    pub gamma: u8,
}

impl From<&TelemetryRecord> for EegJson {
    fn from(r: &TelemetryRecord) -> Self {
        Self {
            data_ready: u8::from(r.signal_present),
            attention: r.attention,
            meditation: r.meditation,
            alpha: r.alpha,
            beta: r.beta,
            gamma: r.gamma,
        }
    }
}

impl From<EegJson> for TelemetryRecord {
    fn from(j: EegJson) -> Self {
        Self {
            signal_present: j.data_ready != 0,
            attention: j.attention,
            meditation: j.meditation,
            alpha: j.alpha,
            beta: j.beta,
            gamma: j.gamma,
        }
    }
}

/// Codifica um registro como JSON UTF-8.
pub fn encode_json(record: &TelemetryRecord) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(&EegJson::from(record)).map_err(|e| ProtocolError::Serialize(e.to_string()))
}

/// Decodifica o JSON publicado de volta em registro.
pub fn decode_json(data: &[u8]) -> Result<TelemetryRecord, ProtocolError> {
    serde_json::from_slice::<EegJson>(data)
        .map(TelemetryRecord::from)
        .map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
