//! Acumulador de bytes da serial com ressincronização por marcador.
//!
//! O fluxo não tem delimitadores além do marcador `AA AA 20 02`. Cada
//! tentativa de extração consome a janela inteira examinada, válida ou não,
//! e nunca reexamina os mesmos bytes.

use crate::protocol::FRAME_MARKER;
use crate::types::RawFrame;

/// Bytes mantidos quando o marcador não aparece: um marcador partido entre
/// duas leituras precisa sobreviver até a próxima.
const MARKER_TAIL: usize = FRAME_MARKER.len() - 1;

/// Buffer de frames de tamanho fixo.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    frame_size: usize,
    discarded: u64,
}

impl FrameBuffer {
    pub fn new(frame_size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(frame_size * 4),
            frame_size,
            discarded: 0,
        }
    }

    /// Bytes pendentes no acumulador.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Total de bytes descartados como ruído desde a criação.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Anexa bytes recém-lidos.
    pub fn ingest(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Tenta extrair o próximo frame candidato.
    ///
    /// Retorna `None` quando não há marcador ou ainda faltam bytes; nesse
    /// caso basta chamar de novo depois do próximo [`ingest`](Self::ingest).
    pub fn try_extract_frame(&mut self) -> Option<RawFrame> {
        let Some(start) = find_marker(&self.buf) else {
            let keep = self.buf.len().min(MARKER_TAIL);
            self.discard(self.buf.len() - keep);
            return None;
        };

        if start > 0 {
            self.discard(start);
        }

        if self.buf.len() < self.frame_size {
            return None;
        }

        let bytes: Vec<u8> = self.buf.drain(..self.frame_size).collect();
        Some(RawFrame::new(bytes))
    }

    /// Extrai todos os candidatos disponíveis.
    pub fn drain_frames(&mut self) -> Vec<RawFrame> {
        std::iter::from_fn(|| self.try_extract_frame()).collect()
    }

    fn discard(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.buf.drain(..n);
        self.discarded += n as u64;
    }
}

/// Posição do primeiro marcador completo em `haystack`.
fn find_marker(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(FRAME_MARKER.len())
        .position(|w| w == FRAME_MARKER)
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
