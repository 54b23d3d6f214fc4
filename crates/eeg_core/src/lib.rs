//! # EEG Core
//!
//! Crate compartilhada que define o formato de frame do sensor TGAM, a
//! ressincronização do fluxo serial, a extração de métricas, a máquina de
//! estados de telemetria, a tabela de feedback e a configuração TOML.
//!
//! ## Módulos
//! - [`types`] – Frame bruto e registro de telemetria normalizado
//! - [`protocol`] – Marcador, validação estrutural, extração, payload JSON
//! - [`frame_buffer`] – Acumulador com ressincronização por marcador
//! - [`state`] – Primeiro sinal, recuperação e alerta de silêncio
//! - [`feedback`] – Eventos → sons/LED
//! - [`publisher`] – Contrato de transporte e sondagem de alcançabilidade
//! - [`snapshot`] – Slot único com o último registro (servidor pull)
//! - [`pipeline`] – Orquestração de uma iteração do loop
//! - [`config`] – Configuração unificada via TOML e perfis

pub mod types;
pub mod protocol;
pub mod frame_buffer;
pub mod state;
pub mod feedback;
pub mod publisher;
pub mod snapshot;
pub mod pipeline;
pub mod config;

// Re-exports convenientes
pub use types::{RawFrame, SignalQuality, TelemetryRecord};
pub use protocol::{FrameValidator, encode_json, extract};
pub use frame_buffer::FrameBuffer;
pub use state::TelemetryState;
pub use feedback::{FeedbackController, FeedbackEvent};
pub use publisher::{PublishError, Publisher, Transport};
pub use pipeline::{ByteSource, Pipeline};
pub use config::{AppConfig, Profile, PublishMode};
