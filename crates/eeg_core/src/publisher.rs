//! Publicação do registro corrente num destino de rede.
//!
//! Os transportes concretos (HTTP, TCP, UDP broadcast) vivem no binário;
//! aqui fica o contrato comum e a regra de alcançabilidade: uma sondagem
//! única na partida decide se a sessão tenta enviar. Destino inalcançável
//! nunca derruba o pipeline nem bloqueia cada frame.

use crate::protocol::ProtocolError;
use crate::types::{RawFrame, TelemetryRecord};
use tracing::{debug, info, warn};

/// Falha de publicação.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Destino inalcançável: {0}")]
    Unreachable(String),

    #[error("Erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resposta HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Erro HTTP: {0}")]
    Http(String),

    #[error(transparent)]
    Encode(#[from] ProtocolError),
}

/// Transporte concreto.
///
/// Push envia os bytes brutos do frame; broadcast envia o registro
/// derivado como JSON. Cada implementação escolhe o que usar.
pub trait Transport: Send {
    /// Descrição curta para logs (ex: "udp://255.255.255.255:9003").
    fn describe(&self) -> String;

    /// Sondagem de alcançabilidade. Transportes sem conexão aceitam sempre.
    fn probe(&mut self) -> Result<(), PublishError> {
        Ok(())
    }

    fn send(&mut self, frame: &RawFrame, record: &TelemetryRecord) -> Result<(), PublishError>;
}

/// Frente única de publicação sobre um [`Transport`].
pub struct Publisher {
    transport: Box<dyn Transport>,
    reachable: bool,
    sent: u64,
    failed: u64,
}

impl Publisher {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            reachable: true,
            sent: 0,
            failed: 0,
        }
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }

    /// Executa a sondagem; o resultado vale para toda a sessão.
    pub fn probe(&mut self) -> bool {
        let target = self.transport.describe();
        match self.transport.probe() {
            Ok(()) => {
                info!("Destino alcançável: {target}");
                self.reachable = true;
            }
            Err(e) => {
                warn!("Destino {target} inalcançável, envios desta sessão serão pulados: {e}");
                self.reachable = false;
            }
        }
        self.reachable
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Publica um registro (e o frame de origem).
    pub fn publish(&mut self, frame: &RawFrame, record: &TelemetryRecord) -> Result<(), PublishError> {
        if !self.reachable {
            self.failed += 1;
            debug!("Destino inalcançável, pulando envio");
            return Err(PublishError::Unreachable(self.transport.describe()));
        }

        match self.transport.send(frame, record) {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(e) => {
                self.failed += 1;
                warn!("Falha ao publicar em {}: {e}", self.transport.describe());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Default)]
    struct Scripted {
        probe_ok: bool,
        send_ok: bool,
        attempts: usize,
    }

    impl Transport for Scripted {
        fn describe(&self) -> String {
            "mock://sink".into()
        }

        fn probe(&mut self) -> Result<(), PublishError> {
            if self.probe_ok {
                Ok(())
            } else {
                Err(PublishError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "recusado")))
            }
        }

        fn send(&mut self, _frame: &RawFrame, _record: &TelemetryRecord) -> Result<(), PublishError> {
            self.attempts += 1;
            if self.send_ok {
                Ok(())
            } else {
                Err(PublishError::Status {
                    code: 500,
                    body: "erro".into(),
                })
            }
        }
    }

    fn frame() -> RawFrame {
        RawFrame::new(vec![0xAA; 36])
    }

    #[test]
    fn counts_successful_sends() {
        let mut p = Publisher::new(Box::new(Scripted {
            probe_ok: true,
            send_ok: true,
            ..Default::default()
        }));
        assert!(p.probe());
        p.publish(&frame(), &TelemetryRecord::ZERO).unwrap();
        assert_eq!((p.sent(), p.failed()), (1, 0));
    }

    #[test]
    fn unreachable_skips_transport() {
        let mut p = Publisher::new(Box::new(Scripted::default()));
        assert!(!p.probe());
        for _ in 0..3 {
            assert!(matches!(
                p.publish(&frame(), &TelemetryRecord::ZERO),
                Err(PublishError::Unreachable(_))
            ));
        }
        assert_eq!(p.failed(), 3);
    }

    #[test]
    fn non_success_status_is_reported() {
        let mut p = Publisher::new(Box::new(Scripted {
            probe_ok: true,
            send_ok: false,
            ..Default::default()
        }));
        let err = p.publish(&frame(), &TelemetryRecord::ZERO).unwrap_err();
        assert!(matches!(err, PublishError::Status { code: 500, .. }));
        assert!(p.is_reachable());
    }
}
