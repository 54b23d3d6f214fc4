//! Transportes concretos do publisher.
//!
//! - `http`: POST `application/octet-stream` com o frame bruto
//! - `tcp`: frame bruto numa conexão TCP nova por frame
//! - `broadcast`: JSON via UDP, sem confirmação

use crate::error::StartupError;
use eeg_core::config::{PublishConfig, PublishMode};
use eeg_core::protocol::encode_json;
use eeg_core::{PublishError, RawFrame, TelemetryRecord, Transport};
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;
use tracing::{debug, info};

/// Monta o transporte do modo configurado. `None` quando não há push.
pub fn build_transport(config: &PublishConfig) -> Result<Option<Box<dyn Transport>>, StartupError> {
    let transport: Box<dyn Transport> = match config.mode {
        PublishMode::None => return Ok(None),
        PublishMode::Http => Box::new(HttpPush::new(config)?),
        PublishMode::Tcp => Box::new(TcpPush::new(config)?),
        PublishMode::Broadcast => Box::new(UdpBroadcast::new(config)?),
    };
    Ok(Some(transport))
}

fn resolve(config: &PublishConfig) -> Result<SocketAddr, StartupError> {
    let addr = config.dest_addr();
    (config.dest_ip.as_str(), config.port)
        .to_socket_addrs()
        .map_err(|e| StartupError::Address {
            addr: addr.clone(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or(StartupError::Address {
            addr,
            reason: "nenhum endereço resolvido".into(),
        })
}

/// Sondagem TCP com timeout.
fn probe_tcp(addr: &SocketAddr, timeout: Duration) -> Result<(), PublishError> {
    TcpStream::connect_timeout(addr, timeout)
        .map(|_| ())
        .map_err(|e| PublishError::Unreachable(format!("{addr}: {e}")))
}

// ──────────────────────────────────────────────
// HTTP
// ──────────────────────────────────────────────

pub struct HttpPush {
    client: reqwest::blocking::Client,
    url: String,
    addr: SocketAddr,
    probe_timeout: Duration,
}

impl HttpPush {
    pub fn new(config: &PublishConfig) -> Result<Self, StartupError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_secs))
            .build()
            .map_err(|e| StartupError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url(),
            addr: resolve(config)?,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        })
    }
}

impl Transport for HttpPush {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn probe(&mut self) -> Result<(), PublishError> {
        probe_tcp(&self.addr, self.probe_timeout)
    }

    fn send(&mut self, frame: &RawFrame, _record: &TelemetryRecord) -> Result<(), PublishError> {
        debug!("POST {} ({} bytes): {}", self.url, frame.len(), frame.hex());

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(frame.as_bytes().to_vec())
            .send()
            .map_err(|e| PublishError::Http(e.to_string()))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        info!("Servidor respondeu {} | {}", status.as_u16(), body);

        if status.is_success() {
            Ok(())
        } else {
            Err(PublishError::Status {
                code: status.as_u16(),
                body,
            })
        }
    }
}

// ──────────────────────────────────────────────
// TCP
// ──────────────────────────────────────────────

pub struct TcpPush {
    addr: SocketAddr,
    timeout: Duration,
    probe_timeout: Duration,
}

impl TcpPush {
    pub fn new(config: &PublishConfig) -> Result<Self, StartupError> {
        Ok(Self {
            addr: resolve(config)?,
            timeout: Duration::from_secs(config.send_timeout_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        })
    }
}

impl Transport for TcpPush {
    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    fn probe(&mut self) -> Result<(), PublishError> {
        probe_tcp(&self.addr, self.probe_timeout)
    }

    fn send(&mut self, frame: &RawFrame, _record: &TelemetryRecord) -> Result<(), PublishError> {
        let mut stream = TcpStream::connect_timeout(&self.addr, self.timeout)?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.write_all(frame.as_bytes())?;
        stream.flush()?;
        let _ = stream.shutdown(Shutdown::Both);
        debug!("→ {} bytes para {}", frame.len(), self.addr);
        Ok(())
    }
}

// ──────────────────────────────────────────────
// UDP broadcast
// ──────────────────────────────────────────────

pub struct UdpBroadcast {
    sock: UdpSocket,
    dest: SocketAddr,
}

impl UdpBroadcast {
    pub fn new(config: &PublishConfig) -> Result<Self, StartupError> {
        let bind = if config.bind_ip.is_empty() {
            "0.0.0.0:0".to_string()
        } else {
            format!("{}:0", config.bind_ip)
        };
        let sock = UdpSocket::bind(bind)?;

        let dest = resolve(config)?;
        if config.mode == PublishMode::Broadcast || config.dest_ip == "255.255.255.255" {
            sock.set_broadcast(true)?;
            info!("Modo BROADCAST ativado → {dest}");
        } else {
            info!("Modo UNICAST → {dest}");
        }

        Ok(Self { sock, dest })
    }
}

impl Transport for UdpBroadcast {
    fn describe(&self) -> String {
        format!("udp://{}", self.dest)
    }

    fn send(&mut self, _frame: &RawFrame, record: &TelemetryRecord) -> Result<(), PublishError> {
        let json = encode_json(record)?;
        let sent = self.sock.send_to(&json, self.dest)?;
        debug!(
            "→ {} bytes para {} | att {} med {} α {} β {} γ {}",
            sent, self.dest, record.attention, record.meditation, record.alpha, record.beta, record.gamma
        );
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
