//! Servidor pull: `GET /eeg_data` devolve o último registro em JSON.
//!
//! Roda numa thread própria e só lê o slot de snapshot; nunca toca no
//! estado do loop principal.

use crate::error::StartupError;
use eeg_core::protocol::encode_json;
use eeg_core::snapshot::SnapshotReader;
use eeg_core::TelemetryRecord;
use std::net::SocketAddr;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

pub const DATA_PATH: &str = "/eeg_data";

/// Resposta já decidida, sem I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

/// Roteamento puro: método + URL + registro corrente → resposta.
pub fn route(method: &Method, url: &str, record: &TelemetryRecord) -> Reply {
    let path = url.split('?').next().unwrap_or(url);

    if *method == Method::Get && path == DATA_PATH {
        return match encode_json(record) {
            Ok(bytes) => Reply {
                status: 200,
                content_type: "application/json",
                body: String::from_utf8_lossy(&bytes).into_owned(),
            },
            Err(e) => Reply {
                status: 500,
                content_type: "text/plain; charset=utf-8",
                body: e.to_string(),
            },
        };
    }

    Reply {
        status: 404,
        content_type: "text/plain; charset=utf-8",
        body: "404 - Not Found".into(),
    }
}

pub struct PullServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl PullServer {
    /// Faz o bind e inicia a thread. Falha de bind é fatal para quem chama.
    pub fn start(bind: &str, reader: SnapshotReader) -> Result<Self, StartupError> {
        let server = Server::http(bind).map_err(|e| StartupError::PullServer {
            addr: bind.to_string(),
            reason: e.to_string(),
        })?;

        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| StartupError::PullServer {
                addr: bind.to_string(),
                reason: "endereço não é IP".into(),
            })?;
        info!("Servidor pull ouvindo em http://{addr}{DATA_PATH}");

        let handle = thread::Builder::new()
            .name("pull-server".into())
            .spawn(move || serve(server, reader))?;

        Ok(Self { addr, _handle: handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

fn serve(server: Server, mut reader: SnapshotReader) {
    for request in server.incoming_requests() {
        let record = reader.latest();
        let reply = route(request.method(), request.url(), &record);
        debug!("{} {} → {}", request.method(), request.url(), reply.status);
        respond(request, reply);
    }
}

fn respond(request: Request, reply: Reply) {
    let mut response = Response::from_string(reply.body).with_status_code(StatusCode(reply.status));
    if let Ok(header) = Header::from_bytes("Content-Type", reply.content_type) {
        response.add_header(header);
    }
    if let Err(e) = request.respond(response) {
        warn!("Falha ao responder cliente pull: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::snapshot::latest_slot;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn live() -> TelemetryRecord {
        TelemetryRecord {
            signal_present: true,
            attention: 50,
            meditation: 40,
            alpha: 16,
            beta: 32,
            gamma: 48,
        }
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n").unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn data_path_returns_json() {
        let reply = route(&Method::Get, "/eeg_data", &live());
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "application/json");
        assert_eq!(
            reply.body,
            r#"{"dataReady":1,"Attention":50,"Meditation":40,"Alpha":16,"Beta":32,"Gamma":48}"#
        );
    }

    #[test]
    fn query_string_is_ignored() {
        assert_eq!(route(&Method::Get, "/eeg_data?x=1", &live()).status, 200);
    }

    #[test]
    fn other_paths_and_methods_are_not_found() {
        for (method, url) in [(Method::Get, "/"), (Method::Get, "/eeg"), (Method::Post, "/eeg_data")] {
            let reply = route(&method, url, &live());
            assert_eq!(reply.status, 404);
            assert_eq!(reply.body, "404 - Not Found");
        }
    }

    #[test]
    fn served_over_http() {
        let (writer, reader) = latest_slot(TelemetryRecord::ZERO);
        let server = PullServer::start("127.0.0.1:0", reader).unwrap();

        let before = get(server.addr(), "/eeg_data");
        assert!(before.starts_with("HTTP/1.1 200"));
        assert!(before.contains(r#""dataReady":0"#));

        writer.publish(live());
        let after = get(server.addr(), "/eeg_data");
        assert!(after.contains(r#""Attention":50"#));

        let missing = get(server.addr(), "/nada");
        assert!(missing.starts_with("HTTP/1.1 404"));
        assert!(missing.ends_with("404 - Not Found"));
    }
}
