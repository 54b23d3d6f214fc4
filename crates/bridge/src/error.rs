//! Falhas de partida. São as únicas fatais: sem fonte de dados ou sem
//! socket não há o que fazer.

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuração inválida: {0}")]
    Config(String),

    #[error("Falha ao abrir serial {port}: {source}")]
    Serial {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Endereço de destino inválido {addr}: {reason}")]
    Address { addr: String, reason: String },

    #[error("Erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Falha ao criar cliente HTTP: {0}")]
    HttpClient(String),

    #[error("Falha ao iniciar servidor pull em {addr}: {reason}")]
    PullServer { addr: String, reason: String },
}
