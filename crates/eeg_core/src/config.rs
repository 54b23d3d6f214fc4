//! Configuração unificada via TOML.
//!
//! Um único `config.toml` cobre os três perfis de implantação (client,
//! broadcast e server), que antes eram scripts quase idênticos.

use crate::feedback::{Palette, parse_hex};
use crate::protocol::{FRAME_SIZE_FULL, FRAME_SIZE_LIGHT};
use crate::state::{RecoveryPolicy, StateSettings};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Porta serial do sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Caminho da porta (ex: "/dev/ttyUSB0", "COM3")
    pub port: String,
    pub baud_rate: u32,
    /// Timeout de leitura; mantém a leitura praticamente não bloqueante
    pub read_timeout_ms: u64,
    /// Tamanho do buffer de cada leitura
    pub read_chunk: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".into(),
            baud_rate: 57600,
            read_timeout_ms: 5,
            read_chunk: 256,
        }
    }
}

/// Formato do frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// 36 (com checksum) ou 35
    pub size: usize,
    /// Verifica o checksum TGAM (apenas frames de 36 bytes)
    pub verify_checksum: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            size: FRAME_SIZE_FULL,
            verify_checksum: false,
        }
    }
}

/// Máquina de estados e alerta de silêncio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub silence_timeout_secs: u64,
    pub recovery_policy: RecoveryPolicy,
    pub stale_requires_first_frame: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            silence_timeout_secs: 100,
            recovery_policy: RecoveryPolicy::Once,
            stale_requires_first_frame: false,
        }
    }
}

impl StateConfig {
    pub fn settings(&self) -> StateSettings {
        StateSettings {
            silence_timeout: Duration::from_secs(self.silence_timeout_secs),
            recovery_policy: self.recovery_policy,
            stale_requires_first_frame: self.stale_requires_first_frame,
        }
    }
}

/// Modo de publicação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    /// POST octet-stream com o frame bruto
    Http,
    /// Frame bruto numa conexão TCP por frame
    Tcp,
    /// JSON via UDP broadcast
    Broadcast,
    /// Sem push (apenas servidor pull)
    None,
}

/// Destino de rede.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub mode: PublishMode,
    /// IP de destino (255.255.255.255 para broadcast)
    pub dest_ip: String,
    pub port: u16,
    /// Identificador do dispositivo no caminho HTTP
    pub device_id: String,
    /// Caminho HTTP; `{device_id}` é substituído
    pub path: String,
    /// IP local para bind UDP (vazio = auto)
    pub bind_ip: String,
    pub probe_timeout_secs: u64,
    pub send_timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            mode: PublishMode::Broadcast,
            dest_ip: "255.255.255.255".into(),
            port: 9003,
            device_id: "NB001".into(),
            path: "/api/device/eeg/{device_id}".into(),
            bind_ip: String::new(),
            probe_timeout_secs: 5,
            send_timeout_secs: 5,
        }
    }
}

impl PublishConfig {
    pub fn dest_addr(&self) -> String {
        format!("{}:{}", self.dest_ip, self.port)
    }

    /// URL completa do push HTTP.
    pub fn url(&self) -> String {
        let path = self.path.replace("{device_id}", &self.device_id);
        format!("http://{}:{}{}", self.dest_ip, self.port, path)
    }
}

/// Servidor pull `GET /eeg_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PullServerConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for PullServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "0.0.0.0:80".into(),
        }
    }
}

/// Arquivos de som por cue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CueFiles {
    pub boot: String,
    pub ready: String,
    pub signal_present: String,
    pub signal_absent: String,
}

impl Default for CueFiles {
    fn default() -> Self {
        Self {
            boot: "1-udp.wav".into(),
            ready: "2.wav".into(),
            signal_present: "3.wav".into(),
            signal_absent: "4.wav".into(),
        }
    }
}

/// Sons e LED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Comando que toca um WAV (vazio = apenas loga)
    pub audio_command: String,
    /// Diretório dos WAVs
    pub cue_dir: String,
    /// Cor em repouso (#RRGGBB)
    pub idle_color: String,
    /// Cor de alerta (#RRGGBB)
    pub alert_color: String,
    pub blink_count: u8,
    pub blink_period_ms: u64,
    pub cues: CueFiles,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            audio_command: "aplay".into(),
            cue_dir: "cues".into(),
            idle_color: "#0000ff".into(),
            alert_color: "#ff0000".into(),
            blink_count: 2,
            blink_period_ms: 500,
            cues: CueFiles::default(),
        }
    }
}

impl FeedbackConfig {
    /// Paleta do LED; cores inválidas caem no padrão.
    pub fn palette(&self) -> Palette {
        let fallback = Palette::default();
        Palette {
            idle: parse_hex(&self.idle_color).unwrap_or(fallback.idle),
            alert: parse_hex(&self.alert_color).unwrap_or(fallback.alert),
        }
    }
}

/// Ritmo do loop principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Pausa entre leituras da serial
    pub poll_interval_ms: u64,
    /// Intervalo do log de estatísticas (0 = desligado)
    pub stats_interval_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            stats_interval_secs: 30,
        }
    }
}

/// Perfis de implantação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Push HTTP do frame bruto, alerta de 60s após o primeiro frame
    Client,
    /// Broadcast UDP do JSON, alerta de 100s
    Broadcast,
    /// Sem push; servidor pull na porta 80
    Server,
}

impl Profile {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "client" => Some(Profile::Client),
            "broadcast" => Some(Profile::Broadcast),
            "server" => Some(Profile::Server),
            _ => None,
        }
    }

    pub fn names() -> [&'static str; 3] {
        ["client", "broadcast", "server"]
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub frame: FrameConfig,
    pub state: StateConfig,
    pub publish: PublishConfig,
    pub pull_server: PullServerConfig,
    pub feedback: FeedbackConfig,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Configuração padrão de um perfil.
    pub fn for_profile(profile: Profile) -> Self {
        let mut config = AppConfig::default();
        config.apply_profile(profile);
        config
    }

    /// Sobrescreve os campos que distinguem os perfis.
    pub fn apply_profile(&mut self, profile: Profile) {
        match profile {
            Profile::Client => {
                self.publish.mode = PublishMode::Http;
                self.publish.dest_ip = "192.168.2.124".into();
                self.publish.port = 9003;
                self.state.silence_timeout_secs = 60;
                self.state.recovery_policy = RecoveryPolicy::Once;
                self.state.stale_requires_first_frame = true;
                self.pull_server.enabled = false;
            }
            Profile::Broadcast => {
                self.publish.mode = PublishMode::Broadcast;
                self.publish.dest_ip = "255.255.255.255".into();
                self.publish.port = 9003;
                self.state.silence_timeout_secs = 100;
                self.state.stale_requires_first_frame = false;
                self.pull_server.enabled = false;
            }
            Profile::Server => {
                self.publish.mode = PublishMode::None;
                self.state.silence_timeout_secs = 100;
                self.state.recovery_policy = RecoveryPolicy::Never;
                self.state.stale_requires_first_frame = false;
                self.pull_server.enabled = true;
            }
        }
        info!("Perfil aplicado: {profile:?}");
    }

    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.serial.port.trim().is_empty() {
            errors.push("Porta serial não pode ser vazia".into());
        }
        if self.serial.baud_rate == 0 {
            errors.push("Baud rate não pode ser 0".into());
        }
        if self.serial.read_chunk == 0 {
            errors.push("read_chunk não pode ser 0".into());
        }

        if self.frame.size != FRAME_SIZE_FULL && self.frame.size != FRAME_SIZE_LIGHT {
            errors.push(format!(
                "Tamanho de frame inválido: {} ({FRAME_SIZE_LIGHT} ou {FRAME_SIZE_FULL})",
                self.frame.size
            ));
        }
        if self.frame.verify_checksum && self.frame.size != FRAME_SIZE_FULL {
            errors.push("verify_checksum exige frames de 36 bytes".into());
        }

        if self.state.silence_timeout_secs == 0 {
            errors.push("silence_timeout_secs não pode ser 0".into());
        }

        if self.publish.mode != PublishMode::None {
            if self.publish.port == 0 {
                errors.push("Porta de publicação não pode ser 0".into());
            }
            if self.publish.dest_ip.trim().is_empty() {
                errors.push("dest_ip não pode ser vazio".into());
            }
            if self.publish.probe_timeout_secs == 0 {
                errors.push("probe_timeout_secs não pode ser 0".into());
            }
            if self.publish.send_timeout_secs == 0 {
                errors.push("send_timeout_secs não pode ser 0".into());
            }
        }
        if self.publish.mode == PublishMode::Http && self.publish.device_id.trim().is_empty() {
            errors.push("device_id é obrigatório no modo http".into());
        }

        if self.pull_server.enabled && self.pull_server.bind.parse::<SocketAddr>().is_err() {
            errors.push(format!("Endereço do servidor pull inválido: {}", self.pull_server.bind));
        }

        for (name, hex) in [
            ("idle_color", &self.feedback.idle_color),
            ("alert_color", &self.feedback.alert_color),
        ] {
            if parse_hex(hex).is_none() {
                errors.push(format!("Cor inválida em {name}: {hex}"));
            }
        }

        if self.runtime.poll_interval_ms > 1000 {
            errors.push(format!(
                "poll_interval_ms muito alto: {} (máximo 1000)",
                self.runtime.poll_interval_ms
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn every_profile_is_valid() {
        for name in Profile::names() {
            let profile = Profile::from_name(name).unwrap();
            let errors = AppConfig::for_profile(profile).validate();
            assert!(errors.is_empty(), "{name}: {errors:?}");
        }
    }

    #[test]
    fn profiles_differ_where_expected() {
        let client = AppConfig::for_profile(Profile::Client);
        assert_eq!(client.publish.mode, PublishMode::Http);
        assert_eq!(client.state.silence_timeout_secs, 60);
        assert!(client.state.stale_requires_first_frame);

        let server = AppConfig::for_profile(Profile::Server);
        assert_eq!(server.publish.mode, PublishMode::None);
        assert!(server.pull_server.enabled);

        assert_eq!(Profile::from_name("nope"), None);
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::for_profile(Profile::Client);
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.publish.mode, PublishMode::Http);
        assert_eq!(parsed.state.recovery_policy, RecoveryPolicy::Once);
        assert_eq!(parsed.feedback.cues.signal_absent, "4.wav");
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[publish]
mode = "tcp"
port = 12345

[state]
recovery_policy = "every_time"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.publish.mode, PublishMode::Tcp);
        assert_eq!(config.publish.port, 12345);
        assert_eq!(config.state.recovery_policy, RecoveryPolicy::EveryTime);
        // Outros campos devem ter valor padrão
        assert_eq!(config.serial.baud_rate, 57600);
        assert_eq!(config.frame.size, FRAME_SIZE_FULL);
    }

    #[test]
    fn http_url_substitutes_device() {
        let config = AppConfig::for_profile(Profile::Client);
        assert_eq!(
            config.publish.url(),
            "http://192.168.2.124:9003/api/device/eeg/NB001"
        );
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = AppConfig::default();
        config.frame.size = 40;
        config.feedback.alert_color = "red".into();
        config.state.silence_timeout_secs = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn zero_publish_timeouts_rejected() {
        let mut config = AppConfig::for_profile(Profile::Client);
        config.publish.probe_timeout_secs = 0;
        config.publish.send_timeout_secs = 0;
        assert_eq!(config.validate().len(), 2);

        // Sem push os timeouts não importam
        config.publish.mode = PublishMode::None;
        assert!(config.validate().is_empty());
    }

    #[test]
    fn checksum_needs_full_frame() {
        let mut config = AppConfig::default();
        config.frame.size = FRAME_SIZE_LIGHT;
        config.frame.verify_checksum = true;
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.publish.device_id = "NB042".into();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.publish.device_id, "NB042");
    }

    #[test]
    fn broken_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "serial = [[[").unwrap();
        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.publish.port, 9003);
    }
}
