//! # EEG Bridge
//!
//! Lê frames TGAM da UART, extrai atenção/meditação/bandas e republica o
//! registro na rede (push HTTP/TCP, broadcast UDP ou servidor pull).
//!
//! ## Uso
//! ```bash
//! eeg_bridge                          # config.toml ao lado do executável
//! eeg_bridge --profile server         # servidor pull na porta 80
//! eeg_bridge --config /etc/eeg.toml --profile client
//! ```

mod error;
mod feedback_io;
mod pull_server;
mod serial;
mod transports;

use eeg_core::config::AppConfig;
use eeg_core::feedback::FeedbackEvent;
use eeg_core::snapshot::latest_slot;
use eeg_core::{FeedbackController, Pipeline, Profile, Publisher, TelemetryRecord};
use error::StartupError;
use feedback_io::{CommandPlayer, LogIndicator};
use pull_server::PullServer;
use serial::SerialSource;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Argumentos de linha de comando.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    profile: Option<Profile>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, StartupError> {
    let mut parsed = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let path = it
                    .next()
                    .ok_or_else(|| StartupError::Config("--config exige um caminho".into()))?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--profile" => {
                let name = it
                    .next()
                    .ok_or_else(|| StartupError::Config("--profile exige um nome".into()))?;
                let profile = Profile::from_name(&name).ok_or_else(|| {
                    StartupError::Config(format!(
                        "Perfil desconhecido '{name}' (use {})",
                        Profile::names().join(", ")
                    ))
                })?;
                parsed.profile = Some(profile);
            }
            other => warn!("Argumento ignorado: {other}"),
        }
    }
    Ok(parsed)
}

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), StartupError> {
    let args = parse_args(std::env::args().skip(1))?;

    // ── Carregar config ──
    let config_path = args.config.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    if let Some(profile) = args.profile {
        config.apply_profile(profile);
    }

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(StartupError::Config(errors.join("; ")));
    }

    // ── Feedback ──
    let feedback = FeedbackController::new(
        Box::new(CommandPlayer::new(&config.feedback)),
        Box::new(LogIndicator::default()),
        &config.feedback,
    );

    // ── Publicação ──
    let publisher = transports::build_transport(&config.publish)?.map(Publisher::new);
    let target = publisher
        .as_ref()
        .map(Publisher::describe)
        .unwrap_or_else(|| "nenhum".into());

    // ── Servidor pull ──
    let (snapshot, pull) = if config.pull_server.enabled {
        let (writer, reader) = latest_slot(TelemetryRecord::ZERO);
        let server = PullServer::start(&config.pull_server.bind, reader)?;
        (Some(writer), Some(server))
    } else {
        (None, None)
    };

    let mut pipeline = Pipeline::new(&config, publisher, feedback, snapshot, Instant::now());
    pipeline.notify(FeedbackEvent::Startup);

    // ── Serial ──
    let mut source = SerialSource::open(&config.serial)?;

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🧠 EEG BRIDGE – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Serial:    {} @ {}", config.serial.port, config.serial.baud_rate);
    println!("  Frame:     {} bytes", config.frame.size);
    println!("  Destino:   {target}");
    if let Some(server) = &pull {
        println!("  Pull:      http://{}{}", server.addr(), pull_server::DATA_PATH);
    }
    println!("  Silêncio:  {}s", config.state.silence_timeout_secs);
    println!("══════════════════════════════════════════════");
    println!();

    pipeline.probe_sink();

    // ── Loop principal ──
    let poll_interval = Duration::from_millis(config.runtime.poll_interval_ms);
    let stats_interval = Duration::from_secs(config.runtime.stats_interval_secs);
    let mut scratch = vec![0u8; config.serial.read_chunk];
    let mut last_stats = Instant::now();

    info!("Lendo frames...");
    loop {
        let now = Instant::now();
        pipeline.poll(&mut source, &mut scratch, now);

        if !stats_interval.is_zero() && now.duration_since(last_stats) >= stats_interval {
            pipeline.log_stats();
            last_stats = now;
        }

        std::thread::sleep(poll_interval);
    }
}
