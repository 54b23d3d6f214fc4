//! Colaboradores concretos do feedback: som por comando externo e LED em log.

use eeg_core::config::{CueFiles, FeedbackConfig};
use eeg_core::feedback::{Cue, CuePlayer, FeedbackError, Indicator, Rgb};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Toca WAVs com um comando externo (ex: `aplay`), bloqueando até o fim.
pub struct CommandPlayer {
    command: String,
    dir: PathBuf,
    files: CueFiles,
}

impl CommandPlayer {
    pub fn new(config: &FeedbackConfig) -> Self {
        Self {
            command: config.audio_command.trim().to_string(),
            dir: PathBuf::from(&config.cue_dir),
            files: config.cues.clone(),
        }
    }

    pub fn path_for(&self, cue: Cue) -> PathBuf {
        let file = match cue {
            Cue::Boot => &self.files.boot,
            Cue::Ready => &self.files.ready,
            Cue::SignalPresent => &self.files.signal_present,
            Cue::SignalAbsent => &self.files.signal_absent,
        };
        self.dir.join(file)
    }
}

impl CuePlayer for CommandPlayer {
    fn play(&mut self, cue: Cue) -> Result<(), FeedbackError> {
        let path = self.path_for(cue);
        if self.command.is_empty() {
            info!("♪ {cue:?} ({})", path.display());
            return Ok(());
        }
        run(&self.command, &path).map_err(|reason| FeedbackError::Audio { cue, reason })
    }
}

fn run(command: &str, path: &Path) -> Result<(), String> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or("comando vazio")?;

    debug!("{command} {}", path.display());
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|e| format!("{program}: {e}"))?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("{program} terminou com {status}"))
    }
}

/// LED sem hardware: só registra a cor.
#[derive(Debug, Default)]
pub struct LogIndicator {
    current: Rgb,
}

impl Indicator for LogIndicator {
    fn set(&mut self, color: Rgb) -> Result<(), FeedbackError> {
        if color != self.current {
            debug!("LED → #{:02x}{:02x}{:02x}", color.r, color.g, color.b);
            self.current = color;
        }
        Ok(())
    }
}
