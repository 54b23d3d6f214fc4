//! Canal de slot único com o último registro publicado.
//!
//! O loop principal é o único escritor; o servidor pull só lê. Como o
//! channel é MPMC, o escritor guarda também um `Receiver` para despejar o
//! valor antigo quando o slot está cheio, então o leitor sempre vê o
//! registro mais novo e nunca um registro pela metade.

use crate::types::TelemetryRecord;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

/// Lado escritor (loop principal).
#[derive(Debug)]
pub struct SnapshotWriter {
    tx: Sender<TelemetryRecord>,
    evict: Receiver<TelemetryRecord>,
}

/// Lado leitor (thread do servidor pull).
#[derive(Debug)]
pub struct SnapshotReader {
    rx: Receiver<TelemetryRecord>,
    current: TelemetryRecord,
}

/// Cria o par escritor/leitor, com o leitor começando em `initial`.
pub fn latest_slot(initial: TelemetryRecord) -> (SnapshotWriter, SnapshotReader) {
    let (tx, rx) = bounded::<TelemetryRecord>(1);
    let writer = SnapshotWriter {
        tx,
        evict: rx.clone(),
    };
    let reader = SnapshotReader { rx, current: initial };
    (writer, reader)
}

impl SnapshotWriter {
    /// Substitui o valor do slot.
    pub fn publish(&self, record: TelemetryRecord) {
        let mut pending = record;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.evict.try_recv();
                    pending = back;
                }
            }
        }
    }
}

impl SnapshotReader {
    /// Registro mais recente (cópia).
    pub fn latest(&mut self) -> TelemetryRecord {
        loop {
            match self.rx.try_recv() {
                Ok(record) => self.current = record,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(attention: u8) -> TelemetryRecord {
        TelemetryRecord {
            signal_present: true,
            attention,
            meditation: 1,
            ..Default::default()
        }
    }

    #[test]
    fn reader_starts_with_initial() {
        let (_w, mut r) = latest_slot(TelemetryRecord::ZERO);
        assert_eq!(r.latest(), TelemetryRecord::ZERO);
    }

    #[test]
    fn newest_value_wins() {
        let (w, mut r) = latest_slot(TelemetryRecord::ZERO);
        for a in 1..=5 {
            w.publish(rec(a));
        }
        assert_eq!(r.latest().attention, 5);
        // Sem novas escritas o valor permanece
        assert_eq!(r.latest().attention, 5);
    }

    #[test]
    fn reader_across_threads() {
        let (w, mut r) = latest_slot(TelemetryRecord::ZERO);
        let handle = std::thread::spawn(move || {
            for a in 1..=200u8 {
                w.publish(rec(a));
            }
        });
        handle.join().unwrap();
        assert_eq!(r.latest().attention, 200);
    }

    #[test]
    fn publish_after_reader_dropped() {
        let (w, r) = latest_slot(TelemetryRecord::ZERO);
        drop(r);
        w.publish(rec(1));
        w.publish(rec(2));
    }
}
