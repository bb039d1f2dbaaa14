//! # Fan-in
//! src/work/aggregator.rs
//!
//! Une los canales de salida de todos los workers en un único flujo usando
//! `crossbeam::channel::Select` sobre N entradas dinámicas más la señal de
//! cancelación.
//!
//! - El orden por worker se conserva; entre workers no hay orden definido
//! - Cada entrada se quita de la selección cuando se desconecta
//! - `recv()` devuelve `None` sólo cuando todas las entradas se cerraron
//! - La cancelación no corta el fan-in: los workers drenan la cola y cierran
//!   sus canales, y todo lo que produzcan hasta entonces se entrega

use crate::work::cancel::CancellationToken;
use crate::work::item::WorkResult;
use crossbeam::channel::{self, Receiver, Select};
use std::io;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Resultado de un poll no bloqueante
#[derive(Debug)]
pub enum TryRecv {
    Ready(WorkResult),
    /// Hay entradas abiertas pero ninguna tiene datos ahora
    Empty,
    /// Todas las entradas se cerraron
    Closed,
}

/// Qué operación completó el select
enum Selected {
    Cancel,
    Input(usize, Result<WorkResult, channel::RecvError>),
}

/// Agregador fan-in de resultados
pub struct FanIn {
    /// (índice del worker, receiver)
    inputs: Vec<(usize, Receiver<WorkResult>)>,
    cancel: CancellationToken,
    canceled: bool,
}

impl FanIn {
    /// Crea el agregador. El índice de cada receiver en el vector se usa como
    /// id del worker en los logs.
    pub fn new(receivers: Vec<Receiver<WorkResult>>, cancel: CancellationToken) -> Self {
        Self {
            inputs: receivers.into_iter().enumerate().collect(),
            cancel,
            canceled: false,
        }
    }

    /// Entradas que siguen abiertas
    pub fn open_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// ¿Ya vio la señal de cancelación?
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Bloquea hasta el próximo resultado de cualquier worker
    pub fn recv(&mut self) -> Option<WorkResult> {
        loop {
            if !self.canceled && self.cancel.is_canceled() {
                self.canceled = true;
            }
            if self.inputs.is_empty() {
                return None;
            }

            let selected = {
                let mut sel = Select::new();
                for (_, rx) in &self.inputs {
                    sel.recv(rx);
                }
                // Una vez cancelado la señal queda siempre lista: se deja de escuchar
                let cancel_index = if self.canceled {
                    None
                } else {
                    Some(sel.recv(self.cancel.signal()))
                };

                let oper = sel.select();
                let index = oper.index();
                if Some(index) == cancel_index {
                    // La señal nunca entrega mensajes; sólo se desconecta
                    let _ = oper.recv(self.cancel.signal());
                    Selected::Cancel
                } else {
                    Selected::Input(index, oper.recv(&self.inputs[index].1))
                }
            };

            match selected {
                Selected::Cancel => {
                    debug!(open = self.inputs.len(), "fan-in cancelado, esperando que los workers drenen");
                    self.canceled = true;
                }
                Selected::Input(_, Ok(result)) => return Some(result),
                Selected::Input(index, Err(_)) => {
                    let (worker, _) = self.inputs.remove(index);
                    debug!(worker, open = self.inputs.len(), "entrada del fan-in cerrada");
                }
            }
        }
    }

    /// Poll no bloqueante (la rama "default" de un select)
    pub fn try_recv(&mut self) -> TryRecv {
        loop {
            if self.inputs.is_empty() {
                return TryRecv::Closed;
            }

            let selected = {
                let mut sel = Select::new();
                for (_, rx) in &self.inputs {
                    sel.recv(rx);
                }
                match sel.try_select() {
                    Ok(oper) => {
                        let index = oper.index();
                        Some((index, oper.recv(&self.inputs[index].1)))
                    }
                    Err(_) => None,
                }
            };

            match selected {
                None => return TryRecv::Empty,
                Some((_, Ok(result))) => return TryRecv::Ready(result),
                Some((index, Err(_))) => {
                    self.inputs.remove(index);
                }
            }
        }
    }

    /// Todo lo disponible en este momento
    pub fn drain_ready(&mut self) -> Vec<WorkResult> {
        let mut out = Vec::new();
        while let TryRecv::Ready(result) = self.try_recv() {
            out.push(result);
        }
        out
    }

    /// Corre el loop en su propio thread, reenviando a un único canal que se
    /// cierra cuando todas las entradas se cerraron. El handle devuelve cuántos
    /// resultados se reenviaron.
    pub fn spawn(mut self) -> io::Result<(Receiver<WorkResult>, JoinHandle<u64>)> {
        let (tx, rx) = channel::unbounded();

        let handle = thread::Builder::new()
            .name("fan-in".to_string())
            .spawn(move || {
                let mut forwarded: u64 = 0;
                while let Some(result) = self.recv() {
                    if tx.send(result).is_err() {
                        debug!("receptor del fan-in cerrado");
                        break;
                    }
                    forwarded += 1;
                }
                debug!(forwarded, "fan-in terminado");
                forwarded
            })?;

        Ok((rx, handle))
    }
}

impl Iterator for FanIn {
    type Item = WorkResult;

    fn next(&mut self) -> Option<WorkResult> {
        self.recv()
    }
}
