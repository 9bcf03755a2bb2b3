//! Operator control signals.
//!
//! OS signals are forwarded into a small queue that the engine drains at its two
//! suspension points (the poll sleep and the remap prompt). Delivery never
//! preempts a frame write or a held lock; the engine applies each signal through
//! [`Phase::on_signal`](crate::engine::Phase::on_signal).

use crate::error::Result;
use tokio::sync::mpsc;
use tracing::debug;

/// Queue depth. Two interrupts in a row must both reach the engine.
const CONTROL_QUEUE_SIZE: usize = 8;

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// SIGINT / Ctrl-C
    Interrupt,
    /// SIGTERM / Ctrl-Break
    Terminate,
}

/// Sending half, for tests and embedders that drive the engine directly.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlSignal>,
}

impl ControlHandle {
    /// Queue a signal. Returns false once the engine is gone.
    pub fn send(&self, signal: ControlSignal) -> bool {
        self.tx.try_send(signal).is_ok()
    }
}

/// Receiving half, owned by the engine loop.
#[derive(Debug)]
pub struct ControlSignals {
    rx: mpsc::Receiver<ControlSignal>,
}

impl ControlSignals {
    /// A queue with no OS signal source attached.
    pub fn channel() -> (ControlHandle, Self) {
        let (tx, rx) = mpsc::channel(CONTROL_QUEUE_SIZE);
        (ControlHandle { tx }, Self { rx })
    }

    /// Listen for process signals. Must be called inside a tokio runtime.
    ///
    /// Installing the listeners replaces the default "terminate the process"
    /// action, so shutdown always goes through the engine's cleanup.
    pub fn listen() -> Result<Self> {
        let (handle, signals) = Self::channel();
        os::spawn_forwarder(handle)?;
        Ok(signals)
    }

    /// Next queued signal; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ControlSignal> {
        self.rx.recv().await
    }
}

#[cfg(unix)]
mod os {
    use super::{debug, ControlHandle, ControlSignal, Result};
    use tokio::signal::unix::{signal, SignalKind};

    pub fn spawn_forwarder(handle: ControlHandle) -> Result<()> {
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        tokio::spawn(async move {
            loop {
                let sig = tokio::select! {
                    Some(()) = interrupt.recv() => ControlSignal::Interrupt,
                    Some(()) = terminate.recv() => ControlSignal::Terminate,
                    else => break,
                };
                debug!("Received {:?}", sig);
                if !handle.send(sig) {
                    break;
                }
            }
        });
        Ok(())
    }
}

#[cfg(windows)]
mod os {
    use super::{debug, ControlHandle, ControlSignal, Result};
    use tokio::signal::windows::{ctrl_break, ctrl_c};

    pub fn spawn_forwarder(handle: ControlHandle) -> Result<()> {
        let mut interrupt = ctrl_c()?;
        let mut terminate = ctrl_break()?;

        tokio::spawn(async move {
            loop {
                let sig = tokio::select! {
                    Some(()) = interrupt.recv() => ControlSignal::Interrupt,
                    Some(()) = terminate.recv() => ControlSignal::Terminate,
                    else => break,
                };
                debug!("Received {:?}", sig);
                if !handle.send(sig) {
                    break;
                }
            }
        });
        Ok(())
    }
}
