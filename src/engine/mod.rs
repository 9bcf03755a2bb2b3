//! Sync engine: the polling loop that mirrors the clipboard through two channels.
//!
//! Each poll:
//! 1. sleep for the poll interval (signals end the sleep early),
//! 2. publish the local clipboard to the output channel if it is new,
//! 3. resolve a pending remap request (may block on the operator),
//! 4. reopen the input handle if the refresh policy asks for it,
//! 5. open the input channel if needed (absent means the peer has not started),
//! 6. place a new peer value on the local clipboard.
//!
//! # Echo suppression
//!
//! Two engines run back to back: A's output is B's input and vice versa. A value
//! B receives lands on B's clipboard and would look like a fresh local copy on the
//! next poll. Both directions therefore compare against the fingerprints of the
//! last value sent *and* the last value received, and skip a match. Only the most
//! recent value per direction is remembered, not a history.

mod phase;
mod stats;

pub use phase::Phase;
pub use stats::SyncStats;

use crate::channel::{fits_in_frame, ChannelReader, ChannelWriter, Fingerprint, MAX_PAYLOAD_LEN};
use crate::clipboard::ClipboardGateway;
use crate::config::{same_channel, EngineConfig};
use crate::control::{ControlSignal, ControlSignals};
use crate::error::{Result, SyncError};
use crate::prompt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, trace, warn};

pub struct SyncEngine<C: ClipboardGateway> {
    config: EngineConfig,
    clipboard: C,
    output: ChannelWriter,
    input: Option<ChannelReader>,
    last_sent: Option<Fingerprint>,
    last_received: Option<Fingerprint>,
    phase: Phase,
    stats: SyncStats,
}

impl<C: ClipboardGateway> SyncEngine<C> {
    /// Validate the configuration and open (create/truncate) the output channel.
    ///
    /// Nothing is read from or written to the clipboard until the first poll.
    pub fn new(config: EngineConfig, clipboard: C) -> Result<Self> {
        config.validate()?;
        let output = ChannelWriter::create(&config.output)?;

        info!(
            "Sync engine ready: in={} out={} clipboard={} refresh={:?}",
            config.input.display(),
            config.output.display(),
            clipboard.name(),
            config.refresh
        );

        Ok(Self {
            config,
            clipboard,
            output,
            input: None,
            last_sent: None,
            last_received: None,
            phase: Phase::Running,
            stats: SyncStats::default(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn input_path(&self) -> &Path {
        &self.config.input
    }

    pub fn output_path(&self) -> &Path {
        &self.config.output
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// One poll without the sleep or remap step. The loop runs this on every
    /// tick that no signal interrupted.
    pub fn sync_once(&mut self) {
        self.stats.polls += 1;
        self.publish_local();
        self.receive_remote();
    }

    /// Point the engine at a different input channel.
    ///
    /// Rejects the output path; the caller decides what that means for the run.
    pub fn remap_input(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if same_channel(&path, &self.config.output) {
            return Err(SyncError::SameChannel(path));
        }

        // Drop the old handle before switching
        self.input = None;
        self.config.input = path;
        self.stats.remaps += 1;
        info!(
            "Switching server: pid={} in={} out={}",
            std::process::id(),
            self.config.input.display(),
            self.config.output.display()
        );
        Ok(())
    }

    /// Poll until a termination signal, then clean up.
    ///
    /// `operator` supplies remap answers, one path per line. A remap to the
    /// output path still shuts down cleanly but is reported as an error.
    pub async fn run<R>(
        mut self,
        mut signals: ControlSignals,
        mut operator: R,
    ) -> Result<SyncStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut exit_error = None;

        while !self.phase.is_terminating() {
            self.wait_for_tick(&mut signals).await;
            if self.phase == Phase::Running {
                self.sync_once();
                continue;
            }

            // A signal ended the sleep. The local clipboard is still drained
            // before the remap prompt or shutdown.
            self.stats.polls += 1;
            self.publish_local();

            if self.phase == Phase::RemapRequested {
                if let Err(e) = self.await_remap(&mut signals, &mut operator).await {
                    error!("{}", e);
                    exit_error = Some(e);
                }
            }
            if !self.phase.is_terminating() {
                self.receive_remote();
            }
        }

        info!("Shutting down server gracefully");
        let stats = self.shutdown()?;
        match exit_error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    /// Close the input, empty and close the output, and optionally delete it.
    pub fn shutdown(mut self) -> Result<SyncStats> {
        self.phase = Phase::Terminating;
        self.input = None;
        self.output.truncate()?;

        let Self {
            config,
            output,
            stats,
            ..
        } = self;
        drop(output);

        if config.remove_output_on_exit {
            std::fs::remove_file(&config.output)
                .map_err(|e| SyncError::io(&config.output, e))?;
            debug!("Removed {}", config.output.display());
        }

        info!(
            "Sync stats: polls={} sent={} received={} echoes={} clipboard_errors={} channel_errors={} remaps={}",
            stats.polls,
            stats.frames_sent,
            stats.frames_received,
            stats.echoes_suppressed,
            stats.clipboard_errors,
            stats.channel_errors,
            stats.remaps
        );
        Ok(stats)
    }

    fn apply_signal(&mut self, signal: ControlSignal) {
        let next = self.phase.on_signal(signal);
        if next != self.phase {
            debug!("{:?} on {:?} -> {:?}", signal, self.phase, next);
        }
        self.phase = next;
    }

    async fn wait_for_tick(&mut self, signals: &mut ControlSignals) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.poll_interval) => {}
            Some(signal) = signals.recv() => self.apply_signal(signal),
        }
    }

    /// Local clipboard -> output channel.
    fn publish_local(&mut self) {
        let Some(text) = self.clipboard.get_text() else {
            return;
        };

        let fingerprint = Fingerprint::of(text.as_bytes());
        if self.last_received.as_ref() == Some(&fingerprint) {
            // Peer value we placed on the clipboard ourselves
            self.stats.echoes_suppressed += 1;
            return;
        }
        if self.last_sent.as_ref() == Some(&fingerprint) {
            return;
        }
        self.last_sent = Some(fingerprint);

        if !fits_in_frame(text.len()) {
            self.stats.channel_errors += 1;
            warn!(
                "Clipboard value of {} bytes exceeds the {} byte frame limit, not sending",
                text.len(),
                MAX_PAYLOAD_LEN
            );
            return;
        }

        match self
            .output
            .write_frame(text.as_bytes(), self.config.key.as_ref())
        {
            Ok(()) => {
                self.stats.frames_sent += 1;
                debug!("Sent {} bytes to {}", text.len(), self.config.output.display());
            }
            Err(e) => {
                self.stats.channel_errors += 1;
                warn!("Failed to publish clipboard: {}", e);
            }
        }
    }

    /// Input channel -> local clipboard.
    fn receive_remote(&mut self) {
        if self.input.is_some() && self.config.refresh.reopen_each_poll() {
            self.input = None;
        }

        if self.input.is_none() {
            match ChannelReader::open(&self.config.input) {
                Ok(reader) => self.input = Some(reader),
                Err(e) => {
                    trace!("Input channel not available yet: {}", e);
                    return;
                }
            }
        }
        let Some(reader) = self.input.as_mut() else {
            return;
        };

        let payload = match reader.read_frame(self.config.key.as_ref()) {
            Ok(Some(payload)) => payload,
            Ok(None) => return,
            Err(e) => {
                self.stats.channel_errors += 1;
                debug!("Failed to read input channel, reopening next poll: {}", e);
                self.input = None;
                return;
            }
        };

        // The clipboard holds text. Fingerprint what actually lands there so
        // the next local read recognises it.
        let text = String::from_utf8_lossy(&payload);
        let fingerprint = Fingerprint::of(text.as_bytes());
        if self.last_sent.as_ref() == Some(&fingerprint) {
            // Our own value came back through the peer
            self.stats.echoes_suppressed += 1;
            return;
        }
        if self.last_received.as_ref() == Some(&fingerprint) {
            return;
        }
        self.last_received = Some(fingerprint);

        match self.clipboard.set_text(&text) {
            Ok(()) => {
                self.stats.frames_received += 1;
                debug!(
                    "Received {} bytes from {}",
                    text.len(),
                    self.config.input.display()
                );
            }
            Err(e) => {
                self.stats.clipboard_errors += 1;
                warn!("Dropping clipboard update: {}", e);
            }
        }
    }

    async fn await_remap<R>(
        &mut self,
        signals: &mut ControlSignals,
        operator: &mut R,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.phase = Phase::AwaitingRemap;
        prompt::show_remap_prompt();

        let mut line = String::new();
        let read = tokio::select! {
            res = operator.read_line(&mut line) => Some(res),
            Some(signal) = signals.recv() => {
                self.apply_signal(signal);
                None
            }
        };

        let answer = match read {
            None => return Ok(()),
            Some(Ok(0)) => {
                debug!("Remap input closed");
                self.phase = Phase::Terminating;
                return Ok(());
            }
            Some(Ok(_)) => line.trim(),
            Some(Err(e)) => {
                debug!("Remap input failed: {}", e);
                self.phase = Phase::Terminating;
                return Ok(());
            }
        };

        if answer.is_empty() {
            self.phase = Phase::Terminating;
            return Ok(());
        }

        match self.remap_input(answer) {
            Ok(()) => {
                self.phase = Phase::Running;
                Ok(())
            }
            Err(e) => {
                self.phase = Phase::Terminating;
                Err(e)
            }
        }
    }
}
