use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::sweep_loop;
use super::state::{RunPhase, SweepOutcome};
use super::Sweep;

const ENABLE_LOGS: bool = true;
use crate::log_info;

/// Owns the background sweep worker. At most one worker is active at a
/// time: starting a new run first cancels the old one and waits for it to
/// stop.
pub struct SweepRunner {
    handle: Option<JoinHandle<SweepOutcome>>,
    cancel: Option<CancellationToken>,
    phase_rx: watch::Receiver<RunPhase>,
}

impl SweepRunner {
    pub fn new() -> Self {
        let (_tx, phase_rx) = watch::channel(RunPhase::Idle);
        Self {
            handle: None,
            cancel: None,
            phase_rx,
        }
    }

    /// Spawn the sweep worker for `sweep`. If a worker is still active it
    /// is stopped first.
    pub async fn start(&mut self, sweep: Arc<Sweep>) -> Result<()> {
        if self.handle.is_some() {
            log_info!("a sweep worker is still active; stopping it before starting a new run");
            self.stop().await?;
        }

        let cancel = CancellationToken::new();
        let (phase_tx, phase_rx) = watch::channel(RunPhase::Idle);

        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let outcome = sweep_loop(sweep.clone(), token, phase_tx).await;
            sweep.observer().run_halted(&outcome);
            outcome
        });

        self.handle = Some(handle);
        self.cancel = Some(cancel);
        self.phase_rx = phase_rx;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Last phase published by the worker.
    pub fn phase(&self) -> RunPhase {
        *self.phase_rx.borrow()
    }

    /// Cancel the worker and wait for it to stop.
    ///
    /// Cancellation is cooperative: the token is polled at iteration
    /// boundaries and inside measurements that honor it. A measurement
    /// blocked in non-interruptible instrument I/O is only interrupted once
    /// that call returns.
    pub async fn stop(&mut self) -> Result<Option<SweepOutcome>> {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.join().await
    }

    /// Wait for the worker to halt on its own (queue drained, pause, or
    /// failure) without cancelling it.
    pub async fn join(&mut self) -> Result<Option<SweepOutcome>> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        self.cancel = None;
        let outcome = handle.await.context("sweep worker task failed to join")?;
        Ok(Some(outcome))
    }
}

impl Default for SweepRunner {
    fn default() -> Self {
        Self::new()
    }
}
