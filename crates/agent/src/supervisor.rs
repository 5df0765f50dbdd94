//! Single-active-run supervision.
//!
//! A host (the CLI, an editor integration) submits tasks through a
//! [`RunSupervisor`]. Only one run is live at a time: submitting a new task
//! cancels whatever was running, and the superseded run resolves as
//! [`RunOutcome::Aborted`](crate::RunOutcome::Aborted).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tether_core::{AgentError, ExecutionContext, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::loop_runner::{AgentLoop, RunResult};

pub struct RunSupervisor {
    agent: Arc<AgentLoop>,
    active: Mutex<ActiveSlot>,
}

/// The run currently in flight, tagged so a finishing run only clears its own
/// entry.
#[derive(Default)]
struct ActiveSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

impl RunSupervisor {
    pub fn new(agent: Arc<AgentLoop>) -> Self {
        Self {
            agent,
            active: Mutex::new(ActiveSlot::default()),
        }
    }

    pub fn agent(&self) -> &AgentLoop {
        &self.agent
    }

    /// Run `task`, cancelling any run already in flight.
    ///
    /// `ctx` supplies the working root and environment; its cancellation
    /// token is replaced by one the supervisor owns.
    pub async fn submit(
        &self,
        task: &str,
        prior: &[Message],
        ctx: &ExecutionContext,
    ) -> Result<RunResult, AgentError> {
        let token = CancellationToken::new();
        let generation = {
            let mut slot = self.slot();
            if let Some(previous) = slot.token.replace(token.clone()) {
                info!("Superseding the active run");
                previous.cancel();
            }
            slot.generation += 1;
            slot.generation
        };

        let ctx = ctx.clone().with_cancellation(token);
        let result = self.agent.run(task, prior, &ctx).await;

        let mut slot = self.slot();
        if slot.generation == generation {
            slot.token = None;
        }
        result
    }

    /// Cancel the run in flight. Returns `false` when nothing was running.
    pub fn cancel_active(&self) -> bool {
        match self.slot().token.take() {
            Some(token) => {
                debug!("Cancelling the active run");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot().token.is_some()
    }

    /// The slot is never left half-updated, so a poisoned lock is still usable.
    fn slot(&self) -> MutexGuard<'_, ActiveSlot> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
