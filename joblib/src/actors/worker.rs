mod actor;
mod messages;

use crate::actors::coordinator::messages::CoordinatorMessage;
use crate::errors::{self, JobError};
use crate::events::OutputEvent;
use crate::types::{JobId, JobPlan};
use actor::Actor;
use messages::WorkerMessage;
use tokio::sync::{mpsc, oneshot};

/// Handle to the task that runs one job's process.
///
/// The worker owns the child process outright; the handle can only ask it to
/// terminate. Dropping every handle does not stop the job.
#[derive(Clone)]
pub struct WorkerHandle {
    sender: mpsc::UnboundedSender<WorkerMessage>,
}

impl WorkerHandle {
    /// Start running `plan` on a detached task.
    ///
    /// Output lines go to `output_tx`, followed by exactly one
    /// [`OutputEvent::End`]. When the job is over the worker reports its
    /// terminal status to `coordinator`.
    pub fn spawn(
        job_id: JobId,
        plan: JobPlan,
        output_tx: mpsc::UnboundedSender<OutputEvent>,
        coordinator: mpsc::Sender<CoordinatorMessage>,
    ) -> Self {
        let (sender, inbox) = mpsc::unbounded_channel();
        Actor::spawn(job_id, plan, inbox, output_tx, coordinator);
        Self { sender }
    }

    /// Ask the worker to kill its process.
    ///
    /// Answers `AlreadyStopped` if the worker has already finished.
    pub fn terminate(&self, response: oneshot::Sender<errors::Result<()>>) {
        if let Err(mpsc::error::SendError(WorkerMessage::Terminate { response })) =
            self.sender.send(WorkerMessage::Terminate { response })
        {
            let _ = response.send(Err(JobError::AlreadyStopped));
        }
    }
}
