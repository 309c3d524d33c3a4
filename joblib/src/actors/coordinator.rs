mod actor;
pub(crate) mod messages;

use self::{
    actor::JobCoordinator,
    messages::CoordinatorMessage::{self, GetStatus, Release, StartJob, TakeOutput},
};
use crate::errors::{self, JobError};
use crate::events::JobStatus;
use crate::relay::OutputStream;
use crate::types::{JobId, JobPlan};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A `JobCoordinator` which keeps track of running jobs and hands their output to relays.
///
/// This struct is actually an actor handle, the real work is done in the actor spawned by `JobCoordinator::spawn`.
/// Every change to the job registry is a message handled in order by that one actor, so inserts and removals
/// never race. The handle can be cloned freely in a multi-thread async context.
#[derive(Clone)]
pub struct JobCoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
}

impl JobCoordinatorHandle {
    /// Spawn a new coordinator.
    ///
    /// `message_capacity` limits the build-up of inbound messages. Finished jobs are forgotten after `retention`,
    /// together with their output if no relay ever claimed it.
    pub fn spawn(message_capacity: usize, retention: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(message_capacity);
        JobCoordinator::spawn(receiver, sender.downgrade(), retention);
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> CoordinatorMessage,
    ) -> errors::Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| JobError::CoordinatorUnavailable)?;
        rx.await.map_err(|_| JobError::CoordinatorUnavailable)
    }

    /// Start a new job. Returns as soon as the job is registered; the process runs on its own task.
    pub async fn start_job(&self, plan: JobPlan) -> errors::Result<JobId> {
        let outbox = self.sender.clone();
        self.request(|response| StartJob {
            plan,
            outbox,
            response,
        })
        .await
    }

    pub async fn get_job_status(&self, job_id: JobId) -> errors::Result<JobStatus> {
        self.request(|response| GetStatus { job_id, response })
            .await?
    }

    /// Claim the output of a job. Only the first caller gets it; everyone else gets `NotFound`.
    pub async fn stream_output(&self, job_id: JobId) -> errors::Result<OutputStream> {
        let receiver = self
            .request(|response| TakeOutput { job_id, response })
            .await??;
        Ok(OutputStream::new(job_id, receiver, self.clone()))
    }

    /// Terminate whatever is still running for `job_id` and drop its unclaimed output.
    ///
    /// Idempotent; unknown or finished jobs are fine.
    pub async fn release(&self, job_id: JobId) -> errors::Result<()> {
        self.request(|response| Release { job_id, response }).await
    }
}
