use crate::errors;
use crate::events::{JobStatus, OutputEvent};
use crate::types::{JobId, JobPlan};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub enum CoordinatorMessage {
    StartJob {
        plan: JobPlan,
        /// Where the worker reports back once the job is over.
        outbox: mpsc::Sender<CoordinatorMessage>,
        response: oneshot::Sender<JobId>,
    },
    GetStatus {
        job_id: JobId,
        response: oneshot::Sender<errors::Result<JobStatus>>,
    },
    TakeOutput {
        job_id: JobId,
        response: oneshot::Sender<errors::Result<mpsc::UnboundedReceiver<OutputEvent>>>,
    },
    Release {
        job_id: JobId,
        response: oneshot::Sender<()>,
    },
    JobFinished {
        job_id: JobId,
        status: JobStatus,
    },
    Expire {
        job_id: JobId,
    },
}
