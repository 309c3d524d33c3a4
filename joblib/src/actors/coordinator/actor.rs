use super::messages::CoordinatorMessage;
use crate::actors::worker::WorkerHandle;
use crate::errors::{self, JobError};
use crate::events::{JobStatus, OutputEvent};
use crate::types::{JobId, JobPlan};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

struct JobEntry {
    status: JobStatus,
    /// Present while the process may still be alive.
    worker: Option<WorkerHandle>,
    /// Present until a relay claims it.
    output: Option<mpsc::UnboundedReceiver<OutputEvent>>,
}

pub struct JobCoordinator {
    inbox: mpsc::Receiver<CoordinatorMessage>,
    outbox: mpsc::WeakSender<CoordinatorMessage>,
    jobs: HashMap<JobId, JobEntry>,
    retention: Duration,
}

impl JobCoordinator {
    pub fn spawn(
        inbox: mpsc::Receiver<CoordinatorMessage>,
        outbox: mpsc::WeakSender<CoordinatorMessage>,
        retention: Duration,
    ) {
        let actor = Self {
            inbox,
            outbox,
            jobs: HashMap::new(),
            retention,
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        use self::CoordinatorMessage::*;
        while let Some(msg) = self.inbox.recv().await {
            match msg {
                StartJob {
                    plan,
                    outbox,
                    response,
                } => {
                    self.start_job(plan, outbox, response);
                }
                GetStatus { job_id, response } => {
                    let _ = response.send(self.get_job_status(job_id));
                }
                TakeOutput { job_id, response } => {
                    let _ = response.send(self.take_output(job_id));
                }
                Release { job_id, response } => {
                    self.release(job_id);
                    let _ = response.send(());
                }
                JobFinished { job_id, status } => {
                    self.job_finished(job_id, status);
                }
                Expire { job_id } => {
                    if self.jobs.remove(&job_id).is_some() {
                        tracing::debug!(%job_id, "expired job record");
                    }
                }
            }
        }
        tracing::debug!(jobs = self.jobs.len(), "job coordinator stopped");
    }

    fn start_job(
        &mut self,
        plan: JobPlan,
        outbox: mpsc::Sender<CoordinatorMessage>,
        response: oneshot::Sender<JobId>,
    ) {
        let job_id = self.fresh_id();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let worker = WorkerHandle::spawn(job_id, plan, output_tx, outbox);
        // registered before the id leaves the actor, so the relay can always find it
        self.jobs.insert(
            job_id,
            JobEntry {
                status: JobStatus::Running,
                worker: Some(worker),
                output: Some(output_rx),
            },
        );
        let _ = response.send(job_id);
    }

    fn fresh_id(&self) -> JobId {
        loop {
            let job_id = Uuid::new_v4();
            if !self.jobs.contains_key(&job_id) {
                return job_id;
            }
        }
    }

    fn get_job_status(&self, job_id: JobId) -> errors::Result<JobStatus> {
        self.jobs
            .get(&job_id)
            .map(|entry| entry.status.clone())
            .ok_or_else(|| not_found(job_id))
    }

    fn take_output(
        &mut self,
        job_id: JobId,
    ) -> errors::Result<mpsc::UnboundedReceiver<OutputEvent>> {
        self.jobs
            .get_mut(&job_id)
            .and_then(|entry| entry.output.take())
            .ok_or_else(|| not_found(job_id))
    }

    /// Relay teardown. Safe to repeat: later calls find nothing left to do.
    fn release(&mut self, job_id: JobId) {
        let Some(entry) = self.jobs.get_mut(&job_id) else {
            return;
        };
        entry.output = None;
        let Some(worker) = entry.worker.take() else {
            return;
        };
        let (tx, rx) = oneshot::channel();
        worker.terminate(tx);
        tokio::spawn(async move {
            match rx.await {
                Ok(Ok(())) => tracing::info!(%job_id, "terminated process left behind by relay"),
                Ok(Err(err)) => tracing::debug!(%job_id, %err, "nothing to terminate"),
                Err(_) => tracing::debug!(%job_id, "worker finished before termination"),
            }
        });
    }

    fn job_finished(&mut self, job_id: JobId, status: JobStatus) {
        if let Some(entry) = self.jobs.get_mut(&job_id) {
            entry.status = status;
            entry.worker = None;
        }
        let outbox = self.outbox.clone();
        let retention = self.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if let Some(outbox) = outbox.upgrade() {
                let _ = outbox.send(CoordinatorMessage::Expire { job_id }).await;
            }
        });
    }
}

fn not_found(job_id: JobId) -> JobError {
    JobError::NotFound(format!("Job {job_id}"))
}
