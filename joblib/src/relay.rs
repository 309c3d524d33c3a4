use crate::actors::coordinator::JobCoordinatorHandle;
use crate::events::OutputEvent;
use crate::types::{JobId, OutputBlob};

use futures::Stream;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;

/// The output of one job, claimed by a single consumer.
///
/// Yields lines in the order the process produced them and ends after the
/// worker's end-of-output marker, or as soon as the worker is gone. Dropping
/// the stream, finished or not, releases the job: a process still running at
/// that point is terminated.
pub struct OutputStream {
    job_id: JobId,
    receiver: mpsc::UnboundedReceiver<OutputEvent>,
    coordinator: JobCoordinatorHandle,
    done: bool,
}

impl OutputStream {
    pub(crate) fn new(
        job_id: JobId,
        receiver: mpsc::UnboundedReceiver<OutputEvent>,
        coordinator: JobCoordinatorHandle,
    ) -> Self {
        Self {
            job_id,
            receiver,
            coordinator,
            done: false,
        }
    }
}

impl Stream for OutputStream {
    type Item = OutputBlob;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match ready!(this.receiver.poll_recv(cx)) {
            Some(OutputEvent::Line(blob)) => Poll::Ready(Some(blob)),
            Some(OutputEvent::End) => {
                this.done = true;
                Poll::Ready(None)
            }
            None => {
                tracing::warn!(job_id = %this.job_id, "output ended without end marker");
                this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        let job_id = self.job_id;
        let coordinator = self.coordinator.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(err) = coordinator.release(job_id).await {
                        tracing::warn!(%job_id, %err, "failed to release job");
                    }
                });
            }
            Err(_) => tracing::warn!(%job_id, "no runtime to release job on"),
        }
    }
}
