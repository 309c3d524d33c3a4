use crate::errors;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum WorkerMessage {
    Terminate {
        response: oneshot::Sender<errors::Result<()>>,
    },
}
