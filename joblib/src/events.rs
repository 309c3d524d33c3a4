use crate::errors::FailureReason;
use crate::types::OutputBlob;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    /// The process exited. Signal deaths carry the negated signal number.
    Completed { code: i32 },
    Failed(FailureReason),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            JobStatus::Completed { code } => Some(*code),
            _ => None,
        }
    }
}

/// What travels from a worker to the relay of its job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputEvent {
    Line(OutputBlob),
    /// End of output. Always the last event a worker sends.
    End,
}
