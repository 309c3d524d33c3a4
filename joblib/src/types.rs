use std::path::PathBuf;
use uuid::Uuid;

pub type Program = String;
pub type Args = Vec<String>;
pub type JobId = Uuid;
pub type OutputBlob = bytes::Bytes;

/// A fully resolved invocation, ready to hand to a worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobPlan {
    pub program: Program,
    pub args: Args,
    /// File that receives a copy of every output line.
    pub tee: Option<PathBuf>,
}

impl JobPlan {
    pub fn new(program: impl Into<Program>, args: Args) -> Self {
        Self {
            program: program.into(),
            args,
            tee: None,
        }
    }

    pub fn with_tee(mut self, tee: impl Into<PathBuf>) -> Self {
        self.tee = Some(tee.into());
        self
    }

    /// The full argument vector, program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}
