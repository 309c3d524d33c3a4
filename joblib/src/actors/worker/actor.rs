use super::messages::WorkerMessage;
use crate::actors::coordinator::messages::CoordinatorMessage;
use crate::errors::FailureReason;
use crate::events::{JobStatus, OutputEvent};
use crate::types::{JobId, JobPlan, OutputBlob};

use futures::future::FutureExt;
use futures::stream::{self, Stream};
use std::io;
use std::os::fd::OwnedFd;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::{
    fs::{self, File},
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, BufWriter},
    net::unix::pipe,
    process::Command,
    select,
    sync::mpsc,
};
use tokio_stream::StreamExt;

pub struct Actor {
    job_id: JobId,
    inbox: mpsc::UnboundedReceiver<WorkerMessage>,
    output_tx: mpsc::UnboundedSender<OutputEvent>,
    coordinator: mpsc::Sender<CoordinatorMessage>,
}

impl Actor {
    pub fn spawn(
        job_id: JobId,
        plan: JobPlan,
        inbox: mpsc::UnboundedReceiver<WorkerMessage>,
        output_tx: mpsc::UnboundedSender<OutputEvent>,
        coordinator: mpsc::Sender<CoordinatorMessage>,
    ) {
        let actor = Self {
            job_id,
            inbox,
            output_tx,
            coordinator,
        };
        tokio::spawn(async move { actor.run(plan).await });
    }

    async fn run(mut self, plan: JobPlan) {
        tracing::info!(job_id = %self.job_id, argv = ?plan.argv(), "starting job");

        let mut tee = None;
        let outcome = AssertUnwindSafe(self.execute(&plan, &mut tee))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(FailureReason::Unexpected("job runner panicked".into())));
        let outcome = settle_tee(outcome, tee.as_mut()).await;

        let status = match outcome {
            Ok(code) => {
                self.emit(summary(&plan.program, code));
                JobStatus::Completed { code }
            }
            Err(reason) => {
                self.emit(diagnostic(&plan.program, &reason));
                JobStatus::Failed(reason)
            }
        };

        // teardown: the sentinel goes out before the registry forgets the process
        let _ = self.output_tx.send(OutputEvent::End);
        tracing::info!(job_id = %self.job_id, ?status, "job finished");
        let finished = CoordinatorMessage::JobFinished {
            job_id: self.job_id,
            status,
        };
        if self.coordinator.send(finished).await.is_err() {
            tracing::warn!(job_id = %self.job_id, "coordinator gone before job finished");
        }
    }

    /// Preflight, spawn, stream, and reap. Returns the exit code.
    ///
    /// The tee writer is handed back through `tee` so the caller can flush it
    /// whichever way this returns.
    async fn execute(
        &mut self,
        plan: &JobPlan,
        tee: &mut Option<BufWriter<File>>,
    ) -> Result<i32, FailureReason> {
        if let Err(err) = which::which(&plan.program) {
            tracing::warn!(job_id = %self.job_id, program = %plan.program, %err, "tool not found on PATH");
            return Err(FailureReason::ToolNotInstalled);
        }

        // stdout and stderr share one pipe so lines arrive in the order the child wrote them
        let (reader, writer) = os_pipe::pipe().map_err(unexpected)?;
        let stdout = writer.try_clone().map_err(unexpected)?;
        // the temporary Command owns our write ends; it must drop here or EOF never comes
        let mut child = Command::new(&plan.program)
            .args(&plan.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(writer)
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| FailureReason::SpawnFailed(err.to_string()))?;
        tracing::debug!(job_id = %self.job_id, pid = ?child.id(), "spawned child process");

        if let Some(path) = &plan.tee {
            *tee = Some(open_tee(path).await.map_err(unexpected)?);
        }

        let output = pipe::Receiver::from_file(std::fs::File::from(OwnedFd::from(reader)))
            .map_err(unexpected)?;
        let output = lines(output);
        tokio::pin!(output);

        let Self {
            job_id,
            inbox,
            output_tx,
            ..
        } = self;

        loop {
            select! {
                maybe_line = output.next() => {
                    let Some(line) = maybe_line else { break };
                    let line = line.map_err(unexpected)?;
                    if let Some(tee) = tee.as_mut() {
                        tee.write_all(&line).await.map_err(unexpected)?;
                    }
                    let _ = output_tx.send(OutputEvent::Line(line));
                }
                Some(msg) = inbox.recv() => {
                    acknowledge(msg);
                    tracing::info!(job_id = %job_id, "terminating process on request");
                    if let Err(err) = child.start_kill() {
                        tracing::debug!(job_id = %job_id, %err, "process already exited");
                    }
                }
            }
        }

        let mut kill_requested = false;
        let exit_status = loop {
            if std::mem::take(&mut kill_requested) {
                if let Err(err) = child.start_kill() {
                    tracing::debug!(job_id = %job_id, %err, "process already exited");
                }
            }
            select! {
                status = child.wait() => break status.map_err(unexpected)?,
                Some(msg) = inbox.recv() => {
                    acknowledge(msg);
                    kill_requested = true;
                }
            }
        };

        Ok(exit_code(exit_status))
    }

    fn emit(&self, text: String) {
        let _ = self.output_tx.send(OutputEvent::Line(text.into()));
    }
}

fn acknowledge(msg: WorkerMessage) {
    match msg {
        WorkerMessage::Terminate { response } => {
            let _ = response.send(Ok(()));
        }
    }
}

fn unexpected(err: io::Error) -> FailureReason {
    FailureReason::Unexpected(err.to_string())
}

/// The line written into a job's output when it fails.
fn diagnostic(program: &str, reason: &FailureReason) -> String {
    match reason {
        FailureReason::ToolNotInstalled => {
            format!("ERROR: {program} is not installed or not in PATH. Please install it first.\n")
        }
        FailureReason::SpawnFailed(err) => format!(
            "ERROR: '{program}' could not be started ({err}). Please ensure it is installed and in your system's PATH.\n"
        ),
        FailureReason::Unexpected(err) => {
            format!("ERROR: An unexpected error occurred: {err}\n")
        }
    }
}

/// Flush the tee file, if any, before the job's outcome is reported.
///
/// A failed flush turns a completed job into an unexpected failure; on an
/// already failed job it is only logged.
async fn settle_tee(
    outcome: Result<i32, FailureReason>,
    tee: Option<&mut BufWriter<File>>,
) -> Result<i32, FailureReason> {
    let Some(tee) = tee else {
        return outcome;
    };
    match (outcome, tee.flush().await) {
        (Ok(code), Ok(())) => Ok(code),
        (Ok(_), Err(err)) => Err(unexpected(err)),
        (Err(reason), Err(err)) => {
            tracing::warn!(%err, "failed to flush tee file of failed job");
            Err(reason)
        }
        (Err(reason), Ok(())) => Err(reason),
    }
}

/// Final line of a completed job, e.g. `Exiftool process finished with exit code 0`.
fn summary(program: &str, code: i32) -> String {
    let name = Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_else(|| program.into());
    let mut chars = name.chars();
    let label: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("\n{label} process finished with exit code {code}\n")
}

async fn open_tee(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(BufWriter::new(File::create(path).await?))
}

/// Read `reader` one line at a time, keeping the line terminator.
fn lines<R>(reader: R) -> impl Stream<Item = io::Result<OutputBlob>>
where
    R: AsyncRead + Unpin,
{
    stream::try_unfold(BufReader::new(reader), |mut reader| async move {
        let mut line = Vec::new();
        let read = reader.read_until(b'\n', &mut line).await?;
        Ok::<_, io::Error>((read > 0).then(|| (OutputBlob::from(line), reader)))
    })
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_keep_terminators_and_trailing_fragment() {
        let input: &[u8] = b"first\nsecond\r\nlast";
        let collected: Vec<OutputBlob> = lines(input)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|line| line.unwrap())
            .collect();
        assert_eq!(
            collected,
            vec![
                OutputBlob::from_static(b"first\n"),
                OutputBlob::from_static(b"second\r\n"),
                OutputBlob::from_static(b"last"),
            ]
        );
    }

    #[test]
    fn diagnostics_name_the_program() {
        let line = diagnostic("exiftool", &FailureReason::ToolNotInstalled);
        assert_eq!(
            line,
            "ERROR: exiftool is not installed or not in PATH. Please install it first.\n"
        );
        let line = diagnostic("exiftool", &FailureReason::Unexpected("disk full".into()));
        assert_eq!(line, "ERROR: An unexpected error occurred: disk full\n");
    }

    #[test]
    fn summary_capitalizes_the_tool_name() {
        assert_eq!(
            summary("exiftool", 0),
            "\nExiftool process finished with exit code 0\n"
        );
        assert_eq!(
            summary("/usr/bin/exiftool", -9),
            "\nExiftool process finished with exit code -9\n"
        );
    }

    #[tokio::test]
    async fn tee_is_flushed_when_the_job_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.txt");
        let mut tee = open_tee(&path).await.unwrap();
        tee.write_all(b"line before the failure\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        let failed = Err(FailureReason::Unexpected("broken pipe".into()));
        let outcome = settle_tee(failed, Some(&mut tee)).await;
        assert_eq!(outcome, Err(FailureReason::Unexpected("broken pipe".into())));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "line before the failure\n"
        );
    }

    #[tokio::test]
    async fn completed_job_without_tee_keeps_its_code() {
        assert_eq!(settle_tee(Ok(4), None).await, Ok(4));
    }
}
