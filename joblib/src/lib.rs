mod actors;
pub mod errors;
mod events;
mod relay;
pub mod submission;
pub mod types;

// re-export the job coord handle as if it is the job coordinator itself.
pub use actors::coordinator::JobCoordinatorHandle as JobCoordinator;
pub use errors::{FailureReason, JobError};
pub use events::JobStatus;
pub use relay::OutputStream;
pub use submission::Submission;
pub use types::{JobId, JobPlan};

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    fn coordinator() -> JobCoordinator {
        JobCoordinator::spawn(16, Duration::from_secs(60))
    }

    fn sh(script: &str) -> JobPlan {
        JobPlan::new("sh", vec!["-c".into(), script.into()])
    }

    async fn collect(stream: OutputStream) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(10), stream.collect::<Vec<_>>())
            .await
            .expect("output did not finish")
            .into_iter()
            .map(|blob| String::from_utf8_lossy(&blob).into_owned())
            .collect()
    }

    async fn wait_for_terminal(coordinator: &JobCoordinator, job_id: JobId) -> JobStatus {
        for _ in 0..200 {
            let status = coordinator
                .get_job_status(job_id)
                .await
                .expect("job status");
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {job_id} never reached a terminal state");
    }

    #[tokio::test]
    async fn basic() {
        let coordinator = coordinator();
        let job_id = coordinator
            .start_job(JobPlan::new("echo", vec!["hello world!".into()]))
            .await
            .expect("job start err");
        let output = coordinator
            .stream_output(job_id)
            .await
            .expect("failed to grab output for job");
        assert_eq!(
            collect(output).await,
            vec![
                "hello world!\n".to_string(),
                "\nEcho process finished with exit code 0\n".to_string(),
            ]
        );
        assert_eq!(
            wait_for_terminal(&coordinator, job_id).await,
            JobStatus::Completed { code: 0 }
        );
    }

    #[tokio::test]
    async fn lines_arrive_in_order_with_exit_code() {
        let coordinator = coordinator();
        let job_id = coordinator
            .start_job(sh("echo one; echo two; echo three; exit 3"))
            .await
            .unwrap();
        let output = coordinator.stream_output(job_id).await.unwrap();
        assert_eq!(
            collect(output).await,
            vec![
                "one\n".to_string(),
                "two\n".to_string(),
                "three\n".to_string(),
                "\nSh process finished with exit code 3\n".to_string(),
            ]
        );
        let status = wait_for_terminal(&coordinator, job_id).await;
        assert_eq!(status.exit_code(), Some(3));
    }

    #[tokio::test]
    async fn stderr_is_interleaved_in_emission_order() {
        let coordinator = coordinator();
        let job_id = coordinator
            .start_job(sh(
                "for i in 1 2 3 4 5 6 7 8 9 10; do echo out$i; echo err$i 1>&2; done",
            ))
            .await
            .unwrap();
        let lines = collect(coordinator.stream_output(job_id).await.unwrap()).await;

        let mut expected: Vec<String> = (1..=10)
            .flat_map(|i| [format!("out{i}\n"), format!("err{i}\n")])
            .collect();
        expected.push("\nSh process finished with exit code 0\n".to_string());
        assert_eq!(lines, expected);
    }

    #[tokio::test]
    async fn lines_are_relayed_while_process_runs() {
        let coordinator = coordinator();
        let job_id = coordinator
            .start_job(sh("echo early; sleep 5; echo late"))
            .await
            .unwrap();
        let mut output = coordinator.stream_output(job_id).await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(2), output.next())
            .await
            .expect("first line should arrive before the process exits");
        assert_eq!(first.as_deref(), Some(&b"early\n"[..]));
        assert_eq!(
            coordinator.get_job_status(job_id).await.unwrap(),
            JobStatus::Running
        );
    }

    #[tokio::test]
    async fn fresh_job_is_immediately_streamable() {
        let coordinator = coordinator();
        for _ in 0..20 {
            let job_id = coordinator.start_job(sh("true")).await.unwrap();
            let output = coordinator.stream_output(job_id).await;
            assert!(output.is_ok(), "relay could not find job {job_id}");
        }
    }

    #[tokio::test]
    async fn nothing_follows_the_end_marker() {
        let coordinator = coordinator();
        let job_id = coordinator.start_job(sh("echo done")).await.unwrap();
        let mut output = coordinator.stream_output(job_id).await.unwrap();
        while tokio::time::timeout(Duration::from_secs(10), output.next())
            .await
            .unwrap()
            .is_some()
        {}
        assert_eq!(output.next().await, None);
        assert_eq!(output.next().await, None);
    }

    #[tokio::test]
    async fn output_can_only_be_claimed_once() {
        let coordinator = coordinator();
        let job_id = coordinator.start_job(sh("echo once")).await.unwrap();
        let first = coordinator.stream_output(job_id).await.unwrap();
        let second = coordinator.stream_output(job_id).await;
        assert!(matches!(second, Err(JobError::NotFound(_))));

        collect(first).await;
        wait_for_terminal(&coordinator, job_id).await;
        let again = coordinator.stream_output(job_id).await;
        assert!(matches!(again, Err(JobError::NotFound(_))));
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let coordinator = coordinator();
        let job_id = uuid::Uuid::new_v4();
        assert!(matches!(
            coordinator.stream_output(job_id).await,
            Err(JobError::NotFound(_))
        ));
        assert!(matches!(
            coordinator.get_job_status(job_id).await,
            Err(JobError::NotFound(_))
        ));
        coordinator.release(job_id).await.unwrap();
    }

    #[tokio::test]
    async fn missing_tool_yields_one_diagnostic_line() {
        let coordinator = coordinator();
        let job_id = coordinator
            .start_job(JobPlan::new("exifrelay-no-such-tool", vec!["-ver".into()]))
            .await
            .unwrap();
        let lines = collect(coordinator.stream_output(job_id).await.unwrap()).await;
        assert_eq!(
            lines,
            vec![
                "ERROR: exifrelay-no-such-tool is not installed or not in PATH. Please install it first.\n"
                    .to_string()
            ]
        );
        let status = wait_for_terminal(&coordinator, job_id).await;
        assert_eq!(status, JobStatus::Failed(FailureReason::ToolNotInstalled));
        assert_eq!(status.exit_code(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unexecutable_file_fails_to_spawn() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("not-runnable");
        std::fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let coordinator = coordinator();
        let job_id = coordinator
            .start_job(JobPlan::new(script.to_string_lossy(), vec![]))
            .await
            .unwrap();
        let lines = collect(coordinator.stream_output(job_id).await.unwrap()).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ERROR:"), "unexpected line {:?}", lines[0]);
        let status = wait_for_terminal(&coordinator, job_id).await;
        assert!(
            matches!(
                status,
                JobStatus::Failed(FailureReason::SpawnFailed(_) | FailureReason::ToolNotInstalled)
            ),
            "unexpected status {status:?}"
        );
    }

    #[tokio::test]
    async fn output_is_teed_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let tee = dir.path().join("reports").join("out.txt");
        let coordinator = coordinator();
        let job_id = coordinator
            .start_job(sh("echo alpha; echo beta 1>&2").with_tee(&tee))
            .await
            .unwrap();
        collect(coordinator.stream_output(job_id).await.unwrap()).await;

        let written = std::fs::read_to_string(&tee).unwrap();
        assert!(written.contains("alpha\n"));
        assert!(written.contains("beta\n"));
        assert!(!written.contains("process finished"));
    }

    #[tokio::test]
    async fn unwritable_tee_is_an_unexpected_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let coordinator = coordinator();
        let job_id = coordinator
            .start_job(sh("echo hi").with_tee(blocker.join("out.txt")))
            .await
            .unwrap();
        let lines = collect(coordinator.stream_output(job_id).await.unwrap()).await;
        assert!(lines
            .last()
            .unwrap()
            .starts_with("ERROR: An unexpected error occurred:"));
        let status = wait_for_terminal(&coordinator, job_id).await;
        assert!(matches!(
            status,
            JobStatus::Failed(FailureReason::Unexpected(_))
        ));
    }

    #[tokio::test]
    async fn dropping_the_relay_terminates_the_process() {
        let coordinator = coordinator();
        let job_id = coordinator
            .start_job(sh("echo started; exec sleep 30"))
            .await
            .unwrap();
        let mut output = coordinator.stream_output(job_id).await.unwrap();
        assert!(output.next().await.is_some());
        drop(output);

        let status = wait_for_terminal(&coordinator, job_id).await;
        assert!(
            matches!(status, JobStatus::Completed { code } if code != 0),
            "unexpected status {status:?}"
        );
    }

    #[tokio::test]
    async fn concurrent_releases_are_harmless() {
        let coordinator = coordinator();
        let job_id = coordinator.start_job(sh("exec sleep 30")).await.unwrap();
        let output = coordinator.stream_output(job_id).await.unwrap();

        let (first, second) = tokio::join!(coordinator.release(job_id), coordinator.release(job_id));
        assert!(first.is_ok());
        assert!(second.is_ok());

        let lines = collect(output).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("\nSh process finished with exit code"));
        wait_for_terminal(&coordinator, job_id).await;
        coordinator.release(job_id).await.unwrap();
    }

    #[tokio::test]
    async fn finished_jobs_expire() {
        let coordinator = JobCoordinator::spawn(16, Duration::from_millis(250));
        let job_id = coordinator.start_job(sh("echo unclaimed")).await.unwrap();
        wait_for_terminal(&coordinator, job_id).await;
        tokio::time::sleep(Duration::from_millis(750)).await;
        assert!(matches!(
            coordinator.get_job_status(job_id).await,
            Err(JobError::NotFound(_))
        ));
        assert!(matches!(
            coordinator.stream_output(job_id).await,
            Err(JobError::NotFound(_))
        ));
    }
}
