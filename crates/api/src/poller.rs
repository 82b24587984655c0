//! Waits for server-side asynchronous tasks.
//!
//! Every state-changing Pulp call answers `202 Accepted` with a task
//! handle. Its side effects (created resources) may only be used once the
//! task reached `completed`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use pulpdeploy_protocol::constants::TASK_POLL_INTERVAL;
use pulpdeploy_protocol::{TaskHandle, TaskQuery, TaskState};
use tracing::{debug, info, warn};

use crate::error::ApiError;

/// Something that can fetch the current document of a task.
///
/// Implemented by [`PulpClient`](crate::PulpClient); tests provide scripted
/// sources.
pub trait TaskSource: Send + Sync {
    fn fetch_task<'a>(
        &'a self,
        href: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TaskQuery, ApiError>> + Send + 'a>>;
}

/// Polls one task at a fixed interval until it reaches a terminal state.
pub struct TaskPoller<'a> {
    source: &'a dyn TaskSource,
    interval: Duration,
}

impl<'a> TaskPoller<'a> {
    /// Creates a poller using the default 2 s interval.
    pub fn new(source: &'a dyn TaskSource) -> Self {
        Self {
            source,
            interval: TASK_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Fetches the task until it is terminal.
    ///
    /// A transport or status error aborts polling immediately. A terminal
    /// state other than `completed` fails with the server's description when
    /// there is one, otherwise with the raw state name.
    pub async fn wait(&self, handle: &TaskHandle) -> Result<TaskQuery, ApiError> {
        let mut polls: u32 = 0;
        loop {
            let task = self.source.fetch_task(&handle.task).await?;
            polls += 1;

            if !task.state.is_terminal() {
                info!(task = %handle.task, state = %task.state, polls, "waiting for task to finish");
                tokio::time::sleep(self.interval).await;
                continue;
            }

            return match task.state {
                TaskState::Completed => {
                    debug!(
                        task = %handle.task,
                        polls,
                        created = task.created_resources.len(),
                        "task completed"
                    );
                    Ok(task)
                }
                ref state => {
                    warn!(task = %handle.task, state = %state, "task did not complete");
                    match task.error_description() {
                        Some(description) => Err(ApiError::TaskFailed {
                            task: handle.task.clone(),
                            description: description.to_string(),
                        }),
                        None => Err(ApiError::UnexpectedState {
                            task: handle.task.clone(),
                            state: state.to_string(),
                        }),
                    }
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pulpdeploy_protocol::TaskError;

    struct ScriptedSource {
        script: Mutex<VecDeque<Result<TaskQuery, ApiError>>>,
        fetches: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<TaskQuery, ApiError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl TaskSource for ScriptedSource {
        fn fetch_task<'a>(
            &'a self,
            _href: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<TaskQuery, ApiError>> + Send + 'a>> {
            Box::pin(async move {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                self.script
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("poller fetched past the end of the script")
            })
        }
    }

    fn task(state: TaskState) -> TaskQuery {
        TaskQuery {
            pulp_href: "/pulp/api/v3/tasks/1/".into(),
            pulp_created: None,
            state,
            name: "pulpcore.app.tasks.upload.commit".into(),
            logging_cid: None,
            started_at: None,
            finished_at: None,
            error: None,
            worker: None,
            parent_task: None,
            child_tasks: vec![],
            task_group: None,
            progress_reports: vec![],
            created_resources: vec![],
            reserved_resources_record: vec![],
        }
    }

    fn handle() -> TaskHandle {
        TaskHandle {
            task: "/pulp/api/v3/tasks/1/".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_completed() {
        let mut done = task(TaskState::Completed);
        done.created_resources = vec!["/pulp/api/v3/artifacts/1/".into()];

        let mut script: Vec<_> = (0..3).map(|_| Ok(task(TaskState::Running))).collect();
        script.insert(0, Ok(task(TaskState::Waiting)));
        script.push(Ok(done));
        let source = ScriptedSource::new(script);

        let result = TaskPoller::new(&source).wait(&handle()).await.unwrap();

        // 1 waiting + 3 running + 1 completed.
        assert_eq!(source.fetches.load(Ordering::SeqCst), 5);
        assert_eq!(result.created_resources, vec!["/pulp/api/v3/artifacts/1/"]);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_immediately_fetches_once() {
        let source = ScriptedSource::new(vec![Ok(task(TaskState::Completed))]);
        TaskPoller::new(&source).wait(&handle()).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_task_surfaces_description() {
        let mut failed = task(TaskState::Failed);
        failed.error = Some(TaskError {
            description: Some("boom".into()),
            traceback: Some("Traceback (most recent call last)".into()),
        });
        let source = ScriptedSource::new(vec![Ok(task(TaskState::Running)), Ok(failed)]);

        let err = TaskPoller::new(&source).wait(&handle()).await.unwrap_err();
        assert!(matches!(err, ApiError::TaskFailed { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn canceled_without_description_names_state() {
        let source = ScriptedSource::new(vec![Ok(task(TaskState::Canceled))]);
        let err = TaskPoller::new(&source).wait(&handle()).await.unwrap_err();
        match err {
            ApiError::UnexpectedState { state, .. } => assert_eq!(state, "canceled"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_state_is_terminal() {
        let source = ScriptedSource::new(vec![Ok(task(TaskState::Other("skipped".into())))]);
        let err = TaskPoller::new(&source).wait(&handle()).await.unwrap_err();
        assert!(err.to_string().contains("skipped"));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_stops_polling() {
        let source = ScriptedSource::new(vec![
            Ok(task(TaskState::Running)),
            Err(ApiError::Status {
                status: 503,
                expected: 200,
                body: "unavailable".into(),
            }),
        ]);
        let err = TaskPoller::new(&source).wait(&handle()).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_fixed_interval_between_polls() {
        let source = ScriptedSource::new(vec![
            Ok(task(TaskState::Running)),
            Ok(task(TaskState::Running)),
            Ok(task(TaskState::Completed)),
        ]);
        let start = tokio::time::Instant::now();
        TaskPoller::new(&source)
            .with_interval(Duration::from_secs(2))
            .wait(&handle())
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }
}
