//! Job submission and wait monitor
//!
//! Submits a pipeline job and polls it until the platform reports a terminal
//! status or the wait bound elapses. The loop is an explicit state machine:
//!
//! ```text
//! Submitted -> Polling -> Polling ...
//!                      -> Completed | Failed | Canceled   (remote terminal status)
//!                      -> TimedOut                        (wait bound reached)
//! ```
//!
//! Terminal monitor states are final: nothing is retried or resubmitted, and
//! a timeout leaves the remote job running.

use mlpipe_core::domain::job::{JobDiagnostics, JobStatus, PipelineJob};
use mlpipe_core::domain::pipeline::PipelineSpec;
use mlpipe_core::error::PipelineError;
use mlpipe_core::registry::ComponentRegistry;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::clock::{Clock, TokioClock};
use crate::config::WaitConfig;
use crate::error::ClientError;
use crate::service::JobService;
use crate::sink::{MonitorEvent, MonitorSink, TracingSink};

/// Failures that happen before any polling starts
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The pipeline failed local validation
    #[error("Pipeline rejected before submission: {0}")]
    Invalid(#[from] PipelineError),

    /// The platform refused or could not take the submission
    #[error("{}", rejection_message(.0))]
    Rejected(#[source] ClientError),
}

fn rejection_message(err: &ClientError) -> String {
    if err.is_client_error() {
        format!("Platform rejected the pipeline: {}", err)
    } else if err.is_server_error() {
        format!("Platform failed while accepting the job: {}", err)
    } else {
        format!("Could not submit the job: {}", err)
    }
}

/// Reasons `submit_and_wait` / `wait` do not return a completed job
#[derive(Debug, Error)]
pub enum WaitError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// The job reached `Failed` or `Canceled`
    #[error("Job {job_id} ended with status {status}{}", diagnostics_suffix(.diagnostics))]
    Execution {
        job_id: Uuid,
        status: JobStatus,
        diagnostics: Option<JobDiagnostics>,
    },

    /// The wait bound elapsed while the job was still running
    #[error(
        "Timed out after {}s waiting for job {job_id} (last status: {last_status})",
        .elapsed.as_secs()
    )]
    Timeout {
        job_id: Uuid,
        elapsed: Duration,
        last_status: JobStatus,
    },

    /// A status query failed
    #[error("Failed to query status of job {job_id}: {source}")]
    Status {
        job_id: Uuid,
        #[source]
        source: ClientError,
    },
}

fn diagnostics_suffix(diagnostics: &Option<JobDiagnostics>) -> String {
    diagnostics
        .as_ref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl WaitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Remote job this error refers to, if one was created
    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            Self::Submission(_) => None,
            Self::Execution { job_id, .. }
            | Self::Timeout { job_id, .. }
            | Self::Status { job_id, .. } => Some(*job_id),
        }
    }
}

/// States of a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Submitted,
    Polling,
    Completed,
    Failed,
    Canceled,
    TimedOut,
}

impl MonitorState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MonitorState::Submitted | MonitorState::Polling)
    }

    /// Next state after observing `status` once `elapsed` of `max_wait` has passed
    pub fn advance(self, status: JobStatus, elapsed: Duration, max_wait: Duration) -> MonitorState {
        if self.is_terminal() {
            return self;
        }

        match status {
            JobStatus::Completed => MonitorState::Completed,
            JobStatus::Failed => MonitorState::Failed,
            JobStatus::Canceled => MonitorState::Canceled,
            JobStatus::Queued | JobStatus::Running if elapsed >= max_wait => MonitorState::TimedOut,
            JobStatus::Queued | JobStatus::Running => MonitorState::Polling,
        }
    }
}

/// Submits pipeline jobs and blocks until they finish
///
/// Each call is self-contained: the monitor keeps no state between calls and
/// may be shared by tasks waiting on independent jobs.
pub struct WaitMonitor<S, C = TokioClock> {
    service: S,
    clock: C,
    sink: Arc<dyn MonitorSink>,
    registry: Option<Arc<ComponentRegistry>>,
    config: WaitConfig,
}

impl<S: JobService> WaitMonitor<S, TokioClock> {
    /// Creates a monitor on the tokio clock that reports to `tracing`
    pub fn new(service: S, config: WaitConfig) -> Self {
        Self {
            service,
            clock: TokioClock,
            sink: Arc::new(TracingSink),
            registry: None,
            config,
        }
    }
}

impl<S: JobService, C: Clock> WaitMonitor<S, C> {
    /// Replaces the time source
    pub fn with_clock<C2: Clock>(self, clock: C2) -> WaitMonitor<S, C2> {
        WaitMonitor {
            service: self.service,
            clock,
            sink: self.sink,
            registry: self.registry,
            config: self.config,
        }
    }

    /// Replaces the progress sink
    pub fn with_sink(mut self, sink: Arc<dyn MonitorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Validates ports against this registry before submitting
    pub fn with_registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Validates and submits a pipeline job without waiting
    pub async fn submit(&self, spec: &PipelineSpec) -> Result<PipelineJob, SubmissionError> {
        match &self.registry {
            Some(registry) => spec.validate_with(registry)?,
            None => spec.validate()?,
        }

        let job = self
            .service
            .submit(spec)
            .await
            .map_err(SubmissionError::Rejected)?;

        self.sink.record(&MonitorEvent::Submitted {
            job_id: job.id,
            status: job.status,
        });

        Ok(job)
    }

    /// Submits a pipeline job and waits for a terminal status
    ///
    /// `max_wait` defaults to the configured bound. Returns the job record
    /// only if it `Completed`.
    pub async fn submit_and_wait(
        &self,
        spec: &PipelineSpec,
        max_wait: Option<Duration>,
    ) -> Result<PipelineJob, WaitError> {
        let job = self.submit(spec).await?;
        let started = self.clock.now();
        self.watch(job, started, max_wait.unwrap_or(self.config.max_wait))
            .await
    }

    /// Waits on an already submitted job
    pub async fn wait(&self, job_id: Uuid, max_wait: Option<Duration>) -> Result<PipelineJob, WaitError> {
        let started = self.clock.now();
        let job = self.poll(job_id, started).await?;
        self.watch(job, started, max_wait.unwrap_or(self.config.max_wait))
            .await
    }

    async fn poll(&self, job_id: Uuid, started: Instant) -> Result<PipelineJob, WaitError> {
        let job = self
            .service
            .get_job(job_id)
            .await
            .map_err(|source| WaitError::Status { job_id, source })?;

        self.sink.record(&MonitorEvent::Polled {
            job_id,
            status: job.status,
            elapsed: self.elapsed_since(started),
        });

        Ok(job)
    }

    async fn watch(
        &self,
        mut job: PipelineJob,
        started: Instant,
        max_wait: Duration,
    ) -> Result<PipelineJob, WaitError> {
        let job_id = job.id;
        let mut state = MonitorState::Submitted;
        let mut attempt: u32 = 0;

        loop {
            let elapsed = self.elapsed_since(started);
            state = state.advance(job.status, elapsed, max_wait);

            match state {
                MonitorState::Submitted | MonitorState::Polling => {
                    let remaining = max_wait.saturating_sub(elapsed);
                    let delay = self.config.backoff.delay_for_attempt(attempt).min(remaining);
                    attempt = attempt.saturating_add(1);

                    self.clock.sleep(delay).await;

                    let next = self.poll(job_id, started).await?;
                    if next.status != job.status {
                        let event = if job.status.can_transition_to(next.status) {
                            MonitorEvent::StatusChanged {
                                job_id,
                                from: job.status,
                                to: next.status,
                            }
                        } else {
                            MonitorEvent::Regressed {
                                job_id,
                                from: job.status,
                                to: next.status,
                            }
                        };
                        self.sink.record(&event);
                    }
                    job = next;
                }
                MonitorState::Completed => {
                    self.record_finished(&job, elapsed);
                    return Ok(job);
                }
                MonitorState::Failed | MonitorState::Canceled => {
                    self.record_finished(&job, elapsed);
                    return Err(WaitError::Execution {
                        job_id,
                        status: job.status,
                        diagnostics: job.error,
                    });
                }
                MonitorState::TimedOut => {
                    self.sink.record(&MonitorEvent::TimedOut {
                        job_id,
                        status: job.status,
                        elapsed,
                    });
                    return Err(WaitError::Timeout {
                        job_id,
                        elapsed,
                        last_status: job.status,
                    });
                }
            }
        }
    }

    fn record_finished(&self, job: &PipelineJob, elapsed: Duration) {
        self.sink.record(&MonitorEvent::Finished {
            job_id: job.id,
            status: job.status,
            elapsed,
        });
    }

    fn elapsed_since(&self, started: Instant) -> Duration {
        self.clock.now().saturating_duration_since(started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackoffPolicy;
    use async_trait::async_trait;
    use chrono::Utc;
    use mlpipe_core::domain::component::{ComponentDescriptor, ComponentRef, PortSpec, PortType};
    use mlpipe_core::domain::pipeline::{ComponentInvocation, InputBinding};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Clock whose time only moves when someone sleeps on it
    #[derive(Clone)]
    struct ManualClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        fn elapsed(&self) -> Duration {
            *self.offset.lock().unwrap()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        async fn sleep(&self, duration: Duration) {
            *self.offset.lock().unwrap() += duration;
        }
    }

    type StatusScript = Box<dyn Fn(usize, Duration) -> JobStatus + Send + Sync>;

    /// Platform fake whose status is a function of (poll count, elapsed time)
    struct FakeService {
        clock: ManualClock,
        script: StatusScript,
        reject: bool,
        fail_polls: bool,
        submits: AtomicUsize,
        polls: AtomicUsize,
        job_id: Uuid,
    }

    impl FakeService {
        fn new(clock: &ManualClock, script: StatusScript) -> Self {
            Self {
                clock: clock.clone(),
                script,
                reject: false,
                fail_polls: false,
                submits: AtomicUsize::new(0),
                polls: AtomicUsize::new(0),
                job_id: Uuid::new_v4(),
            }
        }

        fn record(&self, status: JobStatus) -> PipelineJob {
            PipelineJob {
                id: self.job_id,
                name: "tabular-registration".to_string(),
                experiment_name: None,
                status,
                created_at: Utc::now(),
                started_at: None,
                completed_at: None,
                outputs: HashMap::new(),
                error: (status == JobStatus::Failed).then(|| JobDiagnostics {
                    code: Some("UserError".to_string()),
                    message: "input 'dataset_input_path' is malformed".to_string(),
                    node: Some("register".to_string()),
                }),
            }
        }
    }

    #[async_trait]
    impl JobService for FakeService {
        async fn submit(&self, _spec: &PipelineSpec) -> crate::Result<PipelineJob> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(ClientError::api_error(
                    422,
                    "input 'model_info_path' references undeclared output",
                ));
            }
            Ok(self.record(JobStatus::Queued))
        }

        async fn get_job(&self, job_id: Uuid) -> crate::Result<PipelineJob> {
            assert_eq!(job_id, self.job_id);
            let count = self.polls.fetch_add(1, Ordering::SeqCst);
            if self.fail_polls {
                return Err(ClientError::api_error(503, "service unavailable"));
            }
            Ok(self.record((self.script)(count, self.clock.elapsed())))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<MonitorEvent>>,
    }

    impl MonitorSink for RecordingSink {
        fn record(&self, event: &MonitorEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn registry() -> ComponentRegistry {
        ComponentRegistry::new().with(
            ComponentDescriptor::new("register_tabular_dataset", "1")
                .with_input("dataset_base_name", PortSpec::required(PortType::String))
                .with_input("dataset_input_path", PortSpec::optional(PortType::UriFile))
                .with_output("registered", PortSpec::required(PortType::UriFolder)),
        )
    }

    fn two_node_spec() -> PipelineSpec {
        let component = ComponentRef::new("register_tabular_dataset", "1");
        let mut train = ComponentInvocation::new("register_train", component.clone());
        train.inputs.insert(
            "dataset_base_name".to_string(),
            InputBinding::literal("tabular_train_adult"),
        );
        let mut test = ComponentInvocation::new("register_test", component);
        test.inputs.insert(
            "dataset_base_name".to_string(),
            InputBinding::literal("tabular_test_adult"),
        );

        PipelineSpec {
            display_name: None,
            description: Some("Test of Register Tabular component".to_string()),
            experiment_name: Some("Smoke_Tabular_Datset_registration".to_string()),
            compute: Some("cpucluster".to_string()),
            inputs: BTreeMap::new(),
            jobs: vec![train, test],
            outputs: BTreeMap::new(),
        }
    }

    fn monitor(
        service: FakeService,
        clock: &ManualClock,
        config: WaitConfig,
    ) -> WaitMonitor<FakeService, ManualClock> {
        WaitMonitor::new(service, config).with_clock(clock.clone())
    }

    #[test]
    fn test_state_machine_transitions() {
        let max = Duration::from_secs(10);
        let early = Duration::from_secs(1);

        assert_eq!(
            MonitorState::Submitted.advance(JobStatus::Queued, early, max),
            MonitorState::Polling
        );
        assert_eq!(
            MonitorState::Polling.advance(JobStatus::Running, early, max),
            MonitorState::Polling
        );
        assert_eq!(
            MonitorState::Polling.advance(JobStatus::Running, max, max),
            MonitorState::TimedOut
        );
        assert_eq!(
            MonitorState::Polling.advance(JobStatus::Completed, max * 2, max),
            MonitorState::Completed
        );
        assert_eq!(
            MonitorState::Polling.advance(JobStatus::Canceled, early, max),
            MonitorState::Canceled
        );
        // Terminal monitor states never move again
        assert_eq!(
            MonitorState::TimedOut.advance(JobStatus::Completed, early, max),
            MonitorState::TimedOut
        );
        assert_eq!(
            MonitorState::Failed.advance(JobStatus::Running, early, max),
            MonitorState::Failed
        );
    }

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let clock = ManualClock::new();
        let service = FakeService::new(
            &clock,
            Box::new(|_, elapsed| {
                if elapsed >= Duration::from_secs(5 * 60) {
                    JobStatus::Completed
                } else {
                    JobStatus::Running
                }
            }),
        );
        let config = WaitConfig::fixed(Duration::from_secs(30), Duration::from_secs(3600));
        let monitor = monitor(service, &clock, config);

        let job = monitor.submit_and_wait(&two_node_spec(), None).await.unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(clock.elapsed(), Duration::from_secs(300));
        assert_eq!(monitor.service.submits.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.service.polls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_times_out_and_stops_polling() {
        let clock = ManualClock::new();
        let service = FakeService::new(&clock, Box::new(|_, _| JobStatus::Running));
        let config = WaitConfig::fixed(Duration::from_millis(300), Duration::from_secs(3600));
        let monitor = monitor(service, &clock, config);

        let err = monitor
            .submit_and_wait(&two_node_spec(), Some(Duration::from_secs(1)))
            .await
            .unwrap_err();

        match err {
            WaitError::Timeout {
                elapsed,
                last_status,
                ..
            } => {
                assert_eq!(elapsed, Duration::from_secs(1));
                assert_eq!(last_status, JobStatus::Running);
            }
            other => panic!("expected timeout, got {other:?}"),
        }

        // Polls at 0.3, 0.6, 0.9 and a final one clamped to the 1s deadline
        assert_eq!(monitor.service.polls.load(Ordering::SeqCst), 4);
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_poll_interval_still_advances_to_deadline() {
        let clock = ManualClock::new();
        let service = FakeService::new(&clock, Box::new(|_, _| JobStatus::Running));
        let config = WaitConfig::fixed(Duration::ZERO, Duration::from_secs(3600));
        let monitor = monitor(service, &clock, config);

        let err = monitor
            .submit_and_wait(&two_node_spec(), Some(Duration::from_millis(10)))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(clock.elapsed(), Duration::from_millis(10));
        assert_eq!(monitor.service.polls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_failed_job_is_an_execution_error() {
        let clock = ManualClock::new();
        let service = FakeService::new(
            &clock,
            Box::new(|poll, _| if poll >= 2 { JobStatus::Failed } else { JobStatus::Running }),
        );
        let monitor = monitor(service, &clock, WaitConfig::default());

        let err = monitor
            .submit_and_wait(&two_node_spec(), None)
            .await
            .unwrap_err();

        match &err {
            WaitError::Execution {
                status,
                diagnostics,
                ..
            } => {
                assert_eq!(*status, JobStatus::Failed);
                assert_eq!(diagnostics.as_ref().unwrap().node.as_deref(), Some("register"));
            }
            other => panic!("expected execution error, got {other:?}"),
        }
        assert!(err.to_string().contains("malformed"));
        assert_eq!(monitor.service.submits.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.service.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_canceled_job_is_an_execution_error() {
        let clock = ManualClock::new();
        let service = FakeService::new(&clock, Box::new(|_, _| JobStatus::Canceled));
        let monitor = monitor(service, &clock, WaitConfig::default());

        let err = monitor.submit_and_wait(&two_node_spec(), None).await.unwrap_err();
        assert!(matches!(
            err,
            WaitError::Execution {
                status: JobStatus::Canceled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_remote_rejection_fails_before_polling() {
        let clock = ManualClock::new();
        let mut service = FakeService::new(&clock, Box::new(|_, _| JobStatus::Completed));
        service.reject = true;
        let monitor = monitor(service, &clock, WaitConfig::default());

        let err = monitor.submit_and_wait(&two_node_spec(), None).await.unwrap_err();

        assert!(matches!(
            err,
            WaitError::Submission(SubmissionError::Rejected(_))
        ));
        assert!(err.to_string().starts_with("Platform rejected the pipeline"));
        assert_eq!(err.job_id(), None);
        assert_eq!(monitor.service.polls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rejection_wording_follows_status_class() {
        let refused = SubmissionError::Rejected(ClientError::api_error(400, "bad graph"));
        assert!(refused.to_string().starts_with("Platform rejected the pipeline"));

        let broken = SubmissionError::Rejected(ClientError::api_error(502, "bad gateway"));
        assert!(broken.to_string().starts_with("Platform failed while accepting the job"));

        let garbled = SubmissionError::Rejected(ClientError::ParseError("eof".to_string()));
        assert!(garbled.to_string().starts_with("Could not submit the job"));
    }

    #[tokio::test]
    async fn test_undeclared_upstream_output_fails_before_submission() {
        let clock = ManualClock::new();
        let service = FakeService::new(&clock, Box::new(|_, _| JobStatus::Completed));
        let monitor =
            monitor(service, &clock, WaitConfig::default()).with_registry(Arc::new(registry()));

        let mut spec = two_node_spec();
        spec.jobs[1].inputs.insert(
            "dataset_input_path".to_string(),
            InputBinding::node_output("register_train", "not_declared"),
        );

        let err = monitor.submit_and_wait(&spec, None).await.unwrap_err();

        assert!(matches!(
            err,
            WaitError::Submission(SubmissionError::Invalid(PipelineError::UndeclaredOutput { .. }))
        ));
        assert_eq!(monitor.service.submits.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.service.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_status_query_failure_is_not_retried() {
        let clock = ManualClock::new();
        let mut service = FakeService::new(&clock, Box::new(|_, _| JobStatus::Running));
        service.fail_polls = true;
        let monitor = monitor(service, &clock, WaitConfig::default());

        let err = monitor.submit_and_wait(&two_node_spec(), None).await.unwrap_err();

        assert!(matches!(err, WaitError::Status { .. }));
        assert!(err.job_id().is_some());
        assert_eq!(monitor.service.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_on_existing_job() {
        let clock = ManualClock::new();
        let service = FakeService::new(&clock, Box::new(|_, _| JobStatus::Completed));
        let job_id = service.job_id;
        let monitor = monitor(service, &clock, WaitConfig::default());

        let job = monitor.wait(job_id, None).await.unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(monitor.service.submits.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.service.polls.load(Ordering::SeqCst), 1);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_exponential_backoff_between_polls() {
        let clock = ManualClock::new();
        let service = FakeService::new(
            &clock,
            Box::new(|poll, _| if poll >= 3 { JobStatus::Completed } else { JobStatus::Running }),
        );
        let config = WaitConfig {
            backoff: BackoffPolicy::Exponential {
                base: Duration::from_secs(10),
                max: Duration::from_secs(25),
            },
            max_wait: Duration::from_secs(3600),
        };
        let monitor = monitor(service, &clock, config);

        monitor.submit_and_wait(&two_node_spec(), None).await.unwrap();

        // 10 + 20 + 25 + 25
        assert_eq!(clock.elapsed(), Duration::from_secs(80));
    }

    #[tokio::test]
    async fn test_sink_sees_status_changes_and_regressions() {
        let clock = ManualClock::new();
        let service = FakeService::new(
            &clock,
            Box::new(|poll, _| match poll {
                0 => JobStatus::Running,
                1 => JobStatus::Queued,
                _ => JobStatus::Completed,
            }),
        );
        let sink = Arc::new(RecordingSink::default());
        let monitor = monitor(service, &clock, WaitConfig::default()).with_sink(sink.clone());

        monitor.submit_and_wait(&two_node_spec(), None).await.unwrap();

        let events = sink.events.lock().unwrap();
        assert!(matches!(events[0], MonitorEvent::Submitted { status: JobStatus::Queued, .. }));
        assert!(events.iter().any(|e| matches!(
            e,
            MonitorEvent::Regressed {
                from: JobStatus::Running,
                to: JobStatus::Queued,
                ..
            }
        )));
        assert!(matches!(
            events.last(),
            Some(MonitorEvent::Finished {
                status: JobStatus::Completed,
                ..
            })
        ));
    }
}
