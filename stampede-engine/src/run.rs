//! Run API: configure a scenario, then execute setup, load and evaluation

use crate::error::{RunError, SetupError};
use crate::monitor::LiveMonitor;
use crate::payload::PayloadFactory;
use crate::pool_builder::PoolBuilder;
use crate::scheduler::Scheduler;
use crate::shutdown::{RunStop, StopReason};
use crate::worker::{VirtualUser, WorkerContext};
use chrono::Utc;
use stampede_config::{ScenarioConfig, Validatable};
use stampede_core::{OutcomeRecorder, SchedulePlan, ThresholdSpec, Verdict};
use stampede_http::UsersTarget;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(10);

/// A validated scenario bound to a target, ready to execute once
pub struct RunHandle {
    name: String,
    scenario: ScenarioConfig,
    plan: Arc<SchedulePlan>,
    specs: Arc<[ThresholdSpec]>,
    cap: Duration,
    target: Arc<dyn UsersTarget>,
    recorder: OutcomeRecorder,
    payloads: Arc<PayloadFactory>,
    stop: RunStop,
}

/// Validate the scenario, parse its thresholds and build the VU schedule
///
/// Every configuration problem surfaces here, before any request is sent.
pub fn configure(
    name: impl Into<String>,
    scenario: &ScenarioConfig,
    target: Arc<dyn UsersTarget>,
) -> Result<RunHandle, RunError> {
    scenario.validate()?;
    let specs = scenario.threshold_specs()?;
    let plan = scenario.profile.plan()?;
    let cap = scenario.run_cap()?;

    Ok(RunHandle {
        name: name.into(),
        scenario: scenario.clone(),
        plan: Arc::new(plan),
        specs: specs.into(),
        cap,
        target,
        recorder: OutcomeRecorder::new()?,
        payloads: Arc::new(PayloadFactory::new()),
        stop: RunStop::new(),
    })
}

impl RunHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plan(&self) -> &SchedulePlan {
        &self.plan
    }

    /// Wall-clock ceiling of the load phase
    pub fn cap(&self) -> Duration {
        self.cap
    }

    pub fn thresholds(&self) -> &[ThresholdSpec] {
        &self.specs
    }

    /// Signal that stops the run gracefully when raised
    pub fn stop_handle(&self) -> RunStop {
        self.stop.clone()
    }

    /// Build the pool, run the load and judge the result
    ///
    /// Only setup failures are errors. Request failures and threshold
    /// violations end up in the returned verdict.
    pub async fn execute(self) -> Result<Verdict, SetupError> {
        let started_at = Utc::now();
        let pool_config = &self.scenario.pool;

        info!(scenario = %self.name, "Setting up pool of {} users", pool_config.size);
        let pool = PoolBuilder::new(self.target.as_ref(), &self.payloads)
            .with_config(pool_config)
            .build(pool_config.size)
            .await?;

        if !pool_config.settle_delay.is_zero() {
            info!(
                scenario = %self.name,
                "Waiting {:?} before starting load",
                pool_config.settle_delay
            );
            self.stop
                .sleep_until(Instant::now() + pool_config.settle_delay)
                .await;
        }

        let mut recorder = self.recorder;
        recorder.restart_clock();
        let recorder = Arc::new(recorder);

        if self.stop.is_raised() {
            warn!(scenario = %self.name, "Stopped before the load phase started");
        } else {
            let ctx = Arc::new(WorkerContext::from_scenario(
                &self.scenario,
                self.target.clone(),
                pool.clone(),
                recorder.clone(),
                self.payloads.clone(),
            ));
            let scheduler = Scheduler::new(self.plan.clone(), self.cap, self.stop.clone())
                .think_time(self.scenario.think_time);

            let monitor = LiveMonitor::new(
                self.name.clone(),
                recorder.clone(),
                self.specs.clone(),
                scheduler.active_vus(),
                self.scenario
                    .monitor_interval
                    .unwrap_or(DEFAULT_MONITOR_INTERVAL),
            )
            .spawn(self.stop.clone());

            let report = scheduler
                .run(|vu| VirtualUser::new(vu, ctx.clone()))
                .await;
            monitor.abort();

            if report.stopped == Some(StopReason::External) {
                warn!(scenario = %self.name, "Run stopped early after {:?}", report.elapsed);
            }
        }

        let verdict = Verdict::new(
            self.name,
            recorder.snapshot(),
            &self.specs,
            pool.len(),
            started_at,
        );
        info!(
            scenario = %verdict.scenario,
            requests = verdict.metrics.total_requests(),
            failed = verdict.metrics.failed_requests(),
            "Run {}",
            if verdict.all_passed { "passed" } else { "failed thresholds" }
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTarget;
    use stampede_core::Operation;
    use std::collections::{BTreeMap, BTreeSet};

    fn scenario(yaml: &str) -> ScenarioConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_iterations_create() {
        let target = Arc::new(MemoryTarget::new());
        let scenario = scenario(
            r#"
profile: {kind: fixed, vus: 10, duration: 1m, iterations: 5}
operation: create
think_time: 10ms
thresholds:
  http_req_failed: ["rate<0.01"]
  checks: ["rate>0.99"]
"#,
        );

        let verdict = configure("create", &scenario, target.clone())
            .unwrap()
            .execute()
            .await
            .unwrap();

        assert!(verdict.all_passed);
        let creates = verdict.metrics.operation(Operation::Create).unwrap();
        assert_eq!(creates.total, 50);
        assert_eq!(creates.failed, 0);
        assert_eq!(target.creates(), 50);
        assert_eq!(verdict.pool_size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_failure_prevents_load() {
        let target = Arc::new(MemoryTarget::new().fail_setup_index(3, 500));
        let scenario = scenario(
            r#"
profile: {kind: fixed, vus: 5, duration: 10s}
operation: update
pool: {size: 5}
"#,
        );

        let error = configure("update", &scenario, target.clone())
            .unwrap()
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            SetupError::CreateFailed { index: 3, status: Some(500), .. }
        ));
        assert!(target.updates().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dedicated_binding_with_small_pool() {
        let target = Arc::new(MemoryTarget::new());
        let scenario = scenario(
            r#"
profile: {kind: fixed, vus: 5, duration: 1m, iterations: 4}
operation: update
binding: dedicated
think_time: 100ms
pool: {size: 3, batch_size: 2}
"#,
        );

        let verdict = configure("dedicated", &scenario, target.clone())
            .unwrap()
            .execute()
            .await
            .unwrap();

        assert_eq!(verdict.pool_size, 3);
        assert_eq!(verdict.metrics.operation(Operation::Update).unwrap().total, 12);

        // VU n writes only pool[n - 1]; VUs 4 and 5 never write
        let mut writers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (id, payload) in target.updates() {
            let writer = payload.location.unwrap_or_default();
            let vu = writer.split_whitespace().nth(2).unwrap_or_default().to_string();
            writers.entry(id.as_str().to_string()).or_default().insert(vu);
        }
        assert_eq!(writers.len(), 3);
        for (id, vus) in writers {
            assert_eq!(vus.len(), 1);
            assert!(vus.contains(&id));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_staged_run_stops_at_cap() {
        let target = Arc::new(MemoryTarget::new());
        let scenario = scenario(
            r#"
profile:
  kind: staged
  stages:
    - {duration: 10s, target: 4}
    - {duration: 10s, target: 0}
operation: read
max_duration: 15s
"#,
        );

        let handle = configure("ramp", &scenario, target.clone()).unwrap();
        assert_eq!(handle.cap(), Duration::from_secs(15));
        let started = Instant::now();
        let verdict = handle.execute().await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(17));
        assert_eq!(verdict.metrics.total_requests() as usize, target.lists());
        assert!(target.lists() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_settle_skips_load() {
        let target = Arc::new(MemoryTarget::new());
        let scenario = scenario(
            r#"
profile: {kind: fixed, vus: 2, duration: 10s}
operation: update
pool: {size: 2, settle_delay: 20s}
"#,
        );

        let handle = configure("settle", &scenario, target.clone()).unwrap();
        let stop = handle.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stop.stop();
        });

        let verdict = handle.execute().await.unwrap();
        assert_eq!(verdict.pool_size, 2);
        assert_eq!(verdict.metrics.total_requests(), 0);
        assert!(target.updates().is_empty());
    }

    #[test]
    fn test_bad_threshold_is_rejected_at_configure() {
        let scenario = scenario(
            r#"
profile: {kind: fixed, vus: 1, duration: 1s}
thresholds:
  http_req_latency: ["avg<100"]
"#,
        );
        let result = configure("bad", &scenario, Arc::new(MemoryTarget::new()));
        assert!(matches!(result, Err(RunError::Config(_))));
    }
}
