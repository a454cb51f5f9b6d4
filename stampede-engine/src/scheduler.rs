//! Load profile scheduler: drives one tokio task per VU along its windows

use crate::shutdown::{RunStop, StopReason};
use crate::worker::VuWorker;
use stampede_core::{ActivityWindow, SchedulePlan};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// What the scheduler did
#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    pub iterations: u64,
    /// VUs that ran at least one activity window
    pub vus_started: u32,
    /// `None` when every VU finished its schedule before the cap
    pub stopped: Option<StopReason>,
    pub elapsed: Duration,
}

pub struct Scheduler {
    plan: Arc<SchedulePlan>,
    cap: Duration,
    think_time: Duration,
    stop: RunStop,
    active: Arc<AtomicU32>,
}

impl Scheduler {
    pub fn new(plan: Arc<SchedulePlan>, cap: Duration, stop: RunStop) -> Self {
        Self {
            plan,
            cap,
            think_time: Duration::from_secs(1),
            stop,
            active: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    /// Live count of VUs inside an activity window
    pub fn active_vus(&self) -> Arc<AtomicU32> {
        self.active.clone()
    }

    /// Run every VU of the plan until the windows close, the cap elapses or
    /// the stop signal is raised, then wait for in-flight iterations
    pub async fn run<W, F>(&self, mut worker_factory: F) -> SchedulerReport
    where
        W: VuWorker + 'static,
        F: FnMut(u32) -> W,
    {
        let run_start = Instant::now();
        let deadline = run_start + self.cap;

        info!(
            "Starting load: up to {} VUs for at most {:?}",
            self.plan.max_vus(),
            self.cap
        );

        let cap_timer = {
            let stop = self.stop.clone();
            tokio::spawn(async move {
                if stop.sleep_until(deadline).await {
                    stop.raise(StopReason::Cap);
                }
            })
        };

        let mut tasks = JoinSet::new();
        for vu in 1..=self.plan.max_vus() {
            let windows = self.plan.windows(vu);
            if windows.is_empty() {
                continue;
            }
            let lane = VuLane {
                vu,
                windows: windows.to_vec(),
                run_start,
                deadline,
                iteration_limit: self.plan.iteration_limit(),
                think_time: self.think_time,
                stop: self.stop.clone(),
                active: self.active.clone(),
            };
            tasks.spawn(lane.drive(worker_factory(vu)));
        }

        let mut report = SchedulerReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(lane) => {
                    report.iterations += lane.iterations;
                    if lane.started {
                        report.vus_started += 1;
                    }
                }
                Err(e) => error!("VU task failed: {}", e),
            }
        }
        cap_timer.abort();

        // Windows close at the cap, so a full run may finish before the timer fires
        report.stopped = self
            .stop
            .reason()
            .or_else(|| (Instant::now() >= deadline).then_some(StopReason::Cap));
        report.elapsed = run_start.elapsed();
        info!(
            "Load finished after {:?}: {} iterations from {} VUs",
            report.elapsed, report.iterations, report.vus_started
        );
        report
    }
}

#[derive(Debug, Default)]
struct LaneReport {
    iterations: u64,
    started: bool,
}

/// Schedule of a single VU
struct VuLane {
    vu: u32,
    windows: Vec<ActivityWindow>,
    run_start: Instant,
    deadline: Instant,
    iteration_limit: Option<u64>,
    think_time: Duration,
    stop: RunStop,
    active: Arc<AtomicU32>,
}

impl VuLane {
    async fn drive<W: VuWorker>(self, mut worker: W) -> LaneReport {
        let mut report = LaneReport::default();
        if worker.is_idle() {
            debug!(vu = self.vu, "No dedicated resource, VU stays idle");
            return report;
        }

        for window in &self.windows {
            let start = self.run_start + window.start;
            let end = (self.run_start + window.stop).min(self.deadline);
            if start >= end {
                continue;
            }
            if !self.stop.sleep_until(start).await {
                break;
            }

            self.active.fetch_add(1, Ordering::Relaxed);
            report.started = true;
            debug!(vu = self.vu, "VU started");

            let finished = self.run_window(&mut worker, end, &mut report).await;

            self.active.fetch_sub(1, Ordering::Relaxed);
            debug!(vu = self.vu, iterations = report.iterations, "VU retired");

            if finished {
                break;
            }
        }
        report
    }

    /// Iterate until `end`; true when the VU must not run any later window
    async fn run_window<W: VuWorker>(
        &self,
        worker: &mut W,
        end: Instant,
        report: &mut LaneReport,
    ) -> bool {
        loop {
            if self.limit_reached(report.iterations) || self.stop.is_raised() {
                return true;
            }
            if Instant::now() >= end {
                return false;
            }

            // Never interrupted: a started request always completes
            worker.iterate().await;
            report.iterations += 1;

            if self.think_time.is_zero() {
                tokio::task::yield_now().await;
            } else {
                let wake = (Instant::now() + self.think_time).min(end);
                if !self.stop.sleep_until(wake).await {
                    return true;
                }
            }
        }
    }

    fn limit_reached(&self, iterations: u64) -> bool {
        self.iteration_limit
            .is_some_and(|limit| iterations >= limit)
    }
}
