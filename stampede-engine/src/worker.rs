//! Virtual user: one request per iteration, one outcome per request

use crate::payload::PayloadFactory;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use stampede_config::ScenarioConfig;
use stampede_core::{
    CheckResult, Operation, OperationPolicy, OperationWeights, OutcomeRecorder, RequestOutcome,
    ResourceBinding, ResourceId, ResourcePool,
};
use stampede_http::UsersTarget;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Something the scheduler can drive one iteration at a time
#[async_trait]
pub trait VuWorker: Send {
    /// A worker that can never do anything is not scheduled at all
    fn is_idle(&self) -> bool {
        false
    }

    /// Run one iteration; `None` when the iteration had nothing to do
    async fn iterate(&mut self) -> Option<RequestOutcome>;
}

/// Everything the VUs of one run share
pub struct WorkerContext {
    pub target: Arc<dyn UsersTarget>,
    pub pool: ResourcePool,
    pub recorder: Arc<OutcomeRecorder>,
    pub payloads: Arc<PayloadFactory>,
    pub policy: OperationPolicy,
    pub weights: OperationWeights,
    pub binding: ResourceBinding,
    pub latency_budget: Option<Duration>,
    pub seed: Option<u64>,
}

impl WorkerContext {
    pub fn from_scenario(
        scenario: &ScenarioConfig,
        target: Arc<dyn UsersTarget>,
        pool: ResourcePool,
        recorder: Arc<OutcomeRecorder>,
        payloads: Arc<PayloadFactory>,
    ) -> Self {
        Self {
            target,
            pool,
            recorder,
            payloads,
            policy: scenario.operation,
            weights: scenario.weights,
            binding: scenario.binding,
            latency_budget: scenario.checks.latency_budget,
            seed: scenario.seed,
        }
    }
}

enum Request {
    Create(stampede_http::UserPayload),
    Read,
    Update(ResourceId, stampede_http::UserPayload),
}

/// One simulated client with a stable id in `1..=max_vus`
pub struct VirtualUser {
    id: u32,
    iteration: u64,
    rng: StdRng,
    slot: Option<ResourceId>,
    idle: bool,
    ctx: Arc<WorkerContext>,
}

impl VirtualUser {
    pub fn new(id: u32, ctx: Arc<WorkerContext>) -> Self {
        let rng = match ctx.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ (u64::from(id) << 32)),
            None => StdRng::from_os_rng(),
        };

        let slot = match ctx.binding {
            ResourceBinding::Dedicated => ctx.pool.dedicated(id).cloned(),
            ResourceBinding::Random => None,
        };
        let idle = ctx.binding == ResourceBinding::Dedicated
            && ctx.policy.needs_pool(&ctx.weights)
            && slot.is_none();

        Self {
            id,
            iteration: 0,
            rng,
            slot,
            idle,
            ctx,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Iterations started so far, across all activity windows
    pub fn iterations(&self) -> u64 {
        self.iteration
    }

    /// The pool entry this VU owns under dedicated binding
    pub fn slot(&self) -> Option<&ResourceId> {
        self.slot.as_ref()
    }

    fn resource(&mut self) -> Option<ResourceId> {
        match self.ctx.binding {
            ResourceBinding::Dedicated => self.slot.clone(),
            ResourceBinding::Random => self.ctx.pool.pick(&mut self.rng).cloned(),
        }
    }

    fn checks(&self, operation: Operation, status: Option<u16>, latency: Duration) -> Vec<CheckResult> {
        let expected = operation.expected_status();
        let mut checks = vec![CheckResult::new(
            format!("status is {}", expected),
            status == Some(expected),
        )];
        if let Some(budget) = self.ctx.latency_budget {
            checks.push(CheckResult::new(
                format!("{} duration < {}ms", operation, budget.as_millis()),
                status.is_some() && latency < budget,
            ));
        }
        checks
    }
}

#[async_trait]
impl VuWorker for VirtualUser {
    fn is_idle(&self) -> bool {
        self.idle
    }

    async fn iterate(&mut self) -> Option<RequestOutcome> {
        let iteration = self.iteration;
        self.iteration += 1;

        let operation = self
            .ctx
            .policy
            .select(iteration, &self.ctx.weights, &mut self.rng);

        let request = match operation {
            Operation::Create => Request::Create(self.ctx.payloads.create()),
            Operation::Read => Request::Read,
            Operation::Update => match self.resource() {
                Some(id) => Request::Update(id, self.ctx.payloads.update(self.id, iteration)),
                None => {
                    trace!(vu = self.id, iteration, "No pool resource for update, skipping");
                    return None;
                }
            },
        };

        let timestamp = Utc::now();
        let clock = Instant::now();
        let result = match &request {
            Request::Create(payload) => self.ctx.target.create_user(payload).await,
            Request::Read => self.ctx.target.list_users().await,
            Request::Update(id, payload) => self.ctx.target.update_user(id, payload).await,
        };
        let latency = clock.elapsed();

        let (status, error) = match result {
            Ok(response) => (Some(response.status), None),
            Err(e) => (None, Some(e.to_string())),
        };
        trace!(vu = self.id, iteration, %operation, ?status, ?latency, "Request done");

        let outcome = RequestOutcome {
            operation,
            vu: self.id,
            iteration,
            status,
            latency,
            checks: self.checks(operation, status, latency),
            error,
            timestamp,
        };
        self.ctx.recorder.record(&outcome);
        Some(outcome)
    }
}
