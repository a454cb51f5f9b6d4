//! Setup phase: create the shared resource pool in concurrent batches

use crate::error::SetupError;
use crate::payload::PayloadFactory;
use futures::future::join_all;
use stampede_config::{IncompletePoolPolicy, PoolConfig};
use stampede_core::{ResourceId, ResourcePool};
use stampede_http::UsersTarget;
use std::time::Duration;
use tracing::{debug, info, warn};

const ACCEPTED_STATUSES: [u16; 2] = [200, 201];

/// Creates `count` users through the target before any VU starts
pub struct PoolBuilder<'a> {
    target: &'a dyn UsersTarget,
    payloads: &'a PayloadFactory,
    batch_size: usize,
    setup_timeout: Duration,
    on_incomplete: IncompletePoolPolicy,
}

impl<'a> PoolBuilder<'a> {
    pub fn new(target: &'a dyn UsersTarget, payloads: &'a PayloadFactory) -> Self {
        let defaults = PoolConfig::default();
        Self {
            target,
            payloads,
            batch_size: defaults.batch_size,
            setup_timeout: defaults.setup_timeout,
            on_incomplete: defaults.on_incomplete,
        }
    }

    /// Take batch size, timeout and incomplete policy from the pool section
    pub fn with_config(mut self, config: &PoolConfig) -> Self {
        self.batch_size = config.batch_size;
        self.setup_timeout = config.setup_timeout;
        self.on_incomplete = config.on_incomplete;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    pub fn on_incomplete(mut self, policy: IncompletePoolPolicy) -> Self {
        self.on_incomplete = policy;
        self
    }

    /// Create the pool; a batch starts only after the previous one is done
    pub async fn build(&self, count: usize) -> Result<ResourcePool, SetupError> {
        if count == 0 {
            return Ok(ResourcePool::empty());
        }

        match tokio::time::timeout(self.setup_timeout, self.build_batches(count)).await {
            Ok(result) => result,
            Err(_) => Err(SetupError::Timeout(self.setup_timeout)),
        }
    }

    async fn build_batches(&self, count: usize) -> Result<ResourcePool, SetupError> {
        let batch_size = self.batch_size.max(1);
        let batches = count.div_ceil(batch_size);
        let mut ids = Vec::with_capacity(count);
        let mut skipped = 0usize;

        info!(
            "Creating {} pool users in {} batches of up to {}",
            count, batches, batch_size
        );

        for (batch, first) in (0..count).step_by(batch_size).enumerate() {
            let last = (first + batch_size).min(count);
            let results = join_all((first..last).map(|index| self.create_one(index))).await;

            // Results keep request order, so the first error is the lowest index
            for result in results {
                match result {
                    Ok(id) => ids.push(id),
                    Err(error) if self.on_incomplete == IncompletePoolPolicy::Proceed => {
                        warn!("Skipping pool user: {}", error);
                        skipped += 1;
                    }
                    Err(error) => return Err(error),
                }
            }

            debug!(
                "Pool batch {}/{} done, {} users created",
                batch + 1,
                batches,
                ids.len()
            );
        }

        if skipped > 0 {
            warn!(
                "Pool is incomplete: {} of {} users created",
                ids.len(),
                count
            );
        } else if ids.len() != count {
            return Err(SetupError::Incomplete {
                created: ids.len(),
                requested: count,
            });
        }

        info!("Pool ready with {} users", ids.len());
        Ok(ResourcePool::new(ids))
    }

    async fn create_one(&self, index: usize) -> Result<ResourceId, SetupError> {
        let payload = self.payloads.setup(index);
        let response = self
            .target
            .create_user(&payload)
            .await
            .map_err(|e| SetupError::create_transport(index, e))?;

        if !ACCEPTED_STATUSES.contains(&response.status) {
            return Err(SetupError::create_status(index, response.status));
        }

        response
            .resource_id()
            .ok_or(SetupError::MissingId { index })
    }
}

/// Build a pool with the default timeout and abort-on-failure policy
pub async fn build_pool(
    target: &dyn UsersTarget,
    count: usize,
    batch_size: usize,
) -> Result<ResourcePool, SetupError> {
    let payloads = PayloadFactory::new();
    PoolBuilder::new(target, &payloads)
        .batch_size(batch_size)
        .build(count)
        .await
}
