//! In-memory users target for engine tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use stampede_core::ResourceId;
use stampede_http::{HttpError, TargetResponse, UserPayload, UsersTarget};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) struct MemoryTarget {
    next_id: AtomicU64,
    creates: AtomicUsize,
    lists: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    setup_failures: HashMap<usize, u16>,
    return_ids: bool,
    created_usernames: Mutex<Vec<String>>,
    updates: Mutex<Vec<(ResourceId, UserPayload)>>,
}

impl MemoryTarget {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            creates: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Duration::ZERO,
            setup_failures: HashMap::new(),
            return_ids: true,
            created_usernames: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer `status` to the setup create with this index
    pub(crate) fn fail_setup_index(mut self, index: usize, status: u16) -> Self {
        self.setup_failures.insert(index, status);
        self
    }

    pub(crate) fn without_ids(mut self) -> Self {
        self.return_ids = false;
        self
    }

    pub(crate) fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub(crate) fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn created_usernames(&self) -> Vec<String> {
        self.created_usernames.lock().clone()
    }

    pub(crate) fn updates(&self) -> Vec<(ResourceId, UserPayload)> {
        self.updates.lock().clone()
    }

    async fn in_flight<T>(&self, value: T) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        value
    }

    fn setup_index(payload: &UserPayload) -> Option<usize> {
        payload
            .username
            .strip_prefix("setup_")?
            .rsplit('_')
            .next()?
            .parse()
            .ok()
    }
}

#[async_trait]
impl UsersTarget for MemoryTarget {
    async fn create_user(&self, payload: &UserPayload) -> Result<TargetResponse, HttpError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.created_usernames.lock().push(payload.username.clone());

        let failure = Self::setup_index(payload).and_then(|i| self.setup_failures.get(&i));
        let response = match failure {
            Some(status) => TargetResponse::new(*status),
            None if self.return_ids => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                TargetResponse::new(201).with_body(json!({ "id": id }))
            }
            None => TargetResponse::new(201),
        };
        Ok(self.in_flight(response).await)
    }

    async fn list_users(&self) -> Result<TargetResponse, HttpError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.in_flight(TargetResponse::new(200).with_body(json!([]))).await)
    }

    async fn update_user(
        &self,
        id: &ResourceId,
        payload: &UserPayload,
    ) -> Result<TargetResponse, HttpError> {
        self.updates.lock().push((id.clone(), payload.clone()));
        Ok(self.in_flight(TargetResponse::new(200)).await)
    }
}
